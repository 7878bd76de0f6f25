use thiserror::Error;

/// Client-side problems with a request body; each maps to a 400.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Topic is required")]
    TopicRequired,
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("generation library unavailable")]
    Unavailable(String),

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("couldn't parse template table: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("bad layout for {platform}/{tone}: {message}")]
    Layout {
        platform: String,
        tone: String,
        message: String,
    },

    #[error("no {tone} template for {platform}")]
    Missing { platform: String, tone: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one platform must be supported")]
    NoPlatforms,

    #[error("default platform {0} is not in the supported set")]
    DefaultPlatformUnsupported(String),

    #[error("temperature must be within 0.0..=2.0, got {0}")]
    Temperature(f32),
}
