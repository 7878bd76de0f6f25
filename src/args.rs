use clap::{Parser, Subcommand};
use std::net::SocketAddr;

use crate::error::ConfigError;
use crate::generate::{ModelSettings, Provider};
use crate::handle::Catalog;
use crate::types::{Platform, Tone};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Model provider used when a credential is available
    #[arg(long, global = true, value_enum, env = "POSTGEN_PROVIDER", default_value = "openai")]
    pub provider: Provider,

    /// Model name, defaults to the provider's standard model
    #[arg(long, global = true, env = "POSTGEN_MODEL")]
    pub model: Option<String>,

    /// API credential; falls back to the provider's own variable
    #[arg(long, global = true, env = "POSTGEN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Platforms this deployment serves
    #[arg(
        long,
        global = true,
        value_enum,
        value_delimiter = ',',
        env = "POSTGEN_PLATFORMS",
        default_values_t = Platform::ALL
    )]
    pub platforms: Vec<Platform>,

    #[arg(long, global = true, value_enum, env = "POSTGEN_DEFAULT_PLATFORM", default_value = "telegram")]
    pub default_platform: Platform,

    #[arg(long, global = true, value_enum, env = "POSTGEN_DEFAULT_TONE", default_value = "friendly")]
    pub default_tone: Tone,

    #[arg(long, global = true, default_value_t = 500)]
    pub max_tokens: u32,

    #[arg(long, global = true, default_value_t = 0.8)]
    pub temperature: f32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the post generator over HTTP
    Serve {
        #[arg(long, env = "POSTGEN_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },
    /// Generate one post and print it
    Generate {
        /// Topic of the post, or '-' for stdin
        #[arg(default_value = "-")]
        topic: String,

        #[arg(long)]
        platform: Option<String>,

        #[arg(long)]
        tone: Option<String>,
    },
}

/// Startup configuration with the credential already resolved.
#[derive(Clone)]
pub struct Settings {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: ModelSettings,
    pub catalog: Catalog,
}

impl Args {
    /// `lookup` reads the provider's credential variable; blank values count as unset.
    pub fn settings<F>(&self, lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature(self.temperature));
        }

        let mut platforms = Vec::new();
        for platform in &self.platforms {
            if !platforms.contains(platform) {
                platforms.push(*platform);
            }
        }
        let catalog = Catalog::new(platforms, self.default_platform, self.default_tone)?;

        let api_key = self
            .api_key
            .clone()
            .or_else(|| lookup(self.provider.key_var()))
            .filter(|key| !key.trim().is_empty());

        Ok(Settings {
            provider: self.provider,
            api_key,
            model: ModelSettings {
                model: self
                    .model
                    .clone()
                    .unwrap_or_else(|| self.provider.default_model().to_string()),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            },
            catalog,
        })
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("model", &self.model)
            .field("catalog", &self.catalog)
            .finish()
    }
}
