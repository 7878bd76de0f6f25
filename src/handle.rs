use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use serde_derive::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, GenerateError, RequestError};
use crate::generate::TextGenerator;
use crate::prompt;
use crate::templates::TemplateTable;
use crate::types::{ErrorBody, GenerationResult, Platform, PostRequest, Source, Tone};

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";
pub const MAX_AGE: &str = "86400";

/// Which platforms this deployment serves and what an absent field means.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    supported: Vec<Platform>,
    default_platform: Platform,
    default_tone: Tone,
}

impl Catalog {
    pub fn new(
        supported: Vec<Platform>,
        default_platform: Platform,
        default_tone: Tone,
    ) -> Result<Self, ConfigError> {
        if supported.is_empty() {
            return Err(ConfigError::NoPlatforms);
        }
        if !supported.contains(&default_platform) {
            return Err(ConfigError::DefaultPlatformUnsupported(
                default_platform.to_string(),
            ));
        }
        Ok(Self {
            supported,
            default_platform,
            default_tone,
        })
    }

    pub fn supported(&self) -> &[Platform] {
        &self.supported
    }

    /// Known names only; a platform outside the supported set counts as unknown.
    pub fn resolve(&self, request: &PostRequest) -> (Option<Platform>, Option<Tone>) {
        let platform =
            Platform::from_name(&request.platform).filter(|p| self.supported.contains(p));
        (platform, Tone::from_name(&request.tone))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            supported: Platform::ALL.to_vec(),
            default_platform: Platform::Telegram,
            default_tone: Tone::Friendly,
        }
    }
}

/// Chosen once at construction: credential present means `Model`.
#[derive(Clone)]
pub enum Strategy {
    Template,
    Model(Arc<dyn TextGenerator>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    fn preflight() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
        Self {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }

    fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        let (status, body) = match serde_json::to_string(payload) {
            Ok(body) => (status, body),
            Err(e) => {
                error!("couldn't serialize response: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    r#"{"error":"Internal error"}"#.to_string(),
                )
            }
        };
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn error(status: StatusCode, message: impl ToString) -> Self {
        Self::json(
            status,
            &ErrorBody {
                error: message.to_string(),
            },
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    topic: Option<String>,
    platform: Option<String>,
    tone: Option<String>,
}

pub struct PostGenerator {
    templates: Arc<TemplateTable>,
    catalog: Catalog,
    strategy: Strategy,
}

impl PostGenerator {
    pub fn new(templates: Arc<TemplateTable>, catalog: Catalog, strategy: Strategy) -> Self {
        Self {
            templates,
            catalog,
            strategy,
        }
    }

    pub fn mode(&self) -> Source {
        match self.strategy {
            Strategy::Template => Source::Template,
            Strategy::Model(_) => Source::Model,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Missing body behaves like `{}`.
    pub fn parse_request(&self, body: Option<&str>) -> Result<PostRequest, RequestError> {
        let body = body.filter(|b| !b.trim().is_empty()).unwrap_or("{}");
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(RequestError::InvalidJson)?;
        if !value.is_object() {
            return Err(RequestError::InvalidJson(serde::de::Error::custom(
                "expected a JSON object",
            )));
        }
        let raw: RawRequest = serde_json::from_value(value).map_err(RequestError::InvalidJson)?;

        let topic = raw.topic.unwrap_or_default();
        if topic.is_empty() {
            return Err(RequestError::TopicRequired);
        }

        Ok(PostRequest {
            topic,
            platform: raw
                .platform
                .unwrap_or_else(|| self.catalog.default_platform.to_string()),
            tone: raw
                .tone
                .unwrap_or_else(|| self.catalog.default_tone.to_string()),
        })
    }

    pub fn generate_from_template(&self, request: &PostRequest) -> GenerationResult {
        let text = match self.catalog.resolve(request) {
            (Some(platform), Some(tone)) => self.templates.render(platform, tone, &request.topic),
            _ => None,
        }
        .unwrap_or_else(|| TemplateTable::fallback(&request.topic));

        GenerationResult {
            text,
            source: Source::Template,
        }
    }

    pub async fn generate(&self, request: &PostRequest) -> Result<GenerationResult, GenerateError> {
        match &self.strategy {
            Strategy::Template => {
                info!(platform = %request.platform, tone = %request.tone, "rendering template");
                Ok(self.generate_from_template(request))
            }
            Strategy::Model(generator) => {
                info!(
                    platform = %request.platform,
                    tone = %request.tone,
                    provider = generator.provider(),
                    "calling model"
                );
                let instruction = prompt::build(
                    &request.topic,
                    &request.platform,
                    &request.tone,
                    self.catalog.resolve(request),
                );
                let text = generator.generate(&instruction, prompt::SYSTEM_PROMPT).await?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(GenerateError::Provider {
                        provider: generator.provider().to_string(),
                        message: "empty response".to_string(),
                    });
                }
                Ok(GenerationResult {
                    text: text.to_string(),
                    source: Source::Model,
                })
            }
        }
    }

    pub async fn dispatch(&self, method: &str, body: Option<&str>) -> Reply {
        debug!(method, "received request");

        match method {
            "OPTIONS" => return Reply::preflight(),
            "POST" => {}
            _ => {
                warn!(method, "method not allowed");
                return Reply::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
            }
        }

        let request = match self.parse_request(body) {
            Ok(request) => request,
            Err(e) => {
                warn!("rejected request: {}", e);
                return Reply::error(StatusCode::BAD_REQUEST, e);
            }
        };

        match self.generate(&request).await {
            Ok(result) => Reply::json(StatusCode::OK, &result),
            Err(e) => {
                error!("generation failed: {}", e);
                Reply::error(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        fn provider(&self) -> &str {
            "OpenAI"
        }

        async fn generate(&self, prompt: &str, system: &str) -> Result<String, GenerateError> {
            assert!(prompt.contains("Создай пост"));
            assert_eq!(system, prompt::SYSTEM_PROMPT);
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        fn provider(&self) -> &str {
            "OpenAI"
        }

        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, GenerateError> {
            Err(GenerateError::Provider {
                provider: "OpenAI".into(),
                message: "rate limit reached".into(),
            })
        }
    }

    fn service(strategy: Strategy) -> PostGenerator {
        PostGenerator::new(
            Arc::new(TemplateTable::builtin().unwrap()),
            Catalog::default(),
            strategy,
        )
    }

    fn error_of(reply: &Reply) -> String {
        serde_json::from_str::<ErrorBody>(&reply.body).unwrap().error
    }

    #[tokio::test]
    async fn preflight_ignores_body() {
        let reply = service(Strategy::Template)
            .dispatch("OPTIONS", Some("not json"))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.is_empty());
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(reply.headers[header::ACCESS_CONTROL_MAX_AGE], MAX_AGE);
        assert!(reply.headers.get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn other_methods_are_rejected() {
        let svc = service(Strategy::Template);
        for method in ["GET", "PUT", "DELETE", "post"] {
            let reply = svc.dispatch(method, Some(r#"{"topic":"x"}"#)).await;
            assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED, "{}", method);
            assert_eq!(error_of(&reply), "Method not allowed");
            assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }
    }

    #[tokio::test]
    async fn malformed_json() {
        let svc = service(Strategy::Template);
        for body in ["{topic:", "[\"topic\"]", r#"{"topic": 5}"#] {
            let reply = svc.dispatch("POST", Some(body)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(error_of(&reply), "Invalid JSON");
        }
    }

    #[tokio::test]
    async fn topic_is_required() {
        let svc = service(Strategy::Template);
        for body in [Some("{}"), Some(r#"{"topic":""}"#), Some(r#"{"topic":null}"#), None] {
            let reply = svc.dispatch("POST", body).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST);
            assert_eq!(error_of(&reply), "Topic is required");
        }
    }

    #[tokio::test]
    async fn whitespace_topic_is_still_a_topic() {
        let svc = service(Strategy::Template);
        let reply = svc.dispatch("POST", Some(r#"{"topic":"  "}"#)).await;
        assert_eq!(reply.status, StatusCode::OK);
        let result: GenerationResult = serde_json::from_str(&reply.body).unwrap();
        assert!(result.text.starts_with("   🎯"));
    }

    #[tokio::test]
    async fn template_scenario() {
        let reply = service(Strategy::Template)
            .dispatch(
                "POST",
                Some(r#"{"topic":"Здоровый сон","platform":"telegram","tone":"professional"}"#),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers[header::CONTENT_TYPE], "application/json");
        let result: GenerationResult = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(result.source, Source::Template);
        assert!(result.text.contains("<b>Здоровый сон</b>"));
    }

    #[tokio::test]
    async fn template_path_is_deterministic() {
        let svc = service(Strategy::Template);
        for platform in Platform::ALL {
            for tone in Tone::ALL {
                let body = format!(
                    r#"{{"topic":"Утро","platform":"{}","tone":"{}"}}"#,
                    platform, tone
                );
                let first = svc.dispatch("POST", Some(&body)).await;
                let second = svc.dispatch("POST", Some(&body)).await;
                assert_eq!(first.body, second.body);
            }
        }
    }

    #[tokio::test]
    async fn defaults_apply_when_fields_absent() {
        let svc = service(Strategy::Template);
        let request = svc.parse_request(Some(r#"{"topic":"Кофе","tone":null}"#)).unwrap();
        assert_eq!(request.platform, "telegram");
        assert_eq!(request.tone, "friendly");
        let result = svc.generate(&request).await.unwrap();
        assert!(result.text.starts_with("Кофе 🎯"));
    }

    #[tokio::test]
    async fn unknown_combination_falls_back() {
        let svc = service(Strategy::Template);
        let reply = svc
            .dispatch("POST", Some(r#"{"topic":"Кофе","platform":"myspace","tone":"friendly"}"#))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        let result: GenerationResult = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(result.text, "Кофе\n\nГенерация через шаблоны.");

        let reply = svc
            .dispatch("POST", Some(r#"{"topic":"Кофе","platform":"vk","tone":"sarcastic"}"#))
            .await;
        let result: GenerationResult = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(result.text, TemplateTable::fallback("Кофе"));
    }

    #[tokio::test]
    async fn unsupported_platform_is_treated_as_unknown() {
        let catalog = Catalog::new(
            vec![Platform::Telegram, Platform::Vk],
            Platform::Vk,
            Tone::Friendly,
        )
        .unwrap();
        let svc = PostGenerator::new(
            Arc::new(TemplateTable::builtin().unwrap()),
            catalog,
            Strategy::Template,
        );
        let request = svc
            .parse_request(Some(r#"{"topic":"Кино","platform":"youtube"}"#))
            .unwrap();
        assert_eq!(svc.generate_from_template(&request).text, TemplateTable::fallback("Кино"));

        let request = svc.parse_request(Some(r#"{"topic":"Кино"}"#)).unwrap();
        assert_eq!(request.platform, "vk");
        assert!(svc.generate_from_template(&request).text.contains("Сегодня про Кино."));
    }

    #[test]
    fn catalog_rejects_bad_defaults() {
        assert!(matches!(
            Catalog::new(vec![], Platform::Telegram, Tone::Friendly),
            Err(ConfigError::NoPlatforms)
        ));
        assert!(matches!(
            Catalog::new(vec![Platform::Vk], Platform::Telegram, Tone::Friendly),
            Err(ConfigError::DefaultPlatformUnsupported(_))
        ));
    }

    #[tokio::test]
    async fn model_scenario_trims_output() {
        let svc = service(Strategy::Model(Arc::new(Canned("  Привет из модели 🚀\n"))));
        assert_eq!(svc.mode(), Source::Model);
        let reply = svc
            .dispatch(
                "POST",
                Some(r#"{"topic":"Здоровый сон","platform":"telegram","tone":"professional"}"#),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        let result: GenerationResult = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(result.source, Source::Model);
        assert_eq!(result.text, "Привет из модели 🚀");
    }

    #[tokio::test]
    async fn model_failure_is_500_with_provider_prefix() {
        let svc = service(Strategy::Model(Arc::new(Failing)));
        let reply = svc.dispatch("POST", Some(r#"{"topic":"Сон"}"#)).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = error_of(&reply);
        assert!(message.starts_with("OpenAI error:"), "{}", message);
        assert!(message.ends_with("rate limit reached"));
    }

    #[tokio::test]
    async fn blank_model_output_is_a_provider_error() {
        let svc = service(Strategy::Model(Arc::new(Canned("  \n "))));
        let reply = svc.dispatch("POST", Some(r#"{"topic":"x"}"#)).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&reply), "OpenAI error: empty response");
    }

    #[test]
    fn unavailable_client_message() {
        let reply = Reply::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            GenerateError::Unavailable("no backend".into()),
        );
        assert_eq!(error_of(&reply), "generation library unavailable");
    }
}
