use async_trait::async_trait;
use clap::ValueEnum;
use tracing::{debug, error};

use llm::{
    builder::{LLMBackend, LLMBuilder},
    chat::{ChatMessage, ChatProvider, ChatRole},
};

use crate::error::GenerateError;

/// Single external capability: turn an instruction into post text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Name used to qualify error messages, e.g. `OpenAI`.
    fn provider(&self) -> &str;

    async fn generate(&self, prompt: &str, system: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Openai,
    Anthropic,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Openai => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    pub fn key_var(&self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Openai => "gpt-4",
            Self::Anthropic => "claude-3-5-sonnet-20240620",
        }
    }

    fn backend(&self) -> LLMBackend {
        match self {
            Self::Openai => LLMBackend::OpenAI,
            Self::Anthropic => LLMBackend::Anthropic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Chat-completion generator backed by the `llm` crate.
pub struct LlmGenerator {
    provider: Provider,
    api_key: String,
    settings: ModelSettings,
}

impl LlmGenerator {
    pub fn new(provider: Provider, api_key: String, settings: ModelSettings) -> Self {
        Self {
            provider,
            api_key,
            settings,
        }
    }
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("provider", &self.provider)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    fn provider(&self) -> &str {
        self.provider.name()
    }

    async fn generate(&self, prompt: &str, system: &str) -> Result<String, GenerateError> {
        let provider = self.provider;
        let api_key = self.api_key.clone();
        let settings = self.settings.clone();
        let prompt = prompt.to_string();
        let system = system.to_string();

        debug!(model = %self.settings.model, "requesting completion");
        // the 1.0 client is blocking and owns its own runtime
        tokio::task::spawn_blocking(move || complete(provider, api_key, settings, prompt, system))
            .await
            .map_err(|e| {
                error!("{} worker failed: {}", provider.name(), e);
                GenerateError::Unavailable(e.to_string())
            })?
    }
}

fn complete(
    provider: Provider,
    api_key: String,
    settings: ModelSettings,
    prompt: String,
    system: String,
) -> Result<String, GenerateError> {
    let llm = LLMBuilder::new()
        .backend(provider.backend())
        .api_key(api_key)
        .model(settings.model)
        .max_tokens(settings.max_tokens)
        .temperature(settings.temperature)
        .system(system)
        .build()
        .map_err(|e| {
            error!("couldn't build {} client: {}", provider.name(), e);
            GenerateError::Unavailable(e.to_string())
        })?;

    let messages = vec![ChatMessage {
        role: ChatRole::User,
        content: prompt,
    }];

    let reply = llm
        .chat(&messages)
        .map_err(|e| provider_error(provider, e))?;
    Ok(reply.trim().to_string())
}

fn provider_error(provider: Provider, message: impl ToString) -> GenerateError {
    GenerateError::Provider {
        provider: provider.name().to_string(),
        message: message.to_string(),
    }
}
