//! Static vendor descriptors and discussion-wide configuration.
//!
//! Everything the orchestrator needs is passed in explicitly at construction
//! time: provider endpoints, prompt overrides, session timing. There is no
//! global mutable configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::prompts::PromptSet;
use crate::session::SessionConfig;
use crate::types::message::Message;
use crate::types::stage::Stage;

/// The four fixed chat-completion providers a discussion talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    DeepSeek,
    Hunyuan,
    Moonshot,
    Doubao,
}

impl Provider {
    /// Stable lowercase identifier, used for API-key lookup and logging.
    pub fn id(self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek",
            Provider::Hunyuan => "hunyuan",
            Provider::Moonshot => "moonshot",
            Provider::Doubao => "doubao",
        }
    }
}

/// Static role-to-provider table. The moderator opens and closes the
/// discussion on the same provider; each discussant has its own.
pub fn provider_for(stage: Stage) -> Provider {
    match stage {
        Stage::Guide | Stage::Summary => Provider::DeepSeek,
        Stage::Discussant1 => Provider::Hunyuan,
        Stage::Discussant2 => Provider::Moonshot,
        Stage::Discussant3 => Provider::Doubao,
    }
}

/// Request sampling defaults sent with every call to a provider.
#[derive(Debug, Clone, Copy)]
pub struct SamplingDefaults {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Endpoint, model id, credentials and request defaults for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Full chat-completions URL.
    pub base_url: String,
    pub model: String,
    /// Explicit API key. When `None`, the transport resolves one from the
    /// keyring or the `{PROVIDER}_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub sampling: SamplingDefaults,
}

impl ProviderConfig {
    /// Built-in descriptor matching the original deployment of each vendor.
    pub fn builtin(provider: Provider) -> Self {
        match provider {
            Provider::DeepSeek => Self {
                base_url: "https://api.deepseek.com/chat/completions".to_string(),
                model: "deepseek-chat".to_string(),
                api_key: None,
                sampling: SamplingDefaults {
                    temperature: 1.0,
                    top_p: 1.0,
                    max_tokens: 4096,
                },
            },
            Provider::Hunyuan => Self {
                base_url: "https://api.hunyuan.cloud.tencent.com/v1/chat/completions".to_string(),
                model: "hunyuan-turbos-latest".to_string(),
                api_key: None,
                sampling: SamplingDefaults {
                    temperature: 0.7,
                    top_p: 0.9,
                    max_tokens: 4096,
                },
            },
            Provider::Moonshot => Self {
                base_url: "https://api.moonshot.cn/v1/chat/completions".to_string(),
                model: "moonshot-v1-8k".to_string(),
                api_key: None,
                sampling: SamplingDefaults {
                    temperature: 0.7,
                    top_p: 0.9,
                    max_tokens: 4096,
                },
            },
            Provider::Doubao => Self {
                base_url: "https://ark.cn-beijing.volces.com/api/v3/chat/completions".to_string(),
                model: "doubao-1-5-pro-32k-250115".to_string(),
                api_key: None,
                sampling: SamplingDefaults {
                    temperature: 0.7,
                    top_p: 0.9,
                    max_tokens: 4096,
                },
            },
        }
    }

    /// Build the streaming chat-completion request body for this provider.
    pub fn chat_body(&self, messages: &[Message]) -> crate::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "model": self.model,
            "messages": serde_json::to_value(messages)?,
            "stream": true,
            "temperature": self.sampling.temperature,
            "top_p": self.sampling.top_p,
            "max_tokens": self.sampling.max_tokens,
        }))
    }
}

/// Configuration for one discussion, passed to the orchestrator at
/// construction time.
#[derive(Debug, Clone)]
pub struct DiscussionConfig {
    pub providers: HashMap<Provider, ProviderConfig>,
    pub prompts: PromptSet,
    pub session: SessionConfig,
    /// Optional pause between a stage's completion and the next stage's
    /// start. Sequencing correctness never depends on it; the next stage's
    /// guard re-reads the freshly stored context either way.
    pub settle_delay: Option<Duration>,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        let providers = [
            Provider::DeepSeek,
            Provider::Hunyuan,
            Provider::Moonshot,
            Provider::Doubao,
        ]
        .into_iter()
        .map(|p| (p, ProviderConfig::builtin(p)))
        .collect();

        Self {
            providers,
            prompts: PromptSet::default(),
            session: SessionConfig::default(),
            settle_delay: None,
        }
    }
}

impl DiscussionConfig {
    /// Descriptor for a provider, falling back to the built-in table when the
    /// caller supplied a partial map.
    pub fn endpoint(&self, provider: Provider) -> ProviderConfig {
        self.providers
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| ProviderConfig::builtin(provider))
    }
}
