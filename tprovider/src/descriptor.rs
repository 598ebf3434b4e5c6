//! Static provider identity and capability descriptors.
//!
//! ```rust
//! use tprovider::{CostTier, ProviderDescriptor, ProviderId};
//!
//! let descriptor = ProviderDescriptor::new(ProviderId::Ollama, "llama3.1", 8_192)
//!     .with_cost_tier(CostTier::Local);
//!
//! assert!(descriptor.fits(4_000));
//! assert!(!descriptor.fits(10_000));
//! assert_eq!("ollama".parse::<ProviderId>(), Ok(ProviderId::Ollama));
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    Anthropic,
    OpenAi,
    Mistral,
    Moonshot,
    Ollama,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        Self::Anthropic,
        Self::OpenAi,
        Self::Mistral,
        Self::Moonshot,
        Self::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "open-ai",
            Self::Mistral => "mistral",
            Self::Moonshot => "moonshot",
            Self::Ollama => "ollama",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "open-ai" | "openai" => Ok(Self::OpenAi),
            "mistral" => Ok(Self::Mistral),
            "moonshot" | "kimi" => Ok(Self::Moonshot),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Relative spend per call; ordering is cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostTier {
    Local,
    Economy,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCapabilities {
    pub tool_use: bool,
    pub vision: bool,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            tool_use: true,
            vision: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub model: String,
    pub max_context_tokens: u32,
    #[serde(default = "default_cost_tier")]
    pub cost_tier: CostTier,
    #[serde(default)]
    pub capabilities: ProviderCapabilities,
}

fn default_cost_tier() -> CostTier {
    CostTier::Standard
}

impl ProviderDescriptor {
    pub fn new(id: ProviderId, model: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            id,
            model: model.into(),
            max_context_tokens,
            cost_tier: default_cost_tier(),
            capabilities: ProviderCapabilities::default(),
        }
    }

    pub fn with_cost_tier(mut self, cost_tier: CostTier) -> Self {
        self.cost_tier = cost_tier;
        self
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Whether a prompt of `context_tokens` fits the context window.
    pub fn fits(&self, context_tokens: u32) -> bool {
        context_tokens <= self.max_context_tokens
    }

    pub fn supports_tools(&self) -> bool {
        self.capabilities.tool_use
    }
}
