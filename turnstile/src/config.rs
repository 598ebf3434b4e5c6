//! JSON configuration for a turnstile deployment.
//!
//! Every section is optional; missing fields keep their defaults. Durations
//! are given in milliseconds.
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile::TurnstileConfig;
//!
//! let config = TurnstileConfig::from_json_str(
//!     r#"{
//!         "fleet": [{ "id": "ollama", "model": "llama3.1", "max_context_tokens": 8192 }],
//!         "breaker": { "failure_threshold": 3, "base_cooldown_ms": 30000 },
//!         "render": { "debounce_ms": 750 }
//!     }"#,
//! )
//! .expect("config should parse");
//!
//! assert_eq!(config.breaker_policy().failure_threshold, 3);
//! assert_eq!(config.render_policy().debounce, Duration::from_millis(750));
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tchat::{EnginePolicy, TurnPolicy};
use tprovider::ProviderDescriptor;
use trender::{RenderMode, RenderPolicy};
use trouting::{BreakerPolicy, RoutingTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Io,
    Parse,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Io, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Parse, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(error.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservabilitySink {
    None,
    #[default]
    Tracing,
    Metrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSection {
    pub failure_threshold: Option<u32>,
    pub base_cooldown_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub max_tool_round_trips: Option<u32>,
    pub chunk_timeout_ms: Option<u64>,
    pub completion_marker: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnSection {
    pub max_turn_duration_ms: Option<u64>,
    pub event_buffer: Option<usize>,
    pub classification_window: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub debounce_ms: Option<u64>,
    pub retry_delay_ms: Option<u64>,
    pub in_progress_marker: Option<String>,
    pub plain_text: Option<bool>,
    pub apology_notice: Option<String>,
    pub unavailable_notice: Option<String>,
    pub switch_notice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSection {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnstileConfig {
    /// Empty means "describe whatever providers are registered".
    pub fleet: Vec<ProviderDescriptor>,
    pub routing: Option<RoutingTable>,
    pub breaker: BreakerSection,
    pub engine: EngineSection,
    pub turn: TurnSection,
    pub render: RenderSection,
    pub tools: ToolSection,
    pub observability: ObservabilitySink,
}

impl TurnstileConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::io(format!("{}: {error}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for descriptor in &self.fleet {
            if !seen.insert(descriptor.id) {
                return Err(ConfigError::invalid(format!(
                    "provider '{}' appears more than once in the fleet",
                    descriptor.id
                )));
            }
            if descriptor.max_context_tokens == 0 {
                return Err(ConfigError::invalid(format!(
                    "provider '{}' has no context window",
                    descriptor.id
                )));
            }
        }

        if let Some(multiplier) = self.breaker.backoff_multiplier
            && multiplier < 1.0
        {
            return Err(ConfigError::invalid(
                "breaker backoff_multiplier must be at least 1.0",
            ));
        }

        if let (Some(table), false) = (&self.routing, self.fleet.is_empty()) {
            let referenced = table
                .preferences
                .values()
                .flatten()
                .chain(table.fallbacks.iter());
            for provider in referenced {
                if !seen.contains(provider) {
                    return Err(ConfigError::invalid(format!(
                        "routing table names provider '{provider}' which is not in the fleet"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn routing_table(&self) -> RoutingTable {
        self.routing.clone().unwrap_or_default()
    }

    pub fn breaker_policy(&self) -> BreakerPolicy {
        let section = &self.breaker;
        let mut policy = BreakerPolicy::default();
        if let Some(threshold) = section.failure_threshold {
            policy = policy.with_failure_threshold(threshold);
        }
        if let Some(ms) = section.base_cooldown_ms {
            policy = policy.with_base_cooldown(Duration::from_millis(ms));
        }
        if let Some(multiplier) = section.backoff_multiplier {
            policy = policy.with_backoff_multiplier(multiplier);
        }
        if let Some(ms) = section.max_cooldown_ms {
            policy = policy.with_max_cooldown(Duration::from_millis(ms));
        }
        policy
    }

    pub fn engine_policy(&self) -> EnginePolicy {
        let section = &self.engine;
        let mut policy = EnginePolicy::default();
        if let Some(limit) = section.max_tool_round_trips {
            policy = policy.with_max_tool_round_trips(limit);
        }
        if let Some(ms) = section.chunk_timeout_ms {
            policy = policy.with_chunk_timeout(Duration::from_millis(ms));
        }
        if let Some(marker) = &section.completion_marker {
            policy = policy.with_completion_marker(marker.clone());
        }
        policy
    }

    pub fn turn_policy(&self) -> TurnPolicy {
        let section = &self.turn;
        let mut policy = TurnPolicy::default();
        if let Some(ms) = section.max_turn_duration_ms {
            policy = policy.with_max_turn_duration(Duration::from_millis(ms));
        }
        if let Some(buffer) = section.event_buffer {
            policy = policy.with_event_buffer(buffer);
        }
        if let Some(window) = section.classification_window {
            policy = policy.with_classification_window(window);
        }
        policy
    }

    pub fn render_policy(&self) -> RenderPolicy {
        let section = &self.render;
        let mut policy = RenderPolicy::default();
        if let Some(ms) = section.debounce_ms {
            policy = policy.with_debounce(Duration::from_millis(ms));
        }
        if let Some(ms) = section.retry_delay_ms {
            policy = policy.with_retry_delay(Duration::from_millis(ms));
        }
        if let Some(marker) = &section.in_progress_marker {
            policy = policy.with_in_progress_marker(marker.clone());
        }
        if section.plain_text == Some(true) {
            policy = policy.with_mode(RenderMode::Plain);
        }
        if let Some(notice) = &section.apology_notice {
            policy = policy.with_apology_notice(notice.clone());
        }
        if let Some(notice) = &section.unavailable_notice {
            policy = policy.with_unavailable_notice(notice.clone());
        }
        if let Some(notice) = &section.switch_notice {
            policy = policy.with_switch_notice(notice.clone());
        }
        policy
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tools.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use tprovider::{CostTier, ProviderId};
    use trouting::Category;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = TurnstileConfig::from_json_str("{}").expect("empty config parses");

        assert!(config.fleet.is_empty());
        assert_eq!(config.routing_table(), RoutingTable::default());
        assert_eq!(config.breaker_policy(), BreakerPolicy::default());
        assert_eq!(config.engine_policy(), EnginePolicy::default());
        assert_eq!(config.render_policy(), RenderPolicy::default());
        assert_eq!(config.observability, ObservabilitySink::Tracing);
        assert_eq!(config.tool_timeout(), None);
    }

    #[test]
    fn full_document_overrides_policies() {
        let config = TurnstileConfig::from_json_str(
            r#"{
                "fleet": [
                    { "id": "anthropic", "model": "claude-sonnet", "max_context_tokens": 200000, "cost_tier": "premium" },
                    { "id": "mistral", "model": "mistral-small", "max_context_tokens": 32000, "cost_tier": "economy" }
                ],
                "routing": {
                    "preferences": { "routine": ["mistral"], "safety-sensitive": ["anthropic"] },
                    "fallbacks": ["anthropic"]
                },
                "engine": { "max_tool_round_trips": 3, "chunk_timeout_ms": 15000, "completion_marker": "All set." },
                "turn": { "max_turn_duration_ms": 45000 },
                "render": { "plain_text": true, "retry_delay_ms": 250 },
                "tools": { "timeout_ms": 5000 },
                "observability": "metrics"
            }"#,
        )
        .expect("config parses");

        assert_eq!(config.fleet[0].cost_tier, CostTier::Premium);
        assert_eq!(
            config.routing_table().preferred(Category::Routine),
            &[ProviderId::Mistral]
        );
        assert_eq!(config.engine_policy().max_tool_round_trips, 3);
        assert_eq!(config.engine_policy().completion_marker, "All set.");
        assert_eq!(
            config.turn_policy().max_turn_duration,
            Duration::from_secs(45)
        );
        assert_eq!(config.render_policy().mode, RenderMode::Plain);
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.observability, ObservabilitySink::Metrics);
    }

    #[test]
    fn duplicate_fleet_entries_are_rejected() {
        let error = TurnstileConfig::from_json_str(
            r#"{ "fleet": [
                { "id": "ollama", "model": "a", "max_context_tokens": 8000 },
                { "id": "ollama", "model": "b", "max_context_tokens": 8000 }
            ] }"#,
        )
        .expect_err("duplicates should fail");

        assert_eq!(error.kind, ConfigErrorKind::Invalid);
    }

    #[test]
    fn routing_to_unknown_provider_is_rejected() {
        let error = TurnstileConfig::from_json_str(
            r#"{
                "fleet": [{ "id": "ollama", "model": "llama", "max_context_tokens": 8000 }],
                "routing": { "preferences": { "coding": ["anthropic"] } }
            }"#,
        )
        .expect_err("unknown provider should fail");

        assert_eq!(error.kind, ConfigErrorKind::Invalid);
        assert!(error.message.contains("anthropic"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let error = TurnstileConfig::from_json_str("{ fleet: ").expect_err("should fail");
        assert_eq!(error.kind, ConfigErrorKind::Parse);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = TurnstileConfig::from_path("/definitely/not/here/turnstile.json")
            .expect_err("should fail");
        assert_eq!(error.kind, ConfigErrorKind::Io);
    }
}
