use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tprovider::ProviderId;

use crate::Category;

/// Static category preferences plus fleet-wide fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingTable {
    pub preferences: BTreeMap<Category, Vec<ProviderId>>,
    pub fallbacks: Vec<ProviderId>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        let preferences = BTreeMap::from([
            (
                Category::Routine,
                vec![ProviderId::Mistral, ProviderId::Anthropic],
            ),
            (
                Category::Reasoning,
                vec![ProviderId::Anthropic, ProviderId::Moonshot],
            ),
            (
                Category::Coding,
                vec![ProviderId::Anthropic, ProviderId::Moonshot],
            ),
            (Category::SafetySensitive, vec![ProviderId::Anthropic]),
            (
                Category::Persona,
                vec![ProviderId::Moonshot, ProviderId::Anthropic],
            ),
        ]);

        Self {
            preferences,
            fallbacks: vec![ProviderId::Ollama],
        }
    }
}

impl RoutingTable {
    pub fn empty() -> Self {
        Self {
            preferences: BTreeMap::new(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_preference(mut self, category: Category, providers: Vec<ProviderId>) -> Self {
        self.preferences.insert(category, providers);
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<ProviderId>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn preferred(&self, category: Category) -> &[ProviderId] {
        self.preferences
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn fallbacks(&self) -> &[ProviderId] {
        &self.fallbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_round_trips_through_json_with_kebab_case_keys() {
        let json = r#"{
            "preferences": { "safety-sensitive": ["anthropic", "open-ai"] },
            "fallbacks": []
        }"#;

        let table: RoutingTable = serde_json::from_str(json).expect("table should parse");
        assert_eq!(
            table.preferred(Category::SafetySensitive),
            &[ProviderId::Anthropic, ProviderId::OpenAi]
        );
        assert!(table.preferred(Category::Routine).is_empty());
        assert!(table.fallbacks().is_empty());
    }

    #[test]
    fn default_table_covers_every_category() {
        let table = RoutingTable::default();
        for category in Category::ALL {
            assert!(!table.preferred(category).is_empty(), "{category}");
        }
        assert_eq!(table.fallbacks(), &[ProviderId::Ollama]);
    }
}
