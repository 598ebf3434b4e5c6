use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task type assigned to a turn. Fixed once the turn starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Routine,
    Reasoning,
    Coding,
    SafetySensitive,
    Persona,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Routine,
        Self::Reasoning,
        Self::Coding,
        Self::SafetySensitive,
        Self::Persona,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Reasoning => "reasoning",
            Self::Coding => "coding",
            Self::SafetySensitive => "safety-sensitive",
            Self::Persona => "persona",
        }
    }

    /// Pinned turns stay on the providers the routing table names for them
    /// and never fall through to an arbitrary healthy provider.
    pub fn is_pinned(self) -> bool {
        matches!(self, Self::SafetySensitive)
    }

    /// Higher wins when several categories are signalled at once.
    pub fn precedence(self) -> u8 {
        match self {
            Self::SafetySensitive => 4,
            Self::Coding => 3,
            Self::Reasoning => 2,
            Self::Persona => 1,
            Self::Routine => 0,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "routine" => Ok(Self::Routine),
            "reasoning" => Ok(Self::Reasoning),
            "coding" => Ok(Self::Coding),
            "safety-sensitive" | "safety" => Ok(Self::SafetySensitive),
            "persona" => Ok(Self::Persona),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}
