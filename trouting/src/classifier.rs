//! Heuristic turn classifier.
//!
//! Pure and deterministic: the same message and context always yield the same
//! category. Signals are matched with a fixed rule table; when several
//! categories are signalled the one with the highest [`Category::precedence`]
//! wins.

use std::sync::LazyLock;

use regex::Regex;
use tprovider::{Message, Role};

use crate::Category;

const GREETING_MAX_CHARS: usize = 80;
const SHORT_MESSAGE_CHARS: usize = 100;
const CODE_FENCE: &str = "```";

const SAFETY_PATTERN: &str = r"(?i)\b(?:rm\s+-rf|drop\s+(?:table|database)|delete\s+(?:all|every|my)\b|wipe\s+(?:my|the|all)\b|passwords?|passphrase|credentials?|api[\s_-]?keys?|private\s+key|bank\s+(?:account|transfer)|wire\s+(?:money|transfer)|send\s+money|transfer\s+(?:funds|money)|suicid\w*|self[-\s]?harm|overdose|kill\s+myself)";
const CODING_PATTERN: &str = r"(?i)\bwrite\b.*\b(?:script|function|class|file|test|code)\b|\bcreate\b.*\b(?:project|module|app|api|bot|function|script|class)\b|\brefactor\b|\bdebug\b|\bfix\s+(?:the|this|a)\b|\bimplement\b|\bgenerate\s+(?:code|a)\b|\bcommit\b|\bgit\b|\bdeploy\b|\bcompile\b|\bstack\s*trace\b";
const FILE_EXTENSION_PATTERN: &str =
    r"(?i)\b[\w-]+\.(?:py|ts|tsx|js|jsx|rs|go|sh|java|rb|cpp|toml|ya?ml|json)\b";
const MULTI_STEP_PATTERN: &str = r"(?is)\bstep\s+\d|\bfirst\b.+\bthen\b.+\bfinally\b";
const REASONING_PATTERN: &str = r"(?i)\b(?:plan|planning|strategy|strategi[sz]e|analy[sz]e|analysis|compare|comparison|pros\s+and\s+cons|trade-?offs?|evaluate|think\s+through|reason\s+about|why\s+(?:does|do|is|are|did)|explain\s+(?:why|how))\b";
const PERSONA_PATTERN: &str = r"(?i)\b(?:role-?play|pretend\s+(?:you(?:'re|\s+are)|to\s+be)|act\s+as|stay\s+in\s+character|in\s+character|you\s+are\s+now|speak\s+like|talk\s+like)\b";
const GREETING_PATTERN: &str =
    r"(?i)^(?:hi|hello|hey|thanks?|thank\s+you|ok|okay|cool|great|sure|yes|no|nope|yep)\b";
const CONTINUATION_PATTERN: &str = r"(?i)^(?:continue|go\s+on|keep\s+going|carry\s+on|more|and\s+then|next|what\s+else)[\s.!?…]*$";

static DEFAULT_CLASSIFIER: LazyLock<Classifier> = LazyLock::new(Classifier::new);

/// A heuristic cue found in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    SafetyKeyword,
    CodingKeyword,
    FileExtension,
    CodeFence,
    MultiStep,
    ReasoningKeyword,
    PersonaMarker,
    Greeting,
    Continuation,
}

impl Signal {
    /// Category this cue votes for; `None` for cues that only steer the fallback path.
    pub fn category(self) -> Option<Category> {
        match self {
            Self::SafetyKeyword => Some(Category::SafetySensitive),
            Self::CodingKeyword | Self::FileExtension | Self::CodeFence => Some(Category::Coding),
            Self::MultiStep | Self::ReasoningKeyword => Some(Category::Reasoning),
            Self::PersonaMarker => Some(Category::Persona),
            Self::Greeting | Self::Continuation => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub signals: Vec<Signal>,
    /// Category was taken from an earlier user message.
    pub inherited: bool,
}

pub struct Classifier {
    rules: Vec<(Signal, Regex)>,
    greeting: Option<Regex>,
    continuation: Option<Regex>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        let rules = [
            (Signal::SafetyKeyword, SAFETY_PATTERN),
            (Signal::CodingKeyword, CODING_PATTERN),
            (Signal::FileExtension, FILE_EXTENSION_PATTERN),
            (Signal::MultiStep, MULTI_STEP_PATTERN),
            (Signal::ReasoningKeyword, REASONING_PATTERN),
            (Signal::PersonaMarker, PERSONA_PATTERN),
        ]
        .into_iter()
        .filter_map(|(signal, pattern)| compile(pattern).map(|regex| (signal, regex)))
        .collect();

        Self {
            rules,
            greeting: compile(GREETING_PATTERN),
            continuation: compile(CONTINUATION_PATTERN),
        }
    }

    pub fn classify(&self, message: &str, recent_context: &[Message]) -> Category {
        self.classify_detailed(message, recent_context).category
    }

    pub fn classify_detailed(&self, message: &str, recent_context: &[Message]) -> Classification {
        let trimmed = message.trim();
        let signals = self.category_signals(trimmed);

        if let Some(category) = strongest(&signals) {
            return Classification {
                category,
                signals,
                inherited: false,
            };
        }

        if self.is_continuation(trimmed)
            && let Some(category) = self.inherited_category(recent_context)
        {
            return Classification {
                category,
                signals: vec![Signal::Continuation],
                inherited: true,
            };
        }

        let length = trimmed.chars().count();
        if length < GREETING_MAX_CHARS && matches(&self.greeting, trimmed) {
            return Classification {
                category: Category::Routine,
                signals: vec![Signal::Greeting],
                inherited: false,
            };
        }

        let category = if length < SHORT_MESSAGE_CHARS {
            Category::Routine
        } else {
            Category::Reasoning
        };

        Classification {
            category,
            signals: Vec::new(),
            inherited: false,
        }
    }

    fn category_signals(&self, text: &str) -> Vec<Signal> {
        let mut signals: Vec<Signal> = self
            .rules
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(signal, _)| *signal)
            .collect();

        if text.contains(CODE_FENCE) {
            signals.push(Signal::CodeFence);
        }

        signals
    }

    fn is_continuation(&self, text: &str) -> bool {
        matches(&self.continuation, text)
    }

    fn inherited_category(&self, recent_context: &[Message]) -> Option<Category> {
        let previous = recent_context
            .iter()
            .rev()
            .filter(|message| message.role == Role::User)
            .map(|message| message.content.trim())
            .find(|content| !content.is_empty() && !self.is_continuation(content))?;

        strongest(&self.category_signals(previous))
    }
}

/// Classifies with the built-in rule table.
pub fn classify(message: &str, recent_context: &[Message]) -> Category {
    DEFAULT_CLASSIFIER.classify(message, recent_context)
}

pub fn classify_detailed(message: &str, recent_context: &[Message]) -> Classification {
    DEFAULT_CLASSIFIER.classify_detailed(message, recent_context)
}

fn strongest(signals: &[Signal]) -> Option<Category> {
    signals
        .iter()
        .filter_map(|signal| signal.category())
        .max_by_key(|category| category.precedence())
}

fn matches(regex: &Option<Regex>, text: &str) -> bool {
    regex.as_ref().is_some_and(|regex| regex.is_match(text))
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::warn!(%error, pattern, "skipping classifier rule that failed to compile");
            None
        }
    }
}
