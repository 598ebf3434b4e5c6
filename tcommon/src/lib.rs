//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use tcommon::{ConversationId, MetadataMap, TurnId};
//!
//! let conversation = ConversationId::from("chat-1");
//! let turn = TurnId::new("turn-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("channel".to_string(), "telegram".to_string());
//!
//! assert_eq!(conversation.as_str(), "chat-1");
//! assert_eq!(turn.to_string(), "turn-1");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use tcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Conversation and turn identifier newtypes.
    //!
    //! ```rust
    //! use tcommon::{ConversationId, TurnId};
    //!
    //! let conversation = ConversationId::new("chat-42");
    //! let turn = TurnId::from("chat-42/7");
    //!
    //! assert_eq!(conversation.to_string(), "chat-42");
    //! assert_eq!(turn.as_str(), "chat-42/7");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ConversationId(String);

    impl ConversationId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for ConversationId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for ConversationId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for ConversationId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    /// Identifies one turn within a conversation, mostly for log correlation.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct TurnId(String);

    impl TurnId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        /// Builds `<conversation>/<sequence>`.
        pub fn for_sequence(conversation: &ConversationId, sequence: u64) -> Self {
            Self(format!("{conversation}/{sequence}"))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for TurnId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for TurnId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for TurnId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod clock {
    //! Injectable monotonic time source.
    //!
    //! ```rust
    //! use std::time::Duration;
    //! use tcommon::{Clock, ManualClock};
    //!
    //! let clock = ManualClock::new();
    //! let start = clock.now();
    //! clock.advance(Duration::from_secs(5));
    //! assert_eq!(clock.now() - start, Duration::from_secs(5));
    //! ```

    use std::sync::{Mutex, PoisonError};
    use std::time::{Duration, Instant};

    pub trait Clock: Send + Sync {
        fn now(&self) -> Instant;
    }

    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> Instant {
            Instant::now()
        }
    }

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

pub mod registry {
    //! Generic registry map wrapper used by runtime registries.
    //!
    //! ```rust
    //! use tcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.items.values()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ConversationId, MetadataMap, TurnId};
pub use future::BoxFuture;
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Clock, ConversationId, ManualClock, Registry, TurnId};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let conversation = ConversationId::new("chat-1");
        let turn = TurnId::for_sequence(&conversation, 3);

        assert_eq!(conversation.as_str(), "chat-1");
        assert_eq!(turn.as_str(), "chat-1/3");
        assert_eq!(conversation.to_string(), "chat-1");
    }

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        let first = clock.now();
        assert_eq!(clock.now(), first);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - first, Duration::from_millis(250));
    }

    #[test]
    fn generic_registry_basic_lifecycle() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert("alpha".to_string(), 1_u32);
        assert_eq!(registry.get("alpha"), Some(&1));
        assert!(registry.contains_key("alpha"));
        assert_eq!(registry.keys().count(), 1);

        let removed = registry.remove("alpha");
        assert_eq!(removed, Some(1));
        assert!(registry.is_empty());
    }
}
