//! Per-conversation turn serialisation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tcommon::ConversationId;
use tokio::sync::{Mutex as TurnMutex, OwnedMutexGuard};

#[derive(Debug)]
struct LockEntry {
    lock: Arc<TurnMutex<()>>,
    /// Turns holding or queued for the lock.
    users: usize,
}

type LockMap = HashMap<ConversationId, LockEntry>;

/// Queues turns for the same conversation behind each other in arrival
/// order; distinct conversations never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct ConversationLocks {
    entries: Arc<Mutex<LockMap>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the conversation's turn. Dropping the future while it waits
    /// gives up its place in the queue.
    pub async fn acquire(&self, conversation_id: &ConversationId) -> ConversationGuard {
        let (lock, claim) = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = entries
                .entry(conversation_id.clone())
                .or_insert_with(|| LockEntry {
                    lock: Arc::new(TurnMutex::new(())),
                    users: 0,
                });
            entry.users += 1;

            let claim = Claim {
                conversation_id: conversation_id.clone(),
                entries: Arc::clone(&self.entries),
            };
            (Arc::clone(&entry.lock), claim)
        };

        let guard = lock.lock_owned().await;
        ConversationGuard {
            _turn: guard,
            claim,
        }
    }

    /// Conversations with a running or queued turn.
    pub fn active(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One turn's interest in a conversation entry, released on drop whether or
/// not the lock was ever acquired.
#[derive(Debug)]
struct Claim {
    conversation_id: ConversationId,
    entries: Arc<Mutex<LockMap>>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = match entries.get_mut(&self.conversation_id) {
            Some(entry) => {
                entry.users = entry.users.saturating_sub(1);
                entry.users == 0
            }
            None => false,
        };
        if idle {
            entries.remove(&self.conversation_id);
        }
    }
}

// Field order matters: the turn lock is released before the claim.
#[derive(Debug)]
pub struct ConversationGuard {
    _turn: OwnedMutexGuard<()>,
    claim: Claim,
}

impl ConversationGuard {
    pub fn conversation_id(&self) -> &ConversationId {
        &self.claim.conversation_id
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::FutureExt;

    use super::*;

    #[tokio::test]
    async fn same_conversation_turns_run_one_at_a_time() {
        let locks = ConversationLocks::new();
        let conversation = ConversationId::new("c1");

        let first = locks.acquire(&conversation).await;
        let waiting = {
            let locks = locks.clone();
            let conversation = conversation.clone();
            tokio::spawn(async move { locks.acquire(&conversation).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(first);
        let second = waiting.await.expect("queued turn should acquire");
        assert_eq!(second.conversation_id(), &conversation);
    }

    #[tokio::test]
    async fn distinct_conversations_do_not_block() {
        let locks = ConversationLocks::new();
        let _a = locks.acquire(&ConversationId::new("a")).await;
        let _b = locks.acquire(&ConversationId::new("b")).await;
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn abandoned_waiter_does_not_leak_its_entry() {
        let locks = ConversationLocks::new();
        let conversation = ConversationId::new("c1");

        let first = locks.acquire(&conversation).await;
        let mut waiting = Box::pin(locks.acquire(&conversation));
        assert!(waiting.as_mut().now_or_never().is_none());

        drop(first);
        assert_eq!(locks.active(), 1);

        drop(waiting);
        assert_eq!(locks.active(), 0);

        let again = locks.acquire(&conversation).await;
        assert_eq!(again.conversation_id(), &conversation);
    }

    #[tokio::test]
    async fn idle_entries_are_removed() {
        let locks = ConversationLocks::new();
        {
            let _guard = locks.acquire(&ConversationId::new("c1")).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }
}
