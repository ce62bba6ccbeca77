//! Per-chat conversation history for the optional memory mode.
//!
//! Chats are keyed by the transport's chat id. Each keeps at most `max_turns` exchanges
//! and is forgotten once idle longer than `idle_ttl`.

use crate::llm::ChatTurn;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Conversation {
    turns: Vec<ChatTurn>,
    last_active: Instant,
}

/// In-memory store: chat id -> ordered turns.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<RwLock<HashMap<String, Conversation>>>,
    max_turns: usize,
    idle_ttl: Duration,
}

impl ConversationStore {
    pub fn new(max_turns: usize, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_turns,
            idle_ttl,
        }
    }

    /// History for a chat, oldest first. An expired chat is dropped and yields nothing.
    pub async fn history(&self, chat_id: &str) -> Vec<ChatTurn> {
        let mut g = self.inner.write().await;
        match g.get(chat_id) {
            Some(c) if c.last_active.elapsed() > self.idle_ttl => {
                log::debug!("conversation {} expired", chat_id);
                g.remove(chat_id);
                Vec::new()
            }
            Some(c) => c.turns.clone(),
            None => Vec::new(),
        }
    }

    /// Append one exchange, dropping the oldest exchanges beyond the cap.
    pub async fn record(&self, chat_id: &str, user_text: &str, reply: &str) {
        if self.max_turns == 0 {
            return;
        }
        let mut g = self.inner.write().await;
        let conv = g.entry(chat_id.to_string()).or_insert_with(|| Conversation {
            turns: Vec::new(),
            last_active: Instant::now(),
        });
        conv.turns.push(ChatTurn::user(user_text));
        conv.turns.push(ChatTurn::model(reply));
        let limit = self.max_turns * 2;
        if conv.turns.len() > limit {
            let excess = conv.turns.len() - limit;
            conv.turns.drain(..excess);
        }
        conv.last_active = Instant::now();
    }

    /// Drop every idle chat; returns how many were removed.
    pub async fn prune(&self) -> usize {
        let mut g = self.inner.write().await;
        let before = g.len();
        g.retain(|_, c| c.last_active.elapsed() <= self.idle_ttl);
        before - g.len()
    }

    /// Prune every `every` on the current runtime. The task ends once the store is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let inner: Weak<RwLock<HashMap<String, Conversation>>> = Arc::downgrade(&self.inner);
        let idle_ttl = self.idle_ttl;
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let mut g = inner.write().await;
                let before = g.len();
                g.retain(|_, c| c.last_active.elapsed() <= idle_ttl);
                let removed = before - g.len();
                if removed > 0 {
                    log::debug!("swept {} idle conversation(s)", removed);
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_only_latest_exchanges() {
        let store = ConversationStore::new(2, Duration::from_secs(60));
        store.record("c1", "one", "1").await;
        store.record("c1", "two", "2").await;
        store.record("c1", "three", "3").await;
        let h = store.history("c1").await;
        assert_eq!(
            h,
            vec![
                ChatTurn::user("two"),
                ChatTurn::model("2"),
                ChatTurn::user("three"),
                ChatTurn::model("3"),
            ]
        );
        assert!(store.history("c2").await.is_empty());
    }

    #[tokio::test]
    async fn idle_chats_expire() {
        let store = ConversationStore::new(5, Duration::from_millis(20));
        store.record("c1", "hi", "hello").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.history("c1").await.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn prune_removes_idle_chats() {
        let store = ConversationStore::new(5, Duration::from_millis(20));
        store.record("old", "hi", "hello").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.record("new", "hi", "hello").await;
        assert_eq!(store.prune().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn sweeper_forgets_chats_nobody_reads_again() {
        let store = ConversationStore::new(5, Duration::from_millis(5));
        let sweeper = store.spawn_sweeper(Duration::from_millis(10));
        for i in 0..500 {
            store.record(&format!("chat-{}", i), "hi", "hello").await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_empty().await);
        sweeper.abort();
    }

    #[tokio::test]
    async fn sweeper_stops_with_the_store() {
        let store = ConversationStore::new(5, Duration::from_millis(5));
        let sweeper = store.spawn_sweeper(Duration::from_millis(5));
        drop(store);
        tokio::time::timeout(Duration::from_secs(2), sweeper)
            .await
            .expect("sweeper should exit")
            .unwrap();
    }

    #[tokio::test]
    async fn zero_cap_records_nothing() {
        let store = ConversationStore::new(0, Duration::from_secs(60));
        store.record("c1", "hi", "hello").await;
        assert!(store.is_empty().await);
    }
}
