//! In-memory context store implementation.

use async_trait::async_trait;
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{CommandRecord, ContextStore, ContextStoreStats, ConversationContext};
use crate::config::ContextConfig;
use crate::domain::CartSummary;

/// An in-memory context store backed by a mutex-protected hash map.
///
/// Contexts are inserted fully formed under the lock, so a half-built
/// context is never visible to a concurrent caller.
pub struct InMemoryContextStore {
    contexts: Mutex<HashMap<String, ConversationContext>>,
    last_sweep: Mutex<DateTime<Utc>>,
    config: ContextConfig,
}

impl InMemoryContextStore {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            contexts: Mutex::new(HashMap::new()),
            last_sweep: Mutex::new(Utc::now()),
            config,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::minutes(self.config.session_timeout_minutes as i64)
    }

    fn sweep_interval(&self) -> Duration {
        Duration::minutes(self.config.sweep_interval_minutes as i64)
    }

    fn sweep_locked(
        contexts: &mut HashMap<String, ConversationContext>,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        let expired: Vec<String> = contexts
            .iter()
            .filter(|(_, ctx)| ctx.is_expired(timeout, now))
            .map(|(id, _)| id.clone())
            .collect();
        for session_id in &expired {
            contexts.remove(session_id);
        }
        if !expired.is_empty() {
            tracing::info!(removed = expired.len(), "Expired contexts swept");
        }
        expired.len()
    }

    /// Run a sweep if the throttle interval has elapsed.
    fn maybe_sweep(&self, now: DateTime<Utc>) -> usize {
        {
            let mut last = self.last_sweep.lock();
            if now - *last < self.sweep_interval() {
                return 0;
            }
            *last = now;
        }
        let mut contexts = self.contexts.lock();
        Self::sweep_locked(&mut contexts, self.timeout(), now)
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get_or_create(&self, session_id: &str) -> Result<ConversationContext> {
        if session_id.is_empty() {
            bail!("session id must not be empty");
        }
        let now = Utc::now();
        self.maybe_sweep(now);

        let mut contexts = self.contexts.lock();
        let context = contexts
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationContext::new(session_id));
        context.touch(now);
        Ok(context.clone())
    }

    async fn get(&self, session_id: &str) -> Option<ConversationContext> {
        self.contexts.lock().get(session_id).cloned()
    }

    async fn update_activity(&self, session_id: &str) -> Result<()> {
        let mut contexts = self.contexts.lock();
        match contexts.get_mut(session_id) {
            Some(context) => {
                context.touch(Utc::now());
                Ok(())
            }
            None => bail!("session not found: {session_id}"),
        }
    }

    async fn append_command(&self, session_id: &str, record: CommandRecord) -> Result<()> {
        let now = Utc::now();
        let mut contexts = self.contexts.lock();
        let context = contexts
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationContext::new(session_id));
        context.touch(now);
        context.command_history.push_back(record);
        while context.command_history.len() > self.config.max_history {
            context.command_history.pop_front();
        }
        Ok(())
    }

    async fn update_cart(&self, session_id: &str, summary: CartSummary) -> Result<()> {
        let now = Utc::now();
        let mut contexts = self.contexts.lock();
        let context = contexts
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationContext::new(session_id));
        context.touch(now);
        context.cart_state = Some(summary);
        Ok(())
    }

    async fn set_preference(&self, session_id: &str, key: &str, value: &str) -> Result<()> {
        let mut contexts = self.contexts.lock();
        match contexts.get_mut(session_id) {
            Some(context) => {
                context
                    .preferences
                    .insert(key.to_string(), value.to_string());
                Ok(())
            }
            None => bail!("session not found: {session_id}"),
        }
    }

    async fn remove(&self, session_id: &str) -> bool {
        self.contexts.lock().remove(session_id).is_some()
    }

    async fn active_sessions(&self) -> Vec<String> {
        self.contexts.lock().keys().cloned().collect()
    }

    async fn stats(&self) -> ContextStoreStats {
        let contexts = self.contexts.lock();
        let active_sessions = contexts.len();
        let total_commands: usize = contexts.values().map(|c| c.command_history.len()).sum();
        let (avg_duration, avg_commands) = if active_sessions > 0 {
            let duration_sum: f64 = contexts
                .values()
                .map(|c| (c.last_activity - c.created_at).num_seconds() as f64 / 60.0)
                .sum();
            (
                duration_sum / active_sessions as f64,
                total_commands as f64 / active_sessions as f64,
            )
        } else {
            (0.0, 0.0)
        };

        ContextStoreStats {
            active_sessions,
            total_commands,
            avg_session_duration_minutes: avg_duration,
            avg_commands_per_session: avg_commands,
        }
    }

    async fn sweep_expired(&self) -> usize {
        self.maybe_sweep(Utc::now())
    }

    async fn force_sweep(&self) -> usize {
        let now = Utc::now();
        *self.last_sweep.lock() = now;
        let mut contexts = self.contexts.lock();
        Self::sweep_locked(&mut contexts, self.timeout(), now)
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CartItem, Entity, EntityType, Intent, IntentType, Product};

    fn test_record(text: &str, intent_type: IntentType, success: bool) -> CommandRecord {
        CommandRecord {
            timestamp: Utc::now(),
            original_text: text.to_string(),
            normalized_text: text.to_lowercase(),
            intent: Intent::new(intent_type, 0.9, Vec::new()),
            entities: vec![Entity::new(EntityType::Product, "shirt", 0.9, (0, 5))],
            success,
            response: "ok".to_string(),
        }
    }

    fn test_product() -> Product {
        Product {
            id: "p1".to_string(),
            name: "red shirt".to_string(),
            category: "clothing".to_string(),
            price: 25.0,
            sizes: vec!["M".to_string()],
            colors: vec!["red".to_string()],
            material: "cotton".to_string(),
            brand: "Acme".to_string(),
            in_stock: true,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn get_or_create_creates_on_first_access() {
        let store = InMemoryContextStore::default();
        let context = store.get_or_create("s1").await.unwrap();
        assert_eq!(context.session_id, "s1");
        assert!(store.get("s1").await.is_some());
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn get_or_create_rejects_empty_session_id() {
        let store = InMemoryContextStore::default();
        assert!(store.get_or_create("").await.is_err());
    }

    #[tokio::test]
    async fn activity_is_monotonic() {
        let store = InMemoryContextStore::default();
        let created = store.get_or_create("s1").await.unwrap();
        store.update_activity("s1").await.unwrap();
        let updated = store.get("s1").await.unwrap();
        assert!(updated.last_activity >= created.last_activity);
    }

    #[tokio::test]
    async fn update_activity_fails_for_missing_session() {
        let store = InMemoryContextStore::default();
        assert!(store.update_activity("nope").await.is_err());
    }

    #[tokio::test]
    async fn history_is_bounded_fifo() {
        let config = ContextConfig {
            max_history: 3,
            ..ContextConfig::default()
        };
        let store = InMemoryContextStore::new(config);
        for i in 0..5 {
            store
                .append_command("s1", test_record(&format!("command {i}"), IntentType::Add, true))
                .await
                .unwrap();
        }

        let context = store.get("s1").await.unwrap();
        assert_eq!(context.command_history.len(), 3);
        assert_eq!(context.command_history[0].original_text, "command 2");
        assert_eq!(context.command_history[2].original_text, "command 4");
    }

    #[tokio::test]
    async fn cart_snapshot_write_back() {
        let store = InMemoryContextStore::default();
        let summary = CartSummary::from_items(vec![CartItem::new(test_product(), 2, None, None)]);
        store.update_cart("s1", summary).await.unwrap();

        let context = store.get("s1").await.unwrap();
        assert_eq!(context.cart_state.unwrap().total_items, 2);
    }

    #[tokio::test]
    async fn recent_entities_filters_by_type() {
        let store = InMemoryContextStore::default();
        store
            .append_command("s1", test_record("add shirt", IntentType::Add, true))
            .await
            .unwrap();

        let context = store.get("s1").await.unwrap();
        let products = context.recent_entities(Some(EntityType::Product), 10);
        assert_eq!(products.len(), 1);
        let colors = context.recent_entities(Some(EntityType::Color), 10);
        assert!(colors.is_empty());
    }

    #[tokio::test]
    async fn last_successful_skips_failures() {
        let store = InMemoryContextStore::default();
        store
            .append_command("s1", test_record("good", IntentType::Add, true))
            .await
            .unwrap();
        store
            .append_command("s1", test_record("bad", IntentType::Remove, false))
            .await
            .unwrap();

        let context = store.get("s1").await.unwrap();
        assert_eq!(
            context.last_successful_command().unwrap().original_text,
            "good"
        );
    }

    #[tokio::test]
    async fn preferences_persist_on_the_context() {
        let store = InMemoryContextStore::default();
        store.get_or_create("s1").await.unwrap();
        store.set_preference("s1", "size", "M").await.unwrap();

        let context = store.get("s1").await.unwrap();
        assert_eq!(context.preferences.get("size").map(String::as_str), Some("M"));
        assert!(store.set_preference("missing", "k", "v").await.is_err());
    }

    #[tokio::test]
    async fn recent_mention_window() {
        let store = InMemoryContextStore::default();
        store
            .append_command("s1", test_record("add a red shirt", IntentType::Add, true))
            .await
            .unwrap();

        let context = store.get("s1").await.unwrap();
        let now = Utc::now();
        assert!(context.mentioned_recently("shirt", Duration::minutes(5), now));
        assert!(!context.mentioned_recently("jeans", Duration::minutes(5), now));
    }

    #[tokio::test]
    async fn force_sweep_removes_expired_contexts() {
        let config = ContextConfig {
            session_timeout_minutes: 30,
            ..ContextConfig::default()
        };
        let store = InMemoryContextStore::new(config);
        store.get_or_create("stale").await.unwrap();
        store.get_or_create("fresh").await.unwrap();

        // Backdate the stale session past the timeout.
        {
            let mut contexts = store.contexts.lock();
            let ctx = contexts.get_mut("stale").unwrap();
            ctx.last_activity = Utc::now() - Duration::minutes(31);
        }

        let removed = store.force_sweep().await;
        assert_eq!(removed, 1);
        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn sweep_is_throttled() {
        let store = InMemoryContextStore::default();
        store.get_or_create("s1").await.unwrap();
        {
            let mut contexts = store.contexts.lock();
            contexts.get_mut("s1").unwrap().last_activity = Utc::now() - Duration::minutes(31);
        }

        // The store was constructed moments ago, so the hourly throttle
        // window has not elapsed and the sweep must not run.
        assert_eq!(store.sweep_expired().await, 0);
        assert!(store.get("s1").await.is_some());

        assert_eq!(store.force_sweep().await, 1);
        assert!(store.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn stats_aggregate_over_sessions() {
        let store = InMemoryContextStore::default();
        store
            .append_command("s1", test_record("one", IntentType::Add, true))
            .await
            .unwrap();
        store
            .append_command("s2", test_record("two", IntentType::Search, true))
            .await
            .unwrap();
        store
            .append_command("s2", test_record("three", IntentType::Add, false))
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.total_commands, 3);
        assert!((stats.avg_commands_per_session - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn session_statistics_tracks_intents() {
        let store = InMemoryContextStore::default();
        for _ in 0..2 {
            store
                .append_command("s1", test_record("add", IntentType::Add, true))
                .await
                .unwrap();
        }
        store
            .append_command("s1", test_record("find", IntentType::Search, false))
            .await
            .unwrap();

        let stats = store.get("s1").await.unwrap().statistics();
        assert_eq!(stats.total_commands, 3);
        assert_eq!(stats.successful_commands, 2);
        assert_eq!(stats.most_common_intent, Some(IntentType::Add));
        assert_eq!(stats.intent_distribution.get("add"), Some(&2));
    }
}
