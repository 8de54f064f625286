//! Conversation-context types and storage trait.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::domain::{CartSummary, Entity, EntityType, Intent, IntentType};

/// Record of a single command turn. Append-only; never edited after the
/// turn completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub timestamp: DateTime<Utc>,
    pub original_text: String,
    pub normalized_text: String,
    pub intent: Intent,
    pub entities: Vec<Entity>,
    pub success: bool,
    pub response: String,
}

/// Per-session statistics derived from the command history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total_commands: usize,
    pub successful_commands: usize,
    pub success_rate: f64,
    pub session_duration_minutes: f64,
    pub most_common_intent: Option<IntentType>,
    pub intent_distribution: HashMap<String, usize>,
}

/// One user's ongoing dialogue state: bounded command history, activity
/// timestamps, and the latest cart snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub command_history: VecDeque<CommandRecord>,
    pub cart_state: Option<CartSummary>,
    pub preferences: HashMap<String, String>,
    pub disambiguation: HashMap<String, String>,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_activity: now,
            command_history: VecDeque::new(),
            cart_state: None,
            preferences: HashMap::new(),
            disambiguation: HashMap::new(),
        }
    }

    /// Refresh the activity timestamp. Never moves backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    pub fn is_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity > timeout
    }

    /// The most recent `count` commands, oldest first.
    pub fn recent_commands(&self, count: usize) -> Vec<&CommandRecord> {
        let start = self.command_history.len().saturating_sub(count);
        self.command_history.iter().skip(start).collect()
    }

    /// Entities from the history, newest first, optionally filtered by type.
    pub fn recent_entities(&self, entity_type: Option<EntityType>, count: usize) -> Vec<Entity> {
        let mut entities = Vec::new();
        for command in self.command_history.iter().rev() {
            for entity in &command.entities {
                if entity_type.is_none() || entity_type == Some(entity.entity_type) {
                    entities.push(entity.clone());
                    if entities.len() >= count {
                        return entities;
                    }
                }
            }
        }
        entities
    }

    pub fn last_successful_command(&self) -> Option<&CommandRecord> {
        self.command_history.iter().rev().find(|c| c.success)
    }

    /// Recent commands of one intent type, newest first.
    pub fn commands_by_intent(&self, intent_type: IntentType, count: usize) -> Vec<&CommandRecord> {
        self.command_history
            .iter()
            .rev()
            .filter(|c| c.intent.intent_type == intent_type)
            .take(count)
            .collect()
    }

    /// Whether a product name was mentioned within the last `window`.
    pub fn mentioned_recently(&self, product_name: &str, window: Duration, now: DateTime<Utc>) -> bool {
        let cutoff = now - window;
        let needle = product_name.to_lowercase();
        for command in self.command_history.iter().rev() {
            if command.timestamp < cutoff {
                break;
            }
            if command.original_text.to_lowercase().contains(&needle) {
                return true;
            }
            if command.entities.iter().any(|e| {
                e.entity_type == EntityType::Product && e.value.to_lowercase().contains(&needle)
            }) {
                return true;
            }
        }
        false
    }

    pub fn statistics(&self) -> SessionStatistics {
        let total_commands = self.command_history.len();
        let successful_commands = self.command_history.iter().filter(|c| c.success).count();
        let success_rate = if total_commands > 0 {
            successful_commands as f64 / total_commands as f64
        } else {
            0.0
        };
        let session_duration_minutes =
            (self.last_activity - self.created_at).num_seconds() as f64 / 60.0;

        let mut intent_distribution: HashMap<String, usize> = HashMap::new();
        let mut most_common: Option<(IntentType, usize)> = None;
        for command in &self.command_history {
            let intent_type = command.intent.intent_type;
            let count = intent_distribution
                .entry(intent_type.to_string())
                .or_insert(0);
            *count += 1;
            if most_common.map_or(true, |(_, n)| *count > n) {
                most_common = Some((intent_type, *count));
            }
        }

        SessionStatistics {
            total_commands,
            successful_commands,
            success_rate,
            session_duration_minutes,
            most_common_intent: most_common.map(|(t, _)| t),
            intent_distribution,
        }
    }
}

/// Aggregate statistics over every live context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStoreStats {
    pub active_sessions: usize,
    pub total_commands: usize,
    pub avg_session_duration_minutes: f64,
    pub avg_commands_per_session: f64,
}

/// Storage for per-session conversation contexts.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Fetch the context for a session, creating it on first access.
    /// Refreshes the activity timestamp. The returned value is a snapshot.
    async fn get_or_create(&self, session_id: &str) -> Result<ConversationContext>;

    /// Fetch a context without creating or touching it.
    async fn get(&self, session_id: &str) -> Option<ConversationContext>;

    /// Refresh a session's activity timestamp.
    async fn update_activity(&self, session_id: &str) -> Result<()>;

    /// Append a command record, FIFO-evicting the oldest at capacity.
    async fn append_command(&self, session_id: &str, record: CommandRecord) -> Result<()>;

    /// Write the latest cart snapshot back into the context.
    async fn update_cart(&self, session_id: &str, summary: CartSummary) -> Result<()>;

    /// Store a user preference.
    async fn set_preference(&self, session_id: &str, key: &str, value: &str) -> Result<()>;

    /// Delete a session's context. Returns whether it existed.
    async fn remove(&self, session_id: &str) -> bool;

    /// Session ids with live contexts.
    async fn active_sessions(&self) -> Vec<String>;

    /// Aggregate statistics over every live context.
    async fn stats(&self) -> ContextStoreStats;

    /// Throttled expiry sweep: deletes every expired context, at most once
    /// per configured interval. Returns the number removed (0 when
    /// throttled).
    async fn sweep_expired(&self) -> usize;

    /// Expiry sweep that ignores the throttle.
    async fn force_sweep(&self) -> usize;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
