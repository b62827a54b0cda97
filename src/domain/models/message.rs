use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as produced by the bot swarm.
///
/// This is the domain-side shape; the caching layer never mutates it and
/// only reads the fields needed for the cached representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Chat the message belongs to
    pub chat_id: i64,
    /// Message text
    pub text: String,
    /// Originating bot, if the message was bot-authored
    pub bot_id: Option<i64>,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Delivery id assigned by the messaging platform
    pub telegram_message_id: Option<i64>,
}

/// Wire shape stored in the recent-messages cache.
///
/// Timestamps are stringified as RFC 3339 and absent fields serialize as
/// `null`, so entries written by other processes round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMessage {
    /// Message text
    pub text: String,
    /// Originating bot id, `null` for user-authored messages
    pub bot_id: Option<i64>,
    /// RFC 3339 creation timestamp, `null` when unknown
    pub created_at: Option<String>,
    /// Delivery id assigned by the messaging platform
    pub telegram_message_id: Option<i64>,
}

impl CachedMessage {
    /// Convert a domain message into its cached representation.
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            text: message.text.clone(),
            bot_id: message.bot_id,
            created_at: message.created_at.map(|ts| ts.to_rfc3339()),
            telegram_message_id: message.telegram_message_id,
        }
    }
}

impl From<&ChatMessage> for CachedMessage {
    fn from(message: &ChatMessage) -> Self {
        Self::from_message(message)
    }
}
