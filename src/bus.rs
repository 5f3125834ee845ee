//! Async message bus — decouples the scheduler from delivery channels.
//!
//! The scheduler talks to the outside world through the [`Messenger`]
//! trait; [`BusMessenger`] is the default implementation, broadcasting
//! outbound reminders to every subscribed channel. The mention-tag syntax
//! lives here because it belongs to the transport, not the scheduler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::reminder::types::Audience;

/// Capacity of the internal channels.
const BUS_CAPACITY: usize = 256;

/// Delivery address of a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub user_id: String,
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub content: String,
}

/// The tag prepended to a fired reminder, controlled by the `who` token of
/// the original request.
pub fn audience_tag(audience: Audience, user_id: &str) -> String {
    match audience {
        Audience::Me => format!("@{user_id} "),
        Audience::Team | Audience::Here | Audience::Room => "@here ".to_string(),
    }
}

/// External messaging collaborator. Any rejection is treated by the
/// scheduler as a logged, non-fatal error.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, envelope: &Envelope, text: &str) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct MessageBus {
    outbound_tx: broadcast::Sender<OutboundMessage>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (outbound_tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { outbound_tx }
    }

    /// Subscribe to outbound messages (each channel gets its own receiver).
    pub fn subscribe_outbound(&self) -> broadcast::Receiver<OutboundMessage> {
        self.outbound_tx.subscribe()
    }

    /// Build a [`Messenger`] handle that publishes onto this bus.
    pub fn messenger(&self) -> BusMessenger {
        BusMessenger {
            tx: self.outbound_tx.clone(),
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct BusMessenger {
    tx: broadcast::Sender<OutboundMessage>,
}

#[async_trait]
impl Messenger for BusMessenger {
    async fn send(&self, envelope: &Envelope, text: &str) -> anyhow::Result<()> {
        // A send error only means no channel is subscribed right now; the
        // reminder is dropped, not an error condition for the scheduler.
        let _ = self.tx.send(OutboundMessage {
            room: envelope.room.clone(),
            thread_id: envelope.thread_id.clone(),
            content: text.to_string(),
        });
        Ok(())
    }
}
