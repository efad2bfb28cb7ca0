//! Event types for the ETDQ pipeline
//!
//! Each pipeline stage publishes a typed completion event consumed by the
//! next stage's handler (and by any observer, e.g. the log subscriber).
//! Ordering within one bag's pipeline is enforced by the event payload
//! carrying the full upstream result, not by call-time sequencing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// ETDQ pipeline event types
///
/// Events are broadcast via [`EventBus`] and can be serialized for audit
/// logging or forwarding to a notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Completeness gate passed for a bag
    BagValidated {
        /// Bag name
        bag: String,
        /// Bibliographic record identifier
        mmsid: String,
        /// When validation completed
        timestamp: DateTime<Utc>,
    },

    /// Deposit unit assembled for a bag
    BagAssembled {
        /// Bag name
        bag: String,
        /// Content files retained after side-channel extraction
        content_files: Vec<String>,
        /// Target collection handle
        collection: String,
        /// When assembly completed
        timestamp: DateTime<Utc>,
    },

    /// A bag was isolated into the failure map
    BagFailed {
        /// Bag name
        bag: String,
        /// Human-readable failure reason (surfaced verbatim to operators)
        reason: String,
        /// When the failure was recorded
        timestamp: DateTime<Utc>,
    },

    /// A collection group finished the repository import
    BatchImported {
        /// Collection handle the batch was imported into
        collection: String,
        /// Bag name to assigned repository URL
        handles: Vec<(String, String)>,
        /// When the import completed
        timestamp: DateTime<Utc>,
    },

    /// Catalog electronic-location field updated
    CatalogUrlUpdated {
        /// Bibliographic record identifier
        mmsid: String,
        /// Previous 856 $u value, if any
        old_url: Option<String>,
        /// New repository URL
        new_url: String,
        /// When the catalog update completed
        timestamp: DateTime<Utc>,
    },

    /// Tracking store marked a bag ingested
    StatusRecorded {
        /// Bag name (normalized with source prefix)
        bag: String,
        /// Repository URL recorded
        url: String,
        /// When the status was recorded
        timestamp: DateTime<Utc>,
    },

    /// A stakeholder notification is ready for delivery
    ///
    /// Mail delivery is handled outside this pipeline; subscribers pick
    /// these up from the bus.
    NotificationQueued {
        /// Recipient address
        recipient: String,
        /// Subject line
        subject: String,
        /// Message body
        body: String,
        /// When the notification was queued
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for pipeline events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Pipeline progress must not depend on anyone watching.
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_subscriber_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(PipelineEvent::BagValidated {
            bag: "Smith_2019_9876543210987".to_string(),
            mmsid: "9876543210987".to_string(),
            timestamp: Utc::now(),
        });
        bus.emit_lossy(PipelineEvent::BagFailed {
            bag: "Jones_2018_1234567890123".to_string(),
            reason: "Missing required metadata in Alma - contact cataloging group".to_string(),
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            PipelineEvent::BagValidated { bag, .. } => {
                assert_eq!(bag, "Smith_2019_9876543210987")
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            PipelineEvent::BagFailed { reason, .. } => {
                assert!(reason.contains("Missing required metadata"))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_is_lossy() {
        let bus = EventBus::new(4);
        // Must not error or panic with nobody listening
        bus.emit_lossy(PipelineEvent::StatusRecorded {
            bag: "shareok/Smith_2019_9876543210987".to_string(),
            url: "https://shareok.org/11244/999".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
