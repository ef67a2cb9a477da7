use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::ticket::{ServiceType, TicketId};
use crate::ports::PortError;

/// Customer-facing messages raised by the ticket lifecycle. Wording and
/// delivery belong to the `Notifier` implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    TicketRaised { ticket_id: TicketId, service_type: ServiceType },
    EngineerAssigned { ticket_id: TicketId, engineer_name: String },
    Resolved { ticket_id: TicketId },
    Activated { ticket_id: TicketId, service_type: ServiceType },
    Failed { ticket_id: TicketId },
    Deferred { ticket_id: TicketId },
}

impl Notification {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::TicketRaised { .. } => "notification.ticket_raised",
            Self::EngineerAssigned { .. } => "notification.engineer_assigned",
            Self::Resolved { .. } => "notification.ticket_resolved",
            Self::Activated { .. } => "notification.service_activated",
            Self::Failed { .. } => "notification.ticket_failed",
            Self::Deferred { .. } => "notification.ticket_deferred",
        }
    }

    pub fn ticket_id(&self) -> TicketId {
        match self {
            Self::TicketRaised { ticket_id, .. }
            | Self::EngineerAssigned { ticket_id, .. }
            | Self::Resolved { ticket_id }
            | Self::Activated { ticket_id, .. }
            | Self::Failed { ticket_id }
            | Self::Deferred { ticket_id } => *ticket_id,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, notification: Notification) -> Result<(), PortError>;
}

/// Records every notification as a structured log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, recipient: &str, notification: Notification) -> Result<(), PortError> {
        info!(
            event_name = notification.event_name(),
            ticket_id = notification.ticket_id().0,
            recipient,
            "notification dispatched"
        );
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<Mutex<Vec<(String, Notification)>>>,
}

impl InMemoryNotifier {
    pub fn sent(&self) -> Vec<(String, Notification)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, recipient: &str, notification: Notification) -> Result<(), PortError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push((recipient.to_string(), notification)),
            Err(poisoned) => poisoned.into_inner().push((recipient.to_string(), notification)),
        }
        Ok(())
    }
}
