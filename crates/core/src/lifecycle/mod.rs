//! Ticket creation, status updates and engineer reassignment.
//!
//! Every operation resolves what it needs before writing, so a lookup failure
//! never leaves a half-applied change behind. Notifications go out after the
//! write and are best effort: a delivery failure is logged, not returned.

pub mod views;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assignment::{EngineerSelector, PincodeLocks, Selection};
use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::clock::Clock;
use crate::config::AssignmentConfig;
use crate::domain::account::{Account, AccountId, Pincode};
use crate::domain::connection::{ConnectionId, NewConnection};
use crate::domain::ticket::{
    ConnectionType, NewTicket, Priority, ServiceType, Ticket, TicketId, TicketStatus,
    TransitionPolicy,
};
use crate::errors::{DomainError, ServiceError};
use crate::geo::GeoPoint;
use crate::notify::{Notification, Notifier};
use crate::ports::{AccountQuery, ConnectionStore, LeavePredicate, TicketStore};
use crate::priority::assign_priority;

const ACTOR: &str = "ticket-lifecycle";

#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountQuery>,
    pub tickets: Arc<dyn TicketStore>,
    pub connections: Arc<dyn ConnectionStore>,
    pub leave: Arc<dyn LeavePredicate>,
    pub notifier: Arc<dyn Notifier>,
    pub audit: Arc<dyn AuditSink>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub transition_policy: TransitionPolicy,
    pub serialize_by_pincode: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self { transition_policy: TransitionPolicy::Strict, serialize_by_pincode: true }
    }
}

impl From<&AssignmentConfig> for LifecycleOptions {
    fn from(config: &AssignmentConfig) -> Self {
        Self {
            transition_policy: config.transition_policy,
            serialize_by_pincode: config.serialize_by_pincode,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRequest {
    pub user_id: AccountId,
    pub connection_type: String,
    pub validity_months: u32,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRequest {
    pub user_id: AccountId,
    pub connection_id: ConnectionId,
    pub connection_type: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TicketReceipt {
    pub message: String,
    pub ticket: Ticket,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reassignment {
    pub message: String,
    pub previous_engineer: Option<AccountId>,
    pub new_engineer: AccountId,
    pub ticket: Ticket,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineerLocation {
    pub ticket_id: TicketId,
    pub engineer_id: AccountId,
    pub customer: GeoPoint,
    pub engineer: GeoPoint,
    pub distance_km: f64,
}

pub struct TicketLifecycle {
    accounts: Arc<dyn AccountQuery>,
    tickets: Arc<dyn TicketStore>,
    connections: Arc<dyn ConnectionStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    selector: EngineerSelector,
    transition_policy: TransitionPolicy,
    locks: Option<PincodeLocks>,
}

impl TicketLifecycle {
    pub fn new(collaborators: Collaborators, options: LifecycleOptions) -> Self {
        let selector = EngineerSelector::new(
            collaborators.accounts.clone(),
            collaborators.tickets.clone(),
            collaborators.leave,
            collaborators.clock.clone(),
        );

        Self {
            accounts: collaborators.accounts,
            tickets: collaborators.tickets,
            connections: collaborators.connections,
            notifier: collaborators.notifier,
            audit: collaborators.audit,
            clock: collaborators.clock,
            selector,
            transition_policy: options.transition_policy,
            locks: options.serialize_by_pincode.then(PincodeLocks::default),
        }
    }

    pub fn selector(&self) -> &EngineerSelector {
        &self.selector
    }

    /// Creates the connection (INACTIVE) and an installation ticket for it.
    /// A missing engineer does not abort creation: the ticket is stored
    /// without engineer or status and no assignment notice is sent.
    pub async fn raise_installation_ticket(
        &self,
        request: InstallationRequest,
    ) -> Result<TicketReceipt, ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();
        let account = self.require_account(request.user_id).await?;
        let (connection_type, priority) =
            derive_priority(ServiceType::Installation, &request.connection_type)?;

        let connection = self
            .connections
            .insert(NewConnection {
                user_id: account.id,
                connection_type,
                validity_months: request.validity_months,
            })
            .await?;

        let guard = self.lock_pincode(account.pincode).await;
        let selection = self.selector.select(account.location, account.pincode, None).await?;
        let now = self.clock.now();
        let mut draft = NewTicket {
            user_id: account.id,
            connection_id: connection.id,
            connection_type,
            service_type: ServiceType::Installation,
            description: request.description,
            pincode: account.pincode,
            status: None,
            address: account.address.clone(),
            priority,
            engineer_id: None,
            location: account.location,
            assigned_at: None,
            created_at: now,
        };
        match &selection {
            Some(selection) => {
                draft.engineer_id = Some(selection.engineer.id);
                draft.status = Some(TicketStatus::Pending);
                draft.assigned_at = Some(now);
            }
            None => warn!(
                event_name = "ticket.assignment_skipped",
                correlation_id = %correlation_id,
                pincode = account.pincode.0,
                connection_id = connection.id.0,
                "no available engineers; installation ticket stored unassigned"
            ),
        }
        let ticket = self.tickets.insert(draft).await?;
        drop(guard);

        self.record_raised(&correlation_id, &ticket, selection.as_ref());
        self.notify(
            &account.email,
            Notification::TicketRaised {
                ticket_id: ticket.id,
                service_type: ServiceType::Installation,
            },
        )
        .await;
        if let Some(selection) = &selection {
            self.notify_assignment(&account.email, ticket.id, &selection.engineer).await;
        }

        Ok(TicketReceipt {
            message: "Connection Created & Ticket Raised Successfully".to_string(),
            ticket,
        })
    }

    /// Raises a fault ticket. At most one PENDING, DEFERRED or IN_PROGRESS
    /// ticket may exist per connection, and an engineer is required up front.
    ///
    /// The active-ticket check runs under the customer's pincode lock, so two
    /// raises on one connection in this process cannot both pass it. A
    /// duplicate is still reported before an unknown account.
    pub async fn raise_fault_ticket(
        &self,
        request: FaultRequest,
    ) -> Result<TicketReceipt, ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();
        let account = self.accounts.find_by_id(request.user_id).await?;
        let guard = match &account {
            Some(account) => self.lock_pincode(account.pincode).await,
            None => None,
        };

        let already_open = self
            .tickets
            .exists_by_connection_and_status_in(request.connection_id, &TicketStatus::ACTIVE)
            .await?;
        if already_open {
            self.audit.emit(
                self.event(None, &correlation_id, "ticket.raise_rejected", AuditOutcome::Rejected)
                    .with_metadata("connection_id", request.connection_id.to_string())
                    .with_metadata("reason", "active_ticket_exists"),
            );
            return Err(ServiceError::TicketAlreadyExists(request.connection_id));
        }

        let account = account.ok_or(ServiceError::AccountNotFound(request.user_id))?;
        let (connection_type, priority) =
            derive_priority(ServiceType::Fault, &request.connection_type)?;

        let selection = self
            .selector
            .select(account.location, account.pincode, None)
            .await?
            .ok_or(ServiceError::NoAvailableEngineer(account.pincode))?;
        let now = self.clock.now();
        let ticket = self
            .tickets
            .insert(NewTicket {
                user_id: account.id,
                connection_id: request.connection_id,
                connection_type,
                service_type: ServiceType::Fault,
                description: request.description,
                pincode: account.pincode,
                status: Some(TicketStatus::Pending),
                address: account.address.clone(),
                priority,
                engineer_id: Some(selection.engineer.id),
                location: account.location,
                assigned_at: Some(now),
                created_at: now,
            })
            .await?;
        drop(guard);

        self.record_raised(&correlation_id, &ticket, Some(&selection));
        self.notify(
            &account.email,
            Notification::TicketRaised { ticket_id: ticket.id, service_type: ServiceType::Fault },
        )
        .await;
        self.notify_assignment(&account.email, ticket.id, &selection.engineer).await;

        Ok(TicketReceipt { message: "Ticket For Fault Raised Successfully".to_string(), ticket })
    }

    /// Applies a status change requested by the ticket's assigned engineer.
    /// COMPLETED activates the connection; COMPLETED, FAILED and DEFERRED notify the customer.
    pub async fn update_status(
        &self,
        ticket_id: TicketId,
        engineer_id: AccountId,
        status: TicketStatus,
    ) -> Result<Ticket, ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();
        let mut ticket = self.require_ticket(ticket_id).await?;

        if !ticket.is_assigned_to(engineer_id) {
            warn!(
                event_name = "ticket.update_unauthorized",
                correlation_id = %correlation_id,
                ticket_id = ticket_id.0,
                engineer_id = engineer_id.0,
                "engineer tried to update a ticket assigned to someone else"
            );
            self.audit.emit(
                self.event(
                    Some(ticket_id),
                    &correlation_id,
                    "ticket.status_update_rejected",
                    AuditOutcome::Rejected,
                )
                .with_metadata("engineer_id", engineer_id.to_string())
                .with_metadata("reason", "unauthorized_engineer"),
            );
            return Err(ServiceError::UnauthorizedEngineer { ticket_id, engineer_id });
        }

        let current = ticket.status.unwrap_or(TicketStatus::Pending);
        if !self.transition_policy.permits(current, status) {
            self.audit.emit(
                self.event(
                    Some(ticket_id),
                    &correlation_id,
                    "ticket.status_update_rejected",
                    AuditOutcome::Rejected,
                )
                .with_metadata("from", current.as_str())
                .with_metadata("to", status.as_str())
                .with_metadata("reason", "invalid_transition"),
            );
            return Err(DomainError::InvalidTicketTransition { from: current, to: status }.into());
        }

        let account = self.require_account(ticket.user_id).await?;
        let mut connection = match status {
            TicketStatus::Completed => Some(
                self.connections
                    .find_by_id(ticket.connection_id)
                    .await?
                    .ok_or(ServiceError::ConnectionNotFound(ticket.connection_id))?,
            ),
            _ => None,
        };

        let now = self.clock.now();
        ticket.set_status(status, now);
        self.tickets.update(&ticket).await?;
        info!(
            event_name = "ticket.status_updated",
            correlation_id = %correlation_id,
            ticket_id = ticket_id.0,
            engineer_id = engineer_id.0,
            from = current.as_str(),
            to = status.as_str(),
            "ticket status updated"
        );
        self.audit.emit(
            self.event(
                Some(ticket_id),
                &correlation_id,
                "ticket.status_updated",
                AuditOutcome::Success,
            )
            .with_metadata("engineer_id", engineer_id.to_string())
            .with_metadata("from", current.as_str())
            .with_metadata("to", status.as_str()),
        );

        if let Some(connection) = connection.as_mut() {
            connection.activate(now);
            self.connections.update(connection).await?;
            info!(
                event_name = "connection.activated",
                correlation_id = %correlation_id,
                connection_id = connection.id.0,
                expiry_date = ?connection.expiry_date,
                "connection activated on ticket completion"
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(ticket_id),
                    correlation_id.as_str(),
                    "connection.activated",
                    AuditCategory::Connection,
                    ACTOR,
                    AuditOutcome::Success,
                    now,
                )
                .with_metadata("connection_id", connection.id.to_string()),
            );
        }

        let notification = match (status, ticket.service_type) {
            (TicketStatus::Completed, ServiceType::Installation) => Some(Notification::Activated {
                ticket_id,
                service_type: ServiceType::Installation,
            }),
            (TicketStatus::Completed, ServiceType::Fault) => {
                Some(Notification::Resolved { ticket_id })
            }
            (TicketStatus::Failed, _) => Some(Notification::Failed { ticket_id }),
            (TicketStatus::Deferred, _) => Some(Notification::Deferred { ticket_id }),
            _ => None,
        };
        if let Some(notification) = notification {
            self.notify(&account.email, notification).await;
        }

        Ok(ticket)
    }

    /// Moves a DEFERRED or REJECTED ticket to a different engineer in the same pincode.
    pub async fn reassign_engineer(&self, ticket_id: TicketId) -> Result<Reassignment, ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "ticket.reassign_requested",
            correlation_id = %correlation_id,
            ticket_id = ticket_id.0,
            "reassigning engineer"
        );
        let ticket = self.require_ticket(ticket_id).await?;

        if !ticket.status.is_some_and(|status| status.is_reassignable()) {
            return Err(ServiceError::InvalidReassignment {
                ticket_id,
                status: ticket.status_label().to_string(),
            });
        }

        let guard = self.lock_pincode(ticket.pincode).await;
        // Re-read under the lock so a concurrent reassignment is not overwritten.
        let mut ticket = self.require_ticket(ticket_id).await?;
        if !ticket.status.is_some_and(|status| status.is_reassignable()) {
            return Err(ServiceError::InvalidReassignment {
                ticket_id,
                status: ticket.status_label().to_string(),
            });
        }
        let previous_engineer = ticket.engineer_id;

        let Some(selection) =
            self.selector.select(ticket.location, ticket.pincode, previous_engineer).await?
        else {
            warn!(
                event_name = "ticket.reassign_failed",
                correlation_id = %correlation_id,
                ticket_id = ticket_id.0,
                pincode = ticket.pincode.0,
                "no suitable alternative engineer"
            );
            return Err(ServiceError::NoAvailableEngineer(ticket.pincode));
        };

        let new_engineer = selection.engineer.id;
        ticket.assign(new_engineer, self.clock.now());
        self.tickets.update(&ticket).await?;
        drop(guard);

        let previous_label =
            previous_engineer.map(|id| id.to_string()).unwrap_or_else(|| "none".to_string());
        info!(
            event_name = "ticket.reassigned",
            correlation_id = %correlation_id,
            ticket_id = ticket_id.0,
            previous_engineer = %previous_label,
            new_engineer = new_engineer.0,
            "ticket reassigned"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(ticket_id),
                correlation_id.as_str(),
                "ticket.reassigned",
                AuditCategory::Assignment,
                ACTOR,
                AuditOutcome::Success,
                self.clock.now(),
            )
            .with_metadata("previous_engineer", previous_label.clone())
            .with_metadata("new_engineer", new_engineer.to_string()),
        );

        match self.accounts.find_by_id(ticket.user_id).await {
            Ok(Some(account)) => {
                self.notify_assignment(&account.email, ticket_id, &selection.engineer).await
            }
            Ok(None) => warn!(
                event_name = "notification.skipped",
                ticket_id = ticket_id.0,
                user_id = ticket.user_id.0,
                "ticket owner not found; assignment notice skipped"
            ),
            Err(error) => warn!(
                event_name = "notification.skipped",
                ticket_id = ticket_id.0,
                error = %error,
                "could not load ticket owner; assignment notice skipped"
            ),
        }

        Ok(Reassignment {
            message: format!(
                "Ticket {ticket_id} successfully reassigned from engineer {previous_label} to engineer {new_engineer} in pincode {}",
                ticket.pincode
            ),
            previous_engineer,
            new_engineer,
            ticket,
        })
    }

    /// Customer and assigned-engineer coordinates for a ticket, with the distance between them.
    pub async fn preview_engineer_location(
        &self,
        ticket_id: TicketId,
    ) -> Result<EngineerLocation, ServiceError> {
        let ticket = self.require_ticket(ticket_id).await?;
        let engineer_id = ticket.engineer_id.ok_or(ServiceError::EngineerNotAssigned(ticket_id))?;
        let engineer = self.require_account(engineer_id).await?;

        Ok(EngineerLocation {
            ticket_id,
            engineer_id,
            customer: ticket.location,
            engineer: engineer.location,
            distance_km: ticket.location.distance_km_to(&engineer.location),
        })
    }

    async fn require_ticket(&self, ticket_id: TicketId) -> Result<Ticket, ServiceError> {
        self.tickets.find_by_id(ticket_id).await?.ok_or(ServiceError::TicketNotFound(ticket_id))
    }

    async fn require_account(&self, account_id: AccountId) -> Result<Account, ServiceError> {
        self.accounts.find_by_id(account_id).await?.ok_or(ServiceError::AccountNotFound(account_id))
    }

    async fn lock_pincode(&self, pincode: Pincode) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(pincode).await),
            None => None,
        }
    }

    fn event(
        &self,
        ticket_id: Option<TicketId>,
        correlation_id: &str,
        event_type: &str,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent::new(
            ticket_id,
            correlation_id,
            event_type,
            AuditCategory::Ticket,
            ACTOR,
            outcome,
            self.clock.now(),
        )
    }

    fn record_raised(&self, correlation_id: &str, ticket: &Ticket, selection: Option<&Selection>) {
        info!(
            event_name = "ticket.raised",
            correlation_id,
            ticket_id = ticket.id.0,
            service_type = ticket.service_type.as_str(),
            priority = ticket.priority.as_str(),
            pincode = ticket.pincode.0,
            engineer_id = ticket.engineer_id.map(|id| id.0),
            "ticket raised"
        );

        let mut event = self
            .event(Some(ticket.id), correlation_id, "ticket.raised", AuditOutcome::Success)
            .with_metadata("service_type", ticket.service_type.as_str())
            .with_metadata("priority", ticket.priority.as_str());
        if let Some(selection) = selection {
            event = event
                .with_metadata("engineer_id", selection.engineer.id.to_string())
                .with_metadata("workload", selection.workload.to_string())
                .with_metadata("tie_group_size", selection.tie_group_size.to_string());
        }
        self.audit.emit(event);
    }

    async fn notify_assignment(&self, recipient: &str, ticket_id: TicketId, engineer: &Account) {
        self.notify(
            recipient,
            Notification::EngineerAssigned { ticket_id, engineer_name: engineer.full_name() },
        )
        .await;
    }

    async fn notify(&self, recipient: &str, notification: Notification) {
        let event_name = notification.event_name();
        let ticket_id = notification.ticket_id();
        if let Err(error) = self.notifier.send(recipient, notification).await {
            warn!(
                event_name = "notification.failed",
                notification = event_name,
                ticket_id = ticket_id.0,
                error = %error,
                "notification delivery failed"
            );
        }
    }
}

fn derive_priority(
    service_type: ServiceType,
    connection_type: &str,
) -> Result<(ConnectionType, Priority), ServiceError> {
    let unavailable = || ServiceError::PriorityUnavailable {
        service_type: service_type.as_str().to_string(),
        connection_type: connection_type.to_string(),
    };
    let priority =
        assign_priority(Some(service_type.as_str()), Some(connection_type)).ok_or_else(unavailable)?;
    let connection_type = connection_type.parse::<ConnectionType>().map_err(|_| unavailable())?;
    Ok((connection_type, priority))
}
