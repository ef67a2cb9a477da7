use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::{AccountId, Pincode};
use crate::domain::connection::ConnectionId;
use crate::errors::DomainError;
use crate::geo::GeoPoint;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(pub i64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Deferred,
    Rejected,
}

impl TicketStatus {
    /// Statuses that block a second fault ticket on the same connection.
    pub const ACTIVE: [TicketStatus; 3] = [Self::Pending, Self::Deferred, Self::InProgress];

    /// Statuses a ticket must be in before its engineer can be replaced.
    pub const REASSIGNABLE: [TicketStatus; 2] = [Self::Deferred, Self::Rejected];

    /// Closed statuses shown in ticket history views.
    pub const CLOSED: [TicketStatus; 2] = [Self::Completed, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Deferred => "DEFERRED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_reassignable(&self) -> bool {
        Self::REASSIGNABLE.contains(self)
    }

    /// Transitions an assigned engineer may request. Moving a DEFERRED or
    /// REJECTED ticket back to PENDING is reserved for reassignment.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;

        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Rejected)
                | (Pending, Deferred)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Deferred)
                | (Deferred, InProgress)
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "DEFERRED" => Ok(Self::Deferred),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(DomainError::UnknownStatus { kind: "ticket", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Installation,
    Fault,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installation => "INSTALLATION",
            Self::Fault => "FAULT",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INSTALLATION" => Ok(Self::Installation),
            "FAULT" => Ok(Self::Fault),
            _ => Err(DomainError::UnknownServiceType(value.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    Wifi,
    Dth,
    Landline,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wifi => "WIFI",
            Self::Dth => "DTH",
            Self::Landline => "LANDLINE",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WIFI" => Ok(Self::Wifi),
            "DTH" => Ok(Self::Dth),
            "LANDLINE" => Ok(Self::Landline),
            _ => Err(DomainError::UnknownConnectionType(value.to_string())),
        }
    }
}

/// Ticket priority, P1 most urgent. Ordering follows urgency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::P5 => "P5",
            Self::P6 => "P6",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            "P4" => Ok(Self::P4),
            "P5" => Ok(Self::P5),
            "P6" => Ok(Self::P6),
            _ => Err(DomainError::UnknownPriority(value.to_string())),
        }
    }
}

/// How strictly engineer-requested status changes are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    #[default]
    Strict,
    Permissive,
}

impl FromStr for TransitionPolicy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(DomainError::UnknownTransitionPolicy(other.to_string())),
        }
    }
}

impl TransitionPolicy {
    pub fn permits(&self, from: TicketStatus, to: TicketStatus) -> bool {
        match self {
            Self::Strict => from.can_transition_to(to),
            Self::Permissive => true,
        }
    }
}

/// A ticket that has not been persisted yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub user_id: AccountId,
    pub connection_id: ConnectionId,
    pub connection_type: ConnectionType,
    pub service_type: ServiceType,
    pub description: String,
    pub pincode: Pincode,
    pub status: Option<TicketStatus>,
    pub address: String,
    pub priority: Priority,
    pub engineer_id: Option<AccountId>,
    pub location: GeoPoint,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewTicket {
    pub fn with_id(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            user_id: self.user_id,
            connection_id: self.connection_id,
            connection_type: self.connection_type,
            service_type: self.service_type,
            description: self.description,
            pincode: self.pincode,
            status: self.status,
            address: self.address,
            priority: self.priority,
            engineer_id: self.engineer_id,
            location: self.location,
            assigned_at: self.assigned_at,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// A persisted service request. `status` is `None` while an installation
/// ticket is still waiting for an engineer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub user_id: AccountId,
    pub connection_id: ConnectionId,
    pub connection_type: ConnectionType,
    pub service_type: ServiceType,
    pub description: String,
    pub pincode: Pincode,
    pub status: Option<TicketStatus>,
    pub address: String,
    pub priority: Priority,
    pub engineer_id: Option<AccountId>,
    pub location: GeoPoint,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_assigned_to(&self, engineer_id: AccountId) -> bool {
        self.engineer_id == Some(engineer_id)
    }

    pub fn status_label(&self) -> &'static str {
        self.status.as_ref().map(TicketStatus::as_str).unwrap_or("UNASSIGNED")
    }

    /// Hands the ticket to `engineer_id` and resets it to PENDING.
    pub fn assign(&mut self, engineer_id: AccountId, now: DateTime<Utc>) {
        self.engineer_id = Some(engineer_id);
        self.status = Some(TicketStatus::Pending);
        self.assigned_at = Some(now);
        self.updated_at = Some(now);
    }

    pub fn set_status(&mut self, status: TicketStatus, now: DateTime<Utc>) {
        self.status = Some(status);
        self.updated_at = Some(now);
    }
}
