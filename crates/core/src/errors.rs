use serde::Serialize;
use thiserror::Error;

use crate::domain::account::{AccountId, Pincode};
use crate::domain::connection::ConnectionId;
use crate::domain::ticket::{TicketId, TicketStatus};
use crate::ports::PortError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown service type `{0}`")]
    UnknownServiceType(String),
    #[error("unknown connection type `{0}`")]
    UnknownConnectionType(String),
    #[error("unknown priority `{0}`")]
    UnknownPriority(String),
    #[error("unknown account role `{0}`")]
    UnknownRole(String),
    #[error("unknown {kind} status `{value}`")]
    UnknownStatus { kind: &'static str, value: String },
    #[error("unknown transition policy `{0}` (expected strict|permissive)")]
    UnknownTransitionPolicy(String),
    #[error("invalid ticket transition from {from} to {to}")]
    InvalidTicketTransition { from: TicketStatus, to: TicketStatus },
}

/// Failure categories callers map to their own status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Conflict,
    InvalidArgument,
    ResourceExhausted,
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid_argument",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "The requested record could not be found.",
            Self::Unauthorized => "You are not allowed to change this ticket.",
            Self::Conflict => "An open ticket already exists for this connection.",
            Self::InvalidArgument => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ResourceExhausted => "No engineer is available right now. Please retry later.",
            Self::Unavailable => "The service is temporarily unavailable. Please retry shortly.",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    #[error("connection {0} not found")]
    ConnectionNotFound(ConnectionId),
    #[error("no engineer is assigned to ticket {0}")]
    EngineerNotAssigned(TicketId),
    #[error("engineer {engineer_id} is not authorized for ticket {ticket_id}")]
    UnauthorizedEngineer { ticket_id: TicketId, engineer_id: AccountId },
    #[error("a ticket for connection {0} is already pending or in progress")]
    TicketAlreadyExists(ConnectionId),
    #[error(
        "priority cannot be derived for service type `{service_type}` and connection type `{connection_type}`"
    )]
    PriorityUnavailable { service_type: String, connection_type: String },
    #[error(
        "ticket {ticket_id} is not eligible for reassignment: status must be DEFERRED or REJECTED, found {status}"
    )]
    InvalidReassignment { ticket_id: TicketId, status: String },
    #[error("no available engineers found in pincode {0}")]
    NoAvailableEngineer(Pincode),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Port(#[from] PortError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TicketNotFound(_)
            | Self::AccountNotFound(_)
            | Self::ConnectionNotFound(_)
            | Self::EngineerNotAssigned(_) => ErrorKind::NotFound,
            Self::UnauthorizedEngineer { .. } => ErrorKind::Unauthorized,
            Self::TicketAlreadyExists(_) => ErrorKind::Conflict,
            Self::PriorityUnavailable { .. }
            | Self::InvalidReassignment { .. }
            | Self::Domain(_) => ErrorKind::InvalidArgument,
            Self::NoAvailableEngineer(_) => ErrorKind::ResourceExhausted,
            Self::Port(_) => ErrorKind::Unavailable,
        }
    }
}
