//! Collaborator interfaces the ticket core depends on. Storage, leave
//! tracking and delivery live behind these traits; `sts-db` provides SQL and
//! in-memory implementations.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::account::{Account, AccountId, Pincode};
use crate::domain::connection::{Connection, ConnectionId, NewConnection};
use crate::domain::ticket::{NewTicket, Ticket, TicketId, TicketStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("notification delivery failure: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait AccountQuery: Send + Sync {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, PortError>;

    /// Approved ENGINEER accounts serving `pincode`, in a stable order.
    async fn find_engineers_by_pincode(&self, pincode: Pincode)
        -> Result<Vec<Account>, PortError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>, PortError>;

    async fn count_by_engineer_and_status(
        &self,
        engineer_id: AccountId,
        status: TicketStatus,
    ) -> Result<u64, PortError>;

    async fn exists_by_connection_and_status_in(
        &self,
        connection_id: ConnectionId,
        statuses: &[TicketStatus],
    ) -> Result<bool, PortError>;

    /// Persists a new ticket and returns it with its generated id.
    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, PortError>;

    async fn update(&self, ticket: &Ticket) -> Result<(), PortError>;

    async fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, PortError>;

    async fn count_matching(&self, filter: &TicketFilter) -> Result<u64, PortError>;
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn find_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, PortError>;

    async fn insert(&self, connection: NewConnection) -> Result<Connection, PortError>;

    async fn update(&self, connection: &Connection) -> Result<(), PortError>;
}

#[async_trait]
pub trait LeavePredicate: Send + Sync {
    /// True when the engineer holds an APPROVED leave whose range contains `date`.
    async fn is_on_leave(&self, engineer_id: AccountId, date: NaiveDate)
        -> Result<bool, PortError>;
}

/// Conjunctive ticket filter. Unset fields match everything; an empty
/// `statuses` list matches every status, including unassigned tickets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub user_id: Option<AccountId>,
    pub engineer_id: Option<AccountId>,
    pub pincode: Option<Pincode>,
    pub statuses: Vec<TicketStatus>,
}

impl TicketFilter {
    pub fn for_user(user_id: AccountId) -> Self {
        Self { user_id: Some(user_id), ..Self::default() }
    }

    pub fn for_engineer(engineer_id: AccountId) -> Self {
        Self { engineer_id: Some(engineer_id), ..Self::default() }
    }

    pub fn for_pincode(pincode: Pincode) -> Self {
        Self { pincode: Some(pincode), ..Self::default() }
    }

    pub fn with_statuses(mut self, statuses: &[TicketStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        let user_matches = self.user_id.map_or(true, |id| ticket.user_id == id);
        let engineer_matches = self.engineer_id.map_or(true, |id| ticket.engineer_id == Some(id));
        let pincode_matches = self.pincode.map_or(true, |pincode| ticket.pincode == pincode);
        let status_matches = self.statuses.is_empty()
            || ticket.status.map_or(false, |status| self.statuses.contains(&status));

        user_matches && engineer_matches && pincode_matches && status_matches
    }
}
