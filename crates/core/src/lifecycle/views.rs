use std::sync::Arc;

use crate::domain::account::{AccountId, Pincode};
use crate::domain::ticket::{Ticket, TicketStatus};
use crate::errors::ServiceError;
use crate::ports::{TicketFilter, TicketStore};

/// Read-only ticket listings for customer, engineer and pincode dashboards.
#[derive(Clone)]
pub struct TicketViews {
    tickets: Arc<dyn TicketStore>,
}

impl TicketViews {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    pub async fn active_tickets_for_user(
        &self,
        user_id: AccountId,
    ) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_user(user_id).with_statuses(&TicketStatus::ACTIVE)).await
    }

    pub async fn history_for_user(&self, user_id: AccountId) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_user(user_id).with_statuses(&TicketStatus::CLOSED)).await
    }

    pub async fn engineer_queue(&self, engineer_id: AccountId) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_engineer(engineer_id).with_statuses(&[TicketStatus::Pending]))
            .await
    }

    pub async fn engineer_in_progress(
        &self,
        engineer_id: AccountId,
    ) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_engineer(engineer_id).with_statuses(&[TicketStatus::InProgress]))
            .await
    }

    pub async fn engineer_history(
        &self,
        engineer_id: AccountId,
    ) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_engineer(engineer_id).with_statuses(&TicketStatus::CLOSED)).await
    }

    /// IN_PROGRESS tickets in a pincode, most urgent first. Equal priorities keep store order.
    pub async fn pincode_backlog(&self, pincode: Pincode) -> Result<Vec<Ticket>, ServiceError> {
        let mut tickets = self
            .list(TicketFilter::for_pincode(pincode).with_statuses(&[TicketStatus::InProgress]))
            .await?;
        tickets.sort_by_key(|ticket| ticket.priority);
        Ok(tickets)
    }

    pub async fn pincode_by_status(
        &self,
        pincode: Pincode,
        status: TicketStatus,
    ) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_pincode(pincode).with_statuses(&[status])).await
    }

    /// COMPLETED and FAILED tickets in a pincode, for the admin dashboard.
    pub async fn pincode_history(&self, pincode: Pincode) -> Result<Vec<Ticket>, ServiceError> {
        self.list(TicketFilter::for_pincode(pincode).with_statuses(&TicketStatus::CLOSED)).await
    }

    pub async fn count_by_status_and_pincode(
        &self,
        status: TicketStatus,
        pincode: Pincode,
    ) -> Result<u64, ServiceError> {
        let filter = TicketFilter::for_pincode(pincode).with_statuses(&[status]);
        Ok(self.tickets.count_matching(&filter).await?)
    }

    /// Every stored ticket, unassigned installations included.
    pub async fn total_ticket_count(&self) -> Result<u64, ServiceError> {
        Ok(self.tickets.count_matching(&TicketFilter::default()).await?)
    }

    async fn list(&self, filter: TicketFilter) -> Result<Vec<Ticket>, ServiceError> {
        Ok(self.tickets.list(&filter).await?)
    }
}
