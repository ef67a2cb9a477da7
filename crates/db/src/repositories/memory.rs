use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use sts_core::domain::account::{Account, AccountId, Pincode};
use sts_core::domain::connection::{Connection, ConnectionId, NewConnection};
use sts_core::domain::leave::{LeaveId, LeaveRecord};
use sts_core::domain::ticket::{NewTicket, Ticket, TicketId, TicketStatus};
use sts_core::ports::{
    AccountQuery, ConnectionStore, LeavePredicate, PortError, TicketFilter, TicketStore,
};

use super::RepositoryError;

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub async fn save(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }
}

#[async_trait]
impl AccountQuery for InMemoryAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, PortError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_engineers_by_pincode(&self, pincode: Pincode) -> Result<Vec<Account>, PortError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter(|account| account.pincode == pincode && account.is_assignable_engineer())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct TicketTable {
    next_id: i64,
    rows: BTreeMap<TicketId, Ticket>,
}

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<TicketTable>,
}

#[async_trait]
impl TicketStore for InMemoryTicketRepository {
    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>, PortError> {
        Ok(self.tickets.read().await.rows.get(&id).cloned())
    }

    async fn count_by_engineer_and_status(
        &self,
        engineer_id: AccountId,
        status: TicketStatus,
    ) -> Result<u64, PortError> {
        let tickets = self.tickets.read().await;
        let count = tickets
            .rows
            .values()
            .filter(|ticket| ticket.engineer_id == Some(engineer_id))
            .filter(|ticket| ticket.status == Some(status))
            .count();
        Ok(count as u64)
    }

    async fn exists_by_connection_and_status_in(
        &self,
        connection_id: ConnectionId,
        statuses: &[TicketStatus],
    ) -> Result<bool, PortError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.rows.values().any(|ticket| {
            ticket.connection_id == connection_id
                && ticket.status.is_some_and(|status| statuses.contains(&status))
        }))
    }

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, PortError> {
        let mut tickets = self.tickets.write().await;
        tickets.next_id += 1;
        let ticket = ticket.with_id(TicketId(tickets.next_id));
        tickets.rows.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), PortError> {
        let mut tickets = self.tickets.write().await;
        match tickets.rows.get_mut(&ticket.id) {
            Some(existing) => {
                *existing = ticket.clone();
                Ok(())
            }
            None => Err(RepositoryError::Missing { entity: "ticket", id: ticket.id.0 }.into()),
        }
    }

    async fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, PortError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.rows.values().filter(|ticket| filter.matches(ticket)).cloned().collect())
    }

    async fn count_matching(&self, filter: &TicketFilter) -> Result<u64, PortError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.rows.values().filter(|ticket| filter.matches(ticket)).count() as u64)
    }
}

#[derive(Default)]
struct ConnectionTable {
    next_id: i64,
    rows: BTreeMap<ConnectionId, Connection>,
}

#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: RwLock<ConnectionTable>,
}

impl InMemoryConnectionRepository {
    /// Stores a connection under its own id; later inserts continue after the highest id.
    pub async fn save(&self, connection: Connection) {
        let mut connections = self.connections.write().await;
        connections.next_id = connections.next_id.max(connection.id.0);
        connections.rows.insert(connection.id, connection);
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionRepository {
    async fn find_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, PortError> {
        Ok(self.connections.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, connection: NewConnection) -> Result<Connection, PortError> {
        let mut connections = self.connections.write().await;
        connections.next_id += 1;
        let connection = connection.with_id(ConnectionId(connections.next_id));
        connections.rows.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn update(&self, connection: &Connection) -> Result<(), PortError> {
        let mut connections = self.connections.write().await;
        match connections.rows.get_mut(&connection.id) {
            Some(existing) => {
                *existing = connection.clone();
                Ok(())
            }
            None => {
                Err(RepositoryError::Missing { entity: "connection", id: connection.id.0 }.into())
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryLeaveRepository {
    records: RwLock<BTreeMap<LeaveId, LeaveRecord>>,
}

impl InMemoryLeaveRepository {
    pub async fn save(&self, record: LeaveRecord) {
        self.records.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl LeavePredicate for InMemoryLeaveRepository {
    async fn is_on_leave(&self, engineer_id: AccountId, date: NaiveDate) -> Result<bool, PortError> {
        let records = self.records.read().await;
        Ok(records.values().any(|record| record.engineer_id == engineer_id && record.covers(date)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use sts_core::domain::account::{Account, AccountId, AccountStatus, Pincode, Role};
    use sts_core::domain::connection::{ConnectionId, NewConnection};
    use sts_core::domain::leave::{LeaveId, LeaveRecord, LeaveStatus};
    use sts_core::domain::ticket::{
        ConnectionType, NewTicket, Priority, ServiceType, TicketId, TicketStatus,
    };
    use sts_core::geo::GeoPoint;
    use sts_core::ports::{AccountQuery, ConnectionStore, LeavePredicate, TicketStore};

    use crate::repositories::{
        InMemoryAccountRepository, InMemoryConnectionRepository, InMemoryLeaveRepository,
        InMemoryTicketRepository,
    };

    fn engineer(id: i64, pincode: u32) -> Account {
        Account {
            id: AccountId(id),
            first_name: format!("Eng{id}"),
            last_name: String::new(),
            email: format!("eng{id}@example.com"),
            role: Role::Engineer,
            pincode: Pincode(pincode),
            address: String::new(),
            location: GeoPoint::new(12.9, 77.5),
            status: AccountStatus::Approved,
        }
    }

    #[tokio::test]
    async fn engineers_come_back_in_id_order() {
        let repo = InMemoryAccountRepository::default();
        repo.save(engineer(9, 560001)).await;
        repo.save(engineer(3, 560001)).await;
        repo.save(engineer(5, 560002)).await;

        let engineers = repo.find_engineers_by_pincode(Pincode(560001)).await.expect("engineers");
        let ids: Vec<i64> = engineers.iter().map(|account| account.id.0).collect();
        assert_eq!(ids, vec![3, 9]);
    }

    #[tokio::test]
    async fn ticket_ids_are_sequential_and_updates_need_existing_rows() {
        let repo = InMemoryTicketRepository::default();
        let draft = NewTicket {
            user_id: AccountId(1),
            connection_id: ConnectionId(300),
            connection_type: ConnectionType::Landline,
            service_type: ServiceType::Fault,
            description: String::new(),
            pincode: Pincode(560001),
            status: Some(TicketStatus::InProgress),
            address: String::new(),
            priority: Priority::P3,
            engineer_id: Some(AccountId(3)),
            location: GeoPoint::new(12.9, 77.5),
            assigned_at: None,
            created_at: Utc::now(),
        };

        let first = repo.insert(draft.clone()).await.expect("insert");
        let second = repo.insert(draft.clone()).await.expect("insert");
        assert_eq!((first.id, second.id), (TicketId(1), TicketId(2)));
        assert_eq!(
            repo.count_by_engineer_and_status(AccountId(3), TicketStatus::InProgress)
                .await
                .expect("count"),
            2
        );

        let ghost = draft.with_id(TicketId(50));
        assert!(repo.update(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn saved_connections_push_the_id_counter_forward() {
        let repo = InMemoryConnectionRepository::default();
        repo.save(
            NewConnection {
                user_id: AccountId(1),
                connection_type: ConnectionType::Wifi,
                validity_months: 12,
            }
            .with_id(ConnectionId(300)),
        )
        .await;

        let created = repo
            .insert(NewConnection {
                user_id: AccountId(1),
                connection_type: ConnectionType::Dth,
                validity_months: 6,
            })
            .await
            .expect("insert");

        assert_eq!(created.id, ConnectionId(301));
        assert!(repo.find_by_id(ConnectionId(300)).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn leave_predicate_uses_approved_records_only() {
        let repo = InMemoryLeaveRepository::default();
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).expect("date");
        repo.save(LeaveRecord {
            id: LeaveId(1),
            engineer_id: AccountId(3),
            start_date: day(10),
            end_date: day(11),
            leave_type: "SICK".to_string(),
            reason: String::new(),
            status: LeaveStatus::Approved,
        })
        .await;
        repo.save(LeaveRecord {
            id: LeaveId(2),
            engineer_id: AccountId(4),
            start_date: day(10),
            end_date: day(11),
            leave_type: "SICK".to_string(),
            reason: String::new(),
            status: LeaveStatus::Pending,
        })
        .await;

        assert!(repo.is_on_leave(AccountId(3), day(11)).await.expect("query"));
        assert!(!repo.is_on_leave(AccountId(3), day(12)).await.expect("query"));
        assert!(!repo.is_on_leave(AccountId(4), day(10)).await.expect("query"));
    }
}
