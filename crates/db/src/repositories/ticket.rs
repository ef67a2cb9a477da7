use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use sts_core::domain::account::AccountId;
use sts_core::domain::connection::ConnectionId;
use sts_core::domain::ticket::{NewTicket, Ticket, TicketId, TicketStatus};
use sts_core::geo::GeoPoint;
use sts_core::ports::{PortError, TicketFilter, TicketStore};

use super::{
    column, optional_timestamp_column, parse_column, pincode_column, timestamp_column,
    RepositoryError,
};
use crate::DbPool;

const TICKET_COLUMNS: &str = "id, user_id, connection_id, connection_type, service_type, \
     description, pincode, status, address, priority, engineer_id, latitude, longitude, \
     assigned_at, created_at, updated_at";

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn count(
        &self,
        engineer_id: AccountId,
        status: TicketStatus,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM ticket WHERE engineer_id = ? AND status = ?",
        )
        .bind(engineer_id.0)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?
        .try_get("count")?;

        Ok(count.max(0) as u64)
    }

    async fn exists(
        &self,
        connection_id: ConnectionId,
        statuses: &[TicketStatus],
    ) -> Result<bool, RepositoryError> {
        if statuses.is_empty() {
            return Ok(false);
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM ticket WHERE connection_id = ");
        query.push_bind(connection_id.0).push(" AND status IN (");
        let mut separated = query.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")) AS found");

        let found: bool = query.build().fetch_one(&self.pool).await?.try_get("found")?;
        Ok(found)
    }

    async fn create(&self, ticket: NewTicket) -> Result<Ticket, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO ticket (user_id, connection_id, connection_type, service_type,
                                 description, pincode, status, address, priority, engineer_id,
                                 latitude, longitude, assigned_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ticket.user_id.0)
        .bind(ticket.connection_id.0)
        .bind(ticket.connection_type.as_str())
        .bind(ticket.service_type.as_str())
        .bind(&ticket.description)
        .bind(i64::from(ticket.pincode.0))
        .bind(ticket.status.map(|status| status.as_str()))
        .bind(&ticket.address)
        .bind(ticket.priority.as_str())
        .bind(ticket.engineer_id.map(|id| id.0))
        .bind(ticket.location.latitude)
        .bind(ticket.location.longitude)
        .bind(ticket.assigned_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ticket.with_id(TicketId(result.last_insert_rowid())))
    }

    async fn write(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE ticket
             SET description = ?, status = ?, priority = ?, engineer_id = ?,
                 assigned_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&ticket.description)
        .bind(ticket.status.map(|status| status.as_str()))
        .bind(ticket.priority.as_str())
        .bind(ticket.engineer_id.map(|id| id.0))
        .bind(ticket.assigned_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.updated_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { entity: "ticket", id: ticket.id.0 });
        }
        Ok(())
    }

    async fn fetch_matching(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE 1 = 1"));
        push_filter(&mut query, filter);
        query.push(" ORDER BY id ASC");

        let rows: Vec<SqliteRow> = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_ticket).collect()
    }

    async fn count_filtered(&self, filter: &TicketFilter) -> Result<u64, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM ticket WHERE 1 = 1");
        push_filter(&mut query, filter);

        let count: i64 = query.build().fetch_one(&self.pool).await?.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id.0);
    }
    if let Some(engineer_id) = filter.engineer_id {
        query.push(" AND engineer_id = ").push_bind(engineer_id.0);
    }
    if let Some(pincode) = filter.pincode {
        query.push(" AND pincode = ").push_bind(i64::from(pincode.0));
    }
    if !filter.statuses.is_empty() {
        query.push(" AND status IN (");
        let mut separated = query.separated(", ");
        for status in &filter.statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");
    }
}

fn row_to_ticket(row: &SqliteRow) -> Result<Ticket, RepositoryError> {
    let status: Option<String> = column(row, "status")?;
    let status = status
        .map(|raw| raw.parse::<TicketStatus>())
        .transpose()
        .map_err(|e| RepositoryError::Decode(format!("status: {e}")))?;
    let engineer_id: Option<i64> = column(row, "engineer_id")?;

    Ok(Ticket {
        id: TicketId(column(row, "id")?),
        user_id: AccountId(column(row, "user_id")?),
        connection_id: ConnectionId(column(row, "connection_id")?),
        connection_type: parse_column(row, "connection_type")?,
        service_type: parse_column(row, "service_type")?,
        description: column(row, "description")?,
        pincode: pincode_column(row, "pincode")?,
        status,
        address: column(row, "address")?,
        priority: parse_column(row, "priority")?,
        engineer_id: engineer_id.map(AccountId),
        location: GeoPoint::new(column(row, "latitude")?, column(row, "longitude")?),
        assigned_at: optional_timestamp_column(row, "assigned_at")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: optional_timestamp_column(row, "updated_at")?,
    })
}

#[async_trait]
impl TicketStore for SqlTicketRepository {
    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>, PortError> {
        Ok(self.fetch_by_id(id).await?)
    }

    async fn count_by_engineer_and_status(
        &self,
        engineer_id: AccountId,
        status: TicketStatus,
    ) -> Result<u64, PortError> {
        Ok(self.count(engineer_id, status).await?)
    }

    async fn exists_by_connection_and_status_in(
        &self,
        connection_id: ConnectionId,
        statuses: &[TicketStatus],
    ) -> Result<bool, PortError> {
        Ok(self.exists(connection_id, statuses).await?)
    }

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, PortError> {
        Ok(self.create(ticket).await?)
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), PortError> {
        Ok(self.write(ticket).await?)
    }

    async fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, PortError> {
        Ok(self.fetch_matching(filter).await?)
    }

    async fn count_matching(&self, filter: &TicketFilter) -> Result<u64, PortError> {
        Ok(self.count_filtered(filter).await?)
    }
}
