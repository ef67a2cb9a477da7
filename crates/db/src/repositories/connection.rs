use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use sts_core::domain::account::AccountId;
use sts_core::domain::connection::{Connection, ConnectionId, NewConnection};
use sts_core::ports::{ConnectionStore, PortError};

use super::{column, optional_timestamp_column, parse_column, RepositoryError};
use crate::DbPool;

pub struct SqlConnectionRepository {
    pool: DbPool,
}

impl SqlConnectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Writes a connection under a known id, replacing any existing row.
    pub async fn save(&self, connection: &Connection) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO connection (id, user_id, connection_type, validity_months,
                                     start_date, expiry_date, end_date, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 user_id = excluded.user_id,
                 connection_type = excluded.connection_type,
                 validity_months = excluded.validity_months,
                 start_date = excluded.start_date,
                 expiry_date = excluded.expiry_date,
                 end_date = excluded.end_date,
                 status = excluded.status",
        )
        .bind(connection.id.0)
        .bind(connection.user_id.0)
        .bind(connection.connection_type.as_str())
        .bind(i64::from(connection.validity_months))
        .bind(connection.start_date.map(|dt| dt.to_rfc3339()))
        .bind(connection.expiry_date.map(|dt| dt.to_rfc3339()))
        .bind(connection.end_date.map(|dt| dt.to_rfc3339()))
        .bind(connection.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, connection_type, validity_months, start_date, expiry_date,
                    end_date, status
             FROM connection WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_connection).transpose()
    }

    async fn create(&self, connection: NewConnection) -> Result<Connection, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO connection (user_id, connection_type, validity_months, status)
             VALUES (?, ?, ?, 'INACTIVE')",
        )
        .bind(connection.user_id.0)
        .bind(connection.connection_type.as_str())
        .bind(i64::from(connection.validity_months))
        .execute(&self.pool)
        .await?;

        Ok(connection.with_id(ConnectionId(result.last_insert_rowid())))
    }

    async fn write(&self, connection: &Connection) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE connection
             SET start_date = ?, expiry_date = ?, end_date = ?, status = ?
             WHERE id = ?",
        )
        .bind(connection.start_date.map(|dt| dt.to_rfc3339()))
        .bind(connection.expiry_date.map(|dt| dt.to_rfc3339()))
        .bind(connection.end_date.map(|dt| dt.to_rfc3339()))
        .bind(connection.status.as_str())
        .bind(connection.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { entity: "connection", id: connection.id.0 });
        }
        Ok(())
    }
}

fn row_to_connection(row: &SqliteRow) -> Result<Connection, RepositoryError> {
    let validity_months: i64 = column(row, "validity_months")?;

    Ok(Connection {
        id: ConnectionId(column(row, "id")?),
        user_id: AccountId(column(row, "user_id")?),
        connection_type: parse_column(row, "connection_type")?,
        validity_months: u32::try_from(validity_months).map_err(|_| {
            RepositoryError::Decode(format!("validity_months: {validity_months} out of range"))
        })?,
        start_date: optional_timestamp_column(row, "start_date")?,
        expiry_date: optional_timestamp_column(row, "expiry_date")?,
        end_date: optional_timestamp_column(row, "end_date")?,
        status: parse_column(row, "status")?,
    })
}

#[async_trait]
impl ConnectionStore for SqlConnectionRepository {
    async fn find_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, PortError> {
        Ok(self.fetch_by_id(id).await?)
    }

    async fn insert(&self, connection: NewConnection) -> Result<Connection, PortError> {
        Ok(self.create(connection).await?)
    }

    async fn update(&self, connection: &Connection) -> Result<(), PortError> {
        Ok(self.write(connection).await?)
    }
}
