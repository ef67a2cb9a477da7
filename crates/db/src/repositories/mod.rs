use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use sts_core::domain::account::Pincode;
use sts_core::ports::PortError;

pub mod account;
pub mod connection;
pub mod leave;
pub mod memory;
pub mod ticket;

pub use account::SqlAccountRepository;
pub use connection::SqlConnectionRepository;
pub use leave::SqlLeaveRepository;
pub use memory::{
    InMemoryAccountRepository, InMemoryConnectionRepository, InMemoryLeaveRepository,
    InMemoryTicketRepository,
};
pub use ticket::SqlTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: i64 },
}

impl From<RepositoryError> for PortError {
    fn from(error: RepositoryError) -> Self {
        PortError::Storage(error.to_string())
    }
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn parse_column<T>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = column(row, name)?;
    raw.parse::<T>().map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn parse_timestamp(raw: &str, name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    parse_timestamp(&raw, name)
}

pub(crate) fn optional_timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    raw.map(|raw| parse_timestamp(&raw, name)).transpose()
}

pub(crate) fn date_column(row: &SqliteRow, name: &str) -> Result<NaiveDate, RepositoryError> {
    let raw: String = column(row, name)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn pincode_column(row: &SqliteRow, name: &str) -> Result<Pincode, RepositoryError> {
    let raw: i64 = column(row, name)?;
    u32::try_from(raw)
        .map(Pincode)
        .map_err(|_| RepositoryError::Decode(format!("{name}: pincode {raw} out of range")))
}
