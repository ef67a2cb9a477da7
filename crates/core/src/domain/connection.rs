use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::ticket::ConnectionType;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub i64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Active,
    Inactive,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            _ => Err(DomainError::UnknownStatus { kind: "connection", value: value.to_string() }),
        }
    }
}

/// A connection requested by a customer. New connections always start INACTIVE.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnection {
    pub user_id: AccountId,
    pub connection_type: ConnectionType,
    pub validity_months: u32,
}

impl NewConnection {
    pub fn with_id(self, id: ConnectionId) -> Connection {
        Connection {
            id,
            user_id: self.user_id,
            connection_type: self.connection_type,
            validity_months: self.validity_months,
            start_date: None,
            expiry_date: None,
            end_date: None,
            status: ConnectionStatus::Inactive,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: AccountId,
    pub connection_type: ConnectionType,
    pub validity_months: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ConnectionStatus,
}

impl Connection {
    /// Start date plus the validity period in calendar months, clamped to the
    /// last day of the target month. `None` until the connection has started.
    pub fn expiry_from_start(&self) -> Option<DateTime<Utc>> {
        self.start_date?.checked_add_months(Months::new(self.validity_months))
    }

    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.status = ConnectionStatus::Active;
        self.start_date = Some(now);
        self.expiry_date = self.expiry_from_start();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{ConnectionId, ConnectionStatus, NewConnection};
    use crate::domain::account::AccountId;
    use crate::domain::ticket::ConnectionType;

    #[test]
    fn new_connections_start_inactive_without_dates() {
        let connection = NewConnection {
            user_id: AccountId(1),
            connection_type: ConnectionType::Dth,
            validity_months: 12,
        }
        .with_id(ConnectionId(9));

        assert_eq!(connection.status, ConnectionStatus::Inactive);
        assert_eq!(connection.expiry_from_start(), None);
    }

    #[test]
    fn activation_sets_expiry_from_validity_months() {
        let mut connection = NewConnection {
            user_id: AccountId(1),
            connection_type: ConnectionType::Wifi,
            validity_months: 6,
        }
        .with_id(ConnectionId(1));
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).single().expect("valid time");

        connection.activate(now);

        assert_eq!(connection.status, ConnectionStatus::Active);
        assert_eq!(connection.start_date, Some(now));
        assert_eq!(
            connection.expiry_date,
            Utc.with_ymd_and_hms(2026, 7, 15, 10, 30, 0).single()
        );
    }

    #[test]
    fn expiry_clamps_to_end_of_shorter_month() {
        let mut connection = NewConnection {
            user_id: AccountId(1),
            connection_type: ConnectionType::Landline,
            validity_months: 1,
        }
        .with_id(ConnectionId(2));
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).single().expect("valid time");

        connection.activate(now);

        assert_eq!(connection.expiry_date, Utc.with_ymd_and_hms(2026, 2, 28, 8, 0, 0).single());
    }
}
