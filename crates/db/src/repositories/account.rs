use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use sts_core::domain::account::{Account, AccountId, Pincode};
use sts_core::geo::GeoPoint;
use sts_core::ports::{AccountQuery, PortError};

use super::{column, parse_column, pincode_column, RepositoryError};
use crate::DbPool;

const ACCOUNT_COLUMNS: &str =
    "id, first_name, last_name, email, role, pincode, address, latitude, longitude, status";

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the account under its own id.
    pub async fn save(&self, account: &Account) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO account (id, first_name, last_name, email, role, pincode, address,
                                  latitude, longitude, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 role = excluded.role,
                 pincode = excluded.pincode,
                 address = excluded.address,
                 latitude = excluded.latitude,
                 longitude = excluded.longitude,
                 status = excluded.status",
        )
        .bind(account.id.0)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(account.role.as_str())
        .bind(i64::from(account.pincode.0))
        .bind(&account.address)
        .bind(account.location.latitude)
        .bind(account.location.longitude)
        .bind(account.status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn fetch_engineers(&self, pincode: Pincode) -> Result<Vec<Account>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE role = 'ENGINEER' AND status = 'APPROVED' AND pincode = ?
             ORDER BY id ASC"
        ))
        .bind(i64::from(pincode.0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_account).collect()
    }
}

fn row_to_account(row: &SqliteRow) -> Result<Account, RepositoryError> {
    Ok(Account {
        id: AccountId(column(row, "id")?),
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        email: column(row, "email")?,
        role: parse_column(row, "role")?,
        pincode: pincode_column(row, "pincode")?,
        address: column(row, "address")?,
        location: GeoPoint::new(column(row, "latitude")?, column(row, "longitude")?),
        status: parse_column(row, "status")?,
    })
}

#[async_trait]
impl AccountQuery for SqlAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, PortError> {
        Ok(self.fetch_by_id(id).await?)
    }

    async fn find_engineers_by_pincode(&self, pincode: Pincode) -> Result<Vec<Account>, PortError> {
        Ok(self.fetch_engineers(pincode).await?)
    }
}

#[cfg(test)]
mod tests {
    use sts_core::domain::account::{Account, AccountId, AccountStatus, Pincode, Role};
    use sts_core::geo::GeoPoint;
    use sts_core::ports::AccountQuery;

    use super::SqlAccountRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn account(id: i64, role: Role, pincode: u32, status: AccountStatus) -> Account {
        Account {
            id: AccountId(id),
            first_name: format!("Name{id}"),
            last_name: "Rao".to_string(),
            email: format!("user{id}@example.com"),
            role,
            pincode: Pincode(pincode),
            address: "12 Residency Road".to_string(),
            location: GeoPoint::new(12.96, 77.60),
            status,
        }
    }

    #[tokio::test]
    async fn saved_account_is_found_by_id() {
        let repo = SqlAccountRepository::new(setup().await);
        let expected = account(7, Role::User, 560025, AccountStatus::Approved);

        repo.save(&expected).await.expect("save");

        let found = repo.find_by_id(AccountId(7)).await.expect("find");
        assert_eq!(found, Some(expected));
        assert_eq!(repo.find_by_id(AccountId(8)).await.expect("find"), None);
    }

    #[tokio::test]
    async fn engineer_lookup_filters_role_status_and_pincode() {
        let repo = SqlAccountRepository::new(setup().await);
        for candidate in [
            account(30, Role::Engineer, 560001, AccountStatus::Approved),
            account(10, Role::Engineer, 560001, AccountStatus::Approved),
            account(11, Role::Engineer, 560001, AccountStatus::Pending),
            account(12, Role::User, 560001, AccountStatus::Approved),
            account(13, Role::Engineer, 560002, AccountStatus::Approved),
        ] {
            repo.save(&candidate).await.expect("save");
        }

        let engineers = repo.find_engineers_by_pincode(Pincode(560001)).await.expect("engineers");

        let ids: Vec<i64> = engineers.iter().map(|engineer| engineer.id.0).collect();
        assert_eq!(ids, vec![10, 30], "approved engineers only, ordered by id");
        assert!(repo.find_engineers_by_pincode(Pincode(110001)).await.expect("empty").is_empty());
    }
}
