use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sts_core::domain::account::AccountId;
use sts_core::domain::leave::{LeaveId, LeaveRecord};
use sts_core::ports::{LeavePredicate, PortError};

use super::{column, date_column, parse_column, RepositoryError};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Leave records keep their dates as `YYYY-MM-DD` text, so range checks are
/// plain string comparisons.
pub struct SqlLeaveRepository {
    pool: DbPool,
}

impl SqlLeaveRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, record: &LeaveRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO leave_record (id, engineer_id, start_date, end_date, leave_type, reason, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 engineer_id = excluded.engineer_id,
                 start_date = excluded.start_date,
                 end_date = excluded.end_date,
                 leave_type = excluded.leave_type,
                 reason = excluded.reason,
                 status = excluded.status",
        )
        .bind(record.id.0)
        .bind(record.engineer_id.0)
        .bind(record.start_date.format(DATE_FORMAT).to_string())
        .bind(record.end_date.format(DATE_FORMAT).to_string())
        .bind(&record.leave_type)
        .bind(&record.reason)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_engineer(
        &self,
        engineer_id: AccountId,
    ) -> Result<Vec<LeaveRecord>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, engineer_id, start_date, end_date, leave_type, reason, status
             FROM leave_record WHERE engineer_id = ? ORDER BY start_date ASC, id ASC",
        )
        .bind(engineer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_leave).collect()
    }

    async fn approved_on(
        &self,
        engineer_id: AccountId,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let day = date.format(DATE_FORMAT).to_string();
        let found: bool = sqlx::query(
            "SELECT EXISTS(
                 SELECT 1 FROM leave_record
                 WHERE engineer_id = ? AND status = 'APPROVED'
                   AND start_date <= ? AND end_date >= ?
             ) AS found",
        )
        .bind(engineer_id.0)
        .bind(&day)
        .bind(&day)
        .fetch_one(&self.pool)
        .await?
        .try_get("found")?;

        Ok(found)
    }
}

fn row_to_leave(row: &SqliteRow) -> Result<LeaveRecord, RepositoryError> {
    Ok(LeaveRecord {
        id: LeaveId(column(row, "id")?),
        engineer_id: AccountId(column(row, "engineer_id")?),
        start_date: date_column(row, "start_date")?,
        end_date: date_column(row, "end_date")?,
        leave_type: column(row, "leave_type")?,
        reason: column(row, "reason")?,
        status: parse_column(row, "status")?,
    })
}

#[async_trait]
impl LeavePredicate for SqlLeaveRepository {
    async fn is_on_leave(&self, engineer_id: AccountId, date: NaiveDate) -> Result<bool, PortError> {
        Ok(self.approved_on(engineer_id, date).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use sts_core::domain::account::{Account, AccountId, AccountStatus, Pincode, Role};
    use sts_core::domain::leave::{LeaveId, LeaveRecord, LeaveStatus};
    use sts_core::geo::GeoPoint;
    use sts_core::ports::LeavePredicate;

    use super::SqlLeaveRepository;
    use crate::repositories::SqlAccountRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlAccountRepository::new(pool.clone())
            .save(&Account {
                id: AccountId(55),
                first_name: "Kiran".to_string(),
                last_name: "Shetty".to_string(),
                email: "kiran@example.com".to_string(),
                role: Role::Engineer,
                pincode: Pincode(560001),
                address: "Depot 4".to_string(),
                location: GeoPoint::new(12.90, 77.50),
                status: AccountStatus::Approved,
            })
            .await
            .expect("seed engineer");
        pool
    }

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("date")
    }

    fn leave(id: i64, start: u32, end: u32, status: LeaveStatus) -> LeaveRecord {
        LeaveRecord {
            id: LeaveId(id),
            engineer_id: AccountId(55),
            start_date: day(start),
            end_date: day(end),
            leave_type: "CASUAL".to_string(),
            reason: "family event".to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn approved_leave_range_is_inclusive() {
        let repo = SqlLeaveRepository::new(setup().await);
        repo.save(&leave(1, 10, 12, LeaveStatus::Approved)).await.expect("save");

        assert!(!repo.is_on_leave(AccountId(55), day(9)).await.expect("query"));
        assert!(repo.is_on_leave(AccountId(55), day(10)).await.expect("query"));
        assert!(repo.is_on_leave(AccountId(55), day(12)).await.expect("query"));
        assert!(!repo.is_on_leave(AccountId(55), day(13)).await.expect("query"));
        assert!(!repo.is_on_leave(AccountId(56), day(11)).await.expect("query"));
    }

    #[tokio::test]
    async fn pending_and_rejected_leave_do_not_count() {
        let repo = SqlLeaveRepository::new(setup().await);
        repo.save(&leave(1, 1, 31, LeaveStatus::Pending)).await.expect("save");
        repo.save(&leave(2, 1, 31, LeaveStatus::Rejected)).await.expect("save");

        assert!(!repo.is_on_leave(AccountId(55), day(15)).await.expect("query"));
    }

    #[tokio::test]
    async fn records_round_trip_in_start_order() {
        let repo = SqlLeaveRepository::new(setup().await);
        let later = leave(1, 20, 21, LeaveStatus::Approved);
        let earlier = leave(2, 2, 3, LeaveStatus::Pending);
        repo.save(&later).await.expect("save");
        repo.save(&earlier).await.expect("save");

        let records = repo.list_for_engineer(AccountId(55)).await.expect("list");
        assert_eq!(records, vec![earlier, later]);
    }
}
