use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_ACCOUNT_IDS: &[i64] = &[1, 2, 3, 10, 11, 12, 13, 14];
const SEED_CONNECTION_IDS: &[i64] = &[300, 301, 302];
const SEED_LEAVE_IDS: &[i64] = &[1, 2];

/// Ticket rows the demo seed guarantees, with the state `verify` expects after a fresh load.
const SEED_TICKETS: &[SeedTicketContract] = &[
    SeedTicketContract {
        id: 1,
        label: "ticket-fault-in-progress",
        status: Some("IN_PROGRESS"),
        engineer_id: Some(10),
        pincode: 560001,
        description: "WIFI fault assigned to the nearest engineer",
    },
    SeedTicketContract {
        id: 2,
        label: "ticket-fault-deferred",
        status: Some("DEFERRED"),
        engineer_id: Some(13),
        pincode: 560034,
        description: "LANDLINE fault deferred and ready for reassignment",
    },
    SeedTicketContract {
        id: 3,
        label: "ticket-installation-unassigned",
        status: None,
        engineer_id: None,
        pincode: 560001,
        description: "DTH installation raised while no engineer was free",
    },
];

/// Demo dataset for exercising the ticket lifecycle by hand.
///
/// Pincode 560001 has two free engineers and one on long-term approved leave;
/// pincode 560034 has one approved engineer and one still awaiting approval.
pub struct DemoDataset;

impl DemoDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo rows. Reloading resets seeded tickets and connections to their initial state.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        tracing::info!(
            event_name = "db.fixtures.loaded",
            accounts = SEED_ACCOUNT_IDS.len(),
            tickets = SEED_TICKETS.len(),
            "demo dataset loaded"
        );

        Ok(SeedResult {
            accounts_seeded: SEED_ACCOUNT_IDS.len(),
            connections_seeded: SEED_CONNECTION_IDS.len(),
            leave_records_seeded: SEED_LEAVE_IDS.len(),
            tickets_seeded: SEED_TICKETS
                .iter()
                .map(|ticket| TicketSeedInfo { id: ticket.id, description: ticket.description })
                .collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push(("accounts", count_ids(pool, "account", SEED_ACCOUNT_IDS).await?));
        checks.push(("connections", count_ids(pool, "connection", SEED_CONNECTION_IDS).await?));
        checks.push(("leave-records", count_ids(pool, "leave_record", SEED_LEAVE_IDS).await?));

        let assignable: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM account WHERE role = 'ENGINEER' AND status = 'APPROVED' AND pincode = 560001",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("engineers-560001", assignable == 3));

        let on_leave: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM leave_record WHERE engineer_id = 12 AND status = 'APPROVED')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("engineer-12-on-leave", on_leave == 1));

        for ticket in SEED_TICKETS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM ticket WHERE id = ?1 AND status IS ?2 AND engineer_id IS ?3 AND pincode = ?4)",
            )
            .bind(ticket.id)
            .bind(ticket.status)
            .bind(ticket.engineer_id)
            .bind(i64::from(ticket.pincode))
            .fetch_one(pool)
            .await?;
            checks.push((ticket.label, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove every seeded row, tickets first so account references stay satisfied.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let ticket_ids = SEED_TICKETS.iter().map(|ticket| ticket.id).collect::<Vec<_>>();
        sqlx::query(&format!("DELETE FROM ticket WHERE id IN {}", sql_array_from_ids(&ticket_ids)))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM leave_record WHERE id IN {}",
            sql_array_from_ids(SEED_LEAVE_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM connection WHERE id IN {}",
            sql_array_from_ids(SEED_CONNECTION_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM account WHERE id IN {}",
            sql_array_from_ids(SEED_ACCOUNT_IDS)
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTicketContract {
    id: i64,
    label: &'static str,
    status: Option<&'static str>,
    engineer_id: Option<i64>,
    pincode: u32,
    description: &'static str,
}

async fn count_ids(pool: &DbPool, table: &str, ids: &[i64]) -> Result<bool, RepositoryError> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(1) FROM {table} WHERE id IN {}",
        sql_array_from_ids(ids)
    ))
    .fetch_one(pool)
    .await?;
    Ok(usize::try_from(count).is_ok_and(|count| count == ids.len()))
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub accounts_seeded: usize,
    pub connections_seeded: usize,
    pub leave_records_seeded: usize,
    pub tickets_seeded: Vec<TicketSeedInfo>,
}

#[derive(Debug)]
pub struct TicketSeedInfo {
    pub id: i64,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
