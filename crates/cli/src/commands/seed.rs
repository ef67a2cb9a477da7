use serde_json::json;
use sts_db::DemoDataset;

use crate::commands::runtime::{migrate, with_pool};
use crate::commands::{CommandResult, Failure, EXIT_MIGRATION, EXIT_OPERATION};

/// Applies migrations, loads the demo dataset and verifies it.
pub fn run() -> CommandResult {
    with_pool("seed", |_config, pool| async move {
        migrate(&pool).await?;

        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;
        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_OPERATION))?;

        if !verification.all_present {
            return Err((
                "seed_verification",
                verification_message(&verification.checks),
                EXIT_OPERATION,
            ));
        }

        let tickets = seeded
            .tickets_seeded
            .iter()
            .map(|ticket| json!({ "id": ticket.id, "description": ticket.description }))
            .collect::<Vec<_>>();
        let message = format!(
            "demo dataset loaded: {} accounts, {} connections, {} leave records, {} tickets",
            seeded.accounts_seeded,
            seeded.connections_seeded,
            seeded.leave_records_seeded,
            tickets.len()
        );
        Ok::<_, Failure>((message, Some(json!({ "tickets": tickets }))))
    })
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
