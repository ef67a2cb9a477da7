use serde_json::json;
use sts_core::assign_priority;

use crate::commands::{CommandResult, EXIT_OPERATION};

/// Looks up the priority table without touching the database.
pub fn run(service: &str, connection: &str) -> CommandResult {
    match assign_priority(Some(service), Some(connection)) {
        Some(priority) => CommandResult::success_with_data(
            "priority",
            format!("{service}/{connection} maps to {priority}"),
            json!({ "priority": priority.as_str() }),
        ),
        None => CommandResult::failure(
            "priority",
            "invalid_argument",
            format!(
                "priority cannot be derived for service type `{service}` and connection type `{connection}`"
            ),
            EXIT_OPERATION,
        ),
    }
}
