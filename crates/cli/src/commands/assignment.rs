use serde_json::json;
use sts_core::{AccountId, GeoPoint, Pincode};

use crate::commands::runtime::{lifecycle, to_data, with_pool};
use crate::commands::{operation_failure, CommandResult, Failure};

#[derive(Debug, Clone, Copy)]
pub struct BestEngineerArgs {
    pub latitude: f64,
    pub longitude: f64,
    pub pincode: u32,
    pub exclude: Option<i64>,
}

/// Runs engineer selection for a location without creating a ticket.
/// An empty pincode is a successful answer with `engineer: null`.
pub fn run(args: BestEngineerArgs) -> CommandResult {
    with_pool("best-engineer", move |config, pool| async move {
        let lifecycle = lifecycle(&config, &pool);
        let selection = lifecycle
            .selector()
            .select(
                GeoPoint::new(args.latitude, args.longitude),
                Pincode(args.pincode),
                args.exclude.map(AccountId),
            )
            .await
            .map_err(operation_failure)?;

        let outcome = match selection {
            Some(selection) => (
                format!(
                    "engineer {} selected from {} candidates",
                    selection.engineer.id, selection.candidates_considered
                ),
                Some(to_data(&selection)?),
            ),
            None => (
                format!("no available engineers found in pincode {}", args.pincode),
                Some(json!({ "engineer": null })),
            ),
        };
        Ok::<_, Failure>(outcome)
    })
}
