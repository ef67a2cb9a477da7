use std::sync::Arc;

use clap::ValueEnum;
use serde_json::json;
use sts_core::{
    AccountId, ConnectionId, FaultRequest, InstallationRequest, Pincode, TicketId, TicketStatus,
    TicketViews,
};
use sts_db::SqlTicketRepository;

use crate::commands::runtime::{lifecycle, to_data, with_pool};
use crate::commands::{operation_failure, CommandResult, Failure, EXIT_OPERATION};

#[derive(Debug, Clone)]
pub struct RaiseFaultArgs {
    pub user_id: i64,
    pub connection_id: i64,
    pub connection_type: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RaiseInstallationArgs {
    pub user_id: i64,
    pub connection_type: String,
    pub validity_months: u32,
    pub description: String,
}

pub fn raise_fault(args: RaiseFaultArgs) -> CommandResult {
    with_pool("raise-fault", move |config, pool| async move {
        let receipt = lifecycle(&config, &pool)
            .raise_fault_ticket(FaultRequest {
                user_id: AccountId(args.user_id),
                connection_id: ConnectionId(args.connection_id),
                connection_type: args.connection_type,
                description: args.description,
            })
            .await
            .map_err(operation_failure)?;
        Ok::<_, Failure>((receipt.message.clone(), Some(to_data(&receipt.ticket)?)))
    })
}

pub fn raise_installation(args: RaiseInstallationArgs) -> CommandResult {
    with_pool("raise-installation", move |config, pool| async move {
        let receipt = lifecycle(&config, &pool)
            .raise_installation_ticket(InstallationRequest {
                user_id: AccountId(args.user_id),
                connection_type: args.connection_type,
                validity_months: args.validity_months,
                description: args.description,
            })
            .await
            .map_err(operation_failure)?;
        Ok::<_, Failure>((receipt.message.clone(), Some(to_data(&receipt.ticket)?)))
    })
}

pub fn update_status(ticket_id: i64, engineer_id: i64, status: &str) -> CommandResult {
    let status = match parse_status(status) {
        Ok(status) => status,
        Err(failure) => return CommandResult::from_failure("update-status", failure),
    };

    with_pool("update-status", move |config, pool| async move {
        let ticket = lifecycle(&config, &pool)
            .update_status(TicketId(ticket_id), AccountId(engineer_id), status)
            .await
            .map_err(operation_failure)?;
        Ok::<_, Failure>((
            format!("ticket {} is now {}", ticket.id, ticket.status_label()),
            Some(to_data(&ticket)?),
        ))
    })
}

pub fn reassign(ticket_id: i64) -> CommandResult {
    with_pool("reassign", move |config, pool| async move {
        let reassignment = lifecycle(&config, &pool)
            .reassign_engineer(TicketId(ticket_id))
            .await
            .map_err(operation_failure)?;
        Ok::<_, Failure>((reassignment.message.clone(), Some(to_data(&reassignment)?)))
    })
}

pub fn locate(ticket_id: i64) -> CommandResult {
    with_pool("locate", move |config, pool| async move {
        let location = lifecycle(&config, &pool)
            .preview_engineer_location(TicketId(ticket_id))
            .await
            .map_err(operation_failure)?;
        Ok::<_, Failure>((
            format!(
                "engineer {} is {:.2} km from ticket {}",
                location.engineer_id, location.distance_km, location.ticket_id
            ),
            Some(to_data(&location)?),
        ))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TicketView {
    /// PENDING, IN_PROGRESS and DEFERRED tickets raised by a user.
    UserActive,
    /// COMPLETED and FAILED tickets raised by a user.
    UserHistory,
    EngineerQueue,
    EngineerInProgress,
    EngineerHistory,
    /// IN_PROGRESS tickets in a pincode, most urgent first.
    PincodeBacklog,
    /// COMPLETED and FAILED tickets in a pincode.
    PincodeHistory,
    PincodeStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct TicketListArgs {
    pub view: TicketView,
    pub id: i64,
}

/// Read-only ticket listings. `PincodeStatus` needs a status; the other views ignore it.
pub fn list(args: TicketListArgs, status: Option<&str>) -> CommandResult {
    let status = match status.map(parse_status).transpose() {
        Ok(status) => status,
        Err(failure) => return CommandResult::from_failure("tickets", failure),
    };
    if args.view == TicketView::PincodeStatus && status.is_none() {
        return CommandResult::failure(
            "tickets",
            "invalid_argument",
            "the pincode-status view requires --status",
            EXIT_OPERATION,
        );
    }

    with_pool("tickets", move |_config, pool| async move {
        let views = TicketViews::new(Arc::new(SqlTicketRepository::new(pool)));
        let id = args.id;
        let tickets = match (args.view, status) {
            (TicketView::UserActive, _) => views.active_tickets_for_user(AccountId(id)).await,
            (TicketView::UserHistory, _) => views.history_for_user(AccountId(id)).await,
            (TicketView::EngineerQueue, _) => views.engineer_queue(AccountId(id)).await,
            (TicketView::EngineerInProgress, _) => views.engineer_in_progress(AccountId(id)).await,
            (TicketView::EngineerHistory, _) => views.engineer_history(AccountId(id)).await,
            (TicketView::PincodeBacklog, _) => views.pincode_backlog(pincode(id)?).await,
            (TicketView::PincodeHistory, _) => views.pincode_history(pincode(id)?).await,
            (TicketView::PincodeStatus, Some(status)) => {
                views.pincode_by_status(pincode(id)?, status).await
            }
            (TicketView::PincodeStatus, None) => Ok(Vec::new()),
        }
        .map_err(operation_failure)?;

        Ok::<_, Failure>((
            format!("{} tickets", tickets.len()),
            Some(json!({ "count": tickets.len(), "tickets": to_data(&tickets)? })),
        ))
    })
}

fn parse_status(raw: &str) -> Result<TicketStatus, Failure> {
    raw.parse::<TicketStatus>()
        .map_err(|error| ("invalid_argument", error.to_string(), EXIT_OPERATION))
}

fn pincode(raw: i64) -> Result<Pincode, Failure> {
    u32::try_from(raw).map(Pincode).map_err(|_| {
        ("invalid_argument", format!("pincode {raw} is out of range"), EXIT_OPERATION)
    })
}

#[cfg(test)]
mod tests {
    use sts_core::{Pincode, TicketStatus};

    use super::{parse_status, pincode};

    #[test]
    fn status_names_parse_case_insensitively() {
        assert_eq!(parse_status("in_progress").expect("status"), TicketStatus::InProgress);
        let (class, message, code) = parse_status("DONE").expect_err("unknown status");
        assert_eq!(class, "invalid_argument");
        assert!(message.contains("DONE"));
        assert_eq!(code, 6);
    }

    #[test]
    fn negative_pincode_is_rejected() {
        assert_eq!(pincode(560001).expect("pincode"), Pincode(560001));
        assert!(pincode(-1).is_err());
    }
}
