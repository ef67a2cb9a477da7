pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use sts_core::config::{AppConfig, LoadOptions};

use crate::commands::assignment::BestEngineerArgs;
use crate::commands::tickets::{RaiseFaultArgs, RaiseInstallationArgs, TicketListArgs, TicketView};

#[derive(Debug, Parser)]
#[command(
    name = "sts",
    about = "Service ticket operator CLI",
    long_about = "Raise, assign and track installation and fault tickets against the local ticket database.",
    after_help = "Examples:\n  sts migrate\n  sts seed\n  sts raise-fault --user 1 --connection 302 --connection-type landline\n  sts tickets --view engineer-queue --id 10"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo dataset")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Look up the priority for a service type and connection type")]
    Priority {
        #[arg(long)]
        service: String,
        #[arg(long)]
        connection: String,
    },
    #[command(about = "Pick the engineer a new ticket at this location would get")]
    BestEngineer {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        pincode: u32,
        #[arg(long, help = "Engineer id to leave out of the selection")]
        exclude: Option<i64>,
    },
    #[command(about = "Show the assigned engineer's distance from a ticket")]
    Locate {
        #[arg(long)]
        ticket: i64,
    },
    #[command(about = "Raise a fault ticket for an existing connection")]
    RaiseFault {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        connection: i64,
        #[arg(long)]
        connection_type: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    #[command(about = "Create a connection and raise its installation ticket")]
    RaiseInstallation {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        connection_type: String,
        #[arg(long)]
        validity_months: u32,
        #[arg(long, default_value = "")]
        description: String,
    },
    #[command(about = "Change a ticket's status as its assigned engineer")]
    UpdateStatus {
        #[arg(long)]
        ticket: i64,
        #[arg(long)]
        engineer: i64,
        #[arg(long)]
        status: String,
    },
    #[command(about = "Move a DEFERRED or REJECTED ticket to another engineer")]
    Reassign {
        #[arg(long)]
        ticket: i64,
    },
    #[command(about = "List tickets for a user, an engineer or a pincode")]
    Tickets {
        #[arg(long, value_enum)]
        view: TicketView,
        #[arg(long, help = "User id, engineer id or pincode, depending on the view")]
        id: i64,
        #[arg(long, help = "Ticket status, required by the pincode-status view")]
        status: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Priority { service, connection } => commands::priority::run(&service, &connection),
        Command::BestEngineer { lat, lon, pincode, exclude } => {
            commands::assignment::run(BestEngineerArgs {
                latitude: lat,
                longitude: lon,
                pincode,
                exclude,
            })
        }
        Command::Locate { ticket } => commands::tickets::locate(ticket),
        Command::RaiseFault { user, connection, connection_type, description } => {
            commands::tickets::raise_fault(RaiseFaultArgs {
                user_id: user,
                connection_id: connection,
                connection_type,
                description,
            })
        }
        Command::RaiseInstallation { user, connection_type, validity_months, description } => {
            commands::tickets::raise_installation(RaiseInstallationArgs {
                user_id: user,
                connection_type,
                validity_months,
                description,
            })
        }
        Command::UpdateStatus { ticket, engineer, status } => {
            commands::tickets::update_status(ticket, engineer, &status)
        }
        Command::Reassign { ticket } => commands::tickets::reassign(ticket),
        Command::Tickets { view, id, status } => {
            commands::tickets::list(TicketListArgs { view, id }, status.as_deref())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Cli;

    #[test]
    fn command_definitions_are_consistent() {
        Cli::command().debug_assert();
    }
}
