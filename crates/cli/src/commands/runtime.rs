//! Shared plumbing for commands that touch the database: config loading,
//! a single-threaded tokio runtime, the pool, and the lifecycle wiring.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sts_core::config::{AppConfig, LoadOptions};
use sts_core::{
    Collaborators, LifecycleOptions, SystemClock, TicketLifecycle, TracingAuditSink,
    TracingNotifier,
};
use sts_db::{
    connect_with_config, migrations, DbPool, SqlAccountRepository, SqlConnectionRepository,
    SqlLeaveRepository, SqlTicketRepository,
};

use crate::commands::{
    CommandResult, Failure, EXIT_CONFIG, EXIT_DB, EXIT_MIGRATION, EXIT_OPERATION, EXIT_RUNTIME,
};

/// Success message plus optional `data` payload.
pub(crate) type Outcome = Result<(String, Option<Value>), Failure>;

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

/// Loads config, opens the pool and runs `body` on a current-thread runtime.
/// The pool is closed whether `body` succeeds or not.
pub(crate) fn with_pool<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig, DbPool) -> Fut,
    Fut: Future<Output = Outcome>,
{
    let config = match load_config(command) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let result: Outcome = runtime.block_on(async move {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB))?;
        let outcome = body(config, pool.clone()).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok((message, Some(data))) => CommandResult::success_with_data(command, message, data),
        Ok((message, None)) => CommandResult::success(command, message),
        Err(failure) => CommandResult::from_failure(command, failure),
    }
}

pub(crate) async fn migrate(pool: &DbPool) -> Result<(), Failure> {
    migrations::run_pending(pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))
}

/// Production wiring: SQL repositories, wall clock, log-backed notifier and audit sink.
pub(crate) fn lifecycle(config: &AppConfig, pool: &DbPool) -> TicketLifecycle {
    TicketLifecycle::new(
        Collaborators {
            accounts: Arc::new(SqlAccountRepository::new(pool.clone())),
            tickets: Arc::new(SqlTicketRepository::new(pool.clone())),
            connections: Arc::new(SqlConnectionRepository::new(pool.clone())),
            leave: Arc::new(SqlLeaveRepository::new(pool.clone())),
            notifier: Arc::new(TracingNotifier),
            audit: Arc::new(TracingAuditSink),
            clock: Arc::new(SystemClock),
        },
        LifecycleOptions::from(&config.assignment),
    )
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, Failure> {
    serde_json::to_value(value).map_err(|error| ("serialization", error.to_string(), EXIT_OPERATION))
}
