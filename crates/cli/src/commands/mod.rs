pub mod assignment;
pub mod config;
pub mod migrate;
pub mod priority;
pub mod runtime;
pub mod seed;
pub mod tickets;

use serde::Serialize;
use serde_json::Value;
use sts_core::ServiceError;

pub(crate) const EXIT_CONFIG: u8 = 2;
pub(crate) const EXIT_RUNTIME: u8 = 3;
pub(crate) const EXIT_DB: u8 = 4;
pub(crate) const EXIT_MIGRATION: u8 = 5;
pub(crate) const EXIT_OPERATION: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// A failed step inside a command: error class, message and exit code.
pub(crate) type Failure = (&'static str, String, u8);

pub(crate) fn operation_failure(error: ServiceError) -> Failure {
    (error.kind().as_str(), error.to_string(), EXIT_OPERATION)
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::emit(command, "ok", None, message.into(), None, 0)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: Value) -> Self {
        Self::emit(command, "ok", None, message.into(), Some(data), 0)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::emit(command, "error", Some(error_class.to_string()), message.into(), None, exit_code)
    }

    pub(crate) fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    fn emit(
        command: &str,
        status: &str,
        error_class: Option<String>,
        message: String,
        data: Option<Value>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class,
            message,
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use sts_core::{Pincode, ServiceError};

    use super::{operation_failure, CommandResult, EXIT_OPERATION};

    #[test]
    fn success_without_data_omits_the_field() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn success_with_data_embeds_payload() {
        let result =
            CommandResult::success_with_data("priority", "priority derived", json!({"priority": "P1"}));
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["data"]["priority"], "P1");
    }

    #[test]
    fn service_errors_map_to_kind_and_operation_exit_code() {
        let failure = operation_failure(ServiceError::NoAvailableEngineer(Pincode(560001)));
        let result = CommandResult::from_failure("raise-fault", failure);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, EXIT_OPERATION);
        assert_eq!(payload["error_class"], "resource_exhausted");
        assert_eq!(payload["message"], "no available engineers found in pincode 560001");
    }
}
