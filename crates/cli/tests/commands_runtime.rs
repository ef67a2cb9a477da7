use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use sts_cli::commands::assignment::{self, BestEngineerArgs};
use sts_cli::commands::tickets::{
    self, RaiseFaultArgs, RaiseInstallationArgs, TicketListArgs, TicketView,
};
use sts_cli::commands::{config, migrate, priority, seed};

#[test]
fn migrate_returns_success_with_file_database() {
    with_database(|| {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("STS_DATABASE_URL", "postgres://localhost/sts")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database(|| {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed success: {}", first.output);
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed success: {}", second.output);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["message"], second_payload["message"]);
        assert_eq!(first_payload["data"]["tickets"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn config_reports_env_source_for_overridden_policy() {
    with_env(
        &[
            ("STS_DATABASE_URL", "sqlite::memory:"),
            ("STS_ASSIGNMENT_TRANSITION_POLICY", "permissive"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config success: {}", result.output);

            let payload = parse_payload(&result.output);
            let entries = payload["data"].as_array().expect("config entries");
            let policy = entries
                .iter()
                .find(|entry| entry["key"] == "assignment.transition_policy")
                .expect("transition policy entry");
            assert_eq!(policy["value"], "permissive");
            assert_eq!(policy["source"], "env (STS_ASSIGNMENT_TRANSITION_POLICY)");

            let level = entries
                .iter()
                .find(|entry| entry["key"] == "logging.level")
                .expect("logging level entry");
            assert_eq!(level["source"], "default");
        },
    );
}

#[test]
fn priority_lookup_needs_no_database() {
    let result = priority::run("installation", "dth");
    assert_eq!(result.exit_code, 0);
    assert_eq!(parse_payload(&result.output)["data"]["priority"], "P5");
}

#[test]
fn fault_on_busy_connection_is_a_conflict() {
    with_seeded_database(|| {
        let result = tickets::raise_fault(RaiseFaultArgs {
            user_id: 1,
            connection_id: 300,
            connection_type: "WIFI".to_string(),
            description: "Router keeps rebooting".to_string(),
        });
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "raise-fault");
        assert_eq!(payload["error_class"], "conflict");
    });
}

#[test]
fn installation_goes_to_only_approved_engineer_in_pincode() {
    with_seeded_database(|| {
        let result = tickets::raise_installation(RaiseInstallationArgs {
            user_id: 2,
            connection_type: "landline".to_string(),
            validity_months: 12,
            description: "Line for the shop floor".to_string(),
        });
        assert_eq!(result.exit_code, 0, "expected installation success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "Connection Created & Ticket Raised Successfully");
        assert_eq!(payload["data"]["engineer_id"], 13);
        assert_eq!(payload["data"]["status"], "PENDING");
        assert_eq!(payload["data"]["priority"], "P6");
    });
}

#[test]
fn completing_a_ticket_moves_it_to_user_history() {
    with_seeded_database(|| {
        let denied = tickets::update_status(1, 11, "COMPLETED");
        assert_eq!(denied.exit_code, 6);
        assert_eq!(parse_payload(&denied.output)["error_class"], "unauthorized");

        let result = tickets::update_status(1, 10, "completed");
        assert_eq!(result.exit_code, 0, "expected update success: {}", result.output);
        assert_eq!(parse_payload(&result.output)["data"]["status"], "COMPLETED");

        let history = tickets::list(TicketListArgs { view: TicketView::UserHistory, id: 1 }, None);
        let payload = parse_payload(&history.output);
        assert_eq!(payload["data"]["count"], 1);
        assert_eq!(payload["data"]["tickets"][0]["id"], 1);

        let pincode_history =
            tickets::list(TicketListArgs { view: TicketView::PincodeHistory, id: 560001 }, None);
        assert_eq!(pincode_history.exit_code, 0);
        assert_eq!(parse_payload(&pincode_history.output)["data"]["count"], 1);
    });
}

#[test]
fn strict_policy_rejects_reopening_a_deferred_ticket() {
    with_seeded_database(|| {
        let result = tickets::update_status(2, 13, "PENDING");
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_argument");
        assert_eq!(payload["message"], "invalid ticket transition from DEFERRED to PENDING");
    });
}

#[test]
fn reassignment_without_alternative_engineer_is_resource_exhausted() {
    with_seeded_database(|| {
        let result = tickets::reassign(2);
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "resource_exhausted");
        assert_eq!(payload["message"], "no available engineers found in pincode 560034");
    });
}

#[test]
fn best_engineer_prefers_idle_engineer_and_skips_leave() {
    with_seeded_database(|| {
        let result = assignment::run(BestEngineerArgs {
            latitude: 12.9141,
            longitude: 77.5101,
            pincode: 560001,
            exclude: None,
        });
        assert_eq!(result.exit_code, 0, "expected selection success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["engineer"]["id"], 11);
        assert_eq!(payload["data"]["workload"], 0);
        assert_eq!(payload["data"]["candidates_considered"], 2);

        let empty = assignment::run(BestEngineerArgs {
            latitude: 12.9141,
            longitude: 77.5101,
            pincode: 999999,
            exclude: None,
        });
        assert_eq!(empty.exit_code, 0);
        assert!(parse_payload(&empty.output)["data"]["engineer"].is_null());
    });
}

#[test]
fn locate_reports_assigned_engineer_distance() {
    with_seeded_database(|| {
        let result = tickets::locate(1);
        assert_eq!(result.exit_code, 0, "expected locate success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["engineer_id"], 10);
        let distance = payload["data"]["distance_km"].as_f64().expect("distance");
        assert!((distance - 1.912).abs() < 0.01, "unexpected distance {distance}");

        let unassigned = tickets::locate(3);
        assert_eq!(unassigned.exit_code, 6);
        assert_eq!(parse_payload(&unassigned.output)["error_class"], "not_found");
    });
}

#[test]
fn pincode_status_view_requires_status() {
    with_seeded_database(|| {
        let missing =
            tickets::list(TicketListArgs { view: TicketView::PincodeStatus, id: 560034 }, None);
        assert_eq!(missing.exit_code, 6);

        let deferred = tickets::list(
            TicketListArgs { view: TicketView::PincodeStatus, id: 560034 },
            Some("deferred"),
        );
        assert_eq!(deferred.exit_code, 0);
        assert_eq!(parse_payload(&deferred.output)["data"]["count"], 1);
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_seeded_database(test_fn: impl FnOnce()) {
    with_database(|| {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "seed failed: {}", seeded.output);
        test_fn();
    });
}

fn with_database(test_fn: impl FnOnce()) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("sts.db").display());
    with_env(&[("STS_DATABASE_URL", url.as_str())], test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "STS_DATABASE_URL",
        "STS_DATABASE_MAX_CONNECTIONS",
        "STS_DATABASE_TIMEOUT_SECS",
        "STS_ASSIGNMENT_SERIALIZE_BY_PINCODE",
        "STS_ASSIGNMENT_TRANSITION_POLICY",
        "STS_LOGGING_LEVEL",
        "STS_LOGGING_FORMAT",
        "STS_LOG_LEVEL",
        "STS_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
