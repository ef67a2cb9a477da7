use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sts_core::config::AppConfig;
use sts_core::TransitionPolicy;
use toml::Value;

use crate::commands::runtime::{load_config, to_data};
use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let entries = entries(&config)
        .into_iter()
        .map(|(key, env_keys, value)| ConfigEntry {
            key,
            value,
            source: field_source(
                key,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect::<Vec<_>>();

    match to_data(&entries) {
        Ok(data) => CommandResult::success_with_data(
            "config",
            "effective config (source precedence: env > file > default)",
            data,
        ),
        Err(failure) => CommandResult::from_failure("config", failure),
    }
}

type Entry = (&'static str, &'static [&'static str], String);

fn entries(config: &AppConfig) -> Vec<Entry> {
    let policy = match config.assignment.transition_policy {
        TransitionPolicy::Strict => "strict",
        TransitionPolicy::Permissive => "permissive",
    };

    let mut entries: Vec<Entry> = Vec::new();
    entries.push(("database.url", &["STS_DATABASE_URL"], config.database.url.clone()));
    entries.push((
        "database.max_connections",
        &["STS_DATABASE_MAX_CONNECTIONS"],
        config.database.max_connections.to_string(),
    ));
    entries.push((
        "database.timeout_secs",
        &["STS_DATABASE_TIMEOUT_SECS"],
        config.database.timeout_secs.to_string(),
    ));
    entries.push((
        "assignment.serialize_by_pincode",
        &["STS_ASSIGNMENT_SERIALIZE_BY_PINCODE"],
        config.assignment.serialize_by_pincode.to_string(),
    ));
    entries.push((
        "assignment.transition_policy",
        &["STS_ASSIGNMENT_TRANSITION_POLICY"],
        policy.to_string(),
    ));
    entries.push((
        "logging.level",
        &["STS_LOGGING_LEVEL", "STS_LOG_LEVEL"],
        config.logging.level.clone(),
    ));
    entries.push((
        "logging.format",
        &["STS_LOGGING_FORMAT", "STS_LOG_FORMAT"],
        format!("{:?}", config.logging.format).to_ascii_lowercase(),
    ));
    entries
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("sts.toml"), PathBuf::from("config/sts.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    toml::from_str::<toml::Table>(&raw).ok().map(Value::Table)
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{contains_path, field_source};

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let table: toml::Table =
            toml::from_str("[assignment]\ntransition_policy = \"permissive\"\n").expect("toml");
        let doc = toml::Value::Table(table);

        assert!(contains_path(&doc, "assignment.transition_policy"));
        assert!(!contains_path(&doc, "assignment.serialize_by_pincode"));
        assert_eq!(
            field_source(
                "assignment.transition_policy",
                &["STS_TEST_UNSET_TRANSITION_POLICY"],
                Some(&doc),
                Some(Path::new("sts.toml")),
            ),
            "file (sts.toml)"
        );
    }

    #[test]
    fn missing_everywhere_is_default() {
        assert_eq!(field_source("database.url", &["STS_TEST_UNSET_URL"], None, None), "default");
    }
}
