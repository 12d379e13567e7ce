//! Environment variable fallbacks.
//!
//! Env vars are a fallback, not an override: they only fill fields the
//! config file left unset.
//!
//! [`DATA_DIR_VAR`] is not mapped here. The binary binds it to its
//! `--data-dir` flag, which anchors relative paths to the working directory.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

/// Env var naming the data directory, read by the `--data-dir` flag.
pub const DATA_DIR_VAR: &str = "AGENTMESH_DATA_DIR";

/// Env var that supplies `logging.level`.
pub const LOG_LEVEL_VAR: &str = "AGENTMESH_LOG";

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[EnvMapping {
    var_name: LOG_LEVEL_VAR,
    field_path: "logging.level",
}];

/// Snapshot the `AGENTMESH_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("AGENTMESH_"))
        .collect()
}

/// Fill unset fields of `merged` from `env_vars`.
///
/// Empty values are ignored. Returns the number of fields filled.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.is_empty()) else {
            continue;
        };
        if field_is_set(merged, mapping.field_path) {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, val);
        count = count.saturating_add(1);
    }

    count
}

fn field_is_set(root: &toml::Value, path: &str) -> bool {
    let mut current = root;
    for key in path.split('.') {
        match current.get(key) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

fn set_field(root: &mut toml::Value, path: &str, val: &str) {
    let mut current = root;
    let mut keys = path.split('.').peekable();
    while let Some(key) = keys.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if keys.peek().is_none() {
            table.insert(key.to_owned(), toml::Value::String(val.to_owned()));
            return;
        }
        current = table
            .entry(key)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn relative_data_dir_var_does_not_reach_config() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        assert_eq!(apply_env_fallbacks(&mut merged, &env(&[(DATA_DIR_VAR, ".agentmesh")])), 0);
        assert!(merged.get("data_dir").is_none());
    }

    #[test]
    fn fills_missing_fields() {
        let mut merged: toml::Value = toml::from_str("name = \"a\"").unwrap();
        let applied = apply_env_fallbacks(
            &mut merged,
            &env(&[(DATA_DIR_VAR, "/srv/agent"), (LOG_LEVEL_VAR, "debug")]),
        );

        assert_eq!(applied, 1);
        assert!(merged.get("data_dir").is_none());
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn file_values_win() {
        let mut merged: toml::Value = toml::from_str(
            r#"
            data_dir = "/from/file"
            [logging]
            level = "warn"
            "#,
        )
        .unwrap();
        let applied = apply_env_fallbacks(&mut merged, &env(&[(LOG_LEVEL_VAR, "trace")]));

        assert_eq!(applied, 0);
        assert_eq!(merged["data_dir"].as_str(), Some("/from/file"));
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        assert_eq!(apply_env_fallbacks(&mut merged, &env(&[(LOG_LEVEL_VAR, "")])), 0);
        assert!(merged.get("logging").is_none());
    }

    #[test]
    fn keeps_sibling_fields_in_existing_section() {
        let mut merged: toml::Value = toml::from_str("[logging]\nformat = \"json\"").unwrap();
        apply_env_fallbacks(&mut merged, &env(&[(LOG_LEVEL_VAR, "error")]));
        assert_eq!(merged["logging"]["format"].as_str(), Some("json"));
        assert_eq!(merged["logging"]["level"].as_str(), Some("error"));
    }
}
