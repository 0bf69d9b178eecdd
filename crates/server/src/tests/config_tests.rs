use super::{normalize_database_url, resolve_settings, Settings};

use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = resolve_settings(None, &HashMap::new());
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_bind, "127.0.0.1:3000");
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
bind_addr = "0.0.0.0:8080"
database_url = "sqlite://./games.db"
log_filter = "debug"
"#;
    let settings = resolve_settings(Some(raw), &HashMap::new());
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.database_url, "sqlite://./games.db");
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let raw = r#"bind_addr = "0.0.0.0:8080""#;
    let settings = resolve_settings(
        Some(raw),
        &env(&[
            ("SERVER_BIND", "127.0.0.1:9000"),
            ("APP__BIND_ADDR", "127.0.0.1:9001"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("RUST_LOG", "warn"),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:9001");
    assert_eq!(settings.database_url, "sqlite::memory:");
    assert_eq!(settings.log_filter, "warn");
}

#[test]
fn malformed_file_is_ignored() {
    let settings = resolve_settings(Some("bind_addr = ["), &HashMap::new());
    assert_eq!(settings, Settings::default());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn empty_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
}

#[test]
fn keeps_memory_url() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn normalizes_windows_plain_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[tokio::test]
async fn normalized_plain_path_opens_in_missing_directory() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("connect4.db");

    let normalized = normalize_database_url(db_path.to_string_lossy().as_ref());
    let storage = storage::Storage::new(&normalized).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
