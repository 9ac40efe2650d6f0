// Config loading tests - AgentConfig::load from disk and conversion into
// runtime options.

use corral_core::agent::AgentOptions;
use corral_core::config::{AgentConfig, ConfigError};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("agent.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

#[test]
fn returns_error_when_file_not_found() {
    let result = AgentConfig::load(Some(Path::new("/nonexistent/path/agent.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn returns_io_error_for_directory() {
    let dir = tempdir().expect("tempdir");
    let result = AgentConfig::load(Some(dir.path()));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn returns_parse_error_with_path() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[limits\nmax_iterations = 3");

    match AgentConfig::load(Some(&path)) {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn returns_error_when_timeout_is_zero() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[limits]\ntimeout_secs = 0\n");

    let error = AgentConfig::load(Some(&path)).expect_err("invalid timeout");
    assert_eq!(
        error.to_string(),
        "invalid value for 'limits.timeout_secs': must be at least 1"
    );
}

#[test]
fn returns_error_when_end_marker_blank() {
    let error = AgentConfig::from_toml_str("[conversation]\nend_of_conversation = \"  \"\n")
        .expect_err("blank marker");
    assert!(matches!(error, ConfigError::Invalid { .. }));
}

#[test]
fn loads_full_config_into_options() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
system_prompt = "You are a weather assistant."
max_output_tokens = 800

[limits]
max_iterations = 8
max_total_output_tokens = 4000
timeout_secs = 120

[repeat_guard]
threshold = 2

[retry]
max_attempts = 5
base_delay_ms = 200
max_delay_ms = 5000
jitter_ms = 50
retry_tools = true

[conversation]
history_window = 20
end_of_conversation = "bye"

[schema_overlay.get_weather]
city = "City name for weather lookup"

[[extractors]]
tool = "get_weather"
entity_field = "city"
attribute = "weather"
"#,
    );

    let config = AgentConfig::load(Some(&path)).expect("config loads");
    let options = AgentOptions::from(&config);

    assert_eq!(options.system_prompt, "You are a weather assistant.");
    assert_eq!(options.max_output_tokens, 800);
    assert_eq!(options.limits.max_iterations, 8);
    assert_eq!(options.limits.max_total_output_tokens, 4000);
    assert_eq!(options.limits.timeout, Duration::from_secs(120));
    assert_eq!(options.provider_retry.max_attempts, 5);
    assert_eq!(options.provider_retry.base_delay, Duration::from_millis(200));
    assert_eq!(options.tool_retry.as_ref(), Some(&options.provider_retry));
    assert_eq!(options.history_window, Some(20));
    assert_eq!(options.end_of_conversation, "bye");
    assert!(!config.schema_overlay.is_empty());
    assert!(!config.entity_extractors().is_empty());
}

#[test]
fn default_options_match_default_config() {
    let options = AgentOptions::from(&AgentConfig::default());
    assert_eq!(options, AgentOptions::default());
}
