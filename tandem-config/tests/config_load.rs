use serial_test::serial;
use std::{fs, path::PathBuf};
use tandem_common::observability::LogFormat;
use tandem_config::{TandemConfigLoader, TransformKind};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
server:
  bind: "0.0.0.0:8080"
browser:
  target_url: "https://intranet.example.net/portal"
  window: [1024, 768]
  extra_args: ["--lang=en-US"]
intercept:
  cache_dir: "/var/cache/tandem"
  transform: format
  patterns:
    - url_pattern: "*://static.example.net/*.js"
    - url_pattern: "*://static.example.net/*.css"
      resource_kind: Stylesheet
logging:
  format: json
  emit_stderr: false
  filter: "debug,mirror.diff=trace"
"#;
    let p = write_yaml(&tmp, "tandem.yaml", file_yaml);

    let config = TandemConfigLoader::new()
        .with_file(p)
        .load()
        .expect("load tandem config");

    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.browser.window, (1024, 768));
    assert_eq!(config.browser.extra_args, vec!["--lang=en-US".to_string()]);
    assert_eq!(config.intercept.patterns.len(), 2);
    assert_eq!(config.intercept.patterns[0].resource_kind, "Script");
    assert_eq!(config.intercept.patterns[1].resource_kind, "Stylesheet");
    assert_eq!(
        config.intercept.cache_dir.as_deref(),
        Some(std::path::Path::new("/var/cache/tandem"))
    );
    assert_eq!(config.intercept.transform, TransformKind::Format);
    assert_eq!(config.logging.format, LogFormat::Json);

    let log = config.logging.to_log_config("tandem");
    assert!(!log.emit_stderr);
    assert_eq!(log.default_filter, "debug,mirror.diff=trace");
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = TandemConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");

    assert_eq!(config.server.bind, "127.0.0.1:3000");
    assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
    assert!(config.browser.headless);
    assert_eq!(config.mirror.cycle_interval_ms, 100);
    assert_eq!(config.mirror.retry_initial_ms, 50);
    assert_eq!(config.mirror.retry_max_ms, 1000);
    assert_eq!(config.mirror.click_timeout_ms, 2000);
    assert!(config.intercept.cache_dir.is_none());
    assert_eq!(config.intercept.transform, TransformKind::Passthrough);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = TandemConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "tandem.yaml",
        "mirror:\n  cycle_interval_ms: 100\nserver:\n  bind: \"127.0.0.1:3000\"\n",
    );

    temp_env::with_vars(
        [
            ("TANDEM__MIRROR__CYCLE_INTERVAL_MS", Some("250")),
            ("TANDEM__SERVER__BIND", Some("127.0.0.1:4000")),
        ],
        || {
            let config = TandemConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("env overlay");
            assert_eq!(config.mirror.cycle_interval_ms, 250);
            assert_eq!(config.server.bind, "127.0.0.1:4000");
        },
    );
}

#[test]
#[serial]
fn later_yaml_snippets_win() {
    let config = TandemConfigLoader::new()
        .with_yaml_str("browser:\n  headless: true\n  target_url: https://a.example/\n")
        .with_yaml_str("browser:\n  headless: false\n")
        .load()
        .expect("merged");
    assert!(!config.browser.headless);
    assert_eq!(config.browser.target_url, "https://a.example/");
}
