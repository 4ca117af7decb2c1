//! Loader for Tandem configuration with YAML + environment overlays.
//!
//! Sources are merged in order: YAML files (required or optional), inline
//! YAML snippets, then `TANDEM__`-prefixed environment variables
//! (`TANDEM__MIRROR__CYCLE_INTERVAL_MS=250` sets `mirror.cycle_interval_ms`).
//! `${VAR}` references inside string values are expanded last. Every section
//! has defaults, so an empty document is a valid configuration.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tandem_common::observability::{LogConfig, LogFormat};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TandemConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub intercept: InterceptConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// W3C WebDriver endpoint (chromedriver).
    pub webdriver_url: String,
    /// Page every new session opens.
    pub target_url: String,
    pub headless: bool,
    pub window: (u32, u32),
    /// Additional Chrome command-line switches.
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            target_url: "https://example.com/".into(),
            headless: true,
            window: (1280, 800),
            extra_args: Vec::new(),
        }
    }
}

/// Timing of the per-session loops.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub cycle_interval_ms: u64,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    pub url_poll_ms: u64,
    pub click_timeout_ms: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 100,
            retry_initial_ms: 50,
            retry_max_ms: 1000,
            url_poll_ms: 1000,
            click_timeout_ms: 2000,
        }
    }
}

impl MirrorConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn retry_initial(&self) -> Duration {
        Duration::from_millis(self.retry_initial_ms.max(1))
    }

    pub fn retry_max(&self) -> Duration {
        Duration::from_millis(self.retry_max_ms.max(self.retry_initial_ms).max(1))
    }

    pub fn url_poll(&self) -> Duration {
        Duration::from_millis(self.url_poll_ms.max(1))
    }

    pub fn click_timeout(&self) -> Duration {
        Duration::from_millis(self.click_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    pub patterns: Vec<InterceptPatternConfig>,
    /// Optional on-disk copy of cached resources.
    pub cache_dir: Option<PathBuf>,
    /// Rewrite applied to intercepted script bodies.
    pub transform: TransformKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Serve bodies as received.
    #[default]
    Passthrough,
    /// Re-indent scripts.
    Format,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterceptPatternConfig {
    /// DevTools URL pattern (`*` and `?` wildcards).
    pub url_pattern: String,
    /// DevTools resource type name, e.g. `Script` or `Stylesheet`.
    #[serde(default = "default_resource_kind")]
    pub resource_kind: String,
}

fn default_resource_kind() -> String {
    "Script".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub dir: Option<PathBuf>,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: true,
            dir: None,
            filter: "info".into(),
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self, app_name: &str) -> LogConfig {
        LogConfig {
            app_name: app_name.to_string(),
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

/// Default location of the user-level config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tandem").join("tandem.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TandemConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TandemConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TandemConfigLoader {
    /// Start with no files; `TANDEM__` environment overrides are always on.
    ///
    /// ```
    /// use tandem_config::TandemConfigLoader;
    ///
    /// let config = TandemConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.server.bind, "127.0.0.1:3000");
    /// assert!(config.intercept.patterns.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing, so deployments can rely
    /// purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use tandem_config::TandemConfigLoader;
    ///
    /// let cfg = TandemConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// intercept:
    ///   patterns:
    ///     - url_pattern: "*://cdn.example.com/*.js"
    /// mirror:
    ///   cycle_interval_ms: 250
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.intercept.patterns[0].resource_kind, "Script");
    /// assert_eq!(cfg.mirror.cycle_interval_ms, 250);
    /// assert_eq!(cfg.mirror.url_poll_ms, 1000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use tandem_config::TandemConfigLoader;
    ///
    /// unsafe { std::env::set_var("TANDEM_DOC_TARGET", "https://docs.example.org/start"); }
    ///
    /// let config = TandemConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// browser:
    ///   target_url: "${TANDEM_DOC_TARGET}"
    ///   headless: false
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.browser.target_url, "https://docs.example.org/start");
    /// assert!(!config.browser.headless);
    /// assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
    ///
    /// unsafe { std::env::remove_var("TANDEM_DOC_TARGET"); }
    /// ```
    pub fn load(self) -> Result<TandemConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("TANDEM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: TandemConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
