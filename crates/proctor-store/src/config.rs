//! Proctor configuration and store/sink factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use proctor_core::proctor::DeliveryPolicy;
use proctor_core::traits::{ExamStore, ReportSink};

use crate::fs::{FsExamStore, FsReportSink};
use crate::http::{HttpExamStore, HttpReportSink};

/// Where exam definitions come from.
///
/// Note: Custom Debug impl masks API tokens to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    Fs {
        #[serde(default = "default_exams_dir")]
        exams_dir: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
    },
}

/// Where scored reports go.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Fs {
        #[serde(default = "default_reports_dir")]
        reports_dir: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
    },
}

fn masked(token: &Option<String>) -> Option<&'static str> {
    token.as_ref().map(|_| "***")
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Fs { exams_dir } => {
                f.debug_struct("Fs").field("exams_dir", exams_dir).finish()
            }
            StoreConfig::Http { base_url, token } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("token", &masked(token))
                .finish(),
        }
    }
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkConfig::Fs { reports_dir } => f
                .debug_struct("Fs")
                .field("reports_dir", reports_dir)
                .finish(),
            SinkConfig::Http { base_url, token } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("token", &masked(token))
                .finish(),
        }
    }
}

fn default_exams_dir() -> PathBuf {
    PathBuf::from("./exams")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("./proctor-reports")
}

/// Top-level proctor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctorConfig {
    #[serde(default = "default_store")]
    pub store: StoreConfig,
    #[serde(default = "default_sink")]
    pub sink: SinkConfig,
    /// Identity recorded on submitted reports.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Max retries on report delivery errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Length of one countdown second in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_store() -> StoreConfig {
    StoreConfig::Fs {
        exams_dir: default_exams_dir(),
    }
}
fn default_sink() -> SinkConfig {
    SinkConfig::Fs {
        reports_dir: default_reports_dir(),
    }
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_tick_interval() -> u64 {
    1000
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            sink: default_sink(),
            user_id: None,
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl ProctorConfig {
    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_token(token: &Option<String>) -> Option<String> {
    token
        .as_ref()
        .map(|t| resolve_env_vars(t))
        .filter(|t| !t.is_empty())
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::Fs { exams_dir } => StoreConfig::Fs {
            exams_dir: PathBuf::from(resolve_env_vars(&exams_dir.to_string_lossy())),
        },
        StoreConfig::Http { base_url, token } => StoreConfig::Http {
            base_url: resolve_env_vars(base_url),
            token: resolve_token(token),
        },
    }
}

fn resolve_sink_config(config: &SinkConfig) -> SinkConfig {
    match config {
        SinkConfig::Fs { reports_dir } => SinkConfig::Fs {
            reports_dir: PathBuf::from(resolve_env_vars(&reports_dir.to_string_lossy())),
        },
        SinkConfig::Http { base_url, token } => SinkConfig::Http {
            base_url: resolve_env_vars(base_url),
            token: resolve_token(token),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `proctor.toml` in the current directory
/// 2. `~/.config/proctor/config.toml`
///
/// Environment variable overrides: `PROCTOR_USER_ID`, `PROCTOR_API_TOKEN`.
pub fn load_config() -> Result<ProctorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ProctorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("proctor.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ProctorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ProctorConfig::default(),
    };

    config.store = resolve_store_config(&config.store);
    config.sink = resolve_sink_config(&config.sink);
    config.user_id = config.user_id.as_deref().map(resolve_env_vars);

    // Apply env var overrides
    if let Ok(user) = std::env::var("PROCTOR_USER_ID") {
        config.user_id = Some(user);
    }
    if let Ok(key) = std::env::var("PROCTOR_API_TOKEN") {
        if let StoreConfig::Http { token, .. } = &mut config.store {
            *token = Some(key.clone());
        }
        if let SinkConfig::Http { token, .. } = &mut config.sink {
            *token = Some(key);
        }
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("proctor"))
}

/// Create an exam store from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ExamStore>> {
    match config {
        StoreConfig::Fs { exams_dir } => Ok(Arc::new(FsExamStore::new(exams_dir))),
        StoreConfig::Http { base_url, token } => {
            Ok(Arc::new(HttpExamStore::new(base_url, token.clone())?))
        }
    }
}

/// Create a report sink from its configuration.
pub fn create_sink(config: &SinkConfig) -> Result<Arc<dyn ReportSink>> {
    match config {
        SinkConfig::Fs { reports_dir } => Ok(Arc::new(FsReportSink::new(reports_dir))),
        SinkConfig::Http { base_url, token } => {
            Ok(Arc::new(HttpReportSink::new(base_url, token.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_PROCTOR_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_PROCTOR_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_PROCTOR_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_PROCTOR_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_rescan_values() {
        std::env::set_var("_PROCTOR_TEST_SELF", "x${_PROCTOR_TEST_SELF}");
        assert_eq!(
            resolve_env_vars("${_PROCTOR_TEST_SELF}/${MISSING_PROCTOR_VAR}"),
            "x${_PROCTOR_TEST_SELF}/"
        );
        assert_eq!(resolve_env_vars("open ${brace"), "open ${brace");
        std::env::remove_var("_PROCTOR_TEST_SELF");
    }

    #[test]
    fn default_config() {
        let config = ProctorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.tick_period(), Duration::from_secs(1));
        assert!(matches!(config.store, StoreConfig::Fs { .. }));
        assert!(config.user_id.is_none());
    }

    #[test]
    fn parse_http_config() {
        let toml_str = r#"
user_id = "alice"
max_retries = 5
retry_delay_ms = 250

[store]
type = "http"
base_url = "https://portal.example.com"
token = "tok-123"

[sink]
type = "fs"
reports_dir = "/tmp/reports"
"#;
        let config: ProctorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("alice"));
        assert_eq!(
            config.delivery_policy().retry_delay,
            Duration::from_millis(250)
        );
        assert!(matches!(config.store, StoreConfig::Http { .. }));
        assert!(matches!(config.sink, SinkConfig::Fs { .. }));
    }

    #[test]
    fn debug_masks_tokens() {
        let config = StoreConfig::Http {
            base_url: "https://portal.example.com".into(),
            token: Some("tok-123".into()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("tok-123"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn explicit_missing_path_errors() {
        let err = load_config_from(Some(Path::new("/no/such/proctor.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_file_expands_vars() {
        std::env::set_var("_PROCTOR_TEST_DIR", "/srv/exams");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proctor.toml");
        std::fs::write(
            &path,
            "[store]\ntype = \"fs\"\nexams_dir = \"${_PROCTOR_TEST_DIR}/core\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        match config.store {
            StoreConfig::Fs { exams_dir } => {
                assert_eq!(exams_dir, PathBuf::from("/srv/exams/core"))
            }
            other => panic!("unexpected store: {other:?}"),
        }
        std::env::remove_var("_PROCTOR_TEST_DIR");
    }
}
