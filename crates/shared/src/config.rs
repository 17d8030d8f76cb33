use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config_env::{optional_trimmed_env, parse_http_url_env, parse_u64_env, process_env};
use crate::flows::retrieval::EvictionPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://webanalyzer-veridia.onrender.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const ANALYZER_PATH: &str = "web-analyzer";
const SESSION_DIR_NAME: &str = "veridia";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_base_url: String,
    pub create_url: String,
    pub model: String,
    /// `None` leaves requests without a deadline.
    pub timeout_ms: Option<u64>,
    pub session_file: PathBuf,
    pub eviction_policy: EvictionPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("could not determine a data directory for the session file; set VERIDIA_SESSION_FILE")]
    NoDataDir,
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url =
            parse_http_url_env(lookup, "VERIDIA_API_BASE_URL", Some(DEFAULT_API_BASE_URL))?
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string();

        let create_url = parse_http_url_env(lookup, "VERIDIA_API_POST", None)?
            .unwrap_or_else(|| collection_url(&api_base_url));

        let timeout_ms = match parse_u64_env(lookup, "VERIDIA_TIMEOUT_MS", 0)? {
            0 => None,
            value => Some(value),
        };

        let session_file = match optional_trimmed_env(lookup, "VERIDIA_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_session_file()?,
        };

        let eviction_policy = match optional_trimmed_env(lookup, "VERIDIA_EVICT_SESSION_ON") {
            Some(raw) => EvictionPolicy::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidConfiguration(format!(
                    "VERIDIA_EVICT_SESSION_ON must be any_error or not_found, got '{raw}'"
                ))
            })?,
            None => EvictionPolicy::default(),
        };

        Ok(Self {
            api_base_url,
            create_url,
            model: optional_trimmed_env(lookup, "VERIDIA_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms,
            session_file,
            eviction_policy,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn list_url(&self) -> String {
        collection_url(&self.api_base_url)
    }

    pub fn fetch_url_base(&self) -> String {
        format!("{}/{ANALYZER_PATH}", self.api_base_url)
    }
}

fn collection_url(base: &str) -> String {
    format!("{base}/{ANALYZER_PATH}/")
}

fn default_session_file() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(SESSION_DIR_NAME).join(SESSION_FILE_NAME))
        .ok_or(ConfigError::NoDataDir)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_hosted_analyzer() {
        let lookup = lookup_from(&[("VERIDIA_SESSION_FILE", "/tmp/veridia/session.json")]);
        let config = AnalyzerConfig::from_lookup(&lookup).expect("defaults should parse");

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(
            config.create_url,
            "https://webanalyzer-veridia.onrender.com/web-analyzer/"
        );
        assert_eq!(config.list_url(), config.create_url);
        assert_eq!(
            config.fetch_url_base(),
            "https://webanalyzer-veridia.onrender.com/web-analyzer"
        );
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.timeout().is_none());
        assert_eq!(config.eviction_policy, EvictionPolicy::AnyError);
    }

    #[test]
    fn create_url_override_targets_proxy() {
        let lookup = lookup_from(&[
            ("VERIDIA_API_BASE_URL", "http://localhost:9000/"),
            ("VERIDIA_API_POST", "http://localhost:4321/api/analyze"),
            ("VERIDIA_SESSION_FILE", "/tmp/s.json"),
        ]);
        let config = AnalyzerConfig::from_lookup(&lookup).expect("config should parse");

        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.create_url, "http://localhost:4321/api/analyze");
        assert_eq!(config.list_url(), "http://localhost:9000/web-analyzer/");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let lookup = lookup_from(&[
            ("VERIDIA_API_BASE_URL", "ftp://example.com"),
            ("VERIDIA_SESSION_FILE", "/tmp/s.json"),
        ]);
        let err = AnalyzerConfig::from_lookup(&lookup).expect_err("ftp should be rejected");
        assert!(matches!(err, ConfigError::InvalidConfiguration(ref msg) if msg.contains("VERIDIA_API_BASE_URL")));
    }

    #[test]
    fn parses_timeout_and_eviction_policy() {
        let lookup = lookup_from(&[
            ("VERIDIA_TIMEOUT_MS", " 2500 "),
            ("VERIDIA_EVICT_SESSION_ON", "not_found"),
            ("VERIDIA_SESSION_FILE", "/tmp/s.json"),
        ]);
        let config = AnalyzerConfig::from_lookup(&lookup).expect("config should parse");

        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.eviction_policy, EvictionPolicy::NotFoundOnly);
    }

    #[test]
    fn rejects_garbage_timeout() {
        let lookup = lookup_from(&[
            ("VERIDIA_TIMEOUT_MS", "soon"),
            ("VERIDIA_SESSION_FILE", "/tmp/s.json"),
        ]);
        let err = AnalyzerConfig::from_lookup(&lookup).expect_err("timeout should be rejected");
        assert!(matches!(err, ConfigError::ParseInt { ref key, .. } if key == "VERIDIA_TIMEOUT_MS"));
    }

    #[test]
    fn rejects_unknown_eviction_policy() {
        let lookup = lookup_from(&[
            ("VERIDIA_EVICT_SESSION_ON", "sometimes"),
            ("VERIDIA_SESSION_FILE", "/tmp/s.json"),
        ]);
        assert!(AnalyzerConfig::from_lookup(&lookup).is_err());
    }
}
