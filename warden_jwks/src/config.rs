use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where to fetch the key set from, and how often
///
/// Durations are written as human-readable strings (`"15m"`, `"1h 30m"`) in
/// configuration files.
///
/// ```
/// use std::time::Duration;
/// use warden_jwks::KeyProviderConfig;
///
/// let config: KeyProviderConfig = serde_json::from_str(r#"{
///     "url": "https://auth.example.com/jwks.json",
///     "refresh_interval": "15m"
/// }"#).unwrap();
///
/// assert_eq!(config.refresh_interval, Duration::from_secs(900));
/// assert!(config.auto_infer_algorithm);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyProviderConfig {
    /// URL of the JWKS document
    pub url: String,

    /// Time between refresh attempts
    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub refresh_interval: Duration,

    /// Derive algorithms for keys that do not declare `alg`
    ///
    /// When disabled, such keys are discarded.
    #[serde(default = "default_auto_infer_algorithm")]
    pub auto_infer_algorithm: bool,

    /// Settings for the HTTP client used to fetch the document
    #[serde(default)]
    pub http_client: HttpClientConfig,
}

impl KeyProviderConfig {
    /// A configuration for the given URL with all other settings at their defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            auto_infer_algorithm: true,
            http_client: HttpClientConfig::default(),
        }
    }
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_auto_infer_algorithm() -> bool {
    true
}

/// HTTP client settings for fetching the key set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpClientConfig {
    /// Total time allowed for a single fetch
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// Time allowed to establish a connection
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Overrides the `User-Agent` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: None,
        }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn minimal_config_uses_defaults() -> Result<()> {
        let config: KeyProviderConfig =
            serde_json::from_str(r#"{"url":"https://auth.example.com/jwks.json"}"#)?;
        assert_eq!(config, KeyProviderConfig::new("https://auth.example.com/jwks.json"));
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.http_client.timeout, Duration::from_secs(30));
        assert_eq!(config.http_client.connect_timeout, Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn full_config() -> Result<()> {
        let config: KeyProviderConfig = serde_json::from_str(
            r#"{
                "url": "https://auth.example.com/jwks.json",
                "refresh_interval": "5m",
                "auto_infer_algorithm": false,
                "http_client": {
                    "timeout": "2s",
                    "connect_timeout": "500ms",
                    "user_agent": "gateway/1.0"
                }
            }"#,
        )?;
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert!(!config.auto_infer_algorithm);
        assert_eq!(config.http_client.connect_timeout, Duration::from_millis(500));
        assert_eq!(config.http_client.user_agent.as_deref(), Some("gateway/1.0"));
        Ok(())
    }

    #[test]
    fn rejects_unknown_fields() {
        let res: Result<KeyProviderConfig, _> = serde_json::from_str(
            r#"{"url":"https://auth.example.com/jwks.json","refresh":"5m"}"#,
        );
        assert!(res.is_err());
    }
}
