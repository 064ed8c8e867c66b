use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_jwks::{KeyProviderConfig, ProviderError};

use crate::Capabilities;

pub(crate) const DEFAULT_REALM: &str = "warden";

/// The configuration could not be turned into a working authenticator
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Authentication is disabled but other settings are present anyway
    #[error("auth is disabled, but basic, JWT, or realm settings are also present")]
    DisabledWithSchemes,

    /// Authentication is enabled but no scheme is configured
    #[error("auth is enabled, but neither basic nor JWT settings are present")]
    NoSchemeConfigured,

    /// A basic username contains `:`, which no client could ever send
    #[error("basic username '{username}' must not contain ':'")]
    InvalidUsername {
        /// The offending username
        username: String,
    },

    /// The key provider settings are invalid
    #[error("invalid JWT key provider settings")]
    KeyProvider(#[from] ProviderError),
}

/// Settings for request authentication
///
/// Exactly one outcome is valid: either `disable` is set and nothing else
/// is (not even `realm`), or `disable` is unset and at least one of `basic`
/// or `jwt` is populated. When both are populated, JWT wins and the basic
/// table is ignored.
///
/// ```
/// use warden::{Config, Scheme};
///
/// let config: Config = serde_json::from_str(r#"{
///     "basic": { "alice": "secret" }
/// }"#).unwrap();
///
/// assert!(matches!(config.validate(), Ok(Scheme::Basic(_))));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Admit every request without checking credentials
    #[serde(default)]
    pub disable: bool,

    /// Usernames mapped to passwords
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub basic: BTreeMap<String, String>,

    /// Bearer token settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<JwtConfig>,

    /// The realm named in `Basic` and `Bearer` challenges
    ///
    /// Defaults to `"warden"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("disable", &self.disable)
            .field("basic", &self.basic.keys().collect::<Vec<_>>())
            .field("jwt", &self.jwt)
            .field("realm", &self.realm)
            .finish()
    }
}

/// Settings for bearer token authentication
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtConfig {
    /// Where to fetch verification keys
    pub key_provider: KeyProviderConfig,

    /// A token must grant at least one of these; empty admits any valid token
    #[serde(default)]
    pub required_capabilities: Capabilities,

    /// Grace period around the `exp` and `nbf` claims
    #[serde(with = "humantime_serde", default)]
    pub leeway: Duration,
}

impl JwtConfig {
    /// Settings for the given key provider with no capability requirement
    pub fn new(key_provider: KeyProviderConfig) -> Self {
        Self {
            key_provider,
            required_capabilities: Capabilities::new(),
            leeway: Duration::ZERO,
        }
    }
}

/// The single scheme an authenticator enforces, chosen from a [`Config`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// Admit everything
    Disabled,

    /// Check usernames and passwords against the table
    Basic(BTreeMap<String, String>),

    /// Check bearer tokens against a remote key set
    Jwt(JwtConfig),
}

impl Config {
    /// A configuration that admits every request
    pub fn disabled() -> Self {
        Self {
            disable: true,
            ..Self::default()
        }
    }

    /// A configuration checking the given username and password table
    pub fn basic<I, U, P>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            basic: users
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// A configuration checking bearer tokens
    pub fn jwt(jwt: JwtConfig) -> Self {
        Self {
            jwt: Some(jwt),
            ..Self::default()
        }
    }

    /// The realm to name in challenges, falling back to the default
    #[must_use]
    pub fn realm(&self) -> &str {
        self.realm.as_deref().unwrap_or(DEFAULT_REALM)
    }

    /// Decides which scheme to enforce
    ///
    /// # Errors
    ///
    /// The combination of settings is invalid, or a basic username can
    /// never be presented by a client.
    pub fn validate(&self) -> Result<Scheme, ConfigError> {
        let has_basic = !self.basic.is_empty();

        if self.disable {
            if has_basic || self.jwt.is_some() || self.realm.is_some() {
                return Err(ConfigError::DisabledWithSchemes);
            }
            return Ok(Scheme::Disabled);
        }

        if let Some(jwt) = &self.jwt {
            if has_basic {
                tracing::warn!(
                    basic.users = self.basic.len(),
                    "both basic and JWT auth are configured; ignoring basic credentials"
                );
            }
            return Ok(Scheme::Jwt(jwt.clone()));
        }

        if !has_basic {
            return Err(ConfigError::NoSchemeConfigured);
        }

        if let Some(username) = self.basic.keys().find(|u| u.contains(':')) {
            return Err(ConfigError::InvalidUsername {
                username: username.clone(),
            });
        }

        Ok(Scheme::Basic(self.basic.clone()))
    }
}
