use std::fmt;

use crate::Capabilities;

/// How a principal proved its identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// A username and password from the `Basic` scheme
    Basic,

    /// A JWT presented with the `Bearer` scheme
    Bearer,
}

impl AuthScheme {
    /// The scheme name as used in the `Authorization` header
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The authenticated caller of a request
///
/// Inserted into the request extensions once a request is admitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    name: String,
    capabilities: Capabilities,
    scheme: AuthScheme,
}

impl Principal {
    pub(crate) fn basic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::new(),
            scheme: AuthScheme::Basic,
        }
    }

    pub(crate) fn bearer(name: String, capabilities: Capabilities) -> Self {
        Self {
            name,
            capabilities,
            scheme: AuthScheme::Bearer,
        }
    }

    /// The username, or the `sub` claim of a token
    ///
    /// Empty when a token carries no subject.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capabilities granted to the principal
    ///
    /// Always empty for basic credentials.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The scheme that authenticated the principal
    #[must_use]
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }
}
