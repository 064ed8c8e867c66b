use thiserror::Error;

/// The provider could not be constructed from its configuration
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The JWKS URL could not be parsed
    #[error("invalid JWKS URL")]
    InvalidUrl(#[from] url::ParseError),

    /// The JWKS URL does not use `http` or `https`
    #[error("JWKS URL must use http or https, not '{scheme}'")]
    UnsupportedScheme {
        /// The scheme of the rejected URL
        scheme: String,
    },

    /// The refresh interval is zero
    #[error("refresh interval must be greater than zero")]
    ZeroRefreshInterval,

    /// The HTTP client could not be built
    #[error("unable to build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// A single attempt to refresh the key set failed
///
/// The previous snapshot, if any, remains in use.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The request could not be completed
    #[error("unable to fetch JWKS")]
    Transport(#[source] reqwest::Error),

    /// The authority answered with a non-success status
    #[error("unexpected response status {status} fetching JWKS")]
    UnexpectedStatus {
        /// The HTTP status code received
        status: u16,
    },

    /// The response body is not a JWKS document
    #[error("response is not a valid JWKS document")]
    InvalidDocument(#[source] reqwest::Error),

    /// The document parsed, but none of its keys can verify signatures
    #[error("JWKS contains no usable keys")]
    NoUsableKeys,
}

/// No key set has been loaded yet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("no JWKS has been loaded yet")]
pub struct NoKeysAvailable {
    _p: (),
}

pub(crate) const fn no_keys_available() -> NoKeysAvailable {
    NoKeysAvailable { _p: () }
}
