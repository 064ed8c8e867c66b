use std::sync::Arc;

use aliri_traits::Policy;
use http::{header, HeaderMap, StatusCode};
use warden_jwks::{KeyProvider, RefreshHandle};

use crate::{
    basic::{BadCredentials, BasicCredentials, BasicValidator},
    capability::{CapabilityPolicy, InsufficientCapabilities},
    config::{Config, ConfigError, Scheme, DEFAULT_REALM},
    token::{TokenError, TokenValidator},
    AuthScheme, Capabilities, Principal,
};

/// Why a request was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// No `Authorization` header for the expected scheme was present
    #[error("credentials are missing")]
    MissingCredentials,

    /// The `Basic` credentials could not be decoded
    #[error("credentials are malformed")]
    MalformedCredentials,

    /// The username or password is wrong
    #[error(transparent)]
    BadCredentials(#[from] BadCredentials),

    /// The bearer token was rejected
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The token is valid but grants none of the required capabilities
    #[error(transparent)]
    InsufficientCapabilities(#[from] InsufficientCapabilities),
}

impl Rejection {
    /// The status code to answer with
    ///
    /// Authentication failures are `401`, an unparseable token is `400`, and
    /// a token lacking capabilities is `403`.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Token(TokenError::Malformed) => StatusCode::BAD_REQUEST,
            Self::InsufficientCapabilities(_) => StatusCode::FORBIDDEN,
            Self::MissingCredentials
            | Self::MalformedCredentials
            | Self::BadCredentials(_)
            | Self::Token(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

/// The challenge to send back with a refusal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Challenge {
    /// `Basic realm="..."`
    Basic,

    /// `Bearer realm="..."`, when no token was offered
    Bearer,

    /// `Bearer error="invalid_request"`
    InvalidRequest,

    /// `Bearer error="invalid_token"`
    InvalidToken,

    /// `Bearer error="insufficient_scope"`
    InsufficientScope,
}

/// The outcome of authenticating a single request
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct AuthDecision {
    scheme: Option<AuthScheme>,
    outcome: Result<Option<Principal>, Rejection>,
}

impl AuthDecision {
    fn allow(principal: Option<Principal>) -> Self {
        Self {
            scheme: principal.as_ref().map(Principal::scheme),
            outcome: Ok(principal),
        }
    }

    fn deny(scheme: AuthScheme, reason: Rejection) -> Self {
        Self {
            scheme: Some(scheme),
            outcome: Err(reason),
        }
    }

    /// Whether the request may proceed
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The status to answer with if the request is refused
    ///
    /// `200 OK` when the request is allowed.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.outcome {
            Ok(_) => StatusCode::OK,
            Err(reason) => reason.status(),
        }
    }

    /// The authenticated caller
    ///
    /// `None` when refused, or when authentication is disabled.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.outcome.as_ref().ok().and_then(Option::as_ref)
    }

    /// Takes the authenticated caller out of the decision
    #[must_use]
    pub fn into_principal(self) -> Option<Principal> {
        self.outcome.ok().flatten()
    }

    /// Why the request was refused
    #[must_use]
    pub fn reason(&self) -> Option<Rejection> {
        self.outcome.as_ref().err().copied()
    }

    /// The challenge to send with a refusal
    #[must_use]
    pub fn challenge(&self) -> Option<Challenge> {
        let reason = self.reason()?;
        let challenge = match (self.scheme?, reason) {
            (AuthScheme::Basic, _) => Challenge::Basic,
            (AuthScheme::Bearer, Rejection::MissingCredentials) => Challenge::Bearer,
            (AuthScheme::Bearer, Rejection::InsufficientCapabilities(_)) => {
                Challenge::InsufficientScope
            }
            (AuthScheme::Bearer, Rejection::Token(TokenError::Malformed)) => {
                Challenge::InvalidRequest
            }
            (AuthScheme::Bearer, _) => Challenge::InvalidToken,
        };
        Some(challenge)
    }
}

#[derive(Debug)]
struct Jwt {
    tokens: TokenValidator,
    policy: CapabilityPolicy,
}

#[derive(Debug)]
enum Mode {
    Disabled,
    Basic(BasicValidator),
    Jwt(Jwt),
}

/// Authenticates requests according to one scheme fixed at construction
///
/// Cloning is cheap and clones share the same credential tables and keys.
/// The realm belongs to each handle, so renaming it on a clone leaves the
/// others untouched.
#[derive(Clone, Debug)]
pub struct Auth {
    mode: Arc<Mode>,
    realm: Arc<str>,
}

impl Auth {
    /// Builds an authenticator from configuration
    ///
    /// No network requests are made. When JWT auth is configured, call
    /// [`spawn_refresh()`][Self::spawn_refresh] to start fetching keys.
    ///
    /// # Errors
    ///
    /// The configuration is invalid.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let realm = config.realm().to_owned();
        let auth = match config.validate()? {
            Scheme::Disabled => Self::disabled(),
            Scheme::Basic(users) => Self::basic(BasicValidator::new(users)),
            Scheme::Jwt(jwt) => {
                let keys = KeyProvider::new(jwt.key_provider)?;
                let tokens = TokenValidator::new(keys).with_leeway(jwt.leeway);
                Self::jwt(tokens, CapabilityPolicy::any_of(jwt.required_capabilities))
            }
        };

        Ok(auth.with_realm(realm))
    }

    /// An authenticator that admits every request
    pub fn disabled() -> Self {
        Self::from_mode(Mode::Disabled)
    }

    /// An authenticator that checks `Basic` credentials
    pub fn basic(validator: BasicValidator) -> Self {
        Self::from_mode(Mode::Basic(validator))
    }

    /// An authenticator that checks bearer tokens against a policy
    pub fn jwt(tokens: TokenValidator, policy: CapabilityPolicy) -> Self {
        Self::from_mode(Mode::Jwt(Jwt { tokens, policy }))
    }

    fn from_mode(mode: Mode) -> Self {
        Self {
            mode: Arc::new(mode),
            realm: Arc::from(DEFAULT_REALM),
        }
    }

    /// Names the realm sent in challenges
    #[must_use]
    pub fn with_realm(self, realm: impl Into<String>) -> Self {
        Self {
            realm: Arc::from(realm.into()),
            ..self
        }
    }

    /// The realm sent in challenges
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Whether any credentials are checked at all
    #[must_use]
    pub fn is_protected(&self) -> bool {
        !matches!(*self.mode, Mode::Disabled)
    }

    /// The key provider backing JWT authentication
    #[must_use]
    pub fn key_provider(&self) -> Option<&KeyProvider> {
        match &*self.mode {
            Mode::Jwt(jwt) => Some(jwt.tokens.key_provider()),
            _ => None,
        }
    }

    /// The capabilities of which a token must grant at least one
    ///
    /// `None` unless JWT auth is in use.
    #[must_use]
    pub fn required_capabilities(&self) -> Option<&Capabilities> {
        match &*self.mode {
            Mode::Jwt(jwt) => Some(jwt.policy.required()),
            _ => None,
        }
    }

    /// Starts refreshing JWT keys in the background
    ///
    /// Returns `None` unless JWT auth is in use. Must be called from within
    /// a Tokio runtime.
    pub fn spawn_refresh(&self) -> Option<RefreshHandle> {
        self.key_provider().map(KeyProvider::spawn_refresh)
    }

    /// Decides whether a request with these headers may proceed
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthDecision {
        match &*self.mode {
            Mode::Disabled => AuthDecision::allow(None),
            Mode::Basic(validator) => authenticate_basic(validator, headers),
            Mode::Jwt(jwt) => authenticate_jwt(jwt, headers),
        }
    }
}

fn authenticate_basic(validator: &BasicValidator, headers: &HeaderMap) -> AuthDecision {
    let Some(encoded) = credentials(headers, AuthScheme::Basic) else {
        tracing::debug!("basic auth failed: credentials are missing");
        return AuthDecision::deny(AuthScheme::Basic, Rejection::MissingCredentials);
    };

    let Ok(creds) = BasicCredentials::decode(encoded) else {
        tracing::debug!("basic auth failed: credentials are malformed");
        return AuthDecision::deny(AuthScheme::Basic, Rejection::MalformedCredentials);
    };

    match validator.validate_credentials(&creds) {
        Ok(principal) => {
            tracing::trace!(principal = principal.name(), "basic auth succeeded");
            AuthDecision::allow(Some(principal))
        }
        Err(err) => {
            tracing::debug!(user = creds.username(), "basic auth failed: {err}");
            AuthDecision::deny(AuthScheme::Basic, err.into())
        }
    }
}

fn authenticate_jwt(jwt: &Jwt, headers: &HeaderMap) -> AuthDecision {
    let Some(token) = credentials(headers, AuthScheme::Bearer) else {
        tracing::debug!("JWT auth failed: bearer token is missing");
        return AuthDecision::deny(AuthScheme::Bearer, Rejection::MissingCredentials);
    };

    let principal = match jwt.tokens.validate(token) {
        Ok(principal) => principal,
        Err(err) => {
            tracing::debug!("JWT auth failed: {err}");
            return AuthDecision::deny(AuthScheme::Bearer, err.into());
        }
    };

    if let Err(err) = jwt.policy.evaluate(principal.capabilities()) {
        tracing::debug!(principal = principal.name(), "JWT auth failed: {err}");
        return AuthDecision::deny(AuthScheme::Bearer, err.into());
    }

    tracing::trace!(principal = principal.name(), "JWT auth succeeded");
    AuthDecision::allow(Some(principal))
}

/// The credentials following `scheme` in the `Authorization` header
fn credentials(headers: &HeaderMap, scheme: AuthScheme) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (name, rest) = value.split_once(' ')?;
    if !name.eq_ignore_ascii_case(scheme.name()) {
        return None;
    }

    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}
