//! Authentication and capability authorization for HTTP requests
//!
//! An [`Auth`] enforces exactly one scheme, chosen once from a [`Config`]:
//!
//! * **disabled**: every request is admitted;
//! * **basic**: `Authorization: Basic` credentials are checked against a
//!   static table by a [`BasicValidator`];
//! * **JWT**: `Authorization: Bearer` tokens are verified by a
//!   [`TokenValidator`] against keys published at a remote JWKS endpoint,
//!   then checked against a [`CapabilityPolicy`].
//!
//! The result for each request is an [`AuthDecision`], which carries either
//! the authenticated [`Principal`] or the reason for refusal along with the
//! status code and challenge to send back.
//!
//! ```
//! use http::{header, HeaderMap, HeaderValue, StatusCode};
//! use warden::{Auth, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Auth::new(Config::basic([("alice", "secret")]))?;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     header::AUTHORIZATION,
//!     HeaderValue::from_static("Basic YWxpY2U6c2VjcmV0"),
//! );
//!
//! let decision = auth.authenticate(&headers);
//! assert!(decision.is_allowed());
//! assert_eq!(decision.principal().unwrap().name(), "alice");
//!
//! let decision = auth.authenticate(&HeaderMap::new());
//! assert_eq!(decision.status(), StatusCode::UNAUTHORIZED);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod auth;
pub mod basic;
pub mod capability;
mod config;
mod principal;
pub mod token;

pub use auth::{Auth, AuthDecision, Challenge, Rejection};
pub use basic::{BadCredentials, BasicCredentials, BasicValidator};
pub use capability::{
    authorize, Capabilities, Capability, CapabilityPolicy, CapabilityRef,
    InsufficientCapabilities,
};
pub use config::{Config, ConfigError, JwtConfig, Scheme};
pub use principal::{AuthScheme, Principal};
pub use token::{TokenError, TokenValidator};

pub use warden_jose as jose;
pub use warden_jwks as jwks;
