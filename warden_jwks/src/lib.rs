//! A JSON Web Key Set fetched from a remote authority and kept fresh on a timer
//!
//! The [`KeyProvider`] owns the only copy of the key set. Request handlers
//! read an immutable [`KeySet`] snapshot without blocking and without
//! touching the network; a background task started with
//! [`KeyProvider::spawn_refresh()`] replaces the snapshot wholesale whenever
//! the remote document changes.
//!
//! A refresh that fails for any reason leaves the previous snapshot in
//! place, so an authority outage degrades to serving slightly stale keys
//! rather than rejecting every request.
//!
//! ```no_run
//! use std::time::Duration;
//! use warden_jwks::{KeyProvider, KeyProviderConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = KeyProviderConfig::new("https://auth.example.com/.well-known/jwks.json");
//! config.refresh_interval = Duration::from_secs(15 * 60);
//!
//! let provider = KeyProvider::new(config)?;
//! let refresh = provider.spawn_refresh();
//!
//! // ... serve requests using `provider.current_key_set()` ...
//!
//! refresh.shutdown().await;
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

mod config;
mod error;
mod provider;

pub use config::{HttpClientConfig, KeyProviderConfig};
pub use error::{NoKeysAvailable, ProviderError, RefreshError};
pub use provider::{KeyProvider, KeySet, RefreshHandle, RefreshOutcome};
