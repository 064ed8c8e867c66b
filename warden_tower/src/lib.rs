//! Request authentication for `tower_http` and the rest of the `tower`
//! ecosystem, including `axum`.
//!
//! The [`layer()`] function wraps a [`warden::Auth`] in a
//! [`ValidateRequestHeaderLayer`][tower_http::validate_request::ValidateRequestHeaderLayer].
//! Every request passes through [`Auth::authenticate`][warden::Auth::authenticate]
//! before reaching the inner service:
//!
//! * admitted requests continue with the [`Principal`][warden::Principal] in
//!   their extensions (none when auth is disabled);
//! * refused requests are answered immediately with `401`, `400`, or `403`,
//!   an empty body, and a `www-authenticate` challenge.
//!
//! See the `oker` example in the repository for a runnable server.
//!
//! ```
//! use axum::{routing::get, Extension, Router};
//! use warden::{Auth, Config, Principal};
//!
//! async fn hello(Extension(principal): Extension<Principal>) -> String {
//!     format!("hello, {}", principal.name())
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Auth::new(Config::basic([("alice", "secret")]))?;
//!
//! let app: Router = Router::new()
//!     .route("/hello", get(hello))
//!     .layer(warden_tower::layer::<axum::body::Body>(auth));
//! # Ok(())
//! # }
//! ```

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
    unused_must_use
)]
#![forbid(unsafe_code)]

mod require;
pub mod util;

pub use require::{layer, RequireAuth};
