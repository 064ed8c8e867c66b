//! JOSE primitives used by the `warden` family of crates to verify bearer
//! tokens against public keys published by a remote authority.
//!
//! * JSON Web Key (JWK) and JSON Web Key Set (JWKS): [RFC7517][]
//! * JSON Web Algorithms (JWA), signature algorithms only: [RFC7518][]
//! * JSON Web Signature (JWS) verification: [RFC7515][]
//! * JSON Web Token (JWT) decomposition and time-claim checks: [RFC7519][]
//! * EdDSA over `OKP` keys: [RFC8037][]
//!
//! Only public keys are modelled. Signing exists solely behind the
//! `test-util` feature, which generates throwaway key pairs for tests.
//!
//! Key sets published by identity providers frequently omit the `alg`
//! parameter. The [`infer`] module derives the algorithms such a key can be
//! used with, so that every key served for verification names exactly one
//! algorithm.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//! [RFC8037]: https://tools.ietf.org/html/rfc8037
//!
//! # Example
//!
//! ```
//! use warden_jose::{infer, jwa, Jwk};
//!
//! let key: Jwk = serde_json::from_str(r#"{
//!     "kty": "EC",
//!     "kid": "signing-1",
//!     "crv": "P-384",
//!     "x": "yDwJqGQ9bQ8kh0SJqYBlqEHl9Gd_mMhgIs5s-bBmBG0PXmm9bfX06ECw2QjO6tL-",
//!     "y": "ALgYA1PEhFkiySwtl3NBOCvqgFdlhW6C8ylr1Usy2ZbOa6DPZQlNfWVYV6XAJ5lO"
//! }"#).unwrap();
//!
//! assert_eq!(infer::infer(&key).unwrap(), vec![jwa::Algorithm::ES384]);
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

pub mod error;
pub mod infer;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
