//! Deriving signing algorithms for keys that do not declare one
//!
//! Many identity providers publish keys without an `alg` parameter. A key
//! served for verification must name exactly one algorithm, so such keys are
//! expanded into one copy per algorithm that the key material supports.
//!
//! | key type | curve | algorithms |
//! |---|---|---|
//! | `RSA` | | `RS256`, `RS384`, `RS512`, `PS256`, `PS384`, `PS512` |
//! | `EC` | `P-256` | `ES256` |
//! | `EC` | `P-384` | `ES384` |
//! | `EC` | `P-521` | `ES512` |
//! | `OKP` | `Ed25519`, `Ed448` | `EdDSA` |

use crate::{
    error::{self, UnsupportedKeyType},
    jwa,
    jwk::{Jwk, Key},
};

/// The algorithms a key can be used with
///
/// A key that already declares an algorithm yields only that algorithm.
///
/// # Errors
///
/// The key type, or its curve, has no associated signing algorithm.
pub fn infer(key: &Jwk) -> Result<Vec<jwa::Algorithm>, UnsupportedKeyType> {
    if let Some(alg) = key.algorithm() {
        return Ok(vec![alg]);
    }

    match key.key() {
        Key::Rsa(_) => Ok(jwa::Algorithm::RSA.to_vec()),
        Key::EllipticCurve(k) => Ok(vec![k.curve().algorithm()]),
        Key::OctetKeyPair(_) => Ok(vec![jwa::Algorithm::EdDSA]),
        Key::Unsupported { key_type, curve } => {
            Err(error::unsupported_key_type(key_type.as_str(), curve.clone()))
        }
    }
}

/// Expands a key into one key per inferred algorithm
///
/// A key that already declares an algorithm is returned unchanged. Otherwise
/// every copy shares the key ID and material of the original and is marked
/// for signature use.
///
/// # Errors
///
/// The key type, or its curve, has no associated signing algorithm.
pub fn expand(key: Jwk) -> Result<Vec<Jwk>, UnsupportedKeyType> {
    if key.algorithm().is_some() {
        return Ok(vec![key]);
    }

    let algs = infer(&key)?;
    Ok(algs
        .into_iter()
        .map(|alg| key.clone().with_algorithm(alg))
        .collect())
}
