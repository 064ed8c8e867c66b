//! Bearer token validation against the current key set

use std::time::Duration;

use aliri_clock::{Clock, System, UnixTime};
use serde::Deserialize;
use thiserror::Error;
use warden_jose::{
    error::{ClaimsRejected, JwtVerifyError},
    jwt::{self, TimeClaims},
    JwtRef,
};
use warden_jwks::KeyProvider;

use crate::{Capabilities, Principal};

/// A bearer token was rejected
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
pub enum TokenError {
    /// The token could not be parsed, or names an unknown algorithm
    #[error("malformed token")]
    Malformed,

    /// The signature does not verify against the selected key
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The `exp` claim has passed
    #[error("token expired")]
    Expired,

    /// The `nbf` claim has not been reached
    #[error("token not yet valid")]
    NotYetValid,

    /// No key in the current set matches the token's key ID and algorithm
    #[error("no key matches the token")]
    KeyNotFound,

    /// No key set has been loaded yet
    #[error("no keys available to verify the token")]
    NoKeysAvailable,
}

impl TokenError {
    /// Whether the token was rejected before any key was consulted
    #[must_use]
    pub const fn is_malformed(self) -> bool {
        matches!(self, Self::Malformed)
    }
}

impl From<JwtVerifyError> for TokenError {
    fn from(err: JwtVerifyError) -> Self {
        match err {
            JwtVerifyError::JwkVerifyError(_) => Self::SignatureInvalid,
            JwtVerifyError::ClaimsRejected(ClaimsRejected::TokenExpired) => Self::Expired,
            JwtVerifyError::ClaimsRejected(ClaimsRejected::TokenNotYetValid) => Self::NotYetValid,
            JwtVerifyError::MalformedToken(_)
            | JwtVerifyError::MalformedTokenHeader(_)
            | JwtVerifyError::MalformedTokenPayload(_)
            | JwtVerifyError::MalformedTokenSignature(_) => Self::Malformed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<UnixTime>,
    #[serde(default)]
    nbf: Option<UnixTime>,
    #[serde(default)]
    capabilities: Option<Capabilities>,
}

impl TimeClaims for Claims {
    fn nbf(&self) -> Option<UnixTime> {
        self.nbf
    }

    fn exp(&self) -> Option<UnixTime> {
        self.exp
    }
}

/// Verifies bearer tokens and turns their claims into a [`Principal`]
///
/// Keys are read from the latest snapshot held by the [`KeyProvider`];
/// validation never waits on the network.
#[derive(Clone, Debug)]
pub struct TokenValidator<K = System> {
    keys: KeyProvider,
    time: jwt::TimeValidator,
    clock: K,
}

impl TokenValidator {
    /// A validator with no leeway that reads the system clock
    pub fn new(keys: KeyProvider) -> Self {
        Self {
            keys,
            time: jwt::TimeValidator::new(),
            clock: System,
        }
    }
}

impl<K> TokenValidator<K> {
    /// Allows a grace period around the `exp` and `nbf` claims
    #[must_use]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self {
            time: self.time.with_leeway(leeway),
            ..self
        }
    }

    /// Replaces the clock used for time claims
    pub fn with_clock<C: Clock>(self, clock: C) -> TokenValidator<C> {
        TokenValidator {
            keys: self.keys,
            time: self.time,
            clock,
        }
    }

    /// The provider supplying verification keys
    pub fn key_provider(&self) -> &KeyProvider {
        &self.keys
    }

    /// The configured grace period
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.time.leeway()
    }
}

impl<K: Clock> TokenValidator<K> {
    /// Validates a compact JWT
    ///
    /// The principal is named by the `sub` claim and granted the
    /// `capabilities` claim; both are optional.
    ///
    /// # Errors
    ///
    /// Returns the first reason the token was rejected. Parsing comes
    /// first, then key selection, then the signature, and finally the
    /// time claims.
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        let decomposed = JwtRef::from_str(token).decompose().map_err(|err| {
            let error: &dyn std::error::Error = &err;
            tracing::debug!(error, "unable to parse token");
            TokenError::from(err)
        })?;

        let key_set = self
            .keys
            .current_key_set()
            .map_err(|_| TokenError::NoKeysAvailable)?;

        let header = decomposed.untrusted_header();
        let key = key_set.get_key(header.kid(), header.alg()).ok_or_else(|| {
            tracing::debug!(
                jwt.kid = ?header.kid(),
                jwt.alg = %header.alg(),
                "no key matches token"
            );
            TokenError::KeyNotFound
        })?;

        let validated = decomposed
            .verify_with_clock::<Claims, _, _>(key, &self.time, &self.clock)
            .map_err(|err| {
                let error: &dyn std::error::Error = &err;
                tracing::debug!(error, "token rejected");
                TokenError::from(err)
            })?;

        let (_, claims) = validated.extract();
        Ok(Principal::bearer(
            claims.sub.unwrap_or_default(),
            claims.capabilities.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use aliri_clock::TestClock;
    use color_eyre::Result;
    use serde_json::json;
    use tracing_test::traced_test;
    use warden_jose::{jwa, jwa::ec, test_util::KeyPair, Jwks};

    use super::*;
    use crate::AuthScheme;

    const NOW: u64 = 1_700_000_000;

    fn validator_for(jwks: Jwks) -> TokenValidator<TestClock> {
        TokenValidator::new(KeyProvider::from_jwks(jwks)).with_clock(TestClock::new(UnixTime(NOW)))
    }

    #[test]
    fn rejected_time_claims_map_to_their_own_errors() {
        let expired = JwtVerifyError::from(ClaimsRejected::TokenExpired);
        assert_eq!(TokenError::from(expired), TokenError::Expired);

        let early = JwtVerifyError::from(ClaimsRejected::TokenNotYetValid);
        assert_eq!(TokenError::from(early), TokenError::NotYetValid);
    }

    #[test]
    fn extracts_principal() -> Result<()> {
        let pair = KeyPair::rsa(jwa::Algorithm::RS256);
        let validator = validator_for(pair.jwks("k1"));

        let token = pair.sign_token(
            Some("k1"),
            &json!({
                "sub": "svc-a",
                "exp": NOW + 60,
                "capabilities": ["read", "write"],
            }),
        );

        let principal = validator.validate(token.as_str())?;
        assert_eq!(principal.name(), "svc-a");
        assert_eq!(principal.scheme(), AuthScheme::Bearer);
        let caps: Vec<_> = principal.capabilities().iter().map(|c| c.as_str()).collect();
        assert_eq!(caps, ["read", "write"]);
        Ok(())
    }

    #[test]
    fn optional_claims_default_to_empty() -> Result<()> {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1"));

        let principal = validator.validate(pair.sign_token(Some("k1"), &json!({})).as_str())?;
        assert_eq!(principal.name(), "");
        assert!(principal.capabilities().is_empty());
        Ok(())
    }

    #[test]
    fn null_claims_are_treated_as_absent() -> Result<()> {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1"));

        let token = pair.sign_token(
            Some("k1"),
            &json!({ "sub": null, "capabilities": null, "exp": null }),
        );
        let principal = validator.validate(token.as_str())?;
        assert_eq!(principal.name(), "");
        assert!(principal.capabilities().is_empty());
        Ok(())
    }

    #[test]
    fn token_without_kid_uses_algorithm() -> Result<()> {
        let pair = KeyPair::ec(ec::Curve::P384);
        let validator = validator_for(pair.jwks("only"));

        let token = pair.sign_token(None, &json!({ "sub": "anon" }));
        assert_eq!(validator.validate(token.as_str())?.name(), "anon");
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1"));

        for token in ["", "garbage", "a.b", "a.b.c.d", "!!!.###.$$$", "e30.e30.e30"] {
            assert_eq!(validator.validate(token), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn unknown_algorithm_is_malformed() {
        let pair = KeyPair::rsa(jwa::Algorithm::RS256);
        let validator = validator_for(pair.jwks("k1"));

        let token = warden_jose::test_util::sign_parts(
            &json!({ "alg": "HS256", "kid": "k1" }),
            &json!({ "sub": "x" }),
            |_| b"sig".to_vec(),
        );
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn payload_of_wrong_shape_is_malformed() {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1"));

        let token = pair.sign_token(Some("k1"), &json!({ "sub": 42 }));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::Malformed)
        );

        let token = pair.sign_token(Some("k1"), &json!({ "capabilities": "read" }));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    #[traced_test]
    fn signature_from_another_key_is_invalid() {
        let trusted = KeyPair::ec(ec::Curve::P256);
        let imposter = KeyPair::ec(ec::Curve::P256);
        let validator = validator_for(trusted.jwks("k1"));

        let token = imposter.sign_token(Some("k1"), &json!({ "sub": "mallory" }));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::SignatureInvalid)
        );
        assert!(logs_contain("token rejected"));
    }

    #[test]
    fn unknown_kid_is_key_not_found() {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1"));

        let token = pair.sign_token(Some("k2"), &json!({}));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::KeyNotFound)
        );
    }

    #[test]
    fn algorithm_without_key_is_key_not_found() {
        let rsa = KeyPair::rsa(jwa::Algorithm::RS256);
        let ec = KeyPair::ec(ec::Curve::P256);
        let validator = validator_for(rsa.jwks("k1"));

        let token = ec.sign_token(None, &json!({}));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::KeyNotFound)
        );
    }

    #[test]
    fn no_snapshot_is_no_keys_available() -> Result<()> {
        let provider = KeyProvider::new(warden_jwks::KeyProviderConfig::new(
            "https://auth.example.com/jwks.json",
        ))?;
        let validator = TokenValidator::new(provider);

        let pair = KeyPair::ed25519();
        let token = pair.sign_token(Some("k1"), &json!({}));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::NoKeysAvailable)
        );
        Ok(())
    }

    #[test]
    fn time_claims_are_checked() {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1"));

        let expired = pair.sign_token(Some("k1"), &json!({ "exp": NOW - 1 }));
        assert_eq!(
            validator.validate(expired.as_str()),
            Err(TokenError::Expired)
        );

        let at_expiry = pair.sign_token(Some("k1"), &json!({ "exp": NOW }));
        assert_eq!(
            validator.validate(at_expiry.as_str()),
            Err(TokenError::Expired)
        );

        let early = pair.sign_token(Some("k1"), &json!({ "nbf": NOW + 30 }));
        assert_eq!(
            validator.validate(early.as_str()),
            Err(TokenError::NotYetValid)
        );

        let current = pair.sign_token(Some("k1"), &json!({ "nbf": NOW, "exp": NOW + 1 }));
        assert!(validator.validate(current.as_str()).is_ok());
    }

    #[test]
    fn leeway_widens_the_window() {
        let pair = KeyPair::ed25519();
        let validator = validator_for(pair.jwks("k1")).with_leeway(Duration::from_secs(60));

        let recently_expired = pair.sign_token(Some("k1"), &json!({ "exp": NOW - 30 }));
        assert!(validator.validate(recently_expired.as_str()).is_ok());

        let almost_valid = pair.sign_token(Some("k1"), &json!({ "nbf": NOW + 30 }));
        assert!(validator.validate(almost_valid.as_str()).is_ok());

        let long_expired = pair.sign_token(Some("k1"), &json!({ "exp": NOW - 120 }));
        assert_eq!(
            validator.validate(long_expired.as_str()),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn rotated_keys_take_effect() -> Result<()> {
        let old = KeyPair::ed25519();
        let new = KeyPair::ed25519();
        let validator = validator_for(old.jwks("v1"));

        let token = new.sign_token(Some("v2"), &json!({ "sub": "svc" }));
        assert_eq!(
            validator.validate(token.as_str()),
            Err(TokenError::KeyNotFound)
        );

        validator.key_provider().set_jwks(new.jwks("v2"));
        assert_eq!(validator.validate(token.as_str())?.name(), "svc");
        Ok(())
    }
}
