//! JSON Web Algorithms (JWA) used for signature verification
//!
//! The specifications for this standard can be found in [RFC7518][].
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::{convert::TryFrom, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error;

pub mod ec;
pub mod okp;
pub mod rsa;

/// A JWS signing algorithm that can be verified with a public key
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
    PS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
    /// ECDSA using P-521 and SHA-512
    ES512,
    /// Edwards-curve signatures over an octet key pair
    EdDSA,
}

impl Algorithm {
    /// Every algorithm that can be used with an RSA key
    pub const RSA: [Algorithm; 6] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
    ];

    /// The name of the algorithm as used in the `alg` parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::EdDSA => "EdDSA",
        }
    }

    /// The key type this algorithm operates on
    pub const fn key_type(self) -> KeyType {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512 => {
                KeyType::Rsa
            }
            Self::ES256 | Self::ES384 | Self::ES512 => KeyType::EllipticCurve,
            Self::EdDSA => KeyType::OctetKeyPair,
        }
    }

    /// The usage implied by this algorithm
    ///
    /// All supported algorithms are signature algorithms.
    pub const fn to_usage(self) -> Usage {
        Usage::Signing
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Algorithm> for &'static str {
    #[inline]
    fn from(alg: Algorithm) -> Self {
        alg.name()
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    #[inline]
    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "PS256" => Ok(Self::PS256),
            "PS384" => Ok(Self::PS384),
            "PS512" => Ok(Self::PS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "ES512" => Ok(Self::ES512),
            "EdDSA" => Ok(Self::EdDSA),
            _ => Err(error::unknown_algorithm(value)),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// The intended use for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum Usage {
    /// The key is intended for signing and verification
    #[serde(rename = "sig")]
    Signing,

    /// The key is intended for encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// The family of a key, as named by the `kty` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum KeyType {
    /// `RSA`
    Rsa,
    /// `EC`
    EllipticCurve,
    /// `OKP`
    OctetKeyPair,
}

impl KeyType {
    /// The `kty` value for this key type
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EllipticCurve => "EC",
            Self::OctetKeyPair => "OKP",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn algorithm_names_parse_back() -> Result<()> {
        for alg in Algorithm::RSA
            .into_iter()
            .chain([Algorithm::ES256, Algorithm::ES384, Algorithm::ES512, Algorithm::EdDSA])
        {
            assert_eq!(alg.name().parse::<Algorithm>()?, alg);
        }
        Ok(())
    }

    #[test]
    fn symmetric_algorithms_are_unknown() {
        let err = "HS256".parse::<Algorithm>().unwrap_err();
        assert_eq!(err.to_string(), "'HS256' does not match supported algorithms");
    }

    #[test]
    fn algorithm_names_are_case_sensitive() {
        assert!("rs256".parse::<Algorithm>().is_err());
        assert!("EDDSA".parse::<Algorithm>().is_err());
    }

    #[test]
    fn serializes_as_registered_name() -> Result<()> {
        assert_eq!(serde_json::to_string(&Algorithm::EdDSA)?, r#""EdDSA""#);
        let alg: Algorithm = serde_json::from_str(r#""PS384""#)?;
        assert_eq!(alg, Algorithm::PS384);
        Ok(())
    }

    #[test]
    fn algorithms_map_to_key_types() {
        assert!(Algorithm::RSA
            .iter()
            .all(|a| a.key_type() == KeyType::Rsa));
        assert_eq!(Algorithm::ES512.key_type(), KeyType::EllipticCurve);
        assert_eq!(Algorithm::EdDSA.key_type(), KeyType::OctetKeyPair);
    }
}
