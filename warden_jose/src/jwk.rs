//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use std::convert::TryFrom;

use aliri_base64::Base64Url;
use aliri_braid::braid;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    error,
    jwa::{self, ec, okp, rsa},
    jws::Verifier,
};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to a JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// An identified JSON Web Key
///
/// Only public key material is retained. Keys of a type this crate cannot
/// verify with still deserialize, so that callers can report on them, but
/// they are never compatible with any algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "JwkDto")]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    usage: Option<jwa::Usage>,
    algorithm: Option<jwa::Algorithm>,
    key: Key,
}

/// The public key material of a JWK
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Key {
    /// `RSA`
    Rsa(rsa::PublicKey),

    /// `EC` on a supported curve
    EllipticCurve(ec::PublicKey),

    /// `OKP` on a supported signing curve
    OctetKeyPair(okp::PublicKey),

    /// A key type or curve without a supported signing algorithm
    Unsupported {
        /// The `kty` parameter
        key_type: String,
        /// The `crv` parameter, if any
        curve: Option<String>,
    },
}

impl Key {
    /// The `kty` parameter of the key
    #[must_use]
    pub fn key_type(&self) -> &str {
        match self {
            Self::Rsa(_) => jwa::KeyType::Rsa.name(),
            Self::EllipticCurve(_) => jwa::KeyType::EllipticCurve.name(),
            Self::OctetKeyPair(_) => jwa::KeyType::OctetKeyPair.name(),
            Self::Unsupported { key_type, .. } => key_type,
        }
    }

    /// The `crv` parameter of the key, if any
    #[must_use]
    pub fn curve(&self) -> Option<&str> {
        match self {
            Self::Rsa(_) => None,
            Self::EllipticCurve(k) => Some(k.curve().name()),
            Self::OctetKeyPair(k) => Some(k.curve().name()),
            Self::Unsupported { curve, .. } => curve.as_deref(),
        }
    }

    fn is_compatible(&self, alg: jwa::Algorithm) -> bool {
        match self {
            Self::Rsa(_) => alg.key_type() == jwa::KeyType::Rsa,
            Self::EllipticCurve(k) => k.curve().algorithm() == alg,
            Self::OctetKeyPair(_) => alg == jwa::Algorithm::EdDSA,
            Self::Unsupported { .. } => false,
        }
    }

    fn verify(
        &self,
        alg: jwa::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JwkVerifyError> {
        match self {
            Self::Rsa(k) => k.verify(alg, data, signature),
            Self::EllipticCurve(k) => k.verify(alg, data, signature),
            Self::OctetKeyPair(k) => k.verify(alg, data, signature),
            Self::Unsupported { .. } => Err(error::incompatible_algorithm(alg).into()),
        }
    }
}

impl Jwk {
    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The intended usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The algorithm to be used with this JWK
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// The public key material
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the key is compatible with the given algorithm
    #[must_use]
    pub fn is_compatible(&self, alg: jwa::Algorithm) -> bool {
        self.key.is_compatible(alg)
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: KeyId) -> Self {
        Self {
            key_id: Some(kid),
            ..self
        }
    }

    /// Sets the key's usage
    pub fn with_usage(self, usage: jwa::Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    /// Sets the algorithm and usage consistent with that algorithm
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self {
            algorithm: Some(alg),
            usage: Some(alg.to_usage()),
            ..self
        }
    }
}

impl From<Key> for Jwk {
    fn from(key: Key) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key,
        }
    }
}

impl From<rsa::PublicKey> for Jwk {
    fn from(key: rsa::PublicKey) -> Self {
        Self::from(Key::Rsa(key))
    }
}

impl From<ec::PublicKey> for Jwk {
    fn from(key: ec::PublicKey) -> Self {
        Self::from(Key::EllipticCurve(key))
    }
}

impl From<okp::PublicKey> for Jwk {
    fn from(key: okp::PublicKey) -> Self {
        Self::from(Key::OctetKeyPair(key))
    }
}

impl Verifier for Jwk {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.usage.map_or(true, |u| u == jwa::Usage::Signing)
            && self.algorithm.map_or(true, |a| a == alg)
            && self.key.is_compatible(alg)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if let Some(u) = self.usage {
            if u != jwa::Usage::Signing {
                return Err(error::jwk_usage_mismatch().into());
            }
        }

        match self.algorithm {
            Some(key_alg) if key_alg == alg => {}
            Some(_) => {
                return Err(error::incompatible_algorithm(alg).into());
            }
            None => {}
        }

        self.key.verify(alg, data, signature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct JwkDto {
    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    key_id: Option<KeyId>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    usage: Option<jwa::Usage>,

    #[serde(rename = "alg", default, skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,

    #[serde(rename = "kty")]
    key_type: String,

    #[serde(rename = "crv", default, skip_serializing_if = "Option::is_none")]
    curve: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    e: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<String>,
}

fn decode_param(
    value: Option<&str>,
    missing: &'static str,
    invalid: &'static str,
) -> Result<Base64Url, error::InvalidJwk> {
    let value = value.ok_or_else(|| error::invalid_jwk(missing))?;
    Base64Url::from_encoded(value).map_err(|e| error::invalid_jwk_with(invalid, e))
}

impl TryFrom<JwkDto> for Jwk {
    type Error = error::InvalidJwk;

    fn try_from(dto: JwkDto) -> Result<Self, Self::Error> {
        let algorithm = dto
            .algorithm
            .as_deref()
            .map(jwa::Algorithm::try_from)
            .transpose()
            .map_err(|e| error::invalid_jwk_with("unsupported algorithm", e))?;

        let key = match dto.key_type.as_str() {
            "RSA" => {
                let n = decode_param(dto.n.as_deref(), "RSA key missing `n`", "invalid `n`")?;
                let e = decode_param(dto.e.as_deref(), "RSA key missing `e`", "invalid `e`")?;
                Key::Rsa(rsa::PublicKey::from_components(n, e)?)
            }
            "EC" => {
                let crv = dto
                    .curve
                    .as_deref()
                    .ok_or_else(|| error::invalid_jwk("EC key missing `crv`"))?;

                match ec::Curve::try_from(crv) {
                    Ok(curve) => {
                        let x = decode_param(dto.x.as_deref(), "EC key missing `x`", "invalid `x`")?;
                        let y = decode_param(dto.y.as_deref(), "EC key missing `y`", "invalid `y`")?;
                        Key::EllipticCurve(ec::PublicKey::from_coordinates(curve, x, y)?)
                    }
                    Err(()) => Key::Unsupported {
                        key_type: dto.key_type,
                        curve: dto.curve,
                    },
                }
            }
            "OKP" => {
                let crv = dto
                    .curve
                    .as_deref()
                    .ok_or_else(|| error::invalid_jwk("OKP key missing `crv`"))?;

                match okp::Curve::try_from(crv) {
                    Ok(curve) => {
                        let x = decode_param(dto.x.as_deref(), "OKP key missing `x`", "invalid `x`")?;
                        Key::OctetKeyPair(okp::PublicKey::from_x(curve, x)?)
                    }
                    Err(()) => Key::Unsupported {
                        key_type: dto.key_type,
                        curve: dto.curve,
                    },
                }
            }
            _ => Key::Unsupported {
                key_type: dto.key_type,
                curve: dto.curve,
            },
        };

        if let Some(alg) = algorithm {
            if !key.is_compatible(alg) {
                return Err(error::invalid_jwk_with(
                    "declared algorithm does not fit the key",
                    error::incompatible_algorithm(alg),
                ));
            }
        }

        Ok(Self {
            key_id: dto.key_id,
            usage: dto.usage,
            algorithm,
            key,
        })
    }
}

impl Serialize for Jwk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut dto = JwkDto {
            key_id: self.key_id.clone(),
            usage: self.usage,
            algorithm: self.algorithm.map(|a| a.name().to_owned()),
            key_type: self.key.key_type().to_owned(),
            curve: self.key.curve().map(str::to_owned),
            n: None,
            e: None,
            x: None,
            y: None,
        };

        match &self.key {
            Key::Rsa(k) => {
                dto.n = Some(k.modulus().to_string());
                dto.e = Some(k.exponent().to_string());
            }
            Key::EllipticCurve(k) => {
                dto.x = Some(k.x().to_string());
                dto.y = Some(k.y().to_string());
            }
            Key::OctetKeyPair(k) => {
                dto.x = Some(k.x().to_string());
            }
            Key::Unsupported { .. } => {}
        }

        dto.serialize(serializer)
    }
}
