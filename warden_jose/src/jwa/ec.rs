//! Elliptic curve public keys

use std::{convert::TryFrom, fmt};

use aliri_base64::{Base64Url, Base64UrlRef};
use openssl::{
    bn::BigNum,
    ec::{EcGroup, EcKey},
    ecdsa::EcdsaSig,
    nid::Nid,
};

use crate::{error, jwa::Algorithm};

/// Elliptic curves usable with ECDSA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// P-256
    P256,
    /// P-384
    P384,
    /// P-521
    P521,
}

impl Curve {
    /// The `crv` value for this curve
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// The only signing algorithm defined over this curve
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::P256 => Algorithm::ES256,
            Self::P384 => Algorithm::ES384,
            Self::P521 => Algorithm::ES512,
        }
    }

    /// Length in bytes of a single coordinate, and of each half of a signature
    #[must_use]
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

impl TryFrom<&'_ str> for Curve {
    type Error = ();

    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "P-256" => Ok(Self::P256),
            "P-384" => Ok(Self::P384),
            "P-521" => Ok(Self::P521),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An elliptic curve public point
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublicKey {
    curve: Curve,
    x: Base64Url,
    y: Base64Url,
}

impl PublicKey {
    /// Constructs a public key from its affine coordinates
    ///
    /// Coordinates shorter than the curve's field size are left-padded.
    ///
    /// # Errors
    ///
    /// A coordinate is empty or longer than the field size of the curve.
    pub fn from_coordinates(
        curve: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Result<Self, error::InvalidJwk> {
        let x = pad_coordinate(curve, x.into())?;
        let y = pad_coordinate(curve, y.into())?;
        Ok(Self { curve, x, y })
    }

    /// The curve the point lies on
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The x coordinate
    pub fn x(&self) -> &Base64UrlRef {
        &self.x
    }

    /// The y coordinate
    pub fn y(&self) -> &Base64UrlRef {
        &self.y
    }

    pub(crate) fn verify(
        &self,
        alg: Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JwkVerifyError> {
        if alg != self.curve.algorithm() {
            return Err(error::incompatible_algorithm(alg).into());
        }

        match self.curve {
            Curve::P256 => {
                self.verify_with_ring(&ring::signature::ECDSA_P256_SHA256_FIXED, data, signature)
            }
            Curve::P384 => {
                self.verify_with_ring(&ring::signature::ECDSA_P384_SHA384_FIXED, data, signature)
            }
            Curve::P521 => self.verify_p521(data, signature),
        }
    }

    fn verify_with_ring(
        &self,
        params: &'static ring::signature::EcdsaVerificationAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JwkVerifyError> {
        let mut point = Vec::with_capacity(1 + self.x.as_slice().len() + self.y.as_slice().len());
        point.push(0x04);
        point.extend_from_slice(self.x.as_slice());
        point.extend_from_slice(self.y.as_slice());

        ring::signature::UnparsedPublicKey::new(params, point)
            .verify(data, signature)
            .map_err(|_| error::signature_mismatch().into())
    }

    /// ring has no P-521 support, so this one goes through OpenSSL
    fn verify_p521(&self, data: &[u8], signature: &[u8]) -> Result<(), error::JwkVerifyError> {
        if signature.len() != 2 * Curve::P521.coordinate_len() {
            return Err(error::signature_mismatch().into());
        }

        let verified = verify_p521_openssl(self.x.as_slice(), self.y.as_slice(), data, signature);

        match verified {
            Ok(true) => Ok(()),
            _ => Err(error::signature_mismatch().into()),
        }
    }
}

fn verify_p521_openssl(
    x: &[u8],
    y: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool, openssl::error::ErrorStack> {
    let (r, s) = signature.split_at(signature.len() / 2);

    let group = EcGroup::from_curve_name(Nid::SECP521R1)?;
    let x = BigNum::from_slice(x)?;
    let y = BigNum::from_slice(y)?;
    let key = EcKey::from_public_key_affine_coordinates(&group, &x, &y)?;

    let sig = EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;
    let digest = openssl::sha::sha512(data);
    sig.verify(&digest, &key)
}

fn pad_coordinate(curve: Curve, coord: Base64Url) -> Result<Base64Url, error::InvalidJwk> {
    let len = curve.coordinate_len();
    let raw = coord.as_slice();

    if raw.is_empty() {
        return Err(error::invalid_jwk("EC coordinate is empty"));
    }

    if raw.len() > len {
        return Err(error::invalid_jwk("EC coordinate is too long for its curve"));
    }

    if raw.len() == len {
        return Ok(coord);
    }

    let mut padded = vec![0; len - raw.len()];
    padded.extend_from_slice(raw);
    Ok(Base64Url::from_raw(padded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curves_map_to_a_single_algorithm() {
        assert_eq!(Curve::P256.algorithm(), Algorithm::ES256);
        assert_eq!(Curve::P384.algorithm(), Algorithm::ES384);
        assert_eq!(Curve::P521.algorithm(), Algorithm::ES512);
    }

    #[test]
    fn unknown_curve_names_do_not_parse() {
        assert!(Curve::try_from("secp256k1").is_err());
        assert!(Curve::try_from("p-256").is_err());
        assert_eq!(Curve::try_from("P-521"), Ok(Curve::P521));
    }

    #[test]
    fn short_coordinates_are_left_padded() {
        let key = PublicKey::from_coordinates(Curve::P256, vec![1; 31], vec![2; 32]).unwrap();
        assert_eq!(key.x().as_slice().len(), 32);
        assert_eq!(key.x().as_slice()[0], 0);
        assert_eq!(key.x().as_slice()[1], 1);
    }

    #[test]
    fn long_coordinates_are_rejected() {
        assert!(PublicKey::from_coordinates(Curve::P256, vec![1; 33], vec![2; 32]).is_err());
    }

    #[test]
    fn refuses_algorithm_of_another_curve() {
        let key = PublicKey::from_coordinates(Curve::P256, vec![1; 32], vec![2; 32]).unwrap();
        let err = key.verify(Algorithm::ES384, b"data", &[0; 96]).unwrap_err();
        assert!(err.is_incompatible_alg());
    }

    #[test]
    fn short_p521_signature_is_a_mismatch() {
        let key = PublicKey::from_coordinates(Curve::P521, vec![1; 66], vec![2; 66]).unwrap();
        let err = key.verify(Algorithm::ES512, b"data", &[0; 64]).unwrap_err();
        assert!(err.is_signature_mismatch());
    }
}
