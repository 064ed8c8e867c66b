//! Octet key pair public keys (RFC 8037)

use std::{convert::TryFrom, fmt};

use aliri_base64::{Base64Url, Base64UrlRef};
use openssl::pkey::{Id, PKey};

use crate::{error, jwa::Algorithm};

/// Edwards curves usable with EdDSA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// Ed25519
    Ed25519,
    /// Ed448
    Ed448,
}

impl Curve {
    /// The `crv` value for this curve
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::Ed448 => "Ed448",
        }
    }

    const fn public_key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::Ed448 => 57,
        }
    }
}

impl TryFrom<&'_ str> for Curve {
    type Error = ();

    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "Ed25519" => Ok(Self::Ed25519),
            "Ed448" => Ok(Self::Ed448),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An Edwards curve public key
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublicKey {
    curve: Curve,
    x: Base64Url,
}

impl PublicKey {
    /// Constructs a public key from its encoded form
    ///
    /// # Errors
    ///
    /// The key is not the size required by the curve.
    pub fn from_x(curve: Curve, x: impl Into<Base64Url>) -> Result<Self, error::InvalidJwk> {
        let x = x.into();
        if x.as_slice().len() != curve.public_key_len() {
            return Err(error::invalid_jwk("OKP public key has the wrong length for its curve"));
        }

        Ok(Self { curve, x })
    }

    /// The curve of the key
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The encoded public key
    pub fn x(&self) -> &Base64UrlRef {
        &self.x
    }

    pub(crate) fn verify(
        &self,
        alg: Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JwkVerifyError> {
        if alg != Algorithm::EdDSA {
            return Err(error::incompatible_algorithm(alg).into());
        }

        let verified = match self.curve {
            Curve::Ed25519 => ring::signature::UnparsedPublicKey::new(
                &ring::signature::ED25519,
                self.x.as_slice(),
            )
            .verify(data, signature)
            .is_ok(),
            Curve::Ed448 => verify_ed448(self.x.as_slice(), data, signature).unwrap_or(false),
        };

        if verified {
            Ok(())
        } else {
            Err(error::signature_mismatch().into())
        }
    }
}

fn verify_ed448(
    x: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool, openssl::error::ErrorStack> {
    let key = PKey::public_key_from_raw_bytes(x, Id::ED448)?;
    let mut verifier = openssl::sign::Verifier::new_without_digest(&key)?;
    verifier.verify_oneshot(signature, data)
}
