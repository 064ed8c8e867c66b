//! RSA public keys

use aliri_base64::{Base64Url, Base64UrlRef};

use crate::{error, jwa::Algorithm};

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublicKey {
    modulus: Base64Url,
    exponent: Base64Url,
}

impl PublicKey {
    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// Either component is empty.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::InvalidJwk> {
        let modulus = modulus.into();
        let exponent = exponent.into();

        if modulus.as_slice().is_empty() {
            return Err(error::invalid_jwk("RSA modulus is empty"));
        }

        if exponent.as_slice().is_empty() {
            return Err(error::invalid_jwk("RSA exponent is empty"));
        }

        Ok(Self { modulus, exponent })
    }

    /// The public key's modulus
    pub fn modulus(&self) -> &Base64UrlRef {
        &self.modulus
    }

    /// The public key's exponent
    pub fn exponent(&self) -> &Base64UrlRef {
        &self.exponent
    }

    pub(crate) fn verify(
        &self,
        alg: Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JwkVerifyError> {
        let params = verification_params(alg).ok_or_else(|| error::incompatible_algorithm(alg))?;

        let pk = ring::signature::RsaPublicKeyComponents {
            n: strip_leading_zeros(self.modulus.as_slice()),
            e: strip_leading_zeros(self.exponent.as_slice()),
        };

        pk.verify(params, data, signature)
            .map_err(|_| error::signature_mismatch().into())
    }
}

fn verification_params(alg: Algorithm) -> Option<&'static ring::signature::RsaParameters> {
    match alg {
        Algorithm::RS256 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA256),
        Algorithm::RS384 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA384),
        Algorithm::RS512 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA512),
        Algorithm::PS256 => Some(&ring::signature::RSA_PSS_2048_8192_SHA256),
        Algorithm::PS384 => Some(&ring::signature::RSA_PSS_2048_8192_SHA384),
        Algorithm::PS512 => Some(&ring::signature::RSA_PSS_2048_8192_SHA512),
        _ => None,
    }
}

/// Big-endian integers in a JWK should be minimal, but not all issuers comply
fn strip_leading_zeros(mut raw: &[u8]) -> &[u8] {
    while let [0, rest @ ..] = raw {
        raw = rest;
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_components() {
        assert!(PublicKey::from_components(Vec::new(), vec![1, 0, 1]).is_err());
        assert!(PublicKey::from_components(vec![0xc5; 256], Vec::new()).is_err());
    }

    #[test]
    fn strips_only_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 0]), &[1, 0]);
        assert_eq!(strip_leading_zeros(&[7]), &[7]);
    }

    #[test]
    fn refuses_non_rsa_algorithms() {
        let key = PublicKey::from_components(vec![0xc5; 256], vec![1, 0, 1]).unwrap();
        let err = key.verify(Algorithm::ES256, b"data", b"sig").unwrap_err();
        assert!(err.is_incompatible_alg());
    }
}
