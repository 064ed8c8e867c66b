//! Throwaway key pairs and token signing for tests
//!
//! Nothing here is suitable for production use. Failures panic.

#![allow(clippy::missing_panics_doc)]

use aliri_base64::Base64Url;
use openssl::{
    bn::BigNumContext,
    ec::{EcGroup, EcKey},
    ecdsa::EcdsaSig,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rsa::{Padding, Rsa},
    sign::{RsaPssSaltlen, Signer},
};
use serde::Serialize;

use crate::{
    jwa::{self, ec, okp, rsa},
    jwk::KeyId,
    jwt::{Headers, Jwt},
    Jwk, Jwks,
};

/// A private key paired with its public JWK
#[derive(Clone)]
pub struct KeyPair {
    alg: jwa::Algorithm,
    private: PKey<Private>,
    public: Jwk,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("alg", &self.alg)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generates a 2048-bit RSA key that signs with `alg`
    pub fn rsa(alg: jwa::Algorithm) -> Self {
        assert_eq!(alg.key_type(), jwa::KeyType::Rsa, "{alg} is not an RSA algorithm");

        let key = Rsa::generate(2048).expect("RSA key generation");
        let public = rsa::PublicKey::from_components(key.n().to_vec(), key.e().to_vec())
            .expect("generated RSA key is valid");
        let private = PKey::from_rsa(key).expect("RSA key wraps");

        Self {
            alg,
            private,
            public: Jwk::from(public),
        }
    }

    /// Generates an ECDSA key on the given curve
    pub fn ec(curve: ec::Curve) -> Self {
        let nid = match curve {
            ec::Curve::P256 => Nid::X9_62_PRIME256V1,
            ec::Curve::P384 => Nid::SECP384R1,
            ec::Curve::P521 => Nid::SECP521R1,
        };

        let group = EcGroup::from_curve_name(nid).expect("known curve");
        let key = EcKey::generate(&group).expect("EC key generation");

        let mut ctx = BigNumContext::new().expect("bignum context");
        let mut x = openssl::bn::BigNum::new().expect("bignum");
        let mut y = openssl::bn::BigNum::new().expect("bignum");
        key.public_key()
            .affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx)
            .expect("affine coordinates");

        let len = i32::try_from(curve.coordinate_len()).expect("small length");
        let public = ec::PublicKey::from_coordinates(
            curve,
            x.to_vec_padded(len).expect("x fits"),
            y.to_vec_padded(len).expect("y fits"),
        )
        .expect("generated EC key is valid");

        Self {
            alg: curve.algorithm(),
            private: PKey::from_ec_key(key).expect("EC key wraps"),
            public: Jwk::from(public),
        }
    }

    /// Generates an Ed25519 key
    pub fn ed25519() -> Self {
        let private = PKey::generate_ed25519().expect("Ed25519 key generation");
        Self::okp(okp::Curve::Ed25519, private)
    }

    /// Generates an Ed448 key
    pub fn ed448() -> Self {
        let private = PKey::generate_ed448().expect("Ed448 key generation");
        Self::okp(okp::Curve::Ed448, private)
    }

    fn okp(curve: okp::Curve, private: PKey<Private>) -> Self {
        let raw = private.raw_public_key().expect("raw public key");
        let public = okp::PublicKey::from_x(curve, raw).expect("generated OKP key is valid");

        Self {
            alg: jwa::Algorithm::EdDSA,
            private,
            public: Jwk::from(public),
        }
    }

    /// Switches the algorithm used for signing
    ///
    /// Only meaningful for RSA keys, which fit six algorithms.
    pub fn using(self, alg: jwa::Algorithm) -> Self {
        assert!(self.public.is_compatible(alg), "key cannot sign with {alg}");
        Self { alg, ..self }
    }

    /// The algorithm this pair signs with
    pub fn algorithm(&self) -> jwa::Algorithm {
        self.alg
    }

    /// The public half, without `kid`, `alg`, or `use`
    ///
    /// This mirrors what many identity providers publish.
    pub fn public_jwk(&self) -> Jwk {
        self.public.clone()
    }

    /// The public half, tagged with a key ID and the signing algorithm
    pub fn tagged_jwk(&self, kid: &str) -> Jwk {
        self.public
            .clone()
            .with_key_id(KeyId::from(kid))
            .with_algorithm(self.alg)
    }

    /// A key set holding only the tagged public half
    pub fn jwks(&self, kid: &str) -> Jwks {
        let mut jwks = Jwks::default();
        jwks.add_key(self.tagged_jwk(kid));
        jwks
    }

    /// Produces a JWS signature over `message` in its compact serialization form
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self.alg {
            jwa::Algorithm::RS256 | jwa::Algorithm::RS384 | jwa::Algorithm::RS512 => {
                let mut signer = Signer::new(digest(self.alg), &self.private).expect("signer");
                signer.set_rsa_padding(Padding::PKCS1).expect("padding");
                signer.sign_oneshot_to_vec(message).expect("sign")
            }
            jwa::Algorithm::PS256 | jwa::Algorithm::PS384 | jwa::Algorithm::PS512 => {
                let md = digest(self.alg);
                let mut signer = Signer::new(md, &self.private).expect("signer");
                signer.set_rsa_padding(Padding::PKCS1_PSS).expect("padding");
                signer
                    .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
                    .expect("salt length");
                signer.set_rsa_mgf1_md(md).expect("mgf1 digest");
                signer.sign_oneshot_to_vec(message).expect("sign")
            }
            jwa::Algorithm::ES256 | jwa::Algorithm::ES384 | jwa::Algorithm::ES512 => {
                let mut signer = Signer::new(digest(self.alg), &self.private).expect("signer");
                let der = signer.sign_oneshot_to_vec(message).expect("sign");
                let sig = EcdsaSig::from_der(&der).expect("DER signature");

                let len = match self.alg {
                    jwa::Algorithm::ES256 => 32,
                    jwa::Algorithm::ES384 => 48,
                    _ => 66,
                };
                let mut fixed = sig.r().to_vec_padded(len).expect("r fits");
                fixed.extend(sig.s().to_vec_padded(len).expect("s fits"));
                fixed
            }
            jwa::Algorithm::EdDSA => {
                let mut signer = Signer::new_without_digest(&self.private).expect("signer");
                signer.sign_oneshot_to_vec(message).expect("sign")
            }
        }
    }

    /// Signs `claims` into a compact JWT, naming `kid` in the header if given
    pub fn sign_token<C: Serialize>(&self, kid: Option<&str>, claims: &C) -> Jwt {
        let mut headers = Headers::new(self.alg).with_type("JWT");
        if let Some(kid) = kid {
            headers = headers.with_key_id(kid);
        }

        sign_parts(&headers, claims, |message| self.sign(message))
    }
}

fn digest(alg: jwa::Algorithm) -> MessageDigest {
    match alg {
        jwa::Algorithm::RS256 | jwa::Algorithm::PS256 | jwa::Algorithm::ES256 => {
            MessageDigest::sha256()
        }
        jwa::Algorithm::RS384 | jwa::Algorithm::PS384 | jwa::Algorithm::ES384 => {
            MessageDigest::sha384()
        }
        _ => MessageDigest::sha512(),
    }
}

/// Assembles a compact JWT from arbitrary header and claims JSON
///
/// Useful for building tokens that a real issuer would never produce.
pub fn sign_parts<H, C, F>(headers: &H, claims: &C, sign: F) -> Jwt
where
    H: Serialize,
    C: Serialize,
    F: FnOnce(&[u8]) -> Vec<u8>,
{
    let h = Base64Url::from_raw(serde_json::to_vec(headers).expect("headers serialize"));
    let p = Base64Url::from_raw(serde_json::to_vec(claims).expect("claims serialize"));
    let message = format!("{h}.{p}");
    let s = Base64Url::from_raw(sign(message.as_bytes()));
    Jwt::new(format!("{message}.{s}"))
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;

    use super::*;
    use crate::{jws::Verifier, jwt::TimeValidator};

    #[derive(serde::Deserialize)]
    struct Empty {}

    impl crate::jwt::TimeClaims for Empty {
        fn nbf(&self) -> Option<aliri_clock::UnixTime> {
            None
        }

        fn exp(&self) -> Option<aliri_clock::UnixTime> {
            None
        }
    }

    fn round_trip(pair: &KeyPair) -> Result<()> {
        let token = pair.sign_token(Some("k"), &json!({}));
        let decomposed = token.decompose()?;
        assert_eq!(decomposed.untrusted_header().alg(), pair.algorithm());
        let validated =
            decomposed.verify::<Empty, _>(&pair.tagged_jwk("k"), &TimeValidator::new())?;
        assert_eq!(validated.headers().alg(), pair.algorithm());
        Ok(())
    }

    #[test]
    fn round_trip_rsa() -> Result<()> {
        let pair = KeyPair::rsa(jwa::Algorithm::RS256);
        for alg in jwa::Algorithm::RSA {
            round_trip(&pair.clone().using(alg))?;
        }
        Ok(())
    }

    #[test]
    fn round_trip_ec() -> Result<()> {
        round_trip(&KeyPair::ec(ec::Curve::P256))?;
        round_trip(&KeyPair::ec(ec::Curve::P384))?;
        round_trip(&KeyPair::ec(ec::Curve::P521))
    }

    #[test]
    fn round_trip_okp() -> Result<()> {
        round_trip(&KeyPair::ed25519())?;
        round_trip(&KeyPair::ed448())
    }

    #[test]
    fn rsa_signature_does_not_verify_under_other_padding() {
        let pair = KeyPair::rsa(jwa::Algorithm::RS256);
        let sig = pair.sign(b"message");
        let jwk = pair.public_jwk();
        assert!(jwk.verify(jwa::Algorithm::RS256, b"message", &sig).is_ok());
        assert!(jwk.verify(jwa::Algorithm::PS256, b"message", &sig).is_err());
        assert!(jwk.verify(jwa::Algorithm::RS512, b"message", &sig).is_err());
    }
}
