use serde::{Deserialize, Serialize};

use crate::{infer, jwa, jwk, Jwk};

/// A JSON Web Key Set (JWKS)
///
/// Deserialization is lenient: entries that cannot be understood as a JWK
/// are skipped with a warning rather than failing the whole set. A document
/// without a `keys` member is still an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// A view of the keys in this set
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// The number of keys in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Gets the best key for the key ID (if provided) and algorithm requested
    ///
    /// Keys that are incompatible with the algorithm, or that declare a
    /// different key ID, algorithm, or usage, are never selected. Among the
    /// rest, a matching key ID outweighs a matching algorithm, which
    /// outweighs a matching usage.
    #[must_use]
    pub fn get_key_by_opt(
        &self,
        kid: Option<&jwk::KeyIdRef>,
        alg: jwa::Algorithm,
    ) -> Option<&Jwk> {
        let alg_usage = alg.to_usage();

        let best = self.keys.iter().fold(None, |best, k| {
            if !k.is_compatible(alg) {
                return best;
            }

            let mut score = 0;

            if let Some(kid) = kid {
                match k.key_id() {
                    Some(key_id) if key_id == kid => score += 4,
                    Some(_) => return best,
                    None => {}
                }
            }

            match k.algorithm() {
                Some(a) if a == alg => score += 2,
                Some(_) => return best,
                None => {}
            }

            match k.usage() {
                Some(u) if u == alg_usage => score += 1,
                Some(_) => return best,
                None => {}
            }

            match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((k, score)),
            }
        });

        best.map(|(k, _)| k)
    }

    /// Gets the best key for the key ID and algorithm requested
    #[must_use]
    pub fn get_key_by_id(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Option<&Jwk> {
        self.get_key_by_opt(Some(kid), alg)
    }

    /// Expands every key that lacks an algorithm into one key per inferred algorithm
    ///
    /// Keys whose type or curve has no signing algorithm are dropped and
    /// logged, as are keys marked for encryption, which could never verify a
    /// signature. This never fails as a whole; the result may be empty.
    #[must_use]
    pub fn with_inferred_algorithms(self) -> Self {
        let signing = self.without_encryption_keys();
        let mut keys = Vec::with_capacity(signing.keys.len());

        for key in signing.keys {
            let kid = key.key_id().map(ToOwned::to_owned);
            match infer::expand(key) {
                Ok(expanded) => keys.extend(expanded),
                Err(error) => {
                    tracing::warn!(
                        jwk.kid = ?kid,
                        jwk.kty = error.key_type(),
                        jwk.crv = ?error.curve(),
                        "dropping JWK without a supported signing algorithm"
                    );
                }
            }
        }

        Self { keys }
    }

    /// Drops every key that does not declare an algorithm
    #[must_use]
    ///
    /// Keys marked for encryption are dropped as well.
    pub fn without_undeclared_algorithms(self) -> Self {
        let (keys, dropped): (Vec<_>, Vec<_>) = self
            .without_encryption_keys()
            .keys
            .into_iter()
            .partition(|k| k.algorithm().is_some());

        for key in dropped {
            tracing::warn!(
                jwk.kid = ?key.key_id(),
                jwk.kty = key.key().key_type(),
                "dropping JWK without a declared algorithm"
            );
        }

        Self { keys }
    }

    fn without_encryption_keys(self) -> Self {
        let (dropped, keys): (Vec<_>, Vec<_>) = self
            .keys
            .into_iter()
            .partition(|k| k.usage() == Some(jwa::Usage::Encryption));

        for key in dropped {
            tracing::debug!(
                jwk.kid = ?key.key_id(),
                jwk.kty = key.key().key_type(),
                "dropping JWK marked for encryption"
            );
        }

        Self { keys }
    }
}

impl FromIterator<Jwk> for Jwks {
    fn from_iter<T: IntoIterator<Item = Jwk>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<Jwk>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct MaybeJwksVisitor;

    impl<'de> serde::de::Visitor<'de> for MaybeJwksVisitor {
        type Value = Vec<Jwk>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a list of JWK objects")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
            let mut index = 0_usize;

            while let Some(value) = seq.next_element::<serde_json::Value>()? {
                match Jwk::deserialize(&value) {
                    Ok(jwk) => values.push(jwk),
                    Err(error) => {
                        tracing::warn!(
                            jwks.idx = index,
                            jwk.kid = ?value.get("kid"),
                            jwk.kty = ?value.get("kty"),
                            jwk.alg = ?value.get("alg"),
                            %error,
                            "ignoring unusable JWK"
                        );
                    }
                }
                index += 1;
            }

            Ok(values)
        }
    }

    deserializer.deserialize_seq(MaybeJwksVisitor)
}
