//! Static username and password checks for the `Basic` scheme

use std::fmt;

use aliri_base64::Base64;
use ring::digest::{self, Digest, SHA256};
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

use crate::Principal;

/// The username or password did not match
///
/// Unknown users and wrong passwords are indistinguishable.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("bad credentials")]
pub struct BadCredentials;

/// The `Basic` credentials could not be decoded
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("malformed basic credentials")]
pub struct MalformedCredentials;

/// A username and password decoded from an `Authorization: Basic` header
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl BasicCredentials {
    /// Parses a full header value such as `Basic YWxpY2U6c2VjcmV0`
    ///
    /// The scheme name is matched without regard to case.
    ///
    /// ```
    /// use warden::BasicCredentials;
    ///
    /// let creds = BasicCredentials::parse("basic YWxpY2U6czNjcjN0OnRvbw==").unwrap();
    /// assert_eq!(creds.username(), "alice");
    /// assert_eq!(creds.password(), "s3cr3t:too");
    /// ```
    ///
    /// # Errors
    ///
    /// The scheme is not `Basic`, or the credentials cannot be decoded.
    pub fn parse(header: &str) -> Result<Self, MalformedCredentials> {
        let (scheme, encoded) = header.split_once(' ').ok_or(MalformedCredentials)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(MalformedCredentials);
        }

        Self::decode(encoded)
    }

    /// Decodes the base64 `user:password` portion of a `Basic` header
    ///
    /// Everything after the first `:` is the password.
    ///
    /// # Errors
    ///
    /// The value is not base64, not UTF-8, or has no `:` separator.
    pub fn decode(encoded: &str) -> Result<Self, MalformedCredentials> {
        let raw = Base64::from_encoded(encoded.trim()).map_err(|_| MalformedCredentials)?;
        let text = String::from_utf8(raw.into_inner()).map_err(|_| MalformedCredentials)?;
        let (username, password) = text.split_once(':').ok_or(MalformedCredentials)?;

        Ok(Self {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// The username
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

struct Entry {
    username: Digest,
    password: Digest,
}

/// Checks credentials against a fixed table of users
///
/// Every check hashes the candidate and compares it against every entry in
/// constant time, so neither the position of a user in the table nor the
/// length of a near miss shows up in response times.
///
/// ```
/// use warden::BasicValidator;
///
/// let validator = BasicValidator::new([("alice", "secret")]);
///
/// let principal = validator.validate("alice", "secret").unwrap();
/// assert_eq!(principal.name(), "alice");
///
/// assert!(validator.validate("alice", "guess").is_err());
/// assert!(validator.validate("mallory", "secret").is_err());
/// ```
pub struct BasicValidator {
    entries: Vec<Entry>,
}

impl fmt::Debug for BasicValidator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BasicValidator")
            .field("users", &self.entries.len())
            .finish()
    }
}

impl BasicValidator {
    /// Builds a validator from username and password pairs
    pub fn new<I, U, P>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: AsRef<str>,
        P: AsRef<str>,
    {
        let entries = users
            .into_iter()
            .map(|(u, p)| Entry {
                username: hash(u.as_ref()),
                password: hash(p.as_ref()),
            })
            .collect();

        Self { entries }
    }

    /// The number of users in the table
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks a username and password
    ///
    /// # Errors
    ///
    /// No entry matches both the username and the password.
    pub fn validate(&self, username: &str, password: &str) -> Result<Principal, BadCredentials> {
        let username_hash = hash(username);
        let password_hash = hash(password);

        let mut matched = Choice::from(0);
        for entry in &self.entries {
            let user_ok = entry.username.as_ref().ct_eq(username_hash.as_ref());
            let pass_ok = entry.password.as_ref().ct_eq(password_hash.as_ref());
            matched |= user_ok & pass_ok;
        }

        if bool::from(matched) {
            Ok(Principal::basic(username))
        } else {
            Err(BadCredentials)
        }
    }

    /// Checks decoded `Basic` credentials
    ///
    /// # Errors
    ///
    /// No entry matches both the username and the password.
    pub fn validate_credentials(
        &self,
        credentials: &BasicCredentials,
    ) -> Result<Principal, BadCredentials> {
        self.validate(credentials.username(), credentials.password())
    }
}

fn hash(value: &str) -> Digest {
    digest::digest(&SHA256, value.as_bytes())
}
