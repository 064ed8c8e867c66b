//! Capability grants and the policy that checks them

use std::collections::{btree_set, BTreeSet};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named permission granted to a principal
#[braid(serde, ref_doc = "A borrowed reference to a [`Capability`]")]
pub struct Capability;

/// An ordered set of capabilities
///
/// Serialized as a JSON array of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    /// An empty capability set
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a capability to the set
    #[inline]
    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    /// Whether the set holds the given capability
    #[inline]
    #[must_use]
    pub fn contains(&self, capability: &CapabilityRef) -> bool {
        self.0.contains(capability)
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of capabilities in the set
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the capabilities in order
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for Capabilities {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(Capability::from).collect()
    }
}

impl Extend<Capability> for Capabilities {
    #[inline]
    fn extend<I: IntoIterator<Item = Capability>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Capabilities {
    type Item = Capability;
    type IntoIter = btree_set::IntoIter<Capability>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An iterator over borrowed capabilities
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    iter: btree_set::Iter<'a, Capability>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CapabilityRef;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|c| c.as_ref())
    }
}

impl<'a> IntoIterator for &'a Capabilities {
    type Item = &'a CapabilityRef;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Iter {
            iter: self.0.iter(),
        }
    }
}

/// Whether `held` satisfies `required`
///
/// Any single required capability is sufficient. An empty requirement
/// admits everyone.
///
/// ```
/// use warden::{authorize, Capabilities};
///
/// let required: Capabilities = ["read", "admin"].into_iter().collect();
///
/// let reader: Capabilities = ["read"].into_iter().collect();
/// assert!(authorize(&reader, &required));
///
/// let writer: Capabilities = ["write"].into_iter().collect();
/// assert!(!authorize(&writer, &required));
///
/// assert!(authorize(&Capabilities::new(), &Capabilities::new()));
/// ```
#[must_use]
pub fn authorize(held: &Capabilities, required: &Capabilities) -> bool {
    required.is_empty() || required.iter().any(|c| held.contains(c))
}

/// The principal holds none of the capabilities required for access
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("insufficient capabilities")]
pub struct InsufficientCapabilities;

/// An access policy that admits any principal holding at least one of the
/// required capabilities
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct CapabilityPolicy {
    required: Capabilities,
}

impl CapabilityPolicy {
    /// A policy requiring any one of the given capabilities
    ///
    /// An empty set allows every principal.
    pub const fn any_of(required: Capabilities) -> Self {
        Self { required }
    }

    /// A policy that allows every principal
    pub const fn allow_any() -> Self {
        Self::any_of(Capabilities::new())
    }

    /// The capabilities of which at least one must be held
    #[must_use]
    pub fn required(&self) -> &Capabilities {
        &self.required
    }
}

impl aliri_traits::Policy for CapabilityPolicy {
    type Request = Capabilities;
    type Denial = InsufficientCapabilities;

    fn evaluate(&self, held: &Self::Request) -> Result<(), Self::Denial> {
        if authorize(held, &self.required) {
            Ok(())
        } else {
            Err(InsufficientCapabilities)
        }
    }
}

#[cfg(test)]
mod tests {
    use aliri_traits::Policy;
    use color_eyre::Result;

    use super::*;

    fn caps<const N: usize>(items: [&str; N]) -> Capabilities {
        items.into_iter().collect()
    }

    #[test]
    fn empty_requirement_admits_everyone() {
        assert!(authorize(&caps([]), &caps([])));
        assert!(authorize(&caps(["read"]), &caps([])));
    }

    #[test]
    fn any_single_overlap_is_enough() {
        let required = caps(["read", "admin"]);
        assert!(authorize(&caps(["read", "write"]), &required));
        assert!(authorize(&caps(["admin"]), &required));
        assert!(!authorize(&caps(["write"]), &required));
        assert!(!authorize(&caps([]), &required));
    }

    #[test]
    fn matching_is_exact() {
        assert!(!authorize(&caps(["READ"]), &caps(["read"])));
        assert!(!authorize(&caps(["read:all"]), &caps(["read"])));
    }

    #[test]
    fn policy_denies_with_insufficient_capabilities() {
        let policy = CapabilityPolicy::any_of(caps(["read"]));
        assert_eq!(policy.evaluate(&caps(["read", "write"])), Ok(()));
        assert_eq!(
            policy.evaluate(&caps(["write"])),
            Err(InsufficientCapabilities)
        );
        assert_eq!(CapabilityPolicy::allow_any().evaluate(&caps([])), Ok(()));
    }

    #[test]
    fn collects_from_borrowed_names() {
        let collected: Capabilities = vec!["write", "read"].into_iter().collect();
        assert!(collected.contains(CapabilityRef::from_static("read")));
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn deserializes_from_array() -> Result<()> {
        let parsed: Capabilities = serde_json::from_str(r#"["write","read","write"]"#)?;
        assert_eq!(parsed.len(), 2);
        let ordered: Vec<_> = parsed.iter().map(CapabilityRef::as_str).collect();
        assert_eq!(ordered, ["read", "write"]);
        Ok(())
    }

    #[test]
    fn rejects_non_string_entries() {
        let parsed: Result<Capabilities, _> = serde_json::from_str(r#"["read", 7]"#);
        assert!(parsed.is_err());
    }
}
