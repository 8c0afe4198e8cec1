//! Immutable variant descriptions.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::core::ArcStr;

/// An immutable set of attributes describing a variant, e.g. `{usage: jar}`.
///
/// Equality and hashing are structural: two sets are interchangeable if and
/// only if all of their entries match. The entries live behind an [`Arc`], so
/// cloning a set is cheap and sharing it across threads needs no locking.
/// Sets are never mutated, [`with`](Self::with) returns a new set instead.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct AttributeSet(Arc<BTreeMap<ArcStr, ArcStr>>);

impl AttributeSet {
    /// Returns a set with no attributes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a set from key-value pairs. Later duplicates win.
    pub fn of<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<ArcStr>,
        V: Into<ArcStr>,
    {
        entries.into_iter().collect()
    }

    /// Returns a copy of this set with `key` set to `value`.
    pub fn with(&self, key: impl Into<ArcStr>, value: impl Into<ArcStr>) -> Self {
        let mut map = (*self.0).clone();
        map.insert(key.into(), value.into());
        Self(Arc::new(map))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(AsRef::as_ref)
    }

    /// Checks whether every entry of `requested` is present in this set with
    /// the same value.
    pub fn matches(&self, requested: &AttributeSet) -> bool {
        requested
            .iter()
            .all(|(key, value)| self.get(key) == Some(value))
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeSet
where
    K: Into<ArcStr>,
    V: Into<ArcStr>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self(Arc::new(map))
    }
}

impl Display for AttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

impl Debug for AttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AttributeSet({self})")
    }
}

impl Serialize for AttributeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
