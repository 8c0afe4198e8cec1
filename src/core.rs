use std::hash::Hash;
use std::sync::Arc;

/// Atomic reference-counted string type used for identifiers.
pub(crate) type ArcStr = Arc<str>;

/// A 32-byte BLAKE3 hash used as a structural fingerprint.
///
/// In `henka` this is how artifact sets are identified. Two sets built from
/// equal inputs hash to the same value, which is what lets the node registry
/// coalesce identical transformation requests coming from unrelated consumers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub(crate) struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    /// Hashes any value implementing [`Hash`] through BLAKE3.
    pub(crate) fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = Blake3Hasher::default();
        value.hash(&mut hasher);
        hasher.into()
    }

    pub(crate) fn to_hex(self) -> String {
        use std::fmt::Write;

        let mut acc = String::with_capacity(64);
        for byte in self.0 {
            // Writing into a String never fails.
            let _ = write!(&mut acc, "{byte:02x}");
        }
        acc
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

#[derive(Default)]
pub(crate) struct Blake3Hasher(blake3::Hasher);

impl From<Blake3Hasher> for Hash32 {
    fn from(value: Blake3Hasher) -> Self {
        let bytes: [u8; 32] = value.0.finalize().into();
        Hash32::from(bytes)
    }
}

impl std::hash::Hasher for Blake3Hasher {
    fn finish(&self) -> u64 {
        let mut output = [0u8; 8];
        self.0.finalize_xof().fill(&mut output);
        u64::from_le_bytes(output)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

/// Structural identity of a [`ResolvedArtifactSet`](crate::ResolvedArtifactSet).
///
/// Sets with equal identities resolve to the same artifacts, so the registry
/// treats them as the same upstream when keying transformation requests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SetId(pub(crate) Hash32);

impl SetId {
    /// The identity of a set with nothing in it.
    pub const EMPTY: SetId = SetId(Hash32([0; 32]));

    /// Derives an identity from anything describing a set's contents.
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        SetId(Hash32::of(value))
    }
}

impl std::fmt::Debug for SetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SetId({})", &self.0.to_hex()[..12])
    }
}

impl std::fmt::Display for SetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_hex()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_hash_is_stable() {
        let a = Hash32::of(&("project :lib", "foo.jar"));
        let b = Hash32::of(&("project :lib", "foo.jar"));
        let c = Hash32::of(&("project :lib", "bar.jar"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_to_hex() {
        let hash = Hash32::default();
        assert_eq!(hash.to_hex(), "0".repeat(64));
        assert_eq!(SetId::EMPTY.to_string(), "0".repeat(12));
    }
}
