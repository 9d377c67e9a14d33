//! Reference scalars: item references and entity references.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::Error;
use crate::types::{KeyRange, ZeroValue};
use crate::util::{bytes_to_hex_string, hex_string_to_bytes};

/// A 256-bit message digest.
///
/// Hashes are byte sequences in the order their hex digits print (a
/// big-endian 256-bit value) and are never byte-swapped by the streams.
/// Formats as 64 lowercase hex characters without separators.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash {
    digest: [u8; 32],
}

impl Hash {
    /// The all-zero hash.
    pub const ZERO: Hash = Hash { digest: [0; 32] };
    /// A value ordered before every digest a hash function can produce,
    /// apart from the zero hash.
    pub const INF: Hash = Hash {
        digest: {
            let mut digest = [0u8; 32];
            digest[31] = 1;
            digest
        },
    };
    /// The greatest hash value.
    pub const SUP: Hash = Hash { digest: [0xff; 32] };

    /// Returns the digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Returns `true` if this is the all-zero hash.
    pub fn is_zero(&self) -> bool {
        *self == Hash::ZERO
    }
}

impl From<[u8; 32]> for Hash {
    fn from(digest: [u8; 32]) -> Self {
        Hash { digest }
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_hex_string(&self.digest))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Ok(Hash {
            digest: hex_string_to_bytes::<32>(s)?,
        })
    }
}

/// A reference to an item within an entity. Acts like an opaque handle.
///
/// Item references can be minted, held, copied and compared, but cannot be
/// built from raw bytes through the public API. The null reference orders
/// before every minted reference.
///
/// # Example
/// ```
/// use hoard::types::refs::ItemRef;
///
/// let a = ItemRef::make_ref();
/// assert!(a != ItemRef::NULL);
/// assert!(ItemRef::NULL < a);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ItemRef {
    id: Uuid,
}

impl ItemRef {
    /// The null reference (all-zero UUID).
    pub const NULL: ItemRef = ItemRef { id: Uuid::nil() };
    /// Sentinel ordered before every minted reference, for range queries.
    pub const INF: ItemRef = ItemRef {
        id: Uuid::from_bytes({
            let mut bytes = [0u8; 16];
            bytes[15] = 1;
            bytes
        }),
    };
    /// Sentinel ordered after every minted reference, for range queries.
    pub const SUP: ItemRef = ItemRef {
        id: Uuid::from_bytes([0xff; 16]),
    };

    /// Mints a new unique reference.
    pub fn make_ref() -> ItemRef {
        ItemRef { id: Uuid::new_v4() }
    }

    /// Builds a reference from a deserialized UUID. Only the stream layer
    /// mints references from bytes.
    pub(crate) fn from_uuid(id: Uuid) -> ItemRef {
        ItemRef { id }
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }

    /// Returns `true` for the null reference.
    pub fn is_null(&self) -> bool {
        self.id.is_nil()
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id.hyphenated())
    }
}

impl fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemRef({})", self)
    }
}

impl KeyRange for ItemRef {
    fn range_inf() -> Self {
        ItemRef::INF
    }
    fn range_sup() -> Self {
        ItemRef::SUP
    }
}

impl ZeroValue for ItemRef {
    fn zero() -> Self {
        ItemRef::NULL
    }
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

/// A content address: the hash of a serialized entity artifact.
///
/// Unlike [`ItemRef`], an entity reference is constructible from any hash,
/// since it names an artifact by content rather than by identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityRef {
    hash: Hash,
}

impl EntityRef {
    /// The null reference (all-zero hash).
    pub const NULL: EntityRef = EntityRef { hash: Hash::ZERO };
    /// Sentinel ordered before every real content address.
    pub const INF: EntityRef = EntityRef { hash: Hash::INF };
    /// Sentinel ordered after every real content address.
    pub const SUP: EntityRef = EntityRef { hash: Hash::SUP };

    /// Returns the content hash.
    pub fn as_hash(&self) -> &Hash {
        &self.hash
    }

    /// Returns `true` for the null reference.
    pub fn is_null(&self) -> bool {
        self.hash.is_zero()
    }
}

impl From<Hash> for EntityRef {
    fn from(hash: Hash) -> Self {
        EntityRef { hash }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({})", self.hash)
    }
}

impl FromStr for EntityRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Ok(EntityRef {
            hash: Hash::from_str(s)?,
        })
    }
}

impl KeyRange for EntityRef {
    fn range_inf() -> Self {
        EntityRef::INF
    }
    fn range_sup() -> Self {
        EntityRef::SUP
    }
}

impl ZeroValue for EntityRef {
    fn zero() -> Self {
        EntityRef::NULL
    }
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_refs_are_unique_and_nonnull() {
        let a = ItemRef::make_ref();
        let b = ItemRef::make_ref();
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert!(ItemRef::NULL < a);
        assert!(a < ItemRef::SUP);
    }

    #[test]
    fn hash_hex_round_trip() {
        let mut digest = [0u8; 32];
        digest[0] = 0xab;
        digest[31] = 0x01;
        let hash = Hash::from(digest);
        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.starts_with("ab"));
        assert_eq!(text.parse::<Hash>().unwrap(), hash);
    }

    #[test]
    fn item_ref_formats_as_uuid() {
        let text = ItemRef::NULL.to_string();
        assert_eq!(text, "00000000-0000-0000-0000-000000000000");
        assert_eq!(text.len(), 36);
    }
}
