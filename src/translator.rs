use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::hash::BuildHasher;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by the built-in translators when none is
        /// supplied.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by the built-in translators when none is
        /// supplied.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    }
}

/// Converts map keys and values to and from the packed byte form stored in a
/// [`CompactHashMap`](crate::CompactHashMap), and hashes keys.
///
/// A translator is a pure function object: the same input must always
/// produce the same bytes and the same hash for the lifetime of the map that
/// owns it. The container never interprets the bytes itself.
pub trait MapTranslator {
    /// The key type.
    type Key: PartialEq;
    /// The value type. Use an `Option` here if absent values are allowed.
    type Value;

    /// Tests whether a loosely-typed candidate may be used as a key.
    ///
    /// This never fails; returning `false` makes lookups and removals with
    /// the candidate report "not found". The default accepts exactly
    /// `Self::Key`.
    fn is_instance(&self, candidate: &dyn Any) -> bool
    where
        Self::Key: 'static,
    {
        candidate.is::<Self::Key>()
    }

    /// Hashes a key. Equal keys must hash identically. The container uses
    /// the hash as is, so distribution quality is up to the translator.
    fn hash(&self, key: &Self::Key) -> u64;

    /// Packs a key-value pair into a byte sequence.
    fn serialize(&self, key: &Self::Key, value: &Self::Value) -> Vec<u8>;

    /// Reconstructs a key equal to the one that was packed.
    fn deserialize_key(&self, packed: &[u8]) -> Self::Key;

    /// Reconstructs a value equal to the one that was packed.
    fn deserialize_value(&self, packed: &[u8]) -> Self::Value;

    /// Returns `true` if `packed` holds `key`.
    ///
    /// Override this to compare without materializing the stored key.
    fn key_matches(&self, key: &Self::Key, packed: &[u8]) -> bool {
        self.deserialize_key(packed) == *key
    }
}

/// Converts set elements to and from the packed byte form stored in a
/// [`CompactHashSet`](crate::CompactHashSet), and hashes them.
pub trait SetTranslator {
    /// The element type.
    type Element: PartialEq;

    /// Tests whether a loosely-typed candidate may be used as an element.
    /// The default accepts exactly `Self::Element`.
    fn is_instance(&self, candidate: &dyn Any) -> bool
    where
        Self::Element: 'static,
    {
        candidate.is::<Self::Element>()
    }

    /// Hashes an element. Equal elements must hash identically.
    fn hash(&self, element: &Self::Element) -> u64;

    /// Packs an element into a byte sequence.
    fn serialize(&self, element: &Self::Element) -> Vec<u8>;

    /// Reconstructs an element equal to the one that was packed.
    fn deserialize(&self, packed: &[u8]) -> Self::Element;

    /// Returns `true` if `packed` holds `element`.
    fn element_matches(&self, element: &Self::Element, packed: &[u8]) -> bool {
        self.deserialize(packed) == *element
    }
}

/// Stores `String` set elements as their UTF-8 bytes.
#[derive(Clone, Debug, Default)]
pub struct Utf8Translator<S> {
    hash_builder: S,
}

impl<S> Utf8Translator<S> {
    /// Creates a translator that hashes with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self { hash_builder }
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl Utf8Translator<DefaultHashBuilder> {
    /// Creates a translator using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<S: BuildHasher> SetTranslator for Utf8Translator<S> {
    type Element = String;

    fn hash(&self, element: &String) -> u64 {
        self.hash_builder.hash_one(element.as_str())
    }

    fn serialize(&self, element: &String) -> Vec<u8> {
        element.as_bytes().to_vec()
    }

    fn deserialize(&self, packed: &[u8]) -> String {
        String::from_utf8_lossy(packed).into_owned()
    }

    fn element_matches(&self, element: &String, packed: &[u8]) -> bool {
        element.as_bytes() == packed
    }
}

const I32_BYTES: usize = 4;

/// Stores `String -> i32` map entries as the key's UTF-8 bytes followed by
/// the value in 4 big-endian bytes.
#[derive(Clone, Debug, Default)]
pub struct Utf8I32Translator<S> {
    hash_builder: S,
}

impl<S> Utf8I32Translator<S> {
    /// Creates a translator that hashes with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self { hash_builder }
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl Utf8I32Translator<DefaultHashBuilder> {
    /// Creates a translator using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<S: BuildHasher> MapTranslator for Utf8I32Translator<S> {
    type Key = String;
    type Value = i32;

    fn hash(&self, key: &String) -> u64 {
        self.hash_builder.hash_one(key.as_str())
    }

    fn serialize(&self, key: &String, value: &i32) -> Vec<u8> {
        let mut packed = Vec::with_capacity(key.len() + I32_BYTES);
        packed.extend_from_slice(key.as_bytes());
        packed.extend_from_slice(&value.to_be_bytes());
        packed
    }

    fn deserialize_key(&self, packed: &[u8]) -> String {
        String::from_utf8_lossy(&packed[..packed.len() - I32_BYTES]).into_owned()
    }

    fn deserialize_value(&self, packed: &[u8]) -> i32 {
        let mut bytes = [0u8; I32_BYTES];
        bytes.copy_from_slice(&packed[packed.len() - I32_BYTES..]);
        i32::from_be_bytes(bytes)
    }

    fn key_matches(&self, key: &String, packed: &[u8]) -> bool {
        packed.len() == key.len() + I32_BYTES && &packed[..key.len()] == key.as_bytes()
    }
}
