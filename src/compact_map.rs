use core::any::Any;
use core::fmt::Debug;

use crate::error::CompactError;
use crate::slot_table::Payloads;
use crate::slot_table::RawCursor;
use crate::slot_table::SlotTable;
use crate::translator::MapTranslator;

#[cfg(any(test, feature = "stats"))]
use crate::slot_table::DebugStats;
#[cfg(any(test, feature = "stats"))]
use crate::slot_table::ProbeHistogram;

#[inline]
fn packed_hash<T: MapTranslator>(translator: &T, packed: &[u8]) -> u64 {
    translator.hash(&translator.deserialize_key(packed))
}

/// A hash map that keeps each entry as one packed byte sequence.
///
/// `CompactHashMap<T>` stores no `K` or `V` values at all: a
/// [`MapTranslator`] serializes every key-value pair on the way in and
/// deserializes on the way out. Lookups therefore return owned values.
///
/// # Performance Characteristics
///
/// - **Memory**: one slot (a tagged boxed slice) per table position plus the
///   packed bytes of each entry. The table is kept at most half full.
/// - **Lookups**: every comparison goes through
///   [`MapTranslator::key_matches`].
///
/// # Examples
///
/// ```rust
/// use compact_hash::CompactHashMap;
/// use compact_hash::Utf8I32Translator;
///
/// let mut map = CompactHashMap::new(Utf8I32Translator::new());
/// assert_eq!(map.insert("a".to_string(), 9), None);
/// assert_eq!(map.insert("a".to_string(), 0), Some(9));
/// assert_eq!(map.get(&"a".to_string()), Some(0));
/// assert_eq!(map.len(), 1);
/// ```
#[derive(Clone)]
pub struct CompactHashMap<T> {
    table: SlotTable,
    translator: T,
}

impl<T> Debug for CompactHashMap<T>
where
    T: MapTranslator,
    T::Key: Debug,
    T::Value: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: MapTranslator> CompactHashMap<T> {
    /// Creates an empty map that packs entries with `translator`.
    pub fn new(translator: T) -> Self {
        Self {
            table: SlotTable::new(),
            translator,
        }
    }

    /// Creates an empty map that can hold `capacity` entries before it has
    /// to grow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactHashMap;
    /// use compact_hash::Utf8I32Translator;
    ///
    /// let map = CompactHashMap::with_capacity(Utf8I32Translator::new(), 100);
    /// assert!(map.capacity() >= 200);
    /// ```
    pub fn with_capacity(translator: T, capacity: usize) -> Self {
        Self {
            table: SlotTable::with_capacity(capacity),
            translator,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_len(translator: T, max_len: usize) -> Self {
        Self {
            table: SlotTable::with_max_len(max_len),
            translator,
        }
    }

    /// Returns the translator used to pack entries.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all entries and releases the table.
    ///
    /// Invalidates every outstanding [`Cursor`].
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rebuilds the table at the smallest size that fits the current entries.
    pub fn shrink_to_fit(&mut self) {
        let translator = &self.translator;
        self.table
            .shrink_to_fit(|packed| packed_hash(translator, packed));
    }

    /// Reserves room for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        let translator = &self.translator;
        self.table
            .reserve(additional, |packed| packed_hash(translator, packed));
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.find(key).is_some()
    }

    /// Returns a copy of the value stored for `key`.
    pub fn get(&self, key: &T::Key) -> Option<T::Value> {
        self.find(key)
            .map(|packed| self.translator.deserialize_value(packed))
    }

    #[inline]
    fn find(&self, key: &T::Key) -> Option<&[u8]> {
        let hash = self.translator.hash(key);
        self.table
            .find(hash, |packed| self.translator.key_matches(key, packed))
    }

    /// Inserts a key-value pair, returning the previous value for the key.
    ///
    /// # Errors
    ///
    /// Returns [`CompactError::CapacityExhausted`] if `key` is new and the map
    /// already holds the largest number of entries it can represent.
    pub fn try_insert(
        &mut self,
        key: T::Key,
        value: T::Value,
    ) -> Result<Option<T::Value>, CompactError> {
        let translator = &self.translator;
        let hash = translator.hash(&key);
        let packed = translator.serialize(&key, &value).into_boxed_slice();
        let previous = self.table.insert(
            hash,
            |packed| translator.key_matches(&key, packed),
            packed,
            |packed| packed_hash(translator, packed),
        )?;
        Ok(previous.map(|packed| translator.deserialize_value(&packed)))
    }

    /// Inserts a key-value pair, returning the previous value for the key.
    ///
    /// Overwriting an existing key counts as a modification for outstanding
    /// cursors.
    ///
    /// # Panics
    ///
    /// Panics with "maximum size reached" if `key` is new and the map is full.
    /// Use [`try_insert`](Self::try_insert) to handle that case.
    pub fn insert(&mut self, key: T::Key, value: T::Value) -> Option<T::Value> {
        match self.try_insert(key, value) {
            Ok(previous) => previous,
            Err(err) => panic!("{err}"),
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &T::Key) -> Option<T::Value> {
        let translator = &self.translator;
        let hash = translator.hash(key);
        self.table
            .remove(
                hash,
                |packed| translator.key_matches(key, packed),
                |packed| packed_hash(translator, packed),
            )
            .map(|packed| translator.deserialize_value(&packed))
    }

    /// Removes `key`, returning the stored key and value if it was present.
    pub fn remove_entry(&mut self, key: &T::Key) -> Option<(T::Key, T::Value)> {
        let translator = &self.translator;
        let hash = translator.hash(key);
        self.table
            .remove(
                hash,
                |packed| translator.key_matches(key, packed),
                |packed| packed_hash(translator, packed),
            )
            .map(|packed| {
                (
                    translator.deserialize_key(&packed),
                    translator.deserialize_value(&packed),
                )
            })
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// The table is shrunk at most once, after the whole pass.
    pub fn retain(&mut self, mut f: impl FnMut(&T::Key, &T::Value) -> bool) {
        let translator = &self.translator;
        self.table.retain(
            |packed| {
                f(
                    &translator.deserialize_key(packed),
                    &translator.deserialize_value(packed),
                )
            },
            |packed| packed_hash(translator, packed),
        );
    }

    /// Returns an iterator over copies of the entries, in table order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            payloads: self.table.payloads(),
            translator: &self.translator,
        }
    }

    /// Returns an iterator over copies of the keys.
    pub fn keys(&self) -> Keys<'_, T> {
        Keys {
            payloads: self.table.payloads(),
            translator: &self.translator,
        }
    }

    /// Returns an iterator over copies of the values.
    pub fn values(&self) -> Values<'_, T> {
        Values {
            payloads: self.table.payloads(),
            translator: &self.translator,
        }
    }

    /// Returns a fail-fast cursor positioned before the first entry.
    ///
    /// Unlike [`iter`](Self::iter), the cursor does not borrow the map, so it
    /// can remove entries or replace values while walking. Any other change
    /// made to the map after the cursor was created makes the cursor fail
    /// with [`CompactError::ConcurrentModification`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactHashMap;
    /// use compact_hash::Utf8I32Translator;
    ///
    /// let mut map = CompactHashMap::new(Utf8I32Translator::new());
    /// for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
    ///     map.insert(key.to_string(), i as i32);
    /// }
    ///
    /// let mut cursor = map.cursor();
    /// while let Some((key, value)) = cursor.next(&map).unwrap() {
    ///     if key == "b" {
    ///         cursor.remove(&mut map).unwrap();
    ///     } else {
    ///         cursor.replace_value(&mut map, value * 10).unwrap();
    ///     }
    /// }
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.get(&"c".to_string()), Some(20));
    /// ```
    pub fn cursor(&self) -> Cursor {
        Cursor {
            raw: RawCursor::new(&self.table),
        }
    }

    /// Returns statistics about the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        self.table.debug_stats()
    }

    /// Returns the probe distance histogram of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let translator = &self.translator;
        self.table
            .probe_histogram(|packed| packed_hash(translator, packed))
    }

    /// Verifies the table's structural invariants, panicking on the first
    /// violation.
    #[cfg(any(test, feature = "stats"))]
    pub fn check_structure(&self) {
        let translator = &self.translator;
        self.table
            .check_structure(|packed| packed_hash(translator, packed));
    }
}

impl<T> CompactHashMap<T>
where
    T: MapTranslator,
    T::Key: 'static,
{
    #[inline]
    fn find_any(&self, candidate: &dyn Any) -> Option<&[u8]> {
        if !self.translator.is_instance(candidate) {
            return None;
        }
        self.find(candidate.downcast_ref::<T::Key>()?)
    }

    /// Like [`contains_key`](Self::contains_key), for a candidate of unknown
    /// type. A candidate the translator does not accept is simply absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactHashMap;
    /// use compact_hash::Utf8I32Translator;
    ///
    /// let mut map = CompactHashMap::new(Utf8I32Translator::new());
    /// map.insert("7".to_string(), 7);
    /// assert!(map.contains_any(&"7".to_string()));
    /// assert!(!map.contains_any(&7));
    /// ```
    pub fn contains_any(&self, candidate: &dyn Any) -> bool {
        self.find_any(candidate).is_some()
    }

    /// Like [`get`](Self::get), for a candidate of unknown type.
    pub fn get_any(&self, candidate: &dyn Any) -> Option<T::Value> {
        self.find_any(candidate)
            .map(|packed| self.translator.deserialize_value(packed))
    }

    /// Like [`remove`](Self::remove), for a candidate of unknown type.
    pub fn remove_any(&mut self, candidate: &dyn Any) -> Option<T::Value> {
        if !self.translator.is_instance(candidate) {
            return None;
        }
        self.remove(candidate.downcast_ref::<T::Key>()?)
    }
}

impl<T> Extend<(T::Key, T::Value)> for CompactHashMap<T>
where
    T: MapTranslator,
{
    fn extend<I: IntoIterator<Item = (T::Key, T::Value)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, T: MapTranslator> IntoIterator for &'a CompactHashMap<T> {
    type IntoIter = Iter<'a, T>;
    type Item = (T::Key, T::Value);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over copies of the entries of a `CompactHashMap`.
pub struct Iter<'a, T> {
    payloads: Payloads<'a>,
    translator: &'a T,
}

impl<T: MapTranslator> Iterator for Iter<'_, T> {
    type Item = (T::Key, T::Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.payloads.next().map(|packed| {
            (
                self.translator.deserialize_key(packed),
                self.translator.deserialize_value(packed),
            )
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.payloads.size_hint()
    }
}

impl<T: MapTranslator> ExactSizeIterator for Iter<'_, T> {}

/// An iterator over copies of the keys of a `CompactHashMap`.
pub struct Keys<'a, T> {
    payloads: Payloads<'a>,
    translator: &'a T,
}

impl<T: MapTranslator> Iterator for Keys<'_, T> {
    type Item = T::Key;

    fn next(&mut self) -> Option<Self::Item> {
        self.payloads
            .next()
            .map(|packed| self.translator.deserialize_key(packed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.payloads.size_hint()
    }
}

/// An iterator over copies of the values of a `CompactHashMap`.
pub struct Values<'a, T> {
    payloads: Payloads<'a>,
    translator: &'a T,
}

impl<T: MapTranslator> Iterator for Values<'_, T> {
    type Item = T::Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.payloads
            .next()
            .map(|packed| self.translator.deserialize_value(packed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.payloads.size_hint()
    }
}

/// A fail-fast cursor over a [`CompactHashMap`], created by
/// [`CompactHashMap::cursor`].
///
/// Each step takes the map as an argument and first checks that the map has
/// not been modified by anything but this cursor. Once a step has failed
/// with [`CompactError::ConcurrentModification`], every later step fails the
/// same way.
#[derive(Clone, Debug)]
pub struct Cursor {
    raw: RawCursor,
}

impl Cursor {
    /// Returns `true` if another entry follows the current position.
    pub fn has_next<T: MapTranslator>(
        &mut self,
        map: &CompactHashMap<T>,
    ) -> Result<bool, CompactError> {
        self.raw.has_next(&map.table)
    }

    /// Advances to the next entry and returns a copy of it, or `None` once
    /// every entry has been visited.
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: MapTranslator>(
        &mut self,
        map: &CompactHashMap<T>,
    ) -> Result<Option<(T::Key, T::Value)>, CompactError> {
        let Some(index) = self.raw.next(&map.table)? else {
            return Ok(None);
        };
        let packed = map.table.get_at(index).ok_or(CompactError::NoCurrentEntry)?;
        Ok(Some((
            map.translator.deserialize_key(packed),
            map.translator.deserialize_value(packed),
        )))
    }

    /// Removes the entry last returned by [`next`](Self::next).
    ///
    /// The map is never shrunk here, so the walk can continue. Other cursors
    /// on the same map become invalid.
    ///
    /// # Errors
    ///
    /// [`CompactError::NoCurrentEntry`] if no entry has been returned yet or
    /// it was already removed.
    pub fn remove<T: MapTranslator>(
        &mut self,
        map: &mut CompactHashMap<T>,
    ) -> Result<(), CompactError> {
        self.raw.remove(&mut map.table).map(drop)
    }

    /// Replaces the value of the entry last returned by
    /// [`next`](Self::next) and returns the previous value.
    ///
    /// This does not count as a modification for this or any other cursor.
    pub fn replace_value<T: MapTranslator>(
        &mut self,
        map: &mut CompactHashMap<T>,
        value: T::Value,
    ) -> Result<T::Value, CompactError> {
        let key = map
            .translator
            .deserialize_key(self.raw.current(&map.table)?);
        let packed = map.translator.serialize(&key, &value).into_boxed_slice();
        let previous = self.raw.replace(&mut map.table, packed)?;
        Ok(map.translator.deserialize_value(&previous))
    }
}
