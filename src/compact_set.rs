use core::any::Any;
use core::fmt::Debug;

use crate::error::CompactError;
use crate::slot_table::Payloads;
use crate::slot_table::Probe;
use crate::slot_table::RawCursor;
use crate::slot_table::SlotTable;
use crate::translator::SetTranslator;

#[cfg(any(test, feature = "stats"))]
use crate::slot_table::DebugStats;
#[cfg(any(test, feature = "stats"))]
use crate::slot_table::ProbeHistogram;

#[inline]
fn packed_hash<T: SetTranslator>(translator: &T, packed: &[u8]) -> u64 {
    translator.hash(&translator.deserialize(packed))
}

/// A hash set that keeps each element as one packed byte sequence.
///
/// Works like [`CompactHashMap`](crate::CompactHashMap) with a
/// [`SetTranslator`] in place of a map translator. Adding an element that is
/// already present leaves the set untouched.
///
/// # Examples
///
/// ```rust
/// use compact_hash::CompactHashSet;
/// use compact_hash::Utf8Translator;
///
/// let mut set = CompactHashSet::new(Utf8Translator::new());
/// assert!(set.add("x".to_string()));
/// assert!(!set.add("x".to_string()));
/// assert!(set.contains(&"x".to_string()));
/// assert!(set.remove(&"x".to_string()));
/// assert!(set.is_empty());
/// ```
#[derive(Clone)]
pub struct CompactHashSet<T> {
    table: SlotTable,
    translator: T,
}

impl<T> PartialEq for CompactHashSet<T>
where
    T: SetTranslator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl<T> Debug for CompactHashSet<T>
where
    T: SetTranslator,
    T::Element: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: SetTranslator> CompactHashSet<T> {
    /// Creates an empty set that packs elements with `translator`.
    pub fn new(translator: T) -> Self {
        Self {
            table: SlotTable::new(),
            translator,
        }
    }

    /// Creates an empty set that can hold `capacity` elements before it has
    /// to grow.
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

    /// Returns the translator used to pack elements.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all elements. Invalidates every outstanding [`SetCursor`].
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rebuilds the table at the smallest size that fits the current
    /// elements.
    pub fn shrink_to_fit(&mut self) {
        let translator = &self.translator;
        self.table
            .shrink_to_fit(|packed| packed_hash(translator, packed));
    }

    /// Reserves room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let translator = &self.translator;
        self.table
            .reserve(additional, |packed| packed_hash(translator, packed));
    }

    /// Returns `true` if the set contains `element`.
    pub fn contains(&self, element: &T::Element) -> bool {
        let hash = self.translator.hash(element);
        self.table
            .find(hash, |packed| self.translator.element_matches(element, packed))
            .is_some()
    }

    /// Adds `element`, returning `true` if it was not already present.
    ///
    /// # Errors
    ///
    /// Returns [`CompactError::CapacityExhausted`] if `element` is new and
    /// the set is full.
    pub fn try_add(&mut self, element: T::Element) -> Result<bool, CompactError> {
        let translator = &self.translator;
        let hash = translator.hash(&element);
        match self
            .table
            .probe(hash, |packed| translator.element_matches(&element, packed))
        {
            Probe::Found(_) => Ok(false),
            Probe::Vacant(index) => {
                let packed = translator.serialize(&element).into_boxed_slice();
                self.table
                    .insert_vacant(index, packed, |packed| packed_hash(translator, packed))?;
                Ok(true)
            }
        }
    }

    /// Adds `element`, returning `true` if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics with "maximum size reached" if `element` is new and the set is
    /// full. Use [`try_add`](Self::try_add) to handle that case.
    pub fn add(&mut self, element: T::Element) -> bool {
        match self.try_add(element) {
            Ok(added) => added,
            Err(err) => panic!("{err}"),
        }
    }

    /// Removes `element`, returning `true` if it was present.
    pub fn remove(&mut self, element: &T::Element) -> bool {
        let translator = &self.translator;
        let hash = translator.hash(element);
        self.table
            .remove(
                hash,
                |packed| translator.element_matches(element, packed),
                |packed| packed_hash(translator, packed),
            )
            .is_some()
    }

    /// Keeps only the elements for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&T::Element) -> bool) {
        let translator = &self.translator;
        self.table.retain(
            |packed| f(&translator.deserialize(packed)),
            |packed| packed_hash(translator, packed),
        );
    }

    /// Returns `true` if every element of `self` is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|element| other.contains(&element))
    }

    /// Returns an iterator over copies of the elements, in table order.
    pub fn iter(&self) -> SetIter<'_, T> {
        SetIter {
            payloads: self.table.payloads(),
            translator: &self.translator,
        }
    }

    /// Returns a fail-fast cursor positioned before the first element.
    ///
    /// See [`CompactHashMap::cursor`](crate::CompactHashMap::cursor).
    pub fn cursor(&self) -> SetCursor {
        SetCursor {
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

impl<T> CompactHashSet<T>
where
    T: SetTranslator,
    T::Element: 'static,
{
    /// Like [`contains`](Self::contains), for a candidate of unknown type.
    /// A candidate the translator does not accept is simply absent.
    pub fn contains_any(&self, candidate: &dyn Any) -> bool {
        self.translator.is_instance(candidate)
            && candidate
                .downcast_ref::<T::Element>()
                .is_some_and(|element| self.contains(element))
    }

    /// Like [`remove`](Self::remove), for a candidate of unknown type.
    pub fn remove_any(&mut self, candidate: &dyn Any) -> bool {
        if !self.translator.is_instance(candidate) {
            return false;
        }
        match candidate.downcast_ref::<T::Element>() {
            Some(element) => self.remove(element),
            None => false,
        }
    }
}

impl<T: SetTranslator> Extend<T::Element> for CompactHashSet<T> {
    fn extend<I: IntoIterator<Item = T::Element>>(&mut self, iter: I) {
        for element in iter {
            self.add(element);
        }
    }
}

impl<'a, T: SetTranslator> IntoIterator for &'a CompactHashSet<T> {
    type IntoIter = SetIter<'a, T>;
    type Item = T::Element;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over copies of the elements of a `CompactHashSet`.
pub struct SetIter<'a, T> {
    payloads: Payloads<'a>,
    translator: &'a T,
}

impl<T: SetTranslator> Iterator for SetIter<'_, T> {
    type Item = T::Element;

    fn next(&mut self) -> Option<Self::Item> {
        self.payloads
            .next()
            .map(|packed| self.translator.deserialize(packed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.payloads.size_hint()
    }
}

impl<T: SetTranslator> ExactSizeIterator for SetIter<'_, T> {}

/// A fail-fast cursor over a [`CompactHashSet`], created by
/// [`CompactHashSet::cursor`].
#[derive(Clone, Debug)]
pub struct SetCursor {
    raw: RawCursor,
}

impl SetCursor {
    /// Returns `true` if another element follows the current position.
    pub fn has_next<T: SetTranslator>(
        &mut self,
        set: &CompactHashSet<T>,
    ) -> Result<bool, CompactError> {
        self.raw.has_next(&set.table)
    }

    /// Advances to the next element and returns a copy of it, or `None`
    /// once every element has been visited.
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: SetTranslator>(
        &mut self,
        set: &CompactHashSet<T>,
    ) -> Result<Option<T::Element>, CompactError> {
        let Some(index) = self.raw.next(&set.table)? else {
            return Ok(None);
        };
        let packed = set.table.get_at(index).ok_or(CompactError::NoCurrentEntry)?;
        Ok(Some(set.translator.deserialize(packed)))
    }

    /// Removes the element last returned by [`next`](Self::next) without
    /// shrinking the set.
    pub fn remove<T: SetTranslator>(
        &mut self,
        set: &mut CompactHashSet<T>,
    ) -> Result<(), CompactError> {
        self.raw.remove(&mut set.table).map(drop)
    }
}
