use alloc::boxed::Box;
use alloc::vec;
#[cfg(any(test, feature = "stats"))]
use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem;

use crate::error::CompactError;

/// Largest table length. One bit of headroom is kept below the top of a
/// 32-bit index so that doubling a length can never overflow.
pub const MAX_LEN: usize = 1 << 30;

/// Growth is triggered once `filled / length` exceeds this ratio.
const LOAD_FACTOR: f64 = 0.5;

/// The state of one table position.
#[derive(Clone, PartialEq, Eq)]
pub enum Slot {
    /// Never written since the last rebuild.
    Empty,
    /// Logically deleted. Keeps probe chains that pass through it intact
    /// until the next rebuild.
    Tombstone,
    /// A packed entry produced by a translator.
    Occupied(Box<[u8]>),
}

impl Debug for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Slot::Empty => f.write_str(".."),
            Slot::Tombstone => f.write_str("xx"),
            Slot::Occupied(packed) => write!(f, "{}b", packed.len()),
        }
    }
}

/// Outcome of [`SlotTable::probe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The key lives at this index.
    Found(usize),
    /// The key is absent; this is where it should be written. A tombstone
    /// seen on the way is preferred over the terminating empty slot.
    Vacant(usize),
}

/// The sequence of indices visited for a hash: the home slot, then a linear
/// scan starting at a hash-dependent offset from it, wrapping once around the
/// whole table.
struct ProbeSeq {
    mask: usize,
    home: Option<usize>,
    start: usize,
    next: Option<usize>,
}

impl ProbeSeq {
    #[inline(always)]
    fn new(hash: u64, length_bits: u32) -> Self {
        let mask = (1usize << length_bits) - 1;
        let home = hash as usize & mask;
        // Never zero, or the scan would stall on the home slot.
        let increment = (((hash >> length_bits) as usize) & mask).max(1);
        let start = (home + increment) & mask;
        ProbeSeq {
            mask,
            home: Some(home),
            start,
            next: Some(start),
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if let Some(home) = self.home.take() {
            return Some(home);
        }
        let index = self.next?;
        let following = (index + 1) & self.mask;
        self.next = (following != self.start).then_some(following);
        Some(index)
    }
}

fn empty_slots(length: usize) -> Box<[Slot]> {
    vec![Slot::Empty; length].into_boxed_slice()
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of occupied slots
    pub populated: usize,
    /// Number of tombstones awaiting the next rebuild
    pub tombstones: usize,
    /// Occupied plus tombstone slots
    pub filled: usize,
    /// Table length
    pub total_slots: usize,
    /// populated / total_slots
    pub load_factor: f64,
    /// filled / total_slots
    pub slot_utilization: f64,
    /// Bytes held by packed entries
    pub payload_bytes: usize,
    /// Slot array plus packed entries, in bytes
    pub total_bytes: usize,
    /// Current structural version
    pub version: u64,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Slot Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.total_slots,
            self.load_factor * 100.0
        );
        println!(
            "Filled: {} ({} tombstones, {:.2}% utilization)",
            self.filled,
            self.tombstones,
            self.slot_utilization * 100.0
        );
        println!(
            "Memory: {} bytes total, {} bytes of packed entries",
            self.total_bytes, self.payload_bytes
        );
        println!("Version: {}", self.version);
    }
}

/// Number of entries found at each probe distance. Index 0 counts entries
/// sitting in their home slot.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `counts[d]` entries were found after skipping `d` slots.
    pub counts: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Total number of entries in the histogram.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Pretty-print the histogram.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Probe Length Histogram ===");
        let total = self.total().max(1);
        for (distance, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            println!(
                "{distance:>4}: {count:>10} ({:.2}%)",
                count as f64 / total as f64 * 100.0
            );
        }
    }
}

/// An open-addressing table of packed byte entries.
///
/// `SlotTable` knows nothing about keys: every operation receives the key's
/// hash and an equality predicate over packed bytes, and operations that may
/// rebuild the table also receive a function that rehashes a stored entry.
/// [`CompactHashMap`](crate::CompactHashMap) and
/// [`CompactHashSet`](crate::CompactHashSet) supply these from their
/// translators.
///
/// The length is always a power of two and at least one slot is always
/// empty, which bounds every probe.
///
/// ## Example
///
/// ```rust
/// use compact_hash::slot_table::SlotTable;
///
/// let rehash = |packed: &[u8]| packed[0] as u64;
///
/// let mut table = SlotTable::new();
/// let previous = table.insert(7, |p| p == [7u8], vec![7u8].into_boxed_slice(), rehash);
/// assert_eq!(previous, Ok(None));
/// assert_eq!(table.find(7, |p| p == [7u8]), Some(&[7u8][..]));
/// assert!(table.remove(7, |p| p == [7u8], rehash).is_some());
/// assert!(table.is_empty());
/// ```
pub struct SlotTable {
    slots: Box<[Slot]>,
    length_bits: u32,
    size: usize,
    filled: usize,
    version: u64,
    max_len: usize,
}

impl Debug for SlotTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotTable")
            .field("slots", &self.slots)
            .field("size", &self.size)
            .field("filled", &self.filled)
            .field("version", &self.version)
            .finish()
    }
}

impl Clone for SlotTable {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            length_bits: self.length_bits,
            size: self.size,
            filled: self.filled,
            version: 0,
            max_len: self.max_len,
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotTable {
    /// Creates an empty table of length 1.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LEN)
    }

    /// Creates an empty table long enough to hold `capacity` entries without
    /// growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        let length = table.target_length(capacity, 1);
        table.slots = empty_slots(length);
        table.length_bits = length.trailing_zeros();
        table
    }

    pub(crate) fn with_max_len(max_len: usize) -> Self {
        debug_assert!(max_len.is_power_of_two() && max_len >= 2 && max_len <= MAX_LEN);
        Self {
            slots: empty_slots(1),
            length_bits: 0,
            size: 0,
            filled: 0,
            version: 0,
            max_len,
        }
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if no slot is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the table length.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the structural version. It changes on every insert, removal,
    /// overwrite, clear and rebuild made through the table's own API.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Discards every entry and shrinks the table back to length 1.
    pub fn clear(&mut self) {
        self.slots = empty_slots(1);
        self.length_bits = 0;
        self.size = 0;
        self.filled = 0;
        self.bump_version();
    }

    /// Locates `hash`/`eq` in the table.
    ///
    /// Returns [`Probe::Found`] with the index of the matching entry, or
    /// [`Probe::Vacant`] with the index a new entry should be written to.
    ///
    /// # Panics
    ///
    /// Panics if the scan wraps around without meeting an empty slot, which
    /// means the table is corrupted.
    pub fn probe(&self, hash: u64, eq: impl Fn(&[u8]) -> bool) -> Probe {
        let mut reusable = None;
        for index in ProbeSeq::new(hash, self.length_bits) {
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant(reusable.unwrap_or(index)),
                Slot::Tombstone => {
                    reusable.get_or_insert(index);
                }
                Slot::Occupied(packed) => {
                    if eq(packed) {
                        return Probe::Found(index);
                    }
                }
            }
        }
        panic!("probe visited every slot without finding an empty one");
    }

    /// Returns the packed entry matching `hash`/`eq`, if any.
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&[u8]) -> bool) -> Option<&[u8]> {
        match self.probe(hash, eq) {
            Probe::Found(index) => self.get_at(index),
            Probe::Vacant(_) => None,
        }
    }

    /// Inserts `packed`, overwriting the entry matching `hash`/`eq` if there
    /// is one.
    ///
    /// Returns the overwritten entry, or `None` if a new entry was added. A
    /// new entry may rebuild the table into a larger one.
    pub fn insert(
        &mut self,
        hash: u64,
        eq: impl Fn(&[u8]) -> bool,
        packed: Box<[u8]>,
        rehash: impl Fn(&[u8]) -> u64,
    ) -> Result<Option<Box<[u8]>>, CompactError> {
        match self.probe(hash, eq) {
            Probe::Found(index) => {
                // Payload content changed; cursors must observe it.
                self.bump_version();
                Ok(Some(self.replace_at(index, packed)))
            }
            Probe::Vacant(index) => {
                self.insert_vacant(index, packed, rehash)?;
                Ok(None)
            }
        }
    }

    /// Writes a new entry at `index`, which must come from a
    /// [`Probe::Vacant`] result for the entry's key on the current table.
    pub(crate) fn insert_vacant(
        &mut self,
        index: usize,
        packed: Box<[u8]>,
        rehash: impl Fn(&[u8]) -> u64,
    ) -> Result<(), CompactError> {
        if self.size >= self.max_len - 1 {
            return Err(CompactError::CapacityExhausted);
        }
        let previous = mem::replace(&mut self.slots[index], Slot::Occupied(packed));
        debug_assert!(!matches!(previous, Slot::Occupied(_)));
        if previous == Slot::Empty {
            self.filled += 1;
        }
        self.size += 1;
        self.bump_version();
        self.grow_if_needed(rehash);
        Ok(())
    }

    /// Removes the entry matching `hash`/`eq` and returns it. The table may
    /// be rebuilt into a smaller one afterwards.
    pub fn remove(
        &mut self,
        hash: u64,
        eq: impl Fn(&[u8]) -> bool,
        rehash: impl Fn(&[u8]) -> u64,
    ) -> Option<Box<[u8]>> {
        let Probe::Found(index) = self.probe(hash, eq) else {
            return None;
        };
        let packed = self.remove_at(index);
        self.shrink_if_needed(rehash);
        Some(packed)
    }

    /// Removes every entry for which `keep` returns `false`.
    ///
    /// Removals leave tombstones during the pass; the shrink check runs once
    /// at the end.
    pub fn retain(
        &mut self,
        mut keep: impl FnMut(&[u8]) -> bool,
        rehash: impl Fn(&[u8]) -> u64,
    ) {
        for index in 0..self.slots.len() {
            let discard = matches!(&self.slots[index], Slot::Occupied(packed) if !keep(packed));
            if discard {
                self.remove_at(index);
            }
        }
        self.shrink_if_needed(rehash);
    }

    /// Rebuilds the table at the smallest length that holds the current
    /// entries under the load factor, dropping all tombstones.
    pub fn shrink_to_fit(&mut self, rehash: impl Fn(&[u8]) -> u64) {
        let length = self.target_length(self.size, 1);
        self.rebuild(length, rehash);
    }

    /// Grows the table so that `additional` more entries fit without another
    /// rebuild.
    pub fn reserve(&mut self, additional: usize, rehash: impl Fn(&[u8]) -> u64) {
        let wanted = self.size.saturating_add(additional);
        let length = self.target_length(wanted, self.slots.len());
        if length > self.slots.len() {
            self.rebuild(length, rehash);
        }
    }

    /// Returns an iterator over the packed entries in slot order.
    pub fn payloads(&self) -> Payloads<'_> {
        Payloads {
            slots: self.slots.iter(),
            remaining: self.size,
        }
    }

    /// Returns the packed entry at `index` if that slot is occupied.
    #[inline]
    pub fn get_at(&self, index: usize) -> Option<&[u8]> {
        match self.slots.get(index) {
            Some(Slot::Occupied(packed)) => Some(packed),
            _ => None,
        }
    }

    /// Returns the index of the first occupied slot at or after `from`.
    pub fn next_occupied(&self, from: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, slot)| matches!(slot, Slot::Occupied(_)))
            .map(|(index, _)| index)
    }

    /// Swaps the occupied entry at `index` for `packed` without touching the
    /// counters or the version.
    pub(crate) fn replace_at(&mut self, index: usize, packed: Box<[u8]>) -> Box<[u8]> {
        match mem::replace(&mut self.slots[index], Slot::Occupied(packed)) {
            Slot::Occupied(previous) => previous,
            _ => unreachable!("replaced slot {index} was not occupied"),
        }
    }

    /// Turns the occupied slot at `index` into a tombstone. Never resizes.
    pub(crate) fn remove_at(&mut self, index: usize) -> Box<[u8]> {
        let packed = match mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied(packed) => packed,
            _ => unreachable!("removed slot {index} was not occupied"),
        };
        self.size -= 1;
        self.bump_version();
        packed
    }

    #[inline(always)]
    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Doubles `length` until `size` entries fit under the load factor or
    /// the ceiling is reached.
    fn target_length(&self, size: usize, mut length: usize) -> usize {
        while length < self.max_len && size as f64 / length as f64 > LOAD_FACTOR {
            length *= 2;
        }
        length
    }

    fn grow_if_needed(&mut self, rehash: impl Fn(&[u8]) -> u64) {
        let length = self.slots.len();
        if length < self.max_len && self.filled as f64 / length as f64 > LOAD_FACTOR {
            let length = self.target_length(self.size, length);
            self.rebuild(length, rehash);
        } else if self.filled + 1 >= length {
            // At the ceiling: purge tombstones so one slot stays empty.
            self.rebuild(length, rehash);
        }
    }

    fn shrink_if_needed(&mut self, rehash: impl Fn(&[u8]) -> u64) {
        let mut length = self.slots.len();
        while length >= 2
            && (self.size as f64 / length as f64) < LOAD_FACTOR / 4.0
            && self.size < length / 2
        {
            length /= 2;
        }
        if length < self.slots.len() {
            self.rebuild(length, rehash);
        }
    }

    /// Replaces the table with an empty one of `length` slots and reinserts
    /// every occupied entry. Tombstones are dropped.
    fn rebuild(&mut self, length: usize, rehash: impl Fn(&[u8]) -> u64) {
        debug_assert!(length.is_power_of_two() && length <= self.max_len);
        debug_assert!(self.size < length);

        let old = mem::replace(&mut self.slots, empty_slots(length));
        self.length_bits = length.trailing_zeros();
        self.filled = self.size;
        self.bump_version();

        for slot in old.into_vec() {
            let Slot::Occupied(packed) = slot else {
                continue;
            };
            match self.probe(rehash(&packed), |other| other == &*packed) {
                Probe::Vacant(index) => self.slots[index] = Slot::Occupied(packed),
                Probe::Found(index) => {
                    panic!("duplicate entry found at slot {index} while rebuilding")
                }
            }
        }
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn filled(&self) -> usize {
        self.filled
    }

    /// Returns statistics about the current table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let payload_bytes: usize = self.payloads().map(<[u8]>::len).sum();
        let total_slots = self.slots.len();
        DebugStats {
            populated: self.size,
            tombstones: self.filled - self.size,
            filled: self.filled,
            total_slots,
            load_factor: self.size as f64 / total_slots as f64,
            slot_utilization: self.filled as f64 / total_slots as f64,
            payload_bytes,
            total_bytes: total_slots * mem::size_of::<Slot>() + payload_bytes,
            version: self.version,
        }
    }

    /// Counts how far each entry sits from its home slot along its probe
    /// sequence.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, rehash: impl Fn(&[u8]) -> u64) -> ProbeHistogram {
        let mut counts = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let Slot::Occupied(packed) = slot else {
                continue;
            };
            let distance = ProbeSeq::new(rehash(packed), self.length_bits)
                .position(|visited| visited == index)
                .unwrap_or(self.slots.len());
            if counts.len() <= distance {
                counts.resize(distance + 1, 0);
            }
            counts[distance] += 1;
        }
        ProbeHistogram { counts }
    }

    /// Verifies every structural invariant with a full scan.
    ///
    /// # Panics
    ///
    /// Panics describing the first invariant found broken.
    #[cfg(any(test, feature = "stats"))]
    pub fn check_structure(&self, rehash: impl Fn(&[u8]) -> u64) {
        let length = self.slots.len();
        assert!(length.is_power_of_two(), "length {length} is not a power of two");
        assert!(length <= self.max_len, "length {length} exceeds the ceiling");
        assert_eq!(1usize << self.length_bits, length, "length_bits out of sync");

        let mut occupied = 0;
        let mut filled = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => {}
                Slot::Tombstone => filled += 1,
                Slot::Occupied(packed) => {
                    occupied += 1;
                    filled += 1;
                    assert_eq!(
                        self.probe(rehash(packed), |other| other == &**packed),
                        Probe::Found(index),
                        "entry at slot {index} is not reachable by its own probe"
                    );
                }
            }
        }
        assert_eq!(occupied, self.size, "size out of sync");
        assert_eq!(filled, self.filled, "filled out of sync");
        assert!(self.filled < length, "no empty slot left");
    }
}

/// An iterator over the packed entries of a [`SlotTable`], in slot order.
#[derive(Clone)]
pub struct Payloads<'a> {
    slots: core::slice::Iter<'a, Slot>,
    remaining: usize,
}

impl<'a> Iterator for Payloads<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(packed) = slot {
                self.remaining -= 1;
                return Some(packed);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Payloads<'_> {}

/// A fail-fast position in a [`SlotTable`] that does not borrow it.
///
/// The cursor snapshots the table's version when created. Every step first
/// compares that snapshot with the live version; a mismatch means the table
/// was changed by something other than this cursor, and the cursor refuses
/// to continue from then on.
#[derive(Clone, Debug)]
pub struct RawCursor {
    expected_version: u64,
    next_index: usize,
    current: Option<usize>,
    poisoned: bool,
}

impl RawCursor {
    /// Creates a cursor positioned before the first entry of `table`.
    pub fn new(table: &SlotTable) -> Self {
        Self {
            expected_version: table.version(),
            next_index: 0,
            current: None,
            poisoned: false,
        }
    }

    fn check(&mut self, table: &SlotTable) -> Result<(), CompactError> {
        if self.poisoned || table.version() != self.expected_version {
            self.poisoned = true;
            return Err(CompactError::ConcurrentModification);
        }
        Ok(())
    }

    /// Returns `true` if another occupied slot follows the current position.
    pub fn has_next(&mut self, table: &SlotTable) -> Result<bool, CompactError> {
        self.check(table)?;
        match table.next_occupied(self.next_index) {
            Some(index) => {
                self.next_index = index;
                Ok(true)
            }
            None => {
                self.next_index = table.capacity();
                Ok(false)
            }
        }
    }

    /// Moves to the next occupied slot and returns its index, or `None` once
    /// the table is exhausted.
    pub fn next(&mut self, table: &SlotTable) -> Result<Option<usize>, CompactError> {
        self.check(table)?;
        match table.next_occupied(self.next_index) {
            Some(index) => {
                self.current = Some(index);
                self.next_index = index + 1;
                Ok(Some(index))
            }
            None => {
                self.next_index = table.capacity();
                Ok(None)
            }
        }
    }

    /// Returns the packed entry at the current position.
    pub fn current<'t>(&mut self, table: &'t SlotTable) -> Result<&'t [u8], CompactError> {
        self.check(table)?;
        self.current
            .and_then(|index| table.get_at(index))
            .ok_or(CompactError::NoCurrentEntry)
    }

    /// Tombstones the current entry and returns it. The table is never
    /// resized here, so the remaining slots keep their positions.
    pub fn remove(&mut self, table: &mut SlotTable) -> Result<Box<[u8]>, CompactError> {
        self.current(table)?;
        let index = self.current.take().ok_or(CompactError::NoCurrentEntry)?;
        let packed = table.remove_at(index);
        self.expected_version = table.version();
        Ok(packed)
    }

    /// Swaps the current entry for `packed`, which must encode the same key,
    /// and returns the previous entry.
    pub fn replace(
        &mut self,
        table: &mut SlotTable,
        packed: Box<[u8]>,
    ) -> Result<Box<[u8]>, CompactError> {
        self.current(table)?;
        let index = self.current.ok_or(CompactError::NoCurrentEntry)?;
        Ok(table.replace_at(index, packed))
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn hash(&self, packed: &[u8]) -> u64 {
            let mut h = SipHasher::new_with_keys(self.k0, self.k1);
            h.write(packed);
            h.finish()
        }
    }

    fn pack(key: u64) -> Box<[u8]> {
        Box::from(key.to_le_bytes())
    }

    fn insert(table: &mut SlotTable, hash: impl Fn(&[u8]) -> u64, key: u64) -> bool {
        let packed = pack(key);
        let h = hash(&packed);
        table
            .insert(h, |p| p == &*pack(key), packed, hash)
            .unwrap()
            .is_none()
    }

    fn remove(table: &mut SlotTable, hash: impl Fn(&[u8]) -> u64, key: u64) -> bool {
        let packed = pack(key);
        table.remove(hash(&packed), |p| p == &*packed, hash).is_some()
    }

    fn contains(table: &SlotTable, hash: impl Fn(&[u8]) -> u64, key: u64) -> bool {
        let packed = pack(key);
        table.find(hash(&packed), |p| p == &*packed).is_some()
    }

    #[test]
    fn probe_seq_visits_home_then_every_slot_once() {
        let seq: alloc::vec::Vec<usize> = ProbeSeq::new(0b1101_0110, 3).collect();
        // home = 0b110, increment = 0b1101_0110 >> 3 & 7 = 0b010
        assert_eq!(seq[0], 6);
        assert_eq!(&seq[1..], &[0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn increment_is_never_zero() {
        let seq: alloc::vec::Vec<usize> = ProbeSeq::new(0, 2).collect();
        assert_eq!(seq, [0, 1, 2, 3, 0]);
    }

    #[test]
    fn empty_table_probe_is_vacant_home() {
        let table = SlotTable::new();
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.probe(12345, |_| true), Probe::Vacant(0));
    }

    #[test]
    fn insert_find_remove() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..64 {
            assert!(insert(&mut table, hash, k));
        }
        assert_eq!(table.len(), 64);
        table.check_structure(hash);
        for k in 0..64 {
            assert!(contains(&table, hash, k));
        }
        assert!(!contains(&table, hash, 1000));
        for k in (0..64).step_by(2) {
            assert!(remove(&mut table, hash, k));
            assert!(!remove(&mut table, hash, k));
        }
        assert_eq!(table.len(), 32);
        table.check_structure(hash);
        for k in 0..64 {
            assert_eq!(contains(&table, hash, k), k % 2 == 1);
        }
    }

    #[test]
    fn overwrite_returns_previous_and_bumps_version() {
        let rehash = |p: &[u8]| p[0] as u64;
        let mut table = SlotTable::new();
        table
            .insert(1, |p| p[0] == 1, Box::from([1u8, 10]), rehash)
            .unwrap();
        let before = table.version();
        let previous = table
            .insert(1, |p| p[0] == 1, Box::from([1u8, 20]), rehash)
            .unwrap();
        assert_eq!(previous.as_deref(), Some(&[1u8, 10][..]));
        assert_eq!(table.len(), 1);
        assert_ne!(table.version(), before);
        assert_eq!(table.find(1, |p| p[0] == 1), Some(&[1u8, 20][..]));
    }

    #[test]
    fn growth_keeps_load_at_most_half() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..1000 {
            insert(&mut table, hash, k);
            assert!(table.filled() * 2 <= table.capacity());
        }
        assert_eq!(table.capacity(), 2048);
    }

    #[test]
    fn colliding_keys_reuse_tombstones() {
        let hash = |_: &[u8]| 0;
        let mut table = SlotTable::new();
        for k in [1, 2, 3] {
            assert!(insert(&mut table, hash, k));
        }
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.filled(), 3);

        assert!(remove(&mut table, hash, 2));
        assert_eq!(table.len(), 2);
        assert_eq!(table.filled(), 3);
        assert!(contains(&table, hash, 3));

        assert!(insert(&mut table, hash, 4));
        assert_eq!(table.len(), 3);
        assert_eq!(table.filled(), 3, "tombstone should have been reused");
        table.check_structure(hash);
        for k in [1, 3, 4] {
            assert!(contains(&table, hash, k));
        }
        assert!(!contains(&table, hash, 2));
    }

    #[test]
    fn removing_everything_shrinks_to_one() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..500 {
            insert(&mut table, hash, k);
        }
        for k in 0..500 {
            assert!(remove(&mut table, hash, k));
            table.check_structure(hash);
        }
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.filled(), 0);
    }

    #[test]
    fn capacity_exhausted_at_ceiling() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::with_max_len(8);
        for k in 0..7 {
            assert!(insert(&mut table, hash, k));
            table.check_structure(hash);
        }
        assert_eq!(table.capacity(), 8);
        let packed = pack(7);
        let h = hash(&packed);
        assert_eq!(
            table.insert(h, |p| p == &*pack(7), packed, hash),
            Err(CompactError::CapacityExhausted)
        );
        assert_eq!(table.len(), 7);

        // Overwriting an existing key is still allowed.
        let packed = pack(3);
        let h = hash(&packed);
        assert!(
            table
                .insert(h, |p| p == &*pack(3), packed, hash)
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn tombstones_are_purged_at_the_ceiling() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::with_max_len(8);
        let mut live: alloc::vec::Vec<u64> = (0..7).collect();
        for &k in &live {
            insert(&mut table, hash, k);
        }
        for round in 0..50 {
            let oldest = live.remove(0);
            assert!(remove(&mut table, hash, oldest));
            assert!(insert(&mut table, hash, 1000 + round));
            live.push(1000 + round);
            table.check_structure(hash);
            assert_eq!(table.capacity(), 8);
            assert_eq!(table.filled(), 7);
        }
        for k in live {
            assert!(contains(&table, hash, k));
        }
    }

    #[test]
    fn with_capacity_and_reserve() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let table = SlotTable::with_capacity(100);
        assert_eq!(table.capacity(), 256);

        let mut table = SlotTable::new();
        insert(&mut table, hash, 1);
        table.reserve(1000, hash);
        assert_eq!(table.capacity(), 2048);
        let capacity = table.capacity();
        for k in 2..=1001 {
            insert(&mut table, hash, k);
        }
        assert_eq!(table.capacity(), capacity);
        table.check_structure(hash);
    }

    #[test]
    fn shrink_to_fit_drops_tombstones() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..100 {
            insert(&mut table, hash, k);
        }
        table.retain(|p| p[0] % 4 == 0, hash);
        assert_eq!(table.len(), 25);
        table.shrink_to_fit(hash);
        assert_eq!(table.capacity(), 64);
        assert_eq!(table.filled(), 25);
        table.check_structure(hash);
    }

    #[test]
    fn payloads_visit_each_entry_once() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..300 {
            insert(&mut table, hash, k);
        }
        for k in 0..100 {
            remove(&mut table, hash, k * 3);
        }
        let payloads = table.payloads();
        assert_eq!(payloads.len(), 200);
        let seen: BTreeSet<alloc::vec::Vec<u8>> = payloads.map(|p| p.to_vec()).collect();
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn cursor_remove_does_not_shrink() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..200 {
            insert(&mut table, hash, k);
        }
        let capacity = table.capacity();
        let mut cursor = RawCursor::new(&table);
        let mut visited = 0;
        while cursor.next(&table).unwrap().is_some() {
            cursor.remove(&mut table).unwrap();
            visited += 1;
        }
        assert_eq!(visited, 200);
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        table.check_structure(hash);
    }

    #[test]
    fn cursor_detects_outside_changes() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..10 {
            insert(&mut table, hash, k);
        }
        let mut cursor = RawCursor::new(&table);
        assert!(cursor.has_next(&table).unwrap());
        cursor.next(&table).unwrap();
        insert(&mut table, hash, 99);
        assert_eq!(
            cursor.has_next(&table),
            Err(CompactError::ConcurrentModification)
        );
        assert_eq!(
            cursor.next(&table),
            Err(CompactError::ConcurrentModification)
        );
    }

    #[test]
    fn cursor_requires_a_current_entry() {
        let rehash = |p: &[u8]| p[0] as u64;
        let mut table = SlotTable::new();
        table.insert(5, |p| p[0] == 5, Box::from([5u8]), rehash).unwrap();
        let mut cursor = RawCursor::new(&table);
        assert_eq!(
            cursor.remove(&mut table),
            Err(CompactError::NoCurrentEntry)
        );
        assert!(cursor.next(&table).unwrap().is_some());
        assert!(cursor.remove(&mut table).is_ok());
        assert_eq!(
            cursor.remove(&mut table),
            Err(CompactError::NoCurrentEntry)
        );
        assert_eq!(cursor.next(&table), Ok(None));
    }

    #[test]
    fn cursor_replace_keeps_snapshot() {
        let rehash = |p: &[u8]| p[0] as u64;
        let mut table = SlotTable::new();
        for k in 0..4u8 {
            table
                .insert(k as u64, |p| p[0] == k, Box::from([k, 0]), rehash)
                .unwrap();
        }
        let mut cursor = RawCursor::new(&table);
        while let Some(index) = cursor.next(&table).unwrap() {
            let key = table.get_at(index).unwrap()[0];
            let previous = cursor.replace(&mut table, Box::from([key, 1])).unwrap();
            assert_eq!(&*previous, &[key, 0]);
        }
        assert!(table.payloads().all(|p| p[1] == 1));
        table.check_structure(rehash);
    }

    #[test]
    fn histogram_counts_every_entry() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..1000 {
            insert(&mut table, hash, k);
        }
        let histogram = table.probe_histogram(hash);
        assert_eq!(histogram.total(), 1000);
        assert!(histogram.counts[0] > 0);
    }

    #[test]
    fn debug_stats_track_tombstones() {
        let state = HashState::default();
        let hash = |p: &[u8]| state.hash(p);
        let mut table = SlotTable::new();
        for k in 0..40 {
            insert(&mut table, hash, k);
        }
        for k in 0..10 {
            remove(&mut table, hash, k);
        }
        let stats = table.debug_stats();
        assert_eq!(stats.populated, 30);
        assert_eq!(stats.tombstones, 10);
        assert_eq!(stats.filled, 40);
        assert_eq!(stats.payload_bytes, 30 * 8);
        #[cfg(feature = "std")]
        stats.print();
    }
}
