#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A hash map storing each entry as a single packed byte sequence.
///
/// This module provides `CompactHashMap`, which wraps a `SlotTable` and
/// delegates all encoding of keys and values to a `MapTranslator`.
pub mod compact_map;

/// A hash set storing each element as a single packed byte sequence.
pub mod compact_set;

/// The error type shared by the containers and their cursors.
pub mod error;

/// The open-addressing engine shared by both containers.
pub mod slot_table;

/// The encoding contracts between the containers and user types, and two
/// ready-made UTF-8 translators.
pub mod translator;

mod compact_map_proptest;

pub use compact_map::CompactHashMap;
pub use compact_map::Cursor;
pub use compact_set::CompactHashSet;
pub use compact_set::SetCursor;
pub use error::CompactError;
pub use slot_table::MAX_LEN;
pub use slot_table::SlotTable;
pub use translator::MapTranslator;
pub use translator::SetTranslator;
pub use translator::Utf8I32Translator;
pub use translator::Utf8Translator;

#[cfg(any(feature = "foldhash", feature = "std"))]
pub use translator::DefaultHashBuilder;
