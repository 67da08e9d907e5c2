use thiserror::Error;

/// Errors reported by the compact containers and their cursors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactError {
    /// A brand-new key was inserted while the table already held the
    /// largest number of entries it can represent.
    #[error("maximum size reached")]
    CapacityExhausted,
    /// The container was structurally modified after the cursor took its
    /// snapshot, by something other than the cursor itself.
    #[error("container was modified outside of this cursor")]
    ConcurrentModification,
    /// `remove` or `replace_value` was called on a cursor that is not
    /// positioned on a live entry.
    #[error("cursor is not positioned on a live entry")]
    NoCurrentEntry,
}
