use thiserror::Error;

/// engine error taxonomy
///
/// Out-of-range row access is the only hard failure in the engine. A missing
/// search match is an ordinary `false` return, and a filter rule with a
/// malformed pattern degrades to a never-matching rule at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// a row or selection index outside `[0, row_count())`
    ///
    /// Accessors fail fast instead of clamping; a clamped index would
    /// silently corrupt selection semantics.
    #[error("row index {index} out of range (visible rows: {count})")]
    InvalidIndex { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
