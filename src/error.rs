//! Error kinds surfaced by the map and its host callbacks.

use thiserror::Error;

/// Errors raised by map operations.
///
/// Allocation failure is not represented: it aborts the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A mutation was attempted on a frozen object (`"hash"`, `"string"`).
    /// State is unchanged.
    #[error("can't modify frozen {0}")]
    Frozen(&'static str),
    /// A value of the wrong type was supplied (e.g. copy between classes).
    #[error("type error: {0}")]
    Type(String),
    /// Conflicting or malformed arguments.
    #[error("argument error: {0}")]
    Argument(String),
    /// A host callback (object hash, eql, `==`, default proc) raised.
    #[error("{0}")]
    Raised(String),
}

pub type Result<T> = std::result::Result<T, Error>;
