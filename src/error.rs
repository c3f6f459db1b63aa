use std::collections::TryReserveError;
use std::result;
use thiserror::Error;

/// Errors surfaced by the fallible operations of this crate.
///
/// Looking up or removing a key that is not present is never an error; those operations return
/// `None` instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The arena could not reserve memory for a new node. The collection is left exactly as it
    /// was before the call.
    #[error("failed to allocate a tree node: {0}")]
    AllocationFailure(#[from] TryReserveError),
}

pub type Result<T> = result::Result<T, Error>;
