//! Failure classification for synthesis requests.
//!
//! Everything here is recoverable at the request boundary: the solver
//! loop answers an empty line and moves on to the next request.

use std::time::Duration;

use bitfold_base::SpannedError;

/// Why a synthesis request produced no program.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The search space within the size budget holds no program
    /// matching every example.
    #[error("no program within the size budget matches the examples")]
    NotFound,

    /// The wall-clock budget ran out mid-search.
    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    /// A program failed to parse.
    #[error("parse error: {0}")]
    Parse(#[from] SpannedError),

    /// A request block was structurally malformed: bad marker, a
    /// truncated block, or an unparsable field line.
    #[error("malformed request block: {0}")]
    Protocol(SpannedError),

    /// The request's fields are inconsistent with each other, e.g.
    /// argument and expectation vectors of different lengths.
    #[error("bad request: {0}")]
    Request(String),
}
