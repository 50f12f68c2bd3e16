//! Error types shared by the loader, the clock and the scheduling engine.
//!
//! Load errors are recoverable per record; engine errors are fatal to the
//! tick that raised them.

use std::io;

/// Errors raised by the virtual clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The minute counter cannot advance any further.
    #[error("clock overflow: cannot advance beyond minute {0}")]
    Overflow(u64),
}

/// Errors raised while reading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The scenario file could not be read.
    #[error("cannot read scenario: {0}")]
    Io(#[from] io::Error),

    /// The scenario file is not valid JSON or lacks the top-level arrays.
    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),

    /// A single flight or runway record was rejected; the rest still load.
    #[error("invalid {section} record #{index}: {reason}")]
    InvalidRecord {
        /// `"flight"` or `"runway"`.
        section: &'static str,
        /// Zero-based position of the record in its array.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors that abort a tick.
///
/// None of these are reachable when the tick pipeline runs in its fixed
/// order; seeing one means registry and pool disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// A previous tick panicked while holding the shared engine.
    #[error("engine lock poisoned")]
    Poisoned,
}

impl EngineError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        EngineError::InvariantViolation(msg.into())
    }
}
