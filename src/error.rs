//! Error types
//!
//! Construction and navigation failures are `DtmError`; path compilation and
//! evaluation failures are `PathError`. Exhaustion is never an error - axes and
//! builders signal it with `None`.

use thiserror::Error;

/// Failure while building or navigating a DTM
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DtmError {
    /// The XML text is not well-formed (strict mode) or cannot be scanned at all
    #[error("malformed source at byte {position}: {message}")]
    Malformed { position: usize, message: String },

    /// The source tree contradicts itself (e.g. a parent pointer cycle)
    #[error("inconsistent source tree: {0}")]
    InconsistentSource(String),

    /// The document needs more identities than a handle can address
    #[error("document exceeds {limit} nodes")]
    CapacityExceeded { limit: usize },

    /// Element nesting is deeper than the configured limit
    #[error("nesting depth exceeds {0}")]
    DepthLimit(u16),

    /// A handle from a different DTM was passed in
    #[error("handle {0:#010x} does not belong to this document")]
    ForeignHandle(u32),

    /// The operation exists on the interface but this model does not provide it
    #[error("{0} is not supported by a read-only DTM")]
    Unsupported(&'static str),
}

impl DtmError {
    pub(crate) fn malformed(position: usize, message: impl Into<String>) -> Self {
        DtmError::Malformed {
            position,
            message: message.into(),
        }
    }
}

/// Failure while compiling or evaluating a location path
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    /// The opcode stream names a step type that has no axis
    #[error("unknown step type {0}")]
    UnknownStepType(u32),

    /// A location path needs at least one step
    #[error("location path has no steps")]
    EmptyPath,

    /// Building more of the document failed mid-evaluation
    #[error(transparent)]
    Dtm(#[from] DtmError),

    /// A predicate evaluator reported a failure
    #[error("predicate {index} failed: {message}")]
    Predicate { index: usize, message: String },

    /// A predicate produced a value it cannot be used as
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A `$name` reference with no binding in any pushed scope
    #[error("unbound variable ${0}")]
    UnboundVariable(String),

    /// An earlier error poisoned this evaluation
    #[error("evaluation aborted by an earlier error")]
    Aborted,
}
