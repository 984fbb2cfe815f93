//! Error types for IR construction and mutation

use thiserror::Error;

/// Errors reported by the IR core.
///
/// All errors are synchronous and fatal to the calling operation; the core
/// never recovers on the caller's behalf. Structural invariants (def-use
/// integrity, name uniqueness) are upheld by construction and are not
/// represented here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IrError {
    #[error("no such {kind}: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{user} does not use {value}")]
    InvalidUse { user: String, value: String },

    #[error("{opcode} expects {expected} operands, got {actual}")]
    Arity {
        opcode: String,
        expected: String,
        actual: usize,
    },

    #[error("operand '{slot}' of {opcode} must have type {expected}, got {actual}")]
    TypeMismatch {
        opcode: String,
        slot: String,
        expected: String,
        actual: String,
    },

    #[error("malformed syntax for {class}: {reason}")]
    Schema { class: String, reason: String },

    #[error("unknown opcode '{opcode}' in scope '{scope}'")]
    UnknownOpcode { opcode: String, scope: String },

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IrError>;
