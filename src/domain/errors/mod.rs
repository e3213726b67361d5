// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Configuration value out of range
    InvalidConfig(String),
    /// Segment file name does not carry a valid ordinal
    InvalidOrdinal(String),
    /// Segment ordinals are not a contiguous range from zero
    OrdinalGap { expected: u32, found: u32 },
    /// Same ordinal produced twice
    DuplicateOrdinal(u32),
    /// File state machine moved backwards, skipped a state or left a terminal state
    InvalidTransition { from: String, to: String },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            DomainError::InvalidOrdinal(name) => {
                write!(f, "Not a segment file name: {}", name)
            }
            DomainError::OrdinalGap { expected, found } => write!(
                f,
                "Segment ordinals not contiguous: expected {:04}, found {:04}",
                expected, found
            ),
            DomainError::DuplicateOrdinal(ordinal) => {
                write!(f, "Duplicate segment ordinal {:04}", ordinal)
            }
            DomainError::InvalidTransition { from, to } => {
                write!(f, "Invalid state transition: {} -> {}", from, to)
            }
        }
    }
}

impl std::error::Error for DomainError {}
