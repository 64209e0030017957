//! Error taxonomy shared by the whole crate.

use std::fmt;

/// The four error categories the engine distinguishes, mirroring the
/// C library's `Error_type` split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller (invalid channel number, malformed JSON
    /// handed to `fire_event`, out-of-range parameter value).
    Argument,
    /// The module data itself is inconsistent or violates an invariant
    /// (dangling audio unit reference, cyclic connections, corrupt trigger
    /// argument). Raised only while loading; never while rendering.
    Format,
    /// Allocation failure or a fixed-capacity structure (voice pool, work
    /// buffer arena) was asked to grow past its bound.
    Memory,
    /// A required external resource could not be obtained (unreadable
    /// sample data, missing tuning table). Not used for missing files — the
    /// loader itself is out of scope — but surfaces when the core cannot
    /// make sense of data it was handed.
    Resource,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::Format => "FormatError",
            ErrorKind::Memory => "MemoryError",
            ErrorKind::Resource => "ResourceError",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct KunquatError {
    pub kind: ErrorKind,
    pub message: String,
}

impl KunquatError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Argument, message: message.into() }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: message.into() }
    }

    pub fn memory(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Memory, message: message.into() }
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Resource, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, KunquatError>;
