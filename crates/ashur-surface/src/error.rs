use std::fmt;

/// A caller-contract violation (e.g. attaching a second root drawable, or
/// invoking an operation that requires a live context while none is held).
///
/// This error is fatal to the call and signals a bug in the caller; it is
/// never retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionError {
    pub message: String,
}

impl PreconditionError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precondition violated: {}", self.message)
    }
}

impl std::error::Error for PreconditionError {}
