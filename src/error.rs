// Store error taxonomy.
//
// Every store call and every document parse reports one of these. Operations
// return anyhow::Result with a StoreError inside, so callers that need to
// branch on the kind (e.g. NotFound → default) can downcast.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The path does not exist in the site's store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A single store call exceeded its time budget.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// The store could not be read or written.
    #[error("io error: {0}")]
    Io(String),

    /// The bytes were read but are not the document we expected.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The caller passed input a write operation cannot accept.
    #[error("validation error: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(e.to_string()),
            _ => StoreError::Io(e.to_string()),
        }
    }
}

/// True when an anyhow error wraps a `StoreError::Timeout`.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreError>()
        .is_some_and(StoreError::is_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(StoreError::from(io).is_not_found());
    }

    #[test]
    fn timeout_survives_anyhow_wrapping() {
        let err = anyhow::Error::new(StoreError::Timeout {
            op: "readdir",
            after: Duration::from_millis(10),
        })
        .context("listing broadcasts");
        assert!(is_timeout(&err));
    }
}
