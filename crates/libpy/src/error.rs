//! Error types for the handle layer.
//!
//! Most failures travel through the runtime's own pending-error indicator;
//! handles come back null and the caller propagates. [`Error`] covers the
//! conditions the runtime has no vocabulary for, and lets wrapped native
//! functions use `?` before translating back at the call boundary.

use libpy_host::{ErrorKind, PendingError, err_fetch, err_occurred, err_restore, err_set_string};
use std::fmt;

/// Errors raised locally by the handle layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A non-null view was requested for a null handle.
    BadNonnull,

    /// An error taken off the runtime's indicator.
    Pending(PendingError),

    /// A runtime call returned null without flagging an error.
    NullWithoutError,
}

impl Error {
    /// Takes the pending runtime error, if any.
    ///
    /// Used after a call came back null; when the runtime did not flag
    /// anything the result is [`Error::NullWithoutError`].
    #[must_use]
    pub fn fetch() -> Self {
        match err_fetch() {
            Some(err) => Error::Pending(err),
            None => Error::NullWithoutError,
        }
    }

    /// Puts the error back on the runtime's indicator.
    ///
    /// First error wins: if something is already pending, this error is
    /// dropped.
    pub fn restore(self) {
        if err_occurred().is_some() {
            return;
        }
        match self {
            Error::Pending(err) => err_restore(err),
            Error::BadNonnull => err_set_string(ErrorKind::AssertionError, "bad nonnull"),
            Error::NullWithoutError => err_set_string(
                ErrorKind::SystemError,
                "error return without exception set",
            ),
        }
    }

    /// Kind of the runtime error this maps to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadNonnull => ErrorKind::AssertionError,
            Error::Pending(err) => err.kind,
            Error::NullWithoutError => ErrorKind::SystemError,
        }
    }
}

impl From<PendingError> for Error {
    fn from(err: PendingError) -> Self {
        Error::Pending(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadNonnull => write!(f, "Non-null view of a null handle"),
            Error::Pending(err) => write!(f, "{err}"),
            Error::NullWithoutError => write!(f, "Null result without a pending error"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for handle operations.
pub type Result<T> = std::result::Result<T, Error>;
