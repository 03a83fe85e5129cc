//! The per-thread pending error indicator.
//!
//! Every fallible entry point of the runtime reports failure the same way:
//! it stores a [`PendingError`] in the calling thread's indicator and returns
//! a sentinel (a null object pointer, `-1`, or `false`). Callers propagate
//! by returning their own sentinel without touching the indicator.
//!
//! Raising overwrites whatever is pending. Layers that want
//! first-error-wins semantics check [`err_occurred`] before raising.

use std::cell::RefCell;
use std::fmt;

/// Exception kinds the runtime can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation applied to an object of the wrong kind.
    TypeError,
    /// Attribute lookup or deletion failed.
    AttributeError,
    /// Sequence index out of range.
    IndexError,
    /// Internal consistency check failed.
    AssertionError,
    /// Numeric value outside the representable range.
    OverflowError,
    /// Right kind, unacceptable value.
    ValueError,
    /// Misuse of an internal entry point.
    SystemError,
    /// Mapping key not present.
    KeyError,
    /// Allocation failed.
    MemoryError,
}

impl ErrorKind {
    /// Returns the name of the exception kind as the runtime spells it.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::AssertionError => "AssertionError",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::SystemError => "SystemError",
            ErrorKind::KeyError => "KeyError",
            ErrorKind::MemoryError => "MemoryError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raised error waiting to be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingError {
    /// The exception kind.
    pub kind: ErrorKind,
    /// The message passed when the error was raised.
    pub message: String,
}

impl PendingError {
    /// Creates a pending error value without raising it.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        PendingError {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PendingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for PendingError {}

thread_local! {
    static INDICATOR: RefCell<Option<PendingError>> = const { RefCell::new(None) };
}

/// Returns the kind of the pending error, if any.
pub fn err_occurred() -> Option<ErrorKind> {
    INDICATOR.with(|slot| slot.borrow().as_ref().map(|err| err.kind))
}

/// Checks whether the pending error is of the given kind.
pub fn err_matches(kind: ErrorKind) -> bool {
    err_occurred() == Some(kind)
}

/// Raises `kind` with `message`, replacing any pending error.
pub fn err_set_string(kind: ErrorKind, message: impl Into<String>) {
    let err = PendingError::new(kind, message);
    libpy_log::trace!("raise {err}");
    INDICATOR.with(|slot| *slot.borrow_mut() = Some(err));
}

/// Clears the pending error.
pub fn err_clear() {
    INDICATOR.with(|slot| *slot.borrow_mut() = None);
}

/// Takes the pending error, leaving the indicator clear.
pub fn err_fetch() -> Option<PendingError> {
    INDICATOR.with(|slot| slot.borrow_mut().take())
}

/// Puts a previously fetched error back into the indicator.
pub fn err_restore(err: PendingError) {
    INDICATOR.with(|slot| *slot.borrow_mut() = Some(err));
}

// Sentinel helpers for entry points. Each one raises and returns the
// sentinel its caller hands back.

pub(crate) fn raise_null<T>(kind: ErrorKind, message: impl Into<String>) -> *mut T {
    err_set_string(kind, message);
    std::ptr::null_mut()
}

pub(crate) fn raise_neg(kind: ErrorKind, message: impl Into<String>) -> isize {
    err_set_string(kind, message);
    -1
}

pub(crate) fn raise_int(kind: ErrorKind, message: impl Into<String>) -> i32 {
    err_set_string(kind, message);
    -1
}

pub(crate) fn bad_internal_call(entry: &str) -> isize {
    raise_neg(
        ErrorKind::SystemError,
        format!("bad argument to internal function {entry}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_starts_clear() {
        err_clear();
        assert_eq!(err_occurred(), None);
        assert!(err_fetch().is_none());
    }

    #[test]
    fn test_set_fetch_clear() {
        err_set_string(ErrorKind::TypeError, "bad operand");
        assert_eq!(err_occurred(), Some(ErrorKind::TypeError));
        assert!(err_matches(ErrorKind::TypeError));
        assert!(!err_matches(ErrorKind::IndexError));

        let err = err_fetch().unwrap();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "bad operand");
        assert_eq!(err_occurred(), None);

        err_restore(err);
        assert!(err_matches(ErrorKind::TypeError));
        err_clear();
        assert_eq!(err_occurred(), None);
    }

    #[test]
    fn test_raise_overwrites() {
        err_set_string(ErrorKind::ValueError, "first");
        err_set_string(ErrorKind::KeyError, "second");
        assert_eq!(err_fetch().unwrap().message, "second");
    }

    #[test]
    fn test_indicator_is_per_thread() {
        err_set_string(ErrorKind::IndexError, "here");
        let other = std::thread::spawn(err_occurred).join().unwrap();
        assert_eq!(other, None);
        assert!(err_matches(ErrorKind::IndexError));
        err_clear();
    }

    #[test]
    fn test_display() {
        let err = PendingError::new(ErrorKind::AttributeError, "no attribute 'x'");
        assert_eq!(err.to_string(), "AttributeError: no attribute 'x'");
        assert_eq!(
            PendingError::new(ErrorKind::AssertionError, "").to_string(),
            "AssertionError"
        );
    }

    #[test]
    fn test_sentinel_helpers() {
        let p: *mut u8 = raise_null(ErrorKind::MemoryError, "");
        assert!(p.is_null());
        assert_eq!(raise_neg(ErrorKind::OverflowError, "big"), -1);
        assert_eq!(raise_int(ErrorKind::TypeError, "t"), -1);
        assert_eq!(bad_internal_call("tuple_size"), -1);
        assert!(err_matches(ErrorKind::SystemError));
        err_clear();
    }
}
