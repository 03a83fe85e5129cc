//! Ownership views over handles.
//!
//! - [`NotNull<T>`]: the handle was checked once and is known non-null
//! - [`TmpRef<T>`]: the handle owns a reference and releases it on drop
//!
//! Neither adds state; both are `#[repr(transparent)]` over the handle.

use crate::error::{Error, Result};
use libpy_host::RawObject;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::Deref;

/// Common surface of [`Object`](crate::Object), [`Tuple`](crate::Tuple)
/// and [`List`](crate::List).
pub trait Handle: Clone {
    /// The wrapped pointer.
    fn as_ptr(&self) -> *mut RawObject;

    /// Releases one reference, nulling the handle at count zero.
    ///
    /// # Safety
    ///
    /// The caller must own the reference being released.
    unsafe fn decref(&mut self);
}

/// A handle proven non-null at construction.
///
/// The proof is not re-checked; the view aliases the handle it came from.
#[repr(transparent)]
#[derive(Clone)]
pub struct NotNull<T: Handle> {
    inner: T,
}

impl<T: Handle> NotNull<T> {
    /// Checks `handle` and wraps it.
    ///
    /// # Errors
    ///
    /// [`Error::BadNonnull`] when the handle is null. The runtime's error
    /// indicator is not touched.
    pub fn new(handle: T) -> Result<Self> {
        if handle.as_ptr().is_null() {
            return Err(Error::BadNonnull);
        }
        Ok(NotNull { inner: handle })
    }

    /// The underlying handle.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Handle> Deref for NotNull<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Handle + fmt::Display> fmt::Display for NotNull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<T: Handle + fmt::Debug> fmt::Debug for NotNull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NotNull").field(&self.inner).finish()
    }
}

/// An owning handle that releases its reference when dropped.
///
/// Not `Clone`: two owners of one reference would release it twice.
/// Construction is `unsafe` because the view cannot tell an owned reference
/// from a borrowed one.
///
/// # Example
///
/// ```rust
/// use libpy::{Object, lit};
///
/// let s = lit("test");
/// let before = s.refcnt();
/// {
///     // SAFETY: `dir()` returns a new reference.
///     let attrs = unsafe { s.dir().as_tmpref() };
///     assert!(attrs.len() > 0);
///     assert_eq!(s.refcnt(), before);
/// } // `attrs` released here
/// ```
#[repr(transparent)]
pub struct TmpRef<T: Handle> {
    inner: T,
}

impl<T: Handle> TmpRef<T> {
    /// Takes ownership of the reference `handle` holds.
    ///
    /// # Safety
    ///
    /// `handle` must be null or own a reference that nothing else will
    /// release.
    #[must_use]
    pub unsafe fn new(handle: T) -> Self {
        TmpRef { inner: handle }
    }

    /// Gives the reference back without releasing it.
    #[must_use]
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so `inner` is moved out once.
        unsafe { std::ptr::read(&this.inner) }
    }
}

impl<T: Handle + Default> Default for TmpRef<T> {
    fn default() -> Self {
        // SAFETY: the default handle is null and owns nothing.
        unsafe { TmpRef::new(T::default()) }
    }
}

impl<T: Handle> Deref for TmpRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Handle> Drop for TmpRef<T> {
    fn drop(&mut self) {
        // SAFETY: the reference was handed over at construction.
        unsafe { self.inner.decref() };
    }
}

impl<T: Handle + fmt::Display> fmt::Display for TmpRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<T: Handle + fmt::Debug> fmt::Debug for TmpRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TmpRef").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Object;
    use libpy_host::long_from_i64;

    #[test]
    fn test_tmpref_releases_on_drop() {
        let ob = unsafe { Object::from_raw(long_from_i64(77_777)) };
        ob.incref();
        assert_eq!(ob.refcnt(), 2);
        {
            let tmp = unsafe { ob.clone().as_tmpref() };
            assert!(tmp.is(&ob));
        }
        assert_eq!(ob.refcnt(), 1);
        drop(unsafe { ob.as_tmpref() });
    }

    #[test]
    fn test_tmpref_into_inner_keeps_reference() {
        let ob = unsafe { Object::from_raw(long_from_i64(88_888)) };
        let tmp = unsafe { ob.clone().as_tmpref() };
        let mut back = tmp.into_inner();
        assert_eq!(ob.refcnt(), 1);
        unsafe { back.decref() };
        assert!(back.is_null());
    }

    #[test]
    fn test_notnull_rejects_null() {
        assert_eq!(NotNull::new(Object::null()).unwrap_err(), Error::BadNonnull);
        let none = NotNull::new(Object::none()).unwrap();
        assert_eq!(none.to_string(), "None");
        assert!(none.into_inner().is(&Object::none()));
    }

    #[test]
    fn test_default_tmpref_is_null() {
        let tmp: TmpRef<Object> = TmpRef::default();
        assert!(tmp.is_null());
    }
}
