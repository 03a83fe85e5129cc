//! Tuple handles.

use crate::error::Result;
use crate::getitem::{AsSsize, GetItem, SetItem};
use crate::object::Object;
use crate::typeobj::TypeObject;
use crate::utils::failed_null_check;
use crate::view::{Handle, NotNull, TmpRef};
use libpy_host::tuple as host;
use libpy_host::typeobj::TUPLE_TYPE;
use libpy_host::{ErrorKind, RawObject, err_occurred, err_set_string};
use libpy_log::debug;
use std::fmt;
use std::ops::Deref;

/// The `tuple` type. Calling it builds a tuple from zero or one iterable.
pub static TYPE: TypeObject<Tuple> = TypeObject::from_static(&TUPLE_TYPE);

/// A possibly-null handle known to refer to a `tuple`.
///
/// Kind-checked once at construction; a mismatch yields a null handle and
/// a `TypeError` (unless an error was already pending). Derefs to
/// [`Object`] for the generic protocols.
///
/// # Example
///
/// ```rust
/// use libpy::{Tuple, lit};
///
/// let mut t = Tuple::pack(&[lit(0), lit(1), lit(2)]);
/// assert_eq!(t.len(), 3);
/// assert!(t.item(1).is(&lit(1)));
///
/// let values: Vec<String> = t.iter().map(ToString::to_string).collect();
/// assert_eq!(values, ["0", "1", "2"]);
/// // SAFETY: `pack` returned a new reference.
/// unsafe { t.decref() };
/// ```
#[repr(transparent)]
#[derive(Clone, Default)]
pub struct Tuple {
    ob: Object,
}

impl Tuple {
    /// Allocates a tuple of `len` null slots. Owning.
    #[must_use]
    pub fn new(len: impl AsSsize) -> Self {
        // SAFETY: a fresh tuple or null.
        unsafe { Tuple::from_raw(host::tuple_new(len.as_ssize())) }
    }

    /// A tuple holding a new reference to each of `items`. Owning.
    ///
    /// Returns null with an error pending if any item is null.
    #[must_use]
    pub fn pack(items: &[Object]) -> Self {
        if items.iter().any(Object::is_null) {
            failed_null_check();
            return Tuple::default();
        }
        // SAFETY: `Object` is a transparent pointer and every item is live.
        unsafe { Tuple::from_raw(host::tuple_pack(as_raw_slice(items))) }
    }

    /// Wraps a raw pointer, checking its kind.
    ///
    /// # Safety
    ///
    /// Same contract as [`Object::from_raw`].
    #[must_use]
    pub unsafe fn from_raw(ob: *mut RawObject) -> Self {
        // SAFETY: forwarded contract.
        Tuple::from(unsafe { Object::from_raw(ob) })
    }

    /// The generic handle.
    #[must_use]
    pub fn as_object(&self) -> &Object {
        &self.ob
    }

    /// Unwraps into the generic handle.
    #[must_use]
    pub fn into_object(self) -> Object {
        self.ob
    }

    /// Number of items, or `-1` with an error pending for a null handle.
    #[must_use]
    pub fn len(&self) -> isize {
        if self.ob.is_null() {
            failed_null_check();
            return -1;
        }
        // SAFETY: non-null and kind-checked.
        unsafe { host::tuple_size_unchecked(self.ob.as_ptr()) }
    }

    /// True when the tuple has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The items in place, as borrowed handles. Empty for a null handle.
    #[must_use]
    pub fn as_slice(&self) -> &[Object] {
        if self.ob.is_null() {
            return &[];
        }
        // SAFETY: the storage is inline in the live tuple; `Object` has the
        // layout of the pointers stored there.
        unsafe {
            std::slice::from_raw_parts(
                host::tuple_items(self.ob.as_ptr()).cast::<Object>(),
                host::tuple_size_unchecked(self.ob.as_ptr()) as usize,
            )
        }
    }

    /// Iterates over the items in place.
    ///
    /// This is Rust iteration over storage; `self.as_object().iter()` gives
    /// a runtime iterator object instead.
    pub fn iter(&self) -> std::slice::Iter<'_, Object> {
        self.as_slice().iter()
    }

    /// Bounds-checked positional access.
    ///
    /// A null handle reports through [`failed_null_check`]; an index out of
    /// range raises `IndexError` unless an error is already pending. Both
    /// give a proxy over a null item.
    #[must_use]
    pub fn item(&self, index: impl AsSsize) -> GetItem<'_, Tuple> {
        let index = index.as_ssize();
        if self.ob.is_null() {
            failed_null_check();
            return GetItem::new(self, index, Object::null());
        }
        match self.as_slice().get(usize::try_from(index).unwrap_or(usize::MAX)) {
            Some(item) => GetItem::new(self, index, item.clone()),
            None => {
                if err_occurred().is_none() {
                    err_set_string(ErrorKind::IndexError, "tuple index out of range");
                }
                GetItem::new(self, index, Object::null())
            }
        }
    }

    /// Positional access without a bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be in `0..self.len()`.
    #[must_use]
    pub unsafe fn item_unchecked(&self, index: impl AsSsize) -> GetItem<'_, Tuple> {
        let index = index.as_ssize();
        if self.ob.is_null() {
            failed_null_check();
            return GetItem::new(self, index, Object::null());
        }
        // SAFETY: caller guarantees the bound.
        let item = unsafe { &*host::tuple_items(self.ob.as_ptr()).offset(index).cast::<Object>() };
        GetItem::new(self, index, item.clone())
    }

    /// A view proving the handle is non-null.
    ///
    /// # Errors
    ///
    /// [`Error::BadNonnull`](crate::Error::BadNonnull) for a null handle.
    pub fn as_nonnull(&self) -> Result<NotNull<Tuple>> {
        NotNull::new(self.clone())
    }

    /// Hands the reference to a [`TmpRef`] that releases it when dropped.
    ///
    /// # Safety
    ///
    /// See [`Object::as_tmpref`].
    #[must_use]
    pub unsafe fn as_tmpref(self) -> TmpRef<Tuple> {
        // SAFETY: ownership is the caller's contract.
        unsafe { TmpRef::new(self) }
    }

    /// See [`Object::decref`].
    ///
    /// # Safety
    ///
    /// The caller must own the reference being released.
    pub unsafe fn decref(&mut self) -> &mut Self {
        // SAFETY: forwarded contract.
        unsafe { self.ob.decref() };
        self
    }

    /// Moves the pointer out, leaving this handle null.
    #[must_use]
    pub fn take(&mut self) -> Tuple {
        Tuple { ob: self.ob.take() }
    }
}

/// Views handle storage as the raw pointers it holds.
pub(crate) fn as_raw_slice(items: &[Object]) -> &[*mut RawObject] {
    // SAFETY: `Object` is `#[repr(transparent)]` over `*mut RawObject`.
    unsafe { std::slice::from_raw_parts(items.as_ptr().cast(), items.len()) }
}

impl From<Object> for Tuple {
    /// Kind-checks `ob`. A non-tuple becomes null and raises `TypeError`
    /// unless an error is already pending.
    fn from(ob: Object) -> Self {
        // SAFETY: handles are null or live.
        if ob.is_nonnull() && !unsafe { host::tuple_check(ob.as_ptr()) } {
            debug!("rejecting {:p} as a tuple", ob.as_ptr());
            if err_occurred().is_none() {
                err_set_string(ErrorKind::TypeError, "cannot make Tuple from non tuple");
            }
            return Tuple::default();
        }
        Tuple { ob }
    }
}

impl Deref for Tuple {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.ob
    }
}

impl Handle for Tuple {
    fn as_ptr(&self) -> *mut RawObject {
        self.ob.as_ptr()
    }

    unsafe fn decref(&mut self) {
        // SAFETY: forwarded contract.
        unsafe { self.ob.decref() };
    }
}

impl SetItem for Tuple {
    fn set_item(&self, index: isize, value: &Object) -> i32 {
        value.incref();
        // SAFETY: handles are null or live; the reference is stolen.
        unsafe { host::tuple_set_item(self.ob.as_ptr(), index, value.as_ptr()) }
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Object;
    type IntoIter = std::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ob, f)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tuple").field(&self.ob).finish()
    }
}
