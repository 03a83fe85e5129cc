//! List handles.

use crate::error::Result;
use crate::getitem::{AsSsize, GetItem, SetItem};
use crate::object::Object;
use crate::tuple::as_raw_slice;
use crate::typeobj::TypeObject;
use crate::utils::failed_null_check;
use crate::view::{Handle, NotNull, TmpRef};
use libpy_host::list as host;
use libpy_host::typeobj::LIST_TYPE;
use libpy_host::{ErrorKind, RawObject, err_occurred, err_set_string};
use libpy_log::debug;
use std::fmt;
use std::ops::Deref;

/// The `list` type. Calling it builds a list from zero or one iterable.
pub static TYPE: TypeObject<List> = TypeObject::from_static(&LIST_TYPE);

/// A possibly-null handle known to refer to a `list`.
///
/// Same construction contract as [`Tuple`](crate::Tuple). Item storage is
/// allocated separately and may be absent for an empty list.
#[repr(transparent)]
#[derive(Clone, Default)]
pub struct List {
    ob: Object,
}

impl List {
    /// Allocates a list of `len` null slots. Owning.
    #[must_use]
    pub fn new(len: impl AsSsize) -> Self {
        // SAFETY: a fresh list or null.
        unsafe { List::from_raw(host::list_new(len.as_ssize())) }
    }

    /// A list holding a new reference to each of `items`. Owning.
    ///
    /// Returns null with an error pending if any item is null.
    #[must_use]
    pub fn pack(items: &[Object]) -> Self {
        if items.iter().any(Object::is_null) {
            failed_null_check();
            return List::default();
        }
        // SAFETY: every item is live.
        unsafe { List::from_raw(host::list_pack(as_raw_slice(items))) }
    }

    /// Wraps a raw pointer, checking its kind.
    ///
    /// # Safety
    ///
    /// Same contract as [`Object::from_raw`].
    #[must_use]
    pub unsafe fn from_raw(ob: *mut RawObject) -> Self {
        // SAFETY: forwarded contract.
        List::from(unsafe { Object::from_raw(ob) })
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
        unsafe { host::list_size_unchecked(self.ob.as_ptr()) }
    }

    /// True when the list has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The items in place, as borrowed handles.
    ///
    /// Empty for a null handle and for a list without storage. Growing the
    /// list through another handle invalidates the slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Object] {
        if self.ob.is_null() {
            return &[];
        }
        // SAFETY: live, kind-checked list.
        let items = unsafe { host::list_items(self.ob.as_ptr()) };
        if items.is_null() {
            return &[];
        }
        // SAFETY: `size` initialized slots; `Object` has the layout of the
        // pointers stored there.
        unsafe {
            std::slice::from_raw_parts(
                items.cast::<Object>(),
                host::list_size_unchecked(self.ob.as_ptr()) as usize,
            )
        }
    }

    /// Iterates over the items in place.
    pub fn iter(&self) -> std::slice::Iter<'_, Object> {
        self.as_slice().iter()
    }

    /// Bounds-checked positional access. See [`Tuple::item`](crate::Tuple::item).
    #[must_use]
    pub fn item(&self, index: impl AsSsize) -> GetItem<'_, List> {
        let index = index.as_ssize();
        if self.ob.is_null() {
            failed_null_check();
            return GetItem::new(self, index, Object::null());
        }
        match self.as_slice().get(usize::try_from(index).unwrap_or(usize::MAX)) {
            Some(item) => GetItem::new(self, index, item.clone()),
            None => {
                if err_occurred().is_none() {
                    err_set_string(ErrorKind::IndexError, "list index out of range");
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
    pub unsafe fn item_unchecked(&self, index: impl AsSsize) -> GetItem<'_, List> {
        let index = index.as_ssize();
        if self.ob.is_null() {
            failed_null_check();
            return GetItem::new(self, index, Object::null());
        }
        // SAFETY: caller guarantees the bound, so storage exists.
        let item = unsafe { &*host::list_items(self.ob.as_ptr()).offset(index).cast::<Object>() };
        GetItem::new(self, index, item.clone())
    }

    /// Appends a new reference to `item`. Returns `0`, or `-1` with an
    /// error pending.
    pub fn append(&mut self, item: &Object) -> i32 {
        // SAFETY: handles are null or live.
        unsafe { host::list_append(self.ob.as_ptr(), item.as_ptr()) }
    }

    /// A view proving the handle is non-null.
    ///
    /// # Errors
    ///
    /// [`Error::BadNonnull`](crate::Error::BadNonnull) for a null handle.
    pub fn as_nonnull(&self) -> Result<NotNull<List>> {
        NotNull::new(self.clone())
    }

    /// Hands the reference to a [`TmpRef`] that releases it when dropped.
    ///
    /// # Safety
    ///
    /// See [`Object::as_tmpref`].
    #[must_use]
    pub unsafe fn as_tmpref(self) -> TmpRef<List> {
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
    pub fn take(&mut self) -> List {
        List { ob: self.ob.take() }
    }
}

impl From<Object> for List {
    /// Kind-checks `ob`. A non-list becomes null and raises `TypeError`
    /// unless an error is already pending.
    fn from(ob: Object) -> Self {
        // SAFETY: handles are null or live.
        if ob.is_nonnull() && !unsafe { host::list_check(ob.as_ptr()) } {
            debug!("rejecting {:p} as a list", ob.as_ptr());
            if err_occurred().is_none() {
                err_set_string(ErrorKind::TypeError, "cannot make List from non list");
            }
            return List::default();
        }
        List { ob }
    }
}

impl Deref for List {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.ob
    }
}

impl Handle for List {
    fn as_ptr(&self) -> *mut RawObject {
        self.ob.as_ptr()
    }

    unsafe fn decref(&mut self) {
        // SAFETY: forwarded contract.
        unsafe { self.ob.decref() };
    }
}

impl SetItem for List {
    fn set_item(&self, index: isize, value: &Object) -> i32 {
        value.incref();
        // SAFETY: handles are null or live; the reference is stolen.
        unsafe { host::list_set_item(self.ob.as_ptr(), index, value.as_ptr()) }
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Object;
    type IntoIter = std::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ob, f)
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("List").field(&self.ob).finish()
    }
}
