//! Deferred subscript results.
//!
//! A subscript expression can end up read or assigned to. These proxies
//! capture the container and the key and decide once they are used:
//!
//! - [`GetItem`]: positional access on a [`Tuple`](crate::Tuple) or
//!   [`List`](crate::List). The item is read from storage eagerly and the
//!   proxy derefs to it (borrowed); [`GetItem::set`] replaces the slot.
//! - [`KeyedItem`]: access by an object key on any handle. Nothing is read
//!   until [`KeyedItem::get`]; [`KeyedItem::set`] goes through the runtime's
//!   item assignment.

use crate::object::Object;
use libpy_host::protocol as proto;
use std::fmt;
use std::ops::Deref;

/// Containers whose slots can be replaced by position.
pub trait SetItem {
    /// Stores a new reference to `value` at `index`, releasing the previous
    /// occupant. Returns `0`, or `-1` with an error pending.
    fn set_item(&self, index: isize, value: &Object) -> i32;
}

/// Index types accepted by positional access.
pub trait AsSsize: Copy {
    /// The index as a runtime size. Values past `isize::MAX` saturate, which
    /// is always out of range.
    fn as_ssize(self) -> isize;
}

impl AsSsize for i32 {
    fn as_ssize(self) -> isize {
        self as isize
    }
}

impl AsSsize for isize {
    fn as_ssize(self) -> isize {
        self
    }
}

impl AsSsize for usize {
    fn as_ssize(self) -> isize {
        isize::try_from(self).unwrap_or(isize::MAX)
    }
}

/// Result of positional indexing.
///
/// Derefs to the borrowed item; null when the read failed.
pub struct GetItem<'a, C: SetItem> {
    container: &'a C,
    index: isize,
    value: Object,
}

impl<'a, C: SetItem> GetItem<'a, C> {
    pub(crate) fn new(container: &'a C, index: isize, value: Object) -> Self {
        GetItem {
            container,
            index,
            value,
        }
    }

    /// Position this result refers to.
    #[must_use]
    pub fn index(&self) -> isize {
        self.index
    }

    /// The item read at construction (borrowed).
    #[must_use]
    pub fn get(&self) -> Object {
        self.value.clone()
    }

    /// Replaces the item at this position with a new reference to `value`.
    /// Returns `0`, or `-1` with an error pending.
    pub fn set(self, value: &Object) -> i32 {
        self.container.set_item(self.index, value)
    }
}

impl<C: SetItem> Deref for GetItem<'_, C> {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.value
    }
}

impl<C: SetItem> fmt::Display for GetItem<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// Result of indexing by an object key.
pub struct KeyedItem<'a> {
    container: &'a Object,
    key: &'a Object,
}

impl<'a> KeyedItem<'a> {
    pub(crate) fn new(container: &'a Object, key: &'a Object) -> Self {
        KeyedItem { container, key }
    }

    /// `container[key]`. Returns a new reference, or null with an error
    /// pending.
    #[must_use]
    pub fn get(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe {
            Object::from_raw(proto::object_get_item(
                self.container.as_ptr(),
                self.key.as_ptr(),
            ))
        }
    }

    /// `container[key] = value`. Returns `0`, or `-1` with an error pending.
    pub fn set(self, value: &Object) -> i32 {
        // SAFETY: handles are null or live.
        unsafe {
            proto::object_set_item(self.container.as_ptr(), self.key.as_ptr(), value.as_ptr())
        }
    }
}
