//! Lists with separately allocated item storage.
//!
//! The storage is the raw parts of a `Vec<*mut RawObject>`: `items` with
//! capacity `allocated`, of which the first `size` slots are in use. An
//! empty list created with size zero has no storage at all, so `items` is
//! null.

use crate::argparse::parse_tuple;
use crate::error::{ErrorKind, bad_internal_call, err_set_string, raise_int, raise_null};
use crate::method::{CallConv, MethodDef};
use crate::object::{RawObject, VarObject, free, incref, into_raw, kind_of, xdecref};
use crate::protocol::{CompareOp, object_rich_compare_bool};
use crate::typeobj::{LIST_TYPE, TypeKind};
use std::mem::ManuallyDrop;
use std::ptr;

/// A list object.
#[repr(C)]
pub struct ListObject {
    var: VarObject,
    items: *mut *mut RawObject,
    allocated: usize,
}

impl ListObject {
    /// Reassembles the storage as a `Vec`. The caller must hand it back
    /// through [`ListObject::store`] or drop it deliberately.
    unsafe fn take_storage(&mut self) -> Vec<*mut RawObject> {
        if self.items.is_null() {
            return Vec::new();
        }
        let len = self.var.size as usize;
        // SAFETY: `items`/`allocated` are the raw parts of a Vec whose first
        // `size` slots are initialized.
        let v = unsafe { Vec::from_raw_parts(self.items, len, self.allocated) };
        self.items = ptr::null_mut();
        self.allocated = 0;
        self.var.size = 0;
        v
    }

    fn store(&mut self, v: Vec<*mut RawObject>) {
        let mut v = ManuallyDrop::new(v);
        self.var.size = v.len() as isize;
        self.allocated = v.capacity();
        self.items = if v.capacity() == 0 {
            ptr::null_mut()
        } else {
            v.as_mut_ptr()
        };
    }
}

/// Allocates a list of `size` null slots. Returns a new reference.
pub fn list_new(size: isize) -> *mut RawObject {
    let Ok(len) = usize::try_from(size) else {
        return raise_null(ErrorKind::SystemError, "negative size passed to list_new");
    };
    let mut list = Box::new(ListObject {
        var: VarObject {
            base: RawObject::new(&LIST_TYPE),
            size: 0,
        },
        items: ptr::null_mut(),
        allocated: 0,
    });
    list.store(vec![ptr::null_mut(); len]);
    into_raw(list)
}

/// Checks whether `ob` is a list.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn list_check(ob: *mut RawObject) -> bool {
    // SAFETY: non-null checked first.
    !ob.is_null() && unsafe { kind_of(ob) } == TypeKind::List
}

/// Pointer to the item storage; null when the list owns no storage.
///
/// # Safety
///
/// `ob` must be a live list. The pointer is invalidated by any call that
/// grows the list.
pub unsafe fn list_items(ob: *mut RawObject) -> *mut *mut RawObject {
    // SAFETY: caller guarantees `ob` is a list.
    unsafe { (*ob.cast::<ListObject>()).items }
}

/// Number of items, without a kind check.
///
/// # Safety
///
/// `ob` must be a live list.
pub unsafe fn list_size_unchecked(ob: *mut RawObject) -> isize {
    // SAFETY: caller guarantees `ob` is a list.
    unsafe { (*ob.cast::<VarObject>()).size }
}

/// Number of items.
///
/// Returns `-1` with `SystemError` if `ob` is not a list.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn list_size(ob: *mut RawObject) -> isize {
    // SAFETY: forwarded contract.
    unsafe {
        if !list_check(ob) {
            return bad_internal_call("list_size");
        }
        list_size_unchecked(ob)
    }
}

/// Borrowed item at `index`.
///
/// Returns null with `IndexError` when out of range.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn list_get_item(ob: *mut RawObject, index: isize) -> *mut RawObject {
    // SAFETY: forwarded contract, bounds checked before the read.
    unsafe {
        if !list_check(ob) {
            bad_internal_call("list_get_item");
            return ptr::null_mut();
        }
        if index < 0 || index >= list_size_unchecked(ob) {
            err_set_string(ErrorKind::IndexError, "list index out of range");
            return ptr::null_mut();
        }
        *list_items(ob).offset(index)
    }
}

/// Stores `item` at `index`, stealing the reference and releasing the
/// previous occupant. The stolen reference is released on failure too.
///
/// # Safety
///
/// `ob` must be null or point to a live object; `item` must be null or a
/// reference the caller owns.
pub unsafe fn list_set_item(ob: *mut RawObject, index: isize, item: *mut RawObject) -> i32 {
    // SAFETY: forwarded contract, bounds checked before the write.
    unsafe {
        if !list_check(ob) {
            xdecref(item);
            bad_internal_call("list_set_item");
            return -1;
        }
        if index < 0 || index >= list_size_unchecked(ob) {
            xdecref(item);
            return raise_int(ErrorKind::IndexError, "list assignment index out of range");
        }
        let old = list_items(ob).offset(index).replace(item);
        xdecref(old);
    }
    0
}

/// Appends a new reference to `item`. Returns `0`, or `-1` with an error.
///
/// # Safety
///
/// `ob` must be null or point to a live object; `item` must be live.
pub unsafe fn list_append(ob: *mut RawObject, item: *mut RawObject) -> i32 {
    // SAFETY: forwarded contract.
    unsafe {
        if !list_check(ob) || item.is_null() {
            bad_internal_call("list_append");
            return -1;
        }
        incref(item);
        let list = &mut *ob.cast::<ListObject>();
        let mut storage = list.take_storage();
        storage.push(item);
        list.store(storage);
    }
    0
}

/// Creates a list holding a new reference to each of `items`.
///
/// # Safety
///
/// Every element of `items` must point to a live object.
pub unsafe fn list_pack(items: &[*mut RawObject]) -> *mut RawObject {
    let Ok(size) = isize::try_from(items.len()) else {
        return raise_null(ErrorKind::OverflowError, "too many items to pack");
    };
    let list = list_new(size);
    if list.is_null() {
        return list;
    }
    // SAFETY: fresh list with `items.len()` slots; items are live.
    unsafe {
        let slots = list_items(list);
        for (i, &item) in items.iter().enumerate() {
            incref(item);
            slots.add(i).write(item);
        }
    }
    list
}

pub(crate) unsafe fn dealloc(ob: *mut RawObject) {
    // SAFETY: `ob` is a dying list allocated by `list_new`.
    unsafe {
        let storage = (*ob.cast::<ListObject>()).take_storage();
        free::<ListObject>(ob);
        for item in storage {
            xdecref(item);
        }
    }
}

unsafe extern "C" fn list_append_method(slf: *mut RawObject, args: *mut RawObject) -> *mut RawObject {
    let mut item: *mut RawObject = ptr::null_mut();
    // SAFETY: `item` is the slot for the single 'O' tag; `slf` is the list
    // the method was bound to.
    unsafe {
        if !parse_tuple(args, b"O:append\0", &[(&raw mut item).cast()]) {
            return ptr::null_mut();
        }
        if list_append(slf, item) < 0 {
            return ptr::null_mut();
        }
    }
    let none = crate::object::none();
    // SAFETY: `None` is static.
    unsafe { incref(none) };
    none
}

unsafe extern "C" fn list_count_method(slf: *mut RawObject, args: *mut RawObject) -> *mut RawObject {
    let mut needle: *mut RawObject = ptr::null_mut();
    // SAFETY: as in `list_append_method`.
    unsafe {
        if !parse_tuple(args, b"O:count\0", &[(&raw mut needle).cast()]) {
            return ptr::null_mut();
        }
        if !list_check(slf) {
            return raise_null(ErrorKind::TypeError, "descriptor 'count' requires a 'list' object");
        }
        let mut count = 0i64;
        let mut i = 0;
        while i < list_size_unchecked(slf) {
            let item = *list_items(slf).offset(i);
            if !item.is_null() {
                match object_rich_compare_bool(item, needle, CompareOp::Eq) {
                    1 => count += 1,
                    0 => {}
                    _ => return ptr::null_mut(),
                }
            }
            i += 1;
        }
        crate::number::long_from_i64(count)
    }
}

pub(crate) static LIST_METHODS: [MethodDef; 2] = [
    MethodDef::new(
        "append",
        list_append_method,
        CallConv::VarArgs,
        Some("Append object to the end of the list."),
    ),
    MethodDef::new(
        "count",
        list_count_method,
        CallConv::VarArgs,
        Some("Return number of occurrences of value."),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::err_fetch;
    use crate::number::{long_as_i64, long_from_i64};
    use crate::object::{decref, refcnt};
    use crate::tuple::tuple_pack;

    #[test]
    fn test_empty_list_has_no_storage() {
        let l = list_new(0);
        unsafe {
            assert!(list_check(l));
            assert_eq!(list_size(l), 0);
            assert!(list_items(l).is_null());
            decref(l);
        }
    }

    #[test]
    fn test_append_grows_storage() {
        let l = list_new(0);
        let v = long_from_i64(5000);
        unsafe {
            for _ in 0..10 {
                assert_eq!(list_append(l, v), 0);
            }
            assert_eq!(list_size(l), 10);
            assert!(!list_items(l).is_null());
            assert_eq!(refcnt(v), 11);
            assert_eq!(list_get_item(l, 9), v);
            decref(l);
            assert_eq!(refcnt(v), 1);
            decref(v);
        }
    }

    #[test]
    fn test_set_item_replaces() {
        let a = long_from_i64(1);
        let b = long_from_i64(2);
        unsafe {
            let l = list_pack(&[a]);
            assert_eq!(refcnt(a), 2);
            incref(b);
            assert_eq!(list_set_item(l, 0, b), 0);
            assert_eq!(refcnt(a), 1);
            assert_eq!(long_as_i64(list_get_item(l, 0)), 2);

            assert_eq!(list_set_item(l, 1, ptr::null_mut()), -1);
            assert_eq!(err_fetch().unwrap().message, "list assignment index out of range");

            decref(l);
            decref(a);
            decref(b);
        }
    }

    #[test]
    fn test_builtin_methods() {
        let l = list_new(0);
        let one = long_from_i64(1);
        unsafe {
            let args = tuple_pack(&[one]);
            for _ in 0..2 {
                let r = list_append_method(l, args);
                assert!(crate::object::is_none(r));
            }
            let n = list_count_method(l, args);
            assert_eq!(long_as_i64(n), 2);
            decref(n);
            decref(args);
            decref(l);
            decref(one);
        }
    }
}
