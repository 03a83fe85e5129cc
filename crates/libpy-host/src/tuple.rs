//! Tuples with inline item storage.
//!
//! A tuple is allocated as one block: the [`VarObject`] header followed
//! directly by `size` item pointers. New tuples start with every slot null;
//! the creator fills them with [`tuple_set_item`] (or by writing through
//! [`tuple_items`]) before handing the tuple out.

use crate::error::{ErrorKind, bad_internal_call, err_set_string, raise_int, raise_null};
use crate::object::{RawObject, VarObject, incref, kind_of, xdecref};
use crate::typeobj::{TUPLE_TYPE, TypeKind};
use std::alloc::{Layout, alloc_zeroed, dealloc as free_block};
use std::ptr;

/// A tuple object. Items follow the struct in the same allocation.
#[repr(C)]
pub struct TupleObject {
    var: VarObject,
    items: [*mut RawObject; 0],
}

fn layout_for(size: usize) -> Option<Layout> {
    let items = Layout::array::<*mut RawObject>(size).ok()?;
    let (layout, _) = Layout::new::<TupleObject>().extend(items).ok()?;
    Some(layout.pad_to_align())
}

/// Allocates a tuple of `size` null slots. Returns a new reference.
///
/// Raises `SystemError` for a negative size and `MemoryError` if the
/// allocation fails.
pub fn tuple_new(size: isize) -> *mut RawObject {
    let Ok(len) = usize::try_from(size) else {
        return raise_null(ErrorKind::SystemError, "negative size passed to tuple_new");
    };
    let Some(layout) = layout_for(len) else {
        return raise_null(ErrorKind::MemoryError, "tuple too large");
    };

    // SAFETY: the layout is non-zero sized (it contains the header).
    let block = unsafe { alloc_zeroed(layout) }.cast::<TupleObject>();
    if block.is_null() {
        return raise_null(ErrorKind::MemoryError, "");
    }

    // SAFETY: `block` is a fresh allocation large enough for the header;
    // the zeroed item slots are valid null pointers.
    unsafe {
        ptr::addr_of_mut!((*block).var).write(VarObject {
            base: RawObject::new(&TUPLE_TYPE),
            size,
        });
    }
    block.cast()
}

/// Checks whether `ob` is a tuple.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn tuple_check(ob: *mut RawObject) -> bool {
    // SAFETY: non-null checked first.
    !ob.is_null() && unsafe { kind_of(ob) } == TypeKind::Tuple
}

/// Pointer to the first item slot. Valid for `size` slots.
///
/// # Safety
///
/// `ob` must be a live tuple.
pub unsafe fn tuple_items(ob: *mut RawObject) -> *mut *mut RawObject {
    // SAFETY: caller guarantees `ob` is a tuple.
    unsafe { ptr::addr_of_mut!((*ob.cast::<TupleObject>()).items).cast() }
}

/// Number of items, without a kind check.
///
/// # Safety
///
/// `ob` must be a live tuple.
pub unsafe fn tuple_size_unchecked(ob: *mut RawObject) -> isize {
    // SAFETY: caller guarantees `ob` is a tuple.
    unsafe { (*ob.cast::<VarObject>()).size }
}

/// Number of items.
///
/// Returns `-1` with `SystemError` if `ob` is not a tuple.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn tuple_size(ob: *mut RawObject) -> isize {
    // SAFETY: forwarded contract.
    unsafe {
        if !tuple_check(ob) {
            return bad_internal_call("tuple_size");
        }
        tuple_size_unchecked(ob)
    }
}

/// Borrowed item at `index`.
///
/// Returns null with `IndexError` when out of range, or `SystemError` if
/// `ob` is not a tuple.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn tuple_get_item(ob: *mut RawObject, index: isize) -> *mut RawObject {
    // SAFETY: forwarded contract, bounds checked before the read.
    unsafe {
        if !tuple_check(ob) {
            bad_internal_call("tuple_get_item");
            return ptr::null_mut();
        }
        if index < 0 || index >= tuple_size_unchecked(ob) {
            err_set_string(ErrorKind::IndexError, "tuple index out of range");
            return ptr::null_mut();
        }
        *tuple_items(ob).offset(index)
    }
}

/// Stores `item` at `index`, stealing the reference and releasing the
/// previous occupant.
///
/// The stolen reference is released even on failure. Returns `0` on
/// success, `-1` with an error set otherwise.
///
/// # Safety
///
/// `ob` must be null or point to a live object; `item` must be null or a
/// reference the caller owns.
pub unsafe fn tuple_set_item(ob: *mut RawObject, index: isize, item: *mut RawObject) -> i32 {
    // SAFETY: forwarded contract, bounds checked before the write.
    unsafe {
        if !tuple_check(ob) {
            xdecref(item);
            bad_internal_call("tuple_set_item");
            return -1;
        }
        if index < 0 || index >= tuple_size_unchecked(ob) {
            xdecref(item);
            return raise_int(ErrorKind::IndexError, "tuple assignment index out of range");
        }
        let slot = tuple_items(ob).offset(index);
        let old = slot.replace(item);
        xdecref(old);
    }
    0
}

/// Creates a tuple holding a new reference to each of `items`.
///
/// # Safety
///
/// Every element of `items` must point to a live object.
pub unsafe fn tuple_pack(items: &[*mut RawObject]) -> *mut RawObject {
    let Ok(size) = isize::try_from(items.len()) else {
        return raise_null(ErrorKind::OverflowError, "too many items to pack");
    };
    let tuple = tuple_new(size);
    if tuple.is_null() {
        return tuple;
    }
    // SAFETY: fresh tuple with `items.len()` slots; items are live.
    unsafe {
        let slots = tuple_items(tuple);
        for (i, &item) in items.iter().enumerate() {
            incref(item);
            slots.add(i).write(item);
        }
    }
    tuple
}

pub(crate) unsafe fn dealloc(ob: *mut RawObject) {
    // SAFETY: `ob` is a dying tuple allocated by `tuple_new`.
    unsafe {
        let size = tuple_size_unchecked(ob);
        let slots = tuple_items(ob);
        for i in 0..size {
            xdecref(*slots.offset(i));
        }
        if let Some(layout) = layout_for(size as usize) {
            free_block(ob.cast(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{err_clear, err_fetch};
    use crate::number::{long_as_i64, long_from_i64};
    use crate::object::{decref, refcnt};

    #[test]
    fn test_new_tuple_has_null_slots() {
        let t = tuple_new(3);
        unsafe {
            assert!(tuple_check(t));
            assert_eq!(tuple_size(t), 3);
            for i in 0..3 {
                assert!(tuple_get_item(t, i).is_null());
            }
            decref(t);
        }
    }

    #[test]
    fn test_empty_tuple() {
        let t = tuple_new(0);
        unsafe {
            assert_eq!(tuple_size(t), 0);
            decref(t);
        }
    }

    #[test]
    fn test_negative_size() {
        assert!(tuple_new(-1).is_null());
        assert_eq!(err_fetch().unwrap().kind, ErrorKind::SystemError);
    }

    #[test]
    fn test_set_item_steals() {
        let t = tuple_new(1);
        let value = long_from_i64(31337);
        unsafe {
            crate::object::incref(value);
            assert_eq!(tuple_set_item(t, 0, value), 0);
            assert_eq!(refcnt(value), 2);
            assert_eq!(tuple_get_item(t, 0), value);

            assert_eq!(tuple_set_item(t, 0, long_from_i64(1)), 0);
            assert_eq!(refcnt(value), 1);
            assert_eq!(long_as_i64(tuple_get_item(t, 0)), 1);

            decref(value);
            decref(t);
        }
    }

    #[test]
    fn test_out_of_range() {
        let t = tuple_new(2);
        unsafe {
            assert!(tuple_get_item(t, 2).is_null());
            assert_eq!(err_fetch().unwrap().message, "tuple index out of range");
            assert!(tuple_get_item(t, -1).is_null());
            err_clear();
            assert_eq!(tuple_set_item(t, 5, long_from_i64(0)), -1);
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::IndexError);
            decref(t);
        }
    }

    #[test]
    fn test_pack_increfs_and_dealloc_releases() {
        let a = long_from_i64(100_000);
        let b = long_from_i64(200_000);
        unsafe {
            let t = tuple_pack(&[a, b, a]);
            assert_eq!(tuple_size(t), 3);
            assert_eq!(refcnt(a), 3);
            assert_eq!(refcnt(b), 2);
            assert_eq!(*tuple_items(t).add(1), b);
            decref(t);
            assert_eq!(refcnt(a), 1);
            assert_eq!(refcnt(b), 1);
            decref(a);
            decref(b);
        }
    }

    #[test]
    fn test_size_rejects_non_tuple() {
        let n = long_from_i64(1);
        unsafe {
            assert_eq!(tuple_size(n), -1);
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::SystemError);
            decref(n);
        }
    }
}
