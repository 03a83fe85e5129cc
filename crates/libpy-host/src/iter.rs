//! Iterators over the builtin sequences.

use crate::list::{list_items, list_size_unchecked};
use crate::object::{RawObject, free, incref, into_raw, kind_of, xdecref, xincref};
use crate::text::{unicode_as_str, unicode_from_char, unicode_len};
use crate::tuple::{tuple_items, tuple_size_unchecked};
use crate::typeobj::{SEQ_ITER_TYPE, TypeKind};
use std::ptr;

/// Iterator state. `seq` is owned and dropped once exhausted.
///
/// For `str` the position is a byte offset; for tuples and lists it is an
/// item index.
#[repr(C)]
pub struct SeqIterObject {
    head: RawObject,
    seq: *mut RawObject,
    pos: isize,
    /// Characters already yielded, for the length hint of `str`.
    yielded: isize,
}

/// Creates an iterator over a tuple, list or str. Returns a new reference.
///
/// # Safety
///
/// `seq` must be a live tuple, list or str.
pub(crate) unsafe fn seq_iter_new(seq: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { incref(seq) };
    into_raw(Box::new(SeqIterObject {
        head: RawObject::new(&SEQ_ITER_TYPE),
        seq,
        pos: 0,
        yielded: 0,
    }))
}

/// Advances the iterator. Returns a new reference, or null without an
/// error once exhausted.
///
/// # Safety
///
/// `it` must be a live sequence iterator.
pub(crate) unsafe fn seq_iter_next(it: *mut RawObject) -> *mut RawObject {
    // SAFETY: caller guarantees the kind; `seq` stays alive while owned.
    unsafe {
        let state = &mut *it.cast::<SeqIterObject>();
        if state.seq.is_null() {
            return ptr::null_mut();
        }

        let item = match kind_of(state.seq) {
            TypeKind::Tuple if state.pos < tuple_size_unchecked(state.seq) => {
                let item = *tuple_items(state.seq).offset(state.pos);
                state.pos += 1;
                xincref(item);
                item
            }
            TypeKind::List if state.pos < list_size_unchecked(state.seq) => {
                let item = *list_items(state.seq).offset(state.pos);
                state.pos += 1;
                xincref(item);
                item
            }
            TypeKind::Str => {
                let text = unicode_as_str(state.seq).unwrap_or_default();
                match text[state.pos as usize..].chars().next() {
                    Some(c) => {
                        state.pos += c.len_utf8() as isize;
                        state.yielded += 1;
                        unicode_from_char(c)
                    }
                    None => ptr::null_mut(),
                }
            }
            _ => ptr::null_mut(),
        };

        if item.is_null() {
            let seq = std::mem::replace(&mut state.seq, ptr::null_mut());
            xdecref(seq);
        }
        item
    }
}

/// Items left to yield.
///
/// # Safety
///
/// `it` must be a live sequence iterator.
pub(crate) unsafe fn seq_iter_remaining(it: *mut RawObject) -> isize {
    // SAFETY: caller guarantees the kind.
    unsafe {
        let state = &*it.cast::<SeqIterObject>();
        if state.seq.is_null() {
            return 0;
        }
        match kind_of(state.seq) {
            TypeKind::Tuple => tuple_size_unchecked(state.seq) - state.pos,
            TypeKind::List => (list_size_unchecked(state.seq) - state.pos).max(0),
            TypeKind::Str => unicode_len(state.seq) as isize - state.yielded,
            _ => 0,
        }
    }
}

pub(crate) unsafe fn dealloc(ob: *mut RawObject) {
    // SAFETY: `ob` is a dying iterator.
    unsafe {
        let seq = (*ob.cast::<SeqIterObject>()).seq;
        free::<SeqIterObject>(ob);
        xdecref(seq);
    }
}
