//! The object header, reference counting and the runtime singletons.
//!
//! Every runtime value starts with a [`RawObject`] header: an atomic
//! reference count followed by a pointer to the value's type object. The
//! concrete object structs (`IntObject`, `TupleObject`, ...) are `#[repr(C)]`
//! with the header as their first field, so a pointer to any of them can be
//! handed around as `*mut RawObject` and cast back once the kind is known.
//!
//! # Ownership
//!
//! Entry points follow one convention throughout the crate:
//! - functions that *create* an object return a **new reference** (count
//!   already incremented on the caller's behalf);
//! - accessors documented as *borrowed* return a pointer the caller must not
//!   release;
//! - functions documented as *stealing* take over the caller's reference.
//!
//! # Immortal objects
//!
//! Static objects (`None`, `True`, the builtin type objects, ...) carry a
//! reference count of [`IMMORTAL_REFCNT`]. [`incref`] and [`decref`] leave
//! such counts untouched, so immortals can be shared freely between threads
//! and are never deallocated.

use crate::typeobj::{
    ELLIPSIS_TYPE, NONE_TYPE, NOT_IMPLEMENTED_TYPE, TypeKind, TypeObject,
};
use crate::{iter, list, method, module, number, text, tuple, typeobj};
use libpy_log::{error, trace};
use std::sync::atomic::{AtomicIsize, Ordering};

/// Reference count carried by immortal objects.
///
/// Any count at or above this value is treated as immortal.
pub const IMMORTAL_REFCNT: isize = isize::MAX / 2;

/// Header shared by every runtime object.
#[repr(C)]
pub struct RawObject {
    pub(crate) refcnt: AtomicIsize,
    pub(crate) ty: *const TypeObject,
}

// SAFETY: the count is atomic and the type pointer refers either to an
// immortal static type or to a heap type kept alive by this object's own
// reference. Payload access is governed by the single-threaded call model.
unsafe impl Send for RawObject {}
// SAFETY: see above.
unsafe impl Sync for RawObject {}

impl RawObject {
    /// Header for a freshly allocated object owning one reference.
    pub(crate) fn new(ty: *const TypeObject) -> Self {
        RawObject {
            refcnt: AtomicIsize::new(1),
            ty,
        }
    }

    /// Header for a static object that is never deallocated.
    pub(crate) const fn immortal(ty: &'static TypeObject) -> Self {
        RawObject {
            refcnt: AtomicIsize::new(IMMORTAL_REFCNT),
            ty: ty as *const TypeObject,
        }
    }
}

/// Header of variable-size containers (tuple, list).
///
/// `size` is the number of item slots in use.
#[repr(C)]
pub struct VarObject {
    pub(crate) base: RawObject,
    pub(crate) size: isize,
}

/// A raw object pointer that can live inside shared tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot(pub(crate) *mut RawObject);

// SAFETY: slots are only dereferenced under the runtime's call model; the
// wrapper exists so namespaces can sit inside statics and locks.
unsafe impl Send for Slot {}
// SAFETY: see above.
unsafe impl Sync for Slot {}

/// Moves a concrete object to the heap and returns it as a new reference.
pub(crate) fn into_raw<T>(boxed: Box<T>) -> *mut RawObject {
    Box::into_raw(boxed).cast()
}

/// Reclaims an object allocated by [`into_raw`].
///
/// # Safety
///
/// `ob` must come from `into_raw::<T>` and must not be used afterwards.
pub(crate) unsafe fn free<T>(ob: *mut RawObject) {
    // SAFETY: caller guarantees `ob` is a leaked `Box<T>`.
    drop(unsafe { Box::from_raw(ob.cast::<T>()) });
}

/// Increments the reference count of `ob`.
///
/// # Safety
///
/// `ob` must point to a live object.
///
/// # Panics
///
/// Panics if the count of a mortal object would reach the immortal range.
pub unsafe fn incref(ob: *mut RawObject) {
    // SAFETY: caller guarantees `ob` is live.
    let refcnt = unsafe { &(*ob).refcnt };
    if refcnt.load(Ordering::Relaxed) >= IMMORTAL_REFCNT {
        return;
    }
    let old = refcnt.fetch_add(1, Ordering::AcqRel);
    if old >= IMMORTAL_REFCNT - 1 {
        panic!("Reference count overflow in incref");
    }
}

/// [`incref`] that accepts null.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn xincref(ob: *mut RawObject) {
    if !ob.is_null() {
        // SAFETY: non-null and live per caller.
        unsafe { incref(ob) };
    }
}

/// Decrements the reference count and deallocates at zero.
///
/// Returns `true` if the object was deallocated. Callers holding the
/// pointer elsewhere use this to forget it.
///
/// # Safety
///
/// `ob` must point to a live object and the caller must own the reference
/// being released.
pub unsafe fn dec_and_test(ob: *mut RawObject) -> bool {
    // SAFETY: caller guarantees `ob` is live.
    let refcnt = unsafe { &(*ob).refcnt };
    if refcnt.load(Ordering::Relaxed) >= IMMORTAL_REFCNT {
        return false;
    }
    let old = refcnt.fetch_sub(1, Ordering::AcqRel);
    debug_assert!(old > 0, "decref of an object with refcount {old}");
    if old == 1 {
        // SAFETY: count reached zero; this was the last reference.
        unsafe { dealloc(ob) };
        true
    } else {
        false
    }
}

/// Releases one reference to `ob`.
///
/// # Safety
///
/// Same contract as [`dec_and_test`].
pub unsafe fn decref(ob: *mut RawObject) {
    // SAFETY: forwarded contract.
    unsafe { dec_and_test(ob) };
}

/// [`decref`] that accepts null.
///
/// # Safety
///
/// `ob` must be null or satisfy the contract of [`dec_and_test`].
pub unsafe fn xdecref(ob: *mut RawObject) {
    if !ob.is_null() {
        // SAFETY: non-null, forwarded contract.
        unsafe { decref(ob) };
    }
}

/// Current reference count of `ob`.
///
/// # Safety
///
/// `ob` must point to a live object.
pub unsafe fn refcnt(ob: *mut RawObject) -> isize {
    // SAFETY: caller guarantees `ob` is live.
    unsafe { (*ob).refcnt.load(Ordering::Acquire) }
}

/// Type object of `ob` as a borrowed object pointer.
///
/// # Safety
///
/// `ob` must point to a live object.
pub unsafe fn type_of(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: caller guarantees `ob` is live.
    unsafe { (*ob).ty as *mut RawObject }
}

/// Type object of `ob` as a typed reference.
///
/// # Safety
///
/// `ob` must point to a live object, and the returned reference must not
/// outlive it.
pub(crate) unsafe fn type_ref<'a>(ob: *mut RawObject) -> &'a TypeObject {
    // SAFETY: every header carries a valid type pointer.
    unsafe { &*(*ob).ty }
}

/// Kind of `ob`'s type.
///
/// # Safety
///
/// `ob` must point to a live object.
pub(crate) unsafe fn kind_of(ob: *mut RawObject) -> TypeKind {
    // SAFETY: forwarded contract.
    unsafe { type_ref(ob).kind }
}

/// Name of `ob`'s type, as used in error messages.
///
/// # Safety
///
/// `ob` must point to a live object, and the returned string must not
/// outlive it.
pub unsafe fn type_name<'a>(ob: *mut RawObject) -> &'a str {
    // SAFETY: forwarded contract.
    unsafe { type_ref(ob).name() }
}

unsafe fn dealloc(ob: *mut RawObject) {
    // SAFETY: `ob` is live until the kind-specific routine frees it.
    let kind = unsafe { kind_of(ob) };
    trace!("dealloc {kind:?} at {ob:p}");

    // SAFETY: each routine frees an object of exactly this kind.
    unsafe {
        match kind {
            TypeKind::Int => free::<number::IntObject>(ob),
            TypeKind::Float => free::<number::FloatObject>(ob),
            TypeKind::Str => free::<text::StrObject>(ob),
            TypeKind::Bytes => free::<text::BytesObject>(ob),
            TypeKind::Tuple => tuple::dealloc(ob),
            TypeKind::List => list::dealloc(ob),
            TypeKind::SeqIter => iter::dealloc(ob),
            TypeKind::Method => method::dealloc(ob),
            TypeKind::Module => module::dealloc(ob),
            TypeKind::Type => typeobj::dealloc_type(ob),
            TypeKind::Instance => typeobj::dealloc_instance(ob),
            TypeKind::NoneType
            | TypeKind::NotImplementedType
            | TypeKind::EllipsisType
            | TypeKind::Bool => {
                error!("refusing to deallocate immortal {kind:?} at {ob:p}");
            }
        }
    }
}

/// The `None` singleton.
pub static NONE: RawObject = RawObject::immortal(&NONE_TYPE);

/// The `NotImplemented` singleton.
pub static NOT_IMPLEMENTED: RawObject = RawObject::immortal(&NOT_IMPLEMENTED_TYPE);

/// The `Ellipsis` singleton.
pub static ELLIPSIS: RawObject = RawObject::immortal(&ELLIPSIS_TYPE);

/// Borrowed pointer to `None`.
pub fn none() -> *mut RawObject {
    &NONE as *const RawObject as *mut RawObject
}

/// Borrowed pointer to `NotImplemented`.
pub fn not_implemented() -> *mut RawObject {
    &NOT_IMPLEMENTED as *const RawObject as *mut RawObject
}

/// Borrowed pointer to `Ellipsis`.
pub fn ellipsis() -> *mut RawObject {
    &ELLIPSIS as *const RawObject as *mut RawObject
}

/// Checks whether `ob` is the `None` singleton.
pub fn is_none(ob: *mut RawObject) -> bool {
    std::ptr::eq(ob, none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::long_from_i64;

    #[test]
    fn test_new_object_has_one_reference() {
        let ob = long_from_i64(12345);
        unsafe {
            assert_eq!(refcnt(ob), 1);
            incref(ob);
            assert_eq!(refcnt(ob), 2);
            assert!(!dec_and_test(ob));
            assert_eq!(refcnt(ob), 1);
            assert!(dec_and_test(ob));
        }
    }

    #[test]
    fn test_immortals_ignore_counting() {
        let ob = none();
        unsafe {
            let before = refcnt(ob);
            incref(ob);
            decref(ob);
            decref(ob);
            assert_eq!(refcnt(ob), before);
            assert!(!dec_and_test(ob));
        }
        assert!(is_none(ob));
        assert!(!is_none(ellipsis()));
    }

    #[test]
    fn test_null_tolerant_variants() {
        unsafe {
            xincref(std::ptr::null_mut());
            xdecref(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_type_names() {
        unsafe {
            assert_eq!(type_name(none()), "NoneType");
            assert_eq!(type_name(not_implemented()), "NotImplementedType");
            assert_eq!(type_name(ellipsis()), "ellipsis");
            let ty = type_of(none());
            assert_eq!(type_name(ty), "type");
            assert_eq!(type_of(ty), type_of(type_of(ty)));
        }
    }
}
