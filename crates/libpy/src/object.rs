//! The generic object handle.
//!
//! [`Object`] wraps exactly one raw runtime pointer, which may be null. It
//! never adjusts the reference count on its own:
//!
//! - `clone()` aliases the pointer (no incref)
//! - dropping a handle releases nothing
//! - [`Object::incref`] / [`Object::decref`] are the only counting calls
//!
//! Whether a given handle owns a reference is the caller's bookkeeping, so
//! releasing one is `unsafe`: a handle from [`lit`](crate::lit) or
//! [`Object::type_`] is borrowed and must never be released.
//! [`TmpRef`](crate::TmpRef) is the one wrapper that releases on drop.
//!
//! Operations returning `Object` return a new reference (except
//! [`Object::type_`], which is borrowed) or null with a runtime error
//! pending.
//!
//! # Memory Layout
//!
//! `Object` is `#[repr(transparent)]` over `*mut RawObject`, so runtime
//! item storage can be viewed as `[Object]` in place. The layout is
//! asserted at compile time below.

use crate::error::{Error, Result};
use crate::getitem::KeyedItem;
use crate::tuple::Tuple;
use crate::utils::failed_null_check;
use crate::view::{Handle, NotNull, TmpRef};
use libpy_host::protocol as proto;
use libpy_host::{CompareOp, RawObject, unicode_as_str};
use std::fmt;
use std::ops::{Add, Mul, Neg, Not, Sub};
use std::ptr;

/// A possibly-null handle to a runtime object.
///
/// # Example
///
/// ```rust
/// use libpy::{Object, lit};
///
/// let one = lit(1);
/// let two = lit(2);
///
/// let mut lt = one.lt(&two);
/// assert_eq!(lt.istrue(), 1);
/// // SAFETY: comparison results are new references.
/// unsafe { lt.decref() };
///
/// let mut sum = &one + &two;
/// assert_eq!(sum.to_string(), "3");
/// unsafe { sum.decref() };
/// assert!(sum.is_null());
/// ```
#[repr(transparent)]
#[derive(Clone)]
pub struct Object {
    ob: *mut RawObject,
}

const _: () = {
    assert!(size_of::<Object>() == size_of::<*mut RawObject>());
    assert!(align_of::<Object>() == align_of::<*mut RawObject>());
};

// SAFETY: the runtime keeps reference counts atomically; handles carry no
// other state. Mutation of the pointee follows the runtime's own
// exclusivity rules.
unsafe impl Send for Object {}

// SAFETY: see `Send`; shared handles only read the pointer.
unsafe impl Sync for Object {}

#[allow(clippy::should_implement_trait)]
impl Object {
    /// The null handle.
    #[must_use]
    pub const fn null() -> Self {
        Object { ob: ptr::null_mut() }
    }

    /// Wraps a raw pointer.
    ///
    /// No reference is taken; whether the new handle owns one is up to the
    /// caller.
    ///
    /// # Safety
    ///
    /// `ob` must be null or point to an object that stays alive for as long
    /// as this handle (or any clone of it) is used.
    #[must_use]
    pub const unsafe fn from_raw(ob: *mut RawObject) -> Self {
        Object { ob }
    }

    /// Borrowed handle to `None`.
    #[must_use]
    pub fn none() -> Self {
        // SAFETY: immortal singleton.
        unsafe { Object::from_raw(libpy_host::none()) }
    }

    /// Borrowed handle to `NotImplemented`.
    #[must_use]
    pub fn not_implemented() -> Self {
        // SAFETY: immortal singleton.
        unsafe { Object::from_raw(libpy_host::not_implemented()) }
    }

    /// Borrowed handle to `Ellipsis`.
    #[must_use]
    pub fn ellipsis() -> Self {
        // SAFETY: immortal singleton.
        unsafe { Object::from_raw(libpy_host::ellipsis()) }
    }

    /// The wrapped pointer.
    #[must_use]
    pub const fn as_ptr(&self) -> *mut RawObject {
        self.ob
    }

    /// Unwraps the pointer, transferring whatever ownership the handle had.
    #[must_use]
    pub const fn into_raw(self) -> *mut RawObject {
        self.ob
    }

    /// Moves the pointer out, leaving this handle null.
    #[must_use]
    pub fn take(&mut self) -> Object {
        Object {
            ob: std::mem::replace(&mut self.ob, ptr::null_mut()),
        }
    }

    /// True when the handle is not null.
    #[must_use]
    pub fn is_nonnull(&self) -> bool {
        !self.ob.is_null()
    }

    /// True when the handle is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.ob.is_null()
    }

    /// Identity comparison.
    #[must_use]
    pub fn is(&self, other: &Object) -> bool {
        ptr::eq(self.ob, other.ob)
    }

    /// Converts a null result into the pending runtime error.
    ///
    /// # Errors
    ///
    /// Returns the pending error (or [`Error::NullWithoutError`]) when the
    /// handle is null.
    pub fn check(self) -> Result<Object> {
        if self.is_nonnull() { Ok(self) } else { Err(Error::fetch()) }
    }

    /// A view proving the handle is non-null. The view aliases this handle.
    ///
    /// # Errors
    ///
    /// [`Error::BadNonnull`] for a null handle. The runtime error state is
    /// not touched.
    pub fn as_nonnull(&self) -> Result<NotNull<Object>> {
        NotNull::new(self.clone())
    }

    /// Hands the reference to a [`TmpRef`] that releases it when dropped.
    ///
    /// # Safety
    ///
    /// The handle must be null or own the reference it passes on.
    #[must_use]
    pub unsafe fn as_tmpref(self) -> TmpRef<Object> {
        // SAFETY: ownership is the caller's contract.
        unsafe { TmpRef::new(self) }
    }

    // ------------------------------------------------------------------
    // Reference counting
    // ------------------------------------------------------------------

    /// Takes a new reference. No-op on null.
    ///
    /// An unmatched incref only keeps the object alive longer.
    pub fn incref(&self) -> &Self {
        if self.is_nonnull() {
            // SAFETY: non-null handles point to live objects.
            unsafe { libpy_host::incref(self.ob) };
            #[cfg(feature = "trace-refs")]
            libpy_log::trace!("incref {:p} -> {}", self.ob, self.refcnt());
        }
        self
    }

    /// Releases a reference. Nulls the handle when the object was
    /// deallocated, so the same handle cannot release twice. No-op on null.
    ///
    /// # Safety
    ///
    /// The caller must own the reference being released. Releasing a
    /// borrowed handle (a literal, a type, an item read in place, an
    /// argument) can free an object someone else still uses.
    pub unsafe fn decref(&mut self) -> &mut Self {
        if self.is_nonnull() {
            #[cfg(feature = "trace-refs")]
            libpy_log::trace!("decref {:p} <- {}", self.ob, self.refcnt());
            // SAFETY: non-null handles point to live objects and the caller
            // owns this reference.
            if unsafe { libpy_host::dec_and_test(self.ob) } {
                self.ob = ptr::null_mut();
            }
        }
        self
    }

    /// Current reference count, `-1` for null.
    #[must_use]
    pub fn refcnt(&self) -> isize {
        if self.is_null() {
            return -1;
        }
        // SAFETY: non-null handles point to live objects.
        unsafe { libpy_host::refcnt(self.ob) }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// `hash(self)`, or `-1` with an error pending.
    #[must_use]
    pub fn hash(&self) -> isize {
        if self.is_null() {
            failed_null_check();
            return -1;
        }
        // SAFETY: non-null handles point to live objects.
        unsafe { proto::object_hash(self.ob) }
    }

    /// `len(self)`, or `-1` with an error pending.
    #[must_use]
    pub fn len(&self) -> isize {
        // object_length raises for null itself
        // SAFETY: handles are null or live.
        unsafe { proto::object_length(self.ob) }
    }

    /// True when `len(self)` is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimated length, `fallback` when the object has no notion of one.
    #[must_use]
    pub fn lenhint(&self, fallback: isize) -> isize {
        if self.is_null() {
            failed_null_check();
            return -1;
        }
        // SAFETY: non-null handles point to live objects.
        unsafe { proto::object_length_hint(self.ob, fallback) }
    }

    /// Borrowed handle to the object's type.
    #[must_use]
    pub fn type_(&self) -> Object {
        if self.is_null() {
            failed_null_check();
            return Object::null();
        }
        // SAFETY: types outlive their instances.
        unsafe { Object::from_raw(libpy_host::type_of(self.ob)) }
    }

    /// `repr(self)`.
    #[must_use]
    pub fn repr(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_repr(self.ob)) }
    }

    /// `str(self)`.
    #[must_use]
    pub fn str(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_str(self.ob)) }
    }

    /// `ascii(self)`.
    #[must_use]
    pub fn ascii(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_ascii(self.ob)) }
    }

    /// `bytes(self)`.
    #[must_use]
    pub fn bytes(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_bytes(self.ob)) }
    }

    /// `dir(self)`: a sorted list of attribute names.
    #[must_use]
    pub fn dir(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_dir(self.ob)) }
    }

    /// `iter(self)`.
    #[must_use]
    pub fn iter(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_get_iter(self.ob)) }
    }

    /// `next(self)` on an iterator. Null without an error once exhausted.
    #[must_use]
    pub fn next(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::iter_next(self.ob)) }
    }

    /// `callable(self)`.
    #[must_use]
    pub fn iscallable(&self) -> bool {
        // SAFETY: handles are null or live.
        unsafe { proto::callable_check(self.ob) }
    }

    /// Truth value: `1`, `0`, or `-1` with an error pending.
    #[must_use]
    pub fn istrue(&self) -> i32 {
        // SAFETY: handles are null or live.
        unsafe { proto::object_is_true(self.ob) }
    }

    /// The `str` payload, when this is a `str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if self.is_null() {
            return None;
        }
        // SAFETY: the text lives as long as the object, which outlives
        // this borrow of the handle.
        unsafe { unicode_as_str(self.ob) }
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    /// Rich comparison with `other`.
    #[must_use]
    pub fn richcompare(&self, other: &Object, op: CompareOp) -> Object {
        // the runtime checks for null operands itself
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_rich_compare(self.ob, other.ob, op)) }
    }

    /// `self < other`.
    #[must_use]
    pub fn lt(&self, other: &Object) -> Object {
        self.richcompare(other, CompareOp::Lt)
    }

    /// `self <= other`.
    #[must_use]
    pub fn le(&self, other: &Object) -> Object {
        self.richcompare(other, CompareOp::Le)
    }

    /// `self == other`.
    #[must_use]
    pub fn eq(&self, other: &Object) -> Object {
        self.richcompare(other, CompareOp::Eq)
    }

    /// `self != other`.
    #[must_use]
    pub fn ne(&self, other: &Object) -> Object {
        self.richcompare(other, CompareOp::Ne)
    }

    /// `self > other`.
    #[must_use]
    pub fn gt(&self, other: &Object) -> Object {
        self.richcompare(other, CompareOp::Gt)
    }

    /// `self >= other`.
    #[must_use]
    pub fn ge(&self, other: &Object) -> Object {
        self.richcompare(other, CompareOp::Ge)
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    /// `+self`.
    #[must_use]
    pub fn pos(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::number_positive(self.ob)) }
    }

    /// `abs(self)`.
    #[must_use]
    pub fn abs(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::number_absolute(self.ob)) }
    }

    /// `~self`.
    #[must_use]
    pub fn invert(&self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::number_invert(self.ob)) }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// `hasattr(self, name)`. Never leaves an error pending.
    #[must_use]
    pub fn hasattr(&self, name: &Object) -> bool {
        // SAFETY: handles are null or live.
        unsafe { proto::object_has_attr(self.ob, name.ob) }
    }

    /// `getattr(self, name)`.
    #[must_use]
    pub fn getattr(&self, name: &Object) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_get_attr(self.ob, name.ob)) }
    }

    /// `getattr(self, name)` with a Rust string name.
    #[must_use]
    pub fn getattr_str(&self, name: &str) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_get_attr_str(self.ob, name)) }
    }

    /// `setattr(self, name, value)`. Returns `0`, or `-1` with an error
    /// pending. The object takes its own reference to `value`.
    pub fn setattr(&self, name: &Object, value: &Object) -> i32 {
        // SAFETY: handles are null or live.
        unsafe { proto::object_set_attr(self.ob, name.ob, value.ob) }
    }

    /// `delattr(self, name)`. Returns `0`, or `-1` with an error pending.
    pub fn delattr(&self, name: &Object) -> i32 {
        // SAFETY: handles are null or live.
        unsafe { proto::object_del_attr(self.ob, name.ob) }
    }

    // ------------------------------------------------------------------
    // Items and calls
    // ------------------------------------------------------------------

    /// `self[key]` as a deferred result: read it with
    /// [`KeyedItem::get`], or assign through it with [`KeyedItem::set`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use libpy::{List, lit};
    ///
    /// let mut l = List::pack(&[lit(1), lit(2), lit(3)]);
    /// let idx = lit(0);
    /// let mut neg = -&idx;
    /// assert_eq!(l.getitem(&idx).set(&neg), 0);
    ///
    /// let mut value = l.getitem(&idx).get();
    /// assert_eq!(value.eq(&neg).istrue(), 1);
    /// // SAFETY: all three are new references.
    /// unsafe {
    ///     value.decref();
    ///     neg.decref();
    ///     l.decref();
    /// }
    /// ```
    #[must_use]
    pub fn getitem<'a>(&'a self, key: &'a Object) -> KeyedItem<'a> {
        KeyedItem::new(self, key)
    }

    /// `self(*args)`.
    #[must_use]
    pub fn call(&self, args: &Tuple) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::object_call(self.ob, args.as_ptr())) }
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::null()
    }
}

impl Handle for Object {
    fn as_ptr(&self) -> *mut RawObject {
        self.ob
    }

    unsafe fn decref(&mut self) {
        // SAFETY: forwarded contract.
        unsafe { Object::decref(self) };
    }
}

impl Neg for &Object {
    type Output = Object;

    fn neg(self) -> Object {
        // SAFETY: handles are null or live.
        unsafe { Object::from_raw(proto::number_negative(self.ob)) }
    }
}

impl Not for &Object {
    type Output = Object;

    fn not(self) -> Object {
        self.invert()
    }
}

macro_rules! binary_op {
    ($Trait:ident, $method:ident, $entry:path) => {
        impl $Trait for &Object {
            type Output = Object;

            fn $method(self, rhs: &Object) -> Object {
                // SAFETY: handles are null or live.
                unsafe { Object::from_raw($entry(self.ob, rhs.ob)) }
            }
        }
    };
}

binary_op!(Add, add, proto::number_add);
binary_op!(Sub, sub, proto::number_subtract);
binary_op!(Mul, mul, proto::number_multiply);

impl fmt::Display for Object {
    /// Writes `str(self)`, or `<NULL>` for a null handle.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("<NULL>");
        }
        let mut s = self.str();
        let result = match s.as_str() {
            Some(text) => f.write_str(text),
            None => Err(fmt::Error),
        };
        // SAFETY: `str()` returned a new reference.
        unsafe { s.decref() };
        result
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("ptr", &self.ob)
            .field("refcnt", &self.refcnt())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literals::lit;
    use libpy_host::{ErrorKind, err_clear, err_fetch, err_occurred, long_from_i64};

    fn fresh_int(v: i64) -> Object {
        unsafe { Object::from_raw(long_from_i64(v)) }
    }

    #[test]
    fn test_layout() {
        assert_eq!(size_of::<Object>(), size_of::<*mut RawObject>());
    }

    #[test]
    fn test_decref_nulls_at_zero() {
        let mut ob = fresh_int(1000);
        ob.incref();
        assert_eq!(ob.refcnt(), 2);
        unsafe { ob.decref() };
        assert!(ob.is_nonnull());
        assert_eq!(ob.refcnt(), 1);
        unsafe { ob.decref() };
        assert!(ob.is_null());
        assert_eq!(ob.refcnt(), -1);
        unsafe { ob.decref() };
        assert!(ob.is_null());
    }

    #[test]
    fn test_clone_aliases_without_incref() {
        let mut ob = fresh_int(5);
        let alias = ob.clone();
        assert!(alias.is(&ob));
        assert_eq!(ob.refcnt(), 1);
        unsafe { ob.decref() };
    }

    #[test]
    fn test_take_leaves_null() {
        let mut ob = fresh_int(5);
        let mut moved = ob.take();
        assert!(ob.is_null());
        assert!(moved.is_nonnull());
        unsafe { moved.decref() };
    }

    #[test]
    fn test_null_checked_entry_points() {
        err_clear();
        let null = Object::null();
        assert_eq!(null.hash(), -1);
        assert_eq!(err_fetch().unwrap().kind, ErrorKind::AssertionError);
        assert_eq!(null.lenhint(3), -1);
        assert_eq!(err_fetch().unwrap().kind, ErrorKind::AssertionError);
        assert!(null.type_().is_null());
        assert_eq!(err_fetch().unwrap().kind, ErrorKind::AssertionError);

        // the runtime's own null check answers for len
        assert_eq!(null.len(), -1);
        assert_eq!(err_fetch().unwrap().kind, ErrorKind::SystemError);
    }

    #[test]
    fn test_as_nonnull() {
        let ob = lit("test");
        let view = ob.as_nonnull().unwrap();
        assert!(view.is(&ob));

        err_clear();
        assert_eq!(Object::null().as_nonnull().unwrap_err(), Error::BadNonnull);
        assert!(err_occurred().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Object::null().to_string(), "<NULL>");
        assert_eq!(lit('c').to_string(), "c");
        assert_eq!(lit(1).to_string(), "1");
        assert_eq!(lit(1.5).to_string(), "1.5");
        assert_eq!(lit("test").to_string(), "test");
        assert_eq!(Object::none().to_string(), "None");
    }

    #[test]
    fn test_string_conversions() {
        let s = lit("é");
        let mut repr = s.repr();
        let mut ascii = s.ascii();
        assert_eq!(repr.as_str(), Some("'é'"));
        assert_eq!(ascii.as_str(), Some("'\\xe9'"));
        unsafe { repr.decref() };
        unsafe { ascii.decref() };

        let mut b = s.bytes();
        assert!(b.is_null());
        assert_eq!(err_fetch().unwrap().kind, ErrorKind::TypeError);
        unsafe { b.decref() };
    }

    #[test]
    fn test_unary_operators() {
        let three = lit(3);
        let mut neg = -&three;
        let mut inv = !&three;
        let mut abs = neg.abs();
        let mut pos = three.pos();

        assert_eq!(neg.to_string(), "-3");
        assert_eq!(inv.to_string(), "-4");
        assert_eq!(abs.to_string(), "3");
        assert!(pos.is(&three));

        for ob in [&mut neg, &mut inv, &mut abs, &mut pos] {
            unsafe { ob.decref() };
        }
    }

    #[test]
    fn test_binary_operators() {
        let mut sum = &lit(2) + &lit(0.5);
        let mut diff = &lit(2) - &lit(5);
        let mut rep = &lit("ab") * &lit(2);
        assert_eq!(sum.to_string(), "2.5");
        assert_eq!(diff.to_string(), "-3");
        assert_eq!(rep.to_string(), "abab");
        unsafe { sum.decref() };
        unsafe { diff.decref() };
        unsafe { rep.decref() };

        let bad = &lit(1) + &lit("x");
        assert!(bad.is_null());
        assert_eq!(Error::fetch().kind(), ErrorKind::TypeError);
    }

    #[test]
    fn test_comparisons() {
        let (one, two) = (lit(1), lit(2));
        let checks = [
            (one.lt(&two), 1),
            (one.le(&one), 1),
            (one.eq(&two), 0),
            (one.ne(&two), 1),
            (one.gt(&two), 0),
            (two.ge(&one), 1),
        ];
        for (result, expected) in checks {
            assert_eq!(result.istrue(), expected);
        }

        let mut cross = one.lt(&lit("a"));
        assert!(cross.is_null());
        assert_eq!(Error::fetch().kind(), ErrorKind::TypeError);
        unsafe { cross.decref() };
    }

    #[test]
    fn test_check() {
        assert!(lit(1).check().is_ok());
        let err = lit(1).getattr_str("missing").check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeError);
    }

    #[test]
    fn test_hash_and_len() {
        assert_eq!(lit(10).hash(), 10);
        assert_eq!(lit("test").len(), 4);
        assert!(!lit("test").is_empty());
        assert_eq!(lit(1).lenhint(9), 9);
    }
}
