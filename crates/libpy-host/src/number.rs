//! Integers, floats and booleans.
//!
//! Integers carry an `i128` payload; arithmetic that leaves that range
//! raises `OverflowError` instead of promoting. `bool` is a subtype of
//! `int` for every numeric purpose, as in the runtime it models.

use crate::error::{ErrorKind, err_set_string};
use crate::object::{RawObject, incref, into_raw, kind_of};
use crate::typeobj::{BOOL_TYPE, FLOAT_TYPE, INT_TYPE, TypeKind};

/// An integer object.
#[repr(C)]
pub struct IntObject {
    head: RawObject,
    pub(crate) value: i128,
}

/// A float object.
#[repr(C)]
pub struct FloatObject {
    head: RawObject,
    pub(crate) value: f64,
}

/// A boolean singleton.
#[repr(C)]
pub struct BoolObject {
    head: RawObject,
    pub(crate) value: bool,
}

/// The `True` singleton.
pub static TRUE: BoolObject = BoolObject {
    head: RawObject::immortal(&BOOL_TYPE),
    value: true,
};

/// The `False` singleton.
pub static FALSE: BoolObject = BoolObject {
    head: RawObject::immortal(&BOOL_TYPE),
    value: false,
};

/// A numeric payload after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }
}

/// Creates an integer from an `i128`. Returns a new reference.
pub fn long_from_i128(value: i128) -> *mut RawObject {
    into_raw(Box::new(IntObject {
        head: RawObject::new(&INT_TYPE),
        value,
    }))
}

/// Creates an integer from an `i64`. Returns a new reference.
pub fn long_from_i64(value: i64) -> *mut RawObject {
    long_from_i128(i128::from(value))
}

/// Creates a float. Returns a new reference.
pub fn float_from_f64(value: f64) -> *mut RawObject {
    into_raw(Box::new(FloatObject {
        head: RawObject::new(&FLOAT_TYPE),
        value,
    }))
}

/// Returns a new reference to `True` or `False`.
pub fn bool_from(value: bool) -> *mut RawObject {
    let ob = if value { &TRUE } else { &FALSE };
    let ob = ob as *const BoolObject as *mut RawObject;
    // SAFETY: the singletons are static.
    unsafe { incref(ob) };
    ob
}

/// Checks whether `ob` is a `float`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn float_check(ob: *mut RawObject) -> bool {
    // SAFETY: non-null checked first.
    !ob.is_null() && unsafe { kind_of(ob) } == TypeKind::Float
}

/// Integer payload of an `int` or `bool`, without raising.
///
/// # Safety
///
/// `ob` must point to a live object.
pub(crate) unsafe fn int_value(ob: *mut RawObject) -> Option<i128> {
    // SAFETY: the kind guards each cast.
    unsafe {
        match kind_of(ob) {
            TypeKind::Int => Some((*ob.cast::<IntObject>()).value),
            TypeKind::Bool => Some(i128::from((*ob.cast::<BoolObject>()).value)),
            _ => None,
        }
    }
}

/// Numeric payload of an `int`, `bool` or `float`, without raising.
///
/// # Safety
///
/// `ob` must point to a live object.
pub(crate) unsafe fn num_value(ob: *mut RawObject) -> Option<Num> {
    // SAFETY: the kind guards the cast.
    unsafe {
        match kind_of(ob) {
            TypeKind::Float => Some(Num::Float((*ob.cast::<FloatObject>()).value)),
            _ => int_value(ob).map(Num::Int),
        }
    }
}

/// Converts an integer to `i128`.
///
/// Returns `-1` with `TypeError` if `ob` is not an integer.
///
/// # Safety
///
/// `ob` must point to a live object.
pub unsafe fn long_as_i128(ob: *mut RawObject) -> i128 {
    // SAFETY: forwarded contract.
    match unsafe { int_value(ob) } {
        Some(v) => v,
        None => {
            // SAFETY: forwarded contract.
            let name = unsafe { crate::object::type_name(ob) };
            err_set_string(
                ErrorKind::TypeError,
                format!("'{name}' object cannot be interpreted as an integer"),
            );
            -1
        }
    }
}

/// Converts an integer to `i64`.
///
/// Returns `-1` with `TypeError` for non-integers and `OverflowError` when
/// the value does not fit.
///
/// # Safety
///
/// `ob` must point to a live object.
pub unsafe fn long_as_i64(ob: *mut RawObject) -> i64 {
    // SAFETY: forwarded contract.
    let value = unsafe { long_as_i128(ob) };
    i64::try_from(value).unwrap_or_else(|_| {
        err_set_string(ErrorKind::OverflowError, "int too large to convert to i64");
        -1
    })
}

/// Formats a float the way the runtime's `repr` does: shortest round-trip
/// digits, a `.0` suffix on integral values, and a signed two-digit
/// exponent (`1e+16`, `1e-05`).
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    let raw = format!("{value:?}");
    match raw.split_once('e') {
        None => raw,
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
            format!("{mantissa}e{sign}{digits:0>2}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{err_clear, err_matches};
    use crate::object::decref;

    #[test]
    fn test_int_roundtrip() {
        let ob = long_from_i64(-17);
        unsafe {
            assert!(!float_check(ob));
            assert_eq!(long_as_i64(ob), -17);
            assert_eq!(int_value(ob), Some(-17));
            decref(ob);
        }
    }

    #[test]
    fn test_u64_beyond_i64_overflows_i64_conversion() {
        let ob = long_from_i128(i128::from(u64::MAX));
        unsafe {
            assert_eq!(long_as_i128(ob), i128::from(u64::MAX));
            assert_eq!(long_as_i64(ob), -1);
            assert!(err_matches(ErrorKind::OverflowError));
            err_clear();
            decref(ob);
        }
    }

    #[test]
    fn test_bool_is_an_int() {
        let t = bool_from(true);
        unsafe {
            assert_eq!(kind_of(t), TypeKind::Bool);
            assert_eq!(long_as_i64(t), 1);
            assert_eq!(int_value(bool_from(false)), Some(0));
        }
    }

    #[test]
    fn test_float_is_not_an_int() {
        let f = float_from_f64(2.5);
        unsafe {
            assert!(float_check(f));
            assert_eq!(long_as_i64(f), -1);
            assert!(err_matches(ErrorKind::TypeError));
            err_clear();
            decref(f);
        }
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(2.5), "2.5");
        assert_eq!(float_repr(-0.0), "-0.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.5e20), "1.5e+20");
        assert_eq!(float_repr(1e-5), "1e-05");
        assert_eq!(float_repr(f64::INFINITY), "inf");
        assert_eq!(float_repr(f64::NAN), "nan");
    }
}
