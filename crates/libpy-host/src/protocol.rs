//! Generic object protocols.
//!
//! These are the entry points the handle layer delegates to. All of them
//! follow the runtime's failure convention: they return a new reference (or
//! a scalar) on success and a sentinel with an error pending on failure.
//! A null argument raises `SystemError` unless documented otherwise. When
//! an error is already pending, the null is taken as the result of that
//! failure and the first error stays pending.

use crate::error::{
    ErrorKind, err_clear, err_occurred, err_set_string, raise_int, raise_neg, raise_null,
};
use crate::iter::{seq_iter_new, seq_iter_next, seq_iter_remaining};
use crate::list::{list_check, list_items, list_new, list_set_item, list_size_unchecked};
use crate::method::{MethodObject, method_call, method_new};
use crate::module::as_module;
use crate::number::{
    Num, bool_from, float_from_f64, float_repr, int_value, long_from_i128, long_from_i64,
    num_value,
};
use crate::object::{RawObject, decref, incref, kind_of, type_name, type_of, type_ref};
use crate::text::{
    ascii_escape, bytes_as_slice, bytes_from_slice, bytes_repr, str_repr, unicode_as_str,
    unicode_from_char, unicode_from_str, unicode_len,
};
use crate::tuple::{tuple_check, tuple_items, tuple_new, tuple_size_unchecked};
use crate::typeobj::{InstanceObject, TypeKind, as_type, instance_new, type_new};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ptr;

/// Rich comparison operators, numbered as the runtime numbers them.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `<`
    Lt = 0,
    /// `<=`
    Le = 1,
    /// `==`
    Eq = 2,
    /// `!=`
    Ne = 3,
    /// `>`
    Gt = 4,
    /// `>=`
    Ge = 5,
}

impl CompareOp {
    /// Decodes a raw operator number.
    pub const fn from_raw(op: i32) -> Option<Self> {
        match op {
            0 => Some(CompareOp::Lt),
            1 => Some(CompareOp::Le),
            2 => Some(CompareOp::Eq),
            3 => Some(CompareOp::Ne),
            4 => Some(CompareOp::Gt),
            5 => Some(CompareOp::Ge),
            _ => None,
        }
    }

    /// The operator as written in source.
    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A null argument raises `SystemError`, unless it is the fallout of an
/// earlier failure whose error is still pending.
fn null_argument() {
    if err_occurred().is_none() {
        err_set_string(ErrorKind::SystemError, "null argument to internal routine");
    }
}

fn null_error<T>() -> *mut T {
    null_argument();
    ptr::null_mut()
}

fn null_error_neg() -> isize {
    null_argument();
    -1
}

fn null_error_int() -> i32 {
    null_argument();
    -1
}

/// Item slots of a tuple or list; empty for anything else.
unsafe fn seq_items<'a>(ob: *mut RawObject) -> &'a [*mut RawObject] {
    // SAFETY: the kind guards each storage access.
    unsafe {
        match kind_of(ob) {
            TypeKind::Tuple => {
                std::slice::from_raw_parts(tuple_items(ob), tuple_size_unchecked(ob) as usize)
            }
            TypeKind::List => {
                let items = list_items(ob);
                if items.is_null() {
                    &[]
                } else {
                    std::slice::from_raw_parts(items, list_size_unchecked(ob) as usize)
                }
            }
            _ => &[],
        }
    }
}

/// Builds a tuple from references the caller owns.
unsafe fn tuple_from_owned(items: Vec<*mut RawObject>) -> *mut RawObject {
    let tuple = tuple_new(items.len() as isize);
    if tuple.is_null() {
        for item in items {
            // SAFETY: we own each item.
            unsafe { decref(item) };
        }
        return tuple;
    }
    // SAFETY: fresh tuple with exactly `items.len()` slots.
    unsafe {
        let slots = tuple_items(tuple);
        for (i, item) in items.into_iter().enumerate() {
            slots.add(i).write(item);
        }
    }
    tuple
}

/// Builds a list from references the caller owns.
unsafe fn list_from_owned(items: Vec<*mut RawObject>) -> *mut RawObject {
    let list = list_new(items.len() as isize);
    if list.is_null() {
        for item in items {
            // SAFETY: we own each item.
            unsafe { decref(item) };
        }
        return list;
    }
    // SAFETY: fresh list with exactly `items.len()` slots.
    unsafe {
        let slots = list_items(list);
        for (i, item) in items.into_iter().enumerate() {
            slots.add(i).write(item);
        }
    }
    list
}

/// Drains an iterable into owned references.
unsafe fn collect_items(ob: *mut RawObject) -> Option<Vec<*mut RawObject>> {
    // SAFETY: `ob` is live; `it` is owned until released below.
    unsafe {
        let it = object_get_iter(ob);
        if it.is_null() {
            return None;
        }
        let mut items = Vec::new();
        loop {
            let item = iter_next(it);
            if item.is_null() {
                break;
            }
            items.push(item);
        }
        decref(it);
        if err_occurred().is_some() {
            for item in items {
                decref(item);
            }
            return None;
        }
        Some(items)
    }
}

// ---------------------------------------------------------------------------
// String conversions
// ---------------------------------------------------------------------------

thread_local! {
    static REPR_ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

unsafe fn repr_seq(ob: *mut RawObject, open: char, close: char) -> Option<String> {
    let key = ob as usize;
    if REPR_ACTIVE.with(|active| active.borrow().contains(&key)) {
        return Some(format!("{open}...{close}"));
    }
    REPR_ACTIVE.with(|active| active.borrow_mut().push(key));

    // SAFETY: `ob` is a live tuple or list.
    let items = unsafe { seq_items(ob) };
    let mut parts = Vec::with_capacity(items.len());
    let mut failed = false;
    for &item in items {
        // SAFETY: items of a live container are live or null.
        match unsafe { repr_string(item) } {
            Some(part) => parts.push(part),
            None => {
                failed = true;
                break;
            }
        }
    }

    REPR_ACTIVE.with(|active| active.borrow_mut().retain(|&k| k != key));
    if failed {
        return None;
    }

    let trailing = if open == '(' && parts.len() == 1 { "," } else { "" };
    Some(format!("{open}{}{trailing}{close}", parts.join(", ")))
}

/// `repr` as a Rust string; `None` with an error pending on failure.
pub(crate) unsafe fn repr_string(ob: *mut RawObject) -> Option<String> {
    if ob.is_null() {
        return Some("<NULL>".to_owned());
    }
    // SAFETY: `ob` is live; the kind guards each cast.
    unsafe {
        let repr = match kind_of(ob) {
            TypeKind::Type => format!("<class '{}'>", as_type(ob).name()),
            TypeKind::NoneType => "None".to_owned(),
            TypeKind::NotImplementedType => "NotImplemented".to_owned(),
            TypeKind::EllipsisType => "Ellipsis".to_owned(),
            TypeKind::Bool => {
                if int_value(ob) == Some(1) { "True" } else { "False" }.to_owned()
            }
            TypeKind::Int => int_value(ob).unwrap_or_default().to_string(),
            TypeKind::Float => float_repr(num_value(ob).map_or(0.0, Num::as_f64)),
            TypeKind::Str => str_repr(unicode_as_str(ob).unwrap_or_default()),
            TypeKind::Bytes => bytes_repr(bytes_as_slice(ob).unwrap_or_default()),
            TypeKind::Tuple => return repr_seq(ob, '(', ')'),
            TypeKind::List => return repr_seq(ob, '[', ']'),
            TypeKind::SeqIter => format!("<iterator object at {ob:p}>"),
            TypeKind::Method => {
                let m = &*ob.cast::<MethodObject>();
                if m.slf.is_null() || kind_of(m.slf) == TypeKind::Module {
                    format!("<built-in function {}>", m.def.name)
                } else {
                    format!(
                        "<built-in method {} of {} object at {:p}>",
                        m.def.name,
                        type_name(m.slf),
                        m.slf
                    )
                }
            }
            TypeKind::Module => format!("<module '{}'>", as_module(ob).name),
            TypeKind::Instance => format!("<{} object at {ob:p}>", type_name(ob)),
        };
        Some(repr)
    }
}

/// `repr(ob)`. A null `ob` gives `"<NULL>"`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_repr(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    match unsafe { repr_string(ob) } {
        Some(s) => unicode_from_str(&s),
        None => ptr::null_mut(),
    }
}

/// `str(ob)`. A null `ob` gives `"<NULL>"`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_str(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe {
        if !ob.is_null() && kind_of(ob) == TypeKind::Str {
            incref(ob);
            return ob;
        }
        object_repr(ob)
    }
}

/// `ascii(ob)`: the repr with non-ASCII characters escaped.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_ascii(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    match unsafe { repr_string(ob) } {
        Some(s) => unicode_from_str(&ascii_escape(&s)),
        None => ptr::null_mut(),
    }
}

/// `bytes(ob)` for bytes and sequences of small integers. A null `ob`
/// gives `b"<NULL>"`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_bytes(ob: *mut RawObject) -> *mut RawObject {
    if ob.is_null() {
        return bytes_from_slice(b"<NULL>");
    }
    // SAFETY: `ob` is live.
    unsafe {
        match kind_of(ob) {
            TypeKind::Bytes => {
                incref(ob);
                ob
            }
            TypeKind::Tuple | TypeKind::List => {
                let mut out = Vec::new();
                for &item in seq_items(ob) {
                    let value = if item.is_null() { None } else { int_value(item) };
                    match value.map(u8::try_from) {
                        Some(Ok(byte)) => out.push(byte),
                        Some(Err(_)) => {
                            return raise_null(ErrorKind::ValueError, "bytes must be in range(0, 256)");
                        }
                        None => {
                            return raise_null(
                                ErrorKind::TypeError,
                                "'bytes' items must be integers",
                            );
                        }
                    }
                }
                bytes_from_slice(&out)
            }
            _ => raise_null(
                ErrorKind::TypeError,
                format!("cannot convert '{}' object to bytes", type_name(ob)),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Hashing, truth, length
// ---------------------------------------------------------------------------

const HASH_MODULUS: i128 = (1 << 61) - 1;
const HASH_INF: isize = 314_159;

fn hash_int(value: i128) -> isize {
    let h = (value.unsigned_abs() % HASH_MODULUS as u128) as isize;
    if value < 0 { -h } else { h }
}

fn hash_float(value: f64) -> isize {
    if value.is_infinite() {
        return if value > 0.0 { HASH_INF } else { -HASH_INF };
    }
    if value.fract() == 0.0 && value.abs() < 1.7e38 {
        return hash_int(value as i128);
    }
    fxhash::hash64(&value.to_bits()) as isize
}

fn hash_pointer(ob: *mut RawObject) -> isize {
    (ob as usize).rotate_right(4) as isize
}

// Item mixing for tuples; lanes and rotation of xxHash64.
const XX_PRIME_1: u64 = 11_400_714_785_074_694_791;
const XX_PRIME_2: u64 = 14_029_467_366_897_019_727;
const XX_PRIME_5: u64 = 2_870_177_450_012_600_261;

unsafe fn hash_seq(items: &[*mut RawObject]) -> isize {
    let mut acc = XX_PRIME_5;
    for &item in items {
        // SAFETY: items of a live tuple are live.
        let h = unsafe { object_hash(item) };
        if h == -1 {
            return -1;
        }
        acc = acc.wrapping_add((h as u64).wrapping_mul(XX_PRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(XX_PRIME_1);
    }
    acc = acc.wrapping_add(items.len() as u64 ^ (XX_PRIME_5 ^ 3_527_539));
    acc as isize
}

/// `hash(ob)`. Returns `-1` with an error pending on failure; a computed
/// hash of `-1` is reported as `-2`.
///
/// Numbers that compare equal hash equal, whatever their kind.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_hash(ob: *mut RawObject) -> isize {
    if ob.is_null() {
        return null_error_neg();
    }
    // SAFETY: `ob` is live.
    let h = unsafe {
        match kind_of(ob) {
            TypeKind::Int | TypeKind::Bool => hash_int(int_value(ob).unwrap_or_default()),
            TypeKind::Float => match num_value(ob) {
                Some(Num::Float(v)) if v.is_nan() => hash_pointer(ob),
                Some(n) => hash_float(n.as_f64()),
                None => hash_pointer(ob),
            },
            TypeKind::Str => {
                fxhash::hash64(unicode_as_str(ob).unwrap_or_default().as_bytes()) as isize
            }
            TypeKind::Bytes => fxhash::hash64(bytes_as_slice(ob).unwrap_or_default()) as isize,
            TypeKind::Tuple => {
                let items = seq_items(ob);
                if items.iter().any(|item| item.is_null()) {
                    return raise_neg(ErrorKind::SystemError, "cannot hash an uninitialized tuple");
                }
                match hash_seq(items) {
                    -1 => return -1,
                    h => h,
                }
            }
            TypeKind::List => {
                return raise_neg(ErrorKind::TypeError, "unhashable type: 'list'");
            }
            _ => hash_pointer(ob),
        }
    };
    if h == -1 { -2 } else { h }
}

/// Truth value: `1`, `0`, or `-1` with an error pending.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_is_true(ob: *mut RawObject) -> i32 {
    if ob.is_null() {
        return null_error_int();
    }
    // SAFETY: `ob` is live.
    let truth = unsafe {
        match kind_of(ob) {
            TypeKind::NoneType => false,
            TypeKind::Bool | TypeKind::Int => int_value(ob) != Some(0),
            TypeKind::Float => num_value(ob).is_some_and(|n| n.as_f64() != 0.0),
            TypeKind::Str => unicode_len(ob) != 0,
            TypeKind::Bytes => !bytes_as_slice(ob).unwrap_or_default().is_empty(),
            TypeKind::Tuple => tuple_size_unchecked(ob) != 0,
            TypeKind::List => list_size_unchecked(ob) != 0,
            _ => true,
        }
    };
    i32::from(truth)
}

/// `len(ob)`. Returns `-1` with an error pending on failure.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_length(ob: *mut RawObject) -> isize {
    if ob.is_null() {
        return null_error_neg();
    }
    // SAFETY: `ob` is live.
    unsafe {
        match kind_of(ob) {
            TypeKind::Str => unicode_len(ob) as isize,
            TypeKind::Bytes => bytes_as_slice(ob).unwrap_or_default().len() as isize,
            TypeKind::Tuple => tuple_size_unchecked(ob),
            TypeKind::List => list_size_unchecked(ob),
            _ => raise_neg(
                ErrorKind::TypeError,
                format!("object of type '{}' has no len()", type_name(ob)),
            ),
        }
    }
}

/// Estimated length: the real length when there is one, the remaining
/// count for iterators, `default` otherwise.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_length_hint(ob: *mut RawObject, default: isize) -> isize {
    if ob.is_null() {
        return null_error_neg();
    }
    // SAFETY: `ob` is live.
    unsafe {
        match kind_of(ob) {
            TypeKind::Str | TypeKind::Bytes | TypeKind::Tuple | TypeKind::List => {
                object_length(ob)
            }
            TypeKind::SeqIter => seq_iter_remaining(ob),
            _ => default,
        }
    }
}

/// Sorted list of the attribute names `ob` answers to.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_dir(ob: *mut RawObject) -> *mut RawObject {
    if ob.is_null() {
        return null_error();
    }
    let mut names = BTreeSet::new();
    names.insert("__class__".to_owned());

    // SAFETY: `ob` is live; the kind guards each cast.
    unsafe {
        match kind_of(ob) {
            TypeKind::Type => {
                names.insert("__name__".to_owned());
                if let Some(dict) = &as_type(ob).dict {
                    names.extend(dict.keys());
                }
            }
            TypeKind::Module => {
                let module = as_module(ob);
                names.insert("__name__".to_owned());
                names.extend(module.dict.keys());
                names.extend(module.methods.iter().map(|def| def.name.to_owned()));
            }
            TypeKind::Instance => {
                names.extend((*ob.cast::<InstanceObject>()).dict.keys());
                if let Some(dict) = &type_ref(ob).dict {
                    names.extend(dict.keys());
                }
            }
            _ => {}
        }
        names.extend(type_ref(ob).methods.iter().map(|def| def.name.to_owned()));
    }

    let items = names.iter().map(|name| unicode_from_str(name)).collect();
    // SAFETY: fresh references.
    unsafe { list_from_owned(items) }
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

/// `iter(ob)`. Returns a new iterator reference.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_get_iter(ob: *mut RawObject) -> *mut RawObject {
    if ob.is_null() {
        return null_error();
    }
    // SAFETY: `ob` is live.
    unsafe {
        match kind_of(ob) {
            TypeKind::Tuple | TypeKind::List | TypeKind::Str => seq_iter_new(ob),
            TypeKind::SeqIter => {
                incref(ob);
                ob
            }
            _ => raise_null(
                ErrorKind::TypeError,
                format!("'{}' object is not iterable", type_name(ob)),
            ),
        }
    }
}

/// Advances an iterator. Returns a new reference, or null once exhausted
/// (no error) or on failure (error pending).
///
/// # Safety
///
/// `it` must be null or point to a live object.
pub unsafe fn iter_next(it: *mut RawObject) -> *mut RawObject {
    if it.is_null() {
        return null_error();
    }
    // SAFETY: `it` is live.
    unsafe {
        if kind_of(it) == TypeKind::SeqIter {
            seq_iter_next(it)
        } else {
            raise_null(
                ErrorKind::TypeError,
                format!("'{}' object is not an iterator", type_name(it)),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

fn compare_numbers(x: Num, y: Num, op: CompareOp) -> bool {
    match (x, y) {
        (Num::Int(x), Num::Int(y)) => op.holds(x.cmp(&y)),
        _ => match x.as_f64().partial_cmp(&y.as_f64()) {
            Some(ord) => op.holds(ord),
            None => op == CompareOp::Ne,
        },
    }
}

unsafe fn compare_seqs(
    a: &[*mut RawObject],
    b: &[*mut RawObject],
    op: CompareOp,
) -> Option<bool> {
    for (&x, &y) in a.iter().zip(b) {
        if x == y {
            continue;
        }
        // SAFETY: items of live containers are live or null (rejected).
        match unsafe { object_rich_compare_bool(x, y, CompareOp::Eq) } {
            1 => continue,
            0 => {
                return match op {
                    CompareOp::Eq => Some(false),
                    CompareOp::Ne => Some(true),
                    // SAFETY: as above.
                    _ => unsafe { compare(x, y, op) },
                };
            }
            _ => return None,
        }
    }
    Some(op.holds(a.len().cmp(&b.len())))
}

unsafe fn compare(a: *mut RawObject, b: *mut RawObject, op: CompareOp) -> Option<bool> {
    if a.is_null() || b.is_null() {
        null_error::<RawObject>();
        return None;
    }
    // SAFETY: both operands are live.
    unsafe {
        if let (Some(x), Some(y)) = (num_value(a), num_value(b)) {
            return Some(compare_numbers(x, y, op));
        }
        match (kind_of(a), kind_of(b)) {
            (TypeKind::Str, TypeKind::Str) => {
                let (x, y) = (unicode_as_str(a), unicode_as_str(b));
                Some(op.holds(x.cmp(&y)))
            }
            (TypeKind::Bytes, TypeKind::Bytes) => {
                let (x, y) = (bytes_as_slice(a), bytes_as_slice(b));
                Some(op.holds(x.cmp(&y)))
            }
            (TypeKind::Tuple, TypeKind::Tuple) | (TypeKind::List, TypeKind::List) => {
                compare_seqs(seq_items(a), seq_items(b), op)
            }
            _ => match op {
                CompareOp::Eq => Some(a == b),
                CompareOp::Ne => Some(a != b),
                _ => {
                    err_set_string(
                        ErrorKind::TypeError,
                        format!(
                            "'{}' not supported between instances of '{}' and '{}'",
                            op.symbol(),
                            type_name(a),
                            type_name(b)
                        ),
                    );
                    None
                }
            },
        }
    }
}

/// Rich comparison. Returns a new reference to `True`/`False`, or null
/// with an error pending.
///
/// # Safety
///
/// `a` and `b` must be null or point to live objects.
pub unsafe fn object_rich_compare(
    a: *mut RawObject,
    b: *mut RawObject,
    op: CompareOp,
) -> *mut RawObject {
    // SAFETY: forwarded contract.
    match unsafe { compare(a, b, op) } {
        Some(result) => bool_from(result),
        None => ptr::null_mut(),
    }
}

/// Rich comparison as `1`/`0`, or `-1` with an error pending. Identical
/// objects are equal without consulting their values.
///
/// # Safety
///
/// `a` and `b` must be null or point to live objects.
pub unsafe fn object_rich_compare_bool(a: *mut RawObject, b: *mut RawObject, op: CompareOp) -> i32 {
    if !a.is_null() && a == b {
        match op {
            CompareOp::Eq => return 1,
            CompareOp::Ne => return 0,
            _ => {}
        }
    }
    // SAFETY: forwarded contract.
    match unsafe { compare(a, b, op) } {
        Some(result) => i32::from(result),
        None => -1,
    }
}

// ---------------------------------------------------------------------------
// Number protocol
// ---------------------------------------------------------------------------

fn overflow<T>(what: &str) -> *mut T {
    raise_null(ErrorKind::OverflowError, format!("integer overflow in {what}"))
}

unsafe fn unary(
    ob: *mut RawObject,
    symbol: &str,
    on_int: impl FnOnce(i128) -> Option<i128>,
    on_float: Option<fn(f64) -> f64>,
) -> *mut RawObject {
    if ob.is_null() {
        return null_error();
    }
    // SAFETY: `ob` is live.
    unsafe {
        match (num_value(ob), on_float) {
            (Some(Num::Int(v)), _) => match on_int(v) {
                Some(r) => long_from_i128(r),
                None => overflow(&format!("unary {symbol}")),
            },
            (Some(Num::Float(v)), Some(f)) => float_from_f64(f(v)),
            _ => raise_null(
                ErrorKind::TypeError,
                format!("bad operand type for unary {symbol}: '{}'", type_name(ob)),
            ),
        }
    }
}

/// `-ob`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn number_negative(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { unary(ob, "-", i128::checked_neg, Some(|v: f64| -v)) }
}

/// `+ob`. Integers and floats are returned as themselves; `bool`s become
/// `int`s.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn number_positive(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe {
        if !ob.is_null() && matches!(kind_of(ob), TypeKind::Int | TypeKind::Float) {
            incref(ob);
            return ob;
        }
        unary(ob, "+", Some, Some(|v: f64| v))
    }
}

/// `abs(ob)`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn number_absolute(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { unary(ob, "abs()", i128::checked_abs, Some(f64::abs)) }
}

/// `~ob`. Only integers support inversion.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn number_invert(ob: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { unary(ob, "~", |v| Some(!v), None) }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        }
    }

    fn ints(self, x: i128, y: i128) -> Option<i128> {
        match self {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
        }
    }

    fn floats(self, x: f64, y: f64) -> f64 {
        match self {
            BinOp::Add => x + y,
            BinOp::Sub => x - y,
            BinOp::Mul => x * y,
        }
    }
}

unsafe fn repeat(seq: *mut RawObject, times: i128) -> *mut RawObject {
    let times = usize::try_from(times).unwrap_or(0);
    // SAFETY: `seq` is a live sequence.
    unsafe {
        match kind_of(seq) {
            TypeKind::Str => {
                let s = unicode_as_str(seq).unwrap_or_default();
                match s.len().checked_mul(times) {
                    Some(_) => unicode_from_str(&s.repeat(times)),
                    None => raise_null(ErrorKind::OverflowError, "repeated string is too long"),
                }
            }
            TypeKind::Bytes => {
                let b = bytes_as_slice(seq).unwrap_or_default();
                match b.len().checked_mul(times) {
                    Some(_) => bytes_from_slice(&b.repeat(times)),
                    None => raise_null(ErrorKind::OverflowError, "repeated bytes are too long"),
                }
            }
            kind => {
                let items = seq_items(seq);
                if items.len().checked_mul(times).is_none_or(|n| n > isize::MAX as usize / 8) {
                    return raise_null(ErrorKind::OverflowError, "repeated sequence is too long");
                }
                if items.iter().any(|item| item.is_null()) {
                    return null_error();
                }
                let mut out = Vec::with_capacity(items.len() * times);
                for _ in 0..times {
                    for &item in items {
                        incref(item);
                        out.push(item);
                    }
                }
                if kind == TypeKind::Tuple {
                    tuple_from_owned(out)
                } else {
                    list_from_owned(out)
                }
            }
        }
    }
}

unsafe fn binary(a: *mut RawObject, b: *mut RawObject, op: BinOp) -> *mut RawObject {
    if a.is_null() || b.is_null() {
        return null_error();
    }
    // SAFETY: both operands are live.
    unsafe {
        if let (Some(x), Some(y)) = (num_value(a), num_value(b)) {
            return match (x, y) {
                (Num::Int(x), Num::Int(y)) => match op.ints(x, y) {
                    Some(r) => long_from_i128(r),
                    None => overflow(op.symbol()),
                },
                _ => float_from_f64(op.floats(x.as_f64(), y.as_f64())),
            };
        }

        let (ka, kb) = (kind_of(a), kind_of(b));
        let is_seq = |k: TypeKind| {
            matches!(k, TypeKind::Str | TypeKind::Bytes | TypeKind::Tuple | TypeKind::List)
        };
        match op {
            BinOp::Add if ka == kb && is_seq(ka) => match ka {
                TypeKind::Str => {
                    let (x, y) = (unicode_as_str(a).unwrap_or_default(), unicode_as_str(b).unwrap_or_default());
                    return unicode_from_str(&[x, y].concat());
                }
                TypeKind::Bytes => {
                    let (x, y) = (bytes_as_slice(a).unwrap_or_default(), bytes_as_slice(b).unwrap_or_default());
                    return bytes_from_slice(&[x, y].concat());
                }
                _ => {
                    let items: Vec<_> = seq_items(a).iter().chain(seq_items(b)).copied().collect();
                    if items.iter().any(|item| item.is_null()) {
                        return null_error();
                    }
                    for &item in &items {
                        incref(item);
                    }
                    return if ka == TypeKind::Tuple {
                        tuple_from_owned(items)
                    } else {
                        list_from_owned(items)
                    };
                }
            },
            BinOp::Mul if is_seq(ka) => {
                if let Some(n) = int_value(b) {
                    return repeat(a, n);
                }
            }
            BinOp::Mul if is_seq(kb) => {
                if let Some(n) = int_value(a) {
                    return repeat(b, n);
                }
            }
            _ => {}
        }

        raise_null(
            ErrorKind::TypeError,
            format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                type_name(a),
                type_name(b)
            ),
        )
    }
}

/// `a + b`.
///
/// # Safety
///
/// `a` and `b` must be null or point to live objects.
pub unsafe fn number_add(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { binary(a, b, BinOp::Add) }
}

/// `a - b`.
///
/// # Safety
///
/// `a` and `b` must be null or point to live objects.
pub unsafe fn number_subtract(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { binary(a, b, BinOp::Sub) }
}

/// `a * b`.
///
/// # Safety
///
/// `a` and `b` must be null or point to live objects.
pub unsafe fn number_multiply(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { binary(a, b, BinOp::Mul) }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

unsafe fn attr_name<'a>(name: *mut RawObject) -> Option<&'a str> {
    if name.is_null() {
        null_error::<RawObject>();
        return None;
    }
    // SAFETY: `name` is live.
    unsafe {
        let attr = unicode_as_str(name);
        if attr.is_none() {
            err_set_string(
                ErrorKind::TypeError,
                format!("attribute name must be string, not '{}'", type_name(name)),
            );
        }
        attr
    }
}

fn found(value: *mut RawObject) -> Option<*mut RawObject> {
    if value.is_null() {
        None
    } else {
        // SAFETY: namespace entries are live.
        unsafe { incref(value) };
        Some(value)
    }
}

/// `getattr(ob, name)` with a Rust string name.
///
/// Lookup order: `__class__`, then per kind (type: `__name__` and the type
/// namespace; module: `__name__`, its namespace and its function table;
/// instance: its own namespace then its type's), then the builtin methods
/// of `ob`'s type, bound to `ob`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn object_get_attr_str(ob: *mut RawObject, name: &str) -> *mut RawObject {
    if ob.is_null() {
        return null_error();
    }
    // SAFETY: `ob` is live; the kind guards each cast.
    unsafe {
        if name == "__class__" {
            let ty = type_of(ob);
            incref(ty);
            return ty;
        }
        match kind_of(ob) {
            TypeKind::Type => {
                let ty = as_type(ob);
                if name == "__name__" {
                    return unicode_from_str(ty.name());
                }
                if let Some(value) = ty.dict.as_ref().and_then(|dict| found(dict.get(name))) {
                    return value;
                }
                return raise_null(
                    ErrorKind::AttributeError,
                    format!("type object '{}' has no attribute '{name}'", ty.name()),
                );
            }
            TypeKind::Module => {
                let module = as_module(ob);
                if name == "__name__" {
                    return unicode_from_str(&module.name);
                }
                if let Some(value) = found(module.dict.get(name)) {
                    return value;
                }
                if let Some(def) = module.methods.iter().find(|def| def.name == name) {
                    return method_new(def, ob);
                }
                return raise_null(
                    ErrorKind::AttributeError,
                    format!("module '{}' has no attribute '{name}'", module.name),
                );
            }
            TypeKind::Instance => {
                let own = &(*ob.cast::<InstanceObject>()).dict;
                if let Some(value) = found(own.get(name)) {
                    return value;
                }
                if let Some(value) = type_ref(ob).dict.as_ref().and_then(|dict| found(dict.get(name))) {
                    return value;
                }
            }
            _ => {}
        }
        if let Some(def) = type_ref(ob).find_method(name) {
            return method_new(def, ob);
        }
        raise_null(
            ErrorKind::AttributeError,
            format!("'{}' object has no attribute '{name}'", type_name(ob)),
        )
    }
}

/// `getattr(ob, name)`. `name` must be a `str`.
///
/// # Safety
///
/// `ob` and `name` must be null or point to live objects.
pub unsafe fn object_get_attr(ob: *mut RawObject, name: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe {
        match attr_name(name) {
            Some(attr) => object_get_attr_str(ob, attr),
            None => ptr::null_mut(),
        }
    }
}

/// Sets (or with a null `value`, deletes) an attribute by Rust string
/// name. Only heap types, modules and instances accept attributes.
///
/// # Safety
///
/// `ob` must be null or point to a live object; `value` must be null or
/// live (a new reference is taken).
pub unsafe fn object_set_attr_str(ob: *mut RawObject, name: &str, value: *mut RawObject) -> i32 {
    if ob.is_null() {
        return null_error_int();
    }
    // SAFETY: `ob` is live; the kind guards each cast.
    unsafe {
        let dict = match kind_of(ob) {
            TypeKind::Type => match &as_type(ob).dict {
                Some(dict) => dict,
                None => {
                    return raise_int(
                        ErrorKind::TypeError,
                        format!(
                            "cannot set '{name}' attribute of immutable type '{}'",
                            as_type(ob).name()
                        ),
                    );
                }
            },
            TypeKind::Module => &as_module(ob).dict,
            TypeKind::Instance => &(*ob.cast::<InstanceObject>()).dict,
            _ => {
                let msg = if type_ref(ob).find_method(name).is_some() {
                    format!("'{}' object attribute '{name}' is read-only", type_name(ob))
                } else {
                    format!("'{}' object has no attribute '{name}'", type_name(ob))
                };
                return raise_int(ErrorKind::AttributeError, msg);
            }
        };

        if value.is_null() {
            if dict.remove(name) {
                0
            } else {
                raise_int(ErrorKind::AttributeError, name.to_owned())
            }
        } else {
            incref(value);
            dict.insert(name, value);
            0
        }
    }
}

/// `setattr(ob, name, value)`; a null `value` deletes.
///
/// # Safety
///
/// `ob`, `name` and `value` must be null or point to live objects.
pub unsafe fn object_set_attr(ob: *mut RawObject, name: *mut RawObject, value: *mut RawObject) -> i32 {
    // SAFETY: forwarded contract.
    unsafe {
        match attr_name(name) {
            Some(attr) => object_set_attr_str(ob, attr, value),
            None => -1,
        }
    }
}

/// `delattr(ob, name)`.
///
/// # Safety
///
/// `ob` and `name` must be null or point to live objects.
pub unsafe fn object_del_attr(ob: *mut RawObject, name: *mut RawObject) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { object_set_attr(ob, name, ptr::null_mut()) }
}

/// `hasattr(ob, name)`. Never leaves an error pending.
///
/// # Safety
///
/// `ob` and `name` must be null or point to live objects.
pub unsafe fn object_has_attr(ob: *mut RawObject, name: *mut RawObject) -> bool {
    // SAFETY: forwarded contract.
    unsafe {
        let value = object_get_attr(ob, name);
        if value.is_null() {
            err_clear();
            false
        } else {
            decref(value);
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

unsafe fn normalize_index(ob: *mut RawObject, key: *mut RawObject, len: isize) -> Option<isize> {
    // SAFETY: both are live.
    unsafe {
        let Some(raw) = int_value(key) else {
            err_set_string(
                ErrorKind::TypeError,
                format!(
                    "{} indices must be integers, not '{}'",
                    type_name(ob),
                    type_name(key)
                ),
            );
            return None;
        };
        let index = if raw < 0 { raw + len as i128 } else { raw };
        if index < 0 || index >= len as i128 {
            let what = match kind_of(ob) {
                TypeKind::Str => "string",
                _ => type_name(ob),
            };
            err_set_string(ErrorKind::IndexError, format!("{what} index out of range"));
            return None;
        }
        Some(index as isize)
    }
}

/// `ob[key]` for integer keys on the builtin sequences. Negative keys
/// count from the end.
///
/// # Safety
///
/// `ob` and `key` must be null or point to live objects.
pub unsafe fn object_get_item(ob: *mut RawObject, key: *mut RawObject) -> *mut RawObject {
    if ob.is_null() || key.is_null() {
        return null_error();
    }
    // SAFETY: both are live.
    unsafe {
        match kind_of(ob) {
            TypeKind::Tuple | TypeKind::List => {
                let items = seq_items(ob);
                let Some(i) = normalize_index(ob, key, items.len() as isize) else {
                    return ptr::null_mut();
                };
                let item = items[i as usize];
                if item.is_null() {
                    return raise_null(ErrorKind::SystemError, "uninitialized item");
                }
                incref(item);
                item
            }
            TypeKind::Str => {
                let s = unicode_as_str(ob).unwrap_or_default();
                let Some(i) = normalize_index(ob, key, unicode_len(ob) as isize) else {
                    return ptr::null_mut();
                };
                match s.chars().nth(i as usize) {
                    Some(c) => unicode_from_char(c),
                    None => null_error(),
                }
            }
            TypeKind::Bytes => {
                let b = bytes_as_slice(ob).unwrap_or_default();
                let Some(i) = normalize_index(ob, key, b.len() as isize) else {
                    return ptr::null_mut();
                };
                long_from_i64(i64::from(b[i as usize]))
            }
            _ => raise_null(
                ErrorKind::TypeError,
                format!("'{}' object is not subscriptable", type_name(ob)),
            ),
        }
    }
}

/// `ob[key] = value`. Only lists support item assignment; a new reference
/// to `value` is stored.
///
/// # Safety
///
/// `ob`, `key` and `value` must be null or point to live objects.
pub unsafe fn object_set_item(ob: *mut RawObject, key: *mut RawObject, value: *mut RawObject) -> i32 {
    if ob.is_null() || key.is_null() || value.is_null() {
        return null_error_int();
    }
    // SAFETY: all three are live.
    unsafe {
        if !list_check(ob) {
            return raise_int(
                ErrorKind::TypeError,
                format!("'{}' object does not support item assignment", type_name(ob)),
            );
        }
        let Some(i) = normalize_index(ob, key, list_size_unchecked(ob)) else {
            return -1;
        };
        incref(value);
        list_set_item(ob, i, value)
    }
}

// ---------------------------------------------------------------------------
// Calling
// ---------------------------------------------------------------------------

/// Whether `ob` can be called: types and bound methods.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn callable_check(ob: *mut RawObject) -> bool {
    // SAFETY: non-null checked first.
    !ob.is_null() && matches!(unsafe { kind_of(ob) }, TypeKind::Type | TypeKind::Method)
}

unsafe fn parse_int_text(text: &str) -> *mut RawObject {
    let cleaned: String = text.trim().chars().filter(|&c| c != '_').collect();
    match cleaned.parse::<i128>() {
        Ok(v) => long_from_i128(v),
        Err(_) => raise_null(
            ErrorKind::ValueError,
            format!("invalid literal for int() with base 10: {}", str_repr(text)),
        ),
    }
}

unsafe fn type_call(ty: *mut RawObject, args: &[*mut RawObject]) -> *mut RawObject {
    // SAFETY: `ty` is a live type; `args` are live items of the call tuple.
    unsafe {
        let meta = as_type(ty);
        let name = meta.name();
        let too_many = |max: usize| {
            raise_null::<RawObject>(
                ErrorKind::TypeError,
                format!("{name} expected at most {max} argument, got {}", args.len()),
            )
        };

        match meta.kind {
            TypeKind::Instance => {
                if args.is_empty() {
                    instance_new(ty)
                } else {
                    raise_null(ErrorKind::TypeError, format!("{name}() takes no arguments"))
                }
            }
            TypeKind::Type => match args {
                [ob] => {
                    let t = type_of(*ob);
                    incref(t);
                    t
                }
                [name, bases, namespace] => {
                    let Some(name) = unicode_as_str(*name) else {
                        return raise_null(ErrorKind::TypeError, "type() argument 1 must be str");
                    };
                    if !tuple_check(*bases) || tuple_size_unchecked(*bases) != 0 {
                        return raise_null(
                            ErrorKind::TypeError,
                            "type() bases other than () are not supported",
                        );
                    }
                    if !crate::object::is_none(*namespace) {
                        return raise_null(
                            ErrorKind::TypeError,
                            "type() namespace must be None",
                        );
                    }
                    type_new(name)
                }
                _ => raise_null(ErrorKind::TypeError, "type() takes 1 or 3 arguments"),
            },
            TypeKind::Tuple => match args {
                [] => tuple_new(0),
                [ob] if tuple_check(*ob) => {
                    incref(*ob);
                    *ob
                }
                [ob] => match collect_items(*ob) {
                    Some(items) => tuple_from_owned(items),
                    None => ptr::null_mut(),
                },
                _ => too_many(1),
            },
            TypeKind::List => match args {
                [] => list_new(0),
                [ob] => match collect_items(*ob) {
                    Some(items) => list_from_owned(items),
                    None => ptr::null_mut(),
                },
                _ => too_many(1),
            },
            TypeKind::Str => match args {
                [] => unicode_from_str(""),
                [ob] => object_str(*ob),
                _ => too_many(1),
            },
            TypeKind::Bytes => match args {
                [] => bytes_from_slice(b""),
                [ob] => object_bytes(*ob),
                _ => too_many(1),
            },
            TypeKind::Bool => match args {
                [] => bool_from(false),
                [ob] => match object_is_true(*ob) {
                    -1 => ptr::null_mut(),
                    truth => bool_from(truth == 1),
                },
                _ => too_many(1),
            },
            TypeKind::Int => match args {
                [] => long_from_i64(0),
                [ob] => match (num_value(*ob), unicode_as_str(*ob)) {
                    (Some(Num::Int(v)), _) => {
                        if kind_of(*ob) == TypeKind::Int {
                            incref(*ob);
                            *ob
                        } else {
                            long_from_i128(v)
                        }
                    }
                    (Some(Num::Float(v)), _) if v.is_nan() => {
                        raise_null(ErrorKind::ValueError, "cannot convert float NaN to integer")
                    }
                    (Some(Num::Float(v)), _) if v.is_infinite() || v.abs() >= 1.7e38 => {
                        raise_null(ErrorKind::OverflowError, "cannot convert float to integer")
                    }
                    (Some(Num::Float(v)), _) => long_from_i128(v.trunc() as i128),
                    (None, Some(text)) => parse_int_text(text),
                    (None, None) => raise_null(
                        ErrorKind::TypeError,
                        format!(
                            "int() argument must be a string or a real number, not '{}'",
                            type_name(*ob)
                        ),
                    ),
                },
                _ => too_many(1),
            },
            TypeKind::Float => match args {
                [] => float_from_f64(0.0),
                [ob] => match (num_value(*ob), unicode_as_str(*ob)) {
                    (Some(n), _) => {
                        if kind_of(*ob) == TypeKind::Float {
                            incref(*ob);
                            *ob
                        } else {
                            float_from_f64(n.as_f64())
                        }
                    }
                    (None, Some(text)) => match text.trim().parse::<f64>() {
                        Ok(v) => float_from_f64(v),
                        Err(_) => raise_null(
                            ErrorKind::ValueError,
                            format!("could not convert string to float: {}", str_repr(text)),
                        ),
                    },
                    (None, None) => raise_null(
                        ErrorKind::TypeError,
                        format!(
                            "float() argument must be a string or a real number, not '{}'",
                            type_name(*ob)
                        ),
                    ),
                },
                _ => too_many(1),
            },
            _ => raise_null(
                ErrorKind::TypeError,
                format!("cannot create '{name}' instances"),
            ),
        }
    }
}

/// `callable(*args)`. `args` must be a tuple.
///
/// # Safety
///
/// `callable` and `args` must be null or point to live objects.
pub unsafe fn object_call(callable: *mut RawObject, args: *mut RawObject) -> *mut RawObject {
    if callable.is_null() || args.is_null() {
        return null_error();
    }
    // SAFETY: both are live.
    unsafe {
        if !tuple_check(args) {
            return raise_null(ErrorKind::TypeError, "argument list must be a tuple");
        }
        match kind_of(callable) {
            TypeKind::Method => method_call(callable, args),
            TypeKind::Type => {
                let argv = seq_items(args);
                if argv.iter().any(|item| item.is_null()) {
                    return null_error();
                }
                type_call(callable, argv)
            }
            _ => raise_null(
                ErrorKind::TypeError,
                format!("'{}' object is not callable", type_name(callable)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{err_fetch, err_matches};
    use crate::list::{list_get_item, list_pack};
    use crate::number::{float_from_f64, long_as_i64};
    use crate::object::{ellipsis, none, refcnt};
    use crate::tuple::tuple_pack;
    use crate::typeobj::{INT_TYPE, LIST_TYPE, STR_TYPE, TUPLE_TYPE, TYPE_TYPE};

    unsafe fn repr_of(ob: *mut RawObject) -> String {
        unsafe { repr_string(ob).unwrap() }
    }

    unsafe fn owned_str(ob: *mut RawObject) -> String {
        unsafe {
            let s = unicode_as_str(ob).unwrap().to_owned();
            decref(ob);
            s
        }
    }

    #[test]
    fn test_reprs() {
        unsafe {
            let one = long_from_i64(1);
            let half = float_from_f64(1.5);
            let s = unicode_from_str("test");
            let t = tuple_pack(&[one]);
            let l = list_pack(&[one, half, s]);

            assert_eq!(repr_of(none()), "None");
            assert_eq!(repr_of(ellipsis()), "Ellipsis");
            assert_eq!(repr_of(t), "(1,)");
            assert_eq!(repr_of(l), "[1, 1.5, 'test']");
            assert_eq!(repr_of(INT_TYPE.as_object()), "<class 'int'>");
            assert_eq!(repr_of(ptr::null_mut()), "<NULL>");
            assert_eq!(owned_str(object_str(s)), "test");
            assert_eq!(owned_str(object_str(half)), "1.5");

            decref(l);
            decref(t);
            decref(s);
            decref(half);
            decref(one);
        }
    }

    #[test]
    fn test_self_referential_list_repr() {
        unsafe {
            let l = list_new(0);
            crate::list::list_append(l, l);
            assert_eq!(repr_of(l), "[[...]]");
            // break the cycle before releasing
            list_set_item(l, 0, crate::number::bool_from(true));
            decref(l);
        }
    }

    #[test]
    fn test_ascii_and_bytes() {
        unsafe {
            let s = unicode_from_str("é");
            assert_eq!(owned_str(object_ascii(s)), "'\\xe9'");

            let a = long_from_i64(104);
            let b = long_from_i64(105);
            let l = list_pack(&[a, b]);
            let bytes = object_bytes(l);
            assert_eq!(bytes_as_slice(bytes), Some(&b"hi"[..]));
            decref(bytes);

            assert!(object_bytes(s).is_null());
            assert!(err_matches(ErrorKind::TypeError));
            err_clear();

            let null_bytes = object_bytes(ptr::null_mut());
            assert_eq!(bytes_as_slice(null_bytes), Some(&b"<NULL>"[..]));
            decref(null_bytes);

            decref(l);
            decref(a);
            decref(b);
            decref(s);
        }
    }

    #[test]
    fn test_hash() {
        unsafe {
            let one = long_from_i64(1);
            let one_f = float_from_f64(1.0);
            let minus_one = long_from_i64(-1);
            let t1 = tuple_pack(&[one]);
            let t2 = tuple_pack(&[one_f]);
            let l = list_new(0);

            assert_eq!(object_hash(one), 1);
            assert_eq!(object_hash(one_f), 1);
            assert_eq!(object_hash(crate::number::bool_from(true)), 1);
            assert_eq!(object_hash(minus_one), -2);
            assert_eq!(object_hash(t1), object_hash(t2));

            let s1 = unicode_from_str("abc");
            let s2 = unicode_from_str("abc");
            assert_eq!(object_hash(s1), object_hash(s2));

            assert_eq!(object_hash(l), -1);
            assert_eq!(err_fetch().unwrap().message, "unhashable type: 'list'");
            assert_eq!(object_hash(ptr::null_mut()), -1);
            assert!(err_matches(ErrorKind::SystemError));
            err_clear();

            for ob in [one, one_f, minus_one, t1, t2, l, s1, s2] {
                decref(ob);
            }
        }
    }

    #[test]
    fn test_truth_and_length() {
        unsafe {
            let zero = long_from_i64(0);
            let empty = unicode_from_str("");
            let word = unicode_from_str("wörd");
            assert_eq!(object_is_true(none()), 0);
            assert_eq!(object_is_true(zero), 0);
            assert_eq!(object_is_true(empty), 0);
            assert_eq!(object_is_true(word), 1);
            assert_eq!(object_is_true(ptr::null_mut()), -1);
            err_clear();

            assert_eq!(object_length(word), 4);
            assert_eq!(object_length(zero), -1);
            assert_eq!(
                err_fetch().unwrap().message,
                "object of type 'int' has no len()"
            );
            assert_eq!(object_length_hint(zero, 7), 7);
            assert!(err_occurred().is_none());

            let it = object_get_iter(word);
            assert_eq!(object_length_hint(it, 0), 4);
            decref(iter_next(it));
            assert_eq!(object_length_hint(it, 0), 3);
            decref(it);

            decref(zero);
            decref(empty);
            decref(word);
        }
    }

    #[test]
    fn test_dir_names_are_gettable() {
        unsafe {
            let s = unicode_from_str("test");
            let names = object_dir(s);
            let mut seen = Vec::new();
            for &name in seq_items(names) {
                let attr = object_get_attr(s, name);
                assert!(!attr.is_null());
                decref(attr);
                seen.push(unicode_as_str(name).unwrap().to_owned());
            }
            assert_eq!(seen, ["__class__", "upper"]);
            decref(names);
            decref(s);
        }
    }

    #[test]
    fn test_comparisons() {
        unsafe {
            let one = long_from_i64(1);
            let two = long_from_i64(2);
            let one_f = float_from_f64(1.0);
            let a = unicode_from_str("a");
            let b = unicode_from_str("b");

            assert_eq!(object_rich_compare_bool(one, two, CompareOp::Lt), 1);
            assert_eq!(object_rich_compare_bool(one, one_f, CompareOp::Eq), 1);
            assert_eq!(object_rich_compare_bool(a, b, CompareOp::Ge), 0);
            assert_eq!(object_rich_compare_bool(one, a, CompareOp::Eq), 0);
            assert_eq!(object_rich_compare_bool(one, a, CompareOp::Ne), 1);

            assert_eq!(object_rich_compare_bool(one, a, CompareOp::Lt), -1);
            assert_eq!(
                err_fetch().unwrap().message,
                "'<' not supported between instances of 'int' and 'str'"
            );

            let t1 = tuple_pack(&[one, a]);
            let t2 = tuple_pack(&[one_f, b]);
            let t3 = tuple_pack(&[one]);
            assert_eq!(object_rich_compare_bool(t1, t2, CompareOp::Lt), 1);
            assert_eq!(object_rich_compare_bool(t3, t1, CompareOp::Lt), 1);
            assert_eq!(object_rich_compare_bool(t1, t1, CompareOp::Eq), 1);

            let r = object_rich_compare(one, two, CompareOp::Ge);
            assert_eq!(int_value(r), Some(0));
            decref(r);

            for ob in [t1, t2, t3, one, two, one_f, a, b] {
                decref(ob);
            }
        }
    }

    #[test]
    fn test_number_protocol() {
        unsafe {
            let three = long_from_i64(3);
            let half = float_from_f64(0.5);
            let s = unicode_from_str("ab");

            let neg = number_negative(three);
            assert_eq!(long_as_i64(neg), -3);
            let abs = number_absolute(neg);
            assert_eq!(long_as_i64(abs), 3);
            let inv = number_invert(three);
            assert_eq!(long_as_i64(inv), -4);
            let pos = number_positive(three);
            assert_eq!(pos, three);

            let sum = number_add(three, half);
            assert_eq!(repr_of(sum), "3.5");
            let diff = number_subtract(three, three);
            assert_eq!(long_as_i64(diff), 0);
            let rep = number_multiply(s, three);
            assert_eq!(repr_of(rep), "'ababab'");
            let cat = number_add(s, s);
            assert_eq!(repr_of(cat), "'abab'");

            assert!(number_invert(half).is_null());
            assert_eq!(
                err_fetch().unwrap().message,
                "bad operand type for unary ~: 'float'"
            );
            assert!(number_add(three, s).is_null());
            assert_eq!(
                err_fetch().unwrap().message,
                "unsupported operand type(s) for +: 'int' and 'str'"
            );
            assert!(number_negative(s).is_null());
            err_clear();

            let max = long_from_i128(i128::MAX);
            assert!(number_add(max, three).is_null());
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::OverflowError);

            for ob in [neg, abs, inv, pos, sum, diff, rep, cat, max, three, half, s] {
                decref(ob);
            }
        }
    }

    #[test]
    fn test_attributes_on_heap_type() {
        unsafe {
            let c = type_new("C");
            let name = unicode_from_str("test");
            let value = long_from_i64(1);

            assert!(!object_has_attr(c, name));
            assert!(err_occurred().is_none());
            assert_eq!(object_set_attr(c, name, value), 0);
            assert!(object_has_attr(c, name));
            let got = object_get_attr(c, name);
            assert_eq!(got, value);
            decref(got);
            assert_eq!(object_del_attr(c, name), 0);
            assert!(!object_has_attr(c, name));
            assert_eq!(object_del_attr(c, name), -1);
            assert!(err_matches(ErrorKind::AttributeError));
            err_clear();

            let inst = object_call(c, tuple_new(0));
            assert_eq!(object_set_attr_str(c, "shared", value), 0);
            let shared = object_get_attr_str(inst, "shared");
            assert_eq!(shared, value);
            decref(shared);
            assert_eq!(object_set_attr_str(inst, "own", value), 0);
            assert_eq!(refcnt(value), 3);

            decref(inst);
            decref(c);
            assert_eq!(refcnt(value), 1);
            decref(value);
            decref(name);
        }
    }

    #[test]
    fn test_attributes_on_builtins() {
        unsafe {
            let s = unicode_from_str("x");
            let upper = object_get_attr_str(s, "upper");
            assert!(callable_check(upper));
            let result = object_call(upper, tuple_new(0));
            assert_eq!(repr_of(result), "'X'");
            decref(result);
            decref(upper);

            assert_eq!(object_set_attr_str(s, "upper", none()), -1);
            assert_eq!(
                err_fetch().unwrap().message,
                "'str' object attribute 'upper' is read-only"
            );
            assert_eq!(object_set_attr_str(INT_TYPE.as_object(), "x", none()), -1);
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::TypeError);

            let bad_name = long_from_i64(0);
            assert!(object_get_attr(s, bad_name).is_null());
            assert_eq!(
                err_fetch().unwrap().message,
                "attribute name must be string, not 'int'"
            );
            decref(bad_name);
            decref(s);
        }
    }

    #[test]
    fn test_items() {
        unsafe {
            let items: Vec<_> = (1..=3).map(long_from_i64).collect();
            let l = list_pack(&items);
            let t = tuple_pack(&items);
            let zero = long_from_i64(0);
            let minus_one = long_from_i64(-1);
            let neg = number_negative(zero);

            let last = object_get_item(t, minus_one);
            assert_eq!(last, items[2]);
            decref(last);

            assert_eq!(object_set_item(l, zero, neg), 0);
            assert_eq!(long_as_i64(list_get_item(l, 0)), 0);
            assert_eq!(object_rich_compare_bool(list_get_item(l, 0), neg, CompareOp::Eq), 1);

            assert_eq!(object_set_item(t, zero, neg), -1);
            assert_eq!(
                err_fetch().unwrap().message,
                "'tuple' object does not support item assignment"
            );
            let big = long_from_i64(10);
            assert!(object_get_item(l, big).is_null());
            assert_eq!(err_fetch().unwrap().message, "list index out of range");
            assert!(object_get_item(zero, zero).is_null());
            assert_eq!(err_fetch().unwrap().message, "'int' object is not subscriptable");

            for ob in [l, t, zero, minus_one, neg, big] {
                decref(ob);
            }
            for ob in items {
                assert_eq!(refcnt(ob), 1);
                decref(ob);
            }
        }
    }

    #[test]
    fn test_calling_builtin_types() {
        unsafe {
            let one = long_from_i64(1);
            let pair = tuple_pack(&[one, one]);

            let empty_args = tuple_new(0);
            let empty = object_call(TUPLE_TYPE.as_object(), empty_args);
            assert_eq!(repr_of(empty), "()");

            let args = tuple_pack(&[pair]);
            let same = object_call(TUPLE_TYPE.as_object(), args);
            assert_eq!(same, pair);
            let as_list = object_call(LIST_TYPE.as_object(), args);
            assert_eq!(repr_of(as_list), "[1, 1]");
            let ty = object_call(TYPE_TYPE.as_object(), args);
            assert_eq!(ty, TUPLE_TYPE.as_object());
            let text = object_call(STR_TYPE.as_object(), args);
            assert_eq!(repr_of(text), "'(1, 1)'");

            assert!(object_call(one, empty_args).is_null());
            assert_eq!(err_fetch().unwrap().message, "'int' object is not callable");

            let name = unicode_from_str("C");
            let ns_args = tuple_pack(&[name, empty, none()]);
            let c = object_call(TYPE_TYPE.as_object(), ns_args);
            assert_eq!(repr_of(c), "<class 'C'>");

            for ob in [empty_args, empty, args, same, as_list, ty, text, name, ns_args, c, pair, one] {
                decref(ob);
            }
        }
    }

    #[test]
    fn test_iteration_errors() {
        unsafe {
            let one = long_from_i64(1);
            assert!(object_get_iter(one).is_null());
            assert_eq!(err_fetch().unwrap().message, "'int' object is not iterable");
            assert!(iter_next(one).is_null());
            assert_eq!(err_fetch().unwrap().message, "'int' object is not an iterator");
            decref(one);
        }
    }

    #[test]
    fn test_null_argument_keeps_pending_error() {
        let null = ptr::null_mut();
        let one = long_from_i64(1);
        let raises: [(&str, fn(*mut RawObject, *mut RawObject) -> bool); 12] = [
            ("hash", |ob, _| unsafe { object_hash(ob) } == -1),
            ("truth", |ob, _| unsafe { object_is_true(ob) } == -1),
            ("len", |ob, _| unsafe { object_length(ob) } == -1),
            ("lenhint", |ob, _| unsafe { object_length_hint(ob, 0) } == -1),
            ("dir", |ob, _| unsafe { object_dir(ob) }.is_null()),
            ("iter", |ob, _| unsafe { object_get_iter(ob) }.is_null()),
            ("compare", |ob, other| {
                unsafe { object_rich_compare(ob, other, CompareOp::Lt) }.is_null()
            }),
            ("neg", |ob, _| unsafe { number_negative(ob) }.is_null()),
            ("add", |ob, other| unsafe { number_add(other, ob) }.is_null()),
            ("getattr", |ob, _| unsafe { object_get_attr_str(ob, "real") }.is_null()),
            ("setitem", |ob, other| unsafe { object_set_item(other, ob, other) } == -1),
            ("call", |ob, other| unsafe { object_call(ob, other) }.is_null()),
        ];
        for (name, failed) in raises {
            err_set_string(ErrorKind::AttributeError, "first");
            assert!(failed(null, one), "{name} accepted null");
            let err = err_fetch().unwrap();
            assert_eq!((err.kind, err.message.as_str()), (ErrorKind::AttributeError, "first"), "{name}");

            assert!(failed(null, one), "{name} accepted null");
            assert!(err_matches(ErrorKind::SystemError), "{name}");
            err_clear();
        }
        unsafe { decref(one) };
    }
}
