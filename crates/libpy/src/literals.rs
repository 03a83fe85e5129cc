//! Cached literal objects.
//!
//! `lit(v)` returns the runtime object for a Rust constant. Each distinct
//! value is created once per process and kept in a cache that owns one
//! reference to it; callers get a borrowed handle that stays valid for the
//! life of the process. Equal values always yield the same pointer, so
//! `lit(1).is(&lit(1i64))` holds.
//!
//! Integers share one cache keyed by value, floats are keyed by their bit
//! pattern (`0.0` and `-0.0` are distinct entries), strings by content.
//! The caches grow without bound.
//!
//! Releasing a literal handle is not possible outside `unsafe`:
//!
//! ```compile_fail,E0133
//! let mut one = libpy::lit(424_242_424i64);
//! one.decref();
//! ```
//!
//! ```compile_fail,E0133
//! drop(libpy::lit("owned by the cache").as_tmpref());
//! ```

use crate::object::Object;
use fxhash::FxHashMap;
use libpy_host::RawObject;
use libpy_log::debug;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{LazyLock, Mutex};

type Cache<K> = LazyLock<Mutex<FxHashMap<K, Object>>>;

static INTS: Cache<i128> = LazyLock::new(Default::default);
static FLOATS: Cache<u64> = LazyLock::new(Default::default);
static STRS: Cache<&'static str> = LazyLock::new(Default::default);
static CHARS: Cache<char> = LazyLock::new(Default::default);

/// Rust constants with a runtime counterpart.
pub trait Lit {
    /// The cached runtime object for `self` (borrowed).
    ///
    /// Null with an error pending if the object could not be created; a
    /// failed creation is not cached.
    fn lit(self) -> Object;
}

/// The cached runtime object for `value` (borrowed).
///
/// ```rust
/// use libpy::lit;
///
/// assert!(lit("test").is(&lit("test")));
/// assert_eq!(lit(1.5).to_string(), "1.5");
/// assert_eq!(lit('c').len(), 1);
/// ```
#[must_use]
pub fn lit<T: Lit>(value: T) -> Object {
    value.lit()
}

fn cached<K>(cache: &Mutex<FxHashMap<K, Object>>, key: K, make: impl FnOnce() -> *mut RawObject) -> Object
where
    K: Hash + Eq + Debug,
{
    let mut map = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(ob) = map.get(&key) {
        return ob.clone();
    }
    // SAFETY: constructors return a new reference or null.
    let ob = unsafe { Object::from_raw(make()) };
    if ob.is_nonnull() {
        debug!("caching literal {key:?} at {:p}", ob.as_ptr());
        map.insert(key, ob.clone());
    }
    ob
}

impl Lit for i32 {
    fn lit(self) -> Object {
        i128::from(self).lit()
    }
}

impl Lit for i64 {
    fn lit(self) -> Object {
        i128::from(self).lit()
    }
}

impl Lit for u64 {
    fn lit(self) -> Object {
        i128::from(self).lit()
    }
}

impl Lit for i128 {
    fn lit(self) -> Object {
        cached(&INTS, self, || libpy_host::long_from_i128(self))
    }
}

impl Lit for f64 {
    fn lit(self) -> Object {
        cached(&FLOATS, self.to_bits(), || libpy_host::float_from_f64(self))
    }
}

impl Lit for &'static str {
    fn lit(self) -> Object {
        cached(&STRS, self, || libpy_host::unicode_from_str(self))
    }
}

impl Lit for char {
    fn lit(self) -> Object {
        cached(&CHARS, self, || libpy_host::unicode_from_char(self))
    }
}

impl Lit for bool {
    /// `True` and `False` are static; nothing is cached.
    fn lit(self) -> Object {
        // SAFETY: the singletons are immortal.
        unsafe { Object::from_raw(libpy_host::bool_from(self)) }
    }
}
