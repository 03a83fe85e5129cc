//! Attribute namespaces for modules, heap types and instances.

use crate::object::{RawObject, Slot, decref};
use fxhash::FxHashMap;
use std::sync::{PoisonError, RwLock};

/// A name to object table owning one reference per entry.
pub(crate) struct Namespace {
    entries: RwLock<FxHashMap<Box<str>, Slot>>,
}

impl Namespace {
    pub(crate) fn new() -> Self {
        Namespace {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Borrowed lookup; null when absent.
    pub(crate) fn get(&self, name: &str) -> *mut RawObject {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).map_or(std::ptr::null_mut(), |slot| slot.0)
    }

    /// Binds `name`, stealing `value`. A replaced value is released after
    /// the lock is dropped, since its deallocation may touch other
    /// namespaces.
    pub(crate) unsafe fn insert(&self, name: &str, value: *mut RawObject) {
        let old = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(name.into(), Slot(value))
        };
        if let Some(Slot(old)) = old {
            // SAFETY: the table owned this reference.
            unsafe { decref(old) };
        }
    }

    /// Unbinds `name`. Returns `false` if it was not bound.
    pub(crate) unsafe fn remove(&self, name: &str) -> bool {
        let old = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.remove(name)
        };
        match old {
            Some(Slot(old)) => {
                // SAFETY: the table owned this reference.
                unsafe { decref(old) };
                true
            }
            None => false,
        }
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().map(|k| k.to_string()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for Namespace {
    fn drop(&mut self) {
        let entries = std::mem::take(
            self.entries.get_mut().unwrap_or_else(PoisonError::into_inner),
        );
        for (_, Slot(value)) in entries {
            // SAFETY: each entry owned one reference.
            unsafe { decref(value) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::long_from_i64;
    use crate::object::{incref, refcnt};

    #[test]
    fn test_insert_get_remove() {
        let ns = Namespace::new();
        let value = long_from_i64(4242);
        unsafe {
            incref(value);
            ns.insert("answer", value);
            assert_eq!(refcnt(value), 2);
            assert_eq!(ns.get("answer"), value);
            assert!(ns.get("missing").is_null());
            assert_eq!(ns.keys(), vec!["answer".to_string()]);

            assert!(ns.remove("answer"));
            assert!(!ns.remove("answer"));
            assert_eq!(refcnt(value), 1);
            decref(value);
        }
        assert_eq!(ns.len(), 0);
    }

    #[test]
    fn test_replace_releases_old_value() {
        let ns = Namespace::new();
        let first = long_from_i64(1000);
        unsafe {
            incref(first);
            ns.insert("x", first);
            ns.insert("x", long_from_i64(2000));
            assert_eq!(refcnt(first), 1);
            decref(first);
        }
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_drop_releases_entries() {
        let value = long_from_i64(77777);
        unsafe {
            incref(value);
            {
                let ns = Namespace::new();
                ns.insert("v", value);
                assert_eq!(refcnt(value), 2);
            }
            assert_eq!(refcnt(value), 1);
            decref(value);
        }
    }
}
