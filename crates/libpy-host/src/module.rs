//! Modules: a name, a table of native functions and an attribute namespace.
//!
//! Functions in the table are bound lazily. Every attribute lookup creates a
//! fresh method object holding a reference to the module; the module itself
//! never stores them, so no reference cycle forms.

use crate::method::MethodDef;
use crate::namespace::Namespace;
use crate::object::{RawObject, free, into_raw};
use crate::typeobj::MODULE_TYPE;

/// A module object.
#[repr(C)]
pub struct ModuleObject {
    head: RawObject,
    pub(crate) name: Box<str>,
    pub(crate) methods: &'static [MethodDef],
    pub(crate) dict: Namespace,
}

/// Creates a module exposing `methods`. Returns a new reference.
pub fn module_new(name: &str, methods: &'static [MethodDef]) -> *mut RawObject {
    into_raw(Box::new(ModuleObject {
        head: RawObject::new(&MODULE_TYPE),
        name: name.into(),
        methods,
        dict: Namespace::new(),
    }))
}

pub(crate) unsafe fn as_module<'a>(ob: *mut RawObject) -> &'a ModuleObject {
    // SAFETY: caller guarantees the kind.
    unsafe { &*ob.cast::<ModuleObject>() }
}

pub(crate) unsafe fn dealloc(ob: *mut RawObject) {
    // SAFETY: `ob` is a dying module; dropping it releases the namespace.
    unsafe { free::<ModuleObject>(ob) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::long_from_i64;
    use crate::object::{decref, refcnt};
    use crate::protocol::{object_get_attr_str, object_set_attr_str};

    #[test]
    fn test_namespace_holds_reference() {
        let m = module_new("demo", &[]);
        let v = long_from_i64(123_456);
        unsafe {
            assert_eq!(object_set_attr_str(m, "v", v), 0);
            assert_eq!(refcnt(v), 2);
            assert_eq!(as_module(m).dict.get("v"), v);

            let name = object_get_attr_str(m, "__name__");
            assert_eq!(crate::text::unicode_as_str(name), Some("demo"));
            decref(name);

            decref(m);
            assert_eq!(refcnt(v), 1);
            decref(v);
        }
    }
}
