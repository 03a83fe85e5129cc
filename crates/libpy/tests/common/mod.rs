// Shared helpers for libpy integration tests.

#![allow(dead_code)]

use libpy::host::typeobj::TYPE_TYPE;
use libpy::{List, Object, Tuple, TypeObject, lit};
use std::sync::Once;

/// The `type` metatype, called to create heap classes.
pub static TYPE: TypeObject<Object> = TypeObject::from_static(&TYPE_TYPE);

/// Applies `LIBPY_LOG` once per test binary.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        libpy_log::init_from_env();
    });
}

/// `type(name, (), None)`. Owning.
pub fn make_class(name: &'static str) -> Object {
    init_logging();
    let mut bases = Tuple::new(0);
    let mut args = Tuple::pack(&[lit(name), bases.as_object().clone(), Object::none()]);
    let class = TYPE.call(&args);
    unsafe { args.decref() };
    unsafe { bases.decref() };
    assert!(class.is_nonnull(), "class creation failed");
    class
}

/// A fresh instance of `class`. Owning.
pub fn instantiate(class: &Object) -> Object {
    let mut args = Tuple::new(0);
    let instance = class.call(&args);
    unsafe { args.decref() };
    instance
}

/// `[1, 2, 3]`. Owning.
pub fn container() -> List {
    init_logging();
    List::pack(&[lit(1), lit(2), lit(3)])
}

/// Takes the pending error message, panicking if nothing is pending.
pub fn take_error() -> String {
    libpy::host::err_fetch()
        .map(|err| err.message)
        .expect("an error should be pending")
}
