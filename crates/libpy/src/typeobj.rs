//! Typed handles to runtime type objects.

use crate::object::Object;
use crate::tuple::Tuple;
use libpy_host::RawObject;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

/// A type object whose instances are wrapped as `T` when it is called.
pub struct TypeObject<T> {
    ob: Object,
    _instances: PhantomData<fn() -> T>,
}

impl<T> TypeObject<T> {
    /// Wraps a static type object.
    #[must_use]
    pub const fn from_static(ty: &'static libpy_host::TypeObject) -> Self {
        let ptr = (ty as *const libpy_host::TypeObject).cast_mut().cast::<RawObject>();
        TypeObject {
            // SAFETY: static type objects are immortal.
            ob: unsafe { Object::from_raw(ptr) },
            _instances: PhantomData,
        }
    }

    /// The type as a generic handle (borrowed).
    #[must_use]
    pub fn as_object(&self) -> &Object {
        &self.ob
    }
}

impl<T: From<Object>> TypeObject<T> {
    /// Calls the type with `args`. The result is kind-checked into `T`.
    #[must_use]
    pub fn call(&self, args: &Tuple) -> T {
        T::from(self.ob.call(args))
    }

    /// Calls the type with no arguments.
    #[must_use]
    pub fn call0(&self) -> T {
        let mut args = Tuple::new(0);
        let result = self.call(&args);
        // SAFETY: the argument tuple was created here.
        unsafe { args.decref() };
        result
    }

    /// Calls the type with a single argument.
    #[must_use]
    pub fn call1(&self, arg: &Object) -> T {
        let mut args = Tuple::pack(std::slice::from_ref(arg));
        let result = self.call(&args);
        // SAFETY: the argument tuple was created here.
        unsafe { args.decref() };
        result
    }
}

impl<T> Deref for TypeObject<T> {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.ob
    }
}

impl<T> fmt::Debug for TypeObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeObject({})", self.ob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literals::lit;
    use crate::{List, list, tuple};

    #[test]
    fn test_tuple_type_calls() {
        let mut empty = tuple::TYPE.call0();
        assert!(empty.type_().is(&tuple::TYPE));
        assert_eq!(empty.len(), 0);

        let mut packed = Tuple::pack(&[lit(0), lit(1)]);
        let mut copy = tuple::TYPE.call1(&packed);
        assert!(copy.is(&packed));
        assert_eq!(copy.eq(&packed).istrue(), 1);

        unsafe { copy.decref() };
        unsafe { packed.decref() };
        unsafe { empty.decref() };
    }

    #[test]
    fn test_list_type_from_tuple() {
        let mut packed = Tuple::pack(&[lit(0), lit(1)]);
        let mut l: List = list::TYPE.call1(&packed);
        assert_eq!(l.len(), 2);
        assert!(l.item(1).is(&lit(1)));
        assert_eq!(format!("{:?}", list::TYPE), "TypeObject(<class 'list'>)");
        unsafe { l.decref() };
        unsafe { packed.decref() };
    }
}
