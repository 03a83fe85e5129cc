//! Native functions exposed to the runtime.
//!
//! A [`MethodDef`] is the registration record for one native entry point:
//! its exposed name, the function pointer, the calling convention and an
//! optional docstring. Type objects and modules carry `&'static` tables of
//! them; attribute lookup binds a definition to its receiver and yields a
//! method object that can be called like any other callable.

use crate::error::{ErrorKind, err_occurred, err_set_string};
use crate::object::{RawObject, free, into_raw, xdecref, xincref};
use crate::tuple::{tuple_check, tuple_size_unchecked};
use crate::typeobj::METHOD_TYPE;
use libpy_log::trace;

/// Signature of a native entry point.
///
/// The first argument is the receiver (the bound object, or the module for
/// module-level functions). The second is the argument tuple for
/// [`CallConv::VarArgs`] and null for [`CallConv::NoArgs`]. The result is a
/// new reference, or null with an error pending.
pub type CFunction =
    unsafe extern "C" fn(slf: *mut RawObject, args: *mut RawObject) -> *mut RawObject;

/// How the runtime passes arguments to a [`CFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallConv {
    /// Positional arguments packed in a tuple.
    VarArgs,
    /// No arguments; the second parameter is null.
    NoArgs,
}

/// Registration record for a native function.
#[derive(Debug, Clone, Copy)]
pub struct MethodDef {
    /// Name the function is exposed under.
    pub name: &'static str,
    /// The entry point.
    pub meth: CFunction,
    /// Calling convention of `meth`.
    pub flags: CallConv,
    /// Docstring, if any.
    pub doc: Option<&'static str>,
}

impl MethodDef {
    /// Creates a registration record. Usable in `static` tables.
    pub const fn new(
        name: &'static str,
        meth: CFunction,
        flags: CallConv,
        doc: Option<&'static str>,
    ) -> Self {
        MethodDef {
            name,
            meth,
            flags,
            doc,
        }
    }
}

/// A [`MethodDef`] bound to a receiver.
#[repr(C)]
pub struct MethodObject {
    head: RawObject,
    pub(crate) def: &'static MethodDef,
    /// Owned reference, or null.
    pub(crate) slf: *mut RawObject,
}

/// Binds `def` to `slf`, returning a new reference.
///
/// # Safety
///
/// `slf` must be null or point to a live object.
pub unsafe fn method_new(def: &'static MethodDef, slf: *mut RawObject) -> *mut RawObject {
    // SAFETY: forwarded contract.
    unsafe { xincref(slf) };
    into_raw(Box::new(MethodObject {
        head: RawObject::new(&METHOD_TYPE),
        def,
        slf,
    }))
}

/// Invokes a bound method with an argument tuple.
///
/// Checks the calling convention, then the result against the pending
/// error state: a null result without an error, or a value with one, is a
/// `SystemError`.
///
/// # Safety
///
/// `method` must be a live method object and `args` a live tuple.
pub(crate) unsafe fn method_call(method: *mut RawObject, args: *mut RawObject) -> *mut RawObject {
    // SAFETY: caller guarantees `method` is a method object.
    let (def, slf) = unsafe {
        let m = &*method.cast::<MethodObject>();
        (m.def, m.slf)
    };

    // SAFETY: caller guarantees `args` is live.
    if !unsafe { tuple_check(args) } {
        err_set_string(ErrorKind::TypeError, "argument list must be a tuple");
        return std::ptr::null_mut();
    }

    let result = match def.flags {
        // SAFETY: entry point contract; `args` is a tuple.
        CallConv::VarArgs => unsafe { (def.meth)(slf, args) },
        CallConv::NoArgs => {
            // SAFETY: `args` is a tuple.
            let given = unsafe { tuple_size_unchecked(args) };
            if given != 0 {
                err_set_string(
                    ErrorKind::TypeError,
                    format!("{}() takes no arguments ({given} given)", def.name),
                );
                return std::ptr::null_mut();
            }
            // SAFETY: entry point contract.
            unsafe { (def.meth)(slf, std::ptr::null_mut()) }
        }
    };

    match (result.is_null(), err_occurred()) {
        (true, None) => {
            err_set_string(
                ErrorKind::SystemError,
                format!("{}() returned NULL without setting an error", def.name),
            );
            std::ptr::null_mut()
        }
        (false, Some(_)) => {
            trace!("{}() returned a value with an error set", def.name);
            // SAFETY: we own the result and discard it.
            unsafe { xdecref(result) };
            err_set_string(
                ErrorKind::SystemError,
                format!("{}() returned a result with an error set", def.name),
            );
            std::ptr::null_mut()
        }
        _ => result,
    }
}

pub(crate) unsafe fn dealloc(ob: *mut RawObject) {
    // SAFETY: `ob` is a dying method object.
    unsafe {
        let slf = (*ob.cast::<MethodObject>()).slf;
        free::<MethodObject>(ob);
        xdecref(slf);
    }
}
