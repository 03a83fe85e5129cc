//! Native entry points generated from typed Rust functions.
//!
//! A function `fn(Object, A0, A1, ..) -> R` becomes a [`CFunction`] by
//! deriving the argument format from the parameter types, parsing the
//! runtime's argument tuple into a tuple of placeholders, and spreading the
//! parsed values (receiver first) into the function. The return value is
//! converted by [`IntoReturn`].
//!
//! ```rust
//! use libpy::{MethodDef, Object, automethod, lit};
//! use libpy::host::module_new;
//!
//! fn scale(_module: Object, x: f64, factor: i32) -> f64 {
//!     x * f64::from(factor)
//! }
//!
//! static METHODS: [MethodDef; 1] = [automethod!(scale, "Multiply x by factor.")];
//!
//! // SAFETY: each call below returns a new reference.
//! let module = unsafe { Object::from_raw(module_new("demo", &METHODS)).as_tmpref() };
//! let f = unsafe { module.getattr_str("scale").as_tmpref() };
//! let args = unsafe { libpy::Tuple::pack(&[lit(1.5), lit(4)]).as_tmpref() };
//! let r = unsafe { f.call(&args).as_tmpref() };
//! assert_eq!(r.to_string(), "6.0");
//! ```
//!
//! [`CFunction`]: libpy_host::CFunction

use crate::error::Error;
use crate::list::List;
use crate::object::Object;
use crate::tuple::Tuple;
use crate::utils::{Apply, Prepend, TupleRefs};
use crate::view::{Handle, TmpRef};
use libpy_host::argparse::tags;
use libpy_host::{Buffer, Complex, RawObject, parse_tuple};
use libpy_log::trace;
use std::ffi::c_char;
use std::ptr;

/// Parameter types a generated entry point can receive.
///
/// Each type names the format tag that parses into it and the value its
/// slot holds before parsing.
pub trait ArgFormat: Sized {
    /// Format tag for this parameter.
    const TAG: u8;

    /// Initial slot value, overwritten on a successful parse.
    fn placeholder() -> Self;
}

macro_rules! arg_format {
    ($($ty:ty => $tag:ident, $init:expr;)*) => {
        $(
            impl ArgFormat for $ty {
                const TAG: u8 = tags::$tag;

                fn placeholder() -> Self {
                    $init
                }
            }
        )*
    };
}

arg_format! {
    *const c_char => CSTRING, ptr::null();
    Buffer => BUFFER, Buffer::default();
    char => CHAR, '\0';
    u8 => UBYTE, 0;
    i16 => SHORT, 0;
    u16 => USHORT, 0;
    i32 => INT, 0;
    u32 => UINT, 0;
    i64 => LONG, 0;
    u64 => ULONG, 0;
    isize => SSIZE, 0;
    f32 => FLOAT, 0.0;
    f64 => DOUBLE, 0.0;
    Complex => COMPLEX, Complex::default();
    Object => OBJECT, Object::null();
    bool => PREDICATE, false;
}

/// Return types a generated entry point can hand back to the runtime.
///
/// A bare handle ([`Object`], [`Tuple`], [`List`]) is treated as borrowed
/// and the runtime gets a new reference to it. A reference the function
/// already owns is returned as a [`TmpRef`], which hands it over without
/// an extra count.
pub trait IntoReturn {
    /// Converts into an owned pointer, or null with an error pending.
    fn into_return(self) -> *mut RawObject;
}

impl IntoReturn for Object {
    fn into_return(self) -> *mut RawObject {
        self.incref();
        self.into_raw()
    }
}

impl IntoReturn for Tuple {
    fn into_return(self) -> *mut RawObject {
        self.into_object().into_return()
    }
}

impl IntoReturn for List {
    fn into_return(self) -> *mut RawObject {
        self.into_object().into_return()
    }
}

impl<T: Handle> IntoReturn for TmpRef<T> {
    fn into_return(self) -> *mut RawObject {
        self.into_inner().as_ptr()
    }
}

impl IntoReturn for () {
    fn into_return(self) -> *mut RawObject {
        let none = libpy_host::none();
        // SAFETY: `None` is static.
        unsafe { libpy_host::incref(none) };
        none
    }
}

impl IntoReturn for bool {
    fn into_return(self) -> *mut RawObject {
        libpy_host::bool_from(self)
    }
}

impl IntoReturn for i32 {
    fn into_return(self) -> *mut RawObject {
        libpy_host::long_from_i64(i64::from(self))
    }
}

impl IntoReturn for i64 {
    fn into_return(self) -> *mut RawObject {
        libpy_host::long_from_i64(self)
    }
}

impl IntoReturn for f64 {
    fn into_return(self) -> *mut RawObject {
        libpy_host::float_from_f64(self)
    }
}

impl IntoReturn for String {
    fn into_return(self) -> *mut RawObject {
        libpy_host::unicode_from_str(&self)
    }
}

impl IntoReturn for &'static str {
    fn into_return(self) -> *mut RawObject {
        libpy_host::unicode_from_str(self)
    }
}

impl<R: IntoReturn> IntoReturn for Result<R, Error> {
    /// `Err` is restored into the runtime's error indicator.
    fn into_return(self) -> *mut RawObject {
        match self {
            Ok(value) => value.into_return(),
            Err(err) => {
                err.restore();
                ptr::null_mut()
            }
        }
    }
}

/// A Rust function callable as a native entry point.
///
/// `Args` is the tuple of parameter types after the receiver; it is
/// inferred from the function's arity.
pub trait Signature<Args> {
    /// Slots the argument parser writes into.
    type Parsed: TupleRefs;

    /// NUL-terminated format string, one tag per parameter.
    const FORMAT: &'static [u8];

    /// Slots holding their initial values.
    fn placeholder() -> Self::Parsed;

    /// Calls the function with the receiver and the parsed arguments.
    fn invoke(self, slf: Object, parsed: Self::Parsed) -> *mut RawObject;
}

macro_rules! signature_impls {
    ($($A:ident),*) => {
        impl<Func, Ret, $($A,)*> Signature<($($A,)*)> for Func
        where
            Func: Fn(Object $(, $A)*) -> Ret,
            Ret: IntoReturn,
            $($A: ArgFormat,)*
        {
            type Parsed = ($($A,)*);

            const FORMAT: &'static [u8] = &[$($A::TAG,)* 0];

            #[allow(clippy::unused_unit)]
            fn placeholder() -> Self::Parsed {
                ($($A::placeholder(),)*)
            }

            fn invoke(self, slf: Object, parsed: Self::Parsed) -> *mut RawObject {
                self.apply(parsed.prepend(slf)).into_return()
            }
        }
    };
}

signature_impls!();
signature_impls!(A0);
signature_impls!(A0, A1);
signature_impls!(A0, A1, A2);
signature_impls!(A0, A1, A2, A3);
signature_impls!(A0, A1, A2, A3, A4);
signature_impls!(A0, A1, A2, A3, A4, A5);
signature_impls!(A0, A1, A2, A3, A4, A5, A6);
signature_impls!(A0, A1, A2, A3, A4, A5, A6, A7);

/// Parses `args` for `f` and calls it with `slf` in front.
///
/// Returns the converted result, or null with an error pending when
/// parsing fails; `f` is not called in that case.
///
/// # Safety
///
/// `slf` must be null or live and `args` must be null or live, as handed to
/// a [`CFunction`](libpy_host::CFunction).
pub unsafe fn call_wrapped<F, Args>(f: F, slf: *mut RawObject, args: *mut RawObject) -> *mut RawObject
where
    F: Signature<Args>,
{
    let mut parsed = F::placeholder();
    let targets = parsed.tuple_refs();
    // SAFETY: each target addresses a slot of the type its tag writes.
    if !unsafe { parse_tuple(args, F::FORMAT, targets.as_ref()) } {
        trace!("argument parse failed for format {:?}", F::FORMAT);
        return ptr::null_mut();
    }
    // SAFETY: the receiver is borrowed for the duration of the call.
    f.invoke(unsafe { Object::from_raw(slf) }, parsed)
}

/// The format string [`call_wrapped`] would parse with for `f`.
#[must_use]
pub fn format_of<F: Signature<Args>, Args>(_f: &F) -> &'static [u8] {
    F::FORMAT
}

/// Builds a [`MethodDef`](crate::MethodDef) for a typed function.
///
/// The function takes the receiver as an [`Object`] followed by parameters
/// implementing [`ArgFormat`], and returns an [`IntoReturn`]. The entry
/// point uses [`CallConv::VarArgs`](crate::CallConv::VarArgs). Usable in
/// `static` method tables.
#[macro_export]
macro_rules! automethod {
    ($f:ident) => {
        $crate::automethod!(@def $f, ::core::option::Option::None)
    };
    ($f:ident, $doc:literal) => {
        $crate::automethod!(@def $f, ::core::option::Option::Some($doc))
    };
    (@def $f:ident, $doc:expr) => {{
        unsafe extern "C" fn __wrapper(
            slf: *mut $crate::RawObject,
            args: *mut $crate::RawObject,
        ) -> *mut $crate::RawObject {
            // SAFETY: the runtime passes a live receiver and argument tuple.
            unsafe { $crate::automethod::call_wrapped($f, slf, args) }
        }
        $crate::MethodDef::new(
            ::core::stringify!($f),
            __wrapper,
            $crate::CallConv::VarArgs,
            $doc,
        )
    }};
}
