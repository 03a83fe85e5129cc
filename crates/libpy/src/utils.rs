//! Tuple plumbing and the null-check choke point.
//!
//! [`Apply`], [`Prepend`] and [`TupleRefs`] are implemented for tuples of
//! up to nine elements. The call wrapper uses them to hand the argument
//! parser one address per slot and then spread the parsed tuple, with the
//! receiver in front, into the target function.

use libpy_host::{ErrorKind, err_occurred, err_set_string};

/// Calls a function with the elements of a tuple as positional arguments.
pub trait Apply<Args> {
    /// Return type of the call.
    type Output;

    /// Spreads `args` into a call of `self`.
    fn apply(self, args: Args) -> Self::Output;
}

/// Adds one element at the front of a tuple.
pub trait Prepend<H> {
    /// The tuple with `H` in front.
    type Output;

    /// Returns `(head, self.0, self.1, ...)`.
    fn prepend(self, head: H) -> Self::Output;
}

/// Addresses of the elements of a tuple.
pub trait TupleRefs {
    /// A fixed-size array with one address per element.
    type Addrs: AsRef<[*mut u8]>;

    /// Returns the address of each element, in order.
    ///
    /// The addresses alias `self` and are valid for writes of each
    /// element's own type while `self` is neither moved nor dropped.
    fn tuple_refs(&mut self) -> Self::Addrs;
}

macro_rules! tuple_impls {
    ($n:literal => $($T:ident $v:ident),*) => {
        impl<Func, Ret, $($T,)*> Apply<($($T,)*)> for Func
        where
            Func: FnOnce($($T),*) -> Ret,
        {
            type Output = Ret;

            #[allow(non_snake_case, clippy::unused_unit)]
            fn apply(self, args: ($($T,)*)) -> Ret {
                let ($($v,)*) = args;
                self($($v),*)
            }
        }

        impl<Head, $($T,)*> Prepend<Head> for ($($T,)*) {
            type Output = (Head, $($T,)*);

            fn prepend(self, head: Head) -> Self::Output {
                let ($($v,)*) = self;
                (head, $($v,)*)
            }
        }

        impl<$($T,)*> TupleRefs for ($($T,)*) {
            type Addrs = [*mut u8; $n];

            #[allow(clippy::unused_unit)]
            fn tuple_refs(&mut self) -> [*mut u8; $n] {
                let ($($v,)*) = self;
                [$(($v as *mut $T).cast::<u8>()),*]
            }
        }
    };
}

tuple_impls!(0 =>);
tuple_impls!(1 => A0 a0);
tuple_impls!(2 => A0 a0, A1 a1);
tuple_impls!(3 => A0 a0, A1 a1, A2 a2);
tuple_impls!(4 => A0 a0, A1 a1, A2 a2, A3 a3);
tuple_impls!(5 => A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
tuple_impls!(6 => A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
tuple_impls!(7 => A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
tuple_impls!(8 => A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
tuple_impls!(9 => A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

/// Reports an unexpected null handle.
///
/// An error already pending is left alone; it is the one the caller
/// propagates. Otherwise an `AssertionError` is raised.
pub fn failed_null_check() {
    if err_occurred().is_none() {
        err_set_string(ErrorKind::AssertionError, "unexpected null handle");
    }
}

/// True when every handle is non-null. Short-circuits; empty is `true`.
///
/// # Example
///
/// ```rust
/// use libpy::{Object, all_nonnull, lit};
///
/// let a = lit(1);
/// assert!(all_nonnull!());
/// assert!(all_nonnull!(a, lit("b")));
/// assert!(!all_nonnull!(a, Object::null()));
/// ```
#[macro_export]
macro_rules! all_nonnull {
    () => {
        true
    };
    ($($handle:expr),+ $(,)?) => {
        true $(&& $handle.is_nonnull())+
    };
}
