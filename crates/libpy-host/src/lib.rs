//! `libpy-host`: a compact reference-counted object runtime
//!
//! The runtime the `libpy` handle layer is written against. It models the
//! C-level surface of a dynamic object-oriented runtime:
//!
//! - **Objects** behind raw pointers, each starting with a [`RawObject`]
//!   header (atomic reference count and type pointer)
//! - **Builtin kinds**: `int`, `float`, `bool`, `str`, `bytes`, `tuple`,
//!   `list`, iterators, builtin methods, modules and runtime-created types
//! - **Protocol entry points** for hashing, comparison, arithmetic,
//!   attributes, items and calls
//! - **A per-thread error indicator** with the usual "null plus pending
//!   error" failure convention
//! - **Argument parsing** against a format mini-language
//!
//! Every entry point taking raw pointers is `unsafe`; callers vouch that
//! non-null pointers refer to live objects.
//!
//! # Example
//!
//! ```rust
//! use libpy_host::{decref, long_from_i64, object_repr, tuple_pack, unicode_as_str};
//!
//! let one = long_from_i64(1);
//! unsafe {
//!     let t = tuple_pack(&[one]);
//!     let r = object_repr(t);
//!     assert_eq!(unicode_as_str(r), Some("(1,)"));
//!     decref(r);
//!     decref(t);
//!     decref(one);
//! }
//! ```

pub mod argparse;
pub mod error;
pub mod iter;
pub mod list;
pub mod method;
pub mod module;
mod namespace;
pub mod number;
pub mod object;
pub mod protocol;
pub mod text;
pub mod tuple;
pub mod typeobj;

// Re-export the primitive surface
pub use argparse::{Buffer, Complex, parse_tuple};
pub use error::{
    ErrorKind, PendingError, err_clear, err_fetch, err_matches, err_occurred, err_restore,
    err_set_string,
};
pub use list::{
    list_append, list_check, list_get_item, list_items, list_new, list_pack, list_set_item,
    list_size,
};
pub use method::{CFunction, CallConv, MethodDef, method_new};
pub use module::module_new;
pub use number::{
    bool_from, float_check, float_from_f64, long_as_i64, long_as_i128, long_from_i64,
    long_from_i128,
};
pub use object::{
    RawObject, dec_and_test, decref, ellipsis, incref, is_none, none, not_implemented, refcnt,
    type_name, type_of, xdecref, xincref,
};
pub use protocol::{
    CompareOp, callable_check, iter_next, number_absolute, number_add, number_invert,
    number_multiply, number_negative, number_positive, number_subtract, object_ascii,
    object_bytes, object_call, object_del_attr, object_dir, object_get_attr,
    object_get_attr_str, object_get_item, object_get_iter, object_has_attr, object_hash,
    object_is_true, object_length, object_length_hint, object_repr, object_rich_compare,
    object_rich_compare_bool, object_set_attr, object_set_attr_str, object_set_item,
    object_str,
};
pub use text::{
    bytes_as_slice, bytes_check, bytes_from_slice, unicode_as_str, unicode_as_utf8,
    unicode_check, unicode_from_char, unicode_from_str,
};
pub use tuple::{
    tuple_check, tuple_get_item, tuple_items, tuple_new, tuple_pack, tuple_set_item, tuple_size,
};
pub use typeobj::{TypeKind, TypeObject, instance_new, type_new};
