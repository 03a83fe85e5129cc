//! `libpy`: value-semantics handles over a reference-counted object runtime
//!
//! `libpy` wraps the raw pointers of a dynamic object runtime in small Rust
//! values that read like the runtime's own expressions. It provides:
//!
//! - **Handles** ([`Object`], [`Tuple`], [`List`]) that are exactly one
//!   pointer wide and never count references behind your back
//! - **Ownership views** ([`NotNull`], [`TmpRef`]) for a checked non-null
//!   handle and a reference released on drop
//! - **Subscript proxies** ([`GetItem`], [`KeyedItem`]) that serve reads and
//!   writes from one indexing expression
//! - **Typed native functions** through [`automethod!`]
//! - **Cached literals** through [`lit`]
//!
//! # Error Model
//!
//! Runtime failures are reported the runtime's way: the handle comes back
//! null and an error is pending on the calling thread. [`Error`] covers the
//! few conditions that originate in this crate and converts back into a
//! pending error at a native call boundary.
//!
//! # Ownership
//!
//! Whether a handle owns a reference is tracked by the caller, not by the
//! type. Releasing one ([`Object::decref`], [`TmpRef::new`]) is therefore
//! `unsafe`; taking one ([`Object::incref`]) is not.
//!
//! # Example
//!
//! ```rust
//! use libpy::{Tuple, lit};
//!
//! let mut t = Tuple::pack(&[lit(1), lit("two")]);
//! assert_eq!(t.to_string(), "(1, 'two')");
//! assert!(t.item(0).is(&lit(1)));
//!
//! let mut r = t.repr();
//! assert_eq!(r.as_str(), Some("(1, 'two')"));
//! // SAFETY: both are new references.
//! unsafe {
//!     r.decref();
//!     t.decref();
//! }
//! ```

pub mod automethod;
pub mod error;
pub mod getitem;
pub mod list;
pub mod literals;
pub mod object;
pub mod tuple;
pub mod typeobj;
pub mod utils;
pub mod view;

pub use libpy_host as host;

// Re-export commonly used types
pub use error::{Error, Result};
pub use getitem::{AsSsize, GetItem, KeyedItem, SetItem};
pub use libpy_host::{CallConv, CompareOp, MethodDef, RawObject};
pub use list::List;
pub use literals::{Lit, lit};
pub use object::Object;
pub use tuple::Tuple;
pub use typeobj::TypeObject;
pub use utils::failed_null_check;
pub use view::{Handle, NotNull, TmpRef};
