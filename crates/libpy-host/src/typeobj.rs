//! Type objects, heap types and their instances.
//!
//! Builtin types are immortal statics whose header points at [`TYPE_TYPE`],
//! which in turn points at itself. Types created at runtime with
//! [`type_new`] are ordinary reference-counted objects carrying an attribute
//! namespace; calling one produces an instance with a namespace of its own.

use crate::error::{ErrorKind, err_set_string};
use crate::method::MethodDef;
use crate::namespace::Namespace;
use crate::object::{RawObject, decref, free, incref, into_raw, kind_of};
use crate::{list, text};
use std::borrow::Cow;

/// What kind of object a type produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Type objects
    Type,
    /// `None`
    NoneType,
    /// `NotImplemented`
    NotImplementedType,
    /// `Ellipsis`
    EllipsisType,
    /// `True` / `False`
    Bool,
    /// Arbitrary-size integers (bounded to `i128` here)
    Int,
    /// Double precision floats
    Float,
    /// Unicode text
    Str,
    /// Immutable byte strings
    Bytes,
    /// Fixed-size sequences
    Tuple,
    /// Growable sequences
    List,
    /// Iterators over tuple, list and str
    SeqIter,
    /// Bound builtin methods
    Method,
    /// Modules
    Module,
    /// Instances of heap types
    Instance,
}

/// A type object.
///
/// The header comes first, so a `*const TypeObject` is also a valid
/// `*mut RawObject`.
#[repr(C)]
pub struct TypeObject {
    pub(crate) head: RawObject,
    pub(crate) name: Cow<'static, str>,
    pub(crate) kind: TypeKind,
    pub(crate) methods: &'static [MethodDef],
    pub(crate) dict: Option<Namespace>,
}

impl TypeObject {
    const fn builtin(
        meta: &'static TypeObject,
        name: &'static str,
        kind: TypeKind,
        methods: &'static [MethodDef],
    ) -> Self {
        TypeObject {
            head: RawObject::immortal(meta),
            name: Cow::Borrowed(name),
            kind,
            methods,
            dict: None,
        }
    }

    /// The type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of object this type produces.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Builtin methods available on instances.
    pub fn methods(&self) -> &'static [MethodDef] {
        self.methods
    }

    /// Whether attributes can be set on the type itself.
    pub fn is_heap_type(&self) -> bool {
        self.dict.is_some()
    }

    /// Borrowed object pointer to this type.
    pub fn as_object(&self) -> *mut RawObject {
        self as *const TypeObject as *mut RawObject
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<&'static MethodDef> {
        self.methods.iter().find(|def| def.name == name)
    }
}

/// The type of type objects.
pub static TYPE_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "type", TypeKind::Type, &[]);
/// `type(None)`
pub static NONE_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "NoneType", TypeKind::NoneType, &[]);
/// `type(NotImplemented)`
pub static NOT_IMPLEMENTED_TYPE: TypeObject = TypeObject::builtin(
    &TYPE_TYPE,
    "NotImplementedType",
    TypeKind::NotImplementedType,
    &[],
);
/// `type(Ellipsis)`
pub static ELLIPSIS_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "ellipsis", TypeKind::EllipsisType, &[]);
/// `bool`
pub static BOOL_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "bool", TypeKind::Bool, &[]);
/// `int`
pub static INT_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "int", TypeKind::Int, &[]);
/// `float`
pub static FLOAT_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "float", TypeKind::Float, &[]);
/// `str`
pub static STR_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "str", TypeKind::Str, &text::STR_METHODS);
/// `bytes`
pub static BYTES_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "bytes", TypeKind::Bytes, &[]);
/// `tuple`
pub static TUPLE_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "tuple", TypeKind::Tuple, &[]);
/// `list`
pub static LIST_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "list", TypeKind::List, &list::LIST_METHODS);
/// Iterator type shared by the builtin sequences.
pub static SEQ_ITER_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "iterator", TypeKind::SeqIter, &[]);
/// Bound builtin methods and module functions.
pub static METHOD_TYPE: TypeObject = TypeObject::builtin(
    &TYPE_TYPE,
    "builtin_function_or_method",
    TypeKind::Method,
    &[],
);
/// `module`
pub static MODULE_TYPE: TypeObject =
    TypeObject::builtin(&TYPE_TYPE, "module", TypeKind::Module, &[]);

/// An instance of a heap type.
#[repr(C)]
pub struct InstanceObject {
    pub(crate) head: RawObject,
    pub(crate) dict: Namespace,
}

/// Creates a new heap type named `name`.
///
/// Returns a new reference. Attributes can be set on the type and on its
/// instances.
pub fn type_new(name: &str) -> *mut RawObject {
    into_raw(Box::new(TypeObject {
        head: RawObject::new(&TYPE_TYPE),
        name: Cow::Owned(name.to_owned()),
        kind: TypeKind::Instance,
        methods: &[],
        dict: Some(Namespace::new()),
    }))
}

/// Creates an instance of the heap type `ty`.
///
/// Returns a new reference, or null with `TypeError` if `ty` is not a heap
/// type.
///
/// # Safety
///
/// `ty` must point to a live object.
pub unsafe fn instance_new(ty: *mut RawObject) -> *mut RawObject {
    // SAFETY: caller guarantees `ty` is live.
    unsafe {
        if kind_of(ty) != TypeKind::Type {
            err_set_string(
                ErrorKind::TypeError,
                format!("'{}' object is not a type", crate::object::type_name(ty)),
            );
            return std::ptr::null_mut();
        }
        let meta = as_type(ty);
        if meta.kind != TypeKind::Instance {
            err_set_string(
                ErrorKind::TypeError,
                format!("cannot create '{}' instances", meta.name()),
            );
            return std::ptr::null_mut();
        }
        incref(ty);
    }
    into_raw(Box::new(InstanceObject {
        head: RawObject::new(ty.cast::<TypeObject>()),
        dict: Namespace::new(),
    }))
}

/// Views a type object pointer as a typed reference.
///
/// # Safety
///
/// `ob` must be a live type object and the reference must not outlive it.
pub(crate) unsafe fn as_type<'a>(ob: *mut RawObject) -> &'a TypeObject {
    // SAFETY: caller guarantees `ob` is a type object.
    unsafe { &*ob.cast::<TypeObject>() }
}

pub(crate) unsafe fn dealloc_type(ob: *mut RawObject) {
    // SAFETY: only heap types reach a zero count.
    unsafe { free::<TypeObject>(ob) };
}

pub(crate) unsafe fn dealloc_instance(ob: *mut RawObject) {
    // SAFETY: `ob` is a dying instance; its type stays alive until the
    // reference taken in `instance_new` is released below.
    unsafe {
        let ty = (*ob).ty as *mut RawObject;
        free::<InstanceObject>(ob);
        decref(ty);
    }
}
