//! `str` and `bytes`.

use crate::error::{ErrorKind, err_set_string};
use crate::method::{CallConv, MethodDef};
use crate::object::{RawObject, into_raw, kind_of, type_name};
use crate::typeobj::{BYTES_TYPE, STR_TYPE, TypeKind};
use std::ffi::c_char;
use std::fmt::Write;

/// A text object. `data` holds the UTF-8 encoding plus a trailing NUL.
#[repr(C)]
pub struct StrObject {
    head: RawObject,
    chars: usize,
    data: Box<[u8]>,
}

impl StrObject {
    pub(crate) fn as_str(&self) -> &str {
        let bytes = &self.data[..self.data.len() - 1];
        // SAFETY: built from a `&str` in `unicode_from_str`.
        unsafe { std::str::from_utf8_unchecked(bytes) }
    }
}

/// A byte string object.
#[repr(C)]
pub struct BytesObject {
    head: RawObject,
    data: Box<[u8]>,
}

/// Creates a `str`. Returns a new reference.
pub fn unicode_from_str(s: &str) -> *mut RawObject {
    let mut data = Vec::with_capacity(s.len() + 1);
    data.extend_from_slice(s.as_bytes());
    data.push(0);
    into_raw(Box::new(StrObject {
        head: RawObject::new(&STR_TYPE),
        chars: s.chars().count(),
        data: data.into_boxed_slice(),
    }))
}

/// Creates a one-character `str`. Returns a new reference.
pub fn unicode_from_char(c: char) -> *mut RawObject {
    let mut buf = [0u8; 4];
    unicode_from_str(c.encode_utf8(&mut buf))
}

/// Creates a `bytes`. Returns a new reference.
pub fn bytes_from_slice(b: &[u8]) -> *mut RawObject {
    into_raw(Box::new(BytesObject {
        head: RawObject::new(&BYTES_TYPE),
        data: b.into(),
    }))
}

/// Checks whether `ob` is a `str`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn unicode_check(ob: *mut RawObject) -> bool {
    // SAFETY: non-null checked first.
    !ob.is_null() && unsafe { kind_of(ob) } == TypeKind::Str
}

/// Checks whether `ob` is a `bytes`.
///
/// # Safety
///
/// `ob` must be null or point to a live object.
pub unsafe fn bytes_check(ob: *mut RawObject) -> bool {
    // SAFETY: non-null checked first.
    !ob.is_null() && unsafe { kind_of(ob) } == TypeKind::Bytes
}

/// Borrows the text of a `str`, or `None` for any other object.
///
/// # Safety
///
/// `ob` must be null or point to a live object, and the returned slice must
/// not outlive it.
pub unsafe fn unicode_as_str<'a>(ob: *mut RawObject) -> Option<&'a str> {
    // SAFETY: the kind check guards the cast.
    unsafe { unicode_check(ob).then(|| (*ob.cast::<StrObject>()).as_str()) }
}

/// Borrows the NUL-terminated UTF-8 buffer of a `str`.
///
/// Returns null with `TypeError` for any other object.
///
/// # Safety
///
/// `ob` must point to a live object; the buffer lives as long as it does.
pub unsafe fn unicode_as_utf8(ob: *mut RawObject) -> *const c_char {
    // SAFETY: forwarded contract; the kind check guards the cast.
    unsafe {
        if unicode_check(ob) {
            (*ob.cast::<StrObject>()).data.as_ptr().cast()
        } else {
            err_set_string(
                ErrorKind::TypeError,
                format!("bad argument type for built-in operation: '{}'", type_name(ob)),
            );
            std::ptr::null()
        }
    }
}

/// Number of characters in a `str`.
///
/// # Safety
///
/// `ob` must be a live `str`.
pub(crate) unsafe fn unicode_len(ob: *mut RawObject) -> usize {
    // SAFETY: caller guarantees the kind.
    unsafe { (*ob.cast::<StrObject>()).chars }
}

/// Borrows the contents of a `bytes`, or `None` for any other object.
///
/// # Safety
///
/// `ob` must be null or point to a live object, and the returned slice must
/// not outlive it.
pub unsafe fn bytes_as_slice<'a>(ob: *mut RawObject) -> Option<&'a [u8]> {
    // SAFETY: the kind check guards the cast.
    unsafe { bytes_check(ob).then(|| &*(*ob.cast::<BytesObject>()).data) }
}

/// Quotes `s` the way `repr` does.
pub(crate) fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Quotes `b` the way `repr` does.
pub(crate) fn bytes_repr(b: &[u8]) -> String {
    let quote = if b.contains(&b'\'') && !b.contains(&b'"') { '"' } else { '\'' };
    let mut out = String::with_capacity(b.len() + 3);
    out.push('b');
    out.push(quote);
    for &byte in b {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            byte if char::from(byte) == quote => {
                out.push('\\');
                out.push(quote);
            }
            0x20..=0x7e => out.push(char::from(byte)),
            byte => {
                let _ = write!(out, "\\x{byte:02x}");
            }
        }
    }
    out.push(quote);
    out
}

/// Escapes every non-ASCII character of an already quoted repr.
pub(crate) fn ascii_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c as u32 {
            0..=0x7f => out.push(c),
            code @ 0x80..=0xff => {
                let _ = write!(out, "\\x{code:02x}");
            }
            code @ 0x100..=0xffff => {
                let _ = write!(out, "\\u{code:04x}");
            }
            code => {
                let _ = write!(out, "\\U{code:08x}");
            }
        }
    }
    out
}

unsafe extern "C" fn str_upper(slf: *mut RawObject, _args: *mut RawObject) -> *mut RawObject {
    // SAFETY: bound to a `str` receiver by attribute lookup.
    match unsafe { unicode_as_str(slf) } {
        Some(s) => unicode_from_str(&s.to_uppercase()),
        None => crate::error::raise_null(ErrorKind::TypeError, "descriptor 'upper' requires a 'str' object"),
    }
}

pub(crate) static STR_METHODS: [MethodDef; 1] = [MethodDef::new(
    "upper",
    str_upper,
    CallConv::NoArgs,
    Some("Return a copy of the string converted to uppercase."),
)];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::err_fetch;
    use crate::object::decref;
    use crate::number::long_from_i64;
    use std::ffi::CStr;

    #[test]
    fn test_str_storage_is_nul_terminated() {
        let ob = unicode_from_str("héllo");
        unsafe {
            assert_eq!(unicode_as_str(ob), Some("héllo"));
            assert_eq!(unicode_len(ob), 5);
            let c = CStr::from_ptr(unicode_as_utf8(ob));
            assert_eq!(c.to_str(), Ok("héllo"));
            decref(ob);
        }
    }

    #[test]
    fn test_as_utf8_rejects_non_str() {
        let ob = long_from_i64(3);
        unsafe {
            assert!(unicode_as_utf8(ob).is_null());
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::TypeError);
            assert!(unicode_as_str(ob).is_none());
            decref(ob);
        }
    }

    #[test]
    fn test_bytes() {
        let ob = bytes_from_slice(b"ab\x00c");
        unsafe {
            assert!(bytes_check(ob));
            assert!(!unicode_check(ob));
            assert_eq!(bytes_as_slice(ob), Some(&b"ab\x00c"[..]));
            decref(ob);
        }
    }

    #[test]
    fn test_reprs() {
        assert_eq!(str_repr("test"), "'test'");
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("a\nb\\"), "'a\\nb\\\\'");
        assert_eq!(bytes_repr(b"a\x00'"), "b\"a\\x00'\"");
        assert_eq!(ascii_escape("'é☃'"), "'\\xe9\\u2603'");
    }

    #[test]
    fn test_upper() {
        let s = unicode_from_str("Hello");
        let n = long_from_i64(1);
        unsafe {
            let up = str_upper(s, std::ptr::null_mut());
            assert_eq!(unicode_as_str(up), Some("HELLO"));
            decref(up);

            assert!(str_upper(n, std::ptr::null_mut()).is_null());
            assert_eq!(err_fetch().unwrap().message, "descriptor 'upper' requires a 'str' object");
            decref(n);
            decref(s);
        }
    }
}
