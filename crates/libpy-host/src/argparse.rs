//! Positional argument parsing against a format string.
//!
//! A format string is a NUL-terminated byte sequence with one tag per
//! expected argument, optionally followed by `:name` to name the function in
//! error messages. Each tag decides how the matching tuple item is converted
//! and what native type the corresponding target slot holds:
//!
//! | tag | target type      | accepts                         |
//! |-----|------------------|---------------------------------|
//! | `z` | `*const c_char`  | `str` (no embedded NUL) or None |
//! | `s` | [`Buffer`]       | `str` or `bytes`                |
//! | `C` | `char`           | `str` of length 1               |
//! | `b` | `u8`             | `int` in range                  |
//! | `h` | `i16`            | `int` in range                  |
//! | `H` | `u16`            | `int` in range                  |
//! | `i` | `i32`            | `int` in range                  |
//! | `I` | `u32`            | `int` in range                  |
//! | `l` | `i64`            | `int` in range                  |
//! | `k` | `u64`            | `int` in range                  |
//! | `n` | `isize`          | `int` in range                  |
//! | `f` | `f32`            | `int` or `float`                |
//! | `d` | `f64`            | `int` or `float`                |
//! | `D` | [`Complex`]      | `int` or `float`                |
//! | `O` | `*mut RawObject` | anything (borrowed)             |
//! | `p` | `bool`           | anything (truth value)          |
//!
//! Pointers written into targets (`z`, `s`, `O`) borrow from the argument
//! tuple and stay valid only while it does.

use crate::error::{ErrorKind, err_set_string};
use crate::number::{float_check, int_value, num_value};
use crate::object::{RawObject, is_none, type_name};
use crate::protocol::object_is_true;
use crate::text::{bytes_as_slice, unicode_as_str, unicode_as_utf8};
use crate::tuple::{tuple_check, tuple_items, tuple_size_unchecked};
use libpy_log::trace;
use std::ffi::c_char;

/// Format tags understood by [`parse_tuple`].
pub mod tags {
    /// Nullable C string
    pub const CSTRING: u8 = b'z';
    /// Read-only byte buffer
    pub const BUFFER: u8 = b's';
    /// Single character
    pub const CHAR: u8 = b'C';
    /// Unsigned byte
    pub const UBYTE: u8 = b'b';
    /// Signed short
    pub const SHORT: u8 = b'h';
    /// Unsigned short
    pub const USHORT: u8 = b'H';
    /// Signed int
    pub const INT: u8 = b'i';
    /// Unsigned int
    pub const UINT: u8 = b'I';
    /// Signed long
    pub const LONG: u8 = b'l';
    /// Unsigned long
    pub const ULONG: u8 = b'k';
    /// Signed size
    pub const SSIZE: u8 = b'n';
    /// Single precision float
    pub const FLOAT: u8 = b'f';
    /// Double precision float
    pub const DOUBLE: u8 = b'd';
    /// Complex number
    pub const COMPLEX: u8 = b'D';
    /// Any object, borrowed
    pub const OBJECT: u8 = b'O';
    /// Truth value
    pub const PREDICATE: u8 = b'p';

    /// Every tag above.
    pub const ALL: &[u8] = b"zsCbhHiIlknfdDOp";
}

/// A read-only view of the bytes behind a `str` or `bytes` argument.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Buffer {
    /// First byte.
    pub buf: *const u8,
    /// Number of bytes.
    pub len: isize,
    /// The object the bytes belong to (borrowed).
    pub obj: *mut RawObject,
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer {
            buf: std::ptr::null(),
            len: 0,
            obj: std::ptr::null_mut(),
        }
    }
}

impl Buffer {
    /// The viewed bytes.
    ///
    /// # Safety
    ///
    /// `obj` must still be alive.
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.buf.is_null() {
            return &[];
        }
        // SAFETY: `buf`/`len` describe the live object's storage.
        unsafe { std::slice::from_raw_parts(self.buf, self.len as usize) }
    }
}

/// A complex number.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    /// Real part.
    pub real: f64,
    /// Imaginary part.
    pub imag: f64,
}

struct FormatSpec<'a> {
    tags: &'a [u8],
    fname: Option<&'a str>,
}

fn split_format(format: &[u8]) -> Result<FormatSpec<'_>, String> {
    let Some(end) = format.iter().position(|&b| b == 0) else {
        return Err("format string is not NUL-terminated".to_owned());
    };
    let body = &format[..end];
    let (tag_bytes, fname) = match body.iter().position(|&b| b == b':') {
        Some(colon) => {
            let name = std::str::from_utf8(&body[colon + 1..])
                .map_err(|_| "function name in format string is not UTF-8".to_owned())?;
            (&body[..colon], Some(name))
        }
        None => (body, None),
    };
    if let Some(&bad) = tag_bytes.iter().find(|b| !tags::ALL.contains(b)) {
        return Err(format!("bad format char '{}'", char::from(bad)));
    }
    Ok(FormatSpec {
        tags: tag_bytes,
        fname,
    })
}

/// Number of arguments a format string describes, or `None` if it is
/// malformed.
///
/// # Example
///
/// ```
/// use libpy_host::argparse::format_arity;
///
/// assert_eq!(format_arity(b"iO\0"), Some(2));
/// assert_eq!(format_arity(b":noargs\0"), Some(0));
/// assert_eq!(format_arity(b"x\0"), None);
/// assert_eq!(format_arity(b"i"), None);
/// ```
pub fn format_arity(format: &[u8]) -> Option<usize> {
    split_format(format).ok().map(|spec| spec.tags.len())
}

/// Parses the items of `args` into `targets` as described by `format`.
///
/// Returns `true` on success. On failure returns `false` with an error
/// pending; targets before the failing position may have been written.
///
/// Errors:
/// - wrong argument count: `TypeError` ("function takes exactly N arguments
///   (M given)");
/// - wrong argument kind: `TypeError`;
/// - integer out of the target's range: `OverflowError`;
/// - `z` argument with an embedded NUL: `ValueError`;
/// - malformed format, target count mismatch or `args` not a tuple:
///   `SystemError`.
///
/// # Safety
///
/// `args` must be null or point to a live object, and `targets[i]` must be
/// valid for a write of the type the `i`-th tag describes.
pub unsafe fn parse_tuple(args: *mut RawObject, format: &[u8], targets: &[*mut u8]) -> bool {
    let spec = match split_format(format) {
        Ok(spec) => spec,
        Err(msg) => {
            err_set_string(ErrorKind::SystemError, msg);
            return false;
        }
    };
    if spec.tags.len() != targets.len() {
        err_set_string(
            ErrorKind::SystemError,
            format!(
                "parse_tuple: {} targets for {} format units",
                targets.len(),
                spec.tags.len()
            ),
        );
        return false;
    }
    // SAFETY: forwarded contract.
    if !unsafe { tuple_check(args) } {
        err_set_string(
            ErrorKind::SystemError,
            "new style getargs format but argument is not a tuple",
        );
        return false;
    }

    let expected = spec.tags.len();
    // SAFETY: `args` is a tuple.
    let given = unsafe { tuple_size_unchecked(args) } as usize;
    let who = match spec.fname {
        Some(name) => format!("{name}()"),
        None => "function".to_owned(),
    };
    if given != expected {
        let msg = match expected {
            0 => format!("{who} takes no arguments ({given} given)"),
            1 => format!("{who} takes exactly 1 argument ({given} given)"),
            n => format!("{who} takes exactly {n} arguments ({given} given)"),
        };
        trace!("argument count mismatch: {msg}");
        err_set_string(ErrorKind::TypeError, msg);
        return false;
    }

    let ctx = spec.fname.map(|name| format!("{name}() ")).unwrap_or_default();
    for (i, (&tag, &target)) in spec.tags.iter().zip(targets).enumerate() {
        // SAFETY: `i < given` and slots of a tuple handed to a call are filled.
        let item = unsafe { *tuple_items(args).add(i) };
        if item.is_null() {
            err_set_string(ErrorKind::SystemError, "argument tuple has a NULL item");
            return false;
        }
        let arg = Arg {
            item,
            pos: i + 1,
            ctx: &ctx,
        };
        // SAFETY: forwarded target contract; `item` is live.
        if !unsafe { arg.convert(tag, target) } {
            trace!("argument {} failed to convert for tag '{}'", i + 1, char::from(tag));
            return false;
        }
    }
    true
}

struct Arg<'a> {
    item: *mut RawObject,
    pos: usize,
    ctx: &'a str,
}

impl Arg<'_> {
    unsafe fn type_error(&self, expected: &str) -> bool {
        // SAFETY: `item` is live for the duration of the parse.
        let got = unsafe { type_name(self.item) };
        err_set_string(
            ErrorKind::TypeError,
            format!("{}argument {} must be {expected}, not {got}", self.ctx, self.pos),
        );
        false
    }

    unsafe fn integer(&self) -> Option<i128> {
        // SAFETY: `item` is live.
        unsafe {
            if float_check(self.item) {
                err_set_string(
                    ErrorKind::TypeError,
                    "'float' object cannot be interpreted as an integer",
                );
                return None;
            }
            match int_value(self.item) {
                Some(v) => Some(v),
                None => {
                    self.type_error("int");
                    None
                }
            }
        }
    }

    unsafe fn store_int<T: TryFrom<i128>>(&self, target: *mut u8, what: &str) -> bool {
        // SAFETY: forwarded contract.
        let Some(value) = (unsafe { self.integer() }) else {
            return false;
        };
        match T::try_from(value) {
            Ok(v) => {
                // SAFETY: caller guarantees the target holds a `T`.
                unsafe { target.cast::<T>().write(v) };
                true
            }
            Err(_) => {
                let bound = if value < 0 {
                    "less than minimum"
                } else {
                    "greater than maximum"
                };
                err_set_string(ErrorKind::OverflowError, format!("{what} is {bound}"));
                false
            }
        }
    }

    unsafe fn real(&self) -> Option<f64> {
        // SAFETY: `item` is live.
        match unsafe { num_value(self.item) } {
            Some(n) => Some(n.as_f64()),
            None => {
                // SAFETY: as above.
                unsafe { self.type_error("real number") };
                None
            }
        }
    }

    unsafe fn convert(&self, tag: u8, target: *mut u8) -> bool {
        // SAFETY: each arm writes exactly the type its tag documents, which
        // the caller guarantees the target holds; `item` is live.
        unsafe {
            match tag {
                tags::CSTRING => {
                    if is_none(self.item) {
                        target.cast::<*const c_char>().write(std::ptr::null());
                        return true;
                    }
                    match unicode_as_str(self.item) {
                        Some(s) if s.contains('\0') => {
                            err_set_string(ErrorKind::ValueError, "embedded null character");
                            false
                        }
                        Some(_) => {
                            target.cast::<*const c_char>().write(unicode_as_utf8(self.item));
                            true
                        }
                        None => self.type_error("str or None"),
                    }
                }
                tags::BUFFER => {
                    let bytes = unicode_as_str(self.item)
                        .map(str::as_bytes)
                        .or_else(|| bytes_as_slice(self.item));
                    match bytes {
                        Some(b) => {
                            target.cast::<Buffer>().write(Buffer {
                                buf: b.as_ptr(),
                                len: b.len() as isize,
                                obj: self.item,
                            });
                            true
                        }
                        None => self.type_error("str or bytes"),
                    }
                }
                tags::CHAR => {
                    let mut chars = unicode_as_str(self.item).map(str::chars);
                    match chars.as_mut().map(|c| (c.next(), c.next())) {
                        Some((Some(c), None)) => {
                            target.cast::<char>().write(c);
                            true
                        }
                        _ => self.type_error("a unicode character"),
                    }
                }
                tags::UBYTE => self.store_int::<u8>(target, "unsigned byte integer"),
                tags::SHORT => self.store_int::<i16>(target, "signed short integer"),
                tags::USHORT => self.store_int::<u16>(target, "unsigned short integer"),
                tags::INT => self.store_int::<i32>(target, "signed integer"),
                tags::UINT => self.store_int::<u32>(target, "unsigned integer"),
                tags::LONG => self.store_int::<i64>(target, "signed long integer"),
                tags::ULONG => self.store_int::<u64>(target, "unsigned long integer"),
                tags::SSIZE => self.store_int::<isize>(target, "signed size integer"),
                tags::FLOAT => match self.real() {
                    Some(v) => {
                        target.cast::<f32>().write(v as f32);
                        true
                    }
                    None => false,
                },
                tags::DOUBLE => match self.real() {
                    Some(v) => {
                        target.cast::<f64>().write(v);
                        true
                    }
                    None => false,
                },
                tags::COMPLEX => match self.real() {
                    Some(real) => {
                        target.cast::<Complex>().write(Complex { real, imag: 0.0 });
                        true
                    }
                    None => false,
                },
                tags::OBJECT => {
                    target.cast::<*mut RawObject>().write(self.item);
                    true
                }
                tags::PREDICATE => match object_is_true(self.item) {
                    -1 => false,
                    truth => {
                        target.cast::<bool>().write(truth == 1);
                        true
                    }
                },
                other => {
                    err_set_string(
                        ErrorKind::SystemError,
                        format!("bad format char '{}'", char::from(other)),
                    );
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{err_clear, err_fetch};
    use crate::number::{float_from_f64, long_from_i64};
    use crate::object::{decref, none};
    use crate::text::{bytes_from_slice, unicode_from_str};
    use crate::tuple::{tuple_new, tuple_pack};
    use std::ffi::CStr;

    fn slot<T>(value: &mut T) -> *mut u8 {
        (value as *mut T).cast()
    }

    #[test]
    fn test_format_validation() {
        assert_eq!(format_arity(b"\0"), Some(0));
        let mut all = tags::ALL.to_vec();
        all.push(0);
        assert_eq!(format_arity(&all), Some(16));
        assert_eq!(format_arity(b"ii:add\0"), Some(2));
        assert_eq!(format_arity(b"c\0"), None);
    }

    #[test]
    fn test_parse_scalars() {
        let a = long_from_i64(-7);
        let b = float_from_f64(2.5);
        let c = unicode_from_str("x");
        unsafe {
            let args = tuple_pack(&[a, b, c, a]);
            let (mut i, mut d, mut ch, mut l) = (0i32, 0f64, '\0', 0i64);
            assert!(parse_tuple(
                args,
                b"idCl\0",
                &[slot(&mut i), slot(&mut d), slot(&mut ch), slot(&mut l)],
            ));
            assert_eq!((i, d, ch, l), (-7, 2.5, 'x', -7));
            decref(args);
        }
        unsafe {
            decref(a);
            decref(b);
            decref(c);
        }
    }

    #[test]
    fn test_parse_strings_and_objects() {
        let s = unicode_from_str("hello");
        let raw = bytes_from_slice(b"\x01\x02");
        unsafe {
            let args = tuple_pack(&[s, none(), raw, s]);
            let mut z1: *const c_char = std::ptr::null();
            let mut z2: *const c_char = b"sentinel\0".as_ptr().cast();
            let mut buf = Buffer::default();
            let mut ob: *mut RawObject = std::ptr::null_mut();
            assert!(parse_tuple(
                args,
                b"zzsO\0",
                &[slot(&mut z1), slot(&mut z2), slot(&mut buf), slot(&mut ob)],
            ));
            assert_eq!(CStr::from_ptr(z1).to_str(), Ok("hello"));
            assert!(z2.is_null());
            assert_eq!(buf.as_bytes(), b"\x01\x02");
            assert_eq!(buf.obj, raw);
            assert_eq!(ob, s);
            decref(args);
            decref(raw);
            decref(s);
        }
    }

    #[test]
    fn test_wrong_count() {
        unsafe {
            let args = tuple_pack(&[none(), none()]);
            let mut x = 0i32;
            assert!(!parse_tuple(args, b"i\0", &[slot(&mut x)]));
            let err = err_fetch().unwrap();
            assert_eq!(err.kind, ErrorKind::TypeError);
            assert_eq!(err.message, "function takes exactly 1 argument (2 given)");

            assert!(!parse_tuple(args, b":f\0", &[]));
            assert_eq!(err_fetch().unwrap().message, "f() takes no arguments (2 given)");

            let empty = tuple_new(0);
            let (mut p, mut q) = (0i32, 0i32);
            assert!(!parse_tuple(empty, b"ii\0", &[slot(&mut p), slot(&mut q)]));
            assert_eq!(
                err_fetch().unwrap().message,
                "function takes exactly 2 arguments (0 given)"
            );
            assert!(parse_tuple(empty, b"\0", &[]));

            decref(empty);
            decref(args);
        }
    }

    #[test]
    fn test_overflow_and_type_errors() {
        let big = long_from_i64(300);
        let neg = long_from_i64(-1);
        let f = float_from_f64(1.0);
        let text = unicode_from_str("nope");
        unsafe {
            let mut byte = 0u8;
            let args = tuple_pack(&[big]);
            assert!(!parse_tuple(args, b"b\0", &[slot(&mut byte)]));
            let err = err_fetch().unwrap();
            assert_eq!(err.kind, ErrorKind::OverflowError);
            assert_eq!(err.message, "unsigned byte integer is greater than maximum");
            decref(args);

            let mut u = 0u64;
            let args = tuple_pack(&[neg]);
            assert!(!parse_tuple(args, b"k\0", &[slot(&mut u)]));
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::OverflowError);
            decref(args);

            let mut i = 0i32;
            let args = tuple_pack(&[f]);
            assert!(!parse_tuple(args, b"i\0", &[slot(&mut i)]));
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::TypeError);
            decref(args);

            let args = tuple_pack(&[text]);
            assert!(!parse_tuple(args, b"i:g\0", &[slot(&mut i)]));
            assert_eq!(
                err_fetch().unwrap().message,
                "g() argument 1 must be int, not str"
            );
            decref(args);

            decref(big);
            decref(neg);
            decref(f);
            decref(text);
        }
    }

    #[test]
    fn test_embedded_nul() {
        let s = unicode_from_str("a\0b");
        unsafe {
            let args = tuple_pack(&[s]);
            let mut z: *const c_char = std::ptr::null();
            assert!(!parse_tuple(args, b"z\0", &[slot(&mut z)]));
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::ValueError);
            decref(args);
            decref(s);
        }
    }

    #[test]
    fn test_system_errors() {
        let mut x = 0i32;
        unsafe {
            let args = tuple_new(0);
            assert!(!parse_tuple(args, b"i\0", &[]));
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::SystemError);
            assert!(!parse_tuple(args, b"i", &[slot(&mut x)]));
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::SystemError);
            assert!(!parse_tuple(none(), b"\0", &[]));
            assert_eq!(err_fetch().unwrap().kind, ErrorKind::SystemError);
            decref(args);
        }
        err_clear();
    }

    #[test]
    fn test_predicate_and_complex() {
        let zero = long_from_i64(0);
        let half = float_from_f64(0.5);
        unsafe {
            let args = tuple_pack(&[zero, half]);
            let mut p = true;
            let mut c = Complex::default();
            assert!(parse_tuple(args, b"pD\0", &[slot(&mut p), slot(&mut c)]));
            assert!(!p);
            assert_eq!(c, Complex { real: 0.5, imag: 0.0 });
            decref(args);
            decref(zero);
            decref(half);
        }
    }
}
