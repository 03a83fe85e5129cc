//! Property-based tests for the handle layer.
//!
//! Containers built from arbitrary values must hand the same objects back
//! through every access path, and comparisons must agree with Rust's.

use libpy::host::long_from_i64;
use libpy::{List, Object, Tuple, lit};
use proptest::prelude::*;

fn ints(values: &[i64]) -> Vec<Object> {
    values
        .iter()
        .map(|&v| unsafe { Object::from_raw(long_from_i64(v)) })
        .collect()
}

fn release(mut values: Vec<Object>) {
    for v in &mut values {
        unsafe { v.decref() };
    }
}

proptest! {
    #[test]
    fn test_pack_then_iterate(values in prop::collection::vec(any::<i64>(), 0..32)) {
        let items = ints(&values);
        let mut t = Tuple::pack(&items);
        let mut l = List::pack(&items);

        prop_assert_eq!(t.len(), items.len() as isize);
        prop_assert_eq!(l.len(), items.len() as isize);
        for (i, item) in items.iter().enumerate() {
            prop_assert!(t.item(i).is(item));
            prop_assert!(l.item(i).is(item));
            prop_assert!(t.as_slice()[i].is(item));
            prop_assert_eq!(item.refcnt(), 3);
        }

        unsafe { t.decref() };
        unsafe { l.decref() };
        prop_assert!(items.iter().all(|item| item.refcnt() == 1));
        release(items);
    }

    #[test]
    fn test_negative_indices(values in prop::collection::vec(any::<i64>(), 1..16), back in 1usize..16) {
        let back = back.min(values.len());
        let items = ints(&values);
        let mut t = Tuple::pack(&items);

        let key = unsafe { Object::from_raw(long_from_i64(-(back as i64))).as_tmpref() };
        let mut got = t.getitem(&key).get();
        prop_assert!(got.is(&items[items.len() - back]));

        unsafe { got.decref() };
        unsafe { t.decref() };
        release(items);
    }

    #[test]
    fn test_int_comparisons_match(a in any::<i64>(), b in any::<i64>()) {
        let items = ints(&[a, b]);
        let (x, y) = (&items[0], &items[1]);
        let checks = [
            (x.lt(y), a < b),
            (x.le(y), a <= b),
            (x.eq(y), a == b),
            (x.ne(y), a != b),
            (x.gt(y), a > b),
            (x.ge(y), a >= b),
        ];
        for (mut result, expected) in checks {
            prop_assert_eq!(result.istrue(), i32::from(expected));
            unsafe { result.decref() };
        }

        let expected = (i128::from(a) + i128::from(b)).to_string();
        let mut sum = x + y;
        let mut text = sum.str();
        prop_assert_eq!(text.as_str(), Some(expected.as_str()));
        unsafe { text.decref() };
        unsafe { sum.decref() };
        release(items);
    }

    #[test]
    fn test_string_literals_alias(s in "[a-z]{0,12}") {
        let leaked: &'static str = Box::leak(s.clone().into_boxed_str());
        let first = lit(leaked);
        prop_assert!(first.is(&lit(leaked)));
        prop_assert_eq!(first.as_str(), Some(s.as_str()));
    }
}
