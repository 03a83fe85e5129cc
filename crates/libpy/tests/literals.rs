// Literal cache integration tests

use libpy::{Lit, Object, lit};
use std::thread;

#[test]
fn test_same_literal_aliases() {
    assert!(lit("c").is(&lit("c")));
    assert!(lit('c').is(&lit('c')));
    assert!(lit(1).is(&lit(1)));
    assert!(lit(1.5).is(&lit(1.5)));
}

#[test]
fn test_distinct_literals_never_alias() {
    let all = [lit("c"), lit('d'), lit(1), lit(2), lit(1.5), lit(2.5), lit("d")];
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            assert!(!a.is(b), "{a} aliases {b}");
        }
    }
}

#[test]
fn test_trait_and_function_agree() {
    assert!(42i32.lit().is(&lit(42i64)));
    assert!("s".lit().is(&lit("s")));
}

/// Threads filling the cache concurrently all see one object.
#[test]
fn test_cache_shared_across_threads() {
    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| lit(987_654_321i64).as_ptr() as usize))
        .collect();
    let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(addrs[0], lit(987_654_321).as_ptr() as usize);
}

#[test]
fn test_values() {
    let cases: [(Object, &str); 4] = [
        (lit(-7), "-7"),
        (lit(0.1), "0.1"),
        (lit("héllo"), "héllo"),
        (lit('é'), "é"),
    ];
    for (ob, text) in cases {
        assert_eq!(ob.to_string(), text);
    }
    assert_eq!(lit('é').len(), 1);
    assert_eq!(lit("héllo").len(), 5);
}
