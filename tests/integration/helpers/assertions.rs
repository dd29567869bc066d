//! Order and content assertions for sorted output.

use xsort_lib::sort::{ComparisonMode, KeyDeriver};

/// Assert that `lines` are in non-decreasing key order under `mode`.
pub fn assert_sorted(lines: &[String], mode: ComparisonMode) {
    let deriver = KeyDeriver::new(mode);
    let keys: Vec<Vec<u8>> =
        lines.iter().map(|l| deriver.key_of(l).expect("output line is not a record")).collect();
    for (i, pair) in keys.windows(2).enumerate() {
        assert!(
            pair[0] <= pair[1],
            "lines {} and {} out of order under {mode}: {:?} > {:?}",
            i + 1,
            i + 2,
            lines[i],
            lines[i + 1]
        );
    }
}

/// Assert that `actual` holds exactly the lines of `expected`, in any order.
pub fn assert_same_lines(actual: &[String], expected: &[String]) {
    let mut a = actual.to_vec();
    let mut b = expected.to_vec();
    a.sort();
    b.sort();
    assert_eq!(a.len(), b.len(), "record count differs");
    assert!(a == b, "output is not a permutation of the input");
}

/// Expected output: `lines` sorted by derived key.
pub fn sorted_by_key(lines: &[String], mode: ComparisonMode) -> Vec<String> {
    let deriver = KeyDeriver::new(mode);
    let mut sorted = lines.to_vec();
    sorted.sort_by_cached_key(|l| deriver.key_of(l).expect("input line is not a record"));
    sorted
}
