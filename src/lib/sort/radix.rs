//! Radix sorts over variable-length byte keys.
//!
//! Both sorts reorder a slice of small `Copy` items (typically arena offsets)
//! by the byte key a closure returns for each item, producing the same order as
//! a plain lexicographic comparison of the keys. A key that ends at depth `d`
//! sorts below every key that still has a byte at `d`.
//!
//! # Algorithms
//!
//! - [`radix_quicksort`]: three-way (Bentley-Sedgewick) radix quicksort. Items
//!   are partitioned around the byte of the middle item at the current depth
//!   into `<`, `=` and `>` runs; only the `=` run advances to the next depth.
//! - [`counting_radix_sort`]: MSD counting sort with 257 buckets (exhausted
//!   plus one per byte value). Buckets at or below [`COUNTING_THRESHOLD`] items
//!   fall back to the radix quicksort.
//!
//! Neither algorithm recurses; pending ranges live on an explicit work stack so
//! long shared prefixes cannot overflow the thread stack.
//!
//! The module also hosts the fixed-array heap used by the merge phase and the
//! comparison-sort helpers used for the `comparison` algorithm.

use std::cmp::Ordering;

/// Buckets in the counting sort: one for "key exhausted" plus 256 byte values.
const BUCKETS: usize = 257;

/// Ranges at or below this size are handed from the counting sort to the radix quicksort.
pub const COUNTING_THRESHOLD: usize = 64;

/// Byte of `key` at `depth`, or -1 once the key is exhausted.
#[inline]
fn byte_at(key: &[u8], depth: usize) -> i32 {
    key.get(depth).map_or(-1, |&b| i32::from(b))
}

/// Counting-sort bucket of `key` at `depth` (0 when exhausted).
#[inline]
fn bucket_at(key: &[u8], depth: usize) -> usize {
    key.get(depth).map_or(0, |&b| usize::from(b) + 1)
}

/// Compare two keys from `depth` onwards.
#[inline]
fn cmp_from(a: &[u8], b: &[u8], depth: usize) -> Ordering {
    a[depth.min(a.len())..].cmp(&b[depth.min(b.len())..])
}

#[inline]
fn swap_if_greater<'k, T, F>(items: &mut [T], i: usize, j: usize, depth: usize, key: &F)
where
    F: Fn(&T) -> &'k [u8],
{
    if cmp_from(key(&items[i]), key(&items[j]), depth) == Ordering::Greater {
        items.swap(i, j);
    }
}

/// Swap the `len` items starting at `i` with the `len` items starting at `j`.
#[inline]
fn vec_swap<T>(items: &mut [T], mut i: usize, mut j: usize, len: usize) {
    for _ in 0..len {
        items.swap(i, j);
        i += 1;
        j += 1;
    }
}

// ============================================================================
// Three-way Radix Quicksort
// ============================================================================

/// Sort `items` by key using three-way radix quicksort.
///
/// # Example
/// ```
/// use xsort_lib::sort::radix::radix_quicksort;
///
/// let mut words: Vec<&[u8]> = vec![&b"pear"[..], &b"apple"[..], &b"app"[..], &b"pea"[..]];
/// radix_quicksort(&mut words, |w| *w);
/// assert_eq!(words, [&b"app"[..], &b"apple"[..], &b"pea"[..], &b"pear"[..]]);
/// ```
pub fn radix_quicksort<'k, T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &'k [u8],
{
    radix_quicksort_from(items, 0, &key);
}

/// Radix quicksort of items whose keys are already known equal before `depth`.
fn radix_quicksort_from<'k, T, F>(items: &mut [T], depth: usize, key: &F)
where
    F: Fn(&T) -> &'k [u8],
{
    let mut stack: Vec<(usize, usize, usize)> = vec![(0, items.len(), depth)];

    while let Some((lo, hi, d)) = stack.pop() {
        let s = &mut items[lo..hi];
        let n = s.len();
        match n {
            0 | 1 => continue,
            2 => {
                swap_if_greater(s, 0, 1, d, key);
                continue;
            }
            3 => {
                swap_if_greater(s, 0, 2, d, key);
                swap_if_greater(s, 1, 2, d, key);
                swap_if_greater(s, 0, 1, d, key);
                continue;
            }
            _ => {}
        }

        let (less, pivot, greater) = partition(s, d, key);
        let equal_end = hi - greater;

        if less > 1 {
            stack.push((lo, lo + less, d));
        }
        // An exhausted pivot means every key in the equal run is identical.
        if pivot >= 0 && equal_end - (lo + less) > 1 {
            stack.push((lo + less, equal_end, d + 1));
        }
        if greater > 1 {
            stack.push((equal_end, hi, d));
        }
    }
}

/// Partition `s` around the byte at `depth` of its middle item.
///
/// Returns the sizes of the `<` and `>` runs (placed at the front and back) and
/// the pivot byte. Items equal to the pivot end up in between.
fn partition<'k, T, F>(s: &mut [T], depth: usize, key: &F) -> (usize, i32, usize)
where
    F: Fn(&T) -> &'k [u8],
{
    let n = s.len();
    s.swap(0, n / 2);
    let v = byte_at(key(&s[0]), depth);

    // [0, a) and (d, n) hold pivot-equal items, [a, b) less, (c, d] greater.
    let (mut a, mut b) = (1, 1);
    let (mut c, mut d) = (n - 1, n - 1);
    loop {
        while b <= c {
            let t = byte_at(key(&s[b]), depth);
            if t > v {
                break;
            }
            if t == v {
                s.swap(a, b);
                a += 1;
            }
            b += 1;
        }
        while b <= c {
            let t = byte_at(key(&s[c]), depth);
            if t < v {
                break;
            }
            if t == v {
                s.swap(c, d);
                d -= 1;
            }
            c -= 1;
        }
        if b > c {
            break;
        }
        s.swap(b, c);
        b += 1;
        c -= 1;
    }

    let less = b - a;
    let greater = d - c;
    let r = a.min(less);
    vec_swap(s, 0, b - r, r);
    let r = greater.min(n - 1 - d);
    vec_swap(s, b, n - r, r);

    (less, v, greater)
}

// ============================================================================
// MSD Counting Radix Sort
// ============================================================================

/// Sort `items` by key using an MSD counting radix sort.
///
/// Counting passes are stable; ranges handed to the quicksort are not.
///
/// # Example
/// ```
/// use xsort_lib::sort::radix::counting_radix_sort;
///
/// let mut words: Vec<&[u8]> = vec![&b"b"[..], &b""[..], &b"ab"[..], &b"a"[..]];
/// counting_radix_sort(&mut words, |w| *w);
/// assert_eq!(words, [&b""[..], &b"a"[..], &b"ab"[..], &b"b"[..]]);
/// ```
pub fn counting_radix_sort<'k, T, F>(items: &mut [T], key: F)
where
    T: Copy,
    F: Fn(&T) -> &'k [u8],
{
    if items.len() <= COUNTING_THRESHOLD {
        radix_quicksort_from(items, 0, &key);
        return;
    }

    let mut aux: Vec<T> = items.to_vec();
    let mut counts = vec![0usize; BUCKETS];
    let mut next = vec![0usize; BUCKETS];
    let mut stack: Vec<(usize, usize, usize)> = vec![(0, items.len(), 0)];

    while let Some((lo, hi, depth)) = stack.pop() {
        if hi - lo <= COUNTING_THRESHOLD {
            radix_quicksort_from(&mut items[lo..hi], depth, &key);
            continue;
        }

        counts.fill(0);
        for item in &items[lo..hi] {
            counts[bucket_at(key(item), depth)] += 1;
        }

        let mut total = lo;
        for (start, &count) in next.iter_mut().zip(counts.iter()) {
            *start = total;
            total += count;
        }

        for item in &items[lo..hi] {
            let bucket = bucket_at(key(item), depth);
            aux[next[bucket]] = *item;
            next[bucket] += 1;
        }
        items[lo..hi].copy_from_slice(&aux[lo..hi]);

        // After the scatter `next[b]` is the end of bucket `b`. Bucket 0 holds
        // exhausted keys, which are all equal.
        for bucket in 1..BUCKETS {
            let count = counts[bucket];
            if count > 1 {
                let end = next[bucket];
                stack.push((end - count, end, depth + 1));
            }
        }
    }
}

// ============================================================================
// Fixed-Array Heap (ks_heapadjust style)
// ============================================================================

/// In-place heap adjustment (sift-down) of a max-heap under `lt`.
///
/// Pass a reversed comparator to get a min-heap.
///
/// # Arguments
/// * `heap` - The heap array
/// * `i` - Index to sift down from
/// * `n` - Heap size (may be less than array length)
/// * `lt` - Less-than comparator
#[inline]
pub fn heap_sift_down<T, F>(heap: &mut [T], mut i: usize, n: usize, lt: &F)
where
    F: Fn(&T, &T) -> bool,
{
    loop {
        let left = 2 * i + 1;
        if left >= n {
            break;
        }

        let right = left + 1;
        let mut child = left;
        if right < n && lt(&heap[left], &heap[right]) {
            child = right;
        }

        if !lt(&heap[i], &heap[child]) {
            break;
        }

        heap.swap(i, child);
        i = child;
    }
}

/// Build a heap from an unsorted array (heapify).
#[inline]
pub fn heap_make<T, F>(heap: &mut [T], lt: &F)
where
    F: Fn(&T, &T) -> bool,
{
    let n = heap.len();
    for i in (0..n / 2).rev() {
        heap_sift_down(heap, i, n, lt);
    }
}

/// Remove the top element from a heap of size `n`.
///
/// The last element moves to the root and sifts down; the removed element ends
/// up at `heap[n - 1]`. Returns the new heap size.
#[inline]
pub fn heap_pop<T, F>(heap: &mut [T], n: usize, lt: &F) -> usize
where
    F: Fn(&T, &T) -> bool,
{
    if n <= 1 {
        return 0;
    }
    let new_n = n - 1;
    heap.swap(0, new_n);
    heap_sift_down(heap, 0, new_n, lt);
    new_n
}

// ============================================================================
// Comparison Sort Helpers
// ============================================================================

/// Binary insertion sort with comparison function.
#[inline]
pub fn binary_insertion_sort<T, F>(arr: &mut [T], compare: F)
where
    F: Fn(&T, &T) -> Ordering,
{
    for i in 1..arr.len() {
        let mut lo = 0;
        let mut hi = i;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if compare(&arr[mid], &arr[i]) == Ordering::Greater {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        if lo < i {
            arr[lo..=i].rotate_right(1);
        }
    }
}

/// Hybrid sort: binary insertion for small arrays, otherwise a (parallel)
/// pattern-defeating quicksort.
pub fn hybrid_sort<T: Send, F>(arr: &mut [T], compare: F, parallel: bool)
where
    F: Fn(&T, &T) -> Ordering + Sync,
{
    const INSERTION_THRESHOLD: usize = 32;

    if arr.len() <= INSERTION_THRESHOLD {
        binary_insertion_sort(arr, compare);
    } else if parallel {
        use rayon::prelude::*;
        arr.par_sort_unstable_by(|a, b| compare(a, b));
    } else {
        arr.sort_unstable_by(|a, b| compare(a, b));
    }
}
