//! Property-based tests using proptest
//!
//! These generate random key multisets and operation sequences and verify the
//! heap's observable behavior: extraction order, meld as multiset union, and
//! decrease_key as a single-key rewrite.  Heaps are seeded so failures replay.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use skewmeld::{Error, SkewHeap};

fn heap_from(values: &[i32], flip_probability: f64, seed: u64) -> SkewHeap<i32> {
    let mut heap = SkewHeap::with_rng(flip_probability, StdRng::seed_from_u64(seed)).unwrap();
    heap.extend(values.iter().copied());
    heap
}

fn drain(heap: &mut SkewHeap<i32>) -> Vec<i32> {
    let mut res = Vec::new();
    while let Some(x) = heap.pop_min() {
        res.push(x);
    }
    res
}

proptest! {
    #[test]
    fn extraction_is_the_sorted_multiset(
        values in prop::collection::vec(-1000i32..1000, 0..100),
        flip_probability in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let mut heap = heap_from(&values, flip_probability, seed);
        prop_assert_eq!(heap.len(), values.len());
        let mut expected = values;
        expected.sort();
        prop_assert_eq!(drain(&mut heap), expected);
        prop_assert!(heap.is_empty());
    }

    #[test]
    fn meld_is_the_sorted_union(
        a in prop::collection::vec(-1000i32..1000, 0..60),
        b in prop::collection::vec(-1000i32..1000, 0..60),
        flip_probability in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let mut x = heap_from(&a, flip_probability, seed);
        let y = heap_from(&b, flip_probability, seed.wrapping_add(1));
        x.meld(y);
        let mut expected = a;
        expected.extend(&b);
        expected.sort();
        prop_assert_eq!(x.len(), expected.len());
        prop_assert_eq!(drain(&mut x), expected);
    }

    #[test]
    fn meld_with_empty_is_identity(
        values in prop::collection::vec(-1000i32..1000, 1..60),
        seed in any::<u64>()
    ) {
        let mut heap = heap_from(&values, 1.0, seed);
        heap.meld(heap_from(&[], 1.0, seed.wrapping_add(1)));
        let mut expected = values;
        expected.sort();
        prop_assert_eq!(drain(&mut heap), expected);
    }

    #[test]
    fn decrease_key_rewrites_exactly_one_key(
        values in prop::collection::vec(-100_000i32..100_000, 1..60),
        which in any::<prop::sample::Index>(),
        delta in 0i32..1000,
        seed in any::<u64>()
    ) {
        let mut heap = SkewHeap::with_rng(1.0, StdRng::seed_from_u64(seed)).unwrap();
        let handles: Vec<_> = values.iter().map(|&x|heap.push(x)).collect();
        let at = which.index(values.len());
        heap.decrease_key(handles[at], values[at] - delta).unwrap();
        let mut expected = values;
        expected[at] -= delta;
        expected.sort();
        prop_assert_eq!(drain(&mut heap), expected);
    }

    #[test]
    fn decrease_key_rejection_leaves_heap_intact(
        values in prop::collection::vec(-1000i32..1000, 1..60),
        which in any::<prop::sample::Index>(),
        delta in 1i32..1000,
        seed in any::<u64>()
    ) {
        let mut heap = SkewHeap::with_rng(1.0, StdRng::seed_from_u64(seed)).unwrap();
        let handles: Vec<_> = values.iter().map(|&x|heap.push(x)).collect();
        let at = which.index(values.len());
        let comparisons = heap.comparison_count();
        let flips = heap.flip_count();
        prop_assert_eq!(
            heap.decrease_key(handles[at], values[at] + delta),
            Err(Error::KeyNotDecreased)
        );
        prop_assert_eq!(heap.comparison_count(), comparisons);
        prop_assert_eq!(heap.flip_count(), flips);
        let mut expected = values;
        expected.sort();
        prop_assert_eq!(drain(&mut heap), expected);
    }

    #[test]
    fn peek_tracks_the_running_minimum(
        ops in prop::collection::vec((any::<bool>(), -1000i32..1000), 0..200),
        flip_probability in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let mut heap = SkewHeap::with_rng(flip_probability, StdRng::seed_from_u64(seed)).unwrap();
        let mut shadow: Vec<i32> = Vec::new();
        for (should_pop, value) in ops {
            if should_pop && !shadow.is_empty() {
                let min = heap.pop_min().unwrap();
                let at = shadow.iter().position(|&x|x == min).unwrap();
                shadow.swap_remove(at);
                prop_assert!(shadow.iter().all(|&x|min <= x));
            } else {
                heap.push(value);
                shadow.push(value);
            }
            prop_assert_eq!(heap.peek_min(), shadow.iter().min());
            prop_assert_eq!(heap.len(), shadow.len());
        }
    }

    #[test]
    fn counters_are_monotone(
        ops in prop::collection::vec((any::<bool>(), -1000i32..1000), 0..200),
        flip_probability in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let mut heap = SkewHeap::with_rng(flip_probability, StdRng::seed_from_u64(seed)).unwrap();
        let (mut comparisons, mut flips) = (0, 0);
        for (should_pop, value) in ops {
            if should_pop {
                heap.pop_min();
            } else {
                heap.push(value);
            }
            prop_assert!(heap.comparison_count() >= comparisons);
            prop_assert!(heap.flip_count() >= flips);
            comparisons = heap.comparison_count();
            flips = heap.flip_count();
        }
        // a flip probability of zero must never flip
        if flip_probability == 0.0 {
            prop_assert_eq!(flips, 0);
        }
    }
}
