//! Benchmarks comparing SegmentedDeque with std::collections::VecDeque using divan.
//!
//! Run with: `cargo bench`

use segmented_deque::SegmentedDeque;
use std::collections::VecDeque;

fn main() {
    divan::main();
}

// Trait to abstract over VecDeque and SegmentedDeque for generic benchmarks
trait DequeLike<T>: Default {
    fn push_back(&mut self, val: T);
    fn push_front(&mut self, val: T);
    fn pop_back(&mut self) -> Option<T>;
    fn pop_front(&mut self) -> Option<T>;
    fn get(&self, idx: usize) -> Option<&T>;
    fn iter<'a>(&'a self) -> impl DoubleEndedIterator<Item = &'a T>
    where
        T: 'a;
}

impl<T> DequeLike<T> for VecDeque<T> {
    fn push_back(&mut self, val: T) {
        self.push_back(val);
    }
    fn push_front(&mut self, val: T) {
        self.push_front(val);
    }
    fn pop_back(&mut self) -> Option<T> {
        self.pop_back()
    }
    fn pop_front(&mut self) -> Option<T> {
        self.pop_front()
    }
    fn get(&self, idx: usize) -> Option<&T> {
        self.get(idx)
    }
    fn iter<'a>(&'a self) -> impl DoubleEndedIterator<Item = &'a T>
    where
        T: 'a,
    {
        VecDeque::iter(self)
    }
}

impl<T> DequeLike<T> for SegmentedDeque<T> {
    fn push_back(&mut self, val: T) {
        self.push_back(val);
    }
    fn push_front(&mut self, val: T) {
        self.push_front(val);
    }
    fn pop_back(&mut self) -> Option<T> {
        self.pop_back()
    }
    fn pop_front(&mut self) -> Option<T> {
        self.pop_front()
    }
    fn get(&self, idx: usize) -> Option<&T> {
        self.get(idx)
    }
    fn iter<'a>(&'a self) -> impl DoubleEndedIterator<Item = &'a T>
    where
        T: 'a,
    {
        SegmentedDeque::iter(self)
    }
}

fn filled<D: DequeLike<i32>>(n: usize) -> D {
    let mut d = D::default();
    for i in 0..n as i32 {
        d.push_back(i);
    }
    d
}

// ============================================================================
// Push Benchmarks
// ============================================================================

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn push_back<D: DequeLike<i32>, const N: usize>() -> D {
    let mut d = D::default();
    for i in 0..N as i32 {
        d.push_back(i);
    }
    d
}

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn push_front<D: DequeLike<i32>, const N: usize>() -> D {
    let mut d = D::default();
    for i in 0..N as i32 {
        d.push_front(i);
    }
    d
}

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn push_alternating<D: DequeLike<i32>, const N: usize>() -> D {
    let mut d = D::default();
    for i in 0..N as i32 {
        if i % 2 == 0 {
            d.push_back(i);
        } else {
            d.push_front(i);
        }
    }
    d
}

// ============================================================================
// Pop Benchmarks
// ============================================================================

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn pop_front<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<D>(N))
        .bench_local_values(|mut d| {
            while d.pop_front().is_some() {}
            d
        });
}

/// Queue usage: the working set stays small while elements stream through.
#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn fifo_stream<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<D>(64))
        .bench_local_values(|mut d| {
            for i in 0..N as i32 {
                d.push_back(i);
                d.pop_front();
            }
            d
        });
}

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn pop_back<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<D>(N))
        .bench_local_values(|mut d| {
            while d.pop_back().is_some() {}
            d
        });
}

// ============================================================================
// Access Benchmarks
// ============================================================================

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn random_read<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    use rand::prelude::*;
    let mut rng = rand::rng();
    let indices: Vec<usize> = (0..1000).map(|_| rng.random_range(0..N)).collect();

    bencher
        .with_inputs(|| filled::<D>(N))
        .bench_local_refs(|d| {
            let mut sum = 0i32;
            for &i in &indices {
                sum = sum.wrapping_add(*d.get(i).unwrap());
            }
            sum
        });
}

// ============================================================================
// Iteration Benchmarks
// ============================================================================

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn iterate<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<D>(N))
        .bench_local_refs(|d| {
            let mut sum = 0i32;
            for &x in d.iter() {
                sum = sum.wrapping_add(x);
            }
            sum
        });
}

#[divan::bench(types = [VecDeque<i32>, SegmentedDeque<i32>], consts = [100, 10000, 1000000])]
fn iterate_rev<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<D>(N))
        .bench_local_refs(|d| {
            let mut sum = 0i32;
            for &x in d.iter().rev() {
                sum = sum.wrapping_add(x);
            }
            sum
        });
}
