//! Owning iterator for `SegmentedDeque`.

use allocator_api2::alloc::{Allocator, Global};
use std::fmt;
use std::iter::FusedIterator;

use crate::SegmentedDeque;

/// An owning iterator over elements of a `SegmentedDeque`.
///
/// This struct is created by the `into_iter` method on `SegmentedDeque`
/// (provided by the [`IntoIterator`] trait).
pub struct IntoIter<T, A: Allocator = Global> {
    pub(crate) inner: SegmentedDeque<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    /// Creates a new owning iterator from a `SegmentedDeque`.
    #[inline]
    pub fn new(deque: SegmentedDeque<T, A>) -> Self {
        Self { inner: deque }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.inner.len();
        (remaining, Some(remaining))
    }

    #[inline]
    fn count(self) -> usize {
        self.inner.len()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

// Remaining elements are dropped along with `inner`.

impl<T: Clone, A: Allocator + Clone> Clone for IntoIter<T, A> {
    fn clone(&self) -> Self {
        IntoIter {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.inner).finish()
    }
}
