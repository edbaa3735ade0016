//! Borrowing iterators for `SegmentedDeque`.

use allocator_api2::alloc::{Allocator, Global};
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::cursor::RawCursor;
use crate::raw::BlockIndex;

/// An iterator over references to elements of a `SegmentedDeque`.
///
/// Created by [`SegmentedDeque::iter`](crate::SegmentedDeque::iter).
pub struct Iter<'a, T, A: Allocator = Global> {
    pub(crate) buf: &'a BlockIndex<T, A>,
    /// Next element from the front
    pub(crate) front: RawCursor,
    /// One past the next element from the back
    pub(crate) back: RawCursor,
}

impl<'a, T, A: Allocator> Iter<'a, T, A> {
    const BLOCK_SIZE: usize = BlockIndex::<T, A>::BLOCK_SIZE;

    #[inline]
    fn remaining(&self) -> usize {
        self.back.position(Self::BLOCK_SIZE) - self.front.position(Self::BLOCK_SIZE)
    }
}

impl<'a, T, A: Allocator> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining() == 0 {
            return None;
        }
        let pos = self.front.resolve(Self::BLOCK_SIZE);
        let result = unsafe { &*self.buf.slot_ptr(pos.slot, pos.offset) };
        self.front.step_forward(Self::BLOCK_SIZE);
        Some(result)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.remaining() {
            self.front = self.back;
            return None;
        }
        self.front = self.front.seek(n as isize, Self::BLOCK_SIZE);
        self.next()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for Iter<'_, T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining() == 0 {
            return None;
        }
        self.back.step_back(Self::BLOCK_SIZE);
        Some(unsafe { &*self.buf.slot_ptr(self.back.slot, self.back.offset) })
    }
}

impl<T, A: Allocator> ExactSizeIterator for Iter<'_, T, A> {}

impl<T, A: Allocator> FusedIterator for Iter<'_, T, A> {}

impl<T, A: Allocator> Clone for Iter<'_, T, A> {
    fn clone(&self) -> Self {
        Iter {
            buf: self.buf,
            front: self.front,
            back: self.back,
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Iter<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over mutable references to elements of a `SegmentedDeque`.
///
/// Created by [`SegmentedDeque::iter_mut`](crate::SegmentedDeque::iter_mut).
pub struct IterMut<'a, T, A: Allocator = Global> {
    pub(crate) buf: &'a BlockIndex<T, A>,
    /// Next element from the front
    pub(crate) front: RawCursor,
    /// One past the next element from the back
    pub(crate) back: RawCursor,
    /// Holds the deque's exclusive borrow
    pub(crate) _marker: PhantomData<&'a mut T>,
}

impl<'a, T, A: Allocator> IterMut<'a, T, A> {
    const BLOCK_SIZE: usize = BlockIndex::<T, A>::BLOCK_SIZE;

    #[inline]
    fn remaining(&self) -> usize {
        self.back.position(Self::BLOCK_SIZE) - self.front.position(Self::BLOCK_SIZE)
    }
}

impl<'a, T, A: Allocator> Iterator for IterMut<'a, T, A> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining() == 0 {
            return None;
        }
        let pos = self.front.resolve(Self::BLOCK_SIZE);
        // Each slot is yielded at most once, so the references never alias.
        let result = unsafe { &mut *self.buf.slot_ptr(pos.slot, pos.offset) };
        self.front.step_forward(Self::BLOCK_SIZE);
        Some(result)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.remaining() {
            self.front = self.back;
            return None;
        }
        self.front = self.front.seek(n as isize, Self::BLOCK_SIZE);
        self.next()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IterMut<'_, T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining() == 0 {
            return None;
        }
        self.back.step_back(Self::BLOCK_SIZE);
        Some(unsafe { &mut *self.buf.slot_ptr(self.back.slot, self.back.offset) })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IterMut<'_, T, A> {}

impl<T, A: Allocator> FusedIterator for IterMut<'_, T, A> {}

impl<T, A: Allocator> fmt::Debug for IterMut<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut")
            .field("remaining", &self.remaining())
            .finish()
    }
}

// Safety: Iter only yields shared references
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Iter<'_, T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Send for Iter<'_, T, A> {}

// Safety: IterMut yields exclusive references
unsafe impl<T: Send, A: Allocator + Sync> Send for IterMut<'_, T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for IterMut<'_, T, A> {}
