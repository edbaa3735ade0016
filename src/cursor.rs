//! Positions inside a `SegmentedDeque`.
//!
//! A position is a block index slot plus an offset into that slot's segment.
//! The offset may equal the block size, meaning "just past the last element
//! of this segment"; that spot is the same logical position as offset 0 of
//! the next slot, and equality treats them as one.

use allocator_api2::alloc::{Allocator, Global};
use std::cmp::Ordering;
use std::fmt;
use std::ptr;

use crate::SegmentedDeque;

/// What a single step does next to the segment boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// The step stays inside the current segment.
    Within,
    /// The cursor sits on the segment edge and must cross to a neighbour
    /// slot first.
    Cross,
}

/// A (slot, offset) pair with `offset <= block_size`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawCursor {
    pub(crate) slot: usize,
    pub(crate) offset: usize,
}

impl RawCursor {
    #[inline]
    pub(crate) const fn new(slot: usize, offset: usize) -> Self {
        Self { slot, offset }
    }

    /// Splits a linear position into slot and offset.
    #[inline]
    pub(crate) const fn from_position(position: usize, block_size: usize) -> Self {
        Self {
            slot: position / block_size,
            offset: position % block_size,
        }
    }

    /// Linear position counted in elements from slot 0, offset 0.
    #[inline]
    pub(crate) const fn position(self, block_size: usize) -> usize {
        self.slot * block_size + self.offset
    }

    /// Same position with `offset < block_size`, so it can be dereferenced.
    #[inline]
    pub(crate) const fn resolve(self, block_size: usize) -> Self {
        if self.offset == block_size {
            Self::new(self.slot + 1, 0)
        } else {
            self
        }
    }

    #[inline]
    pub(crate) const fn forward_step(self, block_size: usize) -> Step {
        if self.offset == block_size {
            Step::Cross
        } else {
            Step::Within
        }
    }

    #[inline]
    pub(crate) const fn backward_step(self) -> Step {
        if self.offset == 0 {
            Step::Cross
        } else {
            Step::Within
        }
    }

    /// Moves one element forward.
    #[inline]
    pub(crate) fn step_forward(&mut self, block_size: usize) {
        if let Step::Cross = self.forward_step(block_size) {
            self.slot += 1;
            self.offset = 0;
        }
        self.offset += 1;
    }

    /// Moves one element back.
    #[inline]
    pub(crate) fn step_back(&mut self, block_size: usize) {
        if let Step::Cross = self.backward_step() {
            self.slot -= 1;
            self.offset = block_size;
        }
        self.offset -= 1;
    }

    /// Jumps by `delta` elements in O(1).
    ///
    /// # Panics
    ///
    /// Panics if the target lies before slot 0, offset 0.
    #[inline]
    pub(crate) fn seek(self, delta: isize, block_size: usize) -> Self {
        let position = self
            .position(block_size)
            .checked_add_signed(delta)
            .expect("cursor position overflow");
        Self::from_position(position, block_size)
    }
}

/// A read-only position in a [`SegmentedDeque`].
///
/// A cursor points either at an element or at the end boundary one past the
/// last element. It moves one element at a time with [`move_next`] and
/// [`move_prev`], or by any distance in constant time with [`seek`], crossing
/// segment boundaries transparently.
///
/// Cursors borrow the deque, so no mutation can happen while one is alive.
///
/// Two cursors compare equal when they point into the same deque and denote
/// the same element slot. Cursors into different deques are never equal and
/// have no ordering.
///
/// [`move_next`]: Cursor::move_next
/// [`move_prev`]: Cursor::move_prev
/// [`seek`]: Cursor::seek
///
/// # Example
///
/// ```
/// use segmented_deque::SegmentedDeque;
///
/// let deque: SegmentedDeque<i32> = (0..10).collect();
/// let mut cursor = deque.cursor_front();
/// assert_eq!(cursor.current(), Some(&0));
///
/// cursor.seek(7);
/// assert_eq!(cursor.current(), Some(&7));
///
/// cursor.move_prev();
/// assert_eq!(cursor.current(), Some(&6));
///
/// cursor.seek(4);
/// assert!(cursor.is_end());
/// assert_eq!(cursor, deque.cursor_end());
/// ```
pub struct Cursor<'a, T, A: Allocator = Global> {
    deque: &'a SegmentedDeque<T, A>,
    pos: RawCursor,
}

impl<'a, T, A: Allocator> Cursor<'a, T, A> {
    #[inline]
    pub(crate) fn new(deque: &'a SegmentedDeque<T, A>, pos: RawCursor) -> Self {
        Self { deque, pos }
    }

    #[inline]
    fn linear(&self) -> usize {
        self.pos.position(SegmentedDeque::<T, A>::BLOCK_SIZE)
    }

    /// Returns the index of the element under the cursor, or `len()` at the
    /// end boundary.
    #[inline]
    pub fn index(&self) -> usize {
        self.linear() - self.deque.start_position()
    }

    /// Returns `true` if the cursor is on the first element (or the end
    /// boundary of an empty deque).
    #[inline]
    pub fn is_front(&self) -> bool {
        self.index() == 0
    }

    /// Returns `true` if the cursor is on the end boundary.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.index() == self.deque.len()
    }

    /// Returns the element under the cursor, or `None` at the end boundary.
    #[inline]
    pub fn current(&self) -> Option<&'a T> {
        if self.is_end() {
            return None;
        }
        let pos = self.pos.resolve(SegmentedDeque::<T, A>::BLOCK_SIZE);
        Some(unsafe { &*self.deque.buf.slot_ptr(pos.slot, pos.offset) })
    }

    /// Moves to the next element.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already on the end boundary.
    #[inline]
    pub fn move_next(&mut self) {
        assert!(!self.is_end(), "cursor moved past the end boundary");
        self.pos.step_forward(SegmentedDeque::<T, A>::BLOCK_SIZE);
    }

    /// Moves to the previous element.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already on the first element.
    #[inline]
    pub fn move_prev(&mut self) {
        assert!(!self.is_front(), "cursor moved before the first element");
        self.pos.step_back(SegmentedDeque::<T, A>::BLOCK_SIZE);
    }

    /// Moves by `delta` elements (negative moves toward the front) in
    /// constant time.
    ///
    /// # Panics
    ///
    /// Panics if the target lies outside `0..=len()`.
    pub fn seek(&mut self, delta: isize) {
        let target = self.index().checked_add_signed(delta);
        assert!(
            matches!(target, Some(index) if index <= self.deque.len()),
            "cursor seek out of bounds: index {} moved by {} in a deque of length {}",
            self.index(),
            delta,
            self.deque.len()
        );
        self.pos = self.pos.seek(delta, SegmentedDeque::<T, A>::BLOCK_SIZE);
    }

    /// Returns a copy of this cursor moved by `delta` elements.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`seek`](Cursor::seek).
    #[inline]
    pub fn offset(mut self, delta: isize) -> Self {
        self.seek(delta);
        self
    }

    /// Returns `other.index() - self.index()`.
    ///
    /// Both cursors must point into the same deque.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> isize {
        debug_assert!(
            ptr::eq(self.deque, other.deque),
            "distance between cursors of different deques"
        );
        other.index() as isize - self.index() as isize
    }
}

impl<T, A: Allocator> Clone for Cursor<'_, T, A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Allocator> Copy for Cursor<'_, T, A> {}

impl<T, A: Allocator> PartialEq for Cursor<'_, T, A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.deque, other.deque) && self.linear() == other.linear()
    }
}

impl<T, A: Allocator> Eq for Cursor<'_, T, A> {}

impl<T, A: Allocator> PartialOrd for Cursor<'_, T, A> {
    /// Orders by position; cursors into different deques are unordered.
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if ptr::eq(self.deque, other.deque) {
            Some(self.linear().cmp(&other.linear()))
        } else {
            None
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Cursor<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index())
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BS: usize = 4;

    #[test]
    fn test_step_forward_crosses_lazily() {
        let mut cursor = RawCursor::new(0, 3);
        cursor.step_forward(BS);
        assert_eq!((cursor.slot, cursor.offset), (0, 4));
        assert_eq!(cursor.forward_step(BS), Step::Cross);

        cursor.step_forward(BS);
        assert_eq!((cursor.slot, cursor.offset), (1, 1));
        assert_eq!(cursor.position(BS), 5);
    }

    #[test]
    fn test_step_back_crosses() {
        let mut cursor = RawCursor::new(2, 0);
        assert_eq!(cursor.backward_step(), Step::Cross);
        cursor.step_back(BS);
        assert_eq!((cursor.slot, cursor.offset), (1, 3));
        cursor.step_back(BS);
        assert_eq!((cursor.slot, cursor.offset), (1, 2));
    }

    #[test]
    fn test_resolve_edge() {
        let edge = RawCursor::new(1, BS);
        let next = RawCursor::new(2, 0);
        assert_eq!(edge.position(BS), next.position(BS));
        let resolved = edge.resolve(BS);
        assert_eq!((resolved.slot, resolved.offset), (2, 0));
    }

    #[test]
    fn test_seek_matches_steps() {
        let start = RawCursor::new(1, 2);
        let mut stepped = start;
        for _ in 0..11 {
            stepped.step_forward(BS);
        }
        let jumped = start.seek(11, BS);
        assert_eq!(stepped.position(BS), jumped.position(BS));

        let back = jumped.seek(-11, BS);
        assert_eq!(back.position(BS), start.position(BS));
    }

    #[test]
    fn test_cursors_of_different_deques() {
        let a: SegmentedDeque<i32> = (0..10).collect();
        let b: SegmentedDeque<i32> = (0..10).collect();

        assert_ne!(a.cursor_front(), b.cursor_front());
        assert_eq!(a.cursor_front().partial_cmp(&b.cursor_end()), None);
        assert_eq!(a.cursor_front(), a.cursor_end().offset(-10));
        assert!(a.cursor_front() < a.cursor_end());
    }

    #[test]
    fn test_round_trip_steps() {
        let mut cursor = RawCursor::new(0, 1);
        for _ in 0..20 {
            cursor.step_forward(BS);
        }
        for _ in 0..20 {
            cursor.step_back(BS);
        }
        assert_eq!(cursor.position(BS), 1);
    }
}
