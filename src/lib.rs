//! A double-ended queue stored as fixed-size segments behind a block index.
//!
//! Unlike a ring buffer, growing never moves existing elements: a full end
//! gets a fresh segment, and only the small index of segment pointers is ever
//! copied or shifted. Random access stays O(1) because every segment holds
//! the same number of elements.
//!
//! # Example
//!
//! ```
//! use segmented_deque::SegmentedDeque;
//!
//! let mut deque: SegmentedDeque<i32> = SegmentedDeque::new();
//! deque.push_back(1);
//! deque.push_back(2);
//! deque.push_back(3);
//! deque.push_front(0);
//!
//! assert_eq!(deque.iter().copied().collect::<Vec<_>>(), [0, 1, 2, 3]);
//! assert_eq!(deque[2], 2);
//! assert_eq!(deque.pop_front(), Some(0));
//! assert_eq!(deque.pop_back(), Some(3));
//! ```

mod cursor;
mod into_iter;
mod iter;
mod macros;
mod raw;

use allocator_api2::alloc::{Allocator, Global};
pub use cursor::Cursor;
pub use into_iter::IntoIter;
pub use iter::{Iter, IterMut};

use cursor::RawCursor;
use raw::BlockIndex;
use std::alloc::Layout;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// The error type for the `try_push_*` operations.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error(transparent)]
pub struct TryReserveError {
    kind: TryReserveErrorKind,
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
enum TryReserveErrorKind {
    /// The capacity computation overflowed.
    #[error("memory allocation failed due to capacity overflow")]
    CapacityOverflow,
    /// Memory allocation failed.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError { layout: Layout },
}

impl TryReserveError {
    pub(crate) fn capacity_overflow() -> Self {
        Self {
            kind: TryReserveErrorKind::CapacityOverflow,
        }
    }

    pub(crate) fn alloc_error(layout: Layout) -> Self {
        Self {
            kind: TryReserveErrorKind::AllocError { layout },
        }
    }

    /// Returns the layout of the failed request, if the allocator refused it.
    pub fn layout(&self) -> Option<Layout> {
        match self.kind {
            TryReserveErrorKind::CapacityOverflow => None,
            TryReserveErrorKind::AllocError { layout } => Some(layout),
        }
    }

    /// Reports the failure the way the infallible operations do.
    #[cold]
    fn handle(self) -> ! {
        match self.kind {
            TryReserveErrorKind::CapacityOverflow => panic!("capacity overflow"),
            TryReserveErrorKind::AllocError { layout } => std::alloc::handle_alloc_error(layout),
        }
    }
}

/// A double-ended queue made of fixed-size segments.
///
/// # Memory Layout
///
/// Elements live in segments of [`block_size`](Self::block_size) slots each:
/// `4096 / size_of::<T>()` (at least 16) for elements under 256 bytes, and 16
/// for larger ones. A block index holds one pointer per segment, in sequence
/// order, always packed from its first slot and always keeping one slot
/// spare.
///
/// - Pushing at the back fills the last segment, then appends a new one.
/// - Pushing at the front fills the first segment backwards, then shifts the
///   index right by one slot and puts a new segment in front.
/// - The index doubles when the spare slot would be used up.
/// - Popping never frees segments; they are reused by later pushes and
///   released by [`clear`](Self::clear) or drop. A segment emptied at one
///   end is moved round to the other end when that end runs out of room, so
///   queue-style use holds a bounded number of segments.
pub struct SegmentedDeque<T, A: Allocator = Global> {
    /// Segment and index storage
    pub(crate) buf: BlockIndex<T, A>,
    /// First element
    start: RawCursor,
    /// One past the last element
    finish: RawCursor,
    /// Marker for drop check
    _marker: PhantomData<T>,
}

impl<T> SegmentedDeque<T> {
    /// Creates a new empty `SegmentedDeque`.
    ///
    /// Does not allocate until elements are pushed.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    /// let deque: SegmentedDeque<i32> = SegmentedDeque::new();
    /// assert!(deque.is_empty());
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, A: Allocator> SegmentedDeque<T, A> {
    pub(crate) const BLOCK_SIZE: usize = BlockIndex::<T, A>::BLOCK_SIZE;

    /// Creates a new empty `SegmentedDeque` that allocates from `alloc`.
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buf: BlockIndex::new_in(alloc),
            start: RawCursor::new(0, 0),
            finish: RawCursor::new(0, 0),
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements held by each segment.
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    /// assert_eq!(SegmentedDeque::<u32>::block_size(), 1024);
    /// assert_eq!(SegmentedDeque::<[u8; 512]>::block_size(), 16);
    /// ```
    #[inline]
    pub const fn block_size() -> usize {
        Self::BLOCK_SIZE
    }

    /// Returns a reference to the underlying allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Returns the number of elements in the deque.
    #[inline]
    pub fn len(&self) -> usize {
        self.finish.position(Self::BLOCK_SIZE) - self.start_position()
    }

    /// Returns `true` if the deque contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn start_position(&self) -> usize {
        self.start.position(Self::BLOCK_SIZE)
    }

    /// Returns the number of allocated segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.buf.segment_count()
    }

    /// Returns the number of segment slots in the block index.
    #[inline]
    pub fn index_capacity(&self) -> usize {
        self.buf.map_size()
    }

    /// Makes room for one element after the back, re-anchoring `finish`
    /// at the start of the next segment.
    #[cold]
    #[inline(never)]
    fn reserve_back_slow(&mut self) -> Result<(), TryReserveError> {
        let count = self.buf.segment_count();
        if count == 0 {
            self.buf.push_back_segment()?;
            self.start = RawCursor::new(0, 0);
            self.finish = RawCursor::new(0, 0);
            return Ok(());
        }

        // Segments kept from earlier pops are reused before allocating. An
        // empty segment left behind the front moves to the back.
        if self.finish.slot + 1 == count {
            if self.start.slot > 0 {
                self.buf.rotate_front_to_back();
                self.start.slot -= 1;
                self.finish.slot -= 1;
            } else {
                self.buf.push_back_segment()?;
            }
        }
        self.finish = RawCursor::new(self.finish.slot + 1, 0);
        Ok(())
    }

    /// Makes room for one element before the front, re-anchoring `start`
    /// at the end boundary of the previous segment.
    #[cold]
    #[inline(never)]
    fn reserve_front_slow(&mut self) -> Result<(), TryReserveError> {
        let count = self.buf.segment_count();
        if count == 0 {
            self.buf.push_front_segment()?;
            self.start = RawCursor::new(0, Self::BLOCK_SIZE);
            self.finish = RawCursor::new(0, Self::BLOCK_SIZE);
            return Ok(());
        }

        if self.start.slot == 0 {
            if self.finish.slot + 1 < count {
                self.buf.rotate_back_to_front();
            } else {
                self.buf.push_front_segment()?;
            }
            self.start.slot += 1;
            self.finish.slot += 1;
        }
        self.start = RawCursor::new(self.start.slot - 1, Self::BLOCK_SIZE);
        Ok(())
    }

    #[inline]
    fn reserve_back(&mut self) -> Result<(), TryReserveError> {
        if self.finish.offset == Self::BLOCK_SIZE || self.buf.segment_count() == 0 {
            self.reserve_back_slow()?;
        }
        Ok(())
    }

    #[inline]
    fn reserve_front(&mut self) -> Result<(), TryReserveError> {
        if self.start.offset == 0 || self.buf.segment_count() == 0 {
            self.reserve_front_slow()?;
        }
        Ok(())
    }

    /// Writes `value` at `finish` and advances it.
    ///
    /// # Safety
    ///
    /// `reserve_back` must have succeeded since the last change to `finish`.
    #[inline]
    unsafe fn write_back(&mut self, value: T) {
        self.buf
            .slot_ptr(self.finish.slot, self.finish.offset)
            .write(value);
        self.finish.offset += 1;
    }

    /// Moves `start` back by one and writes `value` there.
    ///
    /// # Safety
    ///
    /// `reserve_front` must have succeeded since the last change to `start`.
    #[inline]
    unsafe fn write_front(&mut self, value: T) {
        self.start.offset -= 1;
        self.buf
            .slot_ptr(self.start.slot, self.start.offset)
            .write(value);
    }

    /// Appends an element to the back of the deque.
    ///
    /// # Panics
    ///
    /// Panics if the block index size overflows `usize`, and aborts through
    /// [`handle_alloc_error`](std::alloc::handle_alloc_error) if allocation
    /// fails.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    /// let mut deque: SegmentedDeque<i32> = SegmentedDeque::new();
    /// deque.push_back(1);
    /// deque.push_back(2);
    /// assert_eq!(deque.back(), Some(&2));
    /// ```
    #[inline]
    pub fn push_back(&mut self, value: T) {
        if let Err(err) = self.reserve_back() {
            err.handle();
        }
        unsafe { self.write_back(value) };
    }

    /// Prepends an element to the front of the deque.
    ///
    /// # Panics
    ///
    /// Same as [`push_back`](Self::push_back).
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    /// let mut deque: SegmentedDeque<i32> = SegmentedDeque::new();
    /// deque.push_front(1);
    /// deque.push_front(2);
    /// assert_eq!(deque.front(), Some(&2));
    /// ```
    #[inline]
    pub fn push_front(&mut self, value: T) {
        if let Err(err) = self.reserve_front() {
            err.handle();
        }
        unsafe { self.write_front(value) };
    }

    /// Appends an element to the back, returning an error instead of
    /// aborting if memory cannot be allocated.
    ///
    /// On error the deque is left exactly as it was and `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<(), TryReserveError> {
        self.reserve_back()?;
        unsafe { self.write_back(value) };
        Ok(())
    }

    /// Prepends an element to the front, returning an error instead of
    /// aborting if memory cannot be allocated.
    ///
    /// On error the deque is left exactly as it was and `value` is dropped.
    pub fn try_push_front(&mut self, value: T) -> Result<(), TryReserveError> {
        self.reserve_front()?;
        unsafe { self.write_front(value) };
        Ok(())
    }

    /// Removes the last element and returns it, or `None` if empty.
    ///
    /// The segment it lived in is kept for later pushes.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    /// let mut deque: SegmentedDeque<i32> = (1..=2).collect();
    /// assert_eq!(deque.pop_back(), Some(2));
    /// assert_eq!(deque.pop_back(), Some(1));
    /// assert_eq!(deque.pop_back(), None);
    /// ```
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.finish.step_back(Self::BLOCK_SIZE);
        Some(unsafe {
            self.buf
                .slot_ptr(self.finish.slot, self.finish.offset)
                .read()
        })
    }

    /// Removes the first element and returns it, or `None` if empty.
    ///
    /// The segment it lived in is kept for later pushes.
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let pos = self.start.resolve(Self::BLOCK_SIZE);
        let value = unsafe { self.buf.slot_ptr(pos.slot, pos.offset).read() };
        self.start = RawCursor::new(pos.slot, pos.offset + 1);
        Some(value)
    }

    /// Returns the slot and offset holding the element at `index`.
    #[inline]
    fn locate(&self, index: usize) -> RawCursor {
        RawCursor::from_position(self.start_position() + index, Self::BLOCK_SIZE)
    }

    /// Returns a reference to the element at the given index.
    ///
    /// Returns `None` if the index is out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            let pos = self.locate(index);
            Some(unsafe { &*self.buf.slot_ptr(pos.slot, pos.offset) })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the element at the given index.
    ///
    /// Returns `None` if the index is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            let pos = self.locate(index);
            Some(unsafe { &mut *self.buf.slot_ptr(pos.slot, pos.offset) })
        } else {
            None
        }
    }

    /// Returns a reference to the first element, or `None` if empty.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns a mutable reference to the first element, or `None` if empty.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    /// Returns a reference to the last element, or `None` if empty.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        let len = self.len();
        if len == 0 {
            None
        } else {
            self.get(len - 1)
        }
    }

    /// Returns a mutable reference to the last element, or `None` if empty.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        let len = self.len();
        if len == 0 {
            None
        } else {
            self.get_mut(len - 1)
        }
    }

    /// Returns `true` if the deque contains an element with the given value.
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|item| item == x)
    }

    /// Returns an iterator over references to the elements, front to back.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T, A> {
        Iter {
            buf: &self.buf,
            front: self.start,
            back: self.finish,
        }
    }

    /// Returns an iterator over mutable references to the elements.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T, A> {
        IterMut {
            buf: &self.buf,
            front: self.start,
            back: self.finish,
            _marker: PhantomData,
        }
    }

    /// Returns a cursor on the first element (the end boundary if empty).
    #[inline]
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.start)
    }

    /// Returns a cursor on the end boundary, one past the last element.
    #[inline]
    pub fn cursor_end(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.finish)
    }

    /// Clears the deque, removing all elements and releasing every segment.
    ///
    /// The block index keeps its capacity.
    pub fn clear(&mut self) {
        self.drop_elements();
        // Safety: every element was dropped above
        unsafe { self.buf.release_all() };
        self.start = RawCursor::new(0, 0);
        self.finish = RawCursor::new(0, 0);
    }

    /// Drops every element, leaving the window empty but the segments
    /// allocated.
    fn drop_elements(&mut self) {
        let start = self.start;
        let finish = self.finish;

        // Empty the window BEFORE dropping so a panicking drop can't lead to
        // a double free.
        self.finish = start;

        if !std::mem::needs_drop::<T>() {
            return;
        }

        for slot in start.slot..=finish.slot {
            let lo = if slot == start.slot { start.offset } else { 0 };
            let hi = if slot == finish.slot {
                finish.offset
            } else {
                Self::BLOCK_SIZE
            };
            if lo < hi {
                unsafe {
                    let base = self.buf.slot_ptr(slot, lo);
                    std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(base, hi - lo));
                }
            }
        }
    }
}

// Trait implementations
impl<T, A: Allocator> Drop for SegmentedDeque<T, A> {
    fn drop(&mut self) {
        self.drop_elements();
        // BlockIndex will be dropped automatically and free the memory
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for SegmentedDeque<T, A> {
    /// Deep-copies every element into new segments from a clone of the
    /// allocator.
    fn clone(&self) -> Self {
        let mut new_deque = Self::new_in(self.allocator().clone());
        new_deque.extend(self.iter());
        new_deque
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for SegmentedDeque<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: Allocator> Eq for SegmentedDeque<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for SegmentedDeque<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: Allocator> Ord for SegmentedDeque<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: Allocator> Hash for SegmentedDeque<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        self.iter().for_each(|elem| elem.hash(state));
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for SegmentedDeque<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Default for SegmentedDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> Index<usize> for SegmentedDeque<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        let len = self.len();
        self.get(index).unwrap_or_else(|| {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        })
    }
}

impl<T, A: Allocator> IndexMut<usize> for SegmentedDeque<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        let len = self.len();
        self.get_mut(index).unwrap_or_else(|| {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        })
    }
}

impl<T, A: Allocator> Extend<T> for SegmentedDeque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for elem in iter {
            self.push_back(elem);
        }
    }
}

impl<'a, T: Clone + 'a, A: Allocator> Extend<&'a T> for SegmentedDeque<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        for elem in iter {
            self.push_back(elem.clone());
        }
    }
}

impl<T> FromIterator<T> for SegmentedDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::new();
        deque.extend(iter);
        deque
    }
}

impl<T, A: Allocator> IntoIterator for SegmentedDeque<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a SegmentedDeque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut SegmentedDeque<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Safety implementations
unsafe impl<T: Send, A: Allocator + Send> Send for SegmentedDeque<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for SegmentedDeque<T, A> {}
