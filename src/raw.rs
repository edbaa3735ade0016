//! Segment and block index allocation for `SegmentedDeque`.
//!
//! This module owns the two levels of storage: fixed-capacity segments and the
//! block index holding a pointer to each of them. It never reads, writes or
//! drops elements; that is the deque's job.

use allocator_api2::alloc::Allocator;
use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::macros::{debug_event, trace_event};
use crate::TryReserveError;

/// Number of index slots reserved the first time a segment is needed.
pub(crate) const INITIAL_MAP_SIZE: usize = 8;

/// The block index: an array of segment pointers, occupied from slot 0.
///
/// Occupied slots are always `0..num_segments`. The index keeps one slack
/// slot in reserve, so `num_segments + 1 < map_size` holds after every
/// successful segment insertion.
pub(crate) struct BlockIndex<T, A: Allocator> {
    /// Index storage, `map_size` slots long
    map: NonNull<NonNull<T>>,
    /// Allocated index slots
    map_size: usize,
    /// Occupied index slots
    num_segments: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

impl<T, A: Allocator> BlockIndex<T, A> {
    /// Elements per segment.
    ///
    /// - `4096 / size_of::<T>()` (never below 16) for elements under 256 bytes
    /// - 16 for anything larger
    pub(crate) const BLOCK_SIZE: usize = {
        let size = std::mem::size_of::<T>();
        if size == 0 {
            4096
        } else if size < 256 {
            let per_page = 4096 / size;
            if per_page < 16 {
                16
            } else {
                per_page
            }
        } else {
            16
        }
    };

    const IS_ZST: bool = std::mem::size_of::<T>() == 0;

    /// Creates an empty index without allocating.
    #[inline]
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            map: NonNull::dangling(),
            map_size: 0,
            num_segments: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub(crate) const fn segment_count(&self) -> usize {
        self.num_segments
    }

    /// Returns the number of allocated slots.
    #[inline]
    pub(crate) const fn map_size(&self) -> usize {
        self.map_size
    }

    /// Returns the segment stored in `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must be less than `segment_count`.
    #[inline]
    pub(crate) unsafe fn segment(&self, slot: usize) -> NonNull<T> {
        debug_assert!(slot < self.num_segments);
        *self.map.as_ptr().add(slot)
    }

    /// Returns a pointer to `offset` within the segment at `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must be occupied and `offset < BLOCK_SIZE`.
    #[inline]
    pub(crate) unsafe fn slot_ptr(&self, slot: usize, offset: usize) -> *mut T {
        debug_assert!(offset < Self::BLOCK_SIZE);
        self.segment(slot).as_ptr().add(offset)
    }

    fn segment_layout() -> Result<Layout, TryReserveError> {
        Layout::array::<T>(Self::BLOCK_SIZE).map_err(|_| TryReserveError::capacity_overflow())
    }

    fn map_layout(slots: usize) -> Result<Layout, TryReserveError> {
        Layout::array::<NonNull<T>>(slots).map_err(|_| TryReserveError::capacity_overflow())
    }

    /// Allocates one uninitialized segment.
    pub(crate) fn allocate_segment(&self) -> Result<NonNull<T>, TryReserveError> {
        if Self::IS_ZST {
            return Ok(NonNull::dangling());
        }

        let layout = Self::segment_layout()?;
        let ptr = self
            .alloc
            .allocate(layout)
            .map_err(|_| TryReserveError::alloc_error(layout))?;
        Ok(ptr.cast())
    }

    /// Frees a segment obtained from `allocate_segment`.
    ///
    /// # Safety
    ///
    /// `segment` must come from this index's allocator, hold no live elements
    /// and not be referenced by any slot afterwards.
    pub(crate) unsafe fn release_segment(&self, segment: NonNull<T>) {
        if Self::IS_ZST {
            return;
        }
        // Same layout that was computed successfully at allocation time.
        let layout = Layout::from_size_align_unchecked(
            std::mem::size_of::<T>() * Self::BLOCK_SIZE,
            std::mem::align_of::<T>(),
        );
        self.alloc.deallocate(segment.cast(), layout);
    }

    /// Moves the occupied slots into fresh storage of `new_size` slots.
    ///
    /// The old storage is released only once the new one is in place, so a
    /// failed allocation leaves the index exactly as it was.
    fn reallocate_map(&mut self, new_size: usize) -> Result<(), TryReserveError> {
        debug_assert!(new_size > self.num_segments);

        let new_layout = Self::map_layout(new_size)?;
        let new_map: NonNull<NonNull<T>> = self
            .alloc
            .allocate(new_layout)
            .map_err(|_| TryReserveError::alloc_error(new_layout))?
            .cast();

        unsafe {
            ptr::copy_nonoverlapping(self.map.as_ptr(), new_map.as_ptr(), self.num_segments);
            self.release_map();
        }

        self.map = new_map;
        self.map_size = new_size;
        Ok(())
    }

    /// Allocates index storage for `slots` slots if it has fewer.
    pub(crate) fn reserve(&mut self, slots: usize) -> Result<(), TryReserveError> {
        if slots <= self.map_size {
            return Ok(());
        }
        trace_event!(slots, "reserving block index");
        self.reallocate_map(slots)
    }

    /// Doubles the index capacity, keeping slot order.
    pub(crate) fn grow(&mut self) -> Result<(), TryReserveError> {
        let new_size = self
            .map_size
            .checked_mul(2)
            .ok_or_else(TryReserveError::capacity_overflow)?;
        debug_event!(
            old = self.map_size,
            new = new_size,
            segments = self.num_segments,
            "growing block index"
        );
        self.reallocate_map(new_size)
    }

    /// Makes sure a segment can be added without breaking the slack slot.
    fn ensure_slack(&mut self) -> Result<(), TryReserveError> {
        if self.map_size == 0 {
            self.reserve(INITIAL_MAP_SIZE)
        } else if self.num_segments + 1 >= self.map_size {
            self.grow()
        } else {
            Ok(())
        }
    }

    /// Shifts every occupied slot one place to the right, leaving slot 0
    /// holding a stale copy of the old first segment.
    ///
    /// # Safety
    ///
    /// There must be at least one unoccupied slot, and the caller must
    /// overwrite slot 0 and bump the segment count afterwards.
    unsafe fn shift_for_front_insert(&mut self) {
        debug_assert!(self.num_segments < self.map_size);
        trace_event!(segments = self.num_segments, "shifting block index");
        let base = self.map.as_ptr();
        ptr::copy(base, base.add(1), self.num_segments);
    }

    /// Appends a newly allocated segment after the last occupied slot.
    ///
    /// On error neither the slots nor the segments have changed.
    pub(crate) fn push_back_segment(&mut self) -> Result<NonNull<T>, TryReserveError> {
        self.ensure_slack()?;
        let segment = self.allocate_segment()?;
        unsafe {
            self.map.as_ptr().add(self.num_segments).write(segment);
        }
        self.num_segments += 1;
        Ok(segment)
    }

    /// Places a newly allocated segment in slot 0, moving every other
    /// segment one slot to the right.
    ///
    /// On error neither the slots nor the segments have changed.
    pub(crate) fn push_front_segment(&mut self) -> Result<NonNull<T>, TryReserveError> {
        self.ensure_slack()?;
        let segment = self.allocate_segment()?;
        unsafe {
            self.shift_for_front_insert();
            self.map.as_ptr().write(segment);
        }
        self.num_segments += 1;
        Ok(segment)
    }

    /// Moves the segment in slot 0 to the last occupied slot, shifting every
    /// other segment one slot to the left.
    ///
    /// The caller must make sure slot 0 holds no live elements.
    pub(crate) fn rotate_front_to_back(&mut self) {
        debug_assert!(self.num_segments > 0);
        trace_event!(segments = self.num_segments, "recycling front segment");
        let last = self.num_segments - 1;
        unsafe {
            let base = self.map.as_ptr();
            let segment = base.read();
            ptr::copy(base.add(1), base, last);
            base.add(last).write(segment);
        }
    }

    /// Moves the segment in the last occupied slot to slot 0, shifting every
    /// other segment one slot to the right.
    ///
    /// The caller must make sure the last slot holds no live elements.
    pub(crate) fn rotate_back_to_front(&mut self) {
        debug_assert!(self.num_segments > 0);
        trace_event!(segments = self.num_segments, "recycling back segment");
        let last = self.num_segments - 1;
        unsafe {
            let base = self.map.as_ptr();
            let segment = base.add(last).read();
            ptr::copy(base, base.add(1), last);
            base.write(segment);
        }
    }

    /// Releases every segment and empties the index. The index storage
    /// itself is kept.
    ///
    /// # Safety
    ///
    /// All elements must have been dropped before calling this.
    pub(crate) unsafe fn release_all(&mut self) {
        if self.num_segments > 0 {
            trace_event!(segments = self.num_segments, "releasing segments");
        }
        for slot in 0..self.num_segments {
            self.release_segment(self.segment(slot));
        }
        self.num_segments = 0;
    }

    /// Frees the index storage without touching segments.
    unsafe fn release_map(&mut self) {
        if self.map_size == 0 {
            return;
        }
        let layout = Layout::from_size_align_unchecked(
            std::mem::size_of::<NonNull<T>>() * self.map_size,
            std::mem::align_of::<NonNull<T>>(),
        );
        self.alloc.deallocate(self.map.cast(), layout);
    }
}

impl<T, A: Allocator> Drop for BlockIndex<T, A> {
    fn drop(&mut self) {
        // Only frees memory; the deque drops its elements first.
        unsafe {
            self.release_all();
            self.release_map();
        }
    }
}
