use alloc::vec::Vec;
use core::mem;

/// Slots reserved per growth step. Records are carved in blocks so a burst of
/// allocations during one frame does not reallocate on every push.
const BLOCK_SLOTS: usize = 1024;

const NULL_SLOT: u32 = u32::MAX;

enum Slot<T> {
    Occupied(T),
    Vacant { next_free: u32 },
}

/// Cumulative allocation counters of an [`ObjectPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of successful `allocate` calls.
    pub allocated: u64,
    /// Total number of successful `release` calls.
    pub released: u64,
    /// Records currently handed out.
    pub live: usize,
}

impl PoolStats {
    /// True when every allocation has been matched by a release.
    pub fn is_balanced(&self) -> bool {
        self.allocated == self.released && self.live == 0
    }
}

/// A recycling slab of fixed-shape records addressed by `u32` handles.
///
/// ## Lifecycle
/// `allocate` hands out a slot from the free list (or carves a new one) and
/// `release` threads it back onto the free list. Handles stay stable for the
/// lifetime of the record, so callers can link records to each other by index
/// instead of by pointer.
///
/// Storage never shrinks: the pool is sized by the peak working set of the
/// owning decoder, and every later frame reuses those slots.
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    free_head: u32,
    live: usize,
    allocated: u64,
    released: u64,
}

impl<T> ObjectPool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a pool with room for `capacity` records before the first growth.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: NULL_SLOT,
            live: 0,
            allocated: 0,
            released: 0,
        }
    }

    /// Stores `value` and returns its handle.
    pub fn allocate(&mut self, value: T) -> u32 {
        self.live += 1;
        self.allocated += 1;

        if self.free_head != NULL_SLOT {
            let idx = self.free_head;
            let slot = &mut self.slots[idx as usize];
            match *slot {
                Slot::Vacant { next_free } => self.free_head = next_free,
                Slot::Occupied(_) => panic!("ObjectPool: free list points at occupied slot {}", idx),
            }
            *slot = Slot::Occupied(value);
            return idx;
        }

        if self.slots.len() == self.slots.capacity() {
            self.slots.reserve(BLOCK_SLOTS);
            tracing::trace!("ObjectPool: grown to {} slots", self.slots.capacity());
        }
        let idx = self.slots.len();
        assert!(idx < NULL_SLOT as usize, "ObjectPool: handle space exhausted");
        self.slots.push(Slot::Occupied(value));
        idx as u32
    }

    /// Returns the record at `idx` to the free list and hands back its value.
    ///
    /// # Panics
    /// Panics if the slot is already vacant (double release).
    pub fn release(&mut self, idx: u32) -> T {
        let slot = &mut self.slots[idx as usize];
        if let Slot::Vacant { .. } = slot {
            panic!("ObjectPool: release called on vacant slot {}", idx);
        }
        let old = mem::replace(slot, Slot::Vacant { next_free: self.free_head });
        self.free_head = idx;
        self.live -= 1;
        self.released += 1;
        match old {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => unreachable!(),
        }
    }

    /// Borrows a live record.
    #[inline(always)]
    pub fn get(&self, idx: u32) -> &T {
        match &self.slots[idx as usize] {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("ObjectPool: access to vacant slot {}", idx),
        }
    }

    #[inline(always)]
    pub fn get_mut(&mut self, idx: u32) -> &mut T {
        match &mut self.slots[idx as usize] {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("ObjectPool: access to vacant slot {}", idx),
        }
    }

    /// Number of records currently handed out.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots carved so far (live + recyclable).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated,
            released: self.released,
            live: self.live,
        }
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
