use alloc::vec::Vec;
use core::fmt;

/// Index of an element inside a [`HashList`] arena.
pub type ElemId = u32;

/// Sentinel marking the end of a list or bucket chain.
pub const NULL_ELEM: ElemId = u32::MAX;

const MIN_BUCKETS: usize = 16;

/// One entry of the active list.
///
/// Entries live in a linearized arena and link to each other by 32-bit
/// offsets: `tail` threads the insertion-ordered list (or the free list once
/// deleted), `chain` threads the hash bucket.
#[derive(Clone, Copy, Debug)]
pub struct Elem<V> {
    pub key: u32,
    pub val: V,
    tail: ElemId,
    chain: ElemId,
}

static_assertions::assert_eq_size!(Elem<u32>, [u8; 16]);

/// A bucket is only meaningful when its generation matches the list's.
/// Bumping the list generation invalidates every bucket at once.
#[derive(Clone, Copy)]
struct Bucket {
    generation: u32,
    head: ElemId,
}

impl Bucket {
    const EMPTY: Bucket = Bucket { generation: 0, head: NULL_ELEM };
}

/// Insertion-ordered hash map from `u32` keys to small `Copy` values, with
/// O(1) bulk detachment.
///
/// ## Frame Hand-off
/// `clear` detaches the whole list and returns its head. The detached
/// entries keep their values and `tail` links, so the caller can walk them
/// with [`HashList::tail`] while inserting the next frame's entries into the
/// same structure, and hands each one back with [`HashList::delete`] when done.
/// The list never owns what `V` refers to.
pub struct HashList<V> {
    elems: Vec<Elem<V>>,
    free_head: ElemId,
    buckets: Vec<Bucket>,
    generation: u32,
    list_head: ElemId,
    list_tail: ElemId,
    len: usize,
}

impl<V: fmt::Debug> fmt::Debug for HashList<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashList")
            .field("len", &self.len)
            .field("buckets", &self.buckets.len())
            .field("arena", &self.elems.len())
            .finish()
    }
}

impl<V: Copy> HashList<V> {
    pub fn new() -> Self {
        Self::with_buckets(MIN_BUCKETS)
    }

    pub fn with_buckets(num_buckets: usize) -> Self {
        Self {
            elems: Vec::new(),
            free_head: NULL_ELEM,
            buckets: alloc::vec![Bucket::EMPTY; num_buckets.max(1)],
            generation: 1,
            list_head: NULL_ELEM,
            list_tail: NULL_ELEM,
            len: 0,
        }
    }

    #[inline(always)]
    fn bucket_of(&self, key: u32) -> usize {
        key as usize % self.buckets.len()
    }

    /// Looks up `key` among the entries of the current list.
    #[inline]
    pub fn find(&self, key: u32) -> Option<ElemId> {
        let bucket = self.buckets[self.bucket_of(key)];
        if bucket.generation != self.generation {
            return None;
        }
        let mut e = bucket.head;
        while e != NULL_ELEM {
            let elem = &self.elems[e as usize];
            if elem.key == key {
                return Some(e);
            }
            e = elem.chain;
        }
        None
    }

    /// Appends a new entry. `key` must not already be present.
    pub fn insert(&mut self, key: u32, val: V) -> ElemId {
        debug_assert!(self.find(key).is_none(), "HashList: duplicate key {}", key);
        let e = self.new_elem(key, val);
        self.link_into_bucket(e, key);

        if self.list_tail == NULL_ELEM {
            self.list_head = e;
        } else {
            self.elems[self.list_tail as usize].tail = e;
        }
        self.list_tail = e;
        self.len += 1;
        e
    }

    /// Returns the entry for `key`, inserting one holding `val` if absent.
    /// The flag is true when a new entry was created.
    pub fn find_or_insert(&mut self, key: u32, val: V) -> (ElemId, bool) {
        match self.find(key) {
            Some(e) => (e, false),
            None => (self.insert(key, val), true),
        }
    }

    /// Detaches the current list and resets the index.
    ///
    /// Returns the head of the detached list (`NULL_ELEM` if it was empty).
    /// The caller owns the detached entries and must `delete` each of them.
    pub fn clear(&mut self) -> ElemId {
        let head = self.list_head;
        self.list_head = NULL_ELEM;
        self.list_tail = NULL_ELEM;
        self.len = 0;

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Wrapped: stale stamps could collide, so scrub them once.
            self.buckets.fill(Bucket::EMPTY);
            self.generation = 1;
        }
        head
    }

    /// Returns a detached entry's storage to the free list.
    pub fn delete(&mut self, e: ElemId) {
        let elem = &mut self.elems[e as usize];
        elem.tail = self.free_head;
        elem.chain = NULL_ELEM;
        self.free_head = e;
    }

    /// Grows the bucket array to `size`, rehashing the current entries.
    /// Element ids stay valid. Shrinking is a no-op.
    pub fn set_size(&mut self, size: usize) {
        if size <= self.buckets.len() {
            return;
        }
        tracing::debug!("HashList: resizing {} -> {} buckets ({} entries)", self.buckets.len(), size, self.len);
        self.buckets.clear();
        self.buckets.resize(size, Bucket::EMPTY);

        let mut e = self.list_head;
        while e != NULL_ELEM {
            let key = self.elems[e as usize].key;
            self.link_into_bucket(e, key);
            e = self.elems[e as usize].tail;
        }
    }

    /// Current bucket count.
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Head of the current list.
    #[inline(always)]
    pub fn list(&self) -> ElemId {
        self.list_head
    }

    /// Successor of `e` in its list (current or detached).
    #[inline(always)]
    pub fn tail(&self, e: ElemId) -> ElemId {
        self.elems[e as usize].tail
    }

    #[inline(always)]
    pub fn key(&self, e: ElemId) -> u32 {
        self.elems[e as usize].key
    }

    #[inline(always)]
    pub fn val(&self, e: ElemId) -> V {
        self.elems[e as usize].val
    }

    #[inline(always)]
    pub fn set_val(&mut self, e: ElemId, val: V) {
        self.elems[e as usize].val = val;
    }

    /// Walks the current list in insertion order.
    pub fn iter(&self) -> Iter<'_, V> {
        self.iter_from(self.list_head)
    }

    /// Walks a list starting at `head`, e.g. one returned by [`HashList::clear`].
    pub fn iter_from(&self, head: ElemId) -> Iter<'_, V> {
        Iter { list: self, next: head }
    }

    fn new_elem(&mut self, key: u32, val: V) -> ElemId {
        let elem = Elem { key, val, tail: NULL_ELEM, chain: NULL_ELEM };
        if self.free_head != NULL_ELEM {
            let e = self.free_head;
            self.free_head = self.elems[e as usize].tail;
            self.elems[e as usize] = elem;
            e
        } else {
            let e = self.elems.len();
            assert!(e < NULL_ELEM as usize, "HashList: element space exhausted");
            self.elems.push(elem);
            e as ElemId
        }
    }

    fn link_into_bucket(&mut self, e: ElemId, key: u32) {
        let b = self.bucket_of(key);
        let generation = self.generation;
        let bucket = &mut self.buckets[b];
        if bucket.generation != generation {
            bucket.generation = generation;
            bucket.head = NULL_ELEM;
        }
        self.elems[e as usize].chain = bucket.head;
        bucket.head = e;
    }
}

impl<V: Copy> Default for HashList<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-order iterator over element ids.
pub struct Iter<'a, V> {
    list: &'a HashList<V>,
    next: ElemId,
}

impl<'a, V: Copy> Iterator for Iter<'a, V> {
    type Item = ElemId;

    fn next(&mut self) -> Option<ElemId> {
        if self.next == NULL_ELEM {
            return None;
        }
        let e = self.next;
        self.next = self.list.tail(e);
        Some(e)
    }
}


#[cfg(kani)]
mod proofs {
    use super::*;

    #[kani::proof]
    #[kani::unwind(6)]
    fn prove_insert_then_find() {
        let mut list = HashList::with_buckets(4);
        let a: u32 = kani::any();
        let b: u32 = kani::any();
        kani::assume(a != b);
        list.insert(a, 1u8);
        list.insert(b, 2u8);
        assert_eq!(list.val(list.find(a).unwrap()), 1);
        assert_eq!(list.val(list.find(b).unwrap()), 2);
        list.clear();
        assert!(list.find(a).is_none());
    }
}
