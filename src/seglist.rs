//! SegList: insertion-ordered storage in a chain of fixed-capacity segments.
//!
//! Segments live in a `SlotMap` arena and are linked head to tail. Every
//! segment except the tail is full; the tail holds `tail_fill` entries in
//! slots `0..tail_fill`. Storage order is insertion order.
//!
//! All lookups are linear scans using key dispatch equality. There is no
//! index: one allocation per segment, no per-entry bookkeeping.

use crate::error::Result;
use crate::key_dispatch::{key_eql, values_equal};
use crate::value::Value;
use log::trace;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct SegmentKey;
}

/// Slots per segment when none is configured.
pub const DEFAULT_SEGMENT_CAPACITY: usize = 5;

#[derive(Default)]
struct Entry {
    key: Value,
    val: Value,
}

struct Segment {
    slots: Box<[Entry]>,
    next: Option<SegmentKey>,
}

type Pos = (SegmentKey, usize);

pub struct SegList {
    segments: SlotMap<SegmentKey, Segment>,
    head: Option<SegmentKey>,
    tail: Option<SegmentKey>,
    size: usize,
    tail_fill: usize,
    capacity: usize,
}

impl SegList {
    pub fn new() -> Self {
        Self::with_segment_capacity(DEFAULT_SEGMENT_CAPACITY)
    }

    /// `capacity` is the slot count of every segment; it must be non-zero.
    pub fn with_segment_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "segment capacity must be non-zero");
        Self {
            segments: SlotMap::with_key(),
            head: None,
            tail: None,
            size: 0,
            tail_fill: 0,
            capacity,
        }
    }

    pub fn segment_capacity(&self) -> usize {
        self.capacity
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    fn fill_of(&self, sk: SegmentKey) -> usize {
        if self.tail == Some(sk) {
            self.tail_fill
        } else {
            self.capacity
        }
    }

    fn find(&self, key: &Value) -> Result<Option<Pos>> {
        let mut cur = self.head;
        while let Some(sk) = cur {
            let seg = &self.segments[sk];
            for (i, e) in seg.slots[..self.fill_of(sk)].iter().enumerate() {
                if key_eql(&e.key, key)? {
                    return Ok(Some((sk, i)));
                }
            }
            cur = seg.next;
        }
        Ok(None)
    }

    fn alloc_segment(&mut self) -> SegmentKey {
        let slots: Box<[Entry]> = (0..self.capacity).map(|_| Entry::default()).collect();
        let sk = self.segments.insert(Segment { slots, next: None });
        match self.tail {
            Some(t) => self.segments[t].next = Some(sk),
            None => self.head = Some(sk),
        }
        self.tail = Some(sk);
        self.tail_fill = 0;
        trace!("seglist: allocated segment #{}", self.segments.len());
        sk
    }

    fn push_back(&mut self, key: Value, val: Value) {
        let sk = match self.tail {
            Some(t) if self.tail_fill < self.capacity => t,
            _ => self.alloc_segment(),
        };
        self.segments[sk].slots[self.tail_fill] = Entry { key, val };
        self.tail_fill += 1;
        self.size += 1;
    }

    /// Insert or update. A matching entry has its value replaced in place;
    /// otherwise `intern` is applied to the key and the pair is appended.
    ///
    /// Returns the key object now held by the list (the existing one on an
    /// update, the interned one on an append) and whether it was appended.
    pub fn put_with<F>(&mut self, key: Value, val: Value, intern: F) -> Result<(Value, bool)>
    where
        F: FnOnce(Value) -> Value,
    {
        if let Some((sk, i)) = self.find(&key)? {
            let e = &mut self.segments[sk].slots[i];
            e.val = val;
            return Ok((e.key.clone(), false));
        }
        let stored = intern(key);
        self.push_back(stored.clone(), val);
        Ok((stored, true))
    }

    /// Returns `true` when a new entry was appended.
    pub fn put(&mut self, key: Value, val: Value) -> Result<bool> {
        Ok(self.put_with(key, val, |k| k)?.1)
    }

    pub fn get(&self, key: &Value) -> Result<Option<&Value>> {
        Ok(self
            .find(key)?
            .map(|(sk, i)| &self.segments[sk].slots[i].val))
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Full scan with value equality (`==`); stops at the first match.
    pub fn contains_value(&self, val: &Value) -> Result<bool> {
        for (_, v) in self.iter() {
            if values_equal(val, v)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove the entry matching `key`, closing the gap by shifting every
    /// later entry back one slot. Returns the stored key and value.
    pub fn remove(&mut self, key: &Value) -> Result<Option<(Value, Value)>> {
        Ok(self.find(key)?.map(|pos| self.remove_at(pos)))
    }

    /// Remove the first entry in insertion order without key matching.
    pub fn pop_front(&mut self) -> Option<(Value, Value)> {
        let head = self.head?;
        if self.fill_of(head) == 0 {
            return None;
        }
        Some(self.remove_at((head, 0)))
    }

    fn remove_at(&mut self, (sk, i): Pos) -> (Value, Value) {
        let removed = std::mem::take(&mut self.segments[sk].slots[i]);

        let (mut hole_seg, mut hole_idx) = (sk, i);
        loop {
            let next = if hole_idx + 1 < self.fill_of(hole_seg) {
                Some((hole_seg, hole_idx + 1))
            } else {
                self.segments[hole_seg].next.map(|n| (n, 0))
            };
            let Some((ns, ni)) = next else { break };
            let moved = std::mem::take(&mut self.segments[ns].slots[ni]);
            self.segments[hole_seg].slots[hole_idx] = moved;
            hole_seg = ns;
            hole_idx = ni;
        }
        debug_assert_eq!(self.tail, Some(hole_seg));
        debug_assert_eq!(hole_idx + 1, self.tail_fill);

        self.size -= 1;
        self.tail_fill -= 1;
        if self.tail_fill == 0 && self.tail != self.head {
            self.release_tail();
        }
        (removed.key, removed.val)
    }

    fn release_tail(&mut self) {
        let Some(tail) = self.tail else { return };
        let mut prev = self.head;
        while let Some(p) = prev {
            if self.segments[p].next == Some(tail) {
                break;
            }
            prev = self.segments[p].next;
        }
        let Some(prev) = prev else { return };
        self.segments[prev].next = None;
        self.segments.remove(tail);
        self.tail = Some(prev);
        self.tail_fill = self.capacity;
        trace!("seglist: released tail segment, {} left", self.segments.len());
    }

    /// Entry count. A zero counter is confirmed by walking the chain.
    pub fn len(&self) -> usize {
        if self.size > 0 {
            return self.size;
        }
        let mut total = 0;
        let mut cur = self.head;
        while let Some(sk) = cur {
            total += self.fill_of(sk);
            cur = self.segments[sk].next;
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<(&Value, &Value)> {
        self.iter().next()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cur: self.head,
            idx: 0,
        }
    }

    /// Fresh list holding the same pairs in the same order.
    pub fn copy(&self) -> Result<SegList> {
        let mut dst = SegList::with_segment_capacity(self.capacity);
        for (k, v) in self.iter() {
            dst.put(k.clone(), v.clone())?;
        }
        Ok(dst)
    }

    /// Put every pair of `other` in its order. Not transactional: an error
    /// from key matching leaves the pairs put so far in place.
    pub fn merge_from<F>(&mut self, other: &SegList, intern: F) -> Result<()>
    where
        F: Fn(Value) -> Value,
    {
        for (k, v) in other.iter() {
            self.put_with(k.clone(), v.clone(), &intern)?;
        }
        Ok(())
    }

    /// Visit every stored key and value once.
    pub fn mark<F: FnMut(&Value)>(&self, mut visit: F) {
        for (k, v) in self.iter() {
            visit(k);
            visit(v);
        }
    }

    /// Release all segments. Safe to call repeatedly.
    pub fn clear(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        trace!("seglist: releasing {} segments", self.segments.len());
        self.segments.clear();
        self.head = None;
        self.tail = None;
        self.size = 0;
        self.tail_fill = 0;
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut seen = 0;
        let mut count = 0;
        let mut cur = self.head;
        while let Some(sk) = cur {
            let seg = &self.segments[sk];
            assert_eq!(seg.slots.len(), self.capacity);
            if seg.next.is_none() {
                assert_eq!(self.tail, Some(sk));
                assert!(self.tail_fill <= self.capacity);
                if self.head != self.tail {
                    assert!(self.tail_fill > 0, "non-head tail must not be empty");
                }
                for e in &seg.slots[self.tail_fill..] {
                    assert!(e.key.is_nil() && e.val.is_nil(), "stale slot past tail");
                }
            }
            count += self.fill_of(sk);
            seen += 1;
            cur = seg.next;
        }
        assert_eq!(seen, self.segments.len());
        assert_eq!(count, self.size);
    }
}

impl Default for SegList {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing iterator in insertion order.
pub struct Iter<'a> {
    list: &'a SegList,
    cur: Option<SegmentKey>,
    idx: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Value, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let sk = self.cur?;
            let seg = &self.list.segments[sk];
            if self.idx < self.list.fill_of(sk) {
                let e = &seg.slots[self.idx];
                self.idx += 1;
                return Some((&e.key, &e.val));
            }
            self.cur = seg.next;
            self.idx = 0;
        }
    }
}
