//! The segment queue (`TCQ`): a fixed-capacity ring of segments.

use crate::errors::PlannerError;
use crate::segment::Segment;
use heapless::Deque;

/// Fixed-capacity ring buffer of segments. `CAP` is the compile-time
/// capacity; there is no dynamic growth and no caller-provided raw storage
/// (the array lives inline in this struct).
pub struct SegmentQueue<const CAP: usize> {
    items: Deque<Segment, CAP>,
}

impl<const CAP: usize> Default for SegmentQueue<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> SegmentQueue<CAP> {
    pub fn new() -> Self {
        SegmentQueue { items: Deque::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == CAP
    }

    /// Appends at the tail. Fails with `QueueFull` when `len == capacity`.
    pub fn put(&mut self, seg: Segment) -> Result<(), PlannerError> {
        self.items.push_back(seg).map_err(|_| PlannerError::QueueFull)
    }

    /// Drops the first `n` items from the head. Fails with `Underflow` if
    /// `n > len`.
    pub fn pop_front(&mut self, n: usize) -> Result<(), PlannerError> {
        if n > self.len() {
            return Err(PlannerError::Underflow);
        }
        for _ in 0..n {
            self.items.pop_front();
        }
        Ok(())
    }

    /// Drops the tail item, used to consume a segment a blend arc absorbs.
    pub fn pop_back(&mut self) -> Option<Segment> {
        self.items.pop_back()
    }

    /// Returns the `i`-th segment from the head (0-based), or `None`.
    pub fn item(&self, i: usize) -> Option<&Segment> {
        self.items.iter().nth(i)
    }

    pub fn item_mut(&mut self, i: usize) -> Option<&mut Segment> {
        self.items.iter_mut().nth(i)
    }

    /// The tail segment, or `None` if empty.
    pub fn last(&self) -> Option<&Segment> {
        self.items.iter().next_back()
    }

    pub fn last_mut(&mut self) -> Option<&mut Segment> {
        self.items.iter_mut().next_back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.items.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Geometry, LineTriple, Segment};
    use posemath::{CartLine, Cartesian};

    fn dummy_segment(id: u32) -> Segment {
        let line = CartLine::new(Cartesian::ZERO, Cartesian::new(1.0, 0.0, 0.0));
        let triple = LineTriple { xyz: line, uvw: line, abc: line };
        Segment::new(id, Geometry::Linear(triple), 1.0, 0.001)
    }

    #[test]
    fn put_increases_len_and_pop_front_decreases_it() {
        let mut q: SegmentQueue<4> = SegmentQueue::new();
        q.put(dummy_segment(1)).unwrap();
        q.put(dummy_segment(2)).unwrap();
        assert_eq!(q.len(), 2);
        q.pop_front(1).unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.item(0).unwrap().id, 2);
    }

    #[test]
    fn put_fails_when_full() {
        let mut q: SegmentQueue<2> = SegmentQueue::new();
        q.put(dummy_segment(1)).unwrap();
        q.put(dummy_segment(2)).unwrap();
        assert_eq!(q.put(dummy_segment(3)), Err(PlannerError::QueueFull));
    }

    #[test]
    fn pop_front_underflow_is_rejected() {
        let mut q: SegmentQueue<4> = SegmentQueue::new();
        q.put(dummy_segment(1)).unwrap();
        assert_eq!(q.pop_front(2), Err(PlannerError::Underflow));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn pop_back_removes_tail_only() {
        let mut q: SegmentQueue<4> = SegmentQueue::new();
        q.put(dummy_segment(1)).unwrap();
        q.put(dummy_segment(2)).unwrap();
        let popped = q.pop_back().unwrap();
        assert_eq!(popped.id, 2);
        assert_eq!(q.len(), 1);
        assert_eq!(q.last().unwrap().id, 1);
    }
}
