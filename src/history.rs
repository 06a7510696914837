use std::collections::VecDeque;

use crate::mask::MaskSnapshot;

pub const MAX_HISTORY: usize = 50;

/// Undo log of mask snapshots; the oldest entry is dropped once capacity is exceeded.
pub struct HistoryStack {
    states: VecDeque<MaskSnapshot>,
    capacity: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        HistoryStack {
            states: VecDeque::with_capacity(capacity.min(MAX_HISTORY) + 1),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: MaskSnapshot) {
        self.states.push_back(snapshot);
        if self.states.len() > self.capacity {
            self.states.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<MaskSnapshot> {
        self.states.pop_back()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{MaskBuffer, MaskValue};

    // Each snapshot has a different pixel count so they can be told apart.
    fn numbered(n: u32) -> MaskSnapshot {
        let mut mask = MaskBuffer::new(64, 1);
        for x in 0..n {
            mask.stamp_circle(x as f32, 0.0, 0.1, MaskValue::Masked);
        }
        mask.snapshot()
    }

    fn number_of(snapshot: MaskSnapshot) -> usize {
        let mut mask = MaskBuffer::new(64, 1);
        mask.restore_from(snapshot).unwrap();
        mask.masked_pixels()
    }

    #[test]
    fn test_pop_is_lifo() {
        let mut history = HistoryStack::default();
        history.push(numbered(1));
        history.push(numbered(2));
        assert_eq!(history.pop().map(number_of), Some(2));
        assert_eq!(history.pop().map(number_of), Some(1));
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryStack::default();
        for n in 0..51 {
            history.push(numbered(n));
        }
        assert_eq!(history.len(), MAX_HISTORY);

        let mut seen = Vec::new();
        while let Some(s) = history.pop() {
            seen.push(number_of(s));
        }
        assert_eq!(seen.first(), Some(&50));
        assert_eq!(seen.last(), Some(&1));
        assert!(!seen.contains(&0));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = HistoryStack::new(3);
        for n in 0..10 {
            history.push(numbered(n));
            assert!(history.len() <= 3);
        }
        history.clear();
        assert!(!history.can_undo());
    }
}
