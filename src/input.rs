use crate::gesture::{Point, TouchEvent};

/// Pointer id used when the mouse stands in for a finger.
pub const MOUSE_POINTER: u64 = u64::MAX;

/// Turns per-pointer press/move/release notifications into touch events that
/// list every pointer still down, oldest first.
#[derive(Debug, Default)]
pub struct TouchTracker {
    active: Vec<(u64, Point)>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, id: u64) -> bool {
        self.active.iter().any(|(active, _)| *active == id)
    }

    pub fn count(&self) -> usize {
        self.active.len()
    }

    fn points(&self) -> Vec<Point> {
        self.active.iter().map(|(_, p)| *p).collect()
    }

    pub fn press(&mut self, id: u64, at: Point) -> TouchEvent {
        match self.active.iter_mut().find(|(active, _)| *active == id) {
            Some(entry) => entry.1 = at,
            None => self.active.push((id, at)),
        }
        TouchEvent::start(&self.points())
    }

    pub fn moved(&mut self, id: u64, to: Point) -> Option<TouchEvent> {
        let entry = self.active.iter_mut().find(|(active, _)| *active == id)?;
        if entry.1 == to {
            return None;
        }
        entry.1 = to;
        Some(TouchEvent::moved(&self.points()))
    }

    pub fn release(&mut self, id: u64) -> Option<TouchEvent> {
        let index = self.active.iter().position(|(active, _)| *active == id)?;
        self.active.remove(index);
        Some(TouchEvent::end(&self.points()))
    }

    pub fn release_all(&mut self) -> Option<TouchEvent> {
        if self.active.is_empty() {
            return None;
        }
        self.active.clear();
        Some(TouchEvent::end(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::TouchPhase;

    #[test]
    fn test_second_finger_starts_with_both() {
        let mut tracker = TouchTracker::new();
        tracker.press(1, Point::new(0.0, 0.0));
        let event = tracker.press(2, Point::new(10.0, 0.0));
        assert_eq!(event.phase, TouchPhase::Start);
        assert_eq!(event.touches, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    }

    #[test]
    fn test_release_reports_remaining() {
        let mut tracker = TouchTracker::new();
        tracker.press(1, Point::new(0.0, 0.0));
        tracker.press(2, Point::new(10.0, 0.0));
        let event = tracker.release(1).unwrap();
        assert_eq!(event.phase, TouchPhase::End);
        assert_eq!(event.touches, vec![Point::new(10.0, 0.0)]);
        assert!(tracker.release(1).is_none());
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn test_unknown_or_still_pointer_moves_are_dropped() {
        let mut tracker = TouchTracker::new();
        assert!(tracker.moved(MOUSE_POINTER, Point::new(1.0, 1.0)).is_none());
        tracker.press(MOUSE_POINTER, Point::new(1.0, 1.0));
        assert!(tracker.moved(MOUSE_POINTER, Point::new(1.0, 1.0)).is_none());
        let event = tracker.moved(MOUSE_POINTER, Point::new(2.0, 1.0)).unwrap();
        assert_eq!(event.touches, vec![Point::new(2.0, 1.0)]);
    }

    #[test]
    fn test_release_all() {
        let mut tracker = TouchTracker::new();
        assert!(tracker.release_all().is_none());
        tracker.press(3, Point::new(1.0, 1.0));
        assert!(tracker.release_all().unwrap().touches.is_empty());
        assert!(!tracker.is_active(3));
    }
}
