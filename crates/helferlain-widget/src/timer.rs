//! Deadline-based timer queue.
//!
//! All UX pacing (welcome delay, response delay, open/close animation
//! end, escalation prompts) is modeled as payloads with deadlines, fired
//! from the widget's update tick. Nothing blocks and nothing busy-waits.

use std::time::{Duration, Instant};

pub type TimerId = u64;

struct TimerEntry<T> {
    id: TimerId,
    deadline: Instant,
    payload: T,
}

pub struct TimerQueue<T> {
    entries: Vec<TimerEntry<T>>,
    next_id: TimerId,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            deadline: Instant::now() + delay,
            payload,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return all payloads whose deadline has passed, in
    /// deadline order.
    pub fn due(&mut self, now: Instant) -> Vec<T> {
        let mut fired: Vec<TimerEntry<T>> = Vec::new();
        let mut remaining: Vec<TimerEntry<T>> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.deadline <= now {
                fired.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;
        fired.sort_by_key(|e| e.deadline);
        fired.into_iter().map(|e| e.payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(Duration::from_millis(20), "late");
        queue.schedule(Duration::from_millis(5), "early");

        let later = Instant::now() + Duration::from_millis(50);
        assert_eq!(queue.due(later), vec!["early", "late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn not_due_yet_stays_queued() {
        let mut queue = TimerQueue::new();
        queue.schedule(Duration::from_secs(60), "later");
        assert!(queue.due(Instant::now()).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn zero_delay_fires_on_next_tick() {
        let mut queue = TimerQueue::new();
        queue.schedule(Duration::ZERO, "now");
        assert_eq!(queue.due(Instant::now()), vec!["now"]);
    }

    #[test]
    fn cancel_and_clear() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(Duration::ZERO, 1);
        queue.schedule(Duration::ZERO, 2);
        queue.cancel(id);
        assert_eq!(queue.len(), 1);
        queue.clear();
        assert!(queue.is_empty());
    }
}
