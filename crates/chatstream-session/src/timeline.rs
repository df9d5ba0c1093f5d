use chatstream_types::TimelineEvent;
use std::collections::VecDeque;

/// Append-only status log holding at most `capacity` entries.
///
/// Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct TimelineLog {
    events: VecDeque<TimelineEvent>,
    capacity: usize,
}

impl TimelineLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: TimelineEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter()
    }

    pub fn snapshot(&self) -> Vec<TimelineEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&TimelineEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
