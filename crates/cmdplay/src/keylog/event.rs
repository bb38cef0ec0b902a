//! Captured keystrokes and the ordered log that holds them.

use std::time::Duration;

/// One captured input byte and the time since the byte before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// The raw byte read from the terminal.
    pub key: u8,
    /// Time elapsed since the previous event; zero for the first one.
    pub delay: Duration,
}

impl InputEvent {
    /// Create an event.
    #[must_use]
    pub const fn new(key: u8, delay: Duration) -> Self {
        Self { key, delay }
    }
}

/// Keystrokes in capture order.
///
/// Order is chronological, and replaying the log takes
/// [`total_delay`](Self::total_delay) plus the time spent writing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<InputEvent>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate events in capture order.
    pub fn iter(&self) -> std::slice::Iter<'_, InputEvent> {
        self.events.iter()
    }

    /// Sum of all delays.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        self.events.iter().map(|e| e.delay).sum()
    }

    /// The raw keys, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.key).collect()
    }

    /// Borrow the events as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[InputEvent] {
        &self.events
    }
}

impl From<Vec<InputEvent>> for EventLog {
    fn from(events: Vec<InputEvent>) -> Self {
        Self { events }
    }
}

impl FromIterator<InputEvent> for EventLog {
    fn from_iter<T: IntoIterator<Item = InputEvent>>(iter: T) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a InputEvent;
    type IntoIter = std::slice::Iter<'a, InputEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_delay_sums_all_events() {
        let log: EventLog = [
            InputEvent::new(b'a', Duration::ZERO),
            InputEvent::new(b'b', Duration::from_millis(5)),
            InputEvent::new(b'c', Duration::from_millis(2)),
        ]
        .into_iter()
        .collect();

        assert_eq!(log.len(), 3);
        assert_eq!(log.total_delay(), Duration::from_millis(7));
        assert_eq!(log.keys(), b"abc");
    }

    #[test]
    fn empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.total_delay(), Duration::ZERO);
    }
}
