//! Debouncing of change events into bursts.

use std::time::Duration;

use tokio::time::Instant;

use crate::event::ServerEvent;

/// Collapses change events into bursts and calls back once per burst.
///
/// A burst opens with the first change event (or [`trigger`]) and closes
/// when no further change arrived for the debounce window. The owner
/// drives time: it calls [`fire_if_due`] whenever [`deadline`] passes.
///
/// [`trigger`]: Dispatcher::trigger
/// [`fire_if_due`]: Dispatcher::fire_if_due
/// [`deadline`]: Dispatcher::deadline
pub struct Dispatcher<F> {
    window: Duration,
    deadline: Option<Instant>,
    burst_events: usize,
    bursts: u64,
    callback: F,
}

impl<F: FnMut()> Dispatcher<F> {
    /// Creates a dispatcher with the given debounce window.
    pub const fn new(window: Duration, callback: F) -> Self {
        Self {
            window,
            deadline: None,
            burst_events: 0,
            bursts: 0,
            callback,
        }
    }

    /// Feeds one event observed while watching. Returns true if it was a
    /// change and opened or extended a burst.
    pub fn on_event(&mut self, event: &ServerEvent) -> bool {
        if !event.is_change() {
            tracing::trace!(?event, "Ignoring non-change event");
            return false;
        }
        tracing::debug!(?event, "Change event");
        self.extend();
        true
    }

    /// Opens (or extends) a burst without an event.
    pub fn trigger(&mut self) {
        self.extend();
    }

    fn extend(&mut self) {
        self.burst_events += 1;
        self.deadline = Some(Instant::now() + self.window);
    }

    /// When the open burst closes, if one is open.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true while a burst is open.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fires the callback if the open burst's quiet period has elapsed.
    pub fn fire_if_due(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.fire();
                true
            }
            _ => false,
        }
    }

    /// Fires an open burst immediately. Returns false if none was open.
    pub fn flush(&mut self) -> bool {
        if self.deadline.is_none() {
            return false;
        }
        self.fire();
        true
    }

    fn fire(&mut self) {
        self.bursts += 1;
        tracing::info!(
            burst = self.bursts,
            events = self.burst_events,
            "Mailbox change detected"
        );
        self.deadline = None;
        self.burst_events = 0;
        (self.callback)();
    }

    /// Number of bursts fired so far.
    #[must_use]
    pub const fn bursts(&self) -> u64 {
        self.bursts
    }
}
