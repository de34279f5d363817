//! Fixed-interval publisher loop.
//!
//! One publisher drives one sampler: register the event channel once, then on
//! every tick refresh the sampler and trigger the channel with its fields.
//! Ticks never overlap; a slow tick delays the next one instead of bunching up.

use crate::{EventField, EventSink, Sampler};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Publishes a sampler's fields to a sink on a fixed cadence.
#[derive(Debug)]
pub struct Publisher<S, K> {
    event: String,
    sampler: S,
    sink: K,
    registered: bool,
}

impl<S: Sampler, K: EventSink> Publisher<S, K> {
    /// Create a publisher for `event`. Nothing is sent until [`register`](Self::register)
    /// or [`run`](Self::run) is called.
    pub fn new(event: impl Into<String>, sampler: S, sink: K) -> Self {
        Self {
            event: event.into(),
            sampler,
            sink,
            registered: false,
        }
    }

    /// Borrow the sampler.
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Whether the registration command has been issued.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Issue the registration command. Subsequent calls are no-ops.
    pub fn register(&mut self) {
        if self.registered {
            return;
        }
        self.registered = true;

        tracing::debug!(event = %self.event, "registering event");
        if let Err(e) = self.sink.register(&self.event) {
            tracing::warn!(event = %self.event, error = %e, "failed to register event");
        }
    }

    /// Run one refresh → publish step and return the published fields.
    ///
    /// A failed refresh is logged and the previous figures are published again.
    pub fn tick(&mut self) -> Vec<EventField> {
        if let Err(e) = self.sampler.refresh() {
            tracing::error!(sampler = self.sampler.name(), error = %e, "could not refresh statistics");
        }

        let fields = self.sampler.fields();
        if let Err(e) = self.sink.trigger(&self.event, &fields) {
            tracing::warn!(event = %self.event, error = %e, "failed to trigger event");
        }
        fields
    }

    /// Register, then tick every `interval`.
    ///
    /// With `max_ticks` set to `None` this never returns. Otherwise it returns
    /// the number of ticks performed once the limit is reached. The first tick
    /// fires immediately.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub async fn run(&mut self, interval: Duration, max_ticks: Option<u64>) -> u64 {
        self.register();

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        loop {
            if max_ticks.is_some_and(|max| ticks >= max) {
                return ticks;
            }

            ticker.tick().await;
            let fields = self.tick();
            ticks += 1;
            tracing::trace!(event = %self.event, tick = ticks, ?fields, "published");
        }
    }

    /// Unwrap the publisher into its sampler and sink.
    pub fn into_parts(self) -> (S, K) {
        (self.sampler, self.sink)
    }
}
