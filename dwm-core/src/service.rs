//! Application service loop.
//!
//! Registers for events, then waits for and dispatches one event at a time.
//! Each event is handled to completion before the next wait. A failed wait
//! or a dropped event never stops the loop.

use log::{info, warn};

use crate::dispatch::{Dispatcher, EventOutcome};
use crate::event::{EventMask, TagEvent};
use crate::types::Result;
use crate::uplink::UplinkWriter;

/// Host-side event delivery.
pub trait EventSource {
    /// Declare which kinds the application wants.
    fn register(&mut self, mask: EventMask);

    /// Block until the next event.
    ///
    /// Returns `Ok(None)` once the source has nothing more to deliver; live
    /// sources never do.
    fn wait_event(&mut self) -> Result<Option<TagEvent>>;
}

/// Counters accumulated by `run`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
    pub events: u64,
    pub sent: u64,
    pub write_failures: u64,
    pub dropped: u64,
    pub wait_errors: u64,
}

/// Run the service loop until the source is exhausted.
pub fn run<S, W>(source: &mut S, dispatcher: &mut Dispatcher<W>, mask: EventMask) -> ServiceStats
where
    S: EventSource + ?Sized,
    W: UplinkWriter,
{
    let mut stats = ServiceStats::default();
    source.register(mask);

    loop {
        let event = match source.wait_event() {
            Ok(Some(evt)) => evt,
            Ok(None) => break,
            Err(e) => {
                warn!("event wait failed: {e}");
                stats.wait_errors += 1;
                continue;
            }
        };

        stats.events += 1;
        match dispatcher.handle(&event) {
            EventOutcome::Sent { status, .. } => {
                stats.sent += 1;
                if !status.is_ok() {
                    stats.write_failures += 1;
                }
            }
            EventOutcome::Dropped(_) => stats.dropped += 1,
            _ => {}
        }
    }

    info!(
        "event source closed: {} events, {} sent, {} dropped, {} wait errors",
        stats.events, stats.sent, stats.dropped, stats.wait_errors
    );
    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
