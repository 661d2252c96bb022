//! Periodic upstream polling feeding the SSE broadcast.
//!
//! One poller task per process refreshes the service snapshot at a fixed
//! interval and fans it out over a bounded `tokio::sync::broadcast` channel.
//! Every SSE subscriber holds its own receiver; a subscriber that falls
//! behind skips to the most recent snapshot instead of backpressuring the
//! poller.

use std::sync::Arc;
use std::time::Duration;

use flighttrack_core::FlightRecord;
use tokio::sync::broadcast;

use crate::service::FlightService;

/// Snapshots buffered per lagging subscriber before it starts skipping.
const BROADCAST_CAPACITY: usize = 16;

/// Handle to the flight snapshot broadcast.
#[derive(Clone)]
pub struct FlightBroadcaster {
    sender: broadcast::Sender<Arc<Vec<FlightRecord>>>,
}

impl FlightBroadcaster {
    /// Start the poller task and return the broadcast handle.
    ///
    /// The task runs for the life of the process; ticks with no subscribers
    /// still refresh the snapshot, keeping the cache warm.
    pub fn start(service: Arc<FlightService>, interval: Duration) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        let broadcaster = Self {
            sender: sender.clone(),
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let snapshot = service.refresh_snapshot().await;
                // Err means no subscribers right now, which is fine.
                let _ = sender.send(snapshot);
            }
        });

        broadcaster
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<FlightRecord>>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
