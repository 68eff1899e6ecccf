//! Message types for actor communication.

use jobs_core::MonitorEvent;
use ractor::RpcReplyPort;
use tokio::sync::broadcast;

use crate::dead_jobs::{SweepError, SweepOutcome};

/// Messages for the CleanupActor.
#[derive(Debug)]
pub enum CleanupMessage {
    /// Periodic tick from the sweep timer.
    Tick,

    /// Run a sweep right away and report what it did.
    SweepNow {
        reply: RpcReplyPort<Result<SweepOutcome, SweepError>>,
    },

    /// Subscribe to monitor events.
    Subscribe {
        reply: RpcReplyPort<broadcast::Receiver<MonitorEvent>>,
    },

    /// Stop the timer and the actor.
    Shutdown,
}
