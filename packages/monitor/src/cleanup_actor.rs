//! Actor that drives the dead job sweep on a fixed interval.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use db::JobRepository;
use jobs_core::MonitorEvent;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::dead_jobs::{StopDeadJobs, SweepError, SweepOutcome};
use crate::messages::CleanupMessage;
use crate::mutex::JobMutexHandler;

/// Arguments for spawning a [`CleanupActor`].
pub struct CleanupArgs<R, M> {
    pub detector: Arc<StopDeadJobs<R, M>>,
    pub sweep_interval: Duration,
}

/// State for the cleanup actor.
pub struct CleanupActorState<R, M> {
    detector: Arc<StopDeadJobs<R, M>>,
    /// Event broadcaster.
    event_tx: broadcast::Sender<MonitorEvent>,
    /// Timer task sending `Tick` messages.
    ticker: Option<JoinHandle<()>>,
}

impl<R, M> CleanupActorState<R, M>
where
    R: JobRepository + 'static,
    M: JobMutexHandler + 'static,
{
    fn broadcast(&self, event: MonitorEvent) {
        tracing::debug!(at = %event.timestamp(), "{}", event.description());
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    async fn run_sweep(&self) -> Result<SweepOutcome, SweepError> {
        let result = self.detector.sweep().await;

        match &result {
            Ok(SweepOutcome::Completed(report)) => {
                for dead in &report.stopped {
                    self.broadcast(MonitorEvent::JobDeclaredDead {
                        job_id: dead.job_id,
                        job_type: dead.job_type.clone(),
                        stopped_at: dead.stopped_at,
                    });
                }
                self.broadcast(MonitorEvent::SweepCompleted {
                    candidates: report.candidates,
                    stopped: report.stopped.len(),
                    failed: report.failed.len(),
                    timestamp: Utc::now(),
                });
            }
            Ok(SweepOutcome::AlreadyRunning) => {}
            Err(e) => {
                tracing::error!("Dead job sweep failed: {}", e);
                self.broadcast(MonitorEvent::SweepFailed {
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        result
    }
}

/// Actor that sweeps for dead jobs whenever its timer fires.
///
/// Messages are handled one at a time, so ticks arriving during a slow sweep
/// wait in the mailbox instead of starting a second sweep.
pub struct CleanupActor<R, M>(PhantomData<fn() -> (R, M)>);

impl<R, M> CleanupActor<R, M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R, M> Default for CleanupActor<R, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, M> Actor for CleanupActor<R, M>
where
    R: JobRepository + 'static,
    M: JobMutexHandler + 'static,
{
    type Msg = CleanupMessage;
    type State = CleanupActorState<R, M>;
    type Arguments = CleanupArgs<R, M>;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            interval_secs = args.sweep_interval.as_secs(),
            "Starting dead job cleanup"
        );

        let myself_clone = myself.clone();
        // tokio intervals reject a zero period
        let period = args.sweep_interval.max(Duration::from_millis(1));
        let ticker = tokio::spawn(async move {
            // First sweep one period after start, not immediately.
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if myself_clone.send_message(CleanupMessage::Tick).is_err() {
                    break;
                }
            }
        });

        let (event_tx, _) = broadcast::channel(256);

        Ok(CleanupActorState {
            detector: args.detector,
            event_tx,
            ticker: Some(ticker),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CleanupMessage::Tick => {
                // Failures are logged and broadcast; the next tick tries again.
                let _ = state.run_sweep().await;
            }

            CleanupMessage::SweepNow { reply } => {
                let result = state.run_sweep().await;
                let _ = reply.send(result);
            }

            CleanupMessage::Subscribe { reply } => {
                let _ = reply.send(state.event_tx.subscribe());
            }

            CleanupMessage::Shutdown => {
                tracing::info!("Shutting down dead job cleanup");
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        Ok(())
    }
}

/// Spawn the cleanup actor for `detector`, sweeping every `sweep_interval`.
pub async fn start_cleanup_actor<R, M>(
    detector: Arc<StopDeadJobs<R, M>>,
    sweep_interval: Duration,
) -> Result<(ActorRef<CleanupMessage>, JoinHandle<()>), ractor::SpawnErr>
where
    R: JobRepository + 'static,
    M: JobMutexHandler + 'static,
{
    let args = CleanupArgs {
        detector,
        sweep_interval,
    };
    let (actor, handle) = Actor::spawn(None, CleanupActor::<R, M>::new(), args).await?;

    Ok((actor, handle))
}
