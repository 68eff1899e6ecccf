#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::time::Duration;

use common::{TestRepository, at, fixture, running_job};
use jobs_core::{JobStatus, MonitorEvent};
use monitor::{CleanupMessage, MonitorConfig, SweepOutcome, concurrency, start_cleanup_actor};

const NEVER: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn test_sweep_now_marks_jobs_and_broadcasts() -> Result<(), Box<dyn Error>> {
    let f = fixture(TestRepository::new(), at(0, 10, 0), MonitorConfig::default());
    let (actor, handle) = start_cleanup_actor(f.detector.clone(), NEVER).await?;

    let (tx, rx) = concurrency::oneshot();
    actor.send_message(CleanupMessage::Subscribe { reply: tx.into() })?;
    let mut events = rx.await?;

    let job = running_job("import", at(0, 1, 0), at(0, 10, 0));
    f.repo.seed(&[job.clone()]).await;

    let (tx, rx) = concurrency::oneshot();
    actor.send_message(CleanupMessage::SweepNow { reply: tx.into() })?;
    let outcome = rx.await??;
    match outcome {
        SweepOutcome::Completed(report) => assert_eq!(report.stopped.len(), 1),
        SweepOutcome::AlreadyRunning => panic!("actor sweeps never overlap"),
    }
    assert_eq!(f.repo.get(job.job_id).await.status, JobStatus::Dead);

    let mut declared = None;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await??;
        match event {
            MonitorEvent::JobDeclaredDead { .. } => {
                // Stamped by the job's own clock.
                assert_eq!(event.timestamp(), at(0, 10, 0));
                declared = event.job_id();
            }
            MonitorEvent::SweepCompleted { stopped: 1, .. } => break,
            _ => {}
        }
    }
    assert_eq!(declared, Some(job.job_id));

    actor.send_message(CleanupMessage::Shutdown)?;
    handle.await?;
    Ok(())
}

#[tokio::test]
async fn test_timer_drives_sweeps() -> Result<(), Box<dyn Error>> {
    let f = fixture(TestRepository::new(), at(0, 10, 0), MonitorConfig::default());
    let job = running_job("import", at(0, 1, 0), at(0, 10, 0));
    f.repo.seed(&[job.clone()]).await;

    let (actor, handle) = start_cleanup_actor(f.detector.clone(), Duration::from_millis(20)).await?;

    let dead = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if f.repo.get(job.job_id).await.status == JobStatus::Dead {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(dead.is_ok(), "timer never triggered a sweep");

    // Later ticks keep sweeping without touching the dead job again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.mutex.released(), vec!["import".to_string()]);
    assert_eq!(f.repo.get(job.job_id).await.messages.len(), 1);

    actor.send_message(CleanupMessage::Shutdown)?;
    handle.await?;
    Ok(())
}

#[tokio::test]
async fn test_query_failure_is_broadcast() -> Result<(), Box<dyn Error>> {
    let repo = TestRepository::new();
    repo.fail_query
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let f = fixture(repo, at(0, 10, 0), MonitorConfig::default());
    let (actor, handle) = start_cleanup_actor(f.detector.clone(), NEVER).await?;

    let (tx, rx) = concurrency::oneshot();
    actor.send_message(CleanupMessage::Subscribe { reply: tx.into() })?;
    let mut events = rx.await?;

    let (tx, rx) = concurrency::oneshot();
    actor.send_message(CleanupMessage::SweepNow { reply: tx.into() })?;
    assert!(rx.await?.is_err());

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await??;
    assert!(matches!(event, MonitorEvent::SweepFailed { .. }));

    actor.send_message(CleanupMessage::Shutdown)?;
    handle.await?;
    Ok(())
}
