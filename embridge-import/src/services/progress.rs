//! Progress monitoring over the tool's run log
//!
//! The tool reports per-file byte counts into its run log while it works.
//! The monitor scrapes that log on an interval, converts the running
//! total into a percentage and publishes it on the event bus, until the
//! runner signals completion through the cancellation token.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use embridge_common::events::{BridgeEvent, EventBus};

use super::log_classifier;
use crate::models::ImportJob;

/// One reading of the run log.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSample {
    pub processed_bytes: u64,
    pub sampled_at: DateTime<Utc>,
}

/// Publishes progress while an import runs.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    event_bus: EventBus,
    poll_interval: Duration,
    compression_factor: f64,
}

impl ProgressMonitor {
    pub fn new(event_bus: EventBus, poll_interval: Duration, compression_factor: f64) -> Self {
        Self {
            event_bus,
            poll_interval,
            compression_factor,
        }
    }

    /// Estimate percent complete from bytes read so far. The advertised
    /// size counts compressed bytes while the log counts decompressed
    /// ones, so the expectation is scaled by the compression factor.
    /// 100.0 is reserved for confirmed completion.
    pub fn estimate_percent(&self, processed_bytes: u64, expected_bytes: u64) -> f64 {
        let expected = expected_bytes.max(1) as f64 * self.compression_factor;
        (100.0 * processed_bytes as f64 / expected).min(99.9)
    }

    /// Watch the run log until the completion token fires. While the log
    /// does not exist the tool has not started writing, nothing is
    /// published then.
    pub async fn watch(&self, job: &ImportJob, completion: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = completion.cancelled() => break,
                _ = interval.tick() => {
                    if let Some(sample) = read_sample(&job.log_path) {
                        self.publish(job, sample);
                    }
                }
            }
        }
        debug!(run_id = %job.run_id, "progress monitor stopped");
    }

    fn publish(&self, job: &ImportJob, sample: ProgressSample) {
        let percent = self.estimate_percent(sample.processed_bytes, job.expected_bytes);
        debug!(
            run_id = %job.run_id,
            processed_bytes = sample.processed_bytes,
            percent,
            "progress sample"
        );
        self.event_bus.emit_lossy(BridgeEvent::ProgressUpdated {
            run_id: job.run_id,
            percent,
            processed_bytes: sample.processed_bytes,
            timestamp: sample.sampled_at,
        });
        self.event_bus.emit_lossy(BridgeEvent::Heartbeat {
            run_id: job.run_id,
            timestamp: sample.sampled_at,
        });
    }
}

/// Read the log once. None while the log is not there to read.
fn read_sample(log_path: &Path) -> Option<ProgressSample> {
    let content = std::fs::read_to_string(log_path).ok()?;
    Some(ProgressSample {
        processed_bytes: log_classifier::processed_bytes(&content),
        sampled_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;

    fn monitor_with_bus() -> (ProgressMonitor, EventBus) {
        let bus = EventBus::new(100);
        let monitor = ProgressMonitor::new(bus.clone(), Duration::from_millis(20), 10.0);
        (monitor, bus)
    }

    #[test]
    fn test_estimate_percent_scales_by_compression_factor() {
        let (monitor, _bus) = monitor_with_bus();
        assert_eq!(monitor.estimate_percent(0, 1000), 0.0);
        // 500 of an expected 1000 * 10.0 decompressed bytes.
        assert_eq!(monitor.estimate_percent(500, 1000), 5.0);
        assert_eq!(monitor.estimate_percent(5000, 1000), 50.0);
    }

    #[test]
    fn test_estimate_percent_never_reaches_one_hundred() {
        let (monitor, _bus) = monitor_with_bus();
        assert_eq!(monitor.estimate_percent(10_000, 1000), 99.9);
        assert_eq!(monitor.estimate_percent(u64::MAX, 1), 99.9);
    }

    #[test]
    fn test_estimate_percent_guards_zero_expectation() {
        let (monitor, _bus) = monitor_with_bus();
        let percent = monitor.estimate_percent(100, 0);
        assert!(percent.is_finite());
        assert_eq!(percent, 99.9);
    }

    fn test_job(log_path: PathBuf) -> ImportJob {
        let mut job = ImportJob::new(Path::new("tmp"));
        job.log_path = log_path;
        job.expected_bytes = 1000;
        job
    }

    #[tokio::test]
    async fn test_missing_log_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let (monitor, bus) = monitor_with_bus();
        let mut rx = bus.subscribe();
        let job = test_job(dir.path().join("never_written.log"));

        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            tokio::spawn(async move { monitor.watch(&job, token).await })
        };

        tokio::time::sleep(Duration::from_millis(120)).await;
        token.cancel();
        watcher.await.unwrap();

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_log_lines_become_progress_events() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("run.log");
        std::fs::write(
            &log_path,
            "INFO Loading a.csv.gz (1,500 bytes)\nINFO Loading b.csv.gz (500 bytes)\n",
        )
        .unwrap();

        let (monitor, bus) = monitor_with_bus();
        let mut rx = bus.subscribe();
        let job = test_job(log_path);

        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            tokio::spawn(async move { monitor.watch(&job, token).await })
        };

        tokio::time::sleep(Duration::from_millis(120)).await;
        token.cancel();
        watcher.await.unwrap();

        let mut saw_progress = false;
        let mut saw_heartbeat = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                BridgeEvent::ProgressUpdated {
                    percent,
                    processed_bytes,
                    ..
                } => {
                    assert_eq!(processed_bytes, 2000);
                    // 2000 of an expected 1000 * 10.0 decompressed bytes.
                    assert_eq!(percent, 20.0);
                    saw_progress = true;
                }
                BridgeEvent::Heartbeat { .. } => saw_heartbeat = true,
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert!(saw_progress);
        assert!(saw_heartbeat);
    }

    #[tokio::test]
    async fn test_watch_stops_on_cancellation() {
        let dir = TempDir::new().unwrap();
        let (monitor, _bus) = monitor_with_bus();
        let job = test_job(dir.path().join("run.log"));

        let token = CancellationToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_secs(2), monitor.watch(&job, token))
            .await
            .expect("watch should return once the token fires");
    }
}
