//! Bounded tracking queue drained by a fixed worker pool

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{TrackingHandler, TrackingJob};

#[derive(Debug, Default)]
pub struct TrackingStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackingSnapshot {
    pub enqueued: u64,
    pub dropped: u64,
    pub completed: u64,
    pub failed: u64,
}

impl TrackingStats {
    pub fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct TrackingDispatcher {
    sender: ArcSwapOption<mpsc::Sender<TrackingJob>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<TrackingStats>,
}

impl TrackingDispatcher {
    /// Spawns `workers` tasks on the current runtime.
    pub fn start(handler: Arc<dyn TrackingHandler>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(TrackingStats::default());

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    rx.clone(),
                    handler.clone(),
                    stats.clone(),
                ))
            })
            .collect();

        info!("Tracking dispatcher started: {} workers, queue {}", workers.max(1), capacity);
        Self {
            sender: ArcSwapOption::from_pointee(tx),
            workers: Mutex::new(handles),
            stats,
        }
    }

    /// Never waits: a full or closed queue drops the job.
    pub fn dispatch(&self, job: TrackingJob) -> bool {
        let Some(sender) = self.sender.load_full() else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Tracking queue closed, dropping job for {}", job.root_id);
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Tracking queue full, dropping job for {}", job.root_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Tracking queue closed, dropping job for {}", job.root_id);
                false
            }
        }
    }

    pub fn stats(&self) -> TrackingSnapshot {
        self.stats.snapshot()
    }

    /// Closes the queue and waits for workers to drain it.
    /// Returns false when the timeout hit first.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.sender.store(None);
        let handles = std::mem::take(&mut *self.workers.lock().await);

        let drained = tokio::time::timeout(timeout, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Tracking worker ended abnormally: {}", e);
                }
            }
        })
        .await
        .is_ok();

        if drained {
            info!("Tracking queue drained: {:?}", self.stats());
        } else {
            warn!("Tracking queue not drained within {:?}", timeout);
        }
        drained
    }
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<TrackingJob>>>,
    handler: Arc<dyn TrackingHandler>,
    stats: Arc<TrackingStats>,
) {
    loop {
        // 只在取任务时持锁
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        let root_id = job.root_id.clone();
        match handler.handle(job).await {
            Ok(status) => {
                stats.completed.fetch_add(1, Ordering::Relaxed);
                debug!("worker {} finished job for {}: {:?}", worker_id, root_id, status);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Tracking job for {} failed: {:#}", root_id, e);
            }
        }
    }
    debug!("tracking worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ActionPayload;
    use crate::services::tracking::{TrackStatus, TrackedOutcome};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn job(root: &str) -> TrackingJob {
        TrackingJob {
            root_id: root.to_string(),
            child_id: "child".to_string(),
            child_target: "https://ex.com".to_string(),
            payload: ActionPayload::default(),
            outcome: TrackedOutcome::Frame,
            next_buttons: None,
        }
    }

    /// Blocks every job until released; fails jobs whose root is "bad".
    struct GatedHandler {
        gate: Notify,
    }

    #[async_trait]
    impl TrackingHandler for GatedHandler {
        async fn handle(&self, job: TrackingJob) -> anyhow::Result<TrackStatus> {
            self.gate.notified().await;
            if job.root_id == "bad" {
                anyhow::bail!("boom");
            }
            Ok(TrackStatus::Captured)
        }
    }

    struct InstantHandler;

    #[async_trait]
    impl TrackingHandler for InstantHandler {
        async fn handle(&self, job: TrackingJob) -> anyhow::Result<TrackStatus> {
            if job.root_id == "bad" {
                anyhow::bail!("boom");
            }
            Ok(TrackStatus::Captured)
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let handler = Arc::new(GatedHandler { gate: Notify::new() });
        let dispatcher = TrackingDispatcher::start(handler.clone(), 1, 1);

        // 第一个任务被 worker 取走并阻塞，第二个占满队列
        assert!(dispatcher.dispatch(job("a")));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dispatcher.dispatch(job("b")));
        assert!(!dispatcher.dispatch(job("c")));

        let stats = dispatcher.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dropped, 1);

        handler.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.gate.notify_one();
        assert!(dispatcher.shutdown(Duration::from_secs(2)).await);
        assert_eq!(dispatcher.stats().completed, 2);
    }

    #[tokio::test]
    async fn test_counts_outcomes_and_drains_on_shutdown() {
        let dispatcher = TrackingDispatcher::start(Arc::new(InstantHandler), 2, 16);
        for root in ["a", "bad", "b", "bad"] {
            assert!(dispatcher.dispatch(job(root)));
        }
        assert!(dispatcher.shutdown(Duration::from_secs(2)).await);

        let stats = dispatcher.stats();
        assert_eq!(stats.enqueued, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_dropped() {
        let dispatcher = TrackingDispatcher::start(Arc::new(InstantHandler), 1, 4);
        assert!(dispatcher.shutdown(Duration::from_secs(1)).await);
        assert!(!dispatcher.dispatch(job("late")));
        assert_eq!(dispatcher.stats().dropped, 1);
    }
}
