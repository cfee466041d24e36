//! The contest executor: a fixed pool of persistent workers.
//!
//! Workers draw from one shared FIFO. Submission never blocks the
//! submitter; each worker runs exactly one contest at a time to
//! completion and appends it to the completed collection for the
//! settlement drain. Completion order across workers is not submission
//! order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::{ArenaError, Contest, ContestConfig, OutcomeResolver};

/// A fixed-size pool of contest workers.
pub struct ContestPool {
    sender: std::sync::Mutex<Option<mpsc::UnboundedSender<Contest>>>,
    completed: Arc<Mutex<Vec<Contest>>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl ContestPool {
    /// Spawns `size` workers sharing one task queue.
    pub fn new(
        size: usize,
        resolver: Arc<dyn OutcomeResolver>,
        config: ContestConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Contest>();
        let receiver = Arc::new(Mutex::new(receiver));
        let completed = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(size);
        for worker in 0..size {
            let receiver = Arc::clone(&receiver);
            let completed = Arc::clone(&completed);
            let shutdown = Arc::clone(&shutdown);
            let resolver = Arc::clone(&resolver);
            let config = config.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    // The receiver lock doubles as work distribution:
                    // exactly one idle worker waits on the channel.
                    let contest = receiver.lock().await.recv().await;
                    let Some(mut contest) = contest else {
                        break; // channel closed and drained
                    };
                    if shutdown.load(Ordering::SeqCst) {
                        break; // finish nothing new after shutdown
                    }

                    tracing::debug!(worker, contest = ?contest, "contest started");
                    contest.run(resolver.as_ref(), &config).await;
                    completed.lock().await.push(contest);
                }
                tracing::debug!(worker, "contest worker stopped");
            }));
        }

        tracing::info!(size, "contest pool started");
        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            completed,
            workers: std::sync::Mutex::new(workers),
            shutdown,
        }
    }

    /// Enqueues a contest. Never blocks the submitter.
    ///
    /// # Errors
    /// Returns [`ArenaError::PoolClosed`] after shutdown.
    pub fn submit(&self, contest: Contest) -> Result<(), ArenaError> {
        let sender = self.sender.lock().expect("pool lock poisoned");
        sender
            .as_ref()
            .ok_or(ArenaError::PoolClosed)?
            .send(contest)
            .map_err(|_| ArenaError::PoolClosed)
    }

    /// Removes and returns every completed contest with a decided
    /// winner. Undecided entries (which should not occur) are left in
    /// place.
    pub async fn take_completed(&self) -> Vec<Contest> {
        let mut completed = self.completed.lock().await;
        let mut decided = Vec::new();
        let mut i = 0;
        while i < completed.len() {
            if completed[i].winner().is_some() {
                decided.push(completed.remove(i));
            } else {
                i += 1;
            }
        }
        decided
    }

    /// Signals workers to stop after their current contest and waits
    /// for them to exit. Contests still queued are dropped un-run.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.sender.lock().expect("pool lock poisoned").take();

        let workers: Vec<JoinHandle<()>> =
            self.workers.lock().expect("pool lock poisoned").drain(..).collect();
        for worker in workers {
            let _ = worker.await;
        }
        tracing::info!("contest pool shut down");
    }
}

// =========================================================================
// Tests
// =========================================================================
