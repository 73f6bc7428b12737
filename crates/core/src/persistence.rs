//! Write-behind persistence
//!
//! A single worker applies writes in the order they were enqueued, so two
//! saves of the same record can never land out of order. Callers never
//! wait for a write unless they ask to with [`PersistenceQueue::flush`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use shared::Progress;
use storage::ProgressRepository;

enum Command {
    Save(Progress),
    SaveAll(Vec<Progress>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct Counters {
    written: AtomicU64,
    failed: AtomicU64,
}

/// Persistence Queue
pub struct PersistenceQueue {
    commands: mpsc::UnboundedSender<Command>,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceQueue {
    /// Spawn the writer; needs a running tokio runtime
    pub fn start(repository: Arc<dyn ProgressRepository>) -> Self {
        let (commands, queue) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(writer(repository, queue, Arc::clone(&counters)));
        Self {
            commands,
            counters,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue an upsert of one record
    pub fn enqueue(&self, progress: Progress) {
        if self.commands.send(Command::Save(progress)).is_err() {
            warn!("Persistence queue closed, dropping write");
        }
    }

    /// Queue one transactional batch
    pub fn enqueue_all(&self, batch: Vec<Progress>) {
        if batch.is_empty() {
            return;
        }
        if self.commands.send(Command::SaveAll(batch)).is_err() {
            warn!("Persistence queue closed, dropping batch");
        }
    }

    /// Wait until every write enqueued before this call has been applied
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Drain pending writes and stop the worker
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Persistence worker panicked");
            }
        }
    }

    /// Records written successfully (a batch counts each record)
    pub fn written(&self) -> u64 {
        self.counters.written.load(Ordering::Relaxed)
    }

    /// Write calls that failed
    pub fn failed_writes(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }
}

async fn writer(
    repository: Arc<dyn ProgressRepository>,
    mut queue: mpsc::UnboundedReceiver<Command>,
    counters: Arc<Counters>,
) {
    while let Some(command) = queue.recv().await {
        match command {
            Command::Save(progress) => match repository.save_player_progress(&progress).await {
                Ok(()) => {
                    counters.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        player = %progress.player_id,
                        milestone = %progress.milestone_id,
                        error = %e,
                        "Failed to save progress"
                    );
                }
            },
            Command::SaveAll(batch) => match repository.save_all(&batch).await {
                Ok(()) => {
                    counters.written.fetch_add(batch.len() as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(records = batch.len(), error = %e, "Failed to save progress batch");
                }
            },
            Command::Flush(done) => {
                let _ = done.send(());
            }
            Command::Shutdown(done) => {
                let _ = done.send(());
                break;
            }
        }
    }
    debug!("Persistence worker stopped");
}
