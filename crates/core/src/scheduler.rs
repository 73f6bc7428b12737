//! Scheduler port - where a piece of work runs
//!
//! Game-state mutation and host calls run on a designated context; I/O
//! runs on tokio. Work that needs an I/O result is handed back to its
//! context with [`resume_on_player`].

use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use shared::PlayerId;

use crate::error::{Result, ServiceError};

/// A unit of work for an execution context
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler Trait
pub trait Scheduler: Send + Sync {
    /// Run on the single designated context (registration, reloads)
    fn run_global(&self, task: Task) -> Result<()>;

    /// Run on the context owning `player`
    fn run_for_player(&self, player: PlayerId, task: Task) -> Result<()>;
}

/// Runs every task immediately on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_global(&self, task: Task) -> Result<()> {
        task();
        Ok(())
    }

    fn run_for_player(&self, _player: PlayerId, task: Task) -> Result<()> {
        task();
        Ok(())
    }
}

enum Job {
    Run(Task),
    Stop,
}

/// One tokio task draining a queue of jobs in submission order
///
/// Every task, global or per-player, runs on the same context, so
/// per-player work is serialized with registration.
pub struct MainThreadScheduler {
    jobs: mpsc::UnboundedSender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MainThreadScheduler {
    /// Start the job loop; needs a running tokio runtime
    pub fn start() -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(job) = queue.recv().await {
                match job {
                    Job::Run(task) => task(),
                    Job::Stop => break,
                }
            }
            debug!("Main context stopped");
        });
        Self {
            jobs,
            worker: Mutex::new(Some(worker)),
        }
    }

    fn submit(&self, task: Task) -> Result<()> {
        self.jobs
            .send(Job::Run(task))
            .map_err(|_| ServiceError::SchedulerClosed)
    }

    /// Run what is already queued, then stop. Later submissions fail.
    pub async fn stop(&self) {
        let _ = self.jobs.send(Job::Stop);
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Scheduler for MainThreadScheduler {
    fn run_global(&self, task: Task) -> Result<()> {
        self.submit(task)
    }

    fn run_for_player(&self, player: PlayerId, task: Task) -> Result<()> {
        trace!(player = %player, "Queued player task");
        self.submit(task)
    }
}

/// Run `f` on `player`'s context and wait for its result
pub async fn resume_on_player<T, F>(scheduler: &dyn Scheduler, player: PlayerId, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    scheduler.run_for_player(
        player,
        Box::new(move || {
            let _ = tx.send(f());
        }),
    )?;
    rx.await.map_err(|_| ServiceError::SchedulerClosed)
}
