//! Worker pool: a fixed set of long-lived workers draining the job queue.
//!
//! Each worker runs the handler for a task in its own tokio task so a panic
//! ends only that task. The worker then delivers exactly one terminal message
//! and goes back to the queue.

use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::TaskError;
use crate::worker::handlers::{self, WorkerDeps};
use crate::worker::queue::{JobQueue, QueuedTask};
use crate::worker::state::TaskState;
use crate::worker::stats::PipelineStats;

/// Handle to the running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers sharing `queue`.
    pub fn spawn(
        count: usize,
        queue: Arc<JobQueue>,
        deps: WorkerDeps,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let handles = (0..count)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let deps = deps.clone();
                let stats = Arc::clone(&stats);
                tokio::spawn(async move { run_worker(worker_id, queue, deps, stats).await })
            })
            .collect();

        info!(workers = count, "Worker pool started");
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Workers exit once the queue is closed
    /// and drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker exited abnormally: {}", e);
            }
        }
        info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    queue: Arc<JobQueue>,
    deps: WorkerDeps,
    stats: Arc<PipelineStats>,
) {
    debug!(worker_id, "Worker waiting for tasks");
    while let Some(queued) = queue.dequeue().await {
        process(worker_id, queued, &deps, &stats).await;
    }
    debug!(worker_id, "Worker exiting: queue closed");
}

async fn process(worker_id: usize, queued: QueuedTask, deps: &WorkerDeps, stats: &PipelineStats) {
    let QueuedTask { mut task, lane } = queued;

    if let Err(e) = task.transition_to(TaskState::Running) {
        warn!(task_id = %task.id, "{}", e);
    }
    info!(
        worker_id,
        task_id = %task.id,
        user_id = %task.user_id,
        kind = %task.kind(),
        "Task started"
    );

    let handle = tokio::spawn(handlers::execute(
        deps.clone(),
        task.id,
        task.user_id.clone(),
        task.payload.clone(),
    ));
    let outcome = match handle.await {
        Ok(result) => result,
        Err(e) => Err(TaskError::Panicked(panic_message(e))),
    };

    let (message, target) = match &outcome {
        Ok(text) => (text.clone(), TaskState::Delivered),
        Err(e) => {
            warn!(
                worker_id,
                task_id = %task.id,
                user_id = %task.user_id,
                category = e.category(),
                "Task failed: {}",
                e
            );
            (e.user_message(), TaskState::Failed)
        }
    };

    if let Err(e) = deps.messenger.deliver_text(&task.user_id, &message).await {
        error!(task_id = %task.id, user_id = %task.user_id, "Failed to deliver result: {}", e);
    }

    if let Err(e) = task.transition_to(target) {
        warn!(task_id = %task.id, "{}", e);
    }

    // Hand the lane on before anyone observing stats can dispatch again.
    drop(lane);

    let elapsed = chrono::Utc::now() - task.created_at;
    info!(
        worker_id,
        task_id = %task.id,
        state = %task.state(),
        elapsed_ms = elapsed.num_milliseconds(),
        "Task finished"
    );
    match target {
        TaskState::Delivered => stats.record_delivered(),
        _ => stats.record_failed(),
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
