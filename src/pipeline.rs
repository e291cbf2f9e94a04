//! The background task pipeline.
//!
//! [`Pipeline`] owns the job queue, the user lanes, the collaborators and the
//! worker pool. Nothing here is global: tests build as many pipelines as they
//! like, each with its own stubs.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tracing::{debug, info};

use crate::channels::{EventStream, Messenger};
use crate::config::PipelineConfig;
use crate::dispatch::Dispatcher;
use crate::documents::DocumentParser;
use crate::fetcher::PostingFetcher;
use crate::llm::AnalysisEngine;
use crate::store::SessionStore;
use crate::worker::{
    JobQueue, PipelineStats, StatsSnapshot, UserLanes, WorkerDeps, WorkerPool,
};

/// Collaborators the pipeline runs against.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn SessionStore>,
    pub messenger: Arc<dyn Messenger>,
    pub parser: Arc<dyn DocumentParser>,
    pub fetcher: Arc<dyn PostingFetcher>,
    pub engine: Arc<dyn AnalysisEngine>,
}

pub struct Pipeline {
    config: PipelineConfig,
    deps: PipelineDeps,
    queue: Arc<JobQueue>,
    lanes: Arc<UserLanes>,
    stats: Arc<PipelineStats>,
    pool: Mutex<Option<WorkerPool>>,
}

impl Pipeline {
    /// Build a pipeline. Workers are not started until [`Pipeline::start`].
    pub fn new(config: PipelineConfig, deps: PipelineDeps) -> Self {
        Self {
            queue: Arc::new(JobQueue::new(config.queue_capacity)),
            lanes: UserLanes::new(),
            stats: Arc::new(PipelineStats::new()),
            pool: Mutex::new(None),
            config,
            deps,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A dispatcher feeding this pipeline's queue.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.lanes),
            Arc::clone(&self.deps.messenger),
            self.config.policy,
            Arc::clone(&self.stats),
        )
    }

    /// Spawn the worker pool. Calling this twice has no effect.
    pub fn start(&self) {
        let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if pool.is_some() {
            debug!("Pipeline already started");
            return;
        }

        let deps = WorkerDeps {
            store: Arc::clone(&self.deps.store),
            messenger: Arc::clone(&self.deps.messenger),
            parser: Arc::clone(&self.deps.parser),
            fetcher: Arc::clone(&self.deps.fetcher),
            engine: Arc::clone(&self.deps.engine),
            session_ttl: self.config.session_ttl,
            fetch_timeout: self.config.fetch_timeout,
            upload_dir: self.config.upload_dir.clone(),
        };
        *pool = Some(WorkerPool::spawn(
            self.config.worker_count,
            Arc::clone(&self.queue),
            deps,
            Arc::clone(&self.stats),
        ));
        info!(
            workers = self.config.worker_count,
            capacity = self.config.queue_capacity,
            policy = ?self.config.policy,
            "Pipeline started"
        );
    }

    pub fn is_running(&self) -> bool {
        self.pool
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Stop accepting work, let workers finish what is queued, then wait for
    /// them.
    pub async fn shutdown(&self) {
        self.queue.close();
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(pool) = pool {
            pool.join().await;
        }
        info!(stats = ?self.stats.snapshot(), "Pipeline shut down");
    }

    /// Dispatch every event from `events`, in arrival order, until the
    /// stream ends. Acknowledgements and rejections are sent on their own
    /// tasks, so one slow chat never delays admission for the next user.
    pub async fn run(&self, mut events: EventStream) {
        let dispatcher = self.dispatcher();
        while let Some(event) = events.next().await {
            dispatcher.dispatch_detached(event);
        }
        debug!("Event stream ended");
    }

    /// Number of tasks waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
