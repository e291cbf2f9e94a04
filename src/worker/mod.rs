//! Worker system: bounded queue, per-user lanes and a fixed worker pool.
//!
//! Core components:
//! - `task` - Task types (resume ingest, posting ingest, question)
//! - `state` - Task state machine (Queued -> Running -> Delivered/Failed)
//! - `queue` - Bounded FIFO shared by all workers
//! - `lanes` - One in-flight task per user, later ones wait in a per-user FIFO
//! - `handlers` - One handler per task kind
//! - `pool` - Long-lived workers with panic isolation
//! - `stats` - Lifetime counters

pub mod handlers;
pub mod lanes;
pub mod pool;
pub mod queue;
pub mod state;
pub mod stats;
pub mod task;

pub use handlers::WorkerDeps;
pub use lanes::{Admission, LaneGuard, UserLanes};
pub use pool::WorkerPool;
pub use queue::{JobQueue, QueuedTask, Reservation};
pub use state::{StateTransition, TaskState};
pub use stats::{PipelineStats, StatsSnapshot};
pub use task::{Task, TaskKind, TaskPayload};
