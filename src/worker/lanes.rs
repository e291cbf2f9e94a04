//! Per-user lanes: at most one task per user in flight, the rest wait in line.
//!
//! A user with a task queued or running owns a lane. Later tasks from the same
//! user are parked in that user's FIFO, each holding a reserved queue slot, and
//! the next one is released into the job queue when the running task's
//! [`LaneGuard`] drops.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::QueueError;
use crate::worker::queue::{JobQueue, QueuedTask, Reservation};
use crate::worker::task::Task;

/// Where a submitted task ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// In the job queue now.
    Queued,
    /// Parked behind the user's task in flight. `position` counts from 1.
    Waiting { position: usize },
}

#[derive(Debug)]
struct Deferred {
    task: Task,
    slot: Reservation,
}

/// Lanes keyed by user id. A key is present while that user is busy.
#[derive(Debug, Default)]
pub struct UserLanes {
    lines: Mutex<HashMap<String, VecDeque<Deferred>>>,
}

impl UserLanes {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `task`, or park it behind its user's task in flight.
    ///
    /// Parking reserves a queue slot up front, so a full queue rejects the task
    /// here rather than when its turn comes.
    pub fn submit(
        self: &Arc<Self>,
        queue: &JobQueue,
        task: Task,
    ) -> Result<Admission, QueueError> {
        let user_id = task.user_id.clone();
        {
            let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(waiting) = lines.get_mut(&user_id) {
                let slot = queue.reserve()?;
                debug!(task_id = %task.id, user_id = %user_id, "Task waiting for user lane");
                waiting.push_back(Deferred { task, slot });
                return Ok(Admission::Waiting {
                    position: waiting.len(),
                });
            }
            lines.insert(user_id.clone(), VecDeque::new());
        }

        // On failure the guard is dropped with the task and the lane frees itself.
        let lane = self.guard(user_id);
        queue.enqueue(task, Some(lane))?;
        Ok(Admission::Queued)
    }

    pub fn is_busy(&self, user_id: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(user_id)
    }

    /// Number of users with a task in flight.
    pub fn busy_count(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Tasks parked behind `user_id`'s task in flight.
    pub fn waiting(&self, user_id: &str) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .map_or(0, VecDeque::len)
    }

    fn guard(self: &Arc<Self>, user_id: String) -> LaneGuard {
        LaneGuard {
            lanes: Arc::clone(self),
            user_id,
        }
    }

    fn release(self: &Arc<Self>, user_id: &str) {
        let next = {
            let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
            match lines.get_mut(user_id).map(VecDeque::pop_front) {
                Some(Some(next)) => Some(next),
                Some(None) => {
                    lines.remove(user_id);
                    None
                }
                None => None,
            }
        };

        // Sent outside the lock: a closed queue drops the task, and its new
        // guard comes straight back here.
        if let Some(Deferred { task, slot }) = next {
            let lane = self.guard(user_id.to_string());
            slot.send(QueuedTask {
                task,
                lane: Some(lane),
            });
        }
    }
}

/// Held for as long as a user's task is in flight. Dropping it hands the lane
/// to the user's next waiting task, or frees it.
#[derive(Debug)]
pub struct LaneGuard {
    lanes: Arc<UserLanes>,
    user_id: String,
}

impl LaneGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        self.lanes.release(&self.user_id);
    }
}
