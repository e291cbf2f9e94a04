//! Job queue: a bounded FIFO shared by all workers.
//!
//! `enqueue` never blocks: a full queue is reported to the caller so the chat
//! path stays responsive. `dequeue` suspends until a task arrives and returns
//! `None` once the queue is closed and drained.
//!
//! A [`Reservation`] holds one slot for a task that has to wait for its user's
//! previous task. Reserved slots count against capacity, and the queue does not
//! end until every reservation is sent or dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, OwnedPermit, error::TrySendError};
use tracing::debug;

use crate::error::QueueError;
use crate::worker::lanes::LaneGuard;
use crate::worker::task::Task;

/// A queued task plus the user lane it holds, if any.
#[derive(Debug)]
pub struct QueuedTask {
    pub task: Task,
    pub lane: Option<LaneGuard>,
}

/// Bounded FIFO of pending tasks.
pub struct JobQueue {
    tx: Mutex<Option<mpsc::Sender<QueuedTask>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<QueuedTask>>,
    capacity: usize,
    pending: Arc<AtomicUsize>,
}

/// A slot in the queue claimed ahead of time.
#[derive(Debug)]
pub struct Reservation {
    permit: Option<OwnedPermit<QueuedTask>>,
    pending: Arc<AtomicUsize>,
}

impl Reservation {
    /// Put `queued` into the reserved slot. Never fails and never waits.
    pub fn send(mut self, queued: QueuedTask) {
        if let Some(permit) = self.permit.take() {
            let task_id = queued.task.id;
            // A closed receiver hands the task back; dropping it frees its lane.
            let _ = permit.send(queued);
            debug!(task_id = %task_id, "Reserved task released into queue");
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.permit.take().is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            capacity: capacity.max(1),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a task without waiting. On error the task and its lane are dropped.
    pub fn enqueue(&self, task: Task, lane: Option<LaneGuard>) -> Result<(), QueueError> {
        let tx = self.sender()?;

        let task_id = task.id;
        // Count before sending so a fast consumer never decrements below zero.
        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        match tx.try_send(QueuedTask { task, lane }) {
            Ok(()) => {
                debug!(task_id = %task_id, pending, "Task enqueued");
                Ok(())
            }
            Err(e) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Err(self.send_error(e))
            }
        }
    }

    /// Claim a slot for a task that will be sent later.
    pub fn reserve(&self) -> Result<Reservation, QueueError> {
        let tx = self.sender()?;

        self.pending.fetch_add(1, Ordering::SeqCst);
        match tx.try_reserve_owned() {
            Ok(permit) => Ok(Reservation {
                permit: Some(permit),
                pending: Arc::clone(&self.pending),
            }),
            Err(e) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Err(self.send_error(e))
            }
        }
    }

    // Cloned out so a rejected task's lane is never dropped under this lock.
    fn sender(&self) -> Result<mpsc::Sender<QueuedTask>, QueueError> {
        self.tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(QueueError::Closed)
    }

    fn send_error<T>(&self, e: TrySendError<T>) -> QueueError {
        match e {
            TrySendError::Full(_) => QueueError::Full {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => QueueError::Closed,
        }
    }

    /// Wait for the next task in FIFO order.
    pub async fn dequeue(&self) -> Option<QueuedTask> {
        let next = self.rx.lock().await.recv().await;
        if next.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        next
    }

    /// Stop accepting tasks. Already queued tasks can still be dequeued.
    pub fn close(&self) {
        let sender = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        if sender.is_some() {
            debug!("Job queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }

    /// Number of tasks waiting to be picked up, reserved slots included.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
