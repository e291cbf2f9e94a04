//! Dispatch layer: turns inbound chat events into queued tasks.
//!
//! Validation and the per-user concurrency policy run synchronously on the
//! caller's task. What the user is told back is returned as a [`Notice`], so a
//! slow messenger never holds up admission of the next event.

pub mod command;

pub use command::{Intent, classify, is_url};

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channels::{InboundEvent, Messenger};
use crate::config::ConcurrencyPolicy;
use crate::error::QueueError;
use crate::messages;
use crate::worker::{Admission, JobQueue, PipelineStats, Task, TaskKind, UserLanes};

/// Why an event was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedFormat,
    QueueFull,
    ShuttingDown,
}

impl Rejection {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => messages::UNSUPPORTED_FORMAT,
            Self::QueueFull => messages::QUEUE_FULL,
            Self::ShuttingDown => messages::SHUTTING_DOWN,
        }
    }
}

/// Result of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A task was queued, or parked behind the user's task in flight.
    Enqueued(Uuid),
    /// The user was told why nothing was queued.
    Rejected(Rejection),
    /// Answered directly (help text).
    Replied,
    Ignored,
}

/// A message owed to the user for an admitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Sent with [`Messenger::deliver_text`].
    Reply { user_id: String, text: &'static str },
    /// Sent with [`Messenger::send_status`].
    Status { user_id: String, text: &'static str },
}

impl Notice {
    pub async fn send(self, messenger: &dyn Messenger) {
        match self {
            Self::Reply { user_id, text } => {
                if let Err(e) = messenger.deliver_text(&user_id, text).await {
                    warn!(user_id = %user_id, "Failed to send reply: {}", e);
                }
            }
            Self::Status { user_id, text } => {
                if let Err(e) = messenger.send_status(&user_id, text).await {
                    debug!(user_id = %user_id, "Acknowledgement not sent: {}", e);
                }
            }
        }
    }
}

/// Validates events and feeds the job queue.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    lanes: Arc<UserLanes>,
    messenger: Arc<dyn Messenger>,
    policy: ConcurrencyPolicy,
    stats: Arc<PipelineStats>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<JobQueue>,
        lanes: Arc<UserLanes>,
        messenger: Arc<dyn Messenger>,
        policy: ConcurrencyPolicy,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            queue,
            lanes,
            messenger,
            policy,
            stats,
        }
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Handle one inbound event and wait until the user has been answered.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        let (outcome, notice) = self.admit(event);
        if let Some(notice) = notice {
            notice.send(self.messenger.as_ref()).await;
        }
        outcome
    }

    /// Handle one inbound event. The answer to the user goes out on its own task.
    pub fn dispatch_detached(&self, event: InboundEvent) -> DispatchOutcome {
        let (outcome, notice) = self.admit(event);
        if let Some(notice) = notice {
            let messenger = Arc::clone(&self.messenger);
            tokio::spawn(async move {
                notice.send(messenger.as_ref()).await;
            });
        }
        outcome
    }

    /// Classify `event` and queue its task. Never waits.
    pub fn admit(&self, event: InboundEvent) -> (DispatchOutcome, Option<Notice>) {
        let user_id = event.user_id.clone();

        let payload = match classify(&event) {
            Intent::Task(payload) => payload,
            Intent::UnsupportedDocument { file_name } => {
                debug!(user_id = %user_id, file_name = %file_name, "Unsupported document");
                return self.reject(user_id, Rejection::UnsupportedFormat);
            }
            Intent::Help => {
                let notice = Notice::Reply {
                    user_id,
                    text: messages::HELP,
                };
                return (DispatchOutcome::Replied, Some(notice));
            }
            Intent::Ignore => return (DispatchOutcome::Ignored, None),
        };

        let task = Task::new(user_id.clone(), payload);
        let task_id = task.id;
        let kind = task.kind();

        let admitted = match self.policy {
            ConcurrencyPolicy::SerializePerUser => self.lanes.submit(&self.queue, task),
            ConcurrencyPolicy::Interleave => {
                self.queue.enqueue(task, None).map(|()| Admission::Queued)
            }
        };

        let admission = match admitted {
            Ok(admission) => admission,
            Err(e) => {
                let rejection = match e {
                    QueueError::Full { .. } => Rejection::QueueFull,
                    QueueError::Closed => Rejection::ShuttingDown,
                };
                warn!(user_id = %user_id, kind = %kind, "Task not queued: {}", e);
                return self.reject(user_id, rejection);
            }
        };

        self.stats.record_enqueued();
        match admission {
            Admission::Queued => {
                info!(task_id = %task_id, user_id = %user_id, kind = %kind, "Task queued");
            }
            Admission::Waiting { position } => {
                info!(
                    task_id = %task_id,
                    user_id = %user_id,
                    kind = %kind,
                    position,
                    "Task waiting behind user's previous task"
                );
            }
        }

        let notice = Notice::Status {
            user_id,
            text: acknowledgement(kind),
        };
        (DispatchOutcome::Enqueued(task_id), Some(notice))
    }

    fn reject(
        &self,
        user_id: String,
        rejection: Rejection,
    ) -> (DispatchOutcome, Option<Notice>) {
        self.stats.record_rejected();
        let notice = Notice::Reply {
            user_id,
            text: rejection.user_message(),
        };
        (DispatchOutcome::Rejected(rejection), Some(notice))
    }
}

fn acknowledgement(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::ResumeIngest => messages::DOCUMENT_ACCEPTED,
        TaskKind::PostingIngest => messages::POSTING_ACCEPTED,
        TaskKind::QuestionAnswer => messages::QUESTION_ACCEPTED,
    }
}
