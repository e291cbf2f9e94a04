//! Task types submitted to the job queue.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::channels::DocumentRef;
use crate::worker::state::{StateTransition, TaskState};

/// Which handler a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ResumeIngest,
    PostingIngest,
    QuestionAnswer,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ResumeIngest => "resume_ingest",
            Self::PostingIngest => "posting_ingest",
            Self::QuestionAnswer => "question_answer",
        };
        f.write_str(s)
    }
}

/// Kind-specific task data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    ResumeIngest(DocumentRef),
    PostingIngest { url: String },
    QuestionAnswer { question: String },
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::ResumeIngest(_) => TaskKind::ResumeIngest,
            Self::PostingIngest { .. } => TaskKind::PostingIngest,
            Self::QuestionAnswer { .. } => TaskKind::QuestionAnswer,
        }
    }
}

/// A unit of work. Lives only while queued or running.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub user_id: String,
    pub payload: TaskPayload,
    pub created_at: DateTime<Utc>,
    state: TaskState,
    transitions: Vec<StateTransition>,
}

impl Task {
    pub fn new(user_id: impl Into<String>, payload: TaskPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            payload,
            created_at: Utc::now(),
            state: TaskState::Queued,
            transitions: Vec::new(),
        }
    }

    pub fn resume_ingest(user_id: impl Into<String>, document: DocumentRef) -> Self {
        Self::new(user_id, TaskPayload::ResumeIngest(document))
    }

    pub fn posting_ingest(user_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(user_id, TaskPayload::PostingIngest { url: url.into() })
    }

    pub fn question_answer(user_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(
            user_id,
            TaskPayload::QuestionAnswer {
                question: question.into(),
            },
        )
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Move to `target`, recording the transition.
    pub fn transition_to(&mut self, target: TaskState) -> Result<(), String> {
        if !self.state.can_transition_to(target) {
            return Err(format!(
                "Cannot transition task {} from {} to {}",
                self.id, self.state, target
            ));
        }
        self.transitions.push(StateTransition {
            from: self.state,
            to: target,
            timestamp: Utc::now(),
        });
        self.state = target;
        Ok(())
    }
}
