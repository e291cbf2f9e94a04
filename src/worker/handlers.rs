//! Task handlers, one per task kind.
//!
//! A handler returns the text of the task's single terminal message, or a
//! [`TaskError`] whose `user_message()` is delivered instead. Handlers never
//! talk to the user directly except for non-terminal status notices.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::AnalysisEngine;
use crate::channels::{DocumentRef, Messenger};
use crate::documents::{DocumentFormat, DocumentParser};
use crate::error::TaskError;
use crate::fetcher::{FetchOutcome, PostingFetcher};
use crate::messages;
use crate::store::{SessionKind, SessionStore};
use crate::worker::task::TaskPayload;

/// Shared dependencies for task execution.
#[derive(Clone)]
pub struct WorkerDeps {
    pub store: Arc<dyn SessionStore>,
    pub messenger: Arc<dyn Messenger>,
    pub parser: Arc<dyn DocumentParser>,
    pub fetcher: Arc<dyn PostingFetcher>,
    pub engine: Arc<dyn AnalysisEngine>,
    pub session_ttl: Duration,
    pub fetch_timeout: Duration,
    pub upload_dir: PathBuf,
}

/// Run the handler for `payload`.
pub async fn execute(
    deps: WorkerDeps,
    task_id: Uuid,
    user_id: String,
    payload: TaskPayload,
) -> Result<String, TaskError> {
    match payload {
        TaskPayload::ResumeIngest(document) => {
            ingest_resume(&deps, task_id, &user_id, &document).await
        }
        TaskPayload::PostingIngest { url } => ingest_posting(&deps, task_id, &user_id, &url).await,
        TaskPayload::QuestionAnswer { question } => {
            answer_question(&deps, task_id, &user_id, &question).await
        }
    }
}

/// Download, extract and store a resume.
async fn ingest_resume(
    deps: &WorkerDeps,
    task_id: Uuid,
    user_id: &str,
    document: &DocumentRef,
) -> Result<String, TaskError> {
    if DocumentFormat::from_file_name(&document.file_name).is_none() {
        return Err(TaskError::Validation {
            reason: format!("unsupported file {}", document.file_name),
            user_message: messages::UNSUPPORTED_FORMAT.to_string(),
        });
    }

    let local_path = deps
        .messenger
        .download_document(document, &deps.upload_dir)
        .await
        .map_err(|e| TaskError::Collaborator {
            collaborator: "messenger",
            reason: e.to_string(),
            user_message: messages::DOWNLOAD_FAILED.to_string(),
        })?;

    if let Err(e) = deps.messenger.send_status(user_id, messages::EXTRACTING).await {
        debug!(task_id = %task_id, "Status notice not sent: {}", e);
    }

    let parser = Arc::clone(&deps.parser);
    let path = local_path.clone();
    let extracted = tokio::task::spawn_blocking(move || parser.extract(&path)).await;

    remove_transient(&local_path).await;

    let text = extracted.map_err(|e| TaskError::Collaborator {
        collaborator: "document_parser",
        reason: e.to_string(),
        user_message: messages::RESUME_EMPTY.to_string(),
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(TaskError::Collaborator {
            collaborator: "document_parser",
            reason: format!("no text extracted from {}", document.file_name),
            user_message: messages::RESUME_EMPTY.to_string(),
        });
    }

    deps.store
        .put(SessionKind::Resume, user_id, text, deps.session_ttl)
        .await?;

    info!(task_id = %task_id, user_id, chars = text.chars().count(), "Resume stored");
    Ok(messages::RESUME_SAVED.to_string())
}

/// Fetch and store a job posting; compare right away if a resume is stored.
async fn ingest_posting(
    deps: &WorkerDeps,
    task_id: Uuid,
    user_id: &str,
    url: &str,
) -> Result<String, TaskError> {
    let outcome = tokio::time::timeout(deps.fetch_timeout, deps.fetcher.fetch(url))
        .await
        .map_err(|_| TaskError::Timeout {
            collaborator: "posting_fetcher",
            timeout: deps.fetch_timeout,
            user_message: messages::POSTING_FETCH_FAILED.to_string(),
        })?;

    let job_text = match outcome {
        FetchOutcome::Text(text) => text,
        FetchOutcome::UnsupportedDomain => {
            return Err(TaskError::Validation {
                reason: format!("unsupported posting domain: {url}"),
                user_message: messages::POSTING_UNSUPPORTED_DOMAIN.to_string(),
            });
        }
        FetchOutcome::FetchError(reason) => {
            return Err(TaskError::Collaborator {
                collaborator: "posting_fetcher",
                reason,
                user_message: messages::POSTING_FETCH_FAILED.to_string(),
            });
        }
        FetchOutcome::Empty => {
            return Err(TaskError::Collaborator {
                collaborator: "posting_fetcher",
                reason: format!("no description at {url}"),
                user_message: messages::POSTING_EMPTY.to_string(),
            });
        }
    };

    deps.store
        .put(SessionKind::Job, user_id, &job_text, deps.session_ttl)
        .await?;
    info!(task_id = %task_id, user_id, chars = job_text.chars().count(), "Job posting stored");

    let Some(resume_text) = deps.store.get(SessionKind::Resume, user_id).await? else {
        debug!(task_id = %task_id, user_id, "No resume yet; skipping comparison");
        return Ok(messages::POSTING_SAVED_NO_RESUME.to_string());
    };

    let report = deps
        .engine
        .compare_resume_to_job(&resume_text, &job_text)
        .await
        .map_err(|e| TaskError::Collaborator {
            collaborator: "analysis_engine",
            reason: e.to_string(),
            user_message: messages::ANALYSIS_FAILED.to_string(),
        })?;

    Ok(format!("{}\n\n{report}", messages::ANALYSIS_HEADER))
}

/// Answer a free-text question about the stored resume.
async fn answer_question(
    deps: &WorkerDeps,
    task_id: Uuid,
    user_id: &str,
    question: &str,
) -> Result<String, TaskError> {
    let resume_text = deps
        .store
        .get(SessionKind::Resume, user_id)
        .await?
        .ok_or_else(|| TaskError::Precondition {
            reason: format!("no resume stored for user {user_id}"),
            user_message: messages::UPLOAD_RESUME_FIRST.to_string(),
        })?;

    let job_text = deps.store.get(SessionKind::Job, user_id).await?;

    let answer = deps
        .engine
        .answer_question(&resume_text, job_text.as_deref().unwrap_or(""), question)
        .await
        .map_err(|e| TaskError::Collaborator {
            collaborator: "analysis_engine",
            reason: e.to_string(),
            user_message: messages::ANSWER_FAILED.to_string(),
        })?;

    debug!(task_id = %task_id, user_id, has_posting = job_text.is_some(), "Question answered");

    Ok(match job_text {
        Some(_) => answer,
        None => format!("{}\n\n{answer}", messages::NO_POSTING_CAVEAT),
    })
}

/// Delete a downloaded document. Failures are logged, never surfaced.
async fn remove_transient(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), "Failed to delete transient document: {}", e);
    }
}
