//! `Messenger` trait and inbound event types.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// A document attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Transport-specific handle used to download the file.
    pub file_ref: String,
    /// Original file name as sent by the user.
    pub file_name: String,
}

impl DocumentRef {
    pub fn new(file_ref: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_ref: file_ref.into(),
            file_name: file_name.into(),
        }
    }
}

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Document(DocumentRef),
    Text(String),
}

/// A message received from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: String,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn document(user_id: impl Into<String>, document: DocumentRef) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Document(document),
        }
    }
}

/// Stream of inbound events from a messenger.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Chat transport.
///
/// `deliver_text` carries terminal task results; `send_status` carries
/// progress notices that never count as a task's result.
#[async_trait]
pub trait Messenger: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Deliver a message to the user.
    async fn deliver_text(&self, user_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Send a non-terminal progress notice. Failures are ignored by callers.
    async fn send_status(&self, user_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Download a document into `dest_dir`, returning the local path.
    async fn download_document(
        &self,
        document: &DocumentRef,
        dest_dir: &Path,
    ) -> Result<PathBuf, ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Build a collision-free local file name for a downloaded document.
pub fn local_file_name(document: &DocumentRef) -> String {
    let base = Path::new(&document.file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("document");
    format!("{}_{base}", uuid::Uuid::new_v4().simple())
}
