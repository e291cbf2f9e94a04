//! CLI messenger: stdin/stdout REPL for local testing.
//!
//! Plain lines are text events. `/upload <path>` submits a local file as a
//! document event.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::messenger::local_file_name;
use crate::channels::{DocumentRef, EventStream, InboundEvent, Messenger};
use crate::error::ChannelError;

/// User id reported for every CLI event.
pub const CLI_USER_ID: &str = "local-user";

/// A simple messenger that reads from stdin and writes to stdout.
#[derive(Debug, Default)]
pub struct CliMessenger;

impl CliMessenger {
    pub fn new() -> Self {
        Self
    }
}

/// Parse one input line into an event.
fn parse_line(line: &str) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(path) = line.strip_prefix("/upload ") {
        let path = path.trim();
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        return Some(InboundEvent::document(
            CLI_USER_ID,
            DocumentRef::new(path, file_name),
        ));
    }

    Some(InboundEvent::text(CLI_USER_ID, line))
}

#[async_trait]
impl Messenger for CliMessenger {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(event) = parse_line(&line) else {
                            eprint!("> ");
                            continue;
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn deliver_text(&self, _user_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n{text}\n");
        eprint!("> ");
        Ok(())
    }

    async fn send_status(&self, _user_id: &str, text: &str) -> Result<(), ChannelError> {
        eprintln!("{text}");
        Ok(())
    }

    async fn download_document(
        &self,
        document: &DocumentRef,
        dest_dir: &Path,
    ) -> Result<PathBuf, ChannelError> {
        let download_failed = |e: std::io::Error| ChannelError::DownloadFailed {
            name: "cli".into(),
            file_ref: document.file_ref.clone(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(download_failed)?;
        let local_path = dest_dir.join(local_file_name(document));
        tokio::fs::copy(&document.file_ref, &local_path)
            .await
            .map_err(download_failed)?;
        Ok(local_path)
    }
}
