//! Classify inbound events into commands or task payloads.

use std::sync::LazyLock;

use regex::Regex;

use crate::channels::{EventKind, InboundEvent};
use crate::documents::DocumentFormat;
use crate::worker::TaskPayload;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("valid URL regex"));

/// What an inbound event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Work for the queue.
    Task(TaskPayload),
    /// A document with an extension we cannot parse.
    UnsupportedDocument { file_name: String },
    /// `/start` or `/help`.
    Help,
    /// Nothing to do (blank text).
    Ignore,
}

/// Parse an inbound event.
pub fn classify(event: &InboundEvent) -> Intent {
    match &event.kind {
        EventKind::Document(document) => {
            if DocumentFormat::from_file_name(&document.file_name).is_some() {
                Intent::Task(TaskPayload::ResumeIngest(document.clone()))
            } else {
                Intent::UnsupportedDocument {
                    file_name: document.file_name.clone(),
                }
            }
        }
        EventKind::Text(text) => classify_text(text),
    }
}

fn classify_text(text: &str) -> Intent {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Intent::Ignore;
    }

    let command = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .split('@')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match command.as_str() {
        "/start" | "/help" => return Intent::Help,
        _ => {}
    }

    if is_url(trimmed) {
        Intent::Task(TaskPayload::PostingIngest {
            url: trimmed.to_string(),
        })
    } else {
        Intent::Task(TaskPayload::QuestionAnswer {
            question: trimmed.to_string(),
        })
    }
}

/// Whether `text` is a bare http(s) URL.
pub fn is_url(text: &str) -> bool {
    URL_PATTERN.is_match(text.trim())
}
