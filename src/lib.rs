//! Resume pipeline: chat-driven resume and job-posting analysis.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod fetcher;
pub mod llm;
pub mod messages;
pub mod pipeline;
pub mod store;
pub mod worker;

pub use pipeline::{Pipeline, PipelineDeps};
