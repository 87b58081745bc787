//! Progress events for one pipeline run.
//!
//! The pipeline emits a [`PipelineEvent`] as it enters each [`Stage`].
//! Consumers implement [`ProgressSink`]: the CLI drives an indicatif bar,
//! a server handler can forward events over a channel with
//! [`ChannelProgressSink`], and library callers that don't care pass
//! [`NoopProgressSink`].
//!
//! # Example
//!
//! ```rust
//! use pdfdeck::{PipelineEvent, ProgressSink, Stage};
//! use std::sync::atomic::{AtomicU8, Ordering};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ProgressSink for LastPercent {
//!     fn on_event(&self, event: &PipelineEvent) {
//!         self.0.store(event.percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let sink = LastPercent(AtomicU8::new(0));
//! sink.on_event(&PipelineEvent::new(Stage::Chunking));
//! assert_eq!(sink.0.load(Ordering::SeqCst), 40);
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Pipeline stage, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Parsing,
    Chunking,
    Summarizing,
    Persisting,
    Complete,
    Failed,
}

impl Stage {
    /// Overall completion when this stage starts.
    pub fn percent(self) -> u8 {
        match self {
            Stage::Fetching => 10,
            Stage::Parsing => 25,
            Stage::Chunking => 40,
            Stage::Summarizing => 60,
            Stage::Persisting => 90,
            Stage::Complete => 100,
            Stage::Failed => 0,
        }
    }

    /// Default status line for this stage.
    pub fn message(self) -> &'static str {
        match self {
            Stage::Fetching => "Downloading PDF...",
            Stage::Parsing => "Processing PDF content...",
            Stage::Chunking => "Splitting document into sections...",
            Stage::Summarizing => "Generating AI summary...",
            Stage::Persisting => "Preparing summary...",
            Stage::Complete => "Summary ready!",
            Stage::Failed => "Processing failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
}

impl PipelineEvent {
    /// Event for `stage` with its default percent and message.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            percent: stage.percent(),
            message: stage.message().to_string(),
        }
    }

    /// Event for `stage` with a custom message.
    pub fn with_message(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: stage.percent(),
            message: message.into(),
        }
    }
}

/// Receives progress events. Must be `Send + Sync`: the server runs many
/// pipelines concurrently.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &PipelineEvent) {
        let _ = event;
    }
}

/// Discards every event.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {}

/// Forwards events into an unbounded Tokio channel. A dropped receiver is
/// not an error; events are simply lost.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_event(&self, event: &PipelineEvent) {
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percents_increase_through_successful_run() {
        let order = [
            Stage::Fetching,
            Stage::Parsing,
            Stage::Chunking,
            Stage::Summarizing,
            Stage::Persisting,
            Stage::Complete,
        ];
        assert!(order.windows(2).all(|w| w[0].percent() < w[1].percent()));
        assert!(Stage::Complete.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Summarizing.is_terminal());
    }

    #[test]
    fn noop_sink_accepts_events() {
        let sink: &dyn ProgressSink = &NoopProgressSink;
        sink.on_event(&PipelineEvent::new(Stage::Fetching));
        sink.on_event(&PipelineEvent::with_message(Stage::Failed, "boom"));
    }

    #[tokio::test]
    async fn channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelProgressSink::new();
        sink.on_event(&PipelineEvent::new(Stage::Parsing));
        sink.on_event(&PipelineEvent::new(Stage::Complete));
        drop(sink);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.stage, Stage::Parsing);
        assert_eq!(first.percent, 25);
        assert_eq!(rx.recv().await.unwrap().message, "Summary ready!");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelProgressSink::new();
        drop(rx);
        sink.on_event(&PipelineEvent::new(Stage::Chunking));
    }

    #[test]
    fn event_serializes_snake_case_stage() {
        let json = serde_json::to_string(&PipelineEvent::new(Stage::Summarizing)).unwrap();
        assert!(json.contains("\"stage\":\"summarizing\""));
        assert!(json.contains("\"percent\":60"));
    }
}
