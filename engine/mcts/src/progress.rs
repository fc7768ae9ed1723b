//! Progress notifications for embedders.
//!
//! A pure side channel: nothing the search decides depends on whether
//! anyone is listening.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// One progress notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Human-readable status line. `done` marks the final one.
    Status { message: String, done: bool },
    /// A piece of oracle output as it streams in.
    Chunk(String),
    /// A rendered snapshot of the tree (see [`crate::graph`]).
    Graph(String),
}

/// Cloneable handle for emitting progress events.
///
/// A disabled handle drops everything, and so does a handle whose receiver
/// has gone away.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl Progress {
    /// Create a handle plus the receiver that will observe its events.
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A handle that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is watching; not an error.
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::Status {
            message: message.into(),
            done: false,
        });
    }

    pub fn done(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::Status {
            message: message.into(),
            done: true,
        });
    }

    pub fn chunk(&self, chunk: impl Into<String>) {
        self.emit(ProgressEvent::Chunk(chunk.into()));
    }

    pub fn graph(&self, graph: impl Into<String>) {
        self.emit(ProgressEvent::Graph(graph.into()));
    }
}
