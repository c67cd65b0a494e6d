//! Serialized job logging.
//!
//! Jobs run concurrently, so they never write log output themselves. Each
//! job holds a [`JobLog`] handle and sends whole lines to one draining task,
//! which re-emits them through `tracing` in the order they arrived.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
}

/// Cloneable sender side of the job log.
#[derive(Debug, Clone)]
pub struct JobLog {
    tx: mpsc::UnboundedSender<LogLine>,
}

impl JobLog {
    /// Create a log handle and spawn the task that drains it.
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (log, rx) = Self::channel();
        (log, tokio::spawn(drain(rx)))
    }

    /// Create a log handle with the receiving end left to the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Level::INFO, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.send(Level::WARN, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Level::ERROR, message.into());
    }

    // Best effort: once the drain is gone there is nowhere to report to.
    fn send(&self, level: Level, message: String) {
        let _ = self.tx.send(LogLine { level, message });
    }
}

async fn drain(mut rx: mpsc::UnboundedReceiver<LogLine>) {
    while let Some(line) = rx.recv().await {
        match line.level {
            Level::ERROR => tracing::error!("{}", line.message),
            Level::WARN => tracing::warn!("{}", line.message),
            _ => tracing::info!("{}", line.message),
        }
    }
}
