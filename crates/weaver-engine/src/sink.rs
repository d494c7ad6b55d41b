//! Where capture messages go once the recorder has produced them.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use weaver_common::protocol::CaptureMessage;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Capture channel closed")]
    Closed,
}

#[async_trait]
pub trait CaptureSink: Send + Sync {
    async fn emit(&mut self, message: CaptureMessage) -> Result<(), SinkError>;
}

/// Forwards messages over a tokio channel to whoever hosts the session.
pub struct ChannelSink {
    tx: mpsc::Sender<CaptureMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<CaptureMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl CaptureSink for ChannelSink {
    async fn emit(&mut self, message: CaptureMessage) -> Result<(), SinkError> {
        self.tx.send(message).await.map_err(|_| SinkError::Closed)
    }
}

/// Appends one JSON document per line to a session log file.
pub struct JsonlWriter {
    file: tokio::fs::File,
}

impl JsonlWriter {
    pub async fn create(path: &Path) -> Result<Self, SinkError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl CaptureSink for JsonlWriter {
    async fn emit(&mut self, message: CaptureMessage) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        self.file.write_all(&line).await?;
        Ok(())
    }
}
