
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::base::{Phase, StreamMessage};


#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Stream closed by receiver")]
    Closed,

    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where exploration results go. Implementations decide how messages reach
/// the client; the engine only needs ordered delivery and a liveness probe.
#[async_trait]
pub trait StreamSink: Send + Sync {

    async fn send(&self, message: StreamMessage) -> Result<(), SinkError>;

    /// `true` once the receiving side is gone and further work is pointless.
    fn is_closed(&self) -> bool {
        false
    }
}


#[async_trait]
impl StreamSink for Arc<dyn StreamSink> {
    async fn send(&self, message: StreamMessage) -> Result<(), SinkError> {
        (**self).send(message).await
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Bounded channel sink; the transport layer owns the receiver.
pub struct ChannelSink {
    tx: mpsc::Sender<StreamMessage>,
}

impl ChannelSink {

    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<StreamMessage>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl StreamSink for ChannelSink {
    async fn send(&self, message: StreamMessage) -> Result<(), SinkError> {
        self.tx.send(message).await.map_err(|_| SinkError::Closed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Writes each message as one line of JSON.
pub struct JsonLinesSink<W> {
    writer: tokio::sync::Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> StreamSink for JsonLinesSink<W> {
    async fn send(&self, message: StreamMessage) -> Result<(), SinkError> {
        let mut line = message.to_json()?;
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests and batch callers that want
/// the whole stream after the fact.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<StreamMessage>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StreamMessage> {
        self.messages.lock().clone()
    }

    pub fn batches(&self, phase: Phase) -> Vec<super::base::GraphBatch> {
        self.messages
            .lock()
            .iter()
            .filter_map(StreamMessage::as_batch)
            .filter(|batch| batch.phase == phase)
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> usize {
        self.messages.lock().iter().filter(|m| m.is_error()).count()
    }
}

#[async_trait]
impl StreamSink for CollectingSink {
    async fn send(&self, message: StreamMessage) -> Result<(), SinkError> {
        debug!("Collected stream message: {:?}", message);
        self.messages.lock().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new(4);
        sink.send(StreamMessage::max_depth_reached()).await.unwrap();
        sink.send(StreamMessage::error("boom")).await.unwrap();

        assert_eq!(rx.recv().await, Some(StreamMessage::max_depth_reached()));
        assert_eq!(rx.recv().await, Some(StreamMessage::error("boom")));
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelSink::new(1);
        assert!(!sink.is_closed());
        drop(rx);
        assert!(sink.is_closed());
        assert!(matches!(
            sink.send(StreamMessage::max_depth_reached()).await,
            Err(SinkError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_json_lines_sink() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.send(StreamMessage::max_depth_reached()).await.unwrap();
        sink.send(StreamMessage::batch(Phase::Upward, vec![], vec![])).await.unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec![
            r#"{"status":"max depth reached"}"#,
            r#"{"phase":"upward","nodes":[],"links":[]}"#,
        ]);
    }

    #[tokio::test]
    async fn test_collecting_sink_through_shared_handle() {
        let collector = Arc::new(CollectingSink::new());
        let shared: Arc<dyn StreamSink> = collector.clone();
        shared.send(StreamMessage::batch(Phase::Downward, vec![], vec![])).await.unwrap();
        shared.send(StreamMessage::error("x")).await.unwrap();

        assert_eq!(collector.messages().len(), 2);
        assert_eq!(collector.batches(Phase::Downward).len(), 1);
        assert!(collector.batches(Phase::Upward).is_empty());
        assert_eq!(collector.errors(), 1);
    }
}
