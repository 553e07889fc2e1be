use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

use crate::error::RenderError;

/// Destination of the rendered markup, owned by the caller of the renderer.
pub trait OutputSink: Send + 'static {
    fn enqueue(&mut self, chunk: String);

    fn close(&mut self);

    fn error(&mut self, error: RenderError);
}

/// Feeds an [`HtmlStream`](super::stream::HtmlStream).
pub struct ChannelSink {
    sender: Option<mpsc::UnboundedSender<Result<Bytes, RenderError>>>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<Result<Bytes, RenderError>>) -> Self {
        Self { sender: Some(sender) }
    }
}

impl OutputSink for ChannelSink {
    fn enqueue(&mut self, chunk: String) {
        if let Some(sender) = &self.sender
            && sender.send(Ok(Bytes::from(chunk))).is_err()
        {
            error!("HTML stream receiver dropped, discarding remaining chunks");
            self.sender = None;
        }
    }

    fn close(&mut self) {
        self.sender = None;
    }

    fn error(&mut self, error: RenderError) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Err(error));
        }
    }
}

#[derive(Debug, Default)]
struct MemorySinkState {
    chunks: Vec<String>,
    closed: bool,
    error: Option<RenderError>,
}

/// Keeps every chunk in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<String> {
        self.state.lock().chunks.clone()
    }

    pub fn contents(&self) -> String {
        self.state.lock().chunks.concat()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn failure(&self) -> Option<RenderError> {
        self.state.lock().error.clone()
    }
}

impl OutputSink for MemorySink {
    fn enqueue(&mut self, chunk: String) {
        self.state.lock().chunks.push(chunk);
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }

    fn error(&mut self, error: RenderError) {
        self.state.lock().error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shares_log() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();

        writer.enqueue("<p>".to_string());
        writer.enqueue("hi".to_string());
        writer.enqueue("</p>".to_string());
        writer.close();

        assert_eq!(sink.chunks(), vec!["<p>", "hi", "</p>"]);
        assert_eq!(sink.contents(), "<p>hi</p>");
        assert!(sink.is_closed());
        assert!(sink.failure().is_none());
    }

    #[tokio::test]
    async fn test_channel_sink_stops_after_error() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(sender);

        sink.enqueue("<main>".to_string());
        sink.error(RenderError::StreamClosed);
        sink.enqueue("ignored".to_string());

        assert_eq!(receiver.recv().await, Some(Ok(Bytes::from("<main>"))));
        assert_eq!(receiver.recv().await, Some(Err(RenderError::StreamClosed)));
        assert_eq!(receiver.recv().await, None);
    }
}
