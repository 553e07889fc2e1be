use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::error::RenderError;

/// Single-pass stream of rendered HTML. Ends after the first error.
pub struct HtmlStream {
    receiver: mpsc::UnboundedReceiver<Result<Bytes, RenderError>>,
    bytes_received: usize,
}

impl HtmlStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<Result<Bytes, RenderError>>) -> Self {
        Self { receiver, bytes_received: 0 }
    }

    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, RenderError>> {
        let chunk = self.receiver.recv().await;
        if let Some(Ok(bytes)) = &chunk {
            self.bytes_received += bytes.len();
        }
        chunk
    }

    /// Bytes handed out so far. Zero means a failure can still be replaced by another response.
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    pub fn is_complete(&self) -> bool {
        self.receiver.is_closed() && self.receiver.is_empty()
    }

    pub async fn collect_string(mut self) -> Result<String, RenderError> {
        let mut html = String::new();
        while let Some(chunk) = self.next_chunk().await {
            html.push_str(&String::from_utf8_lossy(&chunk?));
        }
        Ok(html)
    }
}

impl Stream for HtmlStream {
    type Item = Result<Bytes, RenderError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                self.bytes_received += bytes.len();
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Ready(other) => Poll::Ready(other),
            Poll::Pending => Poll::Pending,
        }
    }
}
