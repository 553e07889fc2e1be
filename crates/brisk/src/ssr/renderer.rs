use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::RenderConfig;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::rendering::html::TreeRenderer;
use crate::rendering::streaming::{
    ChannelSink, HtmlStream, MemorySink, OutputSink, RenderStats, StreamController,
};
use crate::types::Node;

/// Entry point for one render: walks the tree, waits for every suspense region
/// and closes the output.
#[derive(Debug, Clone, Default)]
pub struct SsrRenderer {
    config: Arc<RenderConfig>,
}

impl SsrRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub async fn render_into(
        &self,
        root: Node,
        context: RenderContext,
        sink: impl OutputSink,
    ) -> Result<RenderStats, RenderError> {
        let start_time = Instant::now();

        let controller = StreamController::with_upgrade_function(sink, &self.config.upgrade_function);
        let renderer = TreeRenderer::new(controller.clone(), context, Arc::clone(&self.config));

        if let Err(e) = Self::drive(&renderer, &root).await {
            controller.fail(e.clone());
            return Err(e);
        }

        let stats = controller.stats();
        if self.config.debug_timing {
            debug!(
                "HTML stream: {:.2}ms ({} regions, {} chunks, {} bytes)",
                start_time.elapsed().as_secs_f64() * 1000.0,
                stats.regions_flushed,
                stats.chunks_emitted,
                stats.bytes_emitted
            );
        }

        Ok(stats)
    }

    async fn drive(renderer: &TreeRenderer, root: &Node) -> Result<(), RenderError> {
        renderer.render(root, None).await?;
        renderer.controller().await_all_gates().await?;
        renderer.controller().close()
    }

    /// Starts the render on its own task and hands back the receiving end.
    pub fn render_to_stream(&self, root: Node, context: RenderContext) -> HtmlStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let renderer = self.clone();

        tokio::spawn(async move {
            if let Err(e) = renderer.render_into(root, context, ChannelSink::new(sender)).await {
                debug!("Streaming render task ended early: {}", e.code());
            }
        });

        HtmlStream::new(receiver)
    }

    pub async fn render_to_string(
        &self,
        root: Node,
        context: RenderContext,
    ) -> Result<String, RenderError> {
        let sink = MemorySink::new();
        self.render_into(root, context, sink.clone()).await?;
        Ok(sink.contents())
    }
}
