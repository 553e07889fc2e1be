pub mod html;
pub mod streaming;

pub use html::TreeRenderer;
pub use streaming::{HtmlStream, OutputSink, RegionId, RenderStats, StreamController};
