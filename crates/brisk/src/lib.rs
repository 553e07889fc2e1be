pub mod config;
pub mod context;
pub mod error;
pub mod rendering;
pub mod ssr;
pub mod types;

pub use config::RenderConfig;
pub use context::{RenderContext, RequestInfo};
pub use error::{ComponentError, ConfigError, RenderError};
pub use rendering::streaming::{ChannelSink, MemorySink};
pub use rendering::{HtmlStream, OutputSink, RegionId, RenderStats, StreamController, TreeRenderer};
pub use ssr::SsrRenderer;
pub use types::{
    AttrValue, Component, ComponentElement, Element, ErrorProps, Node, Props, Rendered, TagElement,
};
