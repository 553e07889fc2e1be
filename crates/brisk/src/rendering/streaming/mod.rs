pub mod constants;
pub mod controller;
pub mod gate;
pub mod region;
pub mod sink;
pub mod stream;
pub mod tag_stack;
#[cfg(test)]
mod tests;
pub mod types;

pub use controller::StreamController;
pub use sink::{ChannelSink, MemorySink, OutputSink};
pub use stream::HtmlStream;
pub use types::*;
