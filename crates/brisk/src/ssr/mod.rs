pub mod renderer;

pub use renderer::SsrRenderer;
