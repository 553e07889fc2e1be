use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::context::RenderContext;
use crate::error::{ComponentError, RenderError};
use crate::rendering::streaming::constants::FALLBACK_CONTAINER_TAG;
use crate::rendering::streaming::gate::with_timeout;
use crate::rendering::streaming::{RegionId, StreamController};
use crate::types::{ComponentElement, ComponentFuture, Element, ErrorProps, Node, Rendered, TagElement};

pub mod escape;


pub use escape::{escape_attribute, escape_html, render_attributes};

type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RenderError>> + Send + 'a>>;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Walks a node tree and issues writes to a [`StreamController`].
///
/// A component with a suspense fallback whose callable returns a pending result
/// gets its own region: the fallback is written in place and the primary content
/// is rendered into the region once the component settles.
#[derive(Clone)]
pub struct TreeRenderer {
    controller: StreamController,
    context: RenderContext,
    config: Arc<RenderConfig>,
}

impl TreeRenderer {
    pub fn new(controller: StreamController, context: RenderContext, config: Arc<RenderConfig>) -> Self {
        Self { controller, context, config }
    }

    pub fn controller(&self) -> &StreamController {
        &self.controller
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Renders `node` into `region`, or straight into the stream for `None`.
    pub fn render<'a>(&'a self, node: &'a Node, region: Option<RegionId>) -> RenderFuture<'a> {
        Box::pin(async move {
            match node {
                Node::Empty => Ok(()),
                Node::Text(text) if text.is_empty() => Ok(()),
                Node::Text(text) => self.controller.write(&escape_html(text), region),
                Node::Fragment(children) => {
                    for child in children {
                        self.render(child, region).await?;
                    }
                    Ok(())
                }
                Node::Element(Element::Tag(tag)) => self.render_tag(tag, region).await,
                Node::Element(Element::Component(element)) => {
                    self.render_component(element, region).await
                }
            }
        })
    }

    async fn render_tag(&self, tag: &TagElement, region: Option<RegionId>) -> Result<(), RenderError> {
        let attributes = render_attributes(&tag.attributes);

        if is_void_element(&tag.name) {
            if !tag.children.is_empty() {
                warn!("Ignoring {} children of void element <{}>", tag.children.len(), tag.name);
            }
            return self.controller.write(&format!("<{}{}>", tag.name, attributes), region);
        }

        self.controller.open_tag(&tag.name, &attributes, region)?;
        for child in &tag.children {
            self.render(child, region).await?;
        }
        self.controller.close_tag(&tag.name, region)
    }

    async fn render_component(
        &self,
        element: &ComponentElement,
        region: Option<RegionId>,
    ) -> Result<(), RenderError> {
        let component = &element.component;

        let node = match component.invoke(&element.props, &self.context) {
            Ok(Rendered::Ready(node)) => node,
            Ok(Rendered::Pending(pending)) => match component.fallback() {
                Some(fallback) => {
                    return self.render_suspense(element, fallback, pending, region).await;
                }
                None => self.settle(element, pending.await).await?,
            },
            Err(e) => self.recover(element, e).await?,
        };

        self.render(&node, region).await
    }

    async fn render_suspense(
        &self,
        element: &ComponentElement,
        fallback: &Node,
        pending: ComponentFuture,
        region: Option<RegionId>,
    ) -> Result<(), RenderError> {
        let id = self.controller.allocate_region();
        debug!(region = %id, component = element.component.name(), "rendering suspense fallback");

        let attributes = format!(" id=\"{}\"", id.fallback_id());
        self.controller.open_tag(FALLBACK_CONTAINER_TAG, &attributes, region)?;
        self.render(fallback, region).await?;
        self.controller.close_tag(FALLBACK_CONTAINER_TAG, region)?;

        let renderer = self.clone();
        let element = element.clone();
        let primary = async move {
            let node = renderer.settle(&element, pending.await).await?;
            renderer.render(&node, Some(id)).await
        };

        self.register_primary(id, primary)
    }

    fn register_primary<F>(&self, id: RegionId, primary: F) -> Result<(), RenderError>
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        match (self.config.region_timeout(), self.config.eager_regions) {
            (Some(limit), true) => self.controller.spawn_gate(id, with_timeout(id, limit, primary)),
            (Some(limit), false) => self.controller.register_gate(id, with_timeout(id, limit, primary)),
            (None, true) => self.controller.spawn_gate(id, primary),
            (None, false) => self.controller.register_gate(id, primary),
        }
    }

    async fn settle(
        &self,
        element: &ComponentElement,
        result: Result<Node, ComponentError>,
    ) -> Result<Node, RenderError> {
        match result {
            Ok(node) => Ok(node),
            Err(e) => self.recover(element, e).await,
        }
    }

    /// Replaces a failed component with its own error view, when it has one.
    async fn recover(&self, element: &ComponentElement, error: ComponentError) -> Result<Node, RenderError> {
        let component = &element.component;
        let props = ErrorProps { error: error.clone(), props: element.props.clone() };

        let Some(result) = component.invoke_error(&props, &self.context) else {
            return Err(RenderError::component(component.name(), error));
        };

        warn!("Component {} failed, rendering its error view: {}", component.name(), error);

        let failed = |e: ComponentError| RenderError::component(component.name(), e);
        match result.map_err(failed)? {
            Rendered::Ready(node) => Ok(node),
            Rendered::Pending(pending) => pending.await.map_err(failed),
        }
    }
}
