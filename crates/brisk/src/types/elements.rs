use futures::future::BoxFuture;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::error::ComponentError;

pub type ComponentFuture = BoxFuture<'static, Result<Node, ComponentError>>;

pub type RenderFn =
    Arc<dyn Fn(&Props, &RenderContext) -> Result<Rendered, ComponentError> + Send + Sync>;

pub type ErrorFn =
    Arc<dyn Fn(&ErrorProps, &RenderContext) -> Result<Rendered, ComponentError> + Send + Sync>;

pub type ReactiveFn = Arc<dyn Fn() -> AttrValue + Send + Sync>;

/// What a component callable produced.
pub enum Rendered {
    Ready(Node),
    Pending(ComponentFuture),
}

impl Rendered {
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Node, ComponentError>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }
}

impl fmt::Debug for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(node) => f.debug_tuple("Ready").field(node).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(String),
    Fragment(Vec<Node>),
    Element(Element),
}

#[derive(Debug, Clone)]
pub enum Element {
    Tag(TagElement),
    Component(ComponentElement),
}

#[derive(Clone)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Reactive(ReactiveFn),
    Handler,
}

impl AttrValue {
    pub fn reactive<F>(f: F) -> Self
    where
        F: Fn() -> AttrValue + Send + Sync + 'static,
    {
        Self::Reactive(Arc::new(f))
    }

    /// Server-side value: a reactive attribute is evaluated exactly once. A reactive
    /// value returned from that call is not evaluated again and stays `Reactive`.
    pub fn resolve(&self) -> AttrValue {
        match self {
            Self::Reactive(f) => f(),
            other => other.clone(),
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Reactive(_) => f.write_str("Reactive(..)"),
            Self::Handler => f.write_str("Handler"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TagElement {
    pub name: String,
    pub attributes: Vec<(String, AttrValue)>,
    pub children: Vec<Node>,
}

impl TagElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Props {
    pub values: Map<String, JsonValue>,
    pub children: Vec<Node>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.add_prop(name, value);
        self
    }

    pub fn with_children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn add_prop(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get_prop(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(JsonValue::as_str)
    }

    /// Children as a single node, ready to be returned from a component.
    pub fn children_node(&self) -> Node {
        Node::Fragment(self.children.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ErrorProps {
    pub error: ComponentError,
    pub props: Props,
}

#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    render: RenderFn,
    error: Option<ErrorFn>,
    fallback: Option<Arc<Node>>,
}

impl Component {
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Props, &RenderContext) -> Result<Rendered, ComponentError> + Send + Sync + 'static,
    {
        Self { name: Arc::from(name), render: Arc::new(render), error: None, fallback: None }
    }

    pub fn sync<F, N>(name: &str, render: F) -> Self
    where
        F: Fn(&Props, &RenderContext) -> Result<N, ComponentError> + Send + Sync + 'static,
        N: Into<Node>,
    {
        Self::new(name, move |props, ctx| render(props, ctx).map(|node| Rendered::Ready(node.into())))
    }

    pub fn future<F, Fut, N>(name: &str, render: F) -> Self
    where
        F: Fn(&Props, &RenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<N, ComponentError>> + Send + 'static,
        N: Into<Node>,
    {
        Self::new(name, move |props, ctx| {
            let future = render(props, ctx);
            Ok(Rendered::pending(async move { future.await.map(Into::into) }))
        })
    }

    pub fn with_error<F>(mut self, error: F) -> Self
    where
        F: Fn(&ErrorProps, &RenderContext) -> Result<Rendered, ComponentError>
            + Send
            + Sync
            + 'static,
    {
        self.error = Some(Arc::new(error));
        self
    }

    pub fn with_error_view<F, N>(self, error: F) -> Self
    where
        F: Fn(&ErrorProps, &RenderContext) -> N + Send + Sync + 'static,
        N: Into<Node>,
    {
        self.with_error(move |props, ctx| Ok(Rendered::Ready(error(props, ctx).into())))
    }

    pub fn with_suspense(mut self, fallback: impl Into<Node>) -> Self {
        self.fallback = Some(Arc::new(fallback.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fallback(&self) -> Option<&Node> {
        self.fallback.as_deref()
    }

    pub fn has_error_view(&self) -> bool {
        self.error.is_some()
    }

    pub fn invoke(&self, props: &Props, context: &RenderContext) -> Result<Rendered, ComponentError> {
        (self.render)(props, context)
    }

    /// Runs the error capability, if any. `None` means the failure is not recoverable here.
    pub fn invoke_error(
        &self,
        props: &ErrorProps,
        context: &RenderContext,
    ) -> Option<Result<Rendered, ComponentError>> {
        self.error.as_ref().map(|error| error(props, context))
    }

    pub fn element(&self, props: Props) -> Element {
        Element::Component(ComponentElement { component: self.clone(), props })
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("has_error_view", &self.error.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ComponentElement {
    pub component: Component,
    pub props: Props,
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

impl From<TagElement> for Node {
    fn from(value: TagElement) -> Self {
        Self::Element(Element::Tag(value))
    }
}

impl From<ComponentElement> for Node {
    fn from(value: ComponentElement) -> Self {
        Self::Element(Element::Component(value))
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Self::Fragment(value)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
