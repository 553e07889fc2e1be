pub mod elements;

pub use elements::{
    AttrValue, Component, ComponentElement, ComponentFuture, Element, ErrorProps, Node, Props,
    Rendered, TagElement,
};
