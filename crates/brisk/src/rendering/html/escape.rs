use cow_utils::CowUtils;
use std::fmt::Write;

use crate::types::AttrValue;

pub fn escape_html(text: &str) -> String {
    text.cow_replace('&', "&amp;").cow_replace('<', "&lt;").cow_replace('>', "&gt;").into_owned()
}

pub fn escape_attribute(text: &str) -> String {
    text.cow_replace('&', "&amp;")
        .cow_replace('"', "&quot;")
        .cow_replace('<', "&lt;")
        .cow_replace('>', "&gt;")
        .into_owned()
}

/// Serializes attributes in insertion order, each with a leading space.
pub fn render_attributes(attributes: &[(String, AttrValue)]) -> String {
    let mut html = String::new();

    for (name, value) in attributes {
        match value.resolve() {
            AttrValue::Text(text) => {
                let _ = write!(html, " {}=\"{}\"", name, escape_attribute(&text));
            }
            AttrValue::Bool(true) => {
                html.push(' ');
                html.push_str(name);
            }
            AttrValue::Bool(false) | AttrValue::Reactive(_) | AttrValue::Handler => {}
        }
    }

    html
}
