use std::rc::Rc;

use crate::error::FlightError;
use crate::rsc::thenable::Resolution;
use crate::rsc::types::{Element, Marker, Model, Renderable};

/// Advances an element by one layer.
///
/// Function components are called, wrapper types pass their children through, and host tags
/// stop resolution as a `["$", tag, key, props]` tuple whose props are serialized normally.
pub fn resolve_element(element: &Element) -> Resolution<Model> {
    match &element.renderable {
        Renderable::Function(component) => component.render(&element.props),
        Renderable::Host(tag) => {
            Resolution::Ready(host_tuple(Model::String(tag.clone()), element))
        }
        Renderable::ServerBlock(block) => {
            Resolution::Ready(host_tuple(Model::ServerBlock(Rc::clone(block)), element))
        }
        Renderable::Fragment
        | Renderable::StrictMode
        | Renderable::Profiler
        | Renderable::Scope
        | Renderable::DebugTracingMode
        | Renderable::LegacyHidden
        | Renderable::Offscreen
        | Renderable::Suspense
        | Renderable::SuspenseList => {
            Resolution::Ready(element.children().cloned().unwrap_or_default())
        }
        Renderable::ForwardRef(forward_ref) => forward_ref.render(&element.props),
        Renderable::Memo(inner) => {
            let unwrapped = Element::new((**inner).clone()).with_props(element.props.clone());
            resolve_element(&unwrapped)
        }
        renderable @ (Renderable::Lazy | Renderable::Provider(_) | Renderable::Context(_)) => {
            Resolution::Failed(FlightError::unsupported_type(renderable.display_name()))
        }
    }
}

fn host_tuple(tag: Model, element: &Element) -> Model {
    Model::Array(vec![
        Model::Marker(Marker::Element),
        tag,
        element.key.clone().map_or(Model::Null, Model::String),
        Model::Record(element.props.clone()),
    ])
}
