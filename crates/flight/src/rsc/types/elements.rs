use std::fmt;
use std::rc::Rc;

use crate::rsc::modules::ServerBlock;
use crate::rsc::thenable::Resolution;

use super::{Model, Record};

pub type RenderFn = Rc<dyn Fn(&Record) -> Resolution<Model>>;
pub type ForwardRefRenderFn = Rc<dyn Fn(&Record, Option<&Model>) -> Resolution<Model>>;

#[derive(Clone)]
pub struct Component {
    name: String,
    render: RenderFn,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Record) -> Resolution<Model> + 'static,
    ) -> Self {
        Self { name: name.into(), render: Rc::new(render) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, props: &Record) -> Resolution<Model> {
        (self.render)(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ForwardRef {
    name: String,
    render: ForwardRefRenderFn,
}

impl ForwardRef {
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Record, Option<&Model>) -> Resolution<Model> + 'static,
    ) -> Self {
        Self { name: name.into(), render: Rc::new(render) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server components never receive a ref.
    pub fn render(&self, props: &Record) -> Resolution<Model> {
        (self.render)(props, None)
    }
}

impl fmt::Debug for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardRef").field("name", &self.name).finish_non_exhaustive()
    }
}

/// What an element asks to render.
#[derive(Debug, Clone)]
pub enum Renderable {
    Function(Component),
    Host(String),
    ServerBlock(Rc<ServerBlock>),
    Fragment,
    StrictMode,
    Profiler,
    Scope,
    DebugTracingMode,
    LegacyHidden,
    Offscreen,
    Suspense,
    SuspenseList,
    ForwardRef(ForwardRef),
    Memo(Box<Renderable>),
    Lazy,
    Provider(String),
    Context(String),
}

impl Renderable {
    pub fn component(
        name: impl Into<String>,
        render: impl Fn(&Record) -> Resolution<Model> + 'static,
    ) -> Self {
        Self::Function(Component::new(name, render))
    }

    pub fn forward_ref(
        name: impl Into<String>,
        render: impl Fn(&Record, Option<&Model>) -> Resolution<Model> + 'static,
    ) -> Self {
        Self::ForwardRef(ForwardRef::new(name, render))
    }

    pub fn memo(inner: Renderable) -> Self {
        Self::Memo(Box::new(inner))
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Function(component) => component.name().to_string(),
            Self::Host(tag) => tag.clone(),
            Self::ServerBlock(block) => format!("ServerBlock({})", block.module().id),
            Self::Fragment => "Fragment".to_string(),
            Self::StrictMode => "StrictMode".to_string(),
            Self::Profiler => "Profiler".to_string(),
            Self::Scope => "Scope".to_string(),
            Self::DebugTracingMode => "DebugTracingMode".to_string(),
            Self::LegacyHidden => "LegacyHidden".to_string(),
            Self::Offscreen => "Offscreen".to_string(),
            Self::Suspense => "Suspense".to_string(),
            Self::SuspenseList => "SuspenseList".to_string(),
            Self::ForwardRef(forward_ref) => format!("ForwardRef({})", forward_ref.name()),
            Self::Memo(inner) => format!("Memo({})", inner.display_name()),
            Self::Lazy => "Lazy".to_string(),
            Self::Provider(name) => format!("{name}.Provider"),
            Self::Context(name) => format!("{name}.Consumer"),
        }
    }
}

/// An immutable "render this with these props" description.
#[derive(Debug, Clone)]
pub struct Element {
    pub renderable: Renderable,
    pub key: Option<String>,
    pub props: Record,
}

impl Element {
    pub fn new(renderable: Renderable) -> Self {
        Self { renderable, key: None, props: Record::new() }
    }

    pub fn host(tag: impl Into<String>) -> Self {
        Self::new(Renderable::Host(tag.into()))
    }

    pub fn component(
        name: impl Into<String>,
        render: impl Fn(&Record) -> Resolution<Model> + 'static,
    ) -> Self {
        Self::new(Renderable::component(name, render))
    }

    pub fn fragment(children: impl Into<Model>) -> Self {
        Self::new(Renderable::Fragment).with_children(children)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Model>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn with_props(mut self, props: Record) -> Self {
        self.props = props;
        self
    }

    pub fn with_children(self, children: impl Into<Model>) -> Self {
        self.with_prop("children", children)
    }

    pub fn children(&self) -> Option<&Model> {
        self.props.get("children")
    }
}
