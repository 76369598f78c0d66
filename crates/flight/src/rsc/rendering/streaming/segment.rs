use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::rsc::modules::LoadFn;
use crate::rsc::thenable::{Callback, Resolution};
use crate::rsc::types::Model;
use crate::rsc::wire_format::ChunkId;

use super::request::{RequestInner, ping_segment};

/// How a segment produces its value when it is retried.
#[derive(Clone)]
pub enum SegmentQuery {
    Model(Model),
    Load(LoadFn),
}

impl SegmentQuery {
    pub fn resolve(&self) -> Resolution<Model> {
        match self {
            Self::Model(model) => Resolution::Ready(model.clone()),
            Self::Load(load) => load(),
        }
    }
}

impl fmt::Debug for SegmentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(model) => f.debug_tuple("Model").field(model).finish(),
            Self::Load(_) => f.write_str("Load"),
        }
    }
}

/// A unit of deferred work whose result is written under its own row id.
pub struct Segment {
    id: ChunkId,
    query: RefCell<SegmentQuery>,
    request: Weak<RequestInner>,
    completed: Cell<bool>,
}

impl Segment {
    pub(crate) fn new(id: ChunkId, query: SegmentQuery, request: Weak<RequestInner>) -> Self {
        Self { id, query: RefCell::new(query), request, completed: Cell::new(false) }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Runs the current query. The query is cloned out first so user code never runs while
    /// the segment is borrowed.
    pub(crate) fn resolve(&self) -> Resolution<Model> {
        let query = self.query.borrow().clone();
        query.resolve()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    pub(crate) fn mark_completed(&self) {
        self.completed.set(true);
    }

    /// Records progress so a later retry starts from `model` instead of redoing outer layers.
    pub(crate) fn memoize(&self, model: Model) {
        *self.query.borrow_mut() = SegmentQuery::Model(model);
    }

    pub fn ping(self: &Rc<Self>) {
        if let Some(request) = self.request.upgrade() {
            ping_segment(&request, Rc::clone(self));
        }
    }

    pub(crate) fn ping_callback(self: &Rc<Self>) -> Callback {
        let segment = Rc::clone(self);
        Box::new(move || segment.ping())
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment").field("id", &self.id).field("query", &self.query).finish()
    }
}
