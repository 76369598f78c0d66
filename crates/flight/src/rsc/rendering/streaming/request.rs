use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error};

use crate::config::FlightConfig;
use crate::error::{ErrorPayload, FlightError};
use crate::rsc::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::rsc::hooks::install_dispatcher;
use crate::rsc::modules::{BundlerConfig, ModuleReference};
use crate::rsc::resolver::resolve_element;
use crate::rsc::thenable::{Resolution, Thenable};
use crate::rsc::types::Model;
use crate::rsc::wire_format::{
    Chunk, ChunkId, ChunkIdAllocator, ModelSerializer, SerializationContext,
};

use super::destination::Destination;
use super::scheduler::Scheduler;
use super::segment::{Segment, SegmentQuery};

pub struct RequestOptions {
    pub scheduler: Rc<dyn Scheduler>,
    pub diagnostics: Rc<dyn Diagnostics>,
    pub strict_checks: bool,
}

impl RequestOptions {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self { scheduler, diagnostics: Rc::new(TracingDiagnostics), strict_checks: false }
    }

    pub fn from_config(scheduler: Rc<dyn Scheduler>, config: &FlightConfig) -> Self {
        Self { strict_checks: config.strict_checks, ..Self::new(scheduler) }
    }

    pub fn with_diagnostics(mut self, diagnostics: Rc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_strict_checks(mut self, strict_checks: bool) -> Self {
        self.strict_checks = strict_checks;
        self
    }
}

struct RequestState {
    ids: ChunkIdAllocator,
    pending_chunks: usize,
    pinged_segments: Vec<Rc<Segment>>,
    completed_json_chunks: VecDeque<Chunk>,
    completed_error_chunks: VecDeque<Chunk>,
    flowing: bool,
    closed: bool,
    fatal_error: Option<FlightError>,
}

pub(crate) struct RequestInner {
    destination: RefCell<Box<dyn Destination>>,
    bundler_config: Rc<dyn BundlerConfig>,
    scheduler: Rc<dyn Scheduler>,
    diagnostics: Rc<dyn Diagnostics>,
    strict_checks: bool,
    state: RefCell<RequestState>,
    flushing: Cell<bool>,
}

/// One render of a model into a destination.
///
/// Work runs on the scheduler supplied through [`RequestOptions`]. Rows are written whenever the
/// request is flowing; a destination that reports saturation stops the flow until
/// [`Request::start_flowing`] is called again.
#[derive(Clone)]
pub struct Request {
    inner: Rc<RequestInner>,
}

impl Request {
    pub fn new(
        model: impl Into<Model>,
        destination: impl Destination + 'static,
        bundler_config: Rc<dyn BundlerConfig>,
        options: RequestOptions,
    ) -> Self {
        let inner = Rc::new(RequestInner {
            destination: RefCell::new(Box::new(destination)),
            bundler_config,
            scheduler: options.scheduler,
            diagnostics: options.diagnostics,
            strict_checks: options.strict_checks,
            state: RefCell::new(RequestState {
                ids: ChunkIdAllocator::new(),
                pending_chunks: 1,
                pinged_segments: Vec::new(),
                completed_json_chunks: VecDeque::new(),
                completed_error_chunks: VecDeque::new(),
                flowing: false,
                closed: false,
                fatal_error: None,
            }),
            flushing: Cell::new(false),
        });

        let root = create_segment(&inner, SegmentQuery::Model(model.into()));
        inner.state.borrow_mut().pinged_segments.push(root);

        Self { inner }
    }

    /// Marks the request as flowing and schedules a work pass.
    pub fn start_work(&self) {
        self.inner.state.borrow_mut().flowing = true;
        schedule_work(&self.inner);
    }

    /// Marks the request as flowing and writes whatever is already complete.
    pub fn start_flowing(&self) -> Result<(), FlightError> {
        self.inner.state.borrow_mut().flowing = true;
        flush_completed_chunks(&self.inner)
    }

    /// Runs one work pass on the caller's stack.
    pub fn perform_work(&self) -> Result<(), FlightError> {
        perform_work(&self.inner)
    }

    pub fn pending_chunks(&self) -> usize {
        self.inner.state.borrow().pending_chunks
    }

    pub fn is_flowing(&self) -> bool {
        self.inner.state.borrow().flowing
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().closed
    }

    /// Takes the destination error raised by scheduled work, if any.
    pub fn take_fatal_error(&self) -> Option<FlightError> {
        self.inner.state.borrow_mut().fatal_error.take()
    }
}

fn create_segment(inner: &Rc<RequestInner>, query: SegmentQuery) -> Rc<Segment> {
    let id = inner.state.borrow_mut().ids.allocate();
    debug!("Created segment {}", id);
    Rc::new(Segment::new(id, query, Rc::downgrade(inner)))
}

pub(crate) fn ping_segment(inner: &Rc<RequestInner>, segment: Rc<Segment>) {
    let first = {
        let mut state = inner.state.borrow_mut();
        state.pinged_segments.push(segment);
        state.pinged_segments.len() == 1
    };

    if first {
        schedule_work(inner);
    }
}

fn schedule_work(inner: &Rc<RequestInner>) {
    let request = Rc::clone(inner);
    inner.scheduler.schedule_work(Box::new(move || {
        if let Err(err) = perform_work(&request) {
            error!("Failed to write flight rows: {}", err);
            request.state.borrow_mut().fatal_error = Some(err);
        }
    }));
}

fn perform_work(inner: &Rc<RequestInner>) -> Result<(), FlightError> {
    let _dispatcher = install_dispatcher();

    let pinged = std::mem::take(&mut inner.state.borrow_mut().pinged_segments);
    for segment in pinged {
        retry_segment(inner, &segment);
    }

    let flowing = inner.state.borrow().flowing;
    if flowing { flush_completed_chunks(inner) } else { Ok(()) }
}

fn retry_segment(inner: &Rc<RequestInner>, segment: &Rc<Segment>) {
    if segment.is_completed() {
        debug!("Skipping completed segment {}", segment.id());
        return;
    }

    let mut value = match segment.resolve() {
        Resolution::Ready(value) => value,
        Resolution::Suspended(thenable) => return wait_for(segment, &thenable),
        Resolution::Failed(err) => return fail_segment(inner, segment, &err),
    };

    loop {
        let Model::Element(element) = &value else { break };
        let element = Rc::clone(element);
        segment.memoize(value.clone());

        value = match resolve_element(&element) {
            Resolution::Ready(next) => next,
            Resolution::Suspended(thenable) => return wait_for(segment, &thenable),
            Resolution::Failed(err) => return fail_segment(inner, segment, &err),
        };
    }

    match ModelSerializer::new(inner).serialize(&value) {
        Ok(json) => {
            debug!("Completed segment {}", segment.id());
            segment.mark_completed();
            let chunk = Chunk::model(segment.id(), &json);
            inner.state.borrow_mut().completed_json_chunks.push_back(chunk);
        }
        Err(err) => fail_segment(inner, segment, &err),
    }
}

fn fail_segment(inner: &RequestInner, segment: &Segment, err: &FlightError) {
    segment.mark_completed();
    complete_error(inner, segment.id(), err);
}

fn wait_for(segment: &Rc<Segment>, thenable: &Rc<dyn Thenable>) {
    debug!("Segment {} suspended", segment.id());
    thenable.then(segment.ping_callback(), segment.ping_callback());
}

fn complete_error(inner: &RequestInner, id: ChunkId, err: &FlightError) {
    debug!("Segment {} failed: {}", id, err);
    let chunk = Chunk::error(id, &ErrorPayload::from(err));
    inner.state.borrow_mut().completed_error_chunks.push_back(chunk);
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn flush_completed_chunks(inner: &RequestInner) -> Result<(), FlightError> {
    if inner.flushing.replace(true) {
        return Ok(());
    }
    let _guard = FlushGuard(&inner.flushing);

    if inner.state.borrow().closed {
        return Ok(());
    }

    let mut destination = inner.destination.borrow_mut();
    destination.begin_writing()?;
    let written = drain_queue(inner, &mut **destination, |state| &mut state.completed_json_chunks)
        .and_then(|()| {
            drain_queue(inner, &mut **destination, |state| &mut state.completed_error_chunks)
        });
    let completed = destination.complete_writing();
    written?;
    completed?;

    destination.flush_buffered()?;

    let finished = {
        let mut state = inner.state.borrow_mut();
        let finished = state.pending_chunks == 0;
        state.closed |= finished;
        finished
    };
    if finished {
        debug!("All rows written, closing destination");
        destination.close()?;
    }
    Ok(())
}

/// Writes rows from one queue until it is empty or the destination saturates.
fn drain_queue(
    inner: &RequestInner,
    destination: &mut dyn Destination,
    queue: fn(&mut RequestState) -> &mut VecDeque<Chunk>,
) -> Result<(), FlightError> {
    loop {
        let chunk = {
            let mut state = inner.state.borrow_mut();
            let Some(chunk) = queue(&mut *state).pop_front() else {
                return Ok(());
            };
            state.pending_chunks = state.pending_chunks.saturating_sub(1);
            chunk
        };

        if !destination.write_chunk(&chunk)? {
            inner.state.borrow_mut().flowing = false;
            return Ok(());
        }
    }
}

impl SerializationContext for Rc<RequestInner> {
    fn suspend(&self, query: SegmentQuery, thenable: Rc<dyn Thenable>) -> ChunkId {
        self.state.borrow_mut().pending_chunks += 1;
        let segment = create_segment(self, query);
        wait_for(&segment, &thenable);
        segment.id()
    }

    fn emit_error(&self, error: &FlightError) -> ChunkId {
        let id = {
            let mut state = self.state.borrow_mut();
            state.pending_chunks += 1;
            state.ids.allocate()
        };
        complete_error(self, id, error);
        id
    }

    fn resolve_module_meta_data(&self, reference: &ModuleReference) -> Result<Value, FlightError> {
        self.bundler_config.resolve_module_meta_data(reference)
    }

    fn strict_checks(&self) -> bool {
        self.strict_checks
    }

    fn diagnostics(&self) -> &dyn Diagnostics {
        self.diagnostics.as_ref()
    }
}
