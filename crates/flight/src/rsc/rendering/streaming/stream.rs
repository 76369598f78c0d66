use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error};

use crate::config::FlightConfig;
use crate::error::FlightError;
use crate::rsc::modules::BundlerConfig;
use crate::rsc::types::Model;
use crate::rsc::wire_format::Chunk;

use super::destination::Destination;
use super::request::{Request, RequestOptions};
use super::scheduler::LocalTaskScheduler;

/// State shared by the writing side and the consuming side of a stream.
#[derive(Debug)]
struct StreamShared {
    buffered: AtomicUsize,
    high_water_mark: usize,
    wakeup: Notify,
    consumer_closed: AtomicBool,
    completed: AtomicBool,
}

impl StreamShared {
    fn new(high_water_mark: usize) -> Self {
        Self {
            buffered: AtomicUsize::new(0),
            high_water_mark,
            wakeup: Notify::new(),
            consumer_closed: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        }
    }
}

/// Destination that forwards rows into an unbounded channel and reports saturation once the
/// consumer falls `high_water_mark` rows behind.
#[derive(Debug)]
pub struct ChannelDestination {
    sender: Option<mpsc::UnboundedSender<Bytes>>,
    shared: Arc<StreamShared>,
}

impl Destination for ChannelDestination {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<bool, FlightError> {
        if self.shared.consumer_closed.load(Ordering::Acquire) {
            return Err(FlightError::destination("stream consumer was dropped"));
        }

        let sender =
            self.sender.as_ref().ok_or_else(|| FlightError::destination("stream already closed"))?;

        // Counted before sending so the consumer never decrements a row that was not yet added.
        let buffered = self.shared.buffered.fetch_add(1, Ordering::AcqRel) + 1;
        sender
            .send(chunk.bytes().clone())
            .map_err(|_| FlightError::destination("stream consumer was dropped"))?;

        Ok(buffered < self.shared.high_water_mark)
    }

    fn close(&mut self) -> Result<(), FlightError> {
        self.sender = None;
        self.shared.completed.store(true, Ordering::Release);
        self.shared.wakeup.notify_one();
        Ok(())
    }
}

/// The consuming side of [`render_to_stream`].
pub struct FlightStream {
    receiver: mpsc::UnboundedReceiver<Bytes>,
    shared: Arc<StreamShared>,
}

impl FlightStream {
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        let chunk = self.receiver.recv().await;
        if chunk.is_some() {
            self.mark_consumed();
        }
        chunk
    }

    /// True once every row was received and the render closed its destination.
    pub fn is_complete(&self) -> bool {
        self.shared.completed.load(Ordering::Acquire) && self.receiver.is_empty()
    }

    fn mark_consumed(&self) {
        let remaining = self.shared.buffered.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
        if remaining < self.shared.high_water_mark {
            self.shared.wakeup.notify_one();
        }
    }
}

impl Stream for FlightStream {
    type Item = Result<Bytes, FlightError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                self.mark_consumed();
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for FlightStream {
    fn drop(&mut self) {
        self.shared.consumer_closed.store(true, Ordering::Release);
        self.shared.wakeup.notify_one();
    }
}

/// Renders `model` into a stream of rows.
///
/// Work runs as tasks on the current `LocalSet`, so this must be called from inside one. The
/// driver resumes writing whenever the consumer catches up below the configured high-water
/// mark, and stops once the request closes or the stream is dropped.
pub fn render_to_stream(
    model: impl Into<Model>,
    bundler_config: Rc<dyn BundlerConfig>,
    config: &FlightConfig,
) -> FlightStream {
    let (sender, receiver) = mpsc::unbounded_channel();
    let shared = Arc::new(StreamShared::new(config.stream.high_water_mark));

    let destination = ChannelDestination { sender: Some(sender), shared: Arc::clone(&shared) };
    let options = RequestOptions::from_config(Rc::new(LocalTaskScheduler), config);
    let request = Request::new(model, destination, bundler_config, options);

    let driver = Arc::clone(&shared);
    tokio::task::spawn_local(async move {
        request.start_work();

        loop {
            driver.wakeup.notified().await;

            if request.is_closed() {
                debug!("Flight stream complete");
                break;
            }
            if driver.consumer_closed.load(Ordering::Acquire) {
                debug!("Flight stream consumer dropped, abandoning render");
                break;
            }
            if let Some(err) = request.take_fatal_error() {
                error!("Flight render failed: {}", err);
                break;
            }
            if !request.is_flowing()
                && let Err(err) = request.start_flowing()
            {
                error!("Failed to resume flight stream: {}", err);
                break;
            }
        }
    });

    FlightStream { receiver, shared }
}
