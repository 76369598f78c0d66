use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use tracing::debug;

use crate::error::FlightError;

pub type Callback = Box<dyn FnOnce()>;

/// A pending asynchronous value. Suspending work registers continuations here.
pub trait Thenable {
    fn then(&self, on_fulfilled: Callback, on_rejected: Callback);
}

/// Outcome of one attempt to compute a value.
pub enum Resolution<T> {
    Ready(T),
    Suspended(Rc<dyn Thenable>),
    Failed(FlightError),
}

impl<T> Resolution<T> {
    pub fn suspended(thenable: impl Thenable + 'static) -> Self {
        Self::Suspended(Rc::new(thenable))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Self::Ready(value) => Resolution::Ready(f(value)),
            Self::Suspended(thenable) => Resolution::Suspended(thenable),
            Self::Failed(error) => Resolution::Failed(error),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Resolution<U>) -> Resolution<U> {
        match self {
            Self::Ready(value) => f(value),
            Self::Suspended(thenable) => Resolution::Suspended(thenable),
            Self::Failed(error) => Resolution::Failed(error),
        }
    }
}

impl<T> From<Result<T, FlightError>> for Resolution<T> {
    fn from(result: Result<T, FlightError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Failed(error),
        }
    }
}

impl<T> std::fmt::Debug for Resolution<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Suspended(_) => f.write_str("Suspended"),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PromiseStatus<T> {
    Pending,
    Fulfilled(T),
    Rejected(FlightError),
}

struct PromiseState<T> {
    status: PromiseStatus<T>,
    reactions: Vec<(Callback, Callback)>,
}

/// A single-threaded, settle-once value that components can read and suspend on.
pub struct Promise<T> {
    state: Rc<RefCell<PromiseState<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self { state: Rc::clone(&self.state) }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PromiseState {
                status: PromiseStatus::Pending,
                reactions: Vec::new(),
            })),
        }
    }

    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.settle(PromiseStatus::Fulfilled(value));
        promise
    }

    pub fn rejected(error: FlightError) -> Self {
        let promise = Self::new();
        promise.settle(PromiseStatus::Rejected(error));
        promise
    }

    pub fn resolve(&self, value: T) {
        self.settle(PromiseStatus::Fulfilled(value));
    }

    pub fn reject(&self, error: FlightError) {
        self.settle(PromiseStatus::Rejected(error));
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state.borrow().status, PromiseStatus::Pending)
    }

    fn settle(&self, status: PromiseStatus<T>) {
        let fulfilled = matches!(status, PromiseStatus::Fulfilled(_));
        let reactions = {
            let mut state = self.state.borrow_mut();
            if !matches!(state.status, PromiseStatus::Pending) {
                debug!("Ignoring settlement of an already settled promise");
                return;
            }
            state.status = status;
            std::mem::take(&mut state.reactions)
        };

        for (on_fulfilled, on_rejected) in reactions {
            if fulfilled {
                on_fulfilled();
            } else {
                on_rejected();
            }
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    pub fn status(&self) -> PromiseStatus<T> {
        self.state.borrow().status.clone()
    }

    /// Reads the settled value, or suspends on this promise while it is pending.
    pub fn read(&self) -> Resolution<T> {
        match self.status() {
            PromiseStatus::Fulfilled(value) => Resolution::Ready(value),
            PromiseStatus::Rejected(error) => Resolution::Failed(error),
            PromiseStatus::Pending => Resolution::Suspended(Rc::new(self.clone())),
        }
    }

    /// Settles the promise from a future running on the current `LocalSet`.
    pub fn spawn_local<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, FlightError>> + 'static,
    {
        let promise = Self::new();
        let handle = promise.clone();
        tokio::task::spawn_local(async move {
            match future.await {
                Ok(value) => handle.resolve(value),
                Err(error) => handle.reject(error),
            }
        });
        promise
    }
}

impl<T> Thenable for Promise<T> {
    fn then(&self, on_fulfilled: Callback, on_rejected: Callback) {
        let fulfilled = {
            let mut state = self.state.borrow_mut();
            match state.status {
                PromiseStatus::Pending => {
                    state.reactions.push((on_fulfilled, on_rejected));
                    return;
                }
                PromiseStatus::Fulfilled(_) => true,
                PromiseStatus::Rejected(_) => false,
            }
        };

        if fulfilled {
            on_fulfilled();
        } else {
            on_rejected();
        }
    }
}
