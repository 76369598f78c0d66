//! Hooks available to server components.
//!
//! A dispatcher is installed on the current thread while a request performs work. Hooks that
//! only make sense with client state fail with [`FlightError::UnsupportedHook`]; any hook called
//! outside of rendering fails with [`FlightError::InvalidHookCall`].

use std::cell::Cell;
use std::fmt::Debug;

use crate::error::FlightError;

thread_local! {
    static DISPATCHER_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Restores the previous dispatcher when dropped.
#[must_use]
pub(crate) struct DispatcherScope {
    previous: bool,
}

pub(crate) fn install_dispatcher() -> DispatcherScope {
    let previous = DISPATCHER_ACTIVE.with(|active| active.replace(true));
    DispatcherScope { previous }
}

impl Drop for DispatcherScope {
    fn drop(&mut self) {
        DISPATCHER_ACTIVE.with(|active| active.set(self.previous));
    }
}

fn resolve_dispatcher() -> Result<(), FlightError> {
    if DISPATCHER_ACTIVE.with(Cell::get) { Ok(()) } else { Err(FlightError::InvalidHookCall) }
}

fn unsupported<T>(hook: &'static str) -> Result<T, FlightError> {
    resolve_dispatcher()?;
    Err(FlightError::UnsupportedHook(hook))
}

pub fn use_memo<T>(create: impl FnOnce() -> T) -> Result<T, FlightError> {
    resolve_dispatcher()?;
    Ok(create())
}

pub fn use_callback<F>(callback: F) -> Result<F, FlightError> {
    resolve_dispatcher()?;
    Ok(callback)
}

pub fn use_deferred_value<T>(value: T) -> Result<T, FlightError> {
    resolve_dispatcher()?;
    Ok(value)
}

pub fn use_debug_value<T: Debug>(_value: &T) -> Result<(), FlightError> {
    resolve_dispatcher()
}

/// Transitions never start on the server.
#[derive(Debug, Clone, Copy)]
pub struct StartTransition;

impl StartTransition {
    pub fn start(&self, _callback: impl FnOnce()) {}
}

pub fn use_transition() -> Result<(StartTransition, bool), FlightError> {
    resolve_dispatcher()?;
    Ok((StartTransition, false))
}

pub fn use_state<S>(_initial: S) -> Result<S, FlightError> {
    unsupported("useState")
}

pub fn use_reducer<S>(_initial: S) -> Result<S, FlightError> {
    unsupported("useReducer")
}

pub fn use_ref<T>(_initial: T) -> Result<T, FlightError> {
    unsupported("useRef")
}

pub fn use_context<T>(_context: &str) -> Result<T, FlightError> {
    unsupported("useContext")
}

pub fn use_effect(_effect: impl FnOnce()) -> Result<(), FlightError> {
    unsupported("useEffect")
}

pub fn use_layout_effect(_effect: impl FnOnce()) -> Result<(), FlightError> {
    unsupported("useLayoutEffect")
}

pub fn use_imperative_handle(_create: impl FnOnce()) -> Result<(), FlightError> {
    unsupported("useImperativeHandle")
}
