//! Streaming renderer for server component trees.
//!
//! A [`Request`] resolves a [`Model`] into newline-delimited rows. Components that suspend are
//! split into segments with their own row ids and referenced from their parent as `"$<hex id>"`.

pub mod config;
pub mod error;
pub mod rsc;

pub use config::{ConfigError, FlightConfig, Mode};
pub use error::{ErrorPayload, FlightError};
pub use rsc::{
    Element, FlightStream, Model, Promise, Record, Renderable, Request, RequestOptions,
    Resolution, render_to_stream,
};
