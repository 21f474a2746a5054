//! A session-aware client for the beehive monitoring API.
//!
//! Every call to the backend goes through [`ApiClient::request()`], which
//! attaches the bearer token of the current [`Session`] (if any), decodes
//! the response and turns non-2xx statuses into an [`ApiError`]. The
//! [`endpoints`] module wraps the individual backend operations.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod client;
pub mod config;
pub mod endpoints;
mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{
    merge_headers, ApiClient, ApiError, Payload, RequestOptions,
};
pub use config::{Config, ConfigError};
pub use session::{Session, User};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, SessionStore, StoreError,
};

/// The default user agent to use when communicating with the backend.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
