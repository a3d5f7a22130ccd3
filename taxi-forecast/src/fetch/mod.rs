//! Resilient HTTP fetching.
//!
//! Every upstream request goes through [`FetchClient`], which applies a
//! per-attempt timeout and retries transient failures with capped
//! exponential backoff. The network itself sits behind the [`Transport`]
//! trait so tests can script responses without a server.

mod client;
mod error;
mod transport;

pub use client::{FetchClient, FetchRequest, RetryPolicy};
pub use error::FetchError;
pub use transport::{HttpTransport, HttpTransportConfig, Transport};

#[cfg(test)]
pub(crate) use client::testing;
