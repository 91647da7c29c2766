//! Waypoint
//!
//! A redirect-resolving, cache-revalidating HTTP request engine.
//!
//! Waypoint sits above a raw transport (connection establishment, TLS, wire
//! framing are someone else's problem) and adds the behaviors a transport
//! does not provide:
//!
//! 1. Redirect chains are resolved, distinguishing temporary (302) from
//!    permanent (301) redirects. Permanent redirects are remembered in a
//!    shared [`RedirectTable`][client::RedirectTable], so future requests to
//!    the same URL skip the round trip entirely.
//! 2. Conditional GET caching with `Last-Modified` / `If-Modified-Since`
//!    semantics: a `304 Not Modified` is short-circuited to the previously
//!    stored body in the shared [`CacheStore`][client::CacheStore].
//! 3. Cyclic redirects are detected and reported with the full chain, and
//!    relative `Location` targets are resolved against the current URL.
//!
//! The transport is any `tower::Service` from `http::Request<Body>` to
//! `http::Response<Body>`; see [`client::conn::Transport`]. An in-memory,
//! scriptable transport is provided in [`client::conn::mock`] for tests,
//! behind the `mocks` feature (enabled by default).
//!
//! # Example
//! ```no_run
//! # use waypoint::client::conn::mock::MockTransport;
//! # async fn run() -> Result<(), waypoint::Error> {
//! let client = waypoint::Client::new(MockTransport::new());
//! let response = client.get("http://example.com/".parse().unwrap()).await?;
//! println!("{} ({} redirects)", response.code(), response.redirects().len());
//! # Ok(())
//! # }
//! ```

pub mod body;
pub use body::Body;
pub mod client;
pub use client::{Client, Error, Response};

/// A boxed error type, used where error types are erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
