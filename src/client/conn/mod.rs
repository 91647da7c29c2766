//! The transport seam consumed by the request engine.
//!
//! A transport owns everything below the request/response contract:
//! resolving addresses, opening sockets, TLS, and HTTP wire framing. The
//! engine only asks it to turn one `http::Request<Body>` into one
//! `http::Response<Body>` whose body may still be streaming.

use thiserror::Error;

use crate::{Body, BoxError};

#[cfg(feature = "mocks")]
pub mod mock;

/// A transport capable of performing a single HTTP exchange.
///
/// Any `tower::Service` with the right request, response and error types
/// qualifies; the engine clones the service and drives it to completion once
/// per hop. Transport failures are surfaced to the caller unchanged and are
/// never retried by the engine.
pub trait Transport:
    tower::Service<http::Request<Body>, Response = http::Response<Body>, Error = TransportError>
    + Clone
{
}

impl<T> Transport for T where
    T: tower::Service<http::Request<Body>, Response = http::Response<Body>, Error = TransportError>
        + Clone
{
}

/// Failure reported by a transport while performing an exchange.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The host could not be resolved.
    #[error("dns: {0}")]
    Dns(#[source] BoxError),

    /// The URL scheme is not supported by the transport.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The connection could not be established or failed mid-exchange.
    #[error("connection: {0}")]
    Connection(#[source] BoxError),
}

#[cfg(test)]
mod tests {

    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(TransportError: std::error::Error, Send, Sync);
    #[cfg(feature = "mocks")]
    assert_impl_all!(mock::MockTransport: Transport);
}
