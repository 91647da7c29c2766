use std::fmt;

use thiserror::Error;

use crate::BoxError;

use super::conn::TransportError;

/// Client error type.
///
/// Every failure is scoped to one logical request and is delivered through
/// the request future; nothing here is retried internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Error surfaced unchanged from the underlying transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A redirect response did not carry a usable `Location` header.
    #[error("redirect from {url} without a usable Location header")]
    CorruptRedirect {
        /// The URL whose response was missing the `Location` header.
        url: http::Uri,
    },

    /// A redirect target was already visited within this logical request.
    #[error("cyclic redirect: {0}")]
    CyclicRedirect(RedirectChain),

    /// A `304 Not Modified` arrived for a URL with no cached entry.
    ///
    /// The server and client disagree about state; failing is preferable to
    /// silently returning an empty body.
    #[error("304 Not Modified for {url}, but no cached entry exists")]
    StaleValidator {
        /// The URL the server reported as not modified.
        url: http::Uri,
    },

    /// The response body stream failed before any byte was delivered.
    #[error("body stream: {0}")]
    Body(#[source] BoxError),

    /// The request could not be constructed.
    #[error("invalid request: {0}")]
    User(#[from] http::Error),
}

/// The ordered list of URLs visited by a logical request, ending with the
/// URL that closed the loop.
///
/// Displays as the full chain for diagnosis, e.g.
/// `http://a/ -> http://b/ -> http://a/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectChain(pub(crate) Vec<http::Uri>);

impl RedirectChain {
    /// The visited URLs, in request order.
    pub fn urls(&self) -> &[http::Uri] {
        &self.0
    }
}

impl fmt::Display for RedirectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, url) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(Error: std::error::Error, Send, Sync, Into<crate::BoxError>);

    #[test]
    fn chain_display_joins_urls() {
        let chain = RedirectChain(vec![
            "http://a/".parse().unwrap(),
            "http://b/".parse().unwrap(),
            "http://a/".parse().unwrap(),
        ]);
        assert_eq!(chain.to_string(), "http://a/ -> http://b/ -> http://a/");
    }
}
