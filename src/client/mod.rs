//! HTTP request engine built above a pluggable transport.
//!
//! The [`Client`] owns the request/redirect/cache state machine: for each
//! response it decides whether to follow a redirect, serve from cache, or
//! deliver a final [`Response`], while keeping the two shared tables, the
//! conditional-GET [`CacheStore`] and the permanent-redirect
//! [`RedirectTable`], consistent across concurrent requests.
//!
//! Everything below the request/response contract (sockets, TLS, wire
//! framing, pooling) belongs to the [transport][conn::Transport], which is
//! any `tower::Service` from `http::Request<Body>` to `http::Response<Body>`.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use tower::ServiceExt;
use tracing::{debug, trace};

use crate::body::{accumulate, Body};

mod builder;
mod cache;
pub mod conn;
mod error;
mod redirect;
mod response;

pub use builder::Builder;
pub use cache::{CacheEntry, CacheStore, RedirectTable};
pub use conn::{Transport, TransportError};
pub use error::{Error, RedirectChain};
pub use response::Response;

use redirect::{resolve_location, History};

/// A redirect-resolving, cache-revalidating HTTP client.
///
/// The client is a cheap-to-clone handle; clones share the same transport
/// and the same [`CacheStore`] and [`RedirectTable`]. Construct isolated
/// state with [`Client::new`], or inject shared state through
/// [`Client::builder`].
pub struct Client<T> {
    inner: Arc<ClientRef<T>>,
}

struct ClientRef<T> {
    transport: T,
    cache: CacheStore,
    redirects: RedirectTable,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish()
    }
}

impl<T> Client<T> {
    /// Create a new client with fresh, isolated cache state.
    pub fn new(transport: T) -> Self {
        Self::builder(transport).build()
    }

    /// Create a builder which can wire in pre-built cache state.
    pub fn builder(transport: T) -> Builder<T> {
        Builder::new(transport)
    }

    /// The conditional-GET cache used by this client.
    ///
    /// Exposed for diagnostics and tests; removing an entry is supported.
    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    /// The learned permanent-redirect table used by this client.
    ///
    /// Exposed for diagnostics and tests; removing an entry is supported.
    pub fn redirects(&self) -> &RedirectTable {
        &self.inner.redirects
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    /// Make a GET request, following redirects.
    pub async fn get(&self, url: Uri) -> Result<Response, Error> {
        self.get_with(url, HeaderMap::new(), true).await
    }

    /// Make a GET request with explicit headers and redirect policy.
    pub async fn get_with(
        &self,
        url: Uri,
        headers: HeaderMap,
        follow_redirect: bool,
    ) -> Result<Response, Error> {
        self.dispatch(Method::GET, url, headers, Body::empty(), follow_redirect)
            .await
    }

    /// Make a POST request with a url-encoded form body, following redirects.
    pub async fn post<I, K, V>(&self, url: Uri, params: I) -> Result<Response, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.post_with(url, params, HeaderMap::new(), true).await
    }

    /// Make a POST request with explicit headers and redirect policy.
    ///
    /// `params` is encoded as `application/x-www-form-urlencoded` and the
    /// content-type header is set accordingly unless already present.
    pub async fn post_with<I, K, V>(
        &self,
        url: Uri,
        params: I,
        mut headers: HeaderMap,
        follow_redirect: bool,
    ) -> Result<Response, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let form = encode_form(params);
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(
                "application/x-www-form-urlencoded",
            ));
        self.dispatch(
            Method::POST,
            url,
            headers,
            Body::from(form),
            follow_redirect,
        )
        .await
    }

    /// Dispatch an arbitrary request through the engine.
    ///
    /// This is the low-level entry point behind [`get`][Client::get] and
    /// [`post`][Client::post].
    pub async fn request(
        &self,
        request: http::Request<Body>,
        follow_redirect: bool,
    ) -> Result<Response, Error> {
        let (parts, body) = request.into_parts();
        self.dispatch(parts.method, parts.uri, parts.headers, body, follow_redirect)
            .await
    }

    /// The request loop: one iteration per hop of the logical request.
    ///
    /// Each hop consults the permanent-redirect table, injects the cache
    /// validator, contacts the transport, and either follows a redirect or
    /// finishes. Hops are strictly sequential; the shared tables are only
    /// touched through their own short critical sections.
    async fn dispatch(
        &self,
        method: Method,
        url: Uri,
        headers: HeaderMap,
        body: Body,
        follow_redirect: bool,
    ) -> Result<Response, Error> {
        // A POST starts a fresh chain: its first redirect resets history.
        let mut history = History::new(method == Method::POST);
        let mut method = method;
        let mut url = url;
        let mut body = Some(body);

        loop {
            // Learned permanent redirects short-circuit the round trip
            // entirely. Applies to GET hops only.
            if follow_redirect && method == Method::GET {
                if let Some(target) = self.inner.redirects.lookup(&url) {
                    trace!(%url, %target, "skipping round trip via learned permanent redirect");
                    history.record(url);
                    if history.contains(&target) {
                        return Err(Error::CyclicRedirect(history.into_chain(target)));
                    }
                    url = target;
                    continue;
                }
            }

            let mut outgoing = headers.clone();
            if let Some(validator) = self.inner.cache.validator(&url) {
                trace!(%url, "revalidating with If-Modified-Since");
                outgoing.insert(IF_MODIFIED_SINCE, validator);
            }

            let mut builder = http::Request::builder().method(method.clone()).uri(url.clone());
            if let Some(headers) = builder.headers_mut() {
                *headers = outgoing;
            }
            let request = builder.body(body.take().unwrap_or_else(Body::empty))?;

            trace!(%url, %method, "sending request");
            let response = self.inner.transport.clone().oneshot(request).await?;
            let (parts, incoming) = response.into_parts();

            let redirected = parts.status == StatusCode::MOVED_PERMANENTLY
                || parts.status == StatusCode::FOUND;

            if follow_redirect && redirected {
                let location = parts
                    .headers
                    .get(LOCATION)
                    .ok_or_else(|| Error::CorruptRedirect { url: url.clone() })?;
                let target = resolve_location(&url, location)?;

                if parts.status == StatusCode::MOVED_PERMANENTLY {
                    debug!(%url, %target, "learned permanent redirect");
                    self.inner.redirects.insert(&url, target.clone());
                }

                history.record(url);
                if history.contains(&target) {
                    return Err(Error::CyclicRedirect(history.into_chain(target)));
                }

                trace!(%target, status = %parts.status, "following redirect");
                url = target;
                // Redirect targets are re-requested as GET with no body.
                method = Method::GET;
                continue;
            }

            return self
                .finish(parts.status, parts.headers, incoming, url, history)
                .await;
        }
    }

    /// Terminal handling: conditional revalidation and body accumulation.
    async fn finish(
        &self,
        status: StatusCode,
        headers: HeaderMap,
        incoming: Body,
        url: Uri,
        history: History,
    ) -> Result<Response, Error> {
        if status == StatusCode::NOT_MODIFIED {
            // Sending If-Modified-Since implies a stored entry; a 304 without
            // one means client and server disagree about state.
            let body = self
                .inner
                .cache
                .body(&url)
                .ok_or_else(|| Error::StaleValidator { url: url.clone() })?;
            debug!(%url, "serving 304 body from cache");
            return Ok(Response::new(status, body, headers, url, history.into_urls()));
        }

        let validator = if status == StatusCode::OK {
            headers.get(LAST_MODIFIED).cloned()
        } else {
            None
        };

        let body = if content_length_is_zero(&headers) {
            Bytes::new()
        } else {
            accumulate(incoming).await.map_err(Error::Body)?
        };

        if let Some(validator) = validator {
            debug!(%url, "storing response for conditional revalidation");
            self.inner.cache.insert(&url, validator, body.clone());
        }

        Ok(Response::new(status, body, headers, url, history.into_urls()))
    }
}

/// Encode form parameters as `application/x-www-form-urlencoded`.
fn encode_form<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

fn content_length_is_zero(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        == Some(0)
}

#[cfg(test)]
mod tests {

    use super::*;

    #[cfg(feature = "mocks")]
    use crate::client::conn::mock::MockTransport;
    use static_assertions::assert_impl_all;

    #[cfg(feature = "mocks")]
    assert_impl_all!(Client<MockTransport>: Send, Sync, Clone);

    #[test]
    fn form_encoding() {
        assert_eq!(
            encode_form([("test", "passed"), ("a", "b c")]),
            "test=passed&a=b+c"
        );
        assert_eq!(encode_form::<_, &str, &str>([]), "");
    }

    #[test]
    fn content_length_zero_detection() {
        let mut headers = HeaderMap::new();
        assert!(!content_length_is_zero(&headers));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert!(content_length_is_zero(&headers));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert!(!content_length_is_zero(&headers));
    }
}
