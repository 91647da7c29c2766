//! A scriptable in-memory transport, suitable for exercising the request
//! engine without a network.
//!
//! Routes are keyed by method and URL. Each route holds a queue of scripted
//! replies: a request pops the front of the queue, except that the last
//! reply is sticky and answers every request from then on. Every request is
//! also recorded, so tests can assert which URLs were (or were not)
//! contacted.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use http_body_util::BodyExt as _;
use parking_lot::Mutex;

use super::TransportError;
use crate::{Body, BoxError};

/// A scriptable in-memory transport.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug, Default)]
struct Shared {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    log: Vec<RecordedRequest>,
}

/// A request observed by the mock transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The request method.
    pub method: Method,
    /// The requested URL.
    pub url: Uri,
    /// The headers as sent by the engine.
    pub headers: HeaderMap,
    /// The request body, drained before replying.
    pub body: Bytes,
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(MockResponse),
    Fail(MockFailure),
}

/// Failure modes the transport can be scripted to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// DNS resolution failure.
    Dns,
    /// Unsupported URL scheme.
    UnsupportedScheme,
    /// Connection-level failure.
    Connection,
}

impl MockFailure {
    fn into_error(self, url: &str) -> TransportError {
        match self {
            MockFailure::Dns => TransportError::Dns(format!("no address for {url}").into()),
            MockFailure::UnsupportedScheme => TransportError::UnsupportedScheme(url.to_owned()),
            MockFailure::Connection => {
                TransportError::Connection(format!("connection refused: {url}").into())
            }
        }
    }
}

/// A scripted response: status, headers, and an ordered list of body
/// chunks, any of which may be a mid-stream error.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    chunks: Vec<Result<Bytes, String>>,
}

impl MockResponse {
    /// A response with the given status and no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status code"),
            headers: HeaderMap::new(),
            chunks: Vec::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(
            name.parse::<HeaderName>().expect("valid header name"),
            HeaderValue::from_str(value).expect("valid header value"),
        );
        self
    }

    /// Set the body to a single chunk.
    pub fn body(self, data: impl Into<Bytes>) -> Self {
        self.chunk(data)
    }

    /// Append a body chunk.
    pub fn chunk(mut self, data: impl Into<Bytes>) -> Self {
        self.chunks.push(Ok(data.into()));
        self
    }

    /// Append a mid-stream error after any preceding chunks.
    pub fn chunk_error(mut self, message: &str) -> Self {
        self.chunks.push(Err(message.to_owned()));
        self
    }

    fn into_response(self) -> http::Response<Body> {
        let mut response = http::Response::new(match self.chunks.len() {
            0 => Body::empty(),
            1 if self.chunks[0].is_ok() => match self.chunks.into_iter().next() {
                Some(Ok(data)) => Body::full(data),
                _ => unreachable!("checked above"),
            },
            _ => Body::boxed(ChunkedBody {
                chunks: self.chunks.into(),
            }),
        });
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// A body which yields scripted chunks, possibly ending in an error.
struct ChunkedBody {
    chunks: VecDeque<Result<Bytes, String>>,
}

impl http_body::Body for ChunkedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(match self.chunks.pop_front() {
            None => None,
            Some(Ok(data)) => Some(Ok(http_body::Frame::data(data))),
            Some(Err(message)) => Some(Err(message.into())),
        })
    }
}

impl MockTransport {
    /// Create a transport with no routes.
    ///
    /// Requests to unrouted URLs fail with a connection error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for requests to `url` with the given method.
    ///
    /// Calling this again for the same route queues further replies.
    pub fn on(&self, method: Method, url: &str, response: MockResponse) -> &Self {
        self.push(method, url, Reply::Respond(response));
        self
    }

    /// Script a transport failure for requests to `url`.
    pub fn fail(&self, method: Method, url: &str, failure: MockFailure) -> &Self {
        self.push(method, url, Reply::Fail(failure));
        self
    }

    fn push(&self, method: Method, url: &str, reply: Reply) {
        self.shared
            .lock()
            .routes
            .entry((method, url.to_owned()))
            .or_default()
            .push_back(reply);
    }

    /// Every request this transport has received, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.lock().log.clone()
    }

    /// How many requests have been made for `url`, with any method.
    pub fn hits(&self, url: &str) -> usize {
        self.shared
            .lock()
            .log
            .iter()
            .filter(|recorded| recorded.url.to_string() == url)
            .count()
    }

    fn reply_for(&self, method: &Method, url: &str) -> Reply {
        let mut shared = self.shared.lock();
        match shared.routes.get_mut(&(method.clone(), url.to_owned())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("queue is non-empty"),
            Some(queue) => match queue.front() {
                Some(reply) => reply.clone(),
                None => Reply::Fail(MockFailure::Connection),
            },
            None => Reply::Fail(MockFailure::Connection),
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

impl tower::Service<http::Request<Body>> for MockTransport {
    type Response = http::Response<Body>;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Body>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move {
            let url = request.uri().to_string();
            let method = request.method().clone();
            let (parts, body) = request.into_parts();
            let body = body
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();

            transport.shared.lock().log.push(RecordedRequest {
                method: method.clone(),
                url: parts.uri,
                headers: parts.headers,
                body,
            });

            match transport.reply_for(&method, &url) {
                Reply::Respond(response) => Ok(response.into_response()),
                Reply::Fail(failure) => Err(failure.into_error(&url)),
            }
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use tower::ServiceExt;

    fn request(url: &str) -> http::Request<Body> {
        http::Request::get(url).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn scripted_response_and_log() {
        let transport = MockTransport::new();
        transport.on(
            Method::GET,
            "http://example.com/",
            MockResponse::new(200).body("hello"),
        );

        let response = transport
            .clone()
            .oneshot(request("http://example.com/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.hits("http://example.com/"), 1);
    }

    #[tokio::test]
    async fn queued_replies_with_sticky_last() {
        let transport = MockTransport::new();
        transport
            .on(Method::GET, "http://q/", MockResponse::new(200))
            .on(Method::GET, "http://q/", MockResponse::new(304));

        let first = transport.clone().oneshot(request("http://q/")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        for _ in 0..2 {
            let later = transport.clone().oneshot(request("http://q/")).await.unwrap();
            assert_eq!(later.status(), StatusCode::NOT_MODIFIED);
        }
    }

    #[tokio::test]
    async fn unrouted_urls_refuse_connections() {
        let transport = MockTransport::new();
        let error = transport
            .clone()
            .oneshot(request("http://nowhere/"))
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::Connection(_)));
    }
}
