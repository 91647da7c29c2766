use bytes::Bytes;
use http::{HeaderMap, StatusCode, Uri};

/// The completed result of a logical request.
///
/// Immutable once constructed. [`url`][Response::url] is the URL that
/// produced this response after any redirect hops, which is not necessarily
/// the URL originally requested. [`redirects`][Response::redirects] lists
/// every URL visited before it, in request order.
#[derive(Debug, Clone)]
pub struct Response {
    code: StatusCode,
    body: Bytes,
    headers: HeaderMap,
    url: Uri,
    redirects: Vec<Uri>,
}

impl Response {
    pub(crate) fn new(
        code: StatusCode,
        body: Bytes,
        headers: HeaderMap,
        url: Uri,
        redirects: Vec<Uri>,
    ) -> Self {
        Self {
            code,
            body,
            headers,
            url,
            redirects,
        }
    }

    /// The response status code.
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// The fully accumulated response body.
    ///
    /// For a `304 Not Modified` this is the previously cached body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// The response headers, as received from the final URL.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The URL that produced this response.
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Every URL visited before the final one, in request order.
    pub fn redirects(&self) -> &[Uri] {
        &self.redirects
    }
}
