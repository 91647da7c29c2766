use std::sync::Arc;

use super::{CacheStore, Client, ClientRef, RedirectTable};

/// Configure a [`Client`] before constructing it.
///
/// The two shared tables can be injected to share state between clients or
/// to inspect and invalidate entries from tests; fresh, isolated instances
/// are used otherwise.
#[derive(Debug)]
pub struct Builder<T> {
    transport: T,
    cache: Option<CacheStore>,
    redirects: Option<RedirectTable>,
}

impl<T> Builder<T> {
    pub(super) fn new(transport: T) -> Self {
        Self {
            transport,
            cache: None,
            redirects: None,
        }
    }

    /// Use the given conditional-GET cache instead of a fresh one.
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use the given permanent-redirect table instead of a fresh one.
    pub fn with_redirect_table(mut self, redirects: RedirectTable) -> Self {
        self.redirects = Some(redirects);
        self
    }

    /// Construct the client.
    pub fn build(self) -> Client<T> {
        Client {
            inner: Arc::new(ClientRef {
                transport: self.transport,
                cache: self.cache.unwrap_or_default(),
                redirects: self.redirects.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(all(test, feature = "mocks"))]
mod tests {

    use super::*;
    use crate::client::conn::mock::MockTransport;

    #[test]
    fn builder_shares_injected_state() {
        let cache = CacheStore::new();
        let table = RedirectTable::new();

        let client = Client::builder(MockTransport::new())
            .with_cache(cache.clone())
            .with_redirect_table(table.clone())
            .build();

        table.insert(
            &"http://a/".parse().unwrap(),
            "http://b/".parse().unwrap(),
        );
        assert_eq!(client.redirects().len(), 1);
        assert!(client.cache().is_empty());
        cache.insert(
            &"http://a/".parse().unwrap(),
            http::HeaderValue::from_static("now"),
            bytes::Bytes::from("body"),
        );
        assert_eq!(client.cache().len(), 1);
    }
}
