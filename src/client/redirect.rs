//! `Location` resolution and per-request redirect bookkeeping.

use http::uri::{Parts, PathAndQuery, Uri};
use http::HeaderValue;

use super::error::{Error, RedirectChain};

/// Resolve a `Location` header value against the URL that produced it.
///
/// A missing scheme or authority is inherited from the current URL; a path
/// not starting with `/` is anchored at the root. A value that cannot be
/// interpreted as a URI makes the redirect corrupt.
pub(super) fn resolve_location(base: &Uri, location: &HeaderValue) -> Result<Uri, Error> {
    let corrupt = || Error::CorruptRedirect { url: base.clone() };

    let raw = location.to_str().map_err(|_| corrupt())?;

    // A bare relative target would otherwise parse in authority form
    // ("b" becoming host `b`), so anchor it at the root first.
    let target: Uri = if raw.starts_with('/') || raw.contains("://") {
        raw.parse().map_err(|_| corrupt())?
    } else {
        format!("/{raw}").parse().map_err(|_| corrupt())?
    };

    if target.scheme().is_some() && target.authority().is_some() {
        return Ok(target);
    }

    let mut parts = Parts::default();
    parts.scheme = target.scheme().cloned().or_else(|| base.scheme().cloned());
    parts.authority = target
        .authority()
        .cloned()
        .or_else(|| base.authority().cloned());
    parts.path_and_query = Some(
        target
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/")),
    );

    Uri::from_parts(parts).map_err(|_| corrupt())
}

/// The URLs one logical request has visited so far, used for cycle
/// detection and for the final `redirects` field of the response.
///
/// A POST-originated request starts a fresh chain: its first redirect
/// resets tracking to empty instead of recording the POST URL, so the GET
/// hops that follow are not cycle-checked against pre-POST state.
#[derive(Debug)]
pub(super) struct History {
    visited: Vec<Uri>,
    fresh_chain: bool,
}

impl History {
    pub(super) fn new(fresh_chain: bool) -> Self {
        Self {
            visited: Vec::new(),
            fresh_chain,
        }
    }

    /// Record a visited URL before hopping away from it.
    pub(super) fn record(&mut self, url: Uri) {
        if self.fresh_chain {
            self.fresh_chain = false;
            self.visited.clear();
        } else {
            self.visited.push(url);
        }
    }

    pub(super) fn contains(&self, url: &Uri) -> bool {
        self.visited.contains(url)
    }

    /// Close the history into a diagnostic chain ending at the URL which
    /// was about to repeat.
    pub(super) fn into_chain(mut self, repeat: Uri) -> RedirectChain {
        self.visited.push(repeat);
        RedirectChain(self.visited)
    }

    pub(super) fn into_urls(self) -> Vec<Uri> {
        self.visited
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn resolve(base: &str, location: &str) -> Result<Uri, Error> {
        resolve_location(
            &base.parse().unwrap(),
            &HeaderValue::from_str(location).unwrap(),
        )
    }

    #[test]
    fn absolute_location_is_untouched() {
        let target = resolve("http://host/a", "http://elsewhere/b?x=1").unwrap();
        assert_eq!(target, "http://elsewhere/b?x=1");
    }

    #[test]
    fn path_location_inherits_scheme_and_host() {
        let target = resolve("http://host/a", "/b").unwrap();
        assert_eq!(target, "http://host/b");
    }

    #[test]
    fn relative_path_is_root_anchored() {
        let target = resolve("http://host:8080/a/c", "b").unwrap();
        assert_eq!(target, "http://host:8080/b");
    }

    #[test]
    fn query_survives_resolution() {
        let target = resolve("http://host/a", "/b?next=1").unwrap();
        assert_eq!(target, "http://host/b?next=1");
    }

    #[test]
    fn unparseable_location_is_corrupt() {
        let err = resolve("http://host/a", "http://^^^/").unwrap_err();
        assert!(matches!(err, Error::CorruptRedirect { .. }));
    }

    #[test]
    fn history_records_in_order() {
        let mut history = History::new(false);
        history.record("http://a/".parse().unwrap());
        history.record("http://b/".parse().unwrap());

        assert!(history.contains(&"http://a/".parse().unwrap()));
        assert!(!history.contains(&"http://c/".parse().unwrap()));
        assert_eq!(history.into_urls().len(), 2);
    }

    #[test]
    fn fresh_chain_resets_on_first_record() {
        let mut history = History::new(true);
        history.record("http://post-origin/".parse().unwrap());
        assert!(!history.contains(&"http://post-origin/".parse().unwrap()));

        // Later hops are tracked normally.
        history.record("http://a/".parse().unwrap());
        assert!(history.contains(&"http://a/".parse().unwrap()));
    }

    #[test]
    fn chain_ends_with_repeated_url() {
        let mut history = History::new(false);
        history.record("http://a/".parse().unwrap());
        history.record("http://b/".parse().unwrap());

        let chain = history.into_chain("http://a/".parse().unwrap());
        assert_eq!(chain.to_string(), "http://a/ -> http://b/ -> http://a/");
    }
}
