use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use futures_util::FutureExt;

use super::{FetchError, FetchFuture, FetchRequest, Fetcher};

enum Route {
    Page(String),
    Fail(FetchError),
}

/// Serves documents from a path-keyed table and counts every transport call.
#[derive(Default)]
pub struct MemoryFetcher {
    routes: RefCell<HashMap<String, Route>>,
    calls: RefCell<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_page(self, path: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert_page(path, markup);
        self
    }

    pub fn insert_page(&self, path: impl Into<String>, markup: impl Into<String>) {
        self.routes
            .borrow_mut()
            .insert(path.into(), Route::Page(markup.into()));
    }

    pub fn insert_failure(&self, path: impl Into<String>, error: FetchError) {
        self.routes
            .borrow_mut()
            .insert(path.into(), Route::Fail(error));
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.borrow().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        let path = request.url.path().to_string();
        *self.calls.borrow_mut().entry(path.clone()).or_insert(0) += 1;

        let outcome = match self.routes.borrow().get(&path) {
            Some(Route::Page(markup)) => Ok(markup.clone()),
            Some(Route::Fail(error)) => Err(error.clone()),
            None => Err(FetchError::status(404)),
        };
        let latency = self.latency;

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            outcome
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::MemoryFetcher;
    use crate::transport::{Credentials, FetchError, FetchRequest, Fetcher};

    fn request(path: &str) -> FetchRequest {
        FetchRequest {
            url: Url::parse("https://example.com")
                .and_then(|base| base.join(path))
                .expect("test url should parse"),
            credentials: Credentials::Include,
        }
    }

    #[tokio::test]
    async fn serves_pages_and_counts_calls_per_path() {
        let fetcher = MemoryFetcher::new().with_page("/a", "<p>a</p>");

        assert_eq!(fetcher.fetch(request("/a")).await, Ok("<p>a</p>".to_string()));
        assert_eq!(fetcher.fetch(request("/a?x=1")).await, Ok("<p>a</p>".to_string()));
        assert_eq!(fetcher.fetch(request("/zzz")).await, Err(FetchError::status(404)));

        assert_eq!(fetcher.calls("/a"), 2);
        assert_eq!(fetcher.calls("/zzz"), 1);
        assert_eq!(fetcher.total_calls(), 3);
    }

    #[tokio::test]
    async fn configured_failures_are_returned() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert_failure("/down", FetchError::transport("connection reset"));

        let err = fetcher
            .fetch(request("/down"))
            .await
            .expect_err("failure route should fail");
        assert_eq!(err, FetchError::transport("connection reset"));
    }
}
