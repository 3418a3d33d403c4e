use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::future::{AbortRegistration, Abortable};
use lru::LruCache;
use url::Url;

use crate::transport::{Credentials, FetchError, FetchRequest, Fetcher};

/// Cache key for a document address: the absolute URL without its fragment.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub aborted: u64,
}

/// Address → document markup, filled on first successful fetch and never
/// evicted.
pub struct DocumentCache {
    entries: RefCell<LruCache<String, Rc<str>>>,
    counters: Cell<CacheCounters>,
    fetcher: Rc<dyn Fetcher>,
    credentials: Credentials,
}

impl DocumentCache {
    pub fn new(fetcher: Rc<dyn Fetcher>, credentials: Credentials) -> Self {
        Self {
            entries: RefCell::new(LruCache::unbounded()),
            counters: Cell::new(CacheCounters::default()),
            fetcher,
            credentials,
        }
    }

    pub fn seed(&self, url: &Url, markup: impl Into<Rc<str>>) {
        self.entries.borrow_mut().put(cache_key(url), markup.into());
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.entries.borrow().contains(&cache_key(url))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters.get()
    }

    /// Returns cached markup or fetches and stores it.
    ///
    /// `Ok(None)` means the request was aborted through `registration`; the
    /// caller should do nothing. Failed and aborted fetches are not cached.
    pub async fn get(
        &self,
        url: &Url,
        registration: AbortRegistration,
    ) -> Result<Option<Rc<str>>, FetchError> {
        let key = cache_key(url);
        let hit = self.entries.borrow_mut().get(&key).cloned();
        if let Some(markup) = hit {
            self.bump(|counters| counters.hits += 1);
            tracing::trace!(address = %key, "document cache hit");
            return Ok(Some(markup));
        }

        self.bump(|counters| {
            counters.misses += 1;
            counters.fetches += 1;
        });
        tracing::trace!(address = %key, "document cache miss");
        let request = FetchRequest {
            url: url.clone(),
            credentials: self.credentials,
        };
        let fetched = match Abortable::new(self.fetcher.fetch(request), registration).await {
            Ok(result) => result,
            Err(_aborted) => Err(FetchError::Aborted),
        };

        match fetched {
            Ok(markup) => {
                let markup: Rc<str> = markup.into();
                self.entries.borrow_mut().put(key, Rc::clone(&markup));
                Ok(Some(markup))
            }
            Err(FetchError::Aborted) => {
                self.bump(|counters| counters.aborted += 1);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn bump(&self, update: impl FnOnce(&mut CacheCounters)) {
        let mut counters = self.counters.get();
        update(&mut counters);
        self.counters.set(counters);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use futures_util::future::AbortHandle;
    use url::Url;

    use super::{DocumentCache, cache_key};
    use crate::transport::{Credentials, FetchError, MemoryFetcher};

    fn url(path: &str) -> Url {
        Url::parse("https://example.com")
            .and_then(|base| base.join(path))
            .expect("test url should parse")
    }

    fn cache_with(fetcher: &Rc<MemoryFetcher>) -> DocumentCache {
        let fetcher: Rc<MemoryFetcher> = Rc::clone(fetcher);
        DocumentCache::new(fetcher, Credentials::Include)
    }

    #[tokio::test]
    async fn repeated_get_fetches_once() {
        let fetcher = Rc::new(MemoryFetcher::new().with_page("/b", "<p>b</p>"));
        let cache = cache_with(&fetcher);

        for _ in 0..2 {
            let (_handle, registration) = AbortHandle::new_pair();
            let markup = cache
                .get(&url("/b"), registration)
                .await
                .expect("fetch should succeed");
            assert_eq!(markup.as_deref(), Some("<p>b</p>"));
        }

        assert_eq!(fetcher.calls("/b"), 1);
        let counters = cache.counters();
        assert_eq!(counters.hits, 1);
        assert_eq!(counters.misses, 1);
    }

    #[tokio::test]
    async fn seeded_address_is_never_fetched() {
        let fetcher = Rc::new(MemoryFetcher::new());
        let cache = cache_with(&fetcher);
        cache.seed(&url("/a"), "<p>a</p>");

        let (_handle, registration) = AbortHandle::new_pair();
        let markup = cache
            .get(&url("/a#top"), registration)
            .await
            .expect("seeded page should resolve");
        assert_eq!(markup.as_deref(), Some("<p>a</p>"));
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_fetch_yields_none_and_is_not_cached() {
        let fetcher = Rc::new(
            MemoryFetcher::new()
                .with_latency(Duration::from_millis(100))
                .with_page("/slow", "<p>slow</p>"),
        );
        let cache = cache_with(&fetcher);

        let slow = url("/slow");
        let (handle, registration) = AbortHandle::new_pair();
        let (result, ()) = tokio::join!(cache.get(&slow, registration), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.abort();
        });

        assert_eq!(result, Ok(None));
        assert!(!cache.contains(&slow));
        assert_eq!(cache.counters().aborted, 1);
    }

    #[tokio::test]
    async fn failures_surface_and_are_not_cached() {
        let fetcher = Rc::new(MemoryFetcher::new());
        fetcher.insert_failure("/down", FetchError::status(503));
        let cache = cache_with(&fetcher);

        let (_handle, registration) = AbortHandle::new_pair();
        let result = cache.get(&url("/down"), registration).await;
        assert_eq!(result, Err(FetchError::status(503)));
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_key_drops_fragment_but_keeps_query() {
        assert_eq!(cache_key(&url("/a?x=1#frag")), "https://example.com/a?x=1");
    }
}
