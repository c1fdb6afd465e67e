use anyhow::Context;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::PageStore;

/// How long a fetched page stays in the cache unless the builder says otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Anything that can turn a URL into page text.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Key of the request counter for `url`.
pub fn count_key(url: &str) -> String {
    format!("count:{url}")
}

/// Key of the cached page body for `url`.
pub fn cached_key(url: &str) -> String {
    format!("cached:{url}")
}

/// Wrap a [`Fetcher`] with a request counter and a short lived page cache.
///
/// Every call bumps `count:<url>`, hits included. The cache lookup, the fetch and the cache
/// write are separate steps: two callers missing at the same time both fetch and the last
/// write wins.
#[derive(typed_builder::TypedBuilder)]
pub struct CachingFetcher<F, S> {
    inner: F,
    #[builder(setter(transform = |store: S| Mutex::new(store)))]
    store: Mutex<S>,
    #[builder(default = DEFAULT_TTL)]
    ttl: Duration,
}

impl<F, S> CachingFetcher<F, S>
where
    F: Fetcher,
    S: PageStore,
{
    pub async fn get_page(&self, url: &str) -> anyhow::Result<String> {
        // The lock is released after each statement, so the fetch never holds it.
        let count = self.store.lock().await.incr(&count_key(url)).await?;

        let key = cached_key(url);
        let cached = self.store.lock().await.get(&key).await?;
        // an empty body is not worth serving from cache
        if let Some(page) = cached.filter(|page| !page.is_empty()) {
            debug!("cache hit for {url} (requested {count} times)");
            return Ok(page);
        }

        debug!("cache miss for {url} (requested {count} times)");
        let page = self.inner.fetch(url).await?;
        self.store.lock().await.set_ex(&key, &page, self.ttl).await?;

        Ok(page)
    }

    /// How many times `url` went through [`Self::get_page`]. Reading it does not count as a
    /// request.
    pub async fn request_count(&self, url: &str) -> anyhow::Result<u64> {
        let key = count_key(url);
        let Some(raw) = self.store.lock().await.get(&key).await? else {
            return Ok(0);
        };

        raw.parse()
            .with_context(|| format!("counter `{key}` holds non-integer value {raw:?}"))
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait::async_trait]
impl<F, S> Fetcher for CachingFetcher<F, S>
where
    F: Fetcher,
    S: PageStore,
{
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        self.get_page(url).await
    }
}
