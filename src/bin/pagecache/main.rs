use clap::Parser;
use page_cache::{config::Config, http::HttpClient, CachingFetcher, Fetcher, PageStore};
use redis::aio::ConnectionManager;

mod cli;

use cli::Cli;

type PageCache = CachingFetcher<HttpClient, ConnectionManager>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .with_writer(std::io::stderr)
        .init();

    let pages = prepare_page_cache(&config).await?;
    run(&pages, &cli).await
}

async fn prepare_page_cache(config: &Config) -> anyhow::Result<PageCache> {
    let client = redis::Client::open(config.redis_addr.as_str())?;
    let connection = client.get_connection_manager().await?;
    tracing::info!("connected to redis at {}", config.redis_addr);

    let pages = CachingFetcher::builder()
        .inner(HttpClient::with_timeout(config.http_timeout())?)
        .store(connection)
        .ttl(config.cache_ttl())
        .build();

    Ok(pages)
}

/// Handle every URL, then fail if any of them did.
async fn run<F, S>(pages: &CachingFetcher<F, S>, cli: &Cli) -> anyhow::Result<()>
where
    F: Fetcher,
    S: PageStore,
{
    let mut failed = 0;

    for url in &cli.urls {
        let result = if cli.count {
            pages
                .request_count(url)
                .await
                .map(|count| println!("{url}\t{count}"))
        } else {
            pages.get_page(url).await.map(|html| println!("{html}"))
        };

        if let Err(err) = result {
            tracing::error!("{url}: {err:#}");
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} urls failed", cli.urls.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_cache::MemoryStore;

    /// Fail for any URL on the `.invalid` TLD.
    struct Origin;

    #[async_trait::async_trait]
    impl Fetcher for Origin {
        async fn fetch(&self, url: &str) -> anyhow::Result<String> {
            if url.contains(".invalid") {
                anyhow::bail!("dns error: {url}");
            }
            Ok("<html>A</html>".to_string())
        }
    }

    fn pages(store: &MemoryStore) -> CachingFetcher<Origin, MemoryStore> {
        CachingFetcher::builder()
            .inner(Origin)
            .store(store.clone())
            .build()
    }

    #[tokio::test]
    async fn run_reports_failures_after_all_urls() {
        let store = MemoryStore::new();
        let pages = pages(&store);
        let cli = Cli::try_parse_from([
            "pagecache",
            "http://bad.invalid",
            "http://example.com",
        ])
        .unwrap();

        let err = run(&pages, &cli).await.unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 urls failed");
        // the URL after the failing one was still handled
        assert_eq!(pages.request_count("http://example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_count_only() {
        let store = MemoryStore::new();
        let pages = pages(&store);
        pages.get_page("http://example.com").await.unwrap();

        let cli = Cli::try_parse_from(["pagecache", "--count", "http://example.com"]).unwrap();
        run(&pages, &cli).await.unwrap();
        assert_eq!(pages.request_count("http://example.com").await.unwrap(), 1);
    }
}
