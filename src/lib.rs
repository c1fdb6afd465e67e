//! Fetch web pages through a short lived redis cache while counting how often each URL is
//! requested.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use page_cache::{http::HttpClient, CachingFetcher};
//!
//! let client = redis::Client::open("redis://localhost:6379")?;
//! let pages = CachingFetcher::builder()
//!     .inner(HttpClient::new())
//!     .store(client.get_connection_manager().await?)
//!     .build();
//!
//! let html = pages.get_page("http://example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod http;

pub use cache::{MemoryStore, PageStore};
pub use fetcher::{cached_key, count_key, CachingFetcher, Fetcher, DEFAULT_TTL};
