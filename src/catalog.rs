//! Movie catalog lookups on top of the response cache
//!
//! Each lookup carries the freshness policy that suits its endpoint: reference
//! lists change rarely, listings change often, and detail pages are raced across
//! every configured source with a short timeout.

use futures::future::{join_all, select_ok};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::config::FetchOptions;
use crate::error::FetchError;

/// TTL for genre and country lists (24 hours)
const REFERENCE_LIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// TTL for the popular listing (30 minutes)
const POPULAR_TTL: Duration = Duration::from_secs(30 * 60);

/// TTL for movie details used to enrich admin and history views (2 hours)
const ENRICH_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Timeout for each source in the detail race
const DETAIL_TIMEOUT: Duration = Duration::from_millis(2_500);

/// Errors that can occur when querying the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No upstream source is configured
    #[error("No catalog sources configured")]
    NoSources,

    /// The lookup failed (for a race, the last source to fail)
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// An upstream movie-listing API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    /// Human-readable name, used in logs
    pub name: String,
    /// Base URL without a trailing slash
    pub base_url: String,
}

impl CatalogSource {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn movie_url(&self, slug: &str) -> String {
        self.url(&format!("phim/{}", slug))
    }
}

/// Catalog client over one or more sources; the first source is the primary
#[derive(Debug, Clone)]
pub struct MovieCatalog {
    cache: ResponseCache,
    sources: Vec<CatalogSource>,
}

impl MovieCatalog {
    pub fn new(cache: ResponseCache, sources: Vec<CatalogSource>) -> Self {
        Self { cache, sources }
    }

    pub fn sources(&self) -> &[CatalogSource] {
        &self.sources
    }

    fn primary(&self) -> Result<&CatalogSource, CatalogError> {
        self.sources.first().ok_or(CatalogError::NoSources)
    }

    /// Genre list from the primary source
    pub async fn genres(&self) -> Result<Value, CatalogError> {
        let url = self.primary()?.url("the-loai");
        let options = FetchOptions::new().with_ttl(REFERENCE_LIST_TTL);
        Ok(self.cache.fetch(&url, options).await?)
    }

    /// Country list from the primary source
    pub async fn countries(&self) -> Result<Value, CatalogError> {
        let url = self.primary()?.url("quoc-gia");
        let options = FetchOptions::new().with_ttl(REFERENCE_LIST_TTL);
        Ok(self.cache.fetch(&url, options).await?)
    }

    /// One page of the recently updated listing from the primary source
    pub async fn popular(&self, page: u32) -> Result<Value, CatalogError> {
        let url = self
            .primary()?
            .url(&format!("danh-sach/phim-moi-cap-nhat?page={}", page));
        let options = FetchOptions::new().with_ttl(POPULAR_TTL);
        Ok(self.cache.fetch(&url, options).await?)
    }

    /// Movie detail from whichever source answers first
    ///
    /// Fails only if every source fails, with the error of the last one.
    pub async fn movie_detail(&self, slug: &str) -> Result<Value, CatalogError> {
        if self.sources.is_empty() {
            return Err(CatalogError::NoSources);
        }

        let options = FetchOptions::new().with_timeout(DETAIL_TIMEOUT);
        let lookups = self.sources.iter().map(|source| {
            let cache = self.cache.clone();
            let url = source.movie_url(slug);
            let name = source.name.clone();
            Box::pin(async move {
                let result = cache.fetch(&url, options).await;
                if let Err(err) = &result {
                    debug!(source = %name, error = %err, "Detail source failed");
                }
                result
            })
        });

        let (detail, _remaining) = select_ok(lookups).await?;
        Ok(detail)
    }

    /// Movie details for each slug from the primary source
    ///
    /// Results keep the order of `slugs`. A failed lookup yields `None` instead of
    /// failing the batch.
    pub async fn enrich(&self, slugs: &[String]) -> Result<Vec<Option<Value>>, CatalogError> {
        let primary = self.primary()?;
        let options = FetchOptions::new().with_ttl(ENRICH_TTL);

        let lookups = slugs.iter().map(|slug| {
            let url = primary.movie_url(slug);
            async move { self.cache.fetch(&url, options).await.ok() }
        });

        Ok(join_all(lookups).await)
    }
}
