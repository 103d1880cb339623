//! URL collection from sitemaps, URL list files and explicit arguments.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use auditq_config::PipelineConfig;

use crate::error::PipelineError;
use crate::probe::http_client;

/// Nested sitemap indexes deeper than this are ignored.
const MAX_SITEMAP_DEPTH: usize = 3;

/// A place to read URLs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// URLs given directly. Invalid entries are rejected.
    List(Vec<String>),
    /// Remote sitemap or sitemap index.
    Sitemap(String),
    /// Sitemap stored on disk. Nested sitemaps are fetched over HTTP.
    SitemapFile(PathBuf),
    /// Text file with one URL per line.
    UrlFile(PathBuf),
}

/// Collects and validates URLs from one or more sources.
pub struct UrlCollector {
    client: Client,
    max_urls: usize,
}

impl UrlCollector {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self::with_client(http_client(config)?, config.max_urls))
    }

    /// `max_urls == 0` means unlimited.
    pub fn with_client(client: Client, max_urls: usize) -> Self {
        Self { client, max_urls }
    }

    /// Collect URLs from every source, in order.
    ///
    /// Duplicates are dropped keeping the first occurrence, and the list is
    /// truncated to `max_urls`.
    pub async fn collect(&self, sources: &[UrlSource]) -> Result<Vec<String>, PipelineError> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for source in sources {
            let found = match source {
                UrlSource::List(list) => list
                    .iter()
                    .map(|raw| validate_url(raw))
                    .collect::<Result<Vec<_>, _>>()?,
                UrlSource::Sitemap(location) => self.fetch_sitemap(location).await?,
                UrlSource::SitemapFile(path) => self.read_sitemap_file(path).await?,
                UrlSource::UrlFile(path) => read_url_file(path).await?,
            };
            for url in found {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }

        if self.max_urls > 0 && urls.len() > self.max_urls {
            info!("Limiting run to {} of {} URLs", self.max_urls, urls.len());
            urls.truncate(self.max_urls);
        }
        Ok(urls)
    }

    /// Fetch a sitemap and return the page URLs it lists.
    ///
    /// A sitemap index is followed recursively. Nested sitemaps that fail to
    /// load are logged and skipped.
    pub async fn fetch_sitemap(&self, location: &str) -> Result<Vec<String>, PipelineError> {
        self.fetch_sitemap_at(location.to_string(), 0).await
    }

    /// Read a sitemap from disk.
    pub async fn read_sitemap_file(&self, path: &Path) -> Result<Vec<String>, PipelineError> {
        let content = tokio::fs::read_to_string(path).await?;
        self.expand(&path.display().to_string(), content, 0).await
    }

    fn fetch_sitemap_at(
        &self,
        location: String,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PipelineError>> + Send + '_>> {
        Box::pin(async move {
            info!("Fetching sitemap from: {}", location);
            let response = self.client.get(&location).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(PipelineError::Sitemap {
                    location,
                    message: format!("HTTP status {}", status.as_u16()),
                });
            }
            let content = response.text().await?;
            self.expand(&location, content, depth).await
        })
    }

    async fn expand(
        &self,
        location: &str,
        content: String,
        depth: usize,
    ) -> Result<Vec<String>, PipelineError> {
        if !content.contains("<urlset") && !is_sitemap_index(&content) {
            return Err(PipelineError::Sitemap {
                location: location.to_string(),
                message: "not a sitemap document".to_string(),
            });
        }

        let locs = extract_loc_values(&content);
        if !is_sitemap_index(&content) {
            let urls = keep_valid(locs, location);
            info!("Found {} URLs in sitemap {}", urls.len(), location);
            return Ok(urls);
        }

        if depth >= MAX_SITEMAP_DEPTH {
            warn!("Sitemap index {} nested too deeply, skipping", location);
            return Ok(Vec::new());
        }

        debug!("Sitemap index {} lists {} sitemaps", location, locs.len());
        let mut urls = Vec::new();
        for nested in locs {
            match self.fetch_sitemap_at(nested.clone(), depth + 1).await {
                Ok(found) => urls.extend(found),
                Err(e) => warn!("Failed to load nested sitemap {}: {}", nested, e),
            }
        }
        Ok(urls)
    }
}

/// Read a URL list: one URL per line, blank lines and `#` comments skipped.
///
/// Lines that are not `http(s)://` URLs are logged and skipped.
pub async fn read_url_file(path: &Path) -> Result<Vec<String>, PipelineError> {
    let content = tokio::fs::read_to_string(path).await?;
    let lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    Ok(keep_valid(lines, &path.display().to_string()))
}

/// Parse and normalize an absolute `http(s)` URL.
pub fn validate_url(raw: &str) -> Result<String, PipelineError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| PipelineError::invalid_url(raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PipelineError::invalid_url(
                raw,
                format!("unsupported scheme {}", other),
            ));
        }
    }
    if url.host_str().is_none() {
        return Err(PipelineError::invalid_url(raw, "missing host"));
    }
    Ok(url.to_string())
}

fn keep_valid(candidates: Vec<String>, origin: &str) -> Vec<String> {
    candidates
        .into_iter()
        .filter_map(|candidate| match validate_url(&candidate) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Skipping entry from {}: {}", origin, e);
                None
            }
        })
        .collect()
}

/// Whether a sitemap document is an index of other sitemaps.
pub fn is_sitemap_index(content: &str) -> bool {
    content.contains("<sitemapindex")
}

/// Every `<loc>` value in a sitemap document, in document order.
///
/// CDATA wrappers and the predefined XML entities are decoded. Prefixed
/// elements such as `<image:loc>` are not matched.
pub fn extract_loc_values(content: &str) -> Vec<String> {
    const OPEN: &str = "<loc>";
    const CLOSE: &str = "</loc>";

    let mut values = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        let raw = after[..end].trim();
        let raw = raw
            .strip_prefix("<![CDATA[")
            .and_then(|s| s.strip_suffix("]]>"))
            .unwrap_or(raw)
            .trim();
        if !raw.is_empty() {
            values.push(decode_entities(raw));
        }
        rest = &after[end + CLOSE.len()..];
    }
    values
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[path = "sources_tests.rs"]
mod tests;
