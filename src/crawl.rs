//! The crawl module extracts a brand context from an existing website: the
//! homepage plus a bounded number of same-site inner pages, folded into one
//! bounded string for the prompt composer.

use std::time::Duration;

use log::{error, info, warn};
use url::Url;

use crate::TextBy;
use crate::constants::{
    CONTEXT_HEADINGS_LIMIT, CONTEXT_PREVIEW_LIMIT, DEFAULT_MAX_CANDIDATE_LINKS,
    DEFAULT_MAX_INNER_PAGES, FETCH_TIMEOUT, USER_AGENT,
};
use crate::error::CrawlError;
use crate::page::BrandContext;
use crate::parse::{PageRecord, extract_internal_links, truncate_chars};

/// Limits and identity used while crawling a website.
#[derive(Clone, Debug)]
pub struct CrawlConfig {
    /// Inner pages actually fetched after the homepage.
    pub max_inner_pages: usize,
    /// Candidate links kept from the homepage. Never below `max_inner_pages`.
    pub max_candidate_links: usize,
    /// Timeout of each individual page fetch.
    pub timeout: Duration,
    pub user_agent: String,
    pub text_by: TextBy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_inner_pages: DEFAULT_MAX_INNER_PAGES,
            max_candidate_links: DEFAULT_MAX_CANDIDATE_LINKS,
            timeout: FETCH_TIMEOUT,
            user_agent: USER_AGENT.to_owned(),
            text_by: TextBy::default(),
        }
    }
}

impl CrawlConfig {
    /// Effective cap on discovered candidate links.
    pub fn candidate_cap(&self) -> usize {
        self.max_candidate_links.max(self.max_inner_pages)
    }
}

/// Crawls `url` and folds what it finds into a brand context.
///
/// Returns `None` when the homepage cannot be fetched; nothing else is
/// attempted in that case. Inner pages that fail are logged and skipped.
/// Pages appear in the context homepage first, then in link-discovery order.
pub async fn extract_brand_context(url: &Url, config: &CrawlConfig) -> Option<BrandContext> {
    info!("Extracting brand context from {url}");

    let client = match reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .build()
    {
        Ok(client) => client,
        Err(build_error) => {
            error!("Unable to build HTTP client: {build_error}");
            return None;
        }
    };

    let (homepage, html) = match fetch_page(&client, url, &config.text_by).await {
        Ok(fetched) => fetched,
        Err(crawl_error) => {
            warn!("Homepage unavailable, continuing without brand context: {crawl_error}");
            return None;
        }
    };

    let candidates = extract_internal_links(url, &html, config.candidate_cap());
    info!("Found {} candidate inner pages on {url}", candidates.len());

    let mut pages = vec![homepage];
    for link in candidates.into_iter().take(config.max_inner_pages) {
        info!("Crawling inner page: {link}");
        match fetch_page(&client, &link, &config.text_by).await {
            Ok((record, _)) => pages.push(record),
            Err(crawl_error) => warn!("Skipping inner page: {crawl_error}"),
        }
    }

    info!("Crawled {} pages from {url}", pages.len());
    Some(fold_brand_context(&pages))
}

/// Fetches one page and extracts its record, returning the raw HTML alongside.
async fn fetch_page(
    client: &reqwest::Client,
    url: &Url,
    text_by: &TextBy,
) -> Result<(PageRecord, String), CrawlError> {
    let request_error = |source| CrawlError::Request {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(CrawlError::Status {
            url: url.to_string(),
            status,
        });
    }

    let html = response.text().await.map_err(request_error)?;
    Ok((PageRecord::from_html(url.clone(), &html, text_by), html))
}

/// Folds page records into the labelled, bounded text blocks of a brand context.
pub fn fold_brand_context(pages: &[PageRecord]) -> BrandContext {
    let mut parts = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        if index == 0 {
            parts.push(format!("=== HOME PAGE ===\nURL: {}", page.url));
        } else {
            parts.push(format!("\n=== PAGE {index} ===\nURL: {}", page.url));
        }

        if let Some(title) = &page.title {
            parts.push(format!("Title: {title}"));
        }

        if let Some(description) = &page.description {
            parts.push(format!("Description: {description}"));
        }

        if !page.headings.h1.is_empty() {
            let headings: Vec<&str> = page
                .headings
                .h1
                .iter()
                .take(CONTEXT_HEADINGS_LIMIT)
                .map(String::as_str)
                .collect();
            parts.push(format!("Main Headings: {}", headings.join(", ")));
        }

        parts.push(format!(
            "Content Preview:\n{}",
            truncate_chars(&page.text, CONTEXT_PREVIEW_LIMIT)
        ));
    }

    BrandContext::new(parts.join("\n"))
}
