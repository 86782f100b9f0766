use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::context::LANDING_DIR;
use crate::error::{Result, WebsiteChatError};

/// One page returned by a crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawledPage {
    pub success: bool,
    pub url: String,
    pub markdown: String,
}

/// Fetches a site and renders its pages to markdown.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Crawls outward from `base_url`, returning at most `max_pages` pages.
    /// Returns `WebsiteChatError::MissingBrowser` when the browser it drives
    /// is not installed.
    async fn crawl(&self, base_url: &str, max_pages: usize) -> Result<Vec<CrawledPage>>;

    async fn install_browser(&self) -> Result<()>;
}

fn strip_scheme(url: &str) -> &str {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    url.strip_prefix("www.").unwrap_or(url)
}

/// True when `candidate` lives under `base`, ignoring scheme and `www.`.
pub fn url_in_same_path(candidate: &str, base: &str) -> bool {
    strip_scheme(candidate).starts_with(strip_scheme(base))
}

pub fn page_file_name(url: &str) -> String {
    format!("{}.md", url.replace('/', "_"))
}

/// Writes successful pages under `base_url` to `doc_dir`, copying the page
/// at `base_url` itself into the landing directory. Returns the saved URLs,
/// deduplicated.
pub fn save_pages(pages: &[CrawledPage], base_url: &str, doc_dir: &Path) -> Result<Vec<String>> {
    let landing_dir = doc_dir.join(LANDING_DIR);
    fs::create_dir_all(&landing_dir)?;

    let mut saved = BTreeSet::new();
    for page in pages {
        if !page.success || !url_in_same_path(&page.url, base_url) {
            debug!("Not saving {}", page.url);
            continue;
        }

        let file_name = page_file_name(&page.url);
        fs::write(doc_dir.join(&file_name), &page.markdown)?;
        if page.url == base_url {
            fs::write(landing_dir.join(&file_name), &page.markdown)?;
        }
        saved.insert(page.url.clone());
    }

    Ok(saved.into_iter().collect())
}

async fn crawl_with_install(
    crawler: &dyn Crawler,
    url: &str,
    max_pages: usize,
) -> Result<Vec<CrawledPage>> {
    match crawler.crawl(url, max_pages).await {
        Err(WebsiteChatError::MissingBrowser(reason)) => {
            info!("Installing browser ({})", reason);
            crawler.install_browser().await?;
            crawler.crawl(url, max_pages).await
        }
        other => other,
    }
}

/// Crawls each seed URL and saves its pages into `doc_dir`. A missing
/// browser is installed once per seed before retrying.
pub async fn save_website_to_docs(
    crawler: &dyn Crawler,
    urls: &[String],
    max_pages: usize,
    doc_dir: &Path,
) -> Result<Vec<String>> {
    let mut saved = BTreeSet::new();

    for url in urls {
        info!("Crawling {}", url);
        let pages = crawl_with_install(crawler, url, max_pages).await?;
        saved.extend(save_pages(&pages, url, doc_dir)?);
    }

    info!("Saved {} pages to {}", saved.len(), doc_dir.display());
    Ok(saved.into_iter().collect())
}

/// Removes a previous crawl so the next one starts from an empty directory.
pub fn clean_doc_dir(doc_dir: &Path) -> Result<()> {
    if doc_dir.exists() {
        fs::remove_dir_all(doc_dir)?;
    }
    Ok(())
}
