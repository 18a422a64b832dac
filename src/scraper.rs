use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ScrapingConfig, SiteConfig};

const BLOCK_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li"];
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// A module landing page: its title, its own text, and the units it links to.
#[derive(Debug, Clone)]
pub struct ModulePage {
    pub url: Url,
    pub title: String,
    pub content: String,
    pub units: Vec<Url>,
}

/// One fetched unit, still raw extracted text.
#[derive(Debug, Clone)]
pub struct CourseUnit {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub content: String,
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("Invalid CSS selector {:?}: {:?}", s, e))
}

/// Selector-based extraction over parsed HTML. Holds no I/O.
pub struct PageParser {
    unit_link: Selector,
    any_link: Selector,
    content: Vec<Selector>,
    title: Vec<Selector>,
    title_tag: Selector,
    blocks: Selector,
    fallback_title: String,
    min_block_length: usize,
    max_fallback_units: usize,
}

impl PageParser {
    pub fn new(site: &SiteConfig, max_fallback_units: usize) -> Result<Self> {
        Ok(Self {
            unit_link: parse_selector(&site.unit_link_selector)?,
            any_link: parse_selector("a[href]")?,
            content: site
                .content_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_>>()?,
            title: site
                .title_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_>>()?,
            title_tag: parse_selector("title")?,
            blocks: parse_selector(&BLOCK_TAGS.join(", "))?,
            fallback_title: site.fallback_title.clone(),
            min_block_length: site.min_block_length,
            max_fallback_units,
        })
    }

    pub fn parse_module(&self, html: &str, url: &Url) -> ModulePage {
        let doc = Html::parse_document(html);
        let mut units = self.unit_links(&doc, url);
        if units.is_empty() {
            units = self.fallback_unit_links(&doc, url);
            debug!(count = units.len(), "No unit-title links, used href heuristic");
        }
        ModulePage {
            url: url.clone(),
            title: self.extract_title(&doc),
            content: self.extract_main_content(&doc),
            units,
        }
    }

    /// Title and readable text of a single page.
    pub fn parse_unit(&self, html: &str) -> (String, String) {
        let doc = Html::parse_document(html);
        (self.extract_title(&doc), self.extract_main_content(&doc))
    }

    pub fn extract_title(&self, doc: &Html) -> String {
        self.title
            .iter()
            .chain(std::iter::once(&self.title_tag))
            .filter_map(|sel| doc.select(sel).next())
            .map(|el| collapse_text(&el))
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| self.fallback_title.clone())
    }

    /// Newline-joined text blocks of the main content area. Headings are
    /// surrounded by blank lines so they stand alone downstream.
    pub fn extract_main_content(&self, doc: &Html) -> String {
        let root = self
            .content
            .iter()
            .find_map(|sel| doc.select(sel).next())
            .unwrap_or_else(|| doc.root_element());

        let mut parts = Vec::new();
        for el in root.select(&self.blocks) {
            if has_block_ancestor(&el, &root) {
                continue;
            }
            let text = collapse_text(&el);
            if text.chars().count() <= self.min_block_length {
                continue;
            }
            if HEADING_TAGS.contains(&el.value().name()) {
                parts.push(format!("\n\n{}\n", text));
            } else {
                parts.push(text);
            }
        }
        parts.join("\n")
    }

    /// Anchors explicitly marked as unit links, in page order.
    pub fn unit_links(&self, doc: &Html, base: &Url) -> Vec<Url> {
        let mut units: Vec<Url> = Vec::new();
        for a in doc.select(&self.unit_link) {
            let Some(href) = a.value().attr("href") else { continue };
            if let Ok(full) = base.join(href) {
                if !units.contains(&full) {
                    units.push(full);
                }
            }
        }
        units
    }

    /// Any link that looks like a unit path, excluding the page itself.
    pub fn fallback_unit_links(&self, doc: &Html, base: &Url) -> Vec<Url> {
        let mut units: Vec<Url> = Vec::new();
        for a in doc.select(&self.any_link) {
            let Some(href) = a.value().attr("href") else { continue };
            if !(href.contains("unit-") || href.contains("/units/")) {
                continue;
            }
            if let Ok(full) = base.join(href) {
                if &full != base && !units.contains(&full) {
                    units.push(full);
                }
            }
        }
        units.truncate(self.max_fallback_units);
        units
    }
}

fn collapse_text(el: &ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Nested blocks (a `p` inside an `li`) are already covered by their parent's text.
fn has_block_ancestor(el: &ElementRef, root: &ElementRef) -> bool {
    el.ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|a| BLOCK_TAGS.contains(&a.value().name()))
}

/// HTTP side of page retrieval. Retries throttled and failing requests with
/// exponential backoff; parsing is delegated to [`PageParser`].
pub struct CourseScraper {
    client: reqwest::Client,
    parser: PageParser,
    max_retries: u32,
    base_backoff: Duration,
    request_delay: Duration,
}

impl CourseScraper {
    pub fn new(scraping: &ScrapingConfig, site: &SiteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&scraping.accept_language).context("Invalid Accept-Language")?,
        );

        let client = reqwest::Client::builder()
            .user_agent(scraping.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(scraping.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            parser: PageParser::new(site, scraping.max_units_per_module)?,
            max_retries: scraping.max_retries,
            base_backoff: Duration::from_millis(scraping.base_backoff_ms),
            request_delay: Duration::from_millis(scraping.request_delay_ms),
        })
    }

    /// GET a page body, retrying on 429, 5xx, timeouts and connection errors.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            let reason = match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .text()
                        .await
                        .with_context(|| format!("Failed to read body of {}", url));
                }
                Ok(resp) => {
                    let status = resp.status();
                    if !is_retryable(status) || attempt >= self.max_retries {
                        bail!("{} returned HTTP {}", url, status);
                    }
                    format!("HTTP {}", status)
                }
                Err(e) => {
                    if !(e.is_timeout() || e.is_connect()) || attempt >= self.max_retries {
                        return Err(e).with_context(|| format!("Failed to fetch {}", url));
                    }
                    e.to_string()
                }
            };

            let backoff = self.base_backoff * 2u32.pow(attempt);
            warn!(
                "{} on {} (attempt {}/{}), backing off {:.1}s",
                reason,
                url,
                attempt + 1,
                self.max_retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    pub async fn fetch_module(&self, url: &str) -> Result<ModulePage> {
        let base = Url::parse(url).with_context(|| format!("Invalid module URL {}", url))?;
        info!("Fetching module page: {}", url);
        let html = self.fetch(url).await?;
        let page = self.parser.parse_module(&html, &base);
        info!("Module {:?}: {} units", page.title, page.units.len());
        Ok(page)
    }

    pub async fn fetch_unit(&self, index: usize, url: &Url) -> Result<CourseUnit> {
        let html = self.fetch(url.as_str()).await?;
        let (title, content) = self.parser.parse_unit(&html);
        Ok(CourseUnit {
            index,
            url: url.to_string(),
            title,
            content,
        })
    }

    /// Fetch units one at a time, pausing between requests. Failed units are
    /// logged and skipped; indices stay tied to the module's unit order.
    pub async fn fetch_units(&self, units: &[Url]) -> Result<Vec<CourseUnit>> {
        let pb = ProgressBar::new(units.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} units ({eta})")?
                .progress_chars("=> "),
        );

        let mut fetched = Vec::with_capacity(units.len());
        for (i, url) in units.iter().enumerate() {
            tokio::time::sleep(self.request_delay).await;
            match self.fetch_unit(i + 1, url).await {
                Ok(unit) => {
                    debug!(index = unit.index, chars = unit.content.len(), "Fetched {}", unit.title);
                    fetched.push(unit);
                }
                Err(e) => warn!("Skipping unit {} ({}): {:#}", i + 1, url, e),
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!("Fetched {} of {} units", fetched.len(), units.len());
        Ok(fetched)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

// ── Tests ──
