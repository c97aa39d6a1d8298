//! SunSirs commodity snapshots.
//!
//! Two steps:
//! - the sector index page is scraped into a name -> product id catalog
//! - each product page is opened in headless Chrome and its price chart
//!   element is captured as a PNG
//!
//! The browser lives in a [`BrowserSession`] guard; dropping it shuts Chrome
//! down on every exit path.

use std::time::Duration;

use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use regex::Regex;
use reqwest::blocking::Client;
use std::sync::Arc;

use crate::data::{Snapshot, SnapshotSource};
use crate::error::AppError;
use crate::plot::ChartImage;

const CATALOG_URL: &str = "https://www.sunsirs.com/uk/sectors.html";
const PRODUCT_URL: &str = "https://www.sunsirs.com/uk/prodetail-";
const CHART_XPATH: &str = "//img[contains(@src, 'graph.100ppi.com')]";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const WINDOW_SIZE: (u32, u32) = (1920, 1080);
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(15);

/// Display scale of captured charts in the workbook.
pub const SNAPSHOT_SCALE: f64 = 1.3;

/// Commodity names and their SunSirs product ids, in page order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, u32)>,
}

impl Catalog {
    pub fn fetch(client: &Client) -> Result<Self, AppError> {
        log::info!("Loading SunSirs catalog from {CATALOG_URL}");
        let resp = client
            .get(CATALOG_URL)
            .send()
            .map_err(|e| AppError::data(format!("SunSirs catalog request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::data(format!(
                "SunSirs catalog request failed with status {}.",
                resp.status()
            )));
        }
        let html = resp
            .text()
            .map_err(|e| AppError::data(format!("Failed to read SunSirs catalog: {e}")))?;

        let catalog = Self::parse(&html)?;
        if catalog.is_empty() {
            return Err(AppError::data("SunSirs catalog lists no commodities."));
        }
        log::info!("SunSirs catalog has {} commodities", catalog.len());
        Ok(catalog)
    }

    /// Extract the `prodetail-{id}.html` links inside the `paddl10` sector
    /// blocks. Links elsewhere on the page (news, sidebars) are ignored.
    pub fn parse(html: &str) -> Result<Self, AppError> {
        let block = Regex::new(r#"(?is)<div\b[^>]*class\s*=\s*["'][^"']*\bpaddl10\b[^"']*["'][^>]*>(.*?)</div>"#)
            .map_err(|e| AppError::data(format!("Invalid sector pattern: {e}")))?;
        let link = Regex::new(r#"(?is)<a\b[^>]*href\s*=\s*["'][^"']*prodetail-(\d+)\.html["'][^>]*>(.*?)</a>"#)
            .map_err(|e| AppError::data(format!("Invalid catalog pattern: {e}")))?;
        let tags = Regex::new(r"(?s)<[^>]*>").map_err(|e| AppError::data(format!("Invalid tag pattern: {e}")))?;

        let mut catalog = Self::default();
        for sector in block.captures_iter(html) {
            let Some(body) = sector.get(1) else {
                continue;
            };
            for caps in link.captures_iter(body.as_str()) {
                let Ok(id) = caps[1].parse::<u32>() else {
                    continue;
                };
                let name = decode_entities(tags.replace_all(&caps[2], "").trim());
                if name.is_empty() {
                    continue;
                }
                match catalog.entries.iter_mut().find(|(n, _)| *n == name) {
                    Some(entry) => entry.1 = id,
                    None => catalog.entries.push((name, id)),
                }
            }
        }
        Ok(catalog)
    }

    /// Case-insensitive lookup; returns the catalog spelling and the id.
    pub fn lookup(&self, name: &str) -> Option<(&str, u32)> {
        let wanted = name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| n.to_lowercase() == wanted)
            .map(|(n, id)| (n.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub fn product_url(id: u32) -> String {
    format!("{PRODUCT_URL}{id}.html")
}

/// A running headless Chrome with one tab.
pub struct BrowserSession {
    // Field order matters: the tab goes before the browser.
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    pub fn launch() -> Result<Self, AppError> {
        log::info!("Starting headless browser");
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some(WINDOW_SIZE))
            .build()
            .map_err(|e| AppError::render(format!("Invalid browser options: {e}")))?;
        let browser =
            Browser::new(options).map_err(|e| AppError::render(format!("Failed to start headless browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::render(format!("Failed to open browser tab: {e}")))?;
        tab.set_default_timeout(ELEMENT_TIMEOUT);
        tab.set_user_agent(USER_AGENT, None, None)
            .map_err(|e| AppError::render(format!("Failed to set user agent: {e}")))?;
        Ok(Self { tab, _browser: browser })
    }

    /// Load `url` and screenshot the first element matching `xpath`.
    pub fn capture_element(&self, url: &str, xpath: &str) -> Result<Vec<u8>, AppError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| AppError::data(format!("Failed to load {url}: {e}")))?;
        let element = self
            .tab
            .wait_for_xpath(xpath)
            .map_err(|e| AppError::data(format!("Chart element not found on {url}: {e}")))?;
        element
            .capture_screenshot(CaptureScreenshotFormatOption::Png)
            .map_err(|e| AppError::render(format!("Failed to capture chart on {url}: {e}")))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        log::info!("Closing headless browser");
    }
}

/// Snapshot source backed by the SunSirs catalog and a browser session.
pub struct SunsirsSnapshots {
    catalog: Catalog,
    session: BrowserSession,
}

impl SunsirsSnapshots {
    /// Fetch the catalog, then start the browser.
    pub fn open() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        let catalog = Catalog::fetch(&client)?;
        let session = BrowserSession::launch()?;
        Ok(Self { catalog, session })
    }
}

impl SnapshotSource for SunsirsSnapshots {
    fn capture(&mut self, name: &str) -> Result<Snapshot, AppError> {
        let (title, id) = self
            .catalog
            .lookup(name)
            .ok_or_else(|| AppError::data(format!("No SunSirs commodity named '{name}'.")))?;
        log::info!("Capturing SunSirs chart for '{title}' (id {id})");

        let png = self.session.capture_element(&product_url(id), CHART_XPATH)?;
        Ok(Snapshot {
            title: title.to_string(),
            image: ChartImage::from_png(png, SNAPSHOT_SCALE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="paddl10">
          <a href="prodetail-1108.html">Coking coal</a>
          <a href='https://www.sunsirs.com/uk/prodetail-300.html'><span>Hot rolled coil</span></a>
          <a href="prodetail-12.html">  </a>
          <a href="sectors-3.html">Energy</a>
          <a class="x" href="prodetail-77.html">Fuel &amp; Oil</a>
        </div>"#;

    #[test]
    fn catalog_parses_product_links() {
        let catalog = Catalog::parse(PAGE).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("Coking coal"), Some(("Coking coal", 1108)));
        assert_eq!(catalog.lookup("Fuel & Oil"), Some(("Fuel & Oil", 77)));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = Catalog::parse(PAGE).unwrap();
        assert_eq!(catalog.lookup("HOT ROLLED COIL"), Some(("Hot rolled coil", 300)));
        assert_eq!(catalog.lookup("Iron ore"), None);
    }

    #[test]
    fn links_outside_sector_blocks_are_ignored() {
        let page = r#"
            <div class="paddl10"><a href="prodetail-1108.html">Gasoline</a></div>
            <div class="news"><a href="prodetail-9999.html">Gasoline</a></div>
            <a href="prodetail-4242.html">Diesel</a>"#;
        let catalog = Catalog::parse(page).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("Gasoline"), Some(("Gasoline", 1108)));
        assert_eq!(catalog.lookup("Diesel"), None);
    }

    #[test]
    fn product_urls() {
        assert_eq!(product_url(1108), "https://www.sunsirs.com/uk/prodetail-1108.html");
    }
}
