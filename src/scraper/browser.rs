use crate::config::BrowserConfig;
use crate::scraper::error::{Result, ScrapeError};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ── Locators ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// An `<a>` whose whitespace-normalised text equals the given string.
    LinkText(String),
}

impl Locator {
    pub fn css(s: &str) -> Self {
        Locator::Css(s.to_string())
    }

    pub fn link(text: &str) -> Self {
        Locator::LinkText(text.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{}", s),
            Locator::XPath(s) => write!(f, "xpath:{}", s),
            Locator::LinkText(s) => write!(f, "link:{}", s),
        }
    }
}

/// Quote `s` as an XPath 1.0 string literal. XPath has no escapes, so a
/// string holding both quote kinds is spliced together with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

// ── Driver seam ───────────────────────────────────────────────────────────────

/// The handful of browser actions the BVL navigation needs.
///
/// Every lookup waits for the element to appear, bounded by the configured
/// timeout; an element that never shows up is a `ScrapeError::Navigation`.
pub trait Driver {
    fn open(&mut self, url: &str) -> Result<()>;
    fn wait_for(&mut self, locator: &Locator) -> Result<()>;
    fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()>;
    fn click(&mut self, locator: &Locator) -> Result<()>;
    /// Pick the `<option>` with `value` in a `<select>`; fails when the
    /// option is not offered.
    fn select_value(&mut self, locator: &Locator, value: &str) -> Result<()>;
    fn outer_html(&mut self, locator: &Locator) -> Result<String>;
    /// Bound on any single readiness wait.
    fn wait_timeout(&self) -> Duration;
    /// Shut the browser down. Must tolerate being called more than once.
    fn quit(&mut self);
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Re-read `locator`'s outer HTML until `ready` accepts it. Gives `Ok(None)`
/// once `wait_timeout` elapses without a match; lookup errors propagate.
pub fn poll_html<D: Driver, T>(
    driver: &mut D,
    locator: &Locator,
    mut ready: impl FnMut(&str) -> Option<T>,
) -> Result<Option<T>> {
    let deadline = Instant::now() + driver.wait_timeout();
    loop {
        let html = driver.outer_html(locator)?;
        if let Some(found) = ready(&html) {
            return Ok(Some(found));
        }
        if Instant::now() >= deadline {
            debug!("Gave up waiting on {}", locator);
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

// ── headless_chrome ───────────────────────────────────────────────────────────

const SELECT_OPTION_JS: &str = r#"function (value) {
    const option = Array.from(this.options).find(o => o.value == value);
    if (!option) { return false; }
    this.value = option.value;
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
}"#;

pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    wait: Duration,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        info!("Launching Chrome (headless={})", config.headless);

        let options = LaunchOptions {
            headless: config.headless,
            sandbox: config.sandbox,
            path: config.chrome_path.clone(),
            window_size: Some((1280, 1024)),
            idle_browser_timeout: Duration::from_secs(config.wait_secs.max(1) * 12),
            ..Default::default()
        };

        let browser = Browser::new(options)
            .map_err(|e| ScrapeError::Browser(format!("failed to launch Chrome: {:#}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(format!("failed to open tab: {:#}", e)))?;
        tab.set_default_timeout(config.wait());

        Ok(Self {
            browser: Some(browser),
            tab,
            wait: config.wait(),
        })
    }

    fn find(&self, locator: &Locator) -> Result<Element<'_>> {
        debug!("Waiting for {}", locator);
        let found = match locator {
            Locator::Css(css) => self.tab.wait_for_element_with_custom_timeout(css, self.wait),
            Locator::XPath(xpath) => self.tab.wait_for_xpath_with_custom_timeout(xpath, self.wait),
            Locator::LinkText(text) => {
                let xpath = format!("//a[normalize-space(.)={}]", xpath_literal(text));
                self.tab.wait_for_xpath_with_custom_timeout(&xpath, self.wait)
            }
        };
        found.map_err(|e| ScrapeError::navigation(locator.to_string(), format!("{:#}", e)))
    }
}

impl Driver for ChromeDriver {
    fn open(&mut self, url: &str) -> Result<()> {
        info!("Opening {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ScrapeError::navigation(url, format!("{:#}", e)))?;
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator) -> Result<()> {
        self.find(locator).map(|_| ())
    }

    fn type_text(&mut self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.find(locator)?;
        element
            .type_into(text)
            .map_err(|e| ScrapeError::navigation(locator.to_string(), format!("{:#}", e)))?;
        Ok(())
    }

    fn click(&mut self, locator: &Locator) -> Result<()> {
        debug!("Clicking {}", locator);
        let element = self.find(locator)?;
        element
            .click()
            .map_err(|e| ScrapeError::navigation(locator.to_string(), format!("{:#}", e)))?;
        // Returns at once when the click did not trigger a page load.
        self.tab
            .wait_until_navigated()
            .map_err(|e| ScrapeError::navigation(locator.to_string(), format!("{:#}", e)))?;
        Ok(())
    }

    fn select_value(&mut self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.find(locator)?;
        let selected = element
            .call_js_fn(SELECT_OPTION_JS, vec![serde_json::json!(value)], false)
            .map_err(|e| ScrapeError::navigation(locator.to_string(), format!("{:#}", e)))?;

        match selected.value {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            _ => Err(ScrapeError::navigation(
                locator.to_string(),
                format!("option {:?} is not available", value),
            )),
        }
    }

    fn outer_html(&mut self, locator: &Locator) -> Result<String> {
        let element = self.find(locator)?;
        element
            .get_content()
            .map_err(|e| ScrapeError::navigation(locator.to_string(), format!("{:#}", e)))
    }

    fn wait_timeout(&self) -> Duration {
        self.wait
    }

    fn quit(&mut self) {
        if let Some(browser) = self.browser.take() {
            let _ = self.tab.close(false);
            drop(browser);
            info!("Chrome closed");
        }
    }
}

// ── Scripted driver for tests ─────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xpath_literal() {
        assert_eq!(xpath_literal("Histórico de cotizaciones"), "'Histórico de cotizaciones'");
        assert_eq!(xpath_literal("O'Neil"), "\"O'Neil\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("#mesIni").to_string(), "css:#mesIni");
        assert_eq!(Locator::link("ALICORP").to_string(), "link:ALICORP");
    }
}
