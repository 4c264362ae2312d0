use crate::config::BrowserConfig;
use crate::models::{DateRange, FirmCode, FirmListing, LastDayTable, PriceTable};
use crate::scraper::browser::{ChromeDriver, Driver, Locator};
use crate::scraper::error::{Result, ScrapeError};
use crate::scraper::extractor::RangeExtractor;
use crate::scraper::navigator::{FirmNavigator, DATA_TABLE};
use crate::scraper::parsers::{parse_firm_directory, parse_last_day};
use tracing::{debug, info};

/// One browser, opened on the exchange listing page, used for a single
/// request and then closed for good.
pub struct BrowserSession<D: Driver> {
    driver: Option<D>,
}

impl BrowserSession<ChromeDriver> {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let url = config
            .validated_url()
            .map_err(|e| ScrapeError::Browser(format!("{:#}", e)))?;
        let driver = ChromeDriver::launch(config)?;
        Self::open(driver, url.as_str())
    }
}

impl<D: Driver> BrowserSession<D> {
    /// Take ownership of `driver` and point it at `url`. The driver is shut
    /// down if the page cannot be opened.
    pub fn open(driver: D, url: &str) -> Result<Self> {
        let mut session = Self { driver: Some(driver) };
        session.driver()?.open(url)?;
        Ok(session)
    }

    fn driver(&mut self) -> Result<&mut D> {
        self.driver.as_mut().ok_or(ScrapeError::SessionClosed)
    }

    /// Run `work` against the driver, then close the session whatever the
    /// outcome.
    fn run_once<T>(&mut self, work: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        let result = self.driver().and_then(work);
        self.close();
        result
    }

    /// Price history of `firm` restricted to `range`.
    pub fn fetch_history(&mut self, firm: &FirmCode, range: DateRange) -> Result<PriceTable> {
        self.run_once(|driver| {
            FirmNavigator::new(driver).open_history(firm)?;
            RangeExtractor::new(driver).extract(firm, range)
        })
    }

    /// Today's table from the listing page.
    pub fn fetch_last_day(&mut self) -> Result<LastDayTable> {
        self.run_once(|driver| {
            let html = driver.outer_html(&Locator::css(DATA_TABLE))?;
            let table = parse_last_day(&html);
            info!("Latest day: {} rows, {} columns", table.rows.len(), table.headers.len());
            Ok(table)
        })
    }

    /// Every firm with a quotes page, as `(name, ticker)`.
    pub fn fetch_directory(&mut self) -> Result<Vec<FirmListing>> {
        self.run_once(|driver| {
            FirmNavigator::new(driver).show_all_firms()?;
            let html = driver.outer_html(&Locator::css(DATA_TABLE))?;
            let firms = parse_firm_directory(&html);
            info!("Directory: {} firms with quotes", firms.len());
            Ok(firms)
        })
    }

    /// Force-close the browser. Safe to call any number of times.
    pub fn close(&mut self) {
        match self.driver.take() {
            Some(mut driver) => driver.quit(),
            None => debug!("Session already closed"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }
}

impl<D: Driver> Drop for BrowserSession<D> {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.close();
        }
    }
}
