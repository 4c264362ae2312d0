//! Walks the BVL site from the alphabetical listing to a firm's historical
//! quotes page. Every selector tied to the site's markup lives here, so a
//! redesign touches this module only.

use crate::models::FirmCode;
use crate::scraper::browser::{poll_html, Driver, Locator};
use crate::scraper::error::{Result, ScrapeError};
use crate::scraper::parsers::parse_filtered_link;
use tracing::{debug, info};

pub const DATA_TABLE: &str = ".Tablas";
pub const SEARCH_FIELD: &str = "input[name='textNemonico']";
pub const FILTER_BUTTON: &str = "#divBloqueGris img";
pub const ALL_FIRMS: &str = ".todas";
pub const HISTORY_LINK: &str = "Histórico de cotizaciones";
pub const START_MONTH: &str = "#mesIni";
pub const START_YEAR: &str = "#anoIni";
pub const SEARCH_BUTTON: &str = "[name='button']";

pub struct FirmNavigator<'a, D: Driver> {
    driver: &'a mut D,
}

impl<'a, D: Driver> FirmNavigator<'a, D> {
    pub fn new(driver: &'a mut D) -> Self {
        Self { driver }
    }

    /// From the open listing page, land on `firm`'s historical quotes page.
    pub fn open_history(&mut self, firm: &FirmCode) -> Result<()> {
        info!("{}: locating firm on listing page", firm);

        self.driver.type_text(&Locator::css(SEARCH_FIELD), firm.as_str())?;
        self.driver.click(&Locator::css(FILTER_BUTTON))?;

        // The unfiltered listing uses the same table, so wait for a row that
        // carries this ticker rather than for the table itself.
        let link_text = poll_html(&mut *self.driver, &Locator::css(DATA_TABLE), |html| {
            parse_filtered_link(html, firm)
        })?
        .ok_or_else(|| {
            ScrapeError::navigation(
                "filter listing",
                format!("no firm matched ticker {}", firm),
            )
        })?;
        debug!("{}: following firm link {:?}", firm, link_text);

        self.driver.click(&Locator::link(&link_text))?;
        self.driver.wait_for(&Locator::link(HISTORY_LINK))?;

        self.driver.click(&Locator::link(HISTORY_LINK))?;
        self.driver.wait_for(&Locator::css(START_MONTH))?;

        info!("{}: on historical quotes page", firm);
        Ok(())
    }

    /// Expand the listing to every firm, for the directory scrape.
    pub fn show_all_firms(&mut self) -> Result<()> {
        self.driver.click(&Locator::css(ALL_FIRMS))?;
        self.driver.wait_for(&Locator::css(DATA_TABLE))
    }
}
