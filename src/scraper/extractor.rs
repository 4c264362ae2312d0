use crate::models::{DateRange, FirmCode, PriceTable, RawRow};
use crate::scraper::browser::{poll_html, Driver, Locator};
use crate::scraper::cleaner::row_to_record;
use crate::scraper::error::Result;
use crate::scraper::navigator::{DATA_TABLE, SEARCH_BUTTON, START_MONTH, START_YEAR};
use crate::scraper::parsers::{parse_table, HEADER_ROWS};
use chrono::Datelike;
use tracing::{info, warn};

pub struct RangeExtractor<'a, D: Driver> {
    driver: &'a mut D,
}

impl<'a, D: Driver> RangeExtractor<'a, D> {
    pub fn new(driver: &'a mut D) -> Self {
        Self { driver }
    }

    /// On a firm's quotes page: read the default (trailing month) table,
    /// switch the start month/year to `range.start`, read again, and
    /// assemble both into one table.
    pub fn extract(&mut self, firm: &FirmCode, range: DateRange) -> Result<PriceTable> {
        let recent_html = self.driver.outer_html(&Locator::css(DATA_TABLE))?;
        let recent = parse_table(&recent_html, HEADER_ROWS);
        info!("{}: {} rows in default view", firm, recent.len());

        self.driver
            .select_value(&Locator::css(START_MONTH), &range.start.month().to_string())?;
        self.driver
            .select_value(&Locator::css(START_YEAR), &range.start.year().to_string())?;
        self.driver.click(&Locator::css(SEARCH_BUTTON))?;

        // The search may redraw the table in place; wait until it differs
        // from the default view. A range inside the trailing month can
        // legitimately render the same table, so expiry is not an error.
        let changed = poll_html(&mut *self.driver, &Locator::css(DATA_TABLE), |html| {
            (html != recent_html).then(|| html.to_string())
        })?;
        let ranged_html = match changed {
            Some(html) => html,
            None => {
                warn!("{}: table unchanged after search, using it as shown", firm);
                self.driver.outer_html(&Locator::css(DATA_TABLE))?
            }
        };

        let ranged = parse_table(&ranged_html, HEADER_ROWS);
        info!("{}: {} rows since {}/{}", firm, ranged.len(), range.start.month(), range.start.year());

        let table = assemble(recent, ranged, range);
        let dupes = table.duplicate_dates();
        if !dupes.is_empty() {
            warn!("{}: {} trade dates appear more than once: {:?}", firm, dupes.len(), dupes);
        }
        info!("{}: {} rows between {} and {}", firm, table.len(), range.start, range.end);
        Ok(table)
    }
}

/// Default-view rows first, then the ranged view. Overlapping days are kept
/// twice; only the date filter is applied.
pub fn assemble(recent: Vec<RawRow>, ranged: Vec<RawRow>, range: DateRange) -> PriceTable {
    let records = recent
        .iter()
        .chain(ranged.iter())
        .map(row_to_record)
        .collect();
    PriceTable::from_records(records, range)
}
