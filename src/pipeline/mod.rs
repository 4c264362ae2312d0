//! Request handling: one browser session per command, result written to disk.
//!
//! Each request either produces its complete output file or nothing. A
//! navigation failure is reported with one generic connectivity message and
//! the session is force-closed before the error is returned.

use crate::config::AppConfig;
use crate::loader::{find_firm, load_directory};
use crate::models::{DateRange, FirmCode};
use crate::scraper::browser::ChromeDriver;
use crate::scraper::{BrowserSession, ScrapeError};
use crate::storage::{write_directory, write_last_day, write_price_table};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const CONNECTION_MESSAGE: &str =
    "Could not reach the expected page on the exchange website. Check your internet connection and try again.";

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn session(&self) -> Result<BrowserSession<ChromeDriver>> {
        BrowserSession::launch(&self.config.browser).map_err(|e| self.report(e))
    }

    /// Log the failure; navigation problems get the user-facing message.
    fn report(&self, e: ScrapeError) -> anyhow::Error {
        if e.is_navigation() {
            error!("{}", CONNECTION_MESSAGE);
        }
        anyhow::Error::new(e)
    }

    /// Scrape `firm` over `range` and write it to `out` (default
    /// `<downloads_dir>/<TICKER>.csv`).
    pub fn extract(&self, firm: &FirmCode, range: DateRange, out: Option<&Path>) -> Result<PathBuf> {
        if range.start > range.end {
            bail!("start date {} is after end date {}", range.start, range.end);
        }

        let firms = load_directory(&self.config.output.codes_path)?;
        match find_firm(&firms, firm) {
            Some(listing) => info!("{}: {}", firm, listing.name),
            None if firms.is_empty() => {}
            None => warn!("{} is not in {:?}", firm, self.config.output.codes_path),
        }

        let mut session = self.session()?;
        let table = match session.fetch_history(firm, range) {
            Ok(table) => table,
            Err(e) => {
                session.close();
                return Err(self.report(e))
                    .with_context(|| format!("History extraction for {} failed", firm));
            }
        };

        if table.is_empty() {
            warn!("{}: no trading days between {} and {}", firm, range.start, range.end);
        }

        let path = out
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output.history_path(firm.as_str()));
        write_price_table(&path, &table)?;
        Ok(path)
    }

    /// Today's listing table, written to `out`.
    pub fn latest(&self, out: &Path) -> Result<()> {
        let mut session = self.session()?;
        let table = session.fetch_last_day().map_err(|e| {
            session.close();
            self.report(e)
        })?;
        write_last_day(out, &table)
    }

    /// Refresh the firm directory at the configured `codes_path`.
    pub fn refresh_codes(&self) -> Result<PathBuf> {
        let mut session = self.session()?;
        let firms = session.fetch_directory().map_err(|e| {
            session.close();
            self.report(e)
        })?;
        if firms.is_empty() {
            bail!("The exchange directory listed no firms");
        }

        let path = self.config.output.codes_path.clone();
        write_directory(&path, &firms)?;
        Ok(path)
    }
}
