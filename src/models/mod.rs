use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Firm identity ─────────────────────────────────────────────────────────────

/// Exchange ticker ("nemónico"), e.g. `ALICORC1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FirmCode(String);

impl FirmCode {
    pub fn new(raw: &str) -> Option<Self> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() { None } else { Some(Self(code)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FirmCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the exchange's company directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirmListing {
    pub name: String,
    pub ticker: String,
}

// ── Date range ────────────────────────────────────────────────────────────────

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ── Raw scraped rows ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// The site renders blank values as a lone `&nbsp;`.
    Missing,
}

impl Cell {
    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Missing => None,
        }
    }
}

/// Cells of one `<tr>`; rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow(pub Vec<Cell>);

impl RawRow {
    pub fn get(&self, idx: usize) -> Option<&Cell> {
        self.0.get(idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Price history ─────────────────────────────────────────────────────────────

pub const HISTORY_HEADER: [&str; 10] = [
    "Trade Date",
    "Open",
    "Close",
    "High",
    "Low",
    "Average",
    "Traded Quantity",
    "Traded Amount (S/.)",
    "Previous Date",
    "Previous Close",
];

/// One trading day from the historical quotes page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceRecord {
    #[serde(rename = "Trade Date")]
    pub trade_date: Option<NaiveDate>,
    #[serde(rename = "Open")]
    pub open: Option<f64>,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
    #[serde(rename = "High")]
    pub high: Option<f64>,
    #[serde(rename = "Low")]
    pub low: Option<f64>,
    #[serde(rename = "Average")]
    pub average: Option<f64>,
    #[serde(rename = "Traded Quantity")]
    pub traded_quantity: Option<f64>,
    #[serde(rename = "Traded Amount (S/.)")]
    pub traded_amount: Option<f64>,
    #[serde(rename = "Previous Date")]
    pub previous_date: Option<NaiveDate>,
    #[serde(rename = "Previous Close")]
    pub previous_close: Option<f64>,
}

/// Price records restricted to a range and keyed by trade date.
///
/// Records keep their scrape order. The index maps each trade date to the
/// positions holding it, so a date scraped twice resolves to both rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    records: Vec<PriceRecord>,
    index: BTreeMap<NaiveDate, Vec<usize>>,
}

impl PriceTable {
    /// Keeps only records whose trade date lies within `range`.
    pub fn from_records(records: Vec<PriceRecord>, range: DateRange) -> Self {
        let records: Vec<PriceRecord> = records
            .into_iter()
            .filter(|r| r.trade_date.is_some_and(|d| range.contains(d)))
            .collect();

        let mut index: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (pos, r) in records.iter().enumerate() {
            if let Some(d) = r.trade_date {
                index.entry(d).or_default().push(pos);
            }
        }

        Self { records, index }
    }

    pub fn filter(&self, range: DateRange) -> Self {
        Self::from_records(self.records.clone(), range)
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Vec<&PriceRecord> {
        self.index
            .get(&date)
            .map(|positions| positions.iter().map(|&p| &self.records[p]).collect())
            .unwrap_or_default()
    }

    /// Distinct trade dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.index.keys().copied()
    }

    /// Trade dates present more than once.
    pub fn duplicate_dates(&self) -> Vec<NaiveDate> {
        self.index
            .iter()
            .filter(|(_, positions)| positions.len() > 1)
            .map(|(d, _)| *d)
            .collect()
    }
}

// ── Listing page snapshot ─────────────────────────────────────────────────────

/// The listing page's current-day table with its own header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastDayTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firm_code_normalised() {
        assert_eq!(FirmCode::new("  alicorc1 ").unwrap().as_str(), "ALICORC1");
        assert!(FirmCode::new("   ").is_none());
    }

    #[test]
    fn test_date_range_inclusive() {
        let start = NaiveDate::from_ymd_opt(2018, 9, 20).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 11, 20).unwrap();
        let range = DateRange::new(start, end);
        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(end.succ_opt().unwrap()));
        assert!(!range.contains(start.pred_opt().unwrap()));
    }
}
