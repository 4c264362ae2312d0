use crate::models::{Cell, PriceRecord, RawRow, HISTORY_HEADER};
use chrono::NaiveDate;
use tracing::{debug, warn};

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Display format of every date on the quotes page.
const SITE_DATE_FORMAT: &str = "%d/%m/%Y";

/// "20/09/2018" → 2018-09-20. Missing or malformed cells give `None`.
pub fn normalize_date(cell: &Cell) -> Option<NaiveDate> {
    let text = cell.text()?.trim();
    match NaiveDate::parse_from_str(text, SITE_DATE_FORMAT) {
        Ok(d) => Some(d),
        Err(e) => {
            debug!("Unparseable date {:?}: {}", text, e);
            None
        }
    }
}

/// Dates typed by a user: ISO ("2018-09-20") or the site's "20/09/2018".
pub fn parse_input_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, SITE_DATE_FORMAT) {
        return Some(d);
    }

    None
}

// ── Numbers ───────────────────────────────────────────────────────────────────

/// Currency markers the quotes pages put in front of amounts.
const CURRENCY_PREFIXES: [&str; 4] = ["S/.", "S/", "US$", "$"];

/// Parse price: drop a leading currency marker, then strip everything
/// except digits, dot, minus.
/// "S/. 1,234.56" → 1234.56 | "10.60" → 10.6
pub fn parse_price(s: &str) -> Option<f64> {
    let mut s = s.trim();
    if let Some(rest) = CURRENCY_PREFIXES.iter().find_map(|p| s.strip_prefix(p)) {
        s = rest.trim_start();
    }
    if s.is_empty() || s == "-" || s == "\u{2014}" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

fn cell_number(row: &RawRow, idx: usize) -> Option<f64> {
    let text = row.get(idx)?.text()?;
    let value = parse_price(text);
    if value.is_none() {
        debug!("Non-numeric {} cell {:?}", HISTORY_HEADER[idx], text);
    }
    value
}

fn cell_date(row: &RawRow, idx: usize) -> Option<NaiveDate> {
    row.get(idx).and_then(normalize_date)
}

// ── Row → record ──────────────────────────────────────────────────────────────

/// Map cells positionally onto the ten history columns. Short rows leave the
/// trailing columns missing.
pub fn row_to_record(row: &RawRow) -> PriceRecord {
    if row.len() > HISTORY_HEADER.len() {
        warn!(
            "History row has {} cells, ignoring {} extra",
            row.len(),
            row.len() - HISTORY_HEADER.len()
        );
    }

    PriceRecord {
        trade_date: cell_date(row, 0),
        open: cell_number(row, 1),
        close: cell_number(row, 2),
        high: cell_number(row, 3),
        low: cell_number(row, 4),
        average: cell_number(row, 5),
        traded_quantity: cell_number(row, 6),
        traded_amount: cell_number(row, 7),
        previous_date: cell_date(row, 8),
        previous_close: cell_number(row, 9),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(
            normalize_date(&text("20/09/2018")),
            NaiveDate::from_ymd_opt(2018, 9, 20)
        );
    }

    #[test]
    fn test_normalize_missing_and_malformed() {
        assert_eq!(normalize_date(&Cell::Missing), None);
        assert_eq!(normalize_date(&text("2018-09-20")), None);
        assert_eq!(normalize_date(&text("31/02/2019")), None);
    }

    #[test]
    fn test_parse_input_date_both_formats() {
        let d = NaiveDate::from_ymd_opt(2019, 11, 20);
        assert_eq!(parse_input_date("2019-11-20"), d);
        assert_eq!(parse_input_date("20/11/2019"), d);
        assert_eq!(parse_input_date("Nov 20"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,234.56"), Some(1234.56));
        assert_eq!(parse_price("S/. 10.60"), Some(10.6));
        assert_eq!(parse_price("-"), None);
    }

    #[test]
    fn test_parse_price_currency_prefix() {
        assert_eq!(parse_price("S/. 1,234.56"), Some(1234.56));
        assert_eq!(parse_price("S/10.60"), Some(10.6));
        assert_eq!(parse_price("US$ 2.15"), Some(2.15));
        assert_eq!(parse_price("S/."), None);
    }

    #[test]
    fn test_row_to_record_full() {
        let row = RawRow(vec![
            text("20/09/2018"),
            text("10.50"),
            text("10.60"),
            text("10.70"),
            text("10.40"),
            text("10.55"),
            text("12,500"),
            text("131,875.00"),
            text("19/09/2018"),
            text("10.45"),
        ]);
        let rec = row_to_record(&row);
        assert_eq!(rec.trade_date, NaiveDate::from_ymd_opt(2018, 9, 20));
        assert_eq!(rec.close, Some(10.6));
        assert_eq!(rec.traded_quantity, Some(12_500.0));
        assert_eq!(rec.previous_date, NaiveDate::from_ymd_opt(2018, 9, 19));
        assert_eq!(rec.previous_close, Some(10.45));
    }

    #[test]
    fn test_row_to_record_short_row() {
        let row = RawRow(vec![text("20/09/2018"), Cell::Missing, text("10.60")]);
        let rec = row_to_record(&row);
        assert_eq!(rec.open, None);
        assert_eq!(rec.close, Some(10.6));
        assert_eq!(rec.previous_date, None);
        assert_eq!(rec.previous_close, None);
    }
}
