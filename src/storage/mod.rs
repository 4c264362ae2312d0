//! CSV output: price histories, latest-day snapshots and the firm directory.
//! A file is only created once the full table is in hand.

use crate::models::{FirmListing, LastDayTable, PriceTable, HISTORY_HEADER};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    Ok(())
}

/// Ten columns, trade date first; one line per record in table order.
pub fn write_price_table(path: &Path, table: &PriceTable) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(HISTORY_HEADER)?;
    for record in table.records() {
        writer
            .serialize(record)
            .with_context(|| format!("write row {:?}", record.trade_date))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {:?}", table.len(), path);
    Ok(())
}

/// Missing cells are written as empty fields; ragged rows stay ragged.
pub fn write_last_day(path: &Path, table: &LastDayTable) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.0.iter().map(|c| c.text().unwrap_or("")))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {:?}", table.rows.len(), path);
    Ok(())
}

pub fn write_directory(path: &Path, firms: &[FirmListing]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    for firm in firms {
        writer.serialize(firm)?;
    }
    writer.flush()?;

    info!("Wrote {} firms to {:?}", firms.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, DateRange, PriceRecord, RawRow};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bvl_history_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_price_table_csv() {
        let day = NaiveDate::from_ymd_opt(2018, 9, 20).unwrap();
        let record = PriceRecord {
            trade_date: Some(day),
            open: Some(6.0),
            close: Some(6.1),
            high: None,
            low: None,
            average: None,
            traded_quantity: Some(500.0),
            traded_amount: None,
            previous_date: None,
            previous_close: Some(5.95),
        };
        let table = PriceTable::from_records(vec![record], DateRange::new(day, day));
        let path = temp_path("ALICORC1.csv");

        write_price_table(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Trade Date,Open,Close,High,Low,Average,Traded Quantity,Traded Amount (S/.),Previous Date,Previous Close")
        );
        assert_eq!(lines.next(), Some("2018-09-20,6.0,6.1,,,,500.0,,,5.95"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_price_table_still_has_header() {
        let path = temp_path("empty.csv");
        let table = PriceTable::default();
        assert!(table.is_empty());
        write_price_table(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.lines().next().unwrap().split(',').count(), 10);
    }

    #[test]
    fn test_last_day_csv() {
        let table = LastDayTable {
            headers: vec!["Empresa".into(), "Moneda".into()],
            rows: vec![RawRow(vec![Cell::Text("ALICORP".into()), Cell::Missing])],
        };
        let path = temp_path("latest.csv");
        write_last_day(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Empresa,Moneda\nALICORP,\n");
    }
}
