use crate::models::{Cell, FirmCode, FirmListing, LastDayTable, RawRow};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Rows above the data in every `.Tablas` table: a title row and the header row.
pub const HEADER_ROWS: usize = 2;

const NBSP: &str = "\u{a0}";

// ── Table rows ────────────────────────────────────────────────────────────────

/// One `RawRow` per `<tr>`. A lone `&nbsp;` cell becomes `Cell::Missing`,
/// an empty cell is dropped, anything else is kept verbatim.
pub fn parse_rows<'a>(rows: impl IntoIterator<Item = ElementRef<'a>>) -> Vec<RawRow> {
    let Ok(td_sel) = Selector::parse("td") else { return vec![] };

    rows.into_iter()
        .map(|tr| {
            let cells = tr
                .select(&td_sel)
                .filter_map(|td| {
                    let value: String = td.text().collect();
                    match value.as_str() {
                        NBSP => Some(Cell::Missing),
                        "" => None,
                        _ => Some(Cell::Text(value)),
                    }
                })
                .collect();
            RawRow(cells)
        })
        .collect()
}

/// Parse a table's outer HTML, skipping the first `skip` rows.
pub fn parse_table(html: &str, skip: usize) -> Vec<RawRow> {
    let doc = Html::parse_fragment(html);
    let Ok(tr_sel) = Selector::parse("tr") else { return vec![] };

    parse_rows(doc.select(&tr_sel).skip(skip))
}

// ── Listing page ──────────────────────────────────────────────────────────────

/// Column titles from the header row (the second `<tr>`).
pub fn parse_header_row(html: &str) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    let Ok(tr_sel) = Selector::parse("tr") else { return vec![] };
    let Ok(th_sel) = Selector::parse("th") else { return vec![] };

    doc.select(&tr_sel)
        .nth(1)
        .map(|tr| {
            tr.select(&th_sel)
                .map(|th| th.text().collect::<String>().trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// The current-day table. The site's header has no title for the currency
/// column, so `Moneda` is inserted at position 4.
pub fn parse_last_day(html: &str) -> LastDayTable {
    let mut headers = parse_header_row(html);
    let at = headers.len().min(4);
    headers.insert(at, "Moneda".to_string());

    LastDayTable {
        headers,
        rows: parse_table(html, HEADER_ROWS),
    }
}

/// Link text (second cell) of the data row whose ticker cell (third cell)
/// equals `firm`. `None` until the filtered listing shows that firm.
pub fn parse_filtered_link(html: &str, firm: &FirmCode) -> Option<String> {
    let doc = Html::parse_fragment(html);
    let tr_sel = Selector::parse("tr").ok()?;
    let td_sel = Selector::parse("td").ok()?;

    doc.select(&tr_sel).skip(HEADER_ROWS).find_map(|tr| {
        let cells: Vec<String> = tr
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        let ticker = cells.get(2)?;
        let link = cells.get(1)?;
        if ticker.eq_ignore_ascii_case(firm.as_str()) && !link.is_empty() {
            Some(link.clone())
        } else {
            None
        }
    })
}

/// `(name, ticker)` pairs from the full company directory. Only firms whose
/// name is rendered as a link have a quotes page, so the rest are dropped.
pub fn parse_firm_directory(html: &str) -> Vec<FirmListing> {
    let doc = Html::parse_fragment(html);
    let Ok(tr_sel) = Selector::parse("tr") else { return vec![] };
    let Ok(td_sel) = Selector::parse("td") else { return vec![] };
    let Ok(a_sel) = Selector::parse("a") else { return vec![] };

    let linked: HashSet<String> = doc
        .select(&a_sel)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .collect();

    doc.select(&tr_sel)
        .skip(HEADER_ROWS)
        .filter_map(|tr| {
            let cells: Vec<String> = tr
                .select(&td_sel)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect();
            let name = cells.get(1)?.clone();
            let ticker = cells.get(2)?.clone();
            if ticker.is_empty() || !linked.contains(&name) {
                return None;
            }
            Some(FirmListing { name, ticker })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = r#"
        <table class="Tablas">
          <tr><th colspan="10">ALICORP S.A.A.</th></tr>
          <tr><th>Fecha</th><th>Apertura</th><th>Cierre</th></tr>
          <tr><td>20/09/2018</td><td>10.50</td><td>10.60</td></tr>
          <tr><td>19/09/2018</td><td>&nbsp;</td><td>10.40</td></tr>
          <tr><td>18/09/2018</td><td></td><td>10.30</td></tr>
          <tr></tr>
        </table>"#;

    #[test]
    fn test_row_count_matches_input() {
        let rows = parse_table(HISTORY, HEADER_ROWS);
        assert_eq!(rows.len(), 4);
        assert!(rows[3].is_empty());
    }

    #[test]
    fn test_nbsp_becomes_missing() {
        let rows = parse_table(HISTORY, HEADER_ROWS);
        assert_eq!(
            rows[1].0,
            vec![
                Cell::Text("19/09/2018".into()),
                Cell::Missing,
                Cell::Text("10.40".into()),
            ]
        );
    }

    #[test]
    fn test_empty_cell_is_omitted() {
        let rows = parse_table(HISTORY, HEADER_ROWS);
        assert_eq!(
            rows[2].0,
            vec![Cell::Text("18/09/2018".into()), Cell::Text("10.30".into())]
        );
    }

    #[test]
    fn test_text_is_verbatim() {
        let html = "<table><tr><td> 1,234.50 </td></tr></table>";
        let rows = parse_table(html, 0);
        assert_eq!(rows[0].0, vec![Cell::Text(" 1,234.50 ".into())]);
    }

    #[test]
    fn test_parse_last_day_inserts_currency() {
        let html = r#"<table>
            <tr><th>Resumen</th></tr>
            <tr><th>Empresa</th><th>Nemónico</th><th>Sector</th><th>Segm.</th><th>Ant.</th></tr>
            <tr><td>ALICORP</td><td>ALICORC1</td><td>IND</td><td>RV1</td><td>S/</td><td>7.10</td></tr>
        </table>"#;
        let table = parse_last_day(html);
        assert_eq!(
            table.headers,
            vec!["Empresa", "Nemónico", "Sector", "Segm.", "Moneda", "Ant."]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), 6);
    }

    #[test]
    fn test_parse_filtered_link() {
        let html = r##"<table>
            <tr><th>x</th></tr><tr><th>y</th></tr>
            <tr><td></td><td><a href="#">ALICORP S.A.A.</a></td><td>ALICORC1</td></tr>
        </table>"##;
        let firm = FirmCode::new("ALICORC1").unwrap();
        assert_eq!(parse_filtered_link(html, &firm).as_deref(), Some("ALICORP S.A.A."));
    }

    #[test]
    fn test_parse_filtered_link_skips_other_firms() {
        let html = r#"<table>
            <tr><th>x</th></tr><tr><th>y</th></tr>
            <tr><td></td><td><a href="a">BACKUS</a></td><td>BACKUSI1</td></tr>
            <tr><td></td><td><a href="b">ALICORP S.A.A.</a></td><td>ALICORC1</td></tr>
        </table>"#;
        let alicorp = FirmCode::new("alicorc1").unwrap();
        let unknown = FirmCode::new("NOPE1").unwrap();
        assert_eq!(parse_filtered_link(html, &alicorp).as_deref(), Some("ALICORP S.A.A."));
        assert_eq!(parse_filtered_link(html, &unknown), None);
    }

    #[test]
    fn test_parse_filtered_link_no_match() {
        let html = "<table><tr><th>x</th></tr><tr><th>y</th></tr></table>";
        let firm = FirmCode::new("ALICORC1").unwrap();
        assert_eq!(parse_filtered_link(html, &firm), None);
    }

    #[test]
    fn test_parse_firm_directory_keeps_linked_names() {
        let html = r#"<table>
            <tr><th>Empresas</th></tr>
            <tr><th></th><th>Nombre</th><th>Nemónico</th></tr>
            <tr><td>1</td><td><a href="a">ALICORP S.A.A.</a></td><td>ALICORC1</td></tr>
            <tr><td>2</td><td>SIN COTIZACION S.A.</td><td>SINCOT1</td></tr>
            <tr><td>3</td><td><a href="b">BACKUS</a></td><td>BACKUSI1</td></tr>
        </table>"#;
        let firms = parse_firm_directory(html);
        assert_eq!(
            firms,
            vec![
                FirmListing { name: "ALICORP S.A.A.".into(), ticker: "ALICORC1".into() },
                FirmListing { name: "BACKUS".into(), ticker: "BACKUSI1".into() },
            ]
        );
    }
}
