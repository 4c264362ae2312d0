//! Reads the firm directory saved by `bvl-history codes`.

use crate::models::{FirmCode, FirmListing};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Load `(name, ticker)` pairs. A missing file yields an empty list.
pub fn load_directory(path: &Path) -> Result<Vec<FirmListing>> {
    if !path.exists() {
        debug!("No firm directory at {:?}", path);
        return Ok(vec![]);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut firms = Vec::new();
    for (i, result) in reader.deserialize::<FirmListing>().enumerate() {
        match result {
            Ok(firm) => firms.push(firm),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    Ok(firms)
}

pub fn find_firm<'a>(firms: &'a [FirmListing], code: &FirmCode) -> Option<&'a FirmListing> {
    firms
        .iter()
        .find(|f| f.ticker.trim().eq_ignore_ascii_case(code.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::write_directory;

    #[test]
    fn test_directory_roundtrip_and_lookup() {
        let path = std::env::temp_dir()
            .join(format!("bvl_history_loader_{}", std::process::id()))
            .join("codes.csv");
        let firms = vec![
            FirmListing { name: "ALICORP S.A.A.".into(), ticker: "ALICORC1".into() },
            FirmListing { name: "UNION ANDINA DE CEMENTOS, S.A.A.".into(), ticker: "UNACEMC1".into() },
        ];
        write_directory(&path, &firms).unwrap();

        let loaded = load_directory(&path).unwrap();
        assert_eq!(loaded, firms);

        let code = FirmCode::new("unacemc1").unwrap();
        assert_eq!(find_firm(&loaded, &code).map(|f| f.name.as_str()), Some("UNION ANDINA DE CEMENTOS, S.A.A."));
        assert!(find_firm(&loaded, &FirmCode::new("XYZ").unwrap()).is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let firms = load_directory(Path::new("does/not/exist.csv")).unwrap();
        assert!(firms.is_empty());
    }
}
