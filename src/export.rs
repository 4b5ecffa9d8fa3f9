use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{EtlError, Result};
use crate::model::{ConvertedBankRecord, OUTPUT_COLUMNS};

// ── CSV export ──

/// Write the dataset as CSV with a leading unnamed 0-based index column.
///
/// The file is written beside the target and renamed over it, so a failed
/// write leaves the previous run's file intact.
pub fn write_csv(path: &Path, records: &[ConvertedBankRecord]) -> Result<()> {
    let tmp = tmp_path(path);
    let written = write_rows(&tmp, records)
        .map_err(|e| EtlError::persistence(path.display(), e))
        .and_then(|()| {
            std::fs::rename(&tmp, path).map_err(|e| EtlError::persistence(path.display(), e))
        });
    if let Err(e) = written {
        // The target is untouched; only the partial temp file needs removing.
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

fn write_rows(tmp: &Path, records: &[ConvertedBankRecord]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_path(tmp)?;

    let mut header = vec![""];
    header.extend(OUTPUT_COLUMNS);
    wtr.write_record(&header)?;

    for (i, r) in records.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            r.name.clone(),
            r.market_cap_usd.to_string(),
            r.market_cap_gbp.to_string(),
            r.market_cap_eur.to_string(),
            r.market_cap_inr.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a file produced by `write_csv` back, in file order.
pub fn read_csv(path: &Path) -> Result<Vec<ConvertedBankRecord>> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| EtlError::persistence(path.display(), e))?;
    rdr.deserialize()
        .collect::<std::result::Result<Vec<ConvertedBankRecord>, _>>()
        .map_err(|e| EtlError::persistence(path.display(), e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Vec<ConvertedBankRecord> {
        vec![
            ConvertedBankRecord {
                name: "JPMorgan Chase".into(),
                market_cap_usd: 432.92,
                market_cap_gbp: 346.34,
                market_cap_eur: 402.62,
                market_cap_inr: 35715.9,
            },
            ConvertedBankRecord {
                name: "Bank of America, N.A.".into(),
                market_cap_usd: 231.52,
                market_cap_gbp: 185.22,
                market_cap_eur: 215.31,
                market_cap_inr: 19100.4,
            },
        ]
    }

    #[test]
    fn header_and_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banks.csv");
        write_csv(&path, &dataset()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(",Name,MC_USD_Billion,MC_GBP_Billion,MC_EUR_Billion,MC_INR_Billion")
        );
        assert_eq!(lines.next(), Some("0,JPMorgan Chase,432.92,346.34,402.62,35715.9"));
        assert!(lines.next().unwrap().starts_with("1,\"Bank of America, N.A.\","));
    }

    #[test]
    fn read_back_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banks.csv");
        let data = dataset();
        write_csv(&path, &data).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back.len(), data.len());
        for (a, b) in back.iter().zip(&data) {
            assert_eq!(a.name, b.name);
            assert!((a.market_cap_usd - b.market_cap_usd).abs() < 0.005);
            assert!((a.market_cap_gbp - b.market_cap_gbp).abs() < 0.005);
            assert!((a.market_cap_eur - b.market_cap_eur).abs() < 0.005);
            assert!((a.market_cap_inr - b.market_cap_inr).abs() < 0.005);
        }
    }

    #[test]
    fn overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banks.csv");
        write_csv(&path, &dataset()).unwrap();
        write_csv(&path, &dataset()[..1]).unwrap();

        assert_eq!(read_csv(&path).unwrap().len(), 1);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn empty_dataset_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banks.csv");
        write_csv(&path, &[]).unwrap();
        assert!(read_csv(&path).unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("banks.csv");
        let err = write_csv(&path, &dataset()).unwrap_err();
        assert!(matches!(err, EtlError::Persistence { .. }));
    }

    #[test]
    fn failed_replace_removes_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target path makes the final rename fail.
        let path = dir.path().join("banks.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), "x").unwrap();

        let err = write_csv(&path, &dataset()).unwrap_err();
        assert!(matches!(err, EtlError::Persistence { .. }));
        assert!(!tmp_path(&path).exists());
        assert!(path.join("keep.txt").exists());
    }
}
