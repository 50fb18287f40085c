use std::{collections::HashMap, path::Path};

use crate::core::errors::Result;

/// Writes a header row followed by `rows`.
pub(crate) fn write_rows(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads every record keyed by header. Malformed records are logged and skipped.
pub(crate) fn read_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(path = %path.display(), row = index + 2, error = %err, "skipping malformed csv row");
                continue;
            }
        };
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub(crate) fn field<'a>(row: &'a HashMap<String, String>, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or_default()
}

pub(crate) fn number(row: &HashMap<String, String>, key: &str) -> Option<f64> {
    let raw = field(row, key);
    if raw.is_empty() {
        return None;
    }
    raw.replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rows_roundtrip_through_headers() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("rows.csv");
        write_rows(
            &path,
            &["name", "price"],
            &[vec!["PLA, matte".into(), "25,5".into()]],
        )
        .expect("write");
        let rows = read_rows(&path).expect("read");
        assert_eq!(rows.len(), 1);
        assert_eq!(field(&rows[0], "name"), "PLA, matte");
        assert_eq!(number(&rows[0], "price"), Some(25.5));
        assert_eq!(field(&rows[0], "missing"), "");
    }
}
