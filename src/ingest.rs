//! CSV-based input record decoder. Any column that parses as a number is
//! kept as-is; any column that parses as an RFC 3339 datetime is converted
//! to milliseconds since the epoch; everything else is silently dropped.

use std::path::Path;

use anyhow::{Context, Result};

use crate::record::{Record, Value};

/// Stream records out of a CSV file at `path`.
pub fn read_records(path: &Path) -> Result<impl Iterator<Item = Result<Record>>> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("[ingest] failed to open {}", path.display()))?;
    Ok(CsvRecords { reader, path: path.to_path_buf() })
}

struct CsvRecords {
    reader: csv::Reader<std::fs::File>,
    path: std::path::PathBuf,
}

impl Iterator for CsvRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let headers = match self.reader.headers() {
            Ok(h) => h.clone(),
            Err(e) => {
                return Some(Err(anyhow::Error::from(e)
                    .context(format!("[ingest] failed to read header row of {}", self.path.display()))))
            }
        };

        let mut raw = csv::StringRecord::new();
        match self.reader.read_record(&mut raw) {
            Ok(false) => return None,
            Ok(true) => {}
            Err(e) => {
                return Some(Err(anyhow::Error::from(e)
                    .context(format!("[ingest] malformed row in {}", self.path.display()))))
            }
        }

        let mut record = Record::new();
        for (name, field) in headers.iter().zip(raw.iter()) {
            record.insert(name.to_string(), parse_field(field));
        }
        Some(Ok(record))
    }
}

/// Parse one CSV cell: a finite number, an RFC 3339 datetime (converted to
/// ms since epoch), or null for anything else.
fn parse_field(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return Value::Number(n);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Value::Number(dt.timestamp_millis() as f64);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn numeric_and_datetime_columns_survive_non_numeric_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "lat,lon,speed,name,timestamp").unwrap();
        writeln!(f, "10.0,20.0,5.5,foo,2020-01-01T00:00:00Z").unwrap();
        drop(f);

        let records: Vec<Record> = read_records(&path).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["lat"], Value::Number(10.0));
        assert_eq!(r["lon"], Value::Number(20.0));
        assert_eq!(r["speed"], Value::Number(5.5));
        assert_eq!(r["name"], Value::Null);
        assert_eq!(r["timestamp"], Value::Number(1577836800000.0));
    }
}
