//! CSV reading and writing
//!
//! Input files come from spreadsheets with unknown delimiters and stray blank
//! lines; rows are returned as ordered header/value pairs so that normalization
//! can resolve duplicate headers deterministically.

use thiserror::Error;

use crate::dto::pipeline::TrainData;

/// One raw CSV row as `(header, value)` pairs in column order
pub type RawRow = Vec<(String, String)>;

/// Errors from CSV handling
#[derive(Debug, Error)]
pub enum CsvError {
    /// Already prefixed by the csv crate's own message
    #[error(transparent)]
    Parse(#[from] csv::Error),

    #[error("CSV input has no header row")]
    MissingHeader,

    #[error("Failed to write CSV: {0}")]
    Write(String),
}

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Pick the candidate delimiter that occurs most often in the header line
pub fn sniff_delimiter(data: &[u8]) -> u8 {
    let header = data
        .split(|b| *b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or_default();

    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, header.iter().filter(|b| **b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Parse CSV bytes into raw rows
///
/// Blank rows are skipped. Short rows simply omit their missing columns.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub fn parse_csv(data: &[u8]) -> Result<Vec<RawRow>, CsvError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(data))
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader.byte_headers()?.iter().map(lossy).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let values: Vec<String> = record.iter().map(lossy).collect();
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let row: RawRow = headers.iter().cloned().zip(values).collect();
        rows.push(row);
    }

    Ok(rows)
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// Column order used when a JSON train array is persisted as CSV
pub const TRAIN_CSV_HEADERS: [&str; 8] = [
    "trainId",
    "trainname",
    "route",
    "capacity",
    "currentLoad",
    "speed",
    "location",
    "status",
];

/// Render a JSON train array as CSV
///
/// `trainname` falls back to the train id so every row keeps a usable identity.
pub fn trains_to_csv(trains: &[TrainData]) -> Result<String, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TRAIN_CSV_HEADERS)?;

    for train in trains {
        let number = |n: &Option<serde_json::Number>| n.as_ref().map(|n| n.to_string()).unwrap_or_default();
        writer.write_record([
            train.train_id.clone(),
            train.trainname.clone().unwrap_or_else(|| train.train_id.clone()),
            train.route.clone().unwrap_or_default(),
            number(&train.capacity),
            number(&train.current_load),
            number(&train.speed),
            train.location.clone().unwrap_or_default(),
            train.status.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(id: &str, status: &str) -> TrainData {
        TrainData {
            train_id: id.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter(b"a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter(b"a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter(b"\n\na\tb\n"), b'\t');
        assert_eq!(sniff_delimiter(b"single"), b',');
    }

    #[test]
    fn test_parse_csv_semicolons_and_bom() {
        let data = b"\xEF\xBB\xBFTrain ID;Train Name\nT1;Alpha\n\n;\nT2;Beta\n";
        let rows = parse_csv(data).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], ("Train ID".to_string(), "T1".to_string()));
        assert_eq!(rows[1][1], ("Train Name".to_string(), "Beta".to_string()));
    }

    #[test]
    fn test_parse_csv_short_rows() {
        let rows = parse_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_parse_csv_replaces_invalid_utf8() {
        let rows = parse_csv(b"trainID,trainname\nT-1,Alpha\nT-2,Caf\xE9\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].1, "Alpha");
        assert_eq!(rows[1][0].1, "T-2");
        assert_eq!(rows[1][1].1, "Caf\u{FFFD}");
    }

    #[test]
    fn test_parse_csv_empty_input() {
        assert!(parse_csv(b"").is_err());
    }

    #[test]
    fn test_trains_to_csv() {
        let mut t = train("T-1", "active");
        t.route = Some("Aluva, Petta".to_string());
        t.capacity = Some(serde_json::Number::from(975));

        let csv = trains_to_csv(&[t]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("trainId,trainname,route,capacity,currentLoad,speed,location,status")
        );
        assert_eq!(lines.next(), Some("T-1,T-1,\"Aluva, Petta\",975,,,,active"));
    }
}
