//! Opaque tabular data: parse delimited service output, read and write
//! indexed CSV files, and concatenate tables with mismatched columns.
//!
//! Cells are kept as strings. Nothing here interprets column meaning.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::model::HarvestError;

/// Rows of string cells with a leading index column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// Header of the index column; empty for freshly parsed data.
    pub index_name: String,
    pub headers: Vec<String>,
    /// One index label per row.
    pub index: Vec<String>,
    /// Every row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell lookup by row number and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }
}

fn pad_row(mut cells: Vec<String>, width: usize) -> Vec<String> {
    cells.resize(width, String::new());
    cells
}

/// Renames repeated column names to `name.1`, `name.2`, ... so no column
/// shadows another. A generated name that is already taken is skipped.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for name in headers {
        if seen.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let count = counts.entry(name.clone()).or_insert(0);
        let renamed = loop {
            *count += 1;
            let candidate = format!("{}.{}", name, count);
            if !seen.contains(&candidate) {
                break candidate;
            }
        };
        seen.insert(renamed.clone());
        out.push(renamed);
    }
    out
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses comma-delimited text after skipping `skip_lines` leading lines.
///
/// The first non-blank line after the skipped block is the header; repeated
/// column names get a `.N` suffix. Rows shorter than the header are padded
/// with empty cells. A row longer than the header is a parse error. Rows get
/// a fresh 0-based index.
pub fn parse_delimited(text: &str, skip_lines: usize) -> Result<Table, HarvestError> {
    let body: String = text
        .split_inclusive('\n')
        .skip(skip_lines)
        .collect();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => dedupe_headers(record?.iter().map(str::to_string).collect()),
        None => {
            return Err(HarvestError::Parse(format!(
                "no header row after skipping {} lines",
                skip_lines
            )));
        }
    };

    let width = headers.len();
    let mut table = Table {
        index_name: String::new(),
        headers,
        index: Vec::new(),
        rows: Vec::new(),
    };

    for (i, record) in records.enumerate() {
        let record = record?;
        if record.len() > width {
            return Err(HarvestError::Parse(format!(
                "line {}: expected {} fields, saw {}",
                record_line(&record) + skip_lines as u64,
                width,
                record.len()
            )));
        }
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        table.index.push(i.to_string());
        table.rows.push(pad_row(cells, width));
    }

    Ok(table)
}

// ---------------------------------------------------------------------------
// Indexed CSV files
// ---------------------------------------------------------------------------

/// Reads a CSV file whose first column is the row index.
///
/// Short rows are padded and repeated column names renamed, as in
/// [`parse_delimited`]. A row with more fields than the header is an error
/// naming the file and line.
pub fn read_indexed_csv(path: impl AsRef<Path>) -> Result<Table, HarvestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| HarvestError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut records = reader.records();
    let header_record = match records.next() {
        Some(record) => record?,
        None => {
            return Err(HarvestError::Parse(format!(
                "{} has no header row",
                path.display()
            )));
        }
    };

    let mut header_cells = header_record.iter().map(str::to_string);
    let index_name = header_cells.next().unwrap_or_default();
    let headers = dedupe_headers(header_cells.collect());
    let width = headers.len();

    let mut table = Table {
        index_name,
        headers,
        index: Vec::new(),
        rows: Vec::new(),
    };

    for record in records {
        let record = record?;
        if record.len() > width + 1 {
            return Err(HarvestError::Parse(format!(
                "{} line {}: expected {} fields, saw {}",
                path.display(),
                record_line(&record),
                width + 1,
                record.len()
            )));
        }
        let mut cells = record.iter().map(str::to_string);
        table.index.push(cells.next().unwrap_or_default());
        let row: Vec<String> = cells.collect();
        table.rows.push(pad_row(row, width));
    }

    Ok(table)
}

/// Writes `table` as CSV with the index column first.
pub fn write_indexed_csv(table: &Table, path: impl AsRef<Path>) -> Result<(), HarvestError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| HarvestError::io(path, e))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let write_err = |e: csv::Error| HarvestError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut header = Vec::with_capacity(table.headers.len() + 1);
    header.push(table.index_name.as_str());
    header.extend(table.headers.iter().map(String::as_str));
    writer.write_record(&header).map_err(write_err)?;

    for (label, row) in table.index.iter().zip(&table.rows) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(label.as_str());
        record.extend(row.iter().map(String::as_str));
        writer.write_record(&record).map_err(write_err)?;
    }

    writer.flush().map_err(|e| HarvestError::io(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Concatenation
// ---------------------------------------------------------------------------

/// Stacks tables vertically.
///
/// Output columns are the union of all input headers in first-seen order;
/// cells for columns a table lacks are empty. Index labels are carried over
/// unchanged, so they may repeat across inputs. The index header is taken
/// from the first table.
pub fn concat_tables(tables: &[Table]) -> Table {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for table in tables {
        for h in &table.headers {
            if !positions.contains_key(h) {
                positions.insert(h.clone(), headers.len());
                headers.push(h.clone());
            }
        }
    }

    let width = headers.len();
    let mut combined = Table {
        index_name: tables.first().map(|t| t.index_name.clone()).unwrap_or_default(),
        headers,
        index: Vec::new(),
        rows: Vec::new(),
    };

    for table in tables {
        let mapping: Vec<usize> = table.headers.iter().map(|h| positions[h]).collect();
        for (label, row) in table.index.iter().zip(&table.rows) {
            let mut out = vec![String::new(); width];
            for (cell, &target) in row.iter().zip(&mapping) {
                out[target] = cell.clone();
            }
            combined.index.push(label.clone());
            combined.rows.push(out);
        }
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    const IEM_SAMPLE: &str = "#DEBUG: Format Typ    -> comma\n\
#DEBUG: Time Period -> 2013-01-01 00:00:00+00:00 2013-08-01 00:00:00+00:00\n\
#DEBUG: Time Zone   -> Etc/UTC\n\
#DEBUG: Data Contact   -> daryl herzmann akrherz@iastate.edu 515-294-5978\n\
#DEBUG: Entries Found   -> -1\n\
station,valid,lon,lat,tmpf\n\
JFK,2013-01-01 00:51,-73.7639,40.6386,37.94\n\
JFK,2013-01-01 01:51,-73.7639,40.6386\n";

    #[test]
    fn test_parse_skips_debug_header() {
        let table = parse_delimited(IEM_SAMPLE, 5).unwrap();
        assert_eq!(table.headers, vec!["station", "valid", "lon", "lat", "tmpf"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.index, vec!["0", "1"]);
        assert_eq!(table.cell(0, "tmpf"), Some("37.94"));
        // short row padded
        assert_eq!(table.cell(1, "tmpf"), Some(""));
    }

    #[test]
    fn test_parse_empty_text_is_error() {
        assert!(matches!(parse_delimited("", 5), Err(HarvestError::Parse(_))));
    }

    #[test]
    fn test_parse_header_only_gives_empty_table() {
        let table = parse_delimited("a,b\n", 0).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers, vec!["a", "b"]);
    }

    #[test]
    fn test_concat_unions_columns_in_first_seen_order() {
        let a = Table {
            index_name: String::new(),
            headers: vec!["station".into(), "tmpf".into()],
            index: vec!["0".into()],
            rows: vec![vec!["JFK".into(), "40".into()]],
        };
        let b = Table {
            index_name: String::new(),
            headers: vec!["station".into(), "dwpf".into()],
            index: vec!["0".into()],
            rows: vec![vec!["LGA".into(), "30".into()]],
        };

        let combined = concat_tables(&[a, b]);
        assert_eq!(combined.headers, vec!["station", "tmpf", "dwpf"]);
        assert_eq!(combined.index, vec!["0", "0"]);
        assert_eq!(combined.rows[0], vec!["JFK", "40", ""]);
        assert_eq!(combined.rows[1], vec!["LGA", "", "30"]);
    }

    #[test]
    fn test_concat_of_nothing_is_empty() {
        let combined = concat_tables(&[]);
        assert!(combined.headers.is_empty());
        assert!(combined.is_empty());
    }

    #[test]
    fn test_parse_rejects_row_longer_than_header() {
        let text = "#1\n#2\n#3\n#4\n#5\nstation,valid\nJFK,2013-01-01,EXTRA,MORE\n";
        match parse_delimited(text, 5) {
            Err(HarvestError::Parse(msg)) => {
                assert!(msg.contains("line 7"), "got {}", msg);
                assert!(msg.contains("expected 2 fields, saw 4"), "got {}", msg);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_indexed_rejects_row_longer_than_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JFK.csv");
        std::fs::write(&path, ",station,tmpf\n0,JFK,10\n1,JFK,11,EXTRA\n").unwrap();

        match read_indexed_csv(&path) {
            Err(HarvestError::Parse(msg)) => {
                assert!(msg.contains("JFK.csv"), "got {}", msg);
                assert!(msg.contains("line 3"), "got {}", msg);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_indexed_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EWR.csv");
        std::fs::write(&path, ",station,tmpf\n0,EWR\n").unwrap();

        let table = read_indexed_csv(&path).unwrap();
        assert_eq!(table.rows, vec![vec!["EWR".to_string(), String::new()]]);
    }

    #[test]
    fn test_dedupe_headers_suffixes_repeats() {
        let headers = vec!["tmpf", "tmpf", "a", "tmpf.1", "tmpf", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            dedupe_headers(headers),
            vec!["tmpf", "tmpf.1", "a", "tmpf.1.1", "tmpf.2", "a.1"]
        );
    }

    #[test]
    fn test_duplicate_columns_survive_concat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JFK.csv");
        std::fs::write(&path, ",station,tmpf,tmpf\n0,JFK,10,20\n").unwrap();

        let table = read_indexed_csv(&path).unwrap();
        assert_eq!(table.headers, vec!["station", "tmpf", "tmpf.1"]);

        let combined = concat_tables(&[table]);
        assert_eq!(combined.headers, vec!["station", "tmpf", "tmpf.1"]);
        assert_eq!(combined.rows, vec![vec!["JFK", "10", "20"]]);
    }

    #[test]
    fn test_parse_renames_duplicate_columns() {
        let table = parse_delimited("station,tmpf,tmpf\nJFK,10,20\n", 0).unwrap();
        assert_eq!(table.cell(0, "tmpf"), Some("10"));
        assert_eq!(table.cell(0, "tmpf.1"), Some("20"));
    }
}
