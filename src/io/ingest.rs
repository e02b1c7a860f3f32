//! Wide-table ingest and dataset extraction.
//!
//! The input is a delimited export of a capacity-rate worksheet:
//!
//! - three header rows: paper label, set label, quantity+unit label
//! - numeric data rows, where an empty or unparseable cell means "missing"
//! - data columns alternate (rate, capacity), one pair per dataset
//!
//! Design goals:
//! - **Strict structural validation** (clear errors + exit code 2)
//! - **Per-dataset missing-cell filtering** (never global: a hole in one
//!   pair does not drop the row for its neighbors)
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Dataset, DatasetKey};
use crate::error::AppError;

/// One column of the wide table, with its three header labels.
#[derive(Debug, Clone)]
pub struct Column {
    pub paper_label: String,
    pub set_label: String,
    pub quantity_label: String,
    pub values: Vec<Option<f64>>,
}

/// The whole wide table, column-addressable.
#[derive(Debug, Clone)]
pub struct WideTable {
    pub columns: Vec<Column>,
}

impl WideTable {
    /// Number of (rate, capacity) column pairs.
    pub fn n_pairs(&self) -> usize {
        self.columns.len() / 2
    }
}

/// Load a wide table from a delimited file.
pub fn load_wide_table(path: &Path) -> Result<WideTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open input table '{}': {e}", path.display()),
        )
    })?;
    read_wide_table(file)
}

/// Parse a wide table from any reader (used directly by tests).
pub fn read_wide_table<R: Read>(rdr: R) -> Result<WideTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error on line {}: {e}", idx + 1)))?;
        records.push(record);
    }
    parse_wide_records(&records)
}

fn parse_wide_records(records: &[StringRecord]) -> Result<WideTable, AppError> {
    if records.len() < 3 {
        return Err(AppError::new(
            2,
            format!(
                "Expected three header rows (paper, set, quantity), found {} rows total.",
                records.len()
            ),
        ));
    }

    let n_cols = records[0].len();
    if n_cols == 0 {
        return Err(AppError::new(2, "Input table has no columns."));
    }
    if n_cols % 2 != 0 {
        return Err(AppError::new(
            2,
            format!(
                "Expected an even number of data columns (alternating rate/capacity pairs), found {n_cols}."
            ),
        ));
    }

    let mut columns = Vec::with_capacity(n_cols);
    for c in 0..n_cols {
        let values = records[3..]
            .iter()
            .map(|rec| parse_opt_f64(rec.get(c)))
            .collect();
        columns.push(Column {
            paper_label: header_cell(&records[0], c),
            set_label: header_cell(&records[1], c),
            quantity_label: header_cell(&records[2], c),
            values,
        });
    }

    Ok(WideTable { columns })
}

/// Split the table into per-dataset (rate, capacity) series, one per column
/// pair, dropping rows where either half of the pair is missing.
///
/// Every column pair produces exactly one dataset, even when all of its
/// values are missing (the batch driver's fallback handles those).
pub fn extract_datasets(table: &WideTable) -> Result<Vec<Dataset>, AppError> {
    let mut out = Vec::with_capacity(table.n_pairs());
    for i in 0..table.n_pairs() {
        let rate_col = &table.columns[2 * i];
        let cap_col = &table.columns[2 * i + 1];

        // Identifiers come from the capacity column's header levels.
        let paper = parse_id_digits(&cap_col.paper_label)
            .map_err(|e| AppError::new(2, format!("Column pair {}: {e}", i + 1)))?;
        let set = parse_id_digits(&cap_col.set_label)
            .map_err(|e| AppError::new(2, format!("Column pair {}: {e}", i + 1)))?;

        let mut rates = Vec::new();
        let mut capacities = Vec::new();
        for (rate, capacity) in rate_col.values.iter().zip(cap_col.values.iter()) {
            if let (Some(rate), Some(capacity)) = (rate, capacity) {
                rates.push(*rate);
                capacities.push(*capacity);
            }
        }

        out.push(Dataset {
            key: DatasetKey { paper, set },
            rates,
            capacities,
        });
    }
    Ok(out)
}

/// Extract the first embedded run of digits from a header label.
///
/// Header text like `paper # 12` or `set #3` identifies datasets by number;
/// a label with no digits cannot be attributed to a dataset and is a fatal
/// input error.
pub fn parse_id_digits(label: &str) -> Result<u32, String> {
    let digits: String = label
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(format!("No digits found in header label '{label}'."));
    }
    digits
        .parse::<u32>()
        .map_err(|e| format!("Header label '{label}' has an out-of-range id: {e}"))
}

fn header_cell(record: &StringRecord, c: usize) -> String {
    // Excel exports sometimes prefix the first header cell with a BOM.
    record
        .get(c)
        .unwrap_or("")
        .trim_start_matches('\u{feff}')
        .trim()
        .to_string()
}

fn parse_opt_f64(cell: Option<&str>) -> Option<f64> {
    let s = cell?.trim();
    if s.is_empty() {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PAIR_CSV: &str = "\
paper # 1,paper # 1,paper # 2,paper # 2
set # 1,set # 1,set # 1,set # 1
C-rate,Capacity (mAh/g),C-rate,Capacity (mAh/g)
0.5,90,0.2,95
1,80,,88
2,60,0.5,
5,20,1,70
";

    #[test]
    fn parses_three_level_headers_and_values() {
        let table = read_wide_table(TWO_PAIR_CSV.as_bytes()).unwrap();
        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.n_pairs(), 2);
        assert_eq!(table.columns[1].paper_label, "paper # 1");
        assert_eq!(table.columns[3].set_label, "set # 1");
        assert_eq!(table.columns[0].values.len(), 4);
        assert_eq!(table.columns[2].values[1], None);
    }

    #[test]
    fn missing_cells_are_filtered_per_pair_not_globally() {
        let table = read_wide_table(TWO_PAIR_CSV.as_bytes()).unwrap();
        let datasets = extract_datasets(&table).unwrap();
        assert_eq!(datasets.len(), 2);

        // Pair 1 is fully populated.
        assert_eq!(datasets[0].len(), 4);
        // Pair 2 loses rows 2 and 3 (one half missing each), keeps 1 and 4.
        assert_eq!(datasets[1].len(), 2);
        assert_eq!(datasets[1].rates, vec![0.2, 1.0]);
        assert_eq!(datasets[1].capacities, vec![95.0, 70.0]);
    }

    #[test]
    fn dataset_keys_come_from_capacity_column_headers() {
        let table = read_wide_table(TWO_PAIR_CSV.as_bytes()).unwrap();
        let datasets = extract_datasets(&table).unwrap();
        assert_eq!(datasets[0].key, DatasetKey { paper: 1, set: 1 });
        assert_eq!(datasets[1].key, DatasetKey { paper: 2, set: 1 });
    }

    #[test]
    fn odd_column_count_is_fatal() {
        let csv = "paper # 1,paper # 1,paper # 2\nset # 1,set # 1,set # 1\nC-rate,Capacity,C-rate\n0.5,90,0.2\n";
        let err = read_wide_table(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn fewer_than_three_header_rows_is_fatal() {
        let csv = "paper # 1,paper # 1\nset # 1,set # 1\n";
        let err = read_wide_table(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn digitless_header_label_is_fatal() {
        let csv = "\
paper # 1,paper one
set # 1,set # 1
C-rate,Capacity (mAh/g)
0.5,90
";
        let table = read_wide_table(csv.as_bytes()).unwrap();
        let err = extract_datasets(&table).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("paper one"));
    }

    #[test]
    fn parse_id_digits_extracts_first_run() {
        assert_eq!(parse_id_digits("paper # 12").unwrap(), 12);
        assert_eq!(parse_id_digits("set #3").unwrap(), 3);
        assert_eq!(parse_id_digits("7").unwrap(), 7);
        assert!(parse_id_digits("no numbers here").is_err());
    }
}
