//! Export the fit table and serialize wide tables.
//!
//! The parameter CSV layout is fixed: identifiers, parameters, standard
//! errors (`Paper #,Set,tau,n,Q,sigma_tau,sigma_n,sigma_Q`), one row per
//! dataset, no index column. The table is written in a single pass after
//! the batch completes, never appended to incrementally.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FIT_TABLE_HEADER, FitTable};
use crate::error::AppError;
use crate::io::ingest::WideTable;

/// Write the completed fit table to CSV.
///
/// Failed fits surface as `NaN` cells; zero-fallback rows as literal zeros.
pub fn write_fit_table_csv(path: &Path, table: &FitTable) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create output CSV '{}': {e}", path.display()),
        )
    })?;

    writeln!(file, "{}", FIT_TABLE_HEADER.join(","))
        .map_err(|e| AppError::new(2, format!("Failed to write output CSV header: {e}")))?;

    for row in &table.rows {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{}",
            row.key.paper,
            row.key.set,
            row.params.tau,
            row.params.n,
            row.params.q,
            row.sigma.tau,
            row.sigma.n,
            row.sigma.q,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write output CSV row: {e}")))?;
    }

    Ok(())
}

/// Write the fit table as a JSON summary (the portable representation,
/// including per-row status).
pub fn write_fit_table_json(path: &Path, table: &FitTable) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create JSON summary '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer_pretty(file, table).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to write JSON summary '{}': {e}", path.display()),
        )
    })
}

/// Serialize a wide table back to the three-header CSV layout.
///
/// Missing cells become empty fields. Columns of unequal length are padded
/// with empty fields to the longest column.
pub fn write_wide_table_csv(path: &Path, table: &WideTable) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create table CSV '{}': {e}", path.display()),
        )
    })?;

    let write_err =
        |e: std::io::Error| AppError::new(2, format!("Failed to write table CSV: {e}"));

    let header_line = |f: fn(&crate::io::ingest::Column) -> &str| {
        table
            .columns
            .iter()
            .map(f)
            .collect::<Vec<_>>()
            .join(",")
    };
    writeln!(file, "{}", header_line(|c| c.paper_label.as_str())).map_err(write_err)?;
    writeln!(file, "{}", header_line(|c| c.set_label.as_str())).map_err(write_err)?;
    writeln!(file, "{}", header_line(|c| c.quantity_label.as_str())).map_err(write_err)?;

    let n_rows = table.columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
    for r in 0..n_rows {
        let cells: Vec<String> = table
            .columns
            .iter()
            .map(|c| match c.values.get(r) {
                Some(Some(v)) => format!("{v}"),
                _ => String::new(),
            })
            .collect();
        writeln!(file, "{}", cells.join(",")).map_err(write_err)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DatasetKey, FitParams, FitRow};
    use crate::io::ingest::read_wide_table;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ratecap_export_{tag}_{}.csv", std::process::id()))
    }

    #[test]
    fn fit_table_csv_has_fixed_header_and_one_row_per_dataset() {
        let table = FitTable {
            rows: vec![
                FitRow::fitted(
                    DatasetKey { paper: 1, set: 1 },
                    FitParams {
                        tau: 0.25,
                        n: 1.5,
                        q: 110.0,
                    },
                    FitParams {
                        tau: 0.01,
                        n: 0.05,
                        q: 2.0,
                    },
                ),
                FitRow::zero(DatasetKey { paper: 1, set: 2 }),
            ],
        };

        let path = temp_path("fit_table");
        write_fit_table_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Paper #,Set,tau,n,Q,sigma_tau,sigma_n,sigma_Q");
        assert_eq!(lines[1], "1,1,0.25,1.5,110,0.01,0.05,2");
        assert_eq!(lines[2], "1,2,0,0,0,0,0,0");
    }

    #[test]
    fn failed_rows_serialize_as_nan() {
        let table = FitTable {
            rows: vec![FitRow::failed(DatasetKey { paper: 3, set: 1 })],
        };

        let path = temp_path("failed_row");
        write_fit_table_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(text.lines().nth(1).unwrap(), "3,1,NaN,NaN,NaN,NaN,NaN,NaN");
    }

    #[test]
    fn wide_table_round_trips_through_csv() {
        let csv = "\
paper # 1,paper # 1
set # 1,set # 1
C-rate,Capacity (mAh/g)
0.5,90
1,
2,60
";
        let table = read_wide_table(csv.as_bytes()).unwrap();

        let path = temp_path("wide_table");
        write_wide_table_csv(&path, &table).unwrap();
        let reread = {
            let text = std::fs::read_to_string(&path).unwrap();
            std::fs::remove_file(&path).ok();
            read_wide_table(text.as_bytes()).unwrap()
        };

        assert_eq!(reread.columns.len(), table.columns.len());
        assert_eq!(reread.columns[0].values, table.columns[0].values);
        assert_eq!(reread.columns[1].values, table.columns[1].values);
    }
}
