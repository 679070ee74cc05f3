// ============================================================
// Layer 4 — CSV Loader
// ============================================================
// Reads a labelled dataset from a CSV file with a header row.
// Every cell is kept as a string; typing happens later in
// the preprocessor once we know which columns are numeric.
//
// Rows may be shorter than the header (`flexible`); the
// absent trailing cells become missing values.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::data::dataset::Table;
use crate::domain::traits::TabularSource;

/// Loads a Table from a CSV file on disk.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl TabularSource for CsvLoader {
    fn load(&self) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open dataset '{}'", self.path.display()))?;

        let columns: Vec<String> = reader
            .headers()
            .with_context(|| format!("Cannot read header row of '{}'", self.path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Malformed CSV record {} in '{}'", line + 1, self.path.display())
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let table = Table::new(columns, rows);
        tracing::info!(
            "Loaded {} rows and {} columns from '{}'",
            table.height(),
            table.width(),
            self.path.display()
        );
        Ok(table)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_header_and_rows() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "Date,Weather,Demand,Price").unwrap();
        writeln!(f, "2024-01-01,Sunny,High,100").unwrap();
        writeln!(f, "2024-01-02,Rainy,Low").unwrap();

        let table = CsvLoader::new(f.path()).load().unwrap();
        assert_eq!(table.columns(), &["Date", "Weather", "Demand", "Price"]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.cell(0, 3), Some("100"));
        // trailing cell dropped by the exporter → missing
        assert_eq!(table.cell(1, 3), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CsvLoader::new("/definitely/not/here.csv").load().unwrap_err();
        assert!(err.to_string().contains("Cannot open dataset"));
    }
}
