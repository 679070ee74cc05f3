use serde::{Deserialize, Serialize};

/// A raw tabular dataset: named columns, string cells.
///
/// Cells stay as strings until the preprocessor knows which
/// columns are numeric. An empty (or whitespace-only) cell
/// is a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows:    Vec<Vec<String>>,
}

impl Table {
    /// Rows shorter than the header are padded with missing cells,
    /// longer rows are truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The cell at (row, col), or None when it is missing.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    pub fn columns_mut(&mut self) -> &mut Vec<String> {
        &mut self.columns
    }

    /// Append a derived column; `values` must have one entry per row.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
}

/// One feature value after type checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

/// A complete, typed training row.
///
/// `features` follows the feature-order contract of the
/// FeatureSpec it was extracted with.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<FeatureValue>,
    pub target:   f64,
    pub segment:  Option<String>,
}

impl Sample {
    pub fn category(&self, index: usize) -> Option<&str> {
        match self.features.get(index) {
            Some(FeatureValue::Category(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
pub fn table_from(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}
