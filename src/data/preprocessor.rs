// ============================================================
// Layer 4 — Dataset Preprocessor
// ============================================================
// Turns a raw string Table into typed training Samples.
//
// Why do we need this step?
//   Spreadsheet exports are messy:
//   - Headers carry stray spaces ("District  Name ", "\u{FEFF}Date")
//   - Some columns go by a different name than the model wants
//   - Dates arrive as text but the model wants numbers
//   - Rows have holes in them
//
// Steps (applied in order):
//   1. Normalise header names (trim, collapse inner whitespace)
//   2. Apply `from=to` renames; the result must have unique names
//   3. Derive numeric date parts from the date column
//   4. Resolve every required column (SchemaError if absent)
//   5. Type every cell and drop incomplete rows
//
// Reference: Rust Book §8 (Strings in Rust)
//            chrono crate documentation

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::data::dataset::{FeatureValue, Sample, Table};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::feature_spec::{FeatureKind, FeatureSpec};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Trim a column name and collapse internal whitespace runs to one space.
pub fn normalise_column_name(name: &str) -> String {
    name.replace('\u{FEFF}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the date formats seen in the price exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Names of the numeric columns derived from a date column.
pub fn date_part_columns(column: &str) -> [String; 4] {
    [
        format!("{column}_day_of_year"),
        format!("{column}_day"),
        format!("{column}_month"),
        format!("{column}_year"),
    ]
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Typed rows plus how many raw rows were thrown away.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub samples: Vec<Sample>,
    pub dropped: usize,
}

pub struct Preprocessor<'a> {
    spec: &'a FeatureSpec,
}

impl<'a> Preprocessor<'a> {
    pub fn new(spec: &'a FeatureSpec) -> Self {
        Self { spec }
    }

    /// Steps 1–3: header normalisation, renames, date parts.
    pub fn prepare(&self, mut table: Table) -> ModelResult<Table> {
        // ── Step 1: Normalise header names ────────────────────────────────────
        for col in table.columns_mut().iter_mut() {
            *col = normalise_column_name(col);
        }

        // ── Step 2: Renames ───────────────────────────────────────────────────
        for rename in &self.spec.renames {
            let from = normalise_column_name(&rename.from);
            match table.column_index(&from) {
                Some(idx) => table.columns_mut()[idx] = rename.to.clone(),
                None => tracing::debug!("Rename source '{}' not present, skipped", from),
            }
        }
        for (i, col) in table.columns().iter().enumerate() {
            if table.columns()[..i].contains(col) {
                return Err(ModelError::schema(
                    col,
                    "appears more than once after header normalisation and renames",
                ));
            }
        }

        // ── Step 3: Date parts ────────────────────────────────────────────────
        if let Some(date_col) = &self.spec.date_column {
            let idx = table
                .column_index(date_col)
                .ok_or_else(|| ModelError::schema(date_col, "is not a column of the dataset"))?;

            let mut parts: [Vec<String>; 4] = Default::default();
            let mut unparsed = 0usize;
            for row in 0..table.height() {
                let date = table.cell(row, idx).and_then(parse_date);
                if date.is_none() {
                    unparsed += 1;
                }
                let values = date.map(|d| {
                    [d.ordinal().to_string(), d.day().to_string(), d.month().to_string(), d.year().to_string()]
                });
                for (i, part) in parts.iter_mut().enumerate() {
                    part.push(values.as_ref().map(|v| v[i].clone()).unwrap_or_default());
                }
            }
            if unparsed > 0 {
                tracing::warn!("{} rows have an unparseable '{}' value", unparsed, date_col);
            }
            for (name, values) in date_part_columns(date_col).into_iter().zip(parts) {
                table.push_column(name, values);
            }
        }

        Ok(table)
    }

    /// Steps 4–5: resolve required columns and type every row.
    pub fn extract(&self, table: &Table) -> ModelResult<Extracted> {
        let resolve = |name: &str| {
            table.column_index(name).ok_or_else(|| {
                ModelError::schema(name, "is not a column of the dataset (after normalisation)")
            })
        };

        // features, then target, then segment key
        let resolved: Vec<usize> = self
            .spec
            .required_columns()
            .into_iter()
            .map(resolve)
            .collect::<ModelResult<_>>()?;
        let n_features  = self.spec.features.len();
        let feature_idx = &resolved[..n_features];
        let target_idx  = resolved[n_features];
        let segment_idx = resolved.get(n_features + 1).copied();

        let mut samples = Vec::with_capacity(table.height());
        let mut dropped = 0usize;

        'rows: for row in 0..table.height() {
            let mut features = Vec::with_capacity(feature_idx.len());
            for (field, &col) in self.spec.features.iter().zip(feature_idx) {
                let value = match (field.kind, table.cell(row, col)) {
                    (FeatureKind::Numeric, Some(raw)) => parse_number(raw).map(FeatureValue::Number),
                    (FeatureKind::Categorical, Some(raw)) => Some(FeatureValue::Category(raw.to_string())),
                    (_, None) => None,
                };
                match value {
                    Some(v) => features.push(v),
                    None => {
                        dropped += 1;
                        continue 'rows;
                    }
                }
            }

            let Some(target) = table.cell(row, target_idx).and_then(parse_number) else {
                dropped += 1;
                continue;
            };

            let segment = match segment_idx {
                Some(col) => match table.cell(row, col) {
                    Some(s) => Some(s.to_string()),
                    None => {
                        dropped += 1;
                        continue;
                    }
                },
                None => None,
            };

            samples.push(Sample { features, target, segment });
        }

        if dropped > 0 {
            tracing::warn!("Dropped {} incomplete rows out of {}", dropped, table.height());
        }
        tracing::debug!("Extracted {} complete samples", samples.len());

        Ok(Extracted { samples, dropped })
    }
}
