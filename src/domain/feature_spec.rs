// ============================================================
// Layer 3 — Feature Declarations
// ============================================================
// A FeatureSpec says which columns of the dataset feed the
// regressor, in which ORDER, which of them are categorical,
// which column is the target, and (optionally) which column
// partitions the data into segments.
//
// The ordered `features` list becomes the feature-order
// contract stored in every bundle. A regressor trained on
// [Day, Weather, Demand] must always receive its inputs in
// exactly that order.

use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};

/// Primitive type of a feature as seen by the regressor's caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Passed through as a number
    Numeric,
    /// Passed through a Categorical Encoder first
    Categorical,
}

/// One entry of the feature-order contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureField {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureField {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FeatureKind::Numeric }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FeatureKind::Categorical }
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == FeatureKind::Categorical
    }
}

/// A `from=to` column rename applied after header normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to:   String,
}

impl std::str::FromStr for ColumnRename {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FROM=TO, got '{s}'"))?;
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Err(format!("rename '{s}' has an empty side"));
        }
        Ok(Self { from: from.to_string(), to: to.to_string() })
    }
}

/// Which segment a bundle was trained on, e.g. Commodity = Tomato.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTag {
    pub key:   String,
    pub value: String,
}

/// Declares how a dataset maps onto a regression problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Ordered feature-order contract
    pub features:    Vec<FeatureField>,
    /// Numeric column the regressor learns to predict
    pub target:      String,
    /// Column that partitions the data into independent bundles
    pub segment_key: Option<String>,
    /// Only these segment values are trained (all when empty)
    pub segments:    Vec<String>,
    /// Column whose dates are expanded into numeric date parts
    pub date_column: Option<String>,
    pub renames:     Vec<ColumnRename>,
}

impl FeatureSpec {
    /// Build a spec from an ordered feature list; names listed in
    /// `categorical` become categorical, the rest numeric.
    pub fn new<S: AsRef<str>>(features: &[S], categorical: &[S], target: impl Into<String>) -> Self {
        let features = features
            .iter()
            .map(|f| {
                let name = f.as_ref();
                if categorical.iter().any(|c| c.as_ref() == name) {
                    FeatureField::categorical(name)
                } else {
                    FeatureField::numeric(name)
                }
            })
            .collect();

        Self {
            features,
            target:      target.into(),
            segment_key: None,
            segments:    Vec::new(),
            date_column: None,
            renames:     Vec::new(),
        }
    }

    pub fn with_segment_key(mut self, key: impl Into<String>) -> Self {
        self.segment_key = Some(key.into());
        self
    }

    pub fn with_segments<S: Into<String>>(mut self, segments: impl IntoIterator<Item = S>) -> Self {
        self.segments = segments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.push(ColumnRename { from: from.into(), to: to.into() });
        self
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Every column that must exist once headers are normalised
    /// and date parts derived: the features in contract order, then
    /// the target, then the segment key if there is one.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = self.feature_names();
        cols.push(&self.target);
        if let Some(key) = &self.segment_key {
            cols.push(key);
        }
        cols
    }

    /// Reject specs that can never produce a usable bundle.
    pub fn validate(&self) -> ModelResult<()> {
        if self.features.is_empty() {
            return Err(ModelError::schema("<features>", "list is empty"));
        }
        for (i, field) in self.features.iter().enumerate() {
            if self.features[..i].iter().any(|f| f.name == field.name) {
                return Err(ModelError::schema(&field.name, "is declared twice"));
            }
            if field.name == self.target {
                return Err(ModelError::schema(&field.name, "is both a feature and the target"));
            }
            if self.segment_key.as_deref() == Some(field.name.as_str()) {
                return Err(ModelError::schema(&field.name, "is both a feature and the segment key"));
            }
        }
        if !self.segments.is_empty() && self.segment_key.is_none() {
            return Err(ModelError::schema("<segments>", "given without a segment key"));
        }
        Ok(())
    }
}

/// Lowercase `name` and collapse runs of non-alphanumerics into `_`.
/// Used for bundle ids ("Tomato" → "tomato") and component names.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}
