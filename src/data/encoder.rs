// ============================================================
// Layer 4 — Categorical Encoder
// ============================================================
// Maps the string values of one categorical column to dense
// integer codes 0..k-1.
//
// Classes are kept sorted, so a value's code is its rank:
//
//   fit(["Sunny", "Rainy", "Sunny", "Cloudy"])
//   → classes = ["Cloudy", "Rainy", "Sunny"]
//   → Cloudy=0, Rainy=1, Sunny=2
//
// The vocabulary is FROZEN after fitting. Encoding a value
// that was never seen is an EncodingError. There is no
// "unknown" bucket, because the regressor never learned a
// coefficient for one.
//
// Reference: Rust Book §8 (Vectors), slice::binary_search

use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    /// Feature this encoder belongs to
    field:   String,
    /// Sorted, de-duplicated vocabulary
    classes: Vec<String>,
}

impl CategoricalEncoder {
    /// Learn the vocabulary of `field` from the values seen in training.
    pub fn fit<'a>(field: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort_unstable();
        classes.dedup();
        Self { field: field.into(), classes }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Map a value to its integer code.
    pub fn encode(&self, value: &str) -> ModelResult<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as u32)
            .map_err(|_| ModelError::encoding(&self.field, value))
    }

    /// Map a code back to the original value.
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    /// A deserialised encoder is only usable if its classes are still
    /// strictly sorted; binary search depends on it.
    pub fn is_well_formed(&self) -> bool {
        self.classes.windows(2).all(|w| w[0] < w[1])
    }
}
