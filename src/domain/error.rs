// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure in the pipeline falls into one of four kinds:
//
//   Schema   — a required column/field is missing or mistyped
//   Data     — not enough usable rows to fit a model
//   Encoding — a categorical value outside the learned vocabulary
//   Artifact — a bundle file is missing, corrupt, or inconsistent
//
// None of them are retried. Training fails the whole run;
// prediction fails only the request that raised it.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the training and serving core.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("schema error: field '{field}' {reason}")]
    Schema { field: String, reason: String },

    #[error("data error: {0}")]
    Data(String),

    #[error("encoding error: value '{value}' was never seen for field '{field}'")]
    Encoding { field: String, value: String },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl ModelError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema { field: field.into(), reason: reason.into() }
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn encoding(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Encoding { field: field.into(), value: value.into() }
    }

    /// Short machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema_error",
            Self::Data(_)       => "data_error",
            Self::Encoding { .. } => "encoding_error",
            Self::Artifact(_)   => "artifact_error",
        }
    }
}

/// Failures reading or writing an Artifact Bundle.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact error: bundle '{bundle}' has no '{component}' component")]
    Missing { bundle: String, component: String },

    #[error("artifact error: component '{component}' of bundle '{bundle}' is corrupt: {source}")]
    Corrupt {
        bundle:    String,
        component: String,
        #[source]
        source:    serde_json::Error,
    },

    #[error("artifact error: bundle '{bundle}' has format version {found}, expected {expected}")]
    VersionMismatch { bundle: String, found: u64, expected: u32 },

    #[error("artifact error: bundle '{bundle}' is inconsistent: {reason}")]
    Inconsistent { bundle: String, reason: String },

    #[error("artifact error: invalid bundle id '{0}'")]
    InvalidId(String),

    #[error("artifact error: io failure at '{}': {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn inconsistent(bundle: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Inconsistent { bundle: bundle.into(), reason: reason.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(ModelError::schema("day", "is missing").kind(), "schema_error");
        assert_eq!(ModelError::data("too few rows").kind(), "data_error");
        assert_eq!(ModelError::encoding("weather", "Foggy").kind(), "encoding_error");
        let artifact: ModelError = ArtifactError::InvalidId("..".into()).into();
        assert_eq!(artifact.kind(), "artifact_error");
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = ModelError::encoding("weather", "Foggy");
        let msg = err.to_string();
        assert!(msg.contains("weather"));
        assert!(msg.contains("Foggy"));
    }
}
