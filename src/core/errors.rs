//! KLD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, KloadError>;

/// Top-level error type for kload.
///
/// Nothing in the engine retries: every variant raised while a session is
/// running ends that session.
#[derive(Debug, Error)]
pub enum KloadError {
    #[error("[KLD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[KLD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[KLD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[KLD-2001] metrics source {source_name} unavailable: {details}")]
    SourceUnavailable {
        source_name: String,
        details: String,
    },

    #[error("[KLD-2002] metrics source {source_name} returned no entities (check filters)")]
    EmptyResultSet { source_name: String },

    #[error("[KLD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[KLD-3001] failed to build dashboard layout: {details}")]
    SurfaceConstruction { details: String },

    #[error("[KLD-3002] redraw failed: {details}")]
    Redraw { details: String },

    #[error("[KLD-3003] drawing surface failure: {details}")]
    Surface { details: String },

    #[error("[KLD-3101] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KloadError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "KLD-1001",
            Self::MissingConfig { .. } => "KLD-1002",
            Self::ConfigParse { .. } => "KLD-1003",
            Self::SourceUnavailable { .. } => "KLD-2001",
            Self::EmptyResultSet { .. } => "KLD-2002",
            Self::Serialization { .. } => "KLD-2101",
            Self::SurfaceConstruction { .. } => "KLD-3001",
            Self::Redraw { .. } => "KLD-3002",
            Self::Surface { .. } => "KLD-3003",
            Self::Io { .. } => "KLD-3101",
        }
    }

    /// Whether the failure came from the user's configuration rather than the runtime.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::EmptyResultSet { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Re-label any fetch failure as `SourceUnavailable` for the named source.
    ///
    /// Errors that already are `SourceUnavailable` pass through untouched so the
    /// innermost source name wins when sources are wrapped.
    #[must_use]
    pub fn into_source_unavailable(self, source_name: &str) -> Self {
        match self {
            Self::SourceUnavailable { .. } => self,
            other => Self::SourceUnavailable {
                source_name: source_name.to_string(),
                details: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for KloadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for KloadError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<regex::Error> for KloadError {
    fn from(value: regex::Error) -> Self {
        Self::InvalidConfig {
            details: format!("invalid filter pattern: {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<KloadError> {
        vec![
            KloadError::InvalidConfig {
                details: String::new(),
            },
            KloadError::MissingConfig {
                path: PathBuf::new(),
            },
            KloadError::ConfigParse {
                context: "",
                details: String::new(),
            },
            KloadError::SourceUnavailable {
                source_name: String::new(),
                details: String::new(),
            },
            KloadError::EmptyResultSet {
                source_name: String::new(),
            },
            KloadError::Serialization {
                context: "",
                details: String::new(),
            },
            KloadError::SurfaceConstruction {
                details: String::new(),
            },
            KloadError::Redraw {
                details: String::new(),
            },
            KloadError::Surface {
                details: String::new(),
            },
            KloadError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(KloadError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_carries_code_prefix() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.starts_with(&format!("[{}]", err.code())),
                "display should start with its code: {msg}"
            );
        }
    }

    #[test]
    fn empty_result_set_mentions_filters() {
        let err = KloadError::EmptyResultSet {
            source_name: "pods".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pods"));
        assert!(msg.contains("no entities"));
    }

    #[test]
    fn into_source_unavailable_wraps_foreign_errors() {
        let err = KloadError::io(
            "/tmp/snapshot.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        )
        .into_source_unavailable("file");
        assert_eq!(err.code(), "KLD-2001");
        assert!(err.to_string().contains("/tmp/snapshot.json"));
    }

    #[test]
    fn into_source_unavailable_keeps_inner_source_name() {
        let err = KloadError::SourceUnavailable {
            source_name: "inner".to_string(),
            details: "timeout".to_string(),
        }
        .into_source_unavailable("outer");
        match err {
            KloadError::SourceUnavailable { source_name, .. } => assert_eq!(source_name, "inner"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(
            KloadError::InvalidConfig {
                details: String::new()
            }
            .is_user_error()
        );
        assert!(
            KloadError::EmptyResultSet {
                source_name: String::new()
            }
            .is_user_error()
        );
        assert!(
            !KloadError::Redraw {
                details: String::new()
            }
            .is_user_error()
        );
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: KloadError = json_err.into();
        assert_eq!(err.code(), "KLD-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: KloadError = toml_err.into();
        assert_eq!(err.code(), "KLD-1003");
    }

    #[test]
    fn from_regex_error() {
        let re_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: KloadError = re_err.into();
        assert_eq!(err.code(), "KLD-1001");
    }
}
