//! Error types for supermodel.
//!
//! All errors are strongly typed using thiserror. Data inconsistencies
//! found while reconciling sources are *not* errors: they are reported
//! through [`crate::diagnostics::Diagnostics`] and processing continues.

use std::path::PathBuf;

use thiserror::Error;

/// Validation errors: invalid arguments or inputs, raised before any work is done.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A consensus threshold outside `1..=source_count`.
    #[error("Threshold {k} does not fit the number of sources ({source_count})")]
    InvalidThreshold {
        /// Requested threshold.
        k: usize,
        /// Number of sources in the model.
        source_count: usize,
    },

    /// `k = 1`, which is the assembly itself.
    #[error(
        "Features present in at least 1 source are already the assembly; \
         no separate comparison is needed"
    )]
    ThresholdAlreadyAssembled,

    /// Both sides of a presence partition are empty.
    #[error("Both present and absent source lists are empty; provide at least one")]
    EmptyPartition,

    /// Source names not registered in the model.
    #[error("Unknown sources: {}", .names.join(", "))]
    UnknownSources {
        /// The unknown names.
        names: Vec<String>,
    },

    /// A source listed as both present and absent.
    #[error("Sources listed as both present and absent: {}", .names.join(", "))]
    OverlappingPartition {
        /// The overlapping names.
        names: Vec<String>,
    },

    /// No source model was given.
    #[error("At least one source model is required")]
    EmptySourceList,

    /// More sources than handles can address.
    #[error("Too many sources: {count} (max {max})")]
    TooManySources {
        /// Given sources.
        count: usize,
        /// Largest supported count.
        max: usize,
    },

    /// Two sources share a name.
    #[error("Source '{name}' is registered more than once")]
    DuplicateSource {
        /// The repeated name.
        name: String,
    },

    /// A selection names an old id the source does not have.
    #[error("Source '{source_name}' has no {kind} with id '{id}'")]
    UnknownOldId {
        /// Source name.
        source_name: String,
        /// Entity class of the id.
        kind: &'static str,
        /// The missing id.
        id: String,
    },
}

/// Errors raised while persisting or loading an assembled model.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The destination file exists.
    #[error("Destination already exists: {}", .path.display())]
    AlreadyExists {
        /// The destination.
        path: PathBuf,
    },

    /// The file does not end in the model extension.
    #[error("Unsupported extension for {} (expected .{expected})", .path.display())]
    UnsupportedExtension {
        /// The offending path.
        path: PathBuf,
        /// The extension required.
        expected: &'static str,
    },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model could not be serialized.
    #[error("Encoding failed: {message}")]
    Encode {
        /// Serializer message.
        message: String,
    },

    /// The file failed its checksum, framing or header checks.
    #[error("Corrupted model file: {message}")]
    Corrupted {
        /// What failed.
        message: String,
    },
}

/// Top-level error type for supermodel.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Invalid input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence failure.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// A translation table exists but cannot be read.
    #[error("Cannot read translation table {}: {message}", .path.display())]
    TranslationTable {
        /// Table path.
        path: PathBuf,
        /// Reader message.
        message: String,
    },

    /// Strict mode saw at least one data inconsistency.
    #[error("Strict mode: {count} data inconsistency diagnostic(s) reported, first: {first}")]
    StrictDiagnostics {
        /// Number of inconsistencies.
        count: usize,
        /// The first one, rendered.
        first: String,
    },
}

impl AssemblyError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an output error.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Returns true if this error was produced by strict mode.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        matches!(self, Self::StrictDiagnostics { .. })
    }
}

/// Result type alias for supermodel operations.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_threshold() {
        let err = ValidationError::InvalidThreshold { k: 5, source_count: 3 };
        let msg = format!("{err}");
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_validation_error_unknown_sources() {
        let err = ValidationError::UnknownSources {
            names: vec!["iML1515".to_string(), "carveme".to_string()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("iML1515, carveme"));
    }

    #[test]
    fn test_output_error_exists() {
        let err = OutputError::AlreadyExists {
            path: PathBuf::from("/tmp/out.supermodel"),
        };
        assert!(format!("{err}").contains("out.supermodel"));
    }

    #[test]
    fn test_assembly_error_from_validation() {
        let err: AssemblyError = ValidationError::EmptyPartition.into();
        assert!(err.is_validation());
        assert!(!err.is_output());
    }

    #[test]
    fn test_assembly_error_from_output() {
        let err: AssemblyError = OutputError::Corrupted {
            message: "crc".to_string(),
        }
        .into();
        assert!(err.is_output());
        assert!(format!("{err}").contains("crc"));
    }

    #[test]
    fn test_assembly_error_strict() {
        let err = AssemblyError::StrictDiagnostics {
            count: 2,
            first: "[ambiguous_mapping] m1: two candidates".to_string(),
        };
        assert!(err.is_strict());
        assert!(!err.is_validation());
        assert!(format!("{err}").contains("2 data inconsistency"));
    }
}
