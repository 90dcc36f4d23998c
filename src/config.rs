//! Assembly run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options of one assembly run.
///
/// # Example
/// ```
/// use supermodel::AssemblyConfig;
///
/// let config: AssemblyConfig = serde_json::from_str(r#"{"and_as_solid": true}"#).unwrap();
/// assert!(config.and_as_solid);
/// assert!(!config.mix_unconverted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Fold unresolved selections into the assembly bucket instead of a
    /// separate not-converted bucket.
    pub mix_unconverted: bool,
    /// Treat each AND-complex of a gene rule as one unit of support.
    pub and_as_solid: bool,
    /// Directory holding `<source>_blast.tsv` gene translation tables.
    pub gene_folder: Option<PathBuf>,
    /// Fail the run when any diagnostic is reported.
    pub strict: bool,
}

impl AssemblyConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts unresolved entities into the assembly bucket.
    #[must_use]
    pub fn mix_unconverted(mut self, mix: bool) -> Self {
        self.mix_unconverted = mix;
        self
    }

    /// Counts AND-complexes as single units in gene-rule consensus.
    #[must_use]
    pub fn and_as_solid(mut self, solid: bool) -> Self {
        self.and_as_solid = solid;
        self
    }

    /// Folder holding `<source>_blast.tsv` translation tables.
    #[must_use]
    pub fn gene_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.gene_folder = Some(folder.into());
        self
    }

    /// Fails the run on data-inconsistency diagnostics.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
