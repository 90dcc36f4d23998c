//! Gene locus translation tables.
//!
//! Each source may ship a tab-separated table (`<source>_blast.tsv`, no
//! header) mapping its original gene ids to canonical locus tags. Only
//! the first two columns (`old_id`, `new_id`) are read; alignment scores
//! and anything after them are ignored. A source without a table keeps its
//! original gene ids.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{AssemblyError, AssemblyResult};
use crate::source::{SourceId, SourceRegistry};

/// Sentinel returned when a table exists but has no row for a gene.
pub const NOT_FOUND: &str = "not_found";

/// File name suffix of per-source translation tables.
pub const TABLE_SUFFIX: &str = "_blast.tsv";

/// Outcome of looking a gene up in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneHit<'a> {
    /// The table names a canonical locus tag.
    Translated(&'a str),
    /// The table has a row, but its `new_id` is empty or not a value.
    Unusable,
    /// The table has no row for the gene.
    Missing,
}

/// Parsed translation table for one source.
///
/// Each old id maps to its `new_id` cell; `None` when the cell is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneTranslationTable {
    rows: IndexMap<String, Option<String>>,
}

fn cell_value(cell: Option<&str>) -> Option<&str> {
    let cell = cell?.trim();
    match cell {
        "" | "nan" | "NaN" | "NA" | "None" => None,
        value => Some(value),
    }
}

impl GeneTranslationTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a headerless tab-separated table. The first row for an old id wins.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = IndexMap::new();
        for record in rdr.records() {
            let record = record?;
            let Some(old_id) = cell_value(record.get(0)) else {
                continue;
            };
            let new_id = cell_value(record.get(1)).map(str::to_string);
            rows.entry(old_id.to_string()).or_insert(new_id);
        }
        Ok(Self { rows })
    }

    /// Reads a table from disk. `Ok(None)` if the file does not exist.
    pub fn from_path(path: &Path) -> AssemblyResult<Option<Self>> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AssemblyError::TranslationTable {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        Self::from_reader(file)
            .map(Some)
            .map_err(|e| AssemblyError::TranslationTable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// Adds a row by hand.
    #[must_use]
    pub fn with_row(mut self, old_id: impl Into<String>, new_id: Option<&str>) -> Self {
        self.rows.entry(old_id.into()).or_insert(new_id.map(str::to_string));
        self
    }

    /// Looks up an original gene id.
    #[must_use]
    pub fn lookup(&self, old_id: &str) -> GeneHit<'_> {
        match self.rows.get(old_id) {
            Some(Some(new_id)) => GeneHit::Translated(new_id),
            Some(_) => GeneHit::Unusable,
            None => GeneHit::Missing,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Translation tables for every source of a run.
#[derive(Debug, Clone, Default)]
pub struct GeneTranslations {
    tables: Vec<Option<GeneTranslationTable>>,
}

impl GeneTranslations {
    /// No translation for any source: gene ids are kept as they are.
    #[must_use]
    pub fn disabled(source_count: usize) -> Self {
        Self {
            tables: vec![None; source_count],
        }
    }

    /// Loads `<folder>/<source>_blast.tsv` for every source.
    ///
    /// A missing file is reported as a diagnostic and the source falls back
    /// to its original gene ids.
    pub fn load(folder: &Path, sources: &SourceRegistry, diagnostics: &mut Diagnostics) -> AssemblyResult<Self> {
        let mut tables = Vec::with_capacity(sources.len());
        for (_, name) in sources.iter() {
            let path: PathBuf = folder.join(format!("{name}{TABLE_SUFFIX}"));
            let table = GeneTranslationTable::from_path(&path)?;
            if table.is_none() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::MissingTranslationTable,
                        name,
                        format!("{} cannot be opened; original gene ids are used", path.display()),
                    )
                    .with_source(name),
                );
            }
            tables.push(table);
        }
        Ok(Self { tables })
    }

    /// Installs (or replaces) the table of one source.
    pub fn set(&mut self, source: SourceId, table: GeneTranslationTable) {
        if self.tables.len() <= source.index() {
            self.tables.resize(source.index() + 1, None);
        }
        self.tables[source.index()] = Some(table);
    }

    /// Table of one source, if it has one.
    #[must_use]
    pub fn table(&self, source: SourceId) -> Option<&GeneTranslationTable> {
        self.tables.get(source.index()).and_then(Option::as_ref)
    }

    /// Canonical id of a gene: the translated id, the original id when the
    /// source has no table, or [`NOT_FOUND`] when the table has no usable row.
    #[must_use]
    pub fn new_gene_id<'a>(&'a self, source: SourceId, old_id: &'a str) -> &'a str {
        match self.table(source) {
            None => old_id,
            Some(table) => match table.lookup(old_id) {
                GeneHit::Translated(new_id) => new_id,
                GeneHit::Unusable | GeneHit::Missing => NOT_FOUND,
            },
        }
    }
}
