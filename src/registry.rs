//! Table registry.
//!
//! Maps a logical table name (the warehouse table) to the artifact file it is
//! delivered as and the shape it is written in. The registry is built once at
//! startup and handed by reference to every component that needs it.

use std::collections::HashMap;

use crate::error_handling::{ExportError, Result};

/// Substring of an artifact filename that is swapped to derive its metadata filename.
const DATA_MARKER: &str = "data";
const META_MARKER: &str = "meta";

/// Label used for the first output line of gene-by-sample matrices.
pub const HUGO_SYMBOL_LABEL: &str = "Hugo_Symbol";

/// How a table's rows are laid out in its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportShape {
    /// One output line per source row.
    RowMajor,
    /// One output line per source column.
    ///
    /// When `first_column_label` is set it replaces the first column's name as the
    /// leading field of the first output line.
    Transposed { first_column_label: Option<String> },
}

/// One exportable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    logical_name: String,
    artifact_filename: String,
    shape: ExportShape,
}

impl TableDescriptor {
    pub fn row_major(logical_name: impl Into<String>, artifact_filename: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            artifact_filename: artifact_filename.into(),
            shape: ExportShape::RowMajor,
        }
    }

    pub fn transposed(
        logical_name: impl Into<String>,
        artifact_filename: impl Into<String>,
        first_column_label: Option<&str>,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            artifact_filename: artifact_filename.into(),
            shape: ExportShape::Transposed {
                first_column_label: first_column_label.map(str::to_string),
            },
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn artifact_filename(&self) -> &str {
        &self.artifact_filename
    }

    pub fn shape(&self) -> &ExportShape {
        &self.shape
    }

    pub fn is_transposed(&self) -> bool {
        matches!(self.shape, ExportShape::Transposed { .. })
    }

    /// Sidecar filename: the first `data` in the artifact filename becomes `meta`.
    pub fn metadata_filename(&self) -> String {
        self.artifact_filename.replacen(DATA_MARKER, META_MARKER, 1)
    }

    /// Artifact filename without its extension (`data_CNA.txt` -> `data_CNA`).
    pub fn artifact_base_name(&self) -> &str {
        match self.artifact_filename.rsplit_once('.') {
            Some((base, _)) if !base.is_empty() => base,
            _ => &self.artifact_filename,
        }
    }
}

/// Immutable set of exportable tables, keyed by logical name.
#[derive(Debug, Clone)]
pub struct Registry {
    tables: Vec<TableDescriptor>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Builds a registry, rejecting repeated logical names.
    pub fn new(tables: impl IntoIterator<Item = TableDescriptor>) -> Result<Self> {
        let mut registry = Registry {
            tables: Vec::new(),
            index: HashMap::new(),
        };
        for table in tables {
            if registry.index.contains_key(table.logical_name()) {
                return Err(ExportError::DuplicateTable(table.logical_name.clone()));
            }
            registry
                .index
                .insert(table.logical_name.clone(), registry.tables.len());
            registry.tables.push(table);
        }
        Ok(registry)
    }

    /// The cBioPortal staging layout.
    pub fn cbioportal() -> Self {
        let tables = vec![
            TableDescriptor::row_major("data_clinical_patient", "data_clinical_patient.txt"),
            TableDescriptor::row_major("data_clinical_sample", "data_clinical_sample.txt"),
            TableDescriptor::row_major("data_mutations_extended", "data_mutations_extended.txt"),
            TableDescriptor::row_major("data_sv", "data_sv.txt"),
            TableDescriptor::row_major("data_timeline", "data_timeline.txt"),
            TableDescriptor::row_major("data_gene_panel_matrix", "data_gene_panel_matrix.txt"),
            TableDescriptor::transposed("data_cna", "data_CNA.txt", Some(HUGO_SYMBOL_LABEL)),
            TableDescriptor::transposed(
                "data_mrna_seq_rpkm",
                "data_mRNA_seq_rpkm.txt",
                Some(HUGO_SYMBOL_LABEL),
            ),
            TableDescriptor::transposed(
                "data_methylation_hm27",
                "data_methylation_hm27.txt",
                Some(HUGO_SYMBOL_LABEL),
            ),
        ];
        let index = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.logical_name.clone(), i))
            .collect();
        Registry { tables, index }
    }

    pub fn lookup(&self, logical_name: &str) -> Option<&TableDescriptor> {
        self.index.get(logical_name).map(|&i| &self.tables[i])
    }

    /// Like [`Registry::lookup`], but a missing entry is an `UnsupportedTable` error.
    pub fn require(&self, logical_name: &str) -> Result<&TableDescriptor> {
        self.lookup(logical_name)
            .ok_or_else(|| ExportError::UnsupportedTable(logical_name.to_string()))
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.index.contains_key(logical_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::cbioportal()
    }
}
