//! Column catalog — the injected (table, column) → type-tag mapping.
//!
//! Schema introspection happens outside this crate; its results arrive here
//! as a pre-populated [`ColumnCatalog`], loadable from JSON the same way
//! other externally-cached metadata is. Lookups are performed once, when a
//! containment predicate is *constructed* (see [`crate::predicate`]), never
//! at render time.
//!
//! An unknown column is not an error: [`ColumnCatalog::lookup`] returns
//! [`TypeTag::Other`], and predicate construction falls back to the
//! network-containment operator family. Ambiguous matches (the same column
//! name on several tables) are resolved deterministically by the tie-break
//! in [`ColumnCatalog::lookup`] and never raise.

use serde::{Deserialize, Serialize};

use crate::error::PgComposeError;

/// Declared storage type of a column, as reported by introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Array,
    Hstore,
    Json,
    Jsonb,
    Inet,
    Other,
}

/// One introspected column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub table: String,
    pub column: String,
    pub tag: TypeTag,
}

/// Read-only column metadata, in introspection order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnCatalog {
    columns: Vec<ColumnMeta>,
}

impl ColumnCatalog {
    pub fn new() -> ColumnCatalog {
        ColumnCatalog::default()
    }

    /// Register a column. Later entries never shadow earlier ones during
    /// lookup; order is the tie-break of last resort.
    pub fn add(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        tag: TypeTag,
    ) -> &mut ColumnCatalog {
        self.columns.push(ColumnMeta {
            table: table.into(),
            column: column.into(),
            tag,
        });
        self
    }

    /// Deserialize a catalog from the JSON produced by the introspection
    /// layer.
    pub fn from_json(json: &str) -> Result<ColumnCatalog, PgComposeError> {
        serde_json::from_str(json)
            .map_err(|e| PgComposeError::MalformedNode(format!("invalid catalog JSON: {e}")))
    }

    /// Serialize the catalog back to JSON.
    pub fn to_json(&self) -> Result<String, PgComposeError> {
        serde_json::to_string(self)
            .map_err(|e| PgComposeError::InternalError(format!("catalog serialization: {e}")))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolve the type tag for a column referenced from `relation`.
    ///
    /// Candidates match when their column name equals `column` or equals
    /// the relation name itself (a column named after its table). Among
    /// candidates, the one whose owning table is `relation` is preferred;
    /// otherwise the one whose name is exactly `column`; the first match in
    /// catalog order wins and no further candidates are considered.
    /// No match at all resolves to [`TypeTag::Other`].
    pub fn lookup(&self, relation: &str, column: &str) -> TypeTag {
        let candidates: Vec<&ColumnMeta> = self
            .columns
            .iter()
            .filter(|c| c.column == column || c.column == relation)
            .collect();

        if let Some(meta) = candidates.iter().find(|c| c.table == relation) {
            return meta.tag;
        }
        if let Some(meta) = candidates.iter().find(|c| c.column == column) {
            return meta.tag;
        }
        // A candidate that matched only by relation name still counts.
        candidates.first().map(|c| c.tag).unwrap_or(TypeTag::Other)
    }
}
