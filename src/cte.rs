//! CTE sets and the flattening merge.
//!
//! A [`CteSet`] is an ordered, name-keyed collection of CTE definitions.
//! Insertion order is significant: the first-inserted entry is the
//! outermost/parent definition, and on a name collision the existing
//! (outer) definition always wins — both within a single query's `with`
//! chain and when two branches of a composition are merged.
//!
//! [`CteSet::merge`] is applied pairwise at every composition step, so CTE
//! definitions hoist transitively to the outermost `WITH` clause no matter
//! how deeply the set operation that introduced them ends up nested. The
//! merge never fails; collisions model intentional shadowing by the outer
//! scope.

use std::sync::Arc;

use crate::ast::Query;
use crate::error::PgComposeError;

/// A single named CTE definition.
#[derive(Debug, Clone)]
pub struct CteDefinition {
    pub name: String,
    pub query: Arc<Query>,
}

/// An ordered mapping from CTE name to definition, unique keys.
#[derive(Debug, Clone, Default)]
pub struct CteSet {
    entries: Vec<CteDefinition>,
}

impl CteSet {
    pub fn new() -> CteSet {
        CteSet::default()
    }

    /// Insert a definition. Keeps the existing entry if the name is
    /// already present (outer scope wins).
    ///
    /// An empty name is the only failure; collisions are not errors.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        query: Arc<Query>,
    ) -> Result<(), PgComposeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PgComposeError::MalformedNode(
                "CTE definition with empty name".into(),
            ));
        }
        if !self.contains(&name) {
            self.entries.push(CteDefinition { name, query });
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&CteDefinition> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The definitions in rendering order.
    pub fn entries(&self) -> &[CteDefinition] {
        &self.entries
    }

    /// Merge two CTE sets for a composition: `left` is the parent/outer
    /// side and keeps its order; `right` entries are appended in their own
    /// relative order, dropping any whose name the accumulating set already
    /// holds.
    pub fn merge(left: &CteSet, right: &CteSet) -> CteSet {
        let mut merged = left.clone();
        for entry in &right.entries {
            if !merged.contains(&entry.name) {
                merged.entries.push(entry.clone());
            }
        }
        merged
    }
}
