//! Set-operation composition.
//!
//! [`compose`] merges two independently built query ASTs into one
//! set-operation query. The inputs are never mutated: branches are shared
//! via `Arc`, and only the wrapping node and the merged CTE set are freshly
//! constructed. CTE definitions from both sides hoist into the new query's
//! top-level set ([`CteSet::merge`]), outer side winning on name collision.
//!
//! The fluent surface on [`Query`] mirrors the upstream query-builder
//! calls: `union` / `union_all` / `except` / `intersect` produce a new
//! composition, `order` attaches an `ORDER BY` to the most recently
//! produced set-operation node, and `alias` names the composed result for
//! derived-table embedding. Ordering attached before a further composition
//! stays on its own nesting level; only the outermost node's ordering
//! appears at the tail of the rendered statement.

use std::sync::Arc;

use crate::ast::{OrderClause, Query, QueryBody, SetOpKind, SetOperation};
use crate::cte::CteSet;
use crate::error::PgComposeError;

/// Compose two queries into a set operation.
///
/// Takes `Arc`s so a shared parent AST can participate in several
/// compositions concurrently without copying. The returned query carries no
/// `order_by` and no alias.
pub fn compose(kind: SetOpKind, left: Arc<Query>, right: Arc<Query>) -> Query {
    let ctes = CteSet::merge(left.ctes(), right.ctes());
    Query {
        ctes,
        body: QueryBody::SetOp(SetOperation {
            kind,
            left,
            right,
            order_by: Vec::new(),
            alias: None,
        }),
    }
}

impl Query {
    pub fn union(self, other: Query) -> Query {
        compose(SetOpKind::Union, Arc::new(self), Arc::new(other))
    }

    pub fn union_all(self, other: Query) -> Query {
        compose(SetOpKind::UnionAll, Arc::new(self), Arc::new(other))
    }

    pub fn except(self, other: Query) -> Query {
        compose(SetOpKind::Except, Arc::new(self), Arc::new(other))
    }

    pub fn intersect(self, other: Query) -> Query {
        compose(SetOpKind::Intersect, Arc::new(self), Arc::new(other))
    }

    /// Attach an `ORDER BY` to the most recently produced set-operation
    /// node (the current body). Replaces any ordering previously attached
    /// to that node.
    ///
    /// Base selects carry their own ordering inside their SQL text, so
    /// calling this on one is a construction error.
    pub fn order(mut self, orderings: Vec<OrderClause>) -> Result<Query, PgComposeError> {
        match &mut self.body {
            QueryBody::SetOp(op) => {
                op.order_by = orderings;
                Ok(self)
            }
            QueryBody::Select(_) => Err(PgComposeError::MalformedNode(
                "ORDER BY can only be attached to a set-operation query".into(),
            )),
        }
    }

    /// Name the composed result for derived-table embedding. Replaces any
    /// previously set alias (idempotent, never stacks).
    pub fn alias(mut self, name: impl Into<String>) -> Result<Query, PgComposeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PgComposeError::MalformedNode(
                "set-operation alias must not be empty".into(),
            ));
        }
        match &mut self.body {
            QueryBody::SetOp(op) => {
                op.alias = Some(name);
                Ok(self)
            }
            QueryBody::Select(_) => Err(PgComposeError::MalformedNode(
                "an alias can only be attached to a set-operation query".into(),
            )),
        }
    }
}
