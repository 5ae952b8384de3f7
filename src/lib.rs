//! pg_compose — SQL set-operation composition with dialect-aware rendering.
//!
//! This crate builds an abstract syntax tree for a query and renders it to
//! dialect-correct SQL text. Three things live here:
//!
//! - an open set of AST node kinds (set operations, aggregate calls, typed
//!   containment predicates) dispatched through a per-dialect handler
//!   registry with explicit fallback chains ([`dialect`]);
//! - a structural composer that merges two query ASTs into a set-operation
//!   query, handling aliasing and `ORDER BY` placement ([`compose`]);
//! - a flattener that hoists the CTE definitions carried by composed
//!   branches into a single de-duplicated top-level `WITH` clause ([`cte`]).
//!
//! Base single-table SELECT generation, query execution, and schema
//! introspection are external: base queries enter as pre-rendered SQL
//! tagged with their driving table ([`Query::select`]), and column metadata
//! enters as an injected [`ColumnCatalog`] consulted once at predicate
//! construction time.
//!
//! ```
//! use pg_compose::{Dialect, Query, render_standalone};
//!
//! let d = Dialect::postgres();
//! let q = Query::select("users", "SELECT * FROM users WHERE id = 1")?
//!     .union(Query::select("users", "SELECT * FROM users WHERE id = 2")?);
//! assert_eq!(
//!     render_standalone(&q, &d)?,
//!     "SELECT * FROM users WHERE id = 1 UNION SELECT * FROM users WHERE id = 2",
//! );
//! # Ok::<(), pg_compose::PgComposeError>(())
//! ```

pub mod ast;
pub mod catalog;
pub mod compose;
pub mod cte;
pub mod dialect;
pub mod error;
pub mod predicate;

pub use ast::{
    AggregateCall, Expr, InfixOp, InfixPredicate, NodeKind, OrderClause, Query, QueryBody,
    SelectFragment, SetOpKind, SetOperation, SortDirection,
};
pub use catalog::{ColumnCatalog, ColumnMeta, TypeTag};
pub use compose::compose;
pub use cte::{CteDefinition, CteSet};
pub use dialect::{Dialect, RenderFn, SqlNode, quote_ident};
pub use error::{PgComposeError, PgComposeErrorKind};

/// Render a query for embedding in a derived-table context:
/// `( … ) AS "alias"`.
pub fn render(query: &Query, dialect: &Dialect) -> Result<String, PgComposeError> {
    dialect.render(query)
}

/// Render a query as a standalone statement, suitable for equality
/// comparison against a plain query's SQL.
pub fn render_standalone(query: &Query, dialect: &Dialect) -> Result<String, PgComposeError> {
    dialect.render_standalone(query)
}
