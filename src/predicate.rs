//! Typed containment predicate construction.
//!
//! The operator symbol of a `contains` / `contained-in` predicate depends on
//! the declared type of the left operand's target column, and is fixed
//! *here*, at construction time. Rendering never re-resolves it.
//!
//! Resolution consults the injected [`ColumnCatalog`]:
//! - `array` columns use the array containment pair,
//! - `hstore` / `jsonb` / `json` columns use the structured containment
//!   pair,
//! - anything else — including columns the catalog does not know — falls
//!   back to the network-containment operator family. The fallback is
//!   documented behavior carried over from the source system, which treats
//!   an unknown column as a scalar/network value; it is not an error.

use crate::ast::{Expr, InfixOp, InfixPredicate};
use crate::catalog::{ColumnCatalog, TypeTag};
use crate::error::PgComposeError;

/// Resolve the type tag of `left`'s target column.
///
/// Non-column expressions have no target column and resolve to `Other`.
fn resolve(catalog: &ColumnCatalog, left: &Expr) -> TypeTag {
    match left.column_name() {
        Some(column) => catalog.lookup(left.relation_name().unwrap_or(""), column),
        None => TypeTag::Other,
    }
}

/// Build a `left contains right` predicate with the operator chosen from
/// the resolved type of `left`.
pub fn contains(
    catalog: &ColumnCatalog,
    left: Expr,
    right: Expr,
) -> Result<InfixPredicate, PgComposeError> {
    let op = match resolve(catalog, &left) {
        TypeTag::Array => InfixOp::ContainsArray,
        TypeTag::Hstore => InfixOp::ContainsHstore,
        TypeTag::Jsonb | TypeTag::Json => InfixOp::ContainsJsonb,
        TypeTag::Inet | TypeTag::Other => InfixOp::InetContains,
    };
    InfixPredicate::new(op, left, right)
}

/// Build a `left contained-in right` predicate with the operator chosen
/// from the resolved type of `left`.
pub fn contained_in(
    catalog: &ColumnCatalog,
    left: Expr,
    right: Expr,
) -> Result<InfixPredicate, PgComposeError> {
    let op = match resolve(catalog, &left) {
        TypeTag::Array => InfixOp::ContainedInArray,
        TypeTag::Hstore | TypeTag::Jsonb | TypeTag::Json => InfixOp::ContainedInHstore,
        TypeTag::Inet | TypeTag::Other => InfixOp::InetContainedWithin,
    };
    InfixPredicate::new(op, left, right)
}

/// Build an overlap (`&&`) predicate. No type resolution is involved.
pub fn overlap(left: Expr, right: Expr) -> Result<InfixPredicate, PgComposeError> {
    InfixPredicate::new(InfixOp::Overlap, left, right)
}

// ── Explicit network-containment constructors ──────────────────────────────
// For callers that already know the operand is a network value and want a
// specific member of the inet operator family.

pub fn inet_contains(left: Expr, right: Expr) -> Result<InfixPredicate, PgComposeError> {
    InfixPredicate::new(InfixOp::InetContains, left, right)
}

pub fn inet_contained_within(left: Expr, right: Expr) -> Result<InfixPredicate, PgComposeError> {
    InfixPredicate::new(InfixOp::InetContainedWithin, left, right)
}

pub fn inet_contains_or_contained_within(
    left: Expr,
    right: Expr,
) -> Result<InfixPredicate, PgComposeError> {
    InfixPredicate::new(InfixOp::InetContainsOrContainedWithin, left, right)
}

pub fn inet_contains_equals(left: Expr, right: Expr) -> Result<InfixPredicate, PgComposeError> {
    InfixPredicate::new(InfixOp::InetContainsEquals, left, right)
}

pub fn inet_contained_within_equals(
    left: Expr,
    right: Expr,
) -> Result<InfixPredicate, PgComposeError> {
    InfixPredicate::new(InfixOp::InetContainedWithinEquals, left, right)
}
