//! Dialect dispatch registry and SQL rendering.
//!
//! A [`Dialect`] maps node kinds to rendering functions. Looking up a
//! handler walks an explicit fallback chain: the dialect's own `unsupported`
//! set is consulted first (a hard [`UnsupportedConstruct`] failure), then
//! its handler table, then its declared parent. A dialect overrides or
//! gates a subset of handlers without touching any other dialect — adding a
//! dialect never requires editing an existing one.
//!
//! Rendering is a pure function of the AST and the dialect: no I/O, no
//! database, no re-resolution of containment operators (those were fixed at
//! construction time, see [`crate::predicate`]).
//!
//! Two dialects ship out of the box: [`Dialect::postgres`], carrying the
//! full containment and aggregate vocabulary, and [`Dialect::lite`], which
//! inherits everything but rejects the hstore and network operator
//! families.
//!
//! [`UnsupportedConstruct`]: PgComposeError::UnsupportedConstruct

use std::collections::{HashMap, HashSet};

use crate::ast::{
    AggregateCall, Expr, InfixPredicate, NodeKind, OrderClause, Query, QueryBody, SetOperation,
};
use crate::error::PgComposeError;

/// Quote a SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Borrowed dispatch payload handed to a [`RenderFn`].
#[derive(Debug, Clone, Copy)]
pub enum SqlNode<'a> {
    Infix(&'a InfixPredicate),
    Aggregate(&'a AggregateCall),
    SetOp(&'a SetOperation),
}

impl SqlNode<'_> {
    /// The dispatch key for this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            SqlNode::Infix(pred) => pred.op.node_kind(),
            SqlNode::Aggregate(call) => call.node_kind(),
            SqlNode::SetOp(op) => op.kind.node_kind(),
        }
    }
}

/// A rendering function for one node kind. Receives the dialect the render
/// was started against, so recursive child rendering sees the full chain.
pub type RenderFn = fn(&Dialect, &SqlNode<'_>) -> Result<String, PgComposeError>;

/// A target SQL variant: a handler table plus an optional parent to fall
/// back to. Construct once at process start and pass by reference.
#[derive(Debug, Clone)]
pub struct Dialect {
    name: String,
    parent: Option<Box<Dialect>>,
    handlers: HashMap<NodeKind, RenderFn>,
    unsupported: HashSet<NodeKind>,
}

impl Dialect {
    /// An empty dialect inheriting from `parent`.
    pub fn derive(name: impl Into<String>, parent: Dialect) -> Dialect {
        Dialect {
            name: name.into(),
            parent: Some(Box::new(parent)),
            handlers: HashMap::new(),
            unsupported: HashSet::new(),
        }
    }

    /// An empty root dialect with no fallback.
    pub fn root(name: impl Into<String>) -> Dialect {
        Dialect {
            name: name.into(),
            parent: None,
            handlers: HashMap::new(),
            unsupported: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install or replace the handler for one node kind. Local to this
    /// dialect; parents and siblings are unaffected.
    pub fn set_handler(&mut self, kind: NodeKind, f: RenderFn) -> &mut Dialect {
        self.handlers.insert(kind, f);
        self
    }

    /// Mark a node kind unsupported, severing inheritance for it.
    pub fn mark_unsupported(&mut self, kind: NodeKind) -> &mut Dialect {
        self.unsupported.insert(kind);
        self
    }

    /// Resolve the handler for a node kind through the fallback chain.
    fn handler(&self, kind: NodeKind) -> Result<RenderFn, PgComposeError> {
        let mut dialect = Some(self);
        while let Some(d) = dialect {
            if d.unsupported.contains(&kind) {
                return Err(PgComposeError::UnsupportedConstruct {
                    kind: kind.as_str(),
                    dialect: self.name.clone(),
                });
            }
            if let Some(f) = d.handlers.get(&kind) {
                return Ok(*f);
            }
            dialect = d.parent.as_deref();
        }
        Err(PgComposeError::UnsupportedConstruct {
            kind: kind.as_str(),
            dialect: self.name.clone(),
        })
    }

    /// Render a dispatchable node.
    pub fn render_node(&self, node: &SqlNode<'_>) -> Result<String, PgComposeError> {
        let f = self.handler(node.kind())?;
        f(self, node)
    }

    /// Render an expression.
    pub fn render_expr(&self, expr: &Expr) -> Result<String, PgComposeError> {
        match expr {
            Expr::Column { relation, name } => match relation {
                Some(rel) => Ok(format!("{}.{}", quote_ident(rel), quote_ident(name))),
                None => Ok(quote_ident(name)),
            },
            Expr::Literal(text) => Ok(text.clone()),
            Expr::Raw(sql) => Ok(sql.clone()),
            Expr::Infix(pred) => self.render_node(&SqlNode::Infix(pred)),
            Expr::Aggregate(call) => self.render_node(&SqlNode::Aggregate(call)),
        }
    }

    /// Render an `ORDER BY` element list (without the keyword).
    pub fn render_orderings(&self, orderings: &[OrderClause]) -> Result<String, PgComposeError> {
        let mut parts = Vec::with_capacity(orderings.len());
        for clause in orderings {
            let expr = self.render_expr(&clause.expr)?;
            parts.push(match clause.direction {
                Some(dir) => format!("{expr} {}", dir.as_str()),
                None => expr,
            });
        }
        Ok(parts.join(", "))
    }

    /// Render a query as a standalone statement:
    /// `WITH …` (if any CTEs) + body + `ORDER BY …` (if the body is a set
    /// operation carrying one).
    pub fn render_standalone(&self, query: &Query) -> Result<String, PgComposeError> {
        let with = self.render_with_clause(query)?;
        match query.body() {
            QueryBody::Select(select) => Ok(format!("{with}{}", select.sql)),
            QueryBody::SetOp(op) => {
                let body = self.render_node(&SqlNode::SetOp(op))?;
                if op.order_by.is_empty() {
                    Ok(format!("{with}{body}"))
                } else {
                    let tail = self.render_orderings(&op.order_by)?;
                    Ok(format!("{with}( {body} ) ORDER BY {tail}"))
                }
            }
        }
    }

    /// Render a query for embedding in a derived-table context:
    /// `( <standalone> ) AS "alias"`.
    pub fn render(&self, query: &Query) -> Result<String, PgComposeError> {
        let inner = self.render_standalone(query)?;
        Ok(format!(
            "( {inner} ) AS {}",
            quote_ident(query.effective_alias())
        ))
    }

    /// Render a query as a branch of an enclosing set operation.
    ///
    /// The branch's CTEs were hoisted into the enclosing query at
    /// composition time, and a nested set operation's `order_by` and alias
    /// are exercised only when that branch is rendered standalone — so a
    /// branch renders as its bare body.
    fn render_branch(&self, query: &Query) -> Result<String, PgComposeError> {
        match query.body() {
            QueryBody::Select(select) => Ok(select.sql.clone()),
            QueryBody::SetOp(op) => self.render_node(&SqlNode::SetOp(op)),
        }
    }

    /// Render the `WITH name AS (…), …` prefix, or an empty string when
    /// the query owns no CTEs. Includes the trailing space.
    fn render_with_clause(&self, query: &Query) -> Result<String, PgComposeError> {
        if query.ctes().is_empty() {
            return Ok(String::new());
        }
        let mut defs = Vec::with_capacity(query.ctes().len());
        for entry in query.ctes().entries() {
            let body = self.render_standalone(&entry.query)?;
            defs.push(format!("{} AS ({body})", quote_ident(&entry.name)));
        }
        Ok(format!("WITH {} ", defs.join(", ")))
    }

    // ── Built-in dialects ──────────────────────────────────────────────

    /// The full-featured dialect: every containment operator, the JSON and
    /// array aggregate vocabulary, and all four set operations.
    pub fn postgres() -> Dialect {
        let mut d = Dialect::root("postgres");
        d.set_handler(NodeKind::Overlap, render_overlap)
            .set_handler(NodeKind::ContainsArray, render_contains_array)
            .set_handler(NodeKind::ContainsHstore, render_contains_hstore)
            .set_handler(NodeKind::ContainsJsonb, render_contains_jsonb)
            .set_handler(NodeKind::ContainedInArray, render_contained_in_array)
            .set_handler(NodeKind::ContainedInHstore, render_contained_in_hstore)
            .set_handler(NodeKind::InetContains, render_inet_contains)
            .set_handler(NodeKind::InetContainedWithin, render_inet_contained_within)
            .set_handler(
                NodeKind::InetContainsOrContainedWithin,
                render_inet_contains_or_contained_within,
            )
            .set_handler(NodeKind::InetContainsEquals, render_inet_contains_equals)
            .set_handler(
                NodeKind::InetContainedWithinEquals,
                render_inet_contained_within_equals,
            )
            .set_handler(NodeKind::RowToJson, render_aggregate)
            .set_handler(NodeKind::ToJson, render_aggregate)
            .set_handler(NodeKind::ToJsonb, render_aggregate)
            .set_handler(NodeKind::JsonBuildObject, render_aggregate)
            .set_handler(NodeKind::JsonbBuildObject, render_aggregate)
            .set_handler(NodeKind::Array, render_aggregate)
            .set_handler(NodeKind::ArrayAgg, render_aggregate)
            .set_handler(NodeKind::AggregateFunction, render_aggregate)
            .set_handler(NodeKind::Union, render_union)
            .set_handler(NodeKind::UnionAll, render_union_all)
            .set_handler(NodeKind::Except, render_except)
            .set_handler(NodeKind::Intersect, render_intersect);
        d
    }

    /// A restricted dialect on top of [`Dialect::postgres`]: set
    /// operations, JSON aggregates, and array containment inherit
    /// unchanged, while the hstore and network operator families are
    /// rejected with `UnsupportedConstruct`.
    pub fn lite() -> Dialect {
        let mut d = Dialect::derive("lite", Dialect::postgres());
        d.mark_unsupported(NodeKind::ContainsHstore)
            .mark_unsupported(NodeKind::ContainedInHstore)
            .mark_unsupported(NodeKind::InetContains)
            .mark_unsupported(NodeKind::InetContainedWithin)
            .mark_unsupported(NodeKind::InetContainsOrContainedWithin)
            .mark_unsupported(NodeKind::InetContainsEquals)
            .mark_unsupported(NodeKind::InetContainedWithinEquals);
        d
    }
}

// ── Shared rendering helpers ───────────────────────────────────────────────

/// Render one infix operand, parenthesizing nested binary nodes.
fn operand(dialect: &Dialect, expr: &Expr) -> Result<String, PgComposeError> {
    let sql = dialect.render_expr(expr)?;
    match expr {
        Expr::Infix(_) => Ok(format!("( {sql} )")),
        _ => Ok(sql),
    }
}

/// Render `left <operator> right`.
fn infix_value(
    dialect: &Dialect,
    node: &SqlNode<'_>,
    operator: &str,
) -> Result<String, PgComposeError> {
    let SqlNode::Infix(pred) = node else {
        return Err(PgComposeError::InternalError(
            "infix handler called on non-infix node".into(),
        ));
    };
    Ok(format!(
        "{} {operator} {}",
        operand(dialect, &pred.left)?,
        operand(dialect, &pred.right)?,
    ))
}

/// Render `left <KEYWORD> right` for a set operation.
fn set_op_value(
    dialect: &Dialect,
    node: &SqlNode<'_>,
    keyword: &str,
) -> Result<String, PgComposeError> {
    let SqlNode::SetOp(op) = node else {
        return Err(PgComposeError::InternalError(
            "set-operation handler called on non-set-operation node".into(),
        ));
    };
    Ok(format!(
        "{} {keyword} {}",
        dialect.render_branch(&op.left)?,
        dialect.render_branch(&op.right)?,
    ))
}

// ── Infix predicate handlers ───────────────────────────────────────────────

fn render_overlap(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "&&")
}

fn render_contains_array(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "@>")
}

fn render_contains_hstore(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "@>")
}

fn render_contains_jsonb(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "@>")
}

fn render_contained_in_array(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "<@")
}

fn render_contained_in_hstore(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "<@")
}

fn render_inet_contains(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, ">>")
}

fn render_inet_contained_within(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, "<<")
}

fn render_inet_contains_or_contained_within(
    d: &Dialect,
    n: &SqlNode<'_>,
) -> Result<String, PgComposeError> {
    infix_value(d, n, "&&")
}

fn render_inet_contains_equals(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    infix_value(d, n, ">>=")
}

fn render_inet_contained_within_equals(
    d: &Dialect,
    n: &SqlNode<'_>,
) -> Result<String, PgComposeError> {
    infix_value(d, n, "<<=")
}

// ── Aggregate handler ──────────────────────────────────────────────────────

/// Render `NAME(DISTINCT expr, … ORDER BY …) AS alias`.
///
/// Shared by every aggregate node kind; the call node carries its own
/// function name. Orderings render inside the parentheses only.
fn render_aggregate(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    let SqlNode::Aggregate(call) = n else {
        return Err(PgComposeError::InternalError(
            "aggregate handler called on non-aggregate node".into(),
        ));
    };

    let mut sql = format!("{}(", call.name);
    if call.distinct {
        sql.push_str("DISTINCT ");
    }
    let mut args = Vec::with_capacity(call.expressions.len());
    for expr in &call.expressions {
        args.push(d.render_expr(expr)?);
    }
    sql.push_str(&args.join(", "));
    if !call.orderings.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&d.render_orderings(&call.orderings)?);
    }
    sql.push(')');
    if let Some(alias) = &call.alias {
        sql.push_str(" AS ");
        sql.push_str(&quote_ident(alias));
    }
    Ok(sql)
}

// ── Set operation handlers ─────────────────────────────────────────────────

fn render_union(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    set_op_value(d, n, "UNION")
}

fn render_union_all(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    set_op_value(d, n, "UNION ALL")
}

fn render_except(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    set_op_value(d, n, "EXCEPT")
}

fn render_intersect(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
    set_op_value(d, n, "INTERSECT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AggregateCall, InfixOp, InfixPredicate};

    fn infix(op: InfixOp) -> InfixPredicate {
        InfixPredicate::new(op, Expr::qualified("users", "tags"), Expr::literal("'{a}'")).unwrap()
    }

    fn render_infix(d: &Dialect, op: InfixOp) -> Result<String, PgComposeError> {
        let pred = infix(op);
        d.render_node(&SqlNode::Infix(&pred))
    }

    // ── quote_ident ─────────────────────────────────────────────────

    #[test]
    fn test_quote_ident_simple() {
        assert_eq!(quote_ident("name"), "\"name\"");
    }

    #[test]
    fn test_quote_ident_embedded_quotes() {
        assert_eq!(quote_ident("col\"name"), "\"col\"\"name\"");
    }

    // ── Infix operator text ─────────────────────────────────────────

    #[test]
    fn test_infix_operator_text() {
        let d = Dialect::postgres();
        let cases = [
            (InfixOp::Overlap, "&&"),
            (InfixOp::ContainsArray, "@>"),
            (InfixOp::ContainsHstore, "@>"),
            (InfixOp::ContainsJsonb, "@>"),
            (InfixOp::ContainedInArray, "<@"),
            (InfixOp::ContainedInHstore, "<@"),
            (InfixOp::InetContains, ">>"),
            (InfixOp::InetContainedWithin, "<<"),
            (InfixOp::InetContainsOrContainedWithin, "&&"),
            (InfixOp::InetContainsEquals, ">>="),
            (InfixOp::InetContainedWithinEquals, "<<="),
        ];
        for (op, text) in cases {
            let sql = render_infix(&d, op).unwrap();
            assert_eq!(sql, format!("\"users\".\"tags\" {text} '{{a}}'"));
        }
    }

    #[test]
    fn test_nested_infix_operand_parenthesized() {
        let d = Dialect::postgres();
        let inner = infix(InfixOp::ContainsArray);
        let outer = InfixPredicate::new(
            InfixOp::Overlap,
            inner.into_expr(),
            Expr::qualified("users", "tags"),
        )
        .unwrap();
        let sql = d.render_node(&SqlNode::Infix(&outer)).unwrap();
        assert_eq!(
            sql,
            "( \"users\".\"tags\" @> '{a}' ) && \"users\".\"tags\""
        );
    }

    // ── Aggregates ──────────────────────────────────────────────────

    #[test]
    fn test_aggregate_basic() {
        let d = Dialect::postgres();
        let call = AggregateCall::array_agg(vec![Expr::column("name")]).unwrap();
        let sql = d.render_node(&SqlNode::Aggregate(&call)).unwrap();
        assert_eq!(sql, "ARRAY_AGG(\"name\")");
    }

    #[test]
    fn test_aggregate_distinct_ordered_aliased() {
        let d = Dialect::postgres();
        let call = AggregateCall::array_agg(vec![Expr::column("name")])
            .unwrap()
            .with_distinct()
            .unwrap()
            .order_within(vec![OrderClause::desc(Expr::column("name"))])
            .with_alias("names")
            .unwrap();
        let sql = d.render_node(&SqlNode::Aggregate(&call)).unwrap();
        assert_eq!(
            sql,
            "ARRAY_AGG(DISTINCT \"name\" ORDER BY \"name\" DESC) AS \"names\""
        );
    }

    #[test]
    fn test_aggregate_orderings_stay_inside_parens() {
        let d = Dialect::postgres();
        let call = AggregateCall::json_build_object(vec![
            Expr::literal("'id'"),
            Expr::column("id"),
        ])
        .unwrap()
        .order_within(vec![OrderClause::asc(Expr::column("id"))]);
        let sql = d.render_node(&SqlNode::Aggregate(&call)).unwrap();
        assert_eq!(sql, "JSON_BUILD_OBJECT('id', \"id\" ORDER BY \"id\" ASC)");
        assert!(sql.ends_with(')'));
    }

    #[test]
    fn test_aggregate_function_names() {
        let d = Dialect::postgres();
        let cases: [(AggregateCall, &str); 4] = [
            (
                AggregateCall::row_to_json(vec![Expr::column("users")]).unwrap(),
                "ROW_TO_JSON(\"users\")",
            ),
            (
                AggregateCall::to_json(vec![Expr::column("id")]).unwrap(),
                "TO_JSON(\"id\")",
            ),
            (
                AggregateCall::to_jsonb(vec![Expr::column("id")]).unwrap(),
                "TO_JSONB(\"id\")",
            ),
            (
                AggregateCall::array(vec![Expr::raw("SELECT id FROM users")]).unwrap(),
                "ARRAY(SELECT id FROM users)",
            ),
        ];
        for (call, expected) in &cases {
            assert_eq!(&d.render_node(&SqlNode::Aggregate(call)).unwrap(), expected);
        }
    }

    #[test]
    fn test_aggregate_inside_expression() {
        let d = Dialect::postgres();
        let call = AggregateCall::to_jsonb(vec![Expr::column("data")]).unwrap();
        let pred = InfixPredicate::new(
            InfixOp::ContainsJsonb,
            call.into_expr(),
            Expr::literal("'{}'"),
        )
        .unwrap();
        let sql = d.render_node(&SqlNode::Infix(&pred)).unwrap();
        assert_eq!(sql, "TO_JSONB(\"data\") @> '{}'");
    }

    // ── Fallback chain / gating ─────────────────────────────────────

    #[test]
    fn test_lite_inherits_array_and_json_handlers() {
        let d = Dialect::lite();
        let sql = render_infix(&d, InfixOp::ContainsArray).unwrap();
        assert_eq!(sql, "\"users\".\"tags\" @> '{a}'");

        let call = AggregateCall::json_build_object(vec![Expr::literal("'a'")]).unwrap();
        assert!(d.render_node(&SqlNode::Aggregate(&call)).is_ok());
    }

    #[test]
    fn test_lite_rejects_hstore_and_inet() {
        let d = Dialect::lite();
        for op in [
            InfixOp::ContainsHstore,
            InfixOp::ContainedInHstore,
            InfixOp::InetContains,
            InfixOp::InetContainedWithin,
            InfixOp::InetContainsOrContainedWithin,
            InfixOp::InetContainsEquals,
            InfixOp::InetContainedWithinEquals,
        ] {
            let err = render_infix(&d, op).unwrap_err();
            match err {
                PgComposeError::UnsupportedConstruct { kind, dialect } => {
                    assert_eq!(kind, op.node_kind().as_str());
                    assert_eq!(dialect, "lite");
                }
                other => panic!("expected UnsupportedConstruct, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unsupported_blocks_even_local_handler_in_child() {
        // Marking unsupported severs inheritance before the parent's
        // handler is consulted.
        let mut d = Dialect::derive("gated", Dialect::postgres());
        d.mark_unsupported(NodeKind::Overlap);
        assert!(render_infix(&d, InfixOp::Overlap).is_err());
    }

    #[test]
    fn test_override_is_local_to_dialect() {
        fn render_tilde(d: &Dialect, n: &SqlNode<'_>) -> Result<String, PgComposeError> {
            infix_value(d, n, "~")
        }
        let mut child = Dialect::derive("custom", Dialect::postgres());
        child.set_handler(NodeKind::ContainsArray, render_tilde);

        let sql = render_infix(&child, InfixOp::ContainsArray).unwrap();
        assert_eq!(sql, "\"users\".\"tags\" ~ '{a}'");

        // The parent keeps its own handler.
        let base = Dialect::postgres();
        let sql = render_infix(&base, InfixOp::ContainsArray).unwrap();
        assert_eq!(sql, "\"users\".\"tags\" @> '{a}'");
    }

    #[test]
    fn test_root_dialect_without_handler_errors() {
        let d = Dialect::root("empty");
        let err = render_infix(&d, InfixOp::Overlap).unwrap_err();
        assert!(matches!(
            err,
            PgComposeError::UnsupportedConstruct { dialect, .. } if dialect == "empty"
        ));
    }

    // ── Query rendering ─────────────────────────────────────────────

    fn users(filter: &str) -> Query {
        Query::select("users", format!("SELECT * FROM users WHERE {filter}")).unwrap()
    }

    #[test]
    fn test_render_standalone_select() {
        let d = Dialect::postgres();
        let q = users("id = 1");
        assert_eq!(
            d.render_standalone(&q).unwrap(),
            "SELECT * FROM users WHERE id = 1"
        );
    }

    #[test]
    fn test_render_standalone_select_with_cte() {
        let d = Dialect::postgres();
        let q = users("id = 2")
            .with("all_others", users("id != 1"))
            .unwrap();
        assert_eq!(
            d.render_standalone(&q).unwrap(),
            "WITH \"all_others\" AS (SELECT * FROM users WHERE id != 1) \
             SELECT * FROM users WHERE id = 2"
        );
    }

    #[test]
    fn test_render_embedded_defaults_to_table_alias() {
        let d = Dialect::postgres();
        let q = users("id = 1");
        assert_eq!(
            d.render(&q).unwrap(),
            "( SELECT * FROM users WHERE id = 1 ) AS \"users\""
        );
    }
}
