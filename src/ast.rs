//! Query AST node model.
//!
//! Tagged-variant definitions for every custom SQL construct the crate
//! understands: expressions, typed containment predicates, aggregate calls,
//! and set-operation queries. This layer records *structure only* — no
//! operator text, no dialect knowledge, no type inference. Rendering lives
//! in [`crate::dialect`]; operator selection for containment predicates
//! lives in [`crate::predicate`].
//!
//! All nodes are immutable value trees. Composing two queries shares their
//! sub-trees via [`Arc`] rather than copying them, so a built AST can be
//! read from multiple threads without coordination.

use std::sync::Arc;

use crate::cte::CteSet;
use crate::error::PgComposeError;

// ── Node kinds ─────────────────────────────────────────────────────────────

/// Every dispatchable node kind, used as the key of a dialect's handler
/// table. Fieldless so it can be hashed and compared cheaply; the payload
/// travels separately at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Containment / overlap predicates
    Overlap,
    ContainsArray,
    ContainsHstore,
    ContainsJsonb,
    ContainedInArray,
    ContainedInHstore,
    InetContains,
    InetContainedWithin,
    InetContainsOrContainedWithin,
    InetContainsEquals,
    InetContainedWithinEquals,
    // Aggregate-style function calls
    RowToJson,
    ToJson,
    ToJsonb,
    JsonBuildObject,
    JsonbBuildObject,
    Array,
    ArrayAgg,
    AggregateFunction,
    // Set operations
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl NodeKind {
    /// Stable name used in `UnsupportedConstruct` messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Overlap => "Overlap",
            NodeKind::ContainsArray => "ContainsArray",
            NodeKind::ContainsHstore => "ContainsHstore",
            NodeKind::ContainsJsonb => "ContainsJsonb",
            NodeKind::ContainedInArray => "ContainedInArray",
            NodeKind::ContainedInHstore => "ContainedInHstore",
            NodeKind::InetContains => "InetContains",
            NodeKind::InetContainedWithin => "InetContainedWithin",
            NodeKind::InetContainsOrContainedWithin => "InetContainsOrContainedWithin",
            NodeKind::InetContainsEquals => "InetContainsEquals",
            NodeKind::InetContainedWithinEquals => "InetContainedWithinEquals",
            NodeKind::RowToJson => "RowToJson",
            NodeKind::ToJson => "ToJson",
            NodeKind::ToJsonb => "ToJsonb",
            NodeKind::JsonBuildObject => "JsonBuildObject",
            NodeKind::JsonbBuildObject => "JsonbBuildObject",
            NodeKind::Array => "Array",
            NodeKind::ArrayAgg => "ArrayAgg",
            NodeKind::AggregateFunction => "AggregateFunction",
            NodeKind::Union => "Union",
            NodeKind::UnionAll => "UnionAll",
            NodeKind::Except => "Except",
            NodeKind::Intersect => "Intersect",
        }
    }
}

// ── Expressions ────────────────────────────────────────────────────────────

/// A SQL expression (simplified representation).
#[derive(Debug, Clone)]
pub enum Expr {
    /// A column reference: `relation.column` or just `column`.
    Column {
        relation: Option<String>,
        name: String,
    },
    /// A literal value, pre-formatted by the caller (e.g. `'active'`, `1`).
    Literal(String),
    /// Raw SQL text produced by the out-of-scope base generator.
    Raw(String),
    /// A typed containment / overlap predicate.
    Infix(Box<InfixPredicate>),
    /// An aggregate-style function call.
    Aggregate(Box<AggregateCall>),
}

impl Expr {
    /// A bare column reference.
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column {
            relation: None,
            name: name.into(),
        }
    }

    /// A relation-qualified column reference.
    pub fn qualified(relation: impl Into<String>, name: impl Into<String>) -> Expr {
        Expr::Column {
            relation: Some(relation.into()),
            name: name.into(),
        }
    }

    /// A pre-formatted literal.
    pub fn literal(text: impl Into<String>) -> Expr {
        Expr::Literal(text.into())
    }

    /// Raw SQL text, passed through verbatim.
    pub fn raw(sql: impl Into<String>) -> Expr {
        Expr::Raw(sql.into())
    }

    /// The column name this expression targets, if it is a column reference.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Expr::Column { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// The relation qualifier of this expression, if any.
    pub fn relation_name(&self) -> Option<&str> {
        match self {
            Expr::Column { relation, .. } => relation.as_deref(),
            _ => None,
        }
    }

    /// Structural validation, called by node constructors.
    ///
    /// Rejects empty identifiers and empty raw fragments — the node model
    /// records structure only, and an empty identifier has none.
    pub(crate) fn validate(&self) -> Result<(), PgComposeError> {
        match self {
            Expr::Column { relation, name } => {
                if name.is_empty() {
                    return Err(PgComposeError::MalformedNode(
                        "column reference with empty name".into(),
                    ));
                }
                if let Some(rel) = relation
                    && rel.is_empty()
                {
                    return Err(PgComposeError::MalformedNode(
                        "column reference with empty relation qualifier".into(),
                    ));
                }
                Ok(())
            }
            Expr::Literal(text) => {
                if text.is_empty() {
                    Err(PgComposeError::MalformedNode("empty literal".into()))
                } else {
                    Ok(())
                }
            }
            Expr::Raw(sql) => {
                if sql.trim().is_empty() {
                    Err(PgComposeError::MalformedNode("empty raw fragment".into()))
                } else {
                    Ok(())
                }
            }
            // Composite nodes were validated by their own constructors.
            Expr::Infix(_) | Expr::Aggregate(_) => Ok(()),
        }
    }
}

// ── Infix predicates ───────────────────────────────────────────────────────

/// Operator symbol of an [`InfixPredicate`], a closed set.
///
/// The variant records *which* operator was selected, fixed at construction
/// time; the rendered operator text is supplied by the dialect handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Overlap,
    ContainsArray,
    ContainsHstore,
    ContainsJsonb,
    ContainedInArray,
    ContainedInHstore,
    InetContains,
    InetContainedWithin,
    InetContainsOrContainedWithin,
    InetContainsEquals,
    InetContainedWithinEquals,
}

impl InfixOp {
    /// The dispatch key for this operator.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            InfixOp::Overlap => NodeKind::Overlap,
            InfixOp::ContainsArray => NodeKind::ContainsArray,
            InfixOp::ContainsHstore => NodeKind::ContainsHstore,
            InfixOp::ContainsJsonb => NodeKind::ContainsJsonb,
            InfixOp::ContainedInArray => NodeKind::ContainedInArray,
            InfixOp::ContainedInHstore => NodeKind::ContainedInHstore,
            InfixOp::InetContains => NodeKind::InetContains,
            InfixOp::InetContainedWithin => NodeKind::InetContainedWithin,
            InfixOp::InetContainsOrContainedWithin => NodeKind::InetContainsOrContainedWithin,
            InfixOp::InetContainsEquals => NodeKind::InetContainsEquals,
            InfixOp::InetContainedWithinEquals => NodeKind::InetContainedWithinEquals,
        }
    }
}

/// A binary predicate: `left <op> right`.
#[derive(Debug, Clone)]
pub struct InfixPredicate {
    pub op: InfixOp,
    pub left: Expr,
    pub right: Expr,
}

impl InfixPredicate {
    /// Build a predicate, validating both operands.
    pub fn new(op: InfixOp, left: Expr, right: Expr) -> Result<InfixPredicate, PgComposeError> {
        left.validate()?;
        right.validate()?;
        Ok(InfixPredicate { op, left, right })
    }

    /// Wrap into an [`Expr`].
    pub fn into_expr(self) -> Expr {
        Expr::Infix(Box::new(self))
    }
}

// ── Aggregate calls ────────────────────────────────────────────────────────

/// Sort direction for an [`OrderClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` element: an expression with an optional direction.
///
/// `direction: None` renders the bare expression, matching the historical
/// output for order arguments given without an explicit direction.
#[derive(Debug, Clone)]
pub struct OrderClause {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
}

impl OrderClause {
    pub fn new(expr: Expr) -> OrderClause {
        OrderClause {
            expr,
            direction: None,
        }
    }

    pub fn asc(expr: Expr) -> OrderClause {
        OrderClause {
            expr,
            direction: Some(SortDirection::Asc),
        }
    }

    pub fn desc(expr: Expr) -> OrderClause {
        OrderClause {
            expr,
            direction: Some(SortDirection::Desc),
        }
    }
}

/// An aggregate-style function call:
/// `NAME(DISTINCT expr, … ORDER BY …) AS alias`.
///
/// `orderings`, when present, render only inside the call's parentheses,
/// never outside it.
#[derive(Debug, Clone)]
pub struct AggregateCall {
    pub name: String,
    pub(crate) kind: NodeKind,
    pub distinct: bool,
    pub expressions: Vec<Expr>,
    pub orderings: Vec<OrderClause>,
    pub alias: Option<String>,
}

impl AggregateCall {
    fn build(
        name: &str,
        kind: NodeKind,
        expressions: Vec<Expr>,
    ) -> Result<AggregateCall, PgComposeError> {
        if name.is_empty() {
            return Err(PgComposeError::MalformedNode(
                "aggregate call with empty function name".into(),
            ));
        }
        for expr in &expressions {
            expr.validate()?;
        }
        Ok(AggregateCall {
            name: name.to_string(),
            kind,
            distinct: false,
            expressions,
            orderings: Vec::new(),
            alias: None,
        })
    }

    /// An arbitrary named aggregate function.
    pub fn named(
        name: impl Into<String>,
        expressions: Vec<Expr>,
    ) -> Result<AggregateCall, PgComposeError> {
        let name = name.into();
        Self::build(&name, NodeKind::AggregateFunction, expressions)
    }

    pub fn row_to_json(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("ROW_TO_JSON", NodeKind::RowToJson, expressions)
    }

    pub fn to_json(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("TO_JSON", NodeKind::ToJson, expressions)
    }

    pub fn to_jsonb(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("TO_JSONB", NodeKind::ToJsonb, expressions)
    }

    pub fn json_build_object(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("JSON_BUILD_OBJECT", NodeKind::JsonBuildObject, expressions)
    }

    pub fn jsonb_build_object(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("JSONB_BUILD_OBJECT", NodeKind::JsonbBuildObject, expressions)
    }

    pub fn array(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("ARRAY", NodeKind::Array, expressions)
    }

    pub fn array_agg(expressions: Vec<Expr>) -> Result<AggregateCall, PgComposeError> {
        Self::build("ARRAY_AGG", NodeKind::ArrayAgg, expressions)
    }

    /// Mark the call `DISTINCT`. Requires a non-empty expression list.
    pub fn with_distinct(mut self) -> Result<AggregateCall, PgComposeError> {
        if self.expressions.is_empty() {
            return Err(PgComposeError::MalformedNode(
                "DISTINCT aggregate call with no expressions".into(),
            ));
        }
        self.distinct = true;
        Ok(self)
    }

    /// Attach an in-call `ORDER BY` (rendered inside the parentheses).
    pub fn order_within(mut self, orderings: Vec<OrderClause>) -> AggregateCall {
        self.orderings = orderings;
        self
    }

    /// Attach an `AS` alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Result<AggregateCall, PgComposeError> {
        let alias = alias.into();
        if alias.is_empty() {
            return Err(PgComposeError::MalformedNode(
                "aggregate call with empty alias".into(),
            ));
        }
        self.alias = Some(alias);
        Ok(self)
    }

    /// The dispatch key for this call.
    pub fn node_kind(&self) -> NodeKind {
        self.kind
    }

    /// Wrap into an [`Expr`].
    pub fn into_expr(self) -> Expr {
        Expr::Aggregate(Box::new(self))
    }
}

// ── Set operations ─────────────────────────────────────────────────────────

/// The four supported set-operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl SetOpKind {
    /// The SQL keyword joining the two branches.
    pub fn keyword(&self) -> &'static str {
        match self {
            SetOpKind::Union => "UNION",
            SetOpKind::UnionAll => "UNION ALL",
            SetOpKind::Except => "EXCEPT",
            SetOpKind::Intersect => "INTERSECT",
        }
    }

    /// The dispatch key for this kind.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            SetOpKind::Union => NodeKind::Union,
            SetOpKind::UnionAll => NodeKind::UnionAll,
            SetOpKind::Except => NodeKind::Except,
            SetOpKind::Intersect => NodeKind::Intersect,
        }
    }
}

/// A binary combination of two query row sets.
///
/// Branches are shared, not copied: composing never mutates either input.
/// At most one `order_by` is attached per node; it renders after the closing
/// parenthesis of the combined branches, and only when this node is the
/// outermost one in the rendered statement.
#[derive(Debug, Clone)]
pub struct SetOperation {
    pub kind: SetOpKind,
    pub left: Arc<Query>,
    pub right: Arc<Query>,
    pub order_by: Vec<OrderClause>,
    pub alias: Option<String>,
}

// ── Queries ────────────────────────────────────────────────────────────────

/// A pre-rendered base `SELECT` from the out-of-scope base generator,
/// tagged with the table name the query was built against.
#[derive(Debug, Clone)]
pub struct SelectFragment {
    pub table: String,
    pub sql: String,
}

/// The root shape of a query: either a base select or a set operation.
#[derive(Debug, Clone)]
pub enum QueryBody {
    Select(SelectFragment),
    SetOp(SetOperation),
}

/// A full query AST: a body plus the CTE definitions it owns.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) ctes: CteSet,
    pub(crate) body: QueryBody,
}

impl Query {
    /// Wrap a base `SELECT` produced by the base generator.
    pub fn select(
        table: impl Into<String>,
        sql: impl Into<String>,
    ) -> Result<Query, PgComposeError> {
        let table = table.into();
        let sql = sql.into();
        if table.is_empty() {
            return Err(PgComposeError::MalformedNode(
                "base select with empty table name".into(),
            ));
        }
        if sql.trim().is_empty() {
            return Err(PgComposeError::MalformedNode(
                "base select with empty SQL text".into(),
            ));
        }
        Ok(Query {
            ctes: CteSet::new(),
            body: QueryBody::Select(SelectFragment { table, sql }),
        })
    }

    /// Attach a named CTE definition to this query.
    ///
    /// First insertion of a name wins; re-introducing an existing name is
    /// a no-op (the same precedence rule [`CteSet::merge`] applies between
    /// composed branches).
    pub fn with(mut self, name: impl Into<String>, query: Query) -> Result<Query, PgComposeError> {
        self.ctes.insert(name, Arc::new(query))?;
        Ok(self)
    }

    pub fn ctes(&self) -> &CteSet {
        &self.ctes
    }

    pub fn body(&self) -> &QueryBody {
        &self.body
    }

    /// The table name of the relation that originated the leftmost base
    /// select — the "driving" table, used as the default derived-table
    /// alias.
    pub fn driving_table(&self) -> &str {
        match &self.body {
            QueryBody::Select(select) => &select.table,
            QueryBody::SetOp(op) => op.left.driving_table(),
        }
    }

    /// The alias under which this query is embedded as a derived table:
    /// the explicit alias if one was set, otherwise the driving table.
    pub fn effective_alias(&self) -> &str {
        match &self.body {
            QueryBody::SetOp(op) => op.alias.as_deref().unwrap_or_else(|| self.driving_table()),
            QueryBody::Select(select) => &select.table,
        }
    }
}
