//! Resource query builder using SeaQuery.
//!
//! Translates a parsed [`Selector`] into PostgreSQL against the `resource`
//! table, with support for:
//! - JSONB custom field extraction (dotted paths reach into objects)
//! - `parent` / `has_parent` references by path or id
//! - Sorting and `start`/`limit` paging
//!
//! Field names are validated by the selector parser, so they are safe to
//! inline; values always go through SeaQuery's escaping.

use sea_query::{Alias, Cond, Expr, Order, PostgresQueryBuilder, Query, SimpleExpr, Value};

use crate::models::normalize_path;
use crate::selector::{Clause, Operator, Selector, parse_number};

const TABLE: &str = "resource";

/// Columns selected for every resource row.
const COLUMNS: &[&str] = &[
    "id",
    "parent_id",
    "name",
    "path",
    "template",
    "fields",
    "created",
    "modified",
];

/// Integer columns, compared numerically.
const NUMERIC_COLUMNS: &[&str] = &["id", "parent_id", "created", "modified", "num_children"];

/// Child count subquery, exposed as `num_children`.
const NUM_CHILDREN_SQL: &str =
    "(SELECT COUNT(*) FROM resource AS child WHERE child.parent_id = resource.id)";

/// Query builder for selector queries.
pub struct ResourceQueryBuilder<'a> {
    selector: &'a Selector,
}

impl<'a> ResourceQueryBuilder<'a> {
    /// Create a builder for a parsed selector.
    pub fn new(selector: &'a Selector) -> Self {
        Self { selector }
    }

    /// Build the SELECT statement.
    pub fn build(&self) -> String {
        let mut query = Query::select();

        for column in COLUMNS {
            query.column((Alias::new(TABLE), Alias::new(*column)));
        }
        query.expr_as(Expr::cust(NUM_CHILDREN_SQL), Alias::new("num_children"));
        query.from(Alias::new(TABLE));

        // WHERE: every clause must hold
        if !self.selector.clauses.is_empty() {
            let mut all = Cond::all();
            for clause in &self.selector.clauses {
                all = all.add(self.clause_condition(clause));
            }
            query.cond_where(all);
        }

        // ORDER BY: explicit sorts, then store order as the tiebreaker
        for key in &self.selector.sorts {
            let order = if key.descending {
                Order::Desc
            } else {
                Order::Asc
            };
            query.order_by_expr(Expr::cust(sort_expr(&key.field)), order);
        }
        query.order_by((Alias::new(TABLE), Alias::new("sort")), Order::Asc);
        query.order_by((Alias::new(TABLE), Alias::new("id")), Order::Asc);

        if let Some(limit) = self.selector.limit {
            query.limit(limit as u64);
        }
        if self.selector.start > 0 {
            query.offset(self.selector.start as u64);
        }

        query.to_string(PostgresQueryBuilder)
    }

    /// Build the condition for one clause.
    ///
    /// Alternatives are OR'ed; `!=` negates the OR of equalities so that it
    /// holds only when no field equals any value.
    fn clause_condition(&self, clause: &Clause) -> Cond {
        let op = if clause.operator.is_negated() {
            Operator::Equals
        } else {
            clause.operator
        };

        let mut any = Cond::any();
        for field in &clause.fields {
            for value in &clause.values {
                any = any.add(comparison(field, op, value));
            }
        }

        if clause.operator.is_negated() {
            any.not()
        } else {
            any
        }
    }
}

/// Build a single `field OP value` comparison.
fn comparison(field: &str, op: Operator, value: &str) -> SimpleExpr {
    match field {
        "parent" if op == Operator::Equals => parent_reference(value),
        "has_parent" if op == Operator::Equals => ancestor_reference(value),
        "has_parent" => Expr::cust("FALSE"),
        "path" => text_comparison(PATH_SQL, op, &normalize_reference(value)),
        "parent" => column_comparison("parent_id", op, value),
        column if NUMERIC_COLUMNS.contains(&column) => column_comparison(column, op, value),
        "name" | "template" => text_comparison(&format!("{TABLE}.{field}"), op, value),
        _ => custom_comparison(field, op, value),
    }
}

/// Normalized resource path (no trailing slash except for the root).
const PATH_SQL: &str = "COALESCE(NULLIF(rtrim(resource.path, '/'), ''), '/')";

fn normalize_reference(value: &str) -> String {
    if value.starts_with('/') {
        normalize_path(value)
    } else {
        value.to_string()
    }
}

/// `parent=/path/` or `parent=<id>`.
fn parent_reference(value: &str) -> SimpleExpr {
    if value.starts_with('/') {
        let path = normalize_path(value);
        let with_slash = if path == "/" {
            path.clone()
        } else {
            format!("{path}/")
        };
        Expr::cust_with_values(
            "resource.parent_id IN (SELECT p.id FROM resource AS p WHERE p.path IN ($1, $2))",
            [path, with_slash],
        )
    } else {
        match value.trim().parse::<i64>() {
            Ok(id) => Expr::cust_with_values("resource.parent_id = $1", [id]),
            Err(_) => Expr::cust("FALSE"),
        }
    }
}

/// `has_parent=/path/` or `has_parent=<id>`: any ancestor matches.
fn ancestor_reference(value: &str) -> SimpleExpr {
    if value.starts_with('/') {
        let path = normalize_path(value);
        if path == "/" {
            return Expr::cust(format!("{PATH_SQL} <> '/'"));
        }
        Expr::cust_with_values(
            "resource.path LIKE $1",
            [format!("{}/%", escape_like_wildcards(&path))],
        )
    } else {
        match value.trim().parse::<i64>() {
            Ok(id) => Expr::cust_with_values(
                "EXISTS (SELECT 1 FROM resource AS a WHERE a.id = $1 AND a.id <> resource.id \
                 AND resource.path LIKE rtrim(a.path, '/') || '/%')",
                [id],
            ),
            Err(_) => Expr::cust("FALSE"),
        }
    }
}

/// Comparison on an integer column: ordering against a number is numeric,
/// everything else compares the text form.
fn column_comparison(column: &str, op: Operator, value: &str) -> SimpleExpr {
    let sql = if column == "num_children" {
        NUM_CHILDREN_SQL.to_string()
    } else {
        format!("{TABLE}.{column}")
    };

    match (is_ordering(op), sql_operator(op), parse_number(value)) {
        (true, Some(sql_op), Some(number)) => {
            Expr::cust_with_values(format!("{sql} {sql_op} $1"), [number])
        }
        _ => text_comparison(&format!("CAST({sql} AS TEXT)"), op, value),
    }
}

fn is_ordering(op: Operator) -> bool {
    matches!(
        op,
        Operator::LessThan | Operator::GreaterThan | Operator::LessOrEqual | Operator::GreaterOrEqual
    )
}

/// Comparison on a JSONB custom field.
///
/// Ordering comparisons against a number only consider JSON numbers;
/// everything else compares the text form, with missing fields as `''`.
fn custom_comparison(field: &str, op: Operator, value: &str) -> SimpleExpr {
    if is_ordering(op) && let (Some(sql_op), Some(number)) = (sql_operator(op), parse_number(value))
    {
        let json = jsonb_extract_expr(field, false);
        let text = jsonb_extract_expr(field, true);
        return Expr::cust_with_values(
            format!("(CASE WHEN jsonb_typeof({json}) = 'number' THEN ({text})::numeric END) {sql_op} $1"),
            [number],
        );
    }

    text_comparison(&jsonb_extract_expr(field, true), op, value)
}

/// Text comparison; NULL compares as the empty string.
fn text_comparison(sql: &str, op: Operator, value: &str) -> SimpleExpr {
    let lhs = format!("COALESCE({sql}, '')");
    match op {
        Operator::Contains => like(&lhs, "LIKE", format!("%{}%", escape_like_wildcards(value))),
        Operator::StartsWith => like(&lhs, "LIKE", format!("{}%", escape_like_wildcards(value))),
        Operator::EndsWith => like(&lhs, "LIKE", format!("%{}", escape_like_wildcards(value))),
        Operator::ContainsLike => {
            like(&lhs, "ILIKE", format!("%{}%", escape_like_wildcards(value)))
        }
        _ => {
            let sql_op = sql_operator(op).unwrap_or("=");
            Expr::cust_with_values(format!("{lhs} {sql_op} $1"), [Value::from(value)])
        }
    }
}

fn like(lhs: &str, keyword: &str, pattern: String) -> SimpleExpr {
    Expr::cust_with_values(format!("{lhs} {keyword} $1"), [pattern])
}

/// SQL operator for plain comparisons.
fn sql_operator(op: Operator) -> Option<&'static str> {
    match op {
        Operator::Equals => Some("="),
        Operator::NotEquals => Some("<>"),
        Operator::LessThan => Some("<"),
        Operator::GreaterThan => Some(">"),
        Operator::LessOrEqual => Some("<="),
        Operator::GreaterOrEqual => Some(">="),
        Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::ContainsLike => {
            None
        }
    }
}

/// Sort expression for a field. JSONB values order numbers numerically and
/// strings lexically.
fn sort_expr(field: &str) -> String {
    match field {
        "parent" => format!("{TABLE}.parent_id"),
        "num_children" => NUM_CHILDREN_SQL.to_string(),
        "path" => PATH_SQL.to_string(),
        column if NUMERIC_COLUMNS.contains(&column) => format!("{TABLE}.{column}"),
        "name" | "template" => format!("{TABLE}.{field}"),
        _ => jsonb_extract_expr(field, false),
    }
}

/// Extract a custom field from the `fields` JSONB column.
///
/// `as_text` selects `->>` (text) for the last step instead of `->`.
fn jsonb_extract_expr(path: &str, as_text: bool) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    let mut expr = format!("{TABLE}.fields");
    for (i, part) in parts.iter().enumerate() {
        let arrow = if i == parts.len() - 1 && as_text {
            "->>"
        } else {
            "->"
        };
        expr = format!("({expr}{arrow}'{part}')");
    }
    expr
}

/// Escape LIKE wildcards in user-provided values.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
