//! Selector types.
//!
//! A selector is a comma-separated list of clauses (`field OP value`) plus
//! the reserved `sort`, `limit` and `start` keys.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `=`
    Equals,
    /// `!=`
    NotEquals,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `*=` substring match.
    Contains,
    /// `^=` prefix match.
    StartsWith,
    /// `$=` suffix match.
    EndsWith,
    /// `%=` case-insensitive substring match.
    ContainsLike,
}

impl Operator {
    /// Two-character operators, checked before single-character ones.
    pub(super) const TWO_CHAR: &'static [(&'static str, Operator)] = &[
        ("!=", Operator::NotEquals),
        ("<=", Operator::LessOrEqual),
        (">=", Operator::GreaterOrEqual),
        ("*=", Operator::Contains),
        ("^=", Operator::StartsWith),
        ("$=", Operator::EndsWith),
        ("%=", Operator::ContainsLike),
    ];

    /// Textual form as written in a selector.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::Contains => "*=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::ContainsLike => "%=",
        }
    }

    /// Whether a clause with this operator matches when *no* value matches.
    pub fn is_negated(&self) -> bool {
        matches!(self, Operator::NotEquals)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter clause.
///
/// Matches when any of `fields` compares true against any of `values`
/// (for `!=`: when none of them is equal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub fields: Vec<String>,
    pub operator: Operator,
    pub values: Vec<String>,
}

/// Sort key from a `sort=` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// A parsed selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selector {
    /// Filter clauses, all of which must match.
    pub clauses: Vec<Clause>,

    /// Sort keys in priority order. Empty means store order.
    pub sorts: Vec<SortKey>,

    /// Maximum number of results.
    pub limit: Option<usize>,

    /// Number of leading results to skip.
    pub start: usize,
}

impl Selector {
    /// Whether the selector has no clauses, sorts or paging (matches
    /// everything in store order).
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.sorts.is_empty() && self.limit.is_none() && self.start == 0
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse(s)
    }
}

/// Selector syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("clause '{clause}' has no operator")]
    MissingOperator { clause: String },

    #[error("clause '{clause}' has no field name")]
    EmptyField { clause: String },

    #[error("invalid field name '{field}'")]
    InvalidField { field: String },

    #[error("unterminated quote starting at position {position}")]
    UnterminatedQuote { position: usize },

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("'{key}' expects a non-negative integer, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("'{key}' does not support operator '{operator}'")]
    UnsupportedOperator { key: String, operator: Operator },
}

/// Whether `name` is a valid selector field name: non-empty, ASCII
/// alphanumerics, underscores and dots only.
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with('.')
        && !name.ends_with('.')
}
