//! In-memory selector evaluation.

use std::cmp::Ordering;

use serde_json::Value;

use super::types::{Clause, Operator, Selector, SortKey};
use crate::models::{Resource, normalize_path};

/// Access to a resource's ancestry, needed by `parent` and `has_parent`.
pub trait ResourceTree {
    /// The parent of `resource`, if any.
    fn parent_of(&self, resource: &Resource) -> Option<&Resource>;
}

impl Selector {
    /// Whether `resource` satisfies every clause.
    pub fn matches(&self, resource: &Resource, tree: &dyn ResourceTree) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause_matches(clause, resource, tree))
    }

    /// Sort matched resources by the selector's sort keys (stable, so ties
    /// keep store order), then apply `start` and `limit`.
    pub fn order_and_page<'a>(&self, mut resources: Vec<&'a Resource>) -> Vec<&'a Resource> {
        if !self.sorts.is_empty() {
            resources.sort_by(|a, b| compare_by_keys(a, b, &self.sorts));
        }
        let iter = resources.into_iter().skip(self.start);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

fn clause_matches(clause: &Clause, resource: &Resource, tree: &dyn ResourceTree) -> bool {
    let any_equal = |op: Operator| {
        clause.fields.iter().any(|field| {
            clause
                .values
                .iter()
                .any(|value| field_matches(field, op, value, resource, tree))
        })
    };

    if clause.operator.is_negated() {
        !any_equal(Operator::Equals)
    } else {
        any_equal(clause.operator)
    }
}

fn field_matches(
    field: &str,
    op: Operator,
    value: &str,
    resource: &Resource,
    tree: &dyn ResourceTree,
) -> bool {
    match field {
        "parent" => {
            let parent = tree.parent_of(resource);
            reference_matches(parent, op, value)
        }
        "has_parent" if op != Operator::Equals => false,
        "has_parent" => {
            let mut current = tree.parent_of(resource);
            while let Some(ancestor) = current {
                if reference_matches(Some(ancestor), op, value) {
                    return true;
                }
                current = tree.parent_of(ancestor);
            }
            false
        }
        "path" => {
            let candidate = Value::from(resource.normalized_path());
            value_matches(Some(&candidate), op, &normalize_reference(value))
        }
        _ => value_matches(resource.field_value(field).as_ref(), op, value),
    }
}

/// Match a resource reference: a path when the value starts with `/`,
/// otherwise an id.
fn reference_matches(target: Option<&Resource>, op: Operator, value: &str) -> bool {
    if op == Operator::Equals && !value.starts_with('/') {
        return match (target, value.trim().parse::<i64>()) {
            (Some(resource), Ok(id)) => resource.id == id,
            _ => false,
        };
    }

    let candidate = target.map(|r| {
        if value.starts_with('/') {
            Value::from(r.normalized_path())
        } else {
            Value::from(r.id)
        }
    });
    value_matches(candidate.as_ref(), op, &normalize_reference(value))
}

fn normalize_reference(value: &str) -> String {
    if value.starts_with('/') {
        normalize_path(value)
    } else {
        value.to_string()
    }
}

/// Compare a field value against a selector value.
///
/// Arrays match when any element matches. Missing values compare as the
/// empty string. Equality always compares text forms; ordering against a
/// finite number only considers numeric values.
pub fn value_matches(candidate: Option<&Value>, op: Operator, value: &str) -> bool {
    if let Some(Value::Array(items)) = candidate {
        return items.iter().any(|item| value_matches(Some(item), op, value));
    }

    let text = candidate.map(value_text).unwrap_or_default();

    match op {
        Operator::Equals => text == value,
        Operator::NotEquals => text != value,
        Operator::LessThan
        | Operator::GreaterThan
        | Operator::LessOrEqual
        | Operator::GreaterOrEqual => {
            let ordering = match parse_number(value) {
                Some(number) => candidate
                    .and_then(Value::as_f64)
                    .and_then(|actual| actual.partial_cmp(&number)),
                None => Some(text.as_str().cmp(value)),
            };
            ordering.is_some_and(|o| match op {
                Operator::LessThan => o == Ordering::Less,
                Operator::GreaterThan => o == Ordering::Greater,
                Operator::LessOrEqual => o != Ordering::Greater,
                _ => o != Ordering::Less,
            })
        }
        Operator::Contains => text.contains(value),
        Operator::StartsWith => text.starts_with(value),
        Operator::EndsWith => text.ends_with(value),
        Operator::ContainsLike => text.to_lowercase().contains(&value.to_lowercase()),
    }
}

/// Textual form of a scalar value for comparisons, as PostgreSQL's `->>`
/// renders it.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A selector value as a finite number.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Sort comparison: numeric when both sides are numbers, string otherwise.
fn compare(left: &str, right: &str) -> Ordering {
    match (parse_number(left), parse_number(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

fn compare_by_keys(a: &Resource, b: &Resource, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.field_value(&key.field).map(|v| value_text(&v));
        let right = b.field_value(&key.field).map(|v| value_text(&v));
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => compare(&l, &r),
        };
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
