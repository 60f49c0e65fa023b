//! Preload scopes - row filters applied to related records before slotting
//!
//! A scope narrows which target records an association preload considers,
//! the way a relationship query would carry extra WHERE clauses. Constraints
//! are combined with AND semantics and evaluated against attribute values.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::record::Record;

/// Comparison operators available to scope constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintOperator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    In,
    NotIn,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

/// A single column constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConstraint {
    /// The column to constrain
    pub column: String,

    /// The constraint operator
    pub operator: ConstraintOperator,

    /// The comparison value; an array for In and NotIn, a pattern string
    /// with `%` and `_` wildcards for Like and NotLike
    pub value: JsonValue,
}

impl ScopeConstraint {
    /// Evaluate this constraint against one record.
    ///
    /// A missing or null attribute satisfies only IsNull, matching how SQL
    /// comparisons against NULL never hold.
    pub fn matches(&self, record: &Record) -> bool {
        let value = record
            .attribute(&self.column)
            .filter(|value| !value.is_null());

        match self.operator {
            ConstraintOperator::IsNull => return value.is_none(),
            ConstraintOperator::IsNotNull => return value.is_some(),
            _ => {}
        }

        let Some(value) = value else {
            return false;
        };

        match self.operator {
            ConstraintOperator::Equal => value == &self.value,
            ConstraintOperator::NotEqual => value != &self.value,
            ConstraintOperator::GreaterThan => {
                compare_values(value, &self.value) == Some(Ordering::Greater)
            }
            ConstraintOperator::LessThan => {
                compare_values(value, &self.value) == Some(Ordering::Less)
            }
            ConstraintOperator::GreaterThanOrEqual => matches!(
                compare_values(value, &self.value),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            ConstraintOperator::LessThanOrEqual => matches!(
                compare_values(value, &self.value),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            ConstraintOperator::In => self
                .value
                .as_array()
                .map(|candidates| candidates.contains(value))
                .unwrap_or(false),
            ConstraintOperator::NotIn => self
                .value
                .as_array()
                .map(|candidates| !candidates.contains(value))
                .unwrap_or(false),
            ConstraintOperator::Like => match (value.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => like_match(text, pattern),
                _ => false,
            },
            ConstraintOperator::NotLike => match (value.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => !like_match(text, pattern),
                _ => false,
            },
            ConstraintOperator::IsNull | ConstraintOperator::IsNotNull => unreachable!(),
        }
    }
}

/// Ordering between two attribute values. Numbers compare numerically,
/// strings lexicographically; mixed types do not compare.
fn compare_values(left: &JsonValue, right: &JsonValue) -> Option<Ordering> {
    match (left, right) {
        (JsonValue::Number(l), JsonValue::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => None,
        },
        (JsonValue::String(l), JsonValue::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// SQL LIKE matching with `%` (any run) and `_` (single character)
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let mut ti = 0;
    let mut pi = 0;
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '_' || pattern[pi] == text[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < pattern.len() && pattern[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = backtrack {
            backtrack = Some((star_pi, star_ti + 1));
            pi = star_pi + 1;
            ti = star_ti + 1;
        } else {
            return false;
        }
    }

    pattern[pi..].iter().all(|c| *c == '%')
}

/// Row filter applied by loader strategies to related records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreloadScope {
    constraints: Vec<ScopeConstraint>,
}

impl PreloadScope {
    /// Create an empty scope that matches every record
    pub fn new() -> Self {
        Self::default()
    }

    /// The unconstrained scope, the engine's default
    pub fn none() -> Self {
        Self::default()
    }

    fn push(mut self, column: &str, operator: ConstraintOperator, value: JsonValue) -> Self {
        self.constraints.push(ScopeConstraint {
            column: column.to_string(),
            operator,
            value,
        });
        self
    }

    /// Keep records whose column equals the value
    pub fn where_eq(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::Equal, value.into())
    }

    /// Keep records whose column differs from the value
    pub fn where_ne(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::NotEqual, value.into())
    }

    /// Keep records whose column is greater than the value
    pub fn where_gt(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::GreaterThan, value.into())
    }

    /// Keep records whose column is greater than or equal to the value
    pub fn where_gte(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::GreaterThanOrEqual, value.into())
    }

    /// Keep records whose column is less than the value
    pub fn where_lt(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::LessThan, value.into())
    }

    /// Keep records whose column is less than or equal to the value
    pub fn where_lte(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::LessThanOrEqual, value.into())
    }

    /// Keep records whose column value appears in the candidates
    pub fn where_in(self, column: &str, values: Vec<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::In, JsonValue::Array(values))
    }

    /// Keep records whose column value does not appear in the candidates
    pub fn where_not_in(self, column: &str, values: Vec<JsonValue>) -> Self {
        self.push(column, ConstraintOperator::NotIn, JsonValue::Array(values))
    }

    /// Keep records whose column matches a LIKE pattern
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.push(
            column,
            ConstraintOperator::Like,
            JsonValue::String(pattern.to_string()),
        )
    }

    /// Keep records whose column does not match a LIKE pattern
    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.push(
            column,
            ConstraintOperator::NotLike,
            JsonValue::String(pattern.to_string()),
        )
    }

    /// Keep records whose column is missing or null
    pub fn where_null(self, column: &str) -> Self {
        self.push(column, ConstraintOperator::IsNull, JsonValue::Null)
    }

    /// Keep records whose column is present and non-null
    pub fn where_not_null(self, column: &str) -> Self {
        self.push(column, ConstraintOperator::IsNotNull, JsonValue::Null)
    }

    /// Returns true if no constraints are registered
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The registered constraints
    pub fn constraints(&self) -> &[ScopeConstraint] {
        &self.constraints
    }

    /// Evaluate all constraints against one record with AND semantics
    pub fn matches(&self, record: &Record) -> bool {
        self.constraints
            .iter()
            .all(|constraint| constraint.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: i64, state: &str, priority: i64) -> Record {
        Record::new("Task")
            .with_attribute("id", json!(id))
            .with_attribute("state", json!(state))
            .with_attribute("priority", json!(priority))
    }

    #[test]
    fn test_empty_scope_matches_everything() {
        let scope = PreloadScope::new();
        assert!(scope.is_empty());
        assert!(scope.matches(&task(1, "open", 3)));
    }

    #[test]
    fn test_where_eq_and_ne() {
        let scope = PreloadScope::new().where_eq("state", "open");
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(!scope.matches(&task(2, "done", 3)));

        let scope = PreloadScope::new().where_ne("state", "done");
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(!scope.matches(&task(2, "done", 3)));
    }

    #[test]
    fn test_numeric_ordering() {
        let scope = PreloadScope::new().where_gt("priority", 2).where_lte("priority", 5);
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(scope.matches(&task(2, "open", 5)));
        assert!(!scope.matches(&task(3, "open", 2)));
        assert!(!scope.matches(&task(4, "open", 9)));
    }

    #[test]
    fn test_mixed_types_never_order() {
        let scope = PreloadScope::new().where_gt("state", 1);
        assert!(!scope.matches(&task(1, "open", 3)));
    }

    #[test]
    fn test_where_in_and_not_in() {
        let scope = PreloadScope::new().where_in("state", vec![json!("open"), json!("blocked")]);
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(!scope.matches(&task(2, "done", 3)));

        let scope = PreloadScope::new().where_not_in("state", vec![json!("done")]);
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(!scope.matches(&task(2, "done", 3)));
    }

    #[test]
    fn test_like_patterns() {
        assert!(like_match("deploy hooks", "deploy%"));
        assert!(like_match("deploy hooks", "%hooks"));
        assert!(like_match("deploy hooks", "%oy ho%"));
        assert!(like_match("deploy", "dep_oy"));
        assert!(!like_match("deploy", "dep_y"));
        assert!(like_match("anything", "%"));
        assert!(!like_match("deploy", "deploy_"));

        let scope = PreloadScope::new().where_like("state", "op%");
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(!scope.matches(&task(2, "done", 3)));

        let scope = PreloadScope::new().where_not_like("state", "op%");
        assert!(!scope.matches(&task(1, "open", 3)));
        assert!(scope.matches(&task(2, "done", 3)));
    }

    #[test]
    fn test_null_handling() {
        let with_owner = task(1, "open", 3).with_attribute("owner_id", json!(7));
        let unowned = task(2, "open", 3).with_attribute("owner_id", json!(null));
        let absent = task(3, "open", 3);

        let null_scope = PreloadScope::new().where_null("owner_id");
        assert!(!null_scope.matches(&with_owner));
        assert!(null_scope.matches(&unowned));
        assert!(null_scope.matches(&absent));

        let not_null_scope = PreloadScope::new().where_not_null("owner_id");
        assert!(not_null_scope.matches(&with_owner));
        assert!(!not_null_scope.matches(&unowned));
        assert!(!not_null_scope.matches(&absent));

        // a null attribute satisfies no comparison
        let eq_scope = PreloadScope::new().where_eq("owner_id", json!(null));
        assert!(!eq_scope.matches(&unowned));
    }

    #[test]
    fn test_constraints_combine_with_and() {
        let scope = PreloadScope::new()
            .where_eq("state", "open")
            .where_gte("priority", 3);
        assert!(scope.matches(&task(1, "open", 3)));
        assert!(!scope.matches(&task(2, "open", 1)));
        assert!(!scope.matches(&task(3, "done", 5)));
        assert_eq!(scope.constraints().len(), 2);
    }
}
