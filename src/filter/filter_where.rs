use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::FilterOp;

/// Where-clause validation and predicate evaluation over JSON records.
///
/// Supports implicit equality (`{ field: value }`), field operator objects
/// (`{ field: { "$gte": 10 } }`) and logical operators (`$and`, `$or`,
/// `$not`). Evaluation is exact-shape: an unknown operator is an error, not
/// a silently-true condition.
pub struct FilterWhere;

impl FilterWhere {
    /// Validate the overall shape of a where clause
    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause(
                "WHERE must be a JSON object".to_string(),
            )),
        }
    }

    /// Evaluate a where clause against a single record
    pub fn matches(where_data: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
        match where_data {
            Value::Null => Ok(true),
            Value::Object(obj) => {
                // Top-level entries are AND-combined
                for (key, value) in obj {
                    if key.starts_with('$') {
                        if !Self::match_logical(key, value, record)? {
                            return Ok(false);
                        }
                    } else if !Self::match_field(key, value, record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Err(FilterError::InvalidWhereClause(
                "WHERE must be a JSON object".to_string(),
            )),
        }
    }

    fn match_logical(
        op: &str,
        value: &Value,
        record: &Map<String, Value>,
    ) -> Result<bool, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{} requires array", op))
                })?;
                if op == "$and" {
                    for clause in arr {
                        if !Self::matches(clause, record)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                } else {
                    for clause in arr {
                        if Self::matches(clause, record)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            }
            "$not" => Ok(!Self::matches(value, record)?),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn match_field(
        field: &str,
        condition: &Value,
        record: &Map<String, Value>,
    ) -> Result<bool, FilterError> {
        let field_value = record.get(field);

        if let Value::Object(ops) = condition {
            for (op_key, op_data) in ops {
                let operator = Self::map_operator(op_key)?;
                if !Self::apply_op(&operator, field_value, op_data)? {
                    return Ok(false);
                }
            }
            Ok(true)
        } else {
            // Implicit equality: { field: value }
            Ok(Self::values_equal(field_value, condition))
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$exists" => FilterOp::Exists,
            "$null" => FilterOp::Null,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn apply_op(
        op: &FilterOp,
        field_value: Option<&Value>,
        data: &Value,
    ) -> Result<bool, FilterError> {
        match op {
            FilterOp::Eq => Ok(Self::values_equal(field_value, data)),
            FilterOp::Ne => Ok(!Self::values_equal(field_value, data)),
            FilterOp::Gt => Ok(Self::compare(field_value, data) == Some(Ordering::Greater)),
            FilterOp::Gte => Ok(matches!(
                Self::compare(field_value, data),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            )),
            FilterOp::Lt => Ok(Self::compare(field_value, data) == Some(Ordering::Less)),
            FilterOp::Lte => Ok(matches!(
                Self::compare(field_value, data),
                Some(Ordering::Less) | Some(Ordering::Equal)
            )),
            FilterOp::Like => Self::like(field_value, data, false),
            FilterOp::ILike => Self::like(field_value, data, true),
            FilterOp::In => {
                let candidates = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$in requires array".to_string())
                })?;
                Ok(candidates.iter().any(|c| Self::values_equal(field_value, c)))
            }
            FilterOp::NIn => {
                let candidates = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$nin requires array".to_string())
                })?;
                Ok(!candidates.iter().any(|c| Self::values_equal(field_value, c)))
            }
            FilterOp::Exists => {
                let expected = data.as_bool().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$exists requires boolean".to_string())
                })?;
                Ok(field_value.is_some() == expected)
            }
            FilterOp::Null => {
                let expected = data.as_bool().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$null requires boolean".to_string())
                })?;
                let is_null = matches!(field_value, None | Some(Value::Null));
                Ok(is_null == expected)
            }
            _ => Err(FilterError::UnsupportedOperator(format!("{:?}", op))),
        }
    }

    fn values_equal(field_value: Option<&Value>, expected: &Value) -> bool {
        match (field_value, expected) {
            (None, Value::Null) | (Some(Value::Null), Value::Null) => true,
            (None, _) => false,
            (Some(actual), _) => {
                // Numbers compare by value so 1 == 1.0
                if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
                    return a == b;
                }
                actual == expected
            }
        }
    }

    /// Value ordering for range operators and sorting. Mixed types don't order.
    pub fn compare(field_value: Option<&Value>, other: &Value) -> Option<Ordering> {
        let actual = field_value?;
        if let (Some(a), Some(b)) = (actual.as_f64(), other.as_f64()) {
            return a.partial_cmp(&b);
        }
        if let (Some(a), Some(b)) = (actual.as_str(), other.as_str()) {
            return Some(a.cmp(b));
        }
        if let (Some(a), Some(b)) = (actual.as_bool(), other.as_bool()) {
            return Some(a.cmp(&b));
        }
        None
    }

    fn like(
        field_value: Option<&Value>,
        pattern: &Value,
        case_insensitive: bool,
    ) -> Result<bool, FilterError> {
        let pattern = pattern.as_str().ok_or_else(|| {
            FilterError::InvalidOperatorData("$like requires string pattern".to_string())
        })?;
        let Some(actual) = field_value.and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        let (actual, pattern) = if case_insensitive {
            (actual.to_lowercase(), pattern.to_lowercase())
        } else {
            (actual.to_string(), pattern.to_string())
        };
        Ok(Self::like_match(&actual, &pattern))
    }

    /// SQL LIKE semantics with `%` wildcards (no `_` support)
    fn like_match(text: &str, pattern: &str) -> bool {
        let parts: Vec<&str> = pattern.split('%').collect();
        if parts.len() == 1 {
            return text == pattern;
        }
        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if i == 0 {
                if !text.starts_with(part) {
                    return false;
                }
                pos = part.len();
            } else if i == parts.len() - 1 {
                return text[pos..].ends_with(part);
            } else {
                match text[pos..].find(part) {
                    Some(found) => pos += found + part.len(),
                    None => return false,
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Map<String, Value> {
        json!({
            "name": "Ada",
            "email": "ada@example.com",
            "score": 42,
            "active": true,
            "tenant_id": "acme"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn implicit_equality() {
        let rec = record();
        assert!(FilterWhere::matches(&json!({"name": "Ada"}), &rec).unwrap());
        assert!(!FilterWhere::matches(&json!({"name": "Grace"}), &rec).unwrap());
    }

    #[test]
    fn top_level_fields_are_and_combined() {
        let rec = record();
        assert!(FilterWhere::matches(&json!({"name": "Ada", "active": true}), &rec).unwrap());
        assert!(!FilterWhere::matches(&json!({"name": "Ada", "active": false}), &rec).unwrap());
    }

    #[test]
    fn range_and_membership_operators() {
        let rec = record();
        assert!(FilterWhere::matches(&json!({"score": {"$gte": 42}}), &rec).unwrap());
        assert!(!FilterWhere::matches(&json!({"score": {"$lt": 42}}), &rec).unwrap());
        assert!(FilterWhere::matches(&json!({"name": {"$in": ["Ada", "Grace"]}}), &rec).unwrap());
        assert!(FilterWhere::matches(&json!({"name": {"$nin": ["Grace"]}}), &rec).unwrap());
    }

    #[test]
    fn logical_operators() {
        let rec = record();
        let clause = json!({"$or": [{"name": "Grace"}, {"score": 42}]});
        assert!(FilterWhere::matches(&clause, &rec).unwrap());
        let clause = json!({"$and": [{"name": "Ada"}, {"tenant_id": "acme"}]});
        assert!(FilterWhere::matches(&clause, &rec).unwrap());
        let clause = json!({"$not": {"name": "Ada"}});
        assert!(!FilterWhere::matches(&clause, &rec).unwrap());
    }

    #[test]
    fn like_patterns() {
        let rec = record();
        assert!(FilterWhere::matches(&json!({"email": {"$like": "%@example.com"}}), &rec).unwrap());
        assert!(FilterWhere::matches(&json!({"email": {"$like": "ada@%"}}), &rec).unwrap());
        assert!(!FilterWhere::matches(&json!({"email": {"$like": "%@other.com"}}), &rec).unwrap());
        assert!(FilterWhere::matches(&json!({"name": {"$ilike": "ADA"}}), &rec).unwrap());
    }

    #[test]
    fn missing_and_null_fields() {
        let rec = record();
        assert!(FilterWhere::matches(&json!({"missing": {"$exists": false}}), &rec).unwrap());
        assert!(FilterWhere::matches(&json!({"missing": {"$null": true}}), &rec).unwrap());
        assert!(FilterWhere::matches(&json!({"name": {"$exists": true}}), &rec).unwrap());
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let rec = record();
        let result = FilterWhere::matches(&json!({"name": {"$regex": "A.*"}}), &rec);
        assert!(matches!(result, Err(FilterError::UnsupportedOperator(_))));
    }

    #[test]
    fn non_object_where_is_rejected() {
        let rec = record();
        let result = FilterWhere::matches(&json!("name = 'Ada'"), &rec);
        assert!(matches!(result, Err(FilterError::InvalidWhereClause(_))));
    }
}
