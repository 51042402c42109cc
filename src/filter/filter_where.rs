use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterCondition, FilterOp};

/// Parsed `where` clause evaluated against in-memory documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterWhere {
    conditions: Vec<FilterCondition>,
}

impl FilterWhere {
    pub fn parse(where_data: &Value) -> Result<Self, FilterError> {
        let conditions = match where_data {
            Value::Null => vec![],
            Value::Object(_) => Self::parse_object(where_data)?,
            _ => {
                return Err(FilterError::InvalidWhereClause(
                    "where must be an object".to_string(),
                ))
            }
        };
        Ok(Self { conditions })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Every top-level condition must hold
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|c| Self::evaluate(c, doc))
    }

    fn parse_object(where_data: &Value) -> Result<Vec<FilterCondition>, FilterError> {
        let Value::Object(obj) = where_data else {
            return Err(FilterError::InvalidWhereClause(
                "nested where must be an object".to_string(),
            ));
        };

        let mut conditions = Vec::new();
        for (key, value) in obj {
            match key.to_ascii_lowercase().as_str() {
                "and" => conditions.push(FilterCondition::And(Self::parse_branches(key, value)?)),
                "or" => conditions.push(FilterCondition::Or(Self::parse_branches(key, value)?)),
                _ => conditions.extend(Self::parse_field_condition(key, value)?),
            }
        }
        Ok(conditions)
    }

    /// `and`/`or` take an array of clauses; index-keyed objects count as arrays
    fn parse_branches(op: &str, value: &Value) -> Result<Vec<FilterCondition>, FilterError> {
        let branches: Vec<&Value> = match value {
            Value::Array(arr) => arr.iter().collect(),
            Value::Object(obj) => obj.values().collect(),
            _ => {
                return Err(FilterError::InvalidOperatorData(format!(
                    "{} requires an array",
                    op
                )))
            }
        };

        branches
            .into_iter()
            .map(|branch| Self::parse_object(branch).map(FilterCondition::And))
            .collect()
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterCondition>, FilterError> {
        match value {
            Value::Object(obj) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Ok(FilterCondition::Field {
                        path: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterCondition::Field {
                path: field.to_string(),
                operator: FilterOp::Equals,
                data: value.clone(),
            }]),
        }
    }

    fn evaluate(condition: &FilterCondition, doc: &Value) -> bool {
        match condition {
            FilterCondition::And(all) => all.iter().all(|c| Self::evaluate(c, doc)),
            FilterCondition::Or(any) => any.iter().any(|c| Self::evaluate(c, doc)),
            FilterCondition::Field { path, operator, data } => {
                let field = lookup(doc, path);
                Self::evaluate_field(field, *operator, data)
            }
        }
    }

    fn evaluate_field(field: Option<&Value>, operator: FilterOp, data: &Value) -> bool {
        let present = field.filter(|v| !v.is_null());

        match operator {
            FilterOp::Exists => {
                let wanted = match data {
                    Value::Bool(b) => *b,
                    Value::String(s) => s != "false",
                    _ => true,
                };
                present.is_some() == wanted
            }
            FilterOp::Equals => match present {
                None => data.is_null(),
                Some(v) => any_element(v, |item| loose_eq(item, data)),
            },
            FilterOp::NotEquals => !Self::evaluate_field(field, FilterOp::Equals, data),
            FilterOp::In => {
                let candidates = list_operand(data);
                present.is_some_and(|v| any_element(v, |item| candidates.iter().any(|c| loose_eq(item, c))))
            }
            FilterOp::NotIn => !Self::evaluate_field(field, FilterOp::In, data),
            FilterOp::GreaterThan => compare_with(present, data, |o| o == Ordering::Greater),
            FilterOp::GreaterThanEqual => compare_with(present, data, |o| o != Ordering::Less),
            FilterOp::LessThan => compare_with(present, data, |o| o == Ordering::Less),
            FilterOp::LessThanEqual => compare_with(present, data, |o| o != Ordering::Greater),
            FilterOp::Contains => {
                let needle = as_text(data).to_lowercase();
                present.is_some_and(|v| any_element(v, |item| as_text(item).to_lowercase().contains(&needle)))
            }
            // Every whitespace-separated word must appear
            FilterOp::Like => {
                let haystack = present.map(|v| as_text(v).to_lowercase()).unwrap_or_default();
                let needle = as_text(data).to_lowercase();
                present.is_some() && needle.split_whitespace().all(|word| haystack.contains(word))
            }
        }
    }
}

/// Dotted path lookup: `author.name`
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn any_element(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(&pred),
        other => pred(other),
    }
}

/// `in`/`not_in` accept an array or a comma-separated string
fn list_operand(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items.clone(),
        Value::String(s) => s.split(',').map(|p| Value::String(p.trim().to_string())).collect(),
        other => vec![other.clone()],
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Equality that tolerates query-string coercion: 5 == "5", true == "true"
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::String(s), Value::Bool(b)) | (Value::Bool(b), Value::String(s)) => s == &b.to_string(),
        _ => a == b,
    }
}

/// Ordering for numbers, strings and numeric strings; None when incomparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(s), Value::Number(n)) => s.parse::<f64>().ok()?.partial_cmp(&n.as_f64()?),
        (Value::Number(n), Value::String(s)) => n.as_f64()?.partial_cmp(&s.parse::<f64>().ok()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_with(field: Option<&Value>, data: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    field
        .and_then(|v| compare_values(v, data))
        .is_some_and(accept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(where_data: Value, doc: Value) -> bool {
        FilterWhere::parse(&where_data).unwrap().matches(&doc)
    }

    #[test]
    fn equals_and_implicit_equality() {
        let doc = json!({ "title": "Hello", "views": 5 });
        assert!(matches(json!({ "title": { "equals": "Hello" } }), doc.clone()));
        assert!(matches(json!({ "title": "Hello" }), doc.clone()));
        assert!(matches(json!({ "views": { "equals": "5" } }), doc.clone()));
        assert!(!matches(json!({ "title": { "not_equals": "Hello" } }), doc));
    }

    #[test]
    fn comparisons() {
        let doc = json!({ "views": 10, "published": "2024-02-01" });
        assert!(matches(json!({ "views": { "greater_than": 5 } }), doc.clone()));
        assert!(matches(json!({ "views": { "less_than_equal": 10 } }), doc.clone()));
        assert!(!matches(json!({ "views": { "less_than": 10 } }), doc.clone()));
        assert!(matches(json!({ "published": { "greater_than": "2024-01-01" } }), doc));
    }

    #[test]
    fn in_like_contains_exists() {
        let doc = json!({ "status": "draft", "title": "Learning Rust Today", "tags": ["a", "b"] });
        assert!(matches(json!({ "status": { "in": ["draft", "review"] } }), doc.clone()));
        assert!(matches(json!({ "status": { "in": "draft,review" } }), doc.clone()));
        assert!(matches(json!({ "status": { "not_in": ["published"] } }), doc.clone()));
        assert!(matches(json!({ "title": { "like": "rust learning" } }), doc.clone()));
        assert!(matches(json!({ "title": { "contains": "RUST" } }), doc.clone()));
        assert!(matches(json!({ "tags": { "equals": "b" } }), doc.clone()));
        assert!(matches(json!({ "title": { "exists": true } }), doc.clone()));
        assert!(matches(json!({ "missing": { "exists": false } }), doc));
    }

    #[test]
    fn and_or_branches() {
        let doc = json!({ "a": 1, "b": 2 });
        assert!(matches(json!({ "or": [ { "a": { "equals": 9 } }, { "b": { "equals": 2 } } ] }), doc.clone()));
        assert!(!matches(json!({ "and": [ { "a": { "equals": 1 } }, { "b": { "equals": 9 } } ] }), doc.clone()));
        assert!(matches(json!({ "or": { "0": { "a": { "equals": 1 } } } }), doc));
    }

    #[test]
    fn empty_where_matches_everything() {
        let clause = FilterWhere::parse(&Value::Null).unwrap();
        assert!(clause.is_empty());
        assert!(clause.matches(&json!({ "any": "doc" })));
        assert!(!FilterWhere::parse(&json!({ "a": 1 })).unwrap().is_empty());
    }

    #[test]
    fn dotted_paths() {
        let doc = json!({ "author": { "name": "Ada" } });
        assert!(matches(json!({ "author.name": { "equals": "Ada" } }), doc));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = FilterWhere::parse(&json!({ "title": { "near": 1 } })).unwrap_err();
        assert_eq!(err, FilterError::UnsupportedOperator("near".to_string()));
        assert!(FilterWhere::parse(&json!("raw")).is_err());
    }
}
