use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    NotEquals,
    In,
    NotIn,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Like,
    Contains,
    Exists,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "equals" => FilterOp::Equals,
            "not_equals" => FilterOp::NotEquals,
            "in" => FilterOp::In,
            "not_in" => FilterOp::NotIn,
            "greater_than" => FilterOp::GreaterThan,
            "greater_than_equal" => FilterOp::GreaterThanEqual,
            "less_than" => FilterOp::LessThan,
            "less_than_equal" => FilterOp::LessThanEqual,
            "like" => FilterOp::Like,
            "contains" => FilterOp::Contains,
            "exists" => FilterOp::Exists,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Field {
        path: String,
        operator: FilterOp,
        data: Value,
    },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}
