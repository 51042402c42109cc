use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::FilterOrderInfo;
use crate::engine::PaginatedDocs;

pub const DEFAULT_LIMIT: u64 = 10;

/// where + sort + pagination read from find/count query parameters
#[derive(Debug, Clone)]
pub struct Filter {
    where_clause: FilterWhere,
    order_data: Vec<FilterOrderInfo>,
    limit: u64,
    page: u64,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            where_clause: FilterWhere::default(),
            order_data: vec![],
            limit: DEFAULT_LIMIT,
            page: 1,
        }
    }
}

impl Filter {
    pub fn from_query(query: &Map<String, Value>) -> Result<Self, FilterError> {
        let mut filter = Self::default();

        if let Some(where_data) = query.get("where") {
            filter.where_clause = FilterWhere::parse(where_data)?;
        }
        if let Some(sort) = query.get("sort") {
            filter.order_data = FilterOrder::validate_and_parse(sort)?;
        }
        if let Some(limit) = query.get("limit") {
            filter.limit = non_negative(limit).ok_or_else(|| FilterError::InvalidLimit(limit.to_string()))?;
        }
        if let Some(page) = query.get("page") {
            filter.page = non_negative(page)
                .filter(|p| *p > 0)
                .ok_or_else(|| FilterError::InvalidPage(page.to_string()))?;
        }
        // pagination=false returns everything on one page
        if query.get("pagination") == Some(&Value::Bool(false)) {
            filter.limit = 0;
            filter.page = 1;
        }

        Ok(filter)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    fn select(&self, docs: Vec<Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = if self.where_clause.is_empty() {
            docs
        } else {
            docs.into_iter().filter(|d| self.where_clause.matches(d)).collect()
        };
        if !self.order_data.is_empty() {
            selected.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
        }
        selected
    }

    pub fn apply(&self, docs: Vec<Value>) -> PaginatedDocs {
        PaginatedDocs::paginate(self.select(docs), self.limit, self.page)
    }

    pub fn count(&self, docs: &[Value]) -> u64 {
        if self.where_clause.is_empty() {
            return docs.len() as u64;
        }
        docs.iter().filter(|d| self.where_clause.matches(d)).count() as u64
    }
}

fn non_negative(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
