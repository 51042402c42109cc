use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),
}

impl FilterError {
    /// Query parameter the error is about
    pub fn param(&self) -> &'static str {
        match self {
            FilterError::InvalidWhereClause(_)
            | FilterError::UnsupportedOperator(_)
            | FilterError::InvalidOperatorData(_) => "where",
            FilterError::InvalidSort(_) => "sort",
            FilterError::InvalidLimit(_) => "limit",
            FilterError::InvalidPage(_) => "page",
        }
    }
}
