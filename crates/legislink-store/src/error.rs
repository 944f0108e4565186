use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no results for query")]
    NoResults,

    #[error("unknown sync run {0}")]
    UnknownRun(i64),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
