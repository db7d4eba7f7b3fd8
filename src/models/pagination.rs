use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Resolve `limit`/`offset` query values, defaulting to the first page of 10
pub fn page_window(limit: Option<u64>, offset: Option<u64>) -> Result<(u64, u64), String> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(format!("limit must be between 1 and {}", MAX_PAGE_LIMIT));
    }
    Ok((limit, offset.unwrap_or(0)))
}
