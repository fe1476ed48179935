//! HTTP handlers.

pub mod auth;
pub mod error;
pub mod permission;
pub mod types;
pub mod user;

use tally_core::repository::{PaginatedResult, Pagination};
use uuid::Uuid;

use self::error::{ApiError, api_validation_error};
use self::types::{PageInfo, PageQuery, PageResponse};

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| api_validation_error(format!("invalid uuid: {raw}")))
}

/// Pagination applies only when `limit` is given. `offset` defaults to 0.
pub(crate) fn parse_page(query: &PageQuery) -> Result<Option<Pagination>, ApiError> {
    let Some(limit) = query.limit.as_deref() else {
        return Ok(None);
    };
    let limit = limit
        .trim()
        .parse::<u64>()
        .map_err(|_| api_validation_error("limit must be a non-negative integer"))?;
    let offset = match query.offset.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| api_validation_error("offset must be a non-negative integer"))?,
        None => 0,
    };
    Ok(Some(Pagination { offset, limit }))
}

pub(crate) fn page_response<T>(result: PaginatedResult<T>) -> PageResponse<T> {
    PageResponse {
        pagination: PageInfo {
            total_records: result.total,
            limit: result.limit,
            offset: result.offset,
            selected: result.items.len(),
        },
        data: result.items,
    }
}
