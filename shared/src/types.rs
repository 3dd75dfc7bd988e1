//! Common types used across the service

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interpret a boolean-like query value.
///
/// Accepts `true/1/yes/y/on` and `false/0/no/n/off`, case-insensitive and
/// ignoring surrounding whitespace. Anything else, including an empty or
/// missing value, yields `default`.
pub fn parse_bool_flag(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };

    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => true,
        "false" | "0" | "no" | "n" | "off" => false,
        _ => default,
    }
}

/// A query parameter that could not be converted to its typed form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("'{field}' must be an integer, got '{value}'")]
    InvalidInteger { field: &'static str, value: String },

    #[error("'{field}' must be a date in YYYY-MM-DD format, got '{value}'")]
    InvalidDate { field: &'static str, value: String },
}

impl FilterError {
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidInteger { field, .. } | FilterError::InvalidDate { field, .. } => {
                field
            }
        }
    }
}

/// Treat blank query values as absent
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an optional integer query value
pub fn parse_id_param(field: &'static str, value: Option<&str>) -> Result<Option<i64>, FilterError> {
    non_blank(value)
        .map(|v| {
            v.parse::<i64>().map_err(|_| FilterError::InvalidInteger {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Parse an optional `YYYY-MM-DD` query value
pub fn parse_date_param(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, FilterError> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| FilterError::InvalidDate {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Build pagination from raw query values.
    ///
    /// Unparseable or zero values fall back to the defaults and the page size
    /// is capped at `max_per_page`.
    pub fn from_params(page: Option<&str>, per_page: Option<&str>, default_per_page: u32, max_per_page: u32) -> Self {
        let page = non_blank(page)
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let per_page = non_blank(per_page)
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(default_per_page)
            .min(max_per_page.max(1));

        Self { page, per_page }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total_items: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(pagination, total_items),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total_items: u64) -> Self {
        let per_page = u64::from(pagination.per_page.max(1));
        let total_pages = total_items.div_ceil(per_page);
        Self {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }
}
