use quill_db::{Pagination, SortOrder};

use crate::error::ApiError;

/// Validate raw list parameters, filling defaults for anything absent.
pub(crate) fn pagination(
    limit: Option<u32>,
    page: Option<u32>,
    sort: Option<&str>,
) -> Result<Pagination, ApiError> {
    let limit = limit.unwrap_or(Pagination::DEFAULT_LIMIT);
    if !(1..=Pagination::MAX_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            Pagination::MAX_LIMIT
        )));
    }

    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::Validation("page must be at least 1".into()));
    }

    let sort = match sort {
        None => SortOrder::default(),
        Some(raw) => raw.parse::<SortOrder>().map_err(ApiError::Validation)?,
    };

    Ok(Pagination { limit, page, sort })
}

/// Required text field. Blank input is rejected; content is kept verbatim.
pub(crate) fn required(field: &str, value: String) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(value)
}
