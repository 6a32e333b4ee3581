use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;

use quill_types::api::{Claims, UpdateProfileRequest};

use crate::error::ApiError;
use crate::query::required;
use crate::state::{AppState, run_store};
use crate::views::user_info;

const MAX_NAME_LEN: usize = 64;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_store(&state, move |s| s.get_user(claims.user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("account no longer exists".into()))?;

    Ok(Json(user_info(&user)))
}

/// Only the display name is editable. Tokens issued earlier keep the old name
/// until they expire.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required("name", req.name)?.trim().to_string();
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }

    let user = run_store(&state, move |s| s.update_user_name(claims.user_id, &name))
        .await
        .map_err(|e| e.or_not_found("account no longer exists"))?;

    Ok(Json(user_info(&user)))
}
