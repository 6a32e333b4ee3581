use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use quill_db::models::{NewPost, PostFilter, PostUpdate};
use quill_types::api::{
    Claims, CreatePostRequest, Page, PostListQuery, Success, UpdatePostRequest,
};

use crate::error::ApiError;
use crate::query::{pagination, required};
use crate::state::{AppState, run_store};
use crate::views;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreatePostRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !claims.role.can_publish() {
        return Err(ApiError::Forbidden(format!(
            "role '{}' is not allowed to create posts",
            claims.role
        )));
    }

    let new_post = NewPost {
        header: required("header", req.header)?,
        body: required("body", req.body)?,
        author_id: claims.user_id,
    };
    let row = run_store(&state, move |s| s.create_post(&new_post)).await?;

    info!(post_id = row.id, user_id = claims.user_id, "post created");
    Ok((StatusCode::CREATED, Json(views::post(row))))
}

/// A post with its full comment tree.
pub async fn get_post(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (post, comments, replies) = run_store(&state, move |s| {
        let Some(post) = s.get_post(id)? else {
            return Ok(None);
        };
        let comments = s.comments_for_post(id)?;
        let replies = s.replies_for_post(id)?;
        Ok(Some((post, comments, replies)))
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("post does not exist".into()))?;

    Ok(Json(views::post_detail(post, comments, replies)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdatePostRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let update = PostUpdate {
        id,
        author_id: claims.user_id,
        header: required("header", req.header)?,
        body: required("body", req.body)?,
    };
    let row = run_store(&state, move |s| s.update_post(&update))
        .await
        .map_err(|e| e.or_not_found("post does not exist"))?;

    info!(post_id = id, user_id = claims.user_id, "post updated");
    Ok(Json(views::post(row)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = claims.user_id;
    run_store(&state, move |s| s.delete_post(id, author_id))
        .await
        .map_err(|e| e.or_not_found("post does not exist"))?;

    info!(post_id = id, user_id = author_id, "post deleted");
    Ok(Json(Success::ok("Successfully deleted post")))
}

pub async fn list_posts(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<PostListQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let page = pagination(q.limit, q.page, q.sort.as_deref())?;
    let filter = PostFilter {
        author_id: q.user_id,
    };

    let listing = run_store(&state, move |s| s.list_posts(&filter, &page)).await?;

    Ok(Json(Page {
        items: listing.rows.into_iter().map(views::post).collect(),
        total_count: listing.total,
    }))
}
