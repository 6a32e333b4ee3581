use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use quill_db::models::{CommentFilter, ContentUpdate, NewComment};
use quill_types::api::{
    Claims, CommentListQuery, CreateCommentRequest, Page, Success, UpdateCommentRequest,
};

use crate::error::ApiError;
use crate::query::{pagination, required};
use crate::state::{AppState, run_store};
use crate::views;

/// Any authenticated role may comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let new_comment = NewComment {
        post_id: req.post_id,
        author_id: claims.user_id,
        content: required("content", req.content)?,
    };
    let row = run_store(&state, move |s| s.create_comment(&new_comment))
        .await
        .map_err(|e| e.or_not_found("post does not exist"))?;

    info!(comment_id = row.id, post_id = row.post_id, user_id = claims.user_id, "comment created");
    Ok((StatusCode::CREATED, Json(views::comment(row))))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateCommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let update = ContentUpdate {
        id,
        author_id: claims.user_id,
        content: required("content", req.content)?,
    };
    run_store(&state, move |s| s.update_comment(&update))
        .await
        .map_err(|e| e.or_not_found("comment does not exist"))?;

    Ok(Json(Success::ok("Successfully updated comment")))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = claims.user_id;
    run_store(&state, move |s| s.delete_comment(id, author_id))
        .await
        .map_err(|e| e.or_not_found("comment does not exist"))?;

    info!(comment_id = id, user_id = author_id, "comment deleted");
    Ok(Json(Success::ok("Successfully deleted comment")))
}

pub async fn list_comments(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<CommentListQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let page = pagination(q.limit, q.page, q.sort.as_deref())?;
    let filter = CommentFilter {
        post_id: q.post_id,
        author_id: q.user_id,
    };

    let listing = run_store(&state, move |s| s.list_comments(&filter, &page)).await?;

    Ok(Json(Page {
        items: listing.rows.into_iter().map(views::comment).collect(),
        total_count: listing.total,
    }))
}
