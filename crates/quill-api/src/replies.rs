use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use quill_db::models::{ContentUpdate, NewReply, ReplyFilter};
use quill_types::api::{
    Claims, CreateReplyRequest, Page, ReplyListQuery, Success, UpdateReplyRequest,
};

use crate::error::ApiError;
use crate::query::{pagination, required};
use crate::state::{AppState, run_store};
use crate::views;

/// The stored post id comes from the parent comment. A supplied `post_id`
/// that disagrees is reported as a missing comment.
pub async fn create_reply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateReplyRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let new_reply = NewReply {
        comment_id: req.comment_id,
        expected_post_id: req.post_id,
        author_id: claims.user_id,
        content: required("content", req.content)?,
    };
    let row = run_store(&state, move |s| s.create_reply(&new_reply))
        .await
        .map_err(|e| e.or_not_found("comment does not exist on this post"))?;

    info!(reply_id = row.id, comment_id = row.comment_id, user_id = claims.user_id, "reply created");
    Ok((StatusCode::CREATED, Json(views::reply(row))))
}

pub async fn update_reply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateReplyRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let update = ContentUpdate {
        id,
        author_id: claims.user_id,
        content: required("content", req.content)?,
    };
    run_store(&state, move |s| s.update_reply(&update))
        .await
        .map_err(|e| e.or_not_found("reply does not exist"))?;

    Ok(Json(Success::ok("Successfully updated reply")))
}

pub async fn delete_reply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = claims.user_id;
    run_store(&state, move |s| s.delete_reply(id, author_id))
        .await
        .map_err(|e| e.or_not_found("reply does not exist"))?;

    info!(reply_id = id, user_id = author_id, "reply deleted");
    Ok(Json(Success::ok("Successfully deleted reply")))
}

pub async fn list_replies(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<ReplyListQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let page = pagination(q.limit, q.page, q.sort.as_deref())?;
    let filter = ReplyFilter {
        comment_id: q.comment_id,
        post_id: q.post_id,
        author_id: q.user_id,
    };

    let listing = run_store(&state, move |s| s.list_replies(&filter, &page)).await?;

    Ok(Json(Page {
        items: listing.rows.into_iter().map(views::reply).collect(),
        total_count: listing.total,
    }))
}
