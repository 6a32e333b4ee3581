use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, UserInfo};

// -- JWT Claims --

/// Decoded token payload. `exp` mirrors `expired_at` as a unix timestamp so the
/// JWT library can enforce expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
    pub exp: usize,
}

// -- Envelopes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Success {
    pub code: u16,
    pub message: String,
}

impl Success {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: 200,
            message: message.into(),
        }
    }
}

/// One page of a listing plus the size of the whole filtered set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyEmailResponse {
    pub user_info: UserInfo,
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_info: UserInfo,
    pub access_token: String,
    pub remember_me: bool,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub header: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub header: String,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub user_id: Option<i64>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub post_id: Option<i64>,
    pub user_id: Option<i64>,
}

// -- Replies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReplyRequest {
    pub comment_id: i64,
    /// Optional consistency check; the stored post id always comes from the comment.
    #[serde(default)]
    pub post_id: Option<i64>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReplyRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplyListQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub comment_id: Option<i64>,
    pub post_id: Option<i64>,
    pub user_id: Option<i64>,
}
