//! Database row types. Timestamps stay as the stored RFC 3339 text; the API
//! layer parses them.

use quill_types::models::Role;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub header: String,
    pub body: String,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub header: String,
    pub body: String,
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub id: i64,
    pub author_id: i64,
    pub header: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ReplyRow {
    pub id: i64,
    pub comment_id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub comment_id: i64,
    /// When set, the parent comment must belong to this post.
    pub expected_post_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
}

/// Owner-scoped content edit, shared by comments and replies.
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    pub id: i64,
    pub author_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentFilter {
    pub post_id: Option<i64>,
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyFilter {
    pub comment_id: Option<i64>,
    pub post_id: Option<i64>,
    pub author_id: Option<i64>,
}

/// A page of rows and the size of the full filtered set.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub rows: Vec<T>,
    pub total: i64,
}
