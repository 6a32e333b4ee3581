use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account kind chosen at signup. Only bloggers may publish posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Blogger,
    Reader,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Blogger => "blogger",
            Role::Reader => "reader",
        }
    }

    pub fn can_publish(self) -> bool {
        matches!(self, Role::Blogger)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("role should be either blogger or reader, got '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blogger" => Ok(Role::Blogger),
            "reader" => Ok(Role::Reader),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Minimal author display info attached to every piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub header: String,
    pub body: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub user_info: AuthorInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
    pub user_info: AuthorInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub post_id: i64,
    pub comment_id: i64,
    pub created_at: DateTime<Utc>,
    pub user_info: AuthorInfo,
}

// -- Nested post view --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyList {
    pub replies: Vec<Reply>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithReplies {
    #[serde(flatten)]
    pub comment: Comment,
    pub all_replies: ReplyList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThreads {
    pub comments: Vec<CommentWithReplies>,
    pub count: usize,
}

/// A post with every comment and reply under it, as served by `GET /v1/posts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub all_comments: CommentThreads,
}
