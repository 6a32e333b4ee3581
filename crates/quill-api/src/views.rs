//! Row to response conversions.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use quill_db::models::{CommentRow, PostRow, ReplyRow, UserRow};
use quill_types::models::{
    AuthorInfo, Comment, CommentThreads, CommentWithReplies, Post, PostDetail, Reply, ReplyList,
    UserInfo,
};

/// Stored timestamps are RFC 3339; older rows may use SQLite's
/// `YYYY-MM-DD HH:MM:SS` form.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    warn!(raw = %raw, "unparseable timestamp, using epoch");
    DateTime::<Utc>::UNIX_EPOCH
}

pub(crate) fn user_info(row: &UserRow) -> UserInfo {
    UserInfo {
        id: row.id,
        name: row.name.clone(),
        email: row.email.clone(),
        role: row.role,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn post(row: PostRow) -> Post {
    Post {
        id: row.id,
        header: row.header,
        body: row.body,
        user_id: row.author_id,
        created_at: parse_timestamp(&row.created_at),
        user_info: AuthorInfo {
            id: row.author_id,
            name: row.author_name,
        },
    }
}

pub(crate) fn comment(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        content: row.content,
        user_id: row.author_id,
        post_id: row.post_id,
        created_at: parse_timestamp(&row.created_at),
        user_info: AuthorInfo {
            id: row.author_id,
            name: row.author_name,
        },
    }
}

pub(crate) fn reply(row: ReplyRow) -> Reply {
    Reply {
        id: row.id,
        content: row.content,
        user_id: row.author_id,
        post_id: row.post_id,
        comment_id: row.comment_id,
        created_at: parse_timestamp(&row.created_at),
        user_info: AuthorInfo {
            id: row.author_id,
            name: row.author_name,
        },
    }
}

/// Assemble a post with its comments, each carrying its own replies.
/// Input order is preserved at both levels.
pub(crate) fn post_detail(
    post_row: PostRow,
    comments: Vec<CommentRow>,
    replies: Vec<ReplyRow>,
) -> PostDetail {
    let mut by_comment: HashMap<i64, Vec<Reply>> = HashMap::new();
    for row in replies {
        by_comment.entry(row.comment_id).or_default().push(reply(row));
    }

    let threads: Vec<CommentWithReplies> = comments
        .into_iter()
        .map(|row| {
            let replies = by_comment.remove(&row.id).unwrap_or_default();
            CommentWithReplies {
                comment: comment(row),
                all_replies: ReplyList {
                    count: replies.len(),
                    replies,
                },
            }
        })
        .collect();

    PostDetail {
        post: post(post_row),
        all_comments: CommentThreads {
            count: threads.len(),
            comments: threads,
        },
    }
}
