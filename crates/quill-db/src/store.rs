//! Storage contracts consumed by the API layer. `Database` is the SQLite
//! implementation; another backend only has to implement these traits.
//!
//! Every update and delete is scoped to `(id, author_id)`. A statement that
//! touches zero rows reports `StoreError::NotFound` whether the row is missing
//! or owned by someone else.

use crate::error::StoreError;
use crate::filter::Pagination;
use crate::models::{
    CommentFilter, CommentRow, ContentUpdate, Listing, NewComment, NewPost, NewReply, NewUser,
    PostFilter, PostRow, PostUpdate, ReplyFilter, ReplyRow, UserRow,
};

pub trait UserStore {
    /// Fails with `Conflict` when the email is already registered.
    fn create_user(&self, user: &NewUser) -> Result<UserRow, StoreError>;
    fn get_user(&self, id: i64) -> Result<Option<UserRow>, StoreError>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError>;
    fn update_user_name(&self, id: i64, name: &str) -> Result<UserRow, StoreError>;
}

pub trait PostStore {
    fn create_post(&self, post: &NewPost) -> Result<PostRow, StoreError>;
    fn get_post(&self, id: i64) -> Result<Option<PostRow>, StoreError>;
    fn update_post(&self, update: &PostUpdate) -> Result<PostRow, StoreError>;
    fn delete_post(&self, id: i64, author_id: i64) -> Result<(), StoreError>;
    fn list_posts(&self, filter: &PostFilter, page: &Pagination)
        -> Result<Listing<PostRow>, StoreError>;
}

pub trait CommentStore {
    /// Fails with `MissingParent` when the post does not exist.
    fn create_comment(&self, comment: &NewComment) -> Result<CommentRow, StoreError>;
    fn update_comment(&self, update: &ContentUpdate) -> Result<(), StoreError>;
    fn delete_comment(&self, id: i64, author_id: i64) -> Result<(), StoreError>;
    fn list_comments(
        &self,
        filter: &CommentFilter,
        page: &Pagination,
    ) -> Result<Listing<CommentRow>, StoreError>;
    /// Every comment on a post, newest first.
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>, StoreError>;
}

pub trait ReplyStore {
    /// Fails with `MissingParent` when the comment does not exist or does not
    /// belong to `expected_post_id`.
    fn create_reply(&self, reply: &NewReply) -> Result<ReplyRow, StoreError>;
    fn update_reply(&self, update: &ContentUpdate) -> Result<(), StoreError>;
    fn delete_reply(&self, id: i64, author_id: i64) -> Result<(), StoreError>;
    fn list_replies(
        &self,
        filter: &ReplyFilter,
        page: &Pagination,
    ) -> Result<Listing<ReplyRow>, StoreError>;
    /// Every reply under a post, newest first.
    fn replies_for_post(&self, post_id: i64) -> Result<Vec<ReplyRow>, StoreError>;
}

/// The full capability set handlers are written against.
pub trait Storage: UserStore + PostStore + CommentStore + ReplyStore + Send + Sync {}

impl<T> Storage for T where T: UserStore + PostStore + CommentStore + ReplyStore + Send + Sync {}
