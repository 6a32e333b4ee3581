use rusqlite::{Connection, Row, params};

use super::list_page;
use crate::Database;
use crate::error::{OptionalExt, StoreError};
use crate::filter::{Filter, Pagination};
use crate::models::{CommentFilter, CommentRow, ContentUpdate, Listing, NewComment};
use crate::store::CommentStore;

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.name, c.content, c.created_at
     FROM comments c
     INNER JOIN users u ON c.author_id = u.id";

impl CommentStore for Database {
    fn create_comment(&self, comment: &NewComment) -> Result<CommentRow, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, content) VALUES (?1, ?2, ?3)",
                params![comment.post_id, comment.author_id, comment.content],
            )?;
            let id = conn.last_insert_rowid();
            query_comment(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    fn update_comment(&self, update: &ContentUpdate) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?1 WHERE id = ?2 AND author_id = ?3",
                params![update.content, update.id, update.author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn delete_comment(&self, id: i64, author_id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND author_id = ?2",
                params![id, author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn list_comments(
        &self,
        filter: &CommentFilter,
        page: &Pagination,
    ) -> Result<Listing<CommentRow>, StoreError> {
        let filter = Filter::new()
            .eq_opt("c.post_id", filter.post_id)
            .eq_opt("c.author_id", filter.author_id);
        self.with_conn(|conn| {
            list_page(
                conn,
                COMMENT_SELECT,
                "FROM comments c",
                &filter,
                page,
                "c.created_at",
                "c.id",
                map_comment,
            )
        })
    }

    fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at DESC, c.id DESC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_comment(conn: &Connection, id: i64) -> Result<Option<CommentRow>, StoreError> {
    let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
    stmt.query_row([id], map_comment).optional()
}
