use rusqlite::{Connection, Row, params};

use super::list_page;
use crate::Database;
use crate::error::{OptionalExt, StoreError};
use crate::filter::{Filter, Pagination};
use crate::models::{ContentUpdate, Listing, NewReply, ReplyFilter, ReplyRow};
use crate::store::ReplyStore;

const REPLY_SELECT: &str =
    "SELECT r.id, r.comment_id, r.post_id, r.author_id, u.name, r.content, r.created_at
     FROM replies r
     INNER JOIN users u ON r.author_id = u.id";

impl ReplyStore for Database {
    fn create_reply(&self, reply: &NewReply) -> Result<ReplyRow, StoreError> {
        self.with_conn(|conn| {
            // post_id is copied from the parent comment so the two can never disagree
            let inserted = conn.execute(
                "INSERT INTO replies (comment_id, post_id, author_id, content)
                 SELECT c.id, c.post_id, ?2, ?3 FROM comments c
                 WHERE c.id = ?1 AND (?4 IS NULL OR c.post_id = ?4)",
                params![reply.comment_id, reply.author_id, reply.content, reply.expected_post_id],
            )?;
            if inserted == 0 {
                return Err(StoreError::MissingParent);
            }
            let id = conn.last_insert_rowid();
            query_reply(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    fn update_reply(&self, update: &ContentUpdate) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE replies SET content = ?1 WHERE id = ?2 AND author_id = ?3",
                params![update.content, update.id, update.author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn delete_reply(&self, id: i64, author_id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM replies WHERE id = ?1 AND author_id = ?2",
                params![id, author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn list_replies(
        &self,
        filter: &ReplyFilter,
        page: &Pagination,
    ) -> Result<Listing<ReplyRow>, StoreError> {
        let filter = Filter::new()
            .eq_opt("r.comment_id", filter.comment_id)
            .eq_opt("r.post_id", filter.post_id)
            .eq_opt("r.author_id", filter.author_id);
        self.with_conn(|conn| {
            list_page(
                conn,
                REPLY_SELECT,
                "FROM replies r",
                &filter,
                page,
                "r.created_at",
                "r.id",
                map_reply,
            )
        })
    }

    fn replies_for_post(&self, post_id: i64) -> Result<Vec<ReplyRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{REPLY_SELECT} WHERE r.post_id = ?1 ORDER BY r.created_at DESC, r.id DESC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_reply)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_reply(row: &Row<'_>) -> rusqlite::Result<ReplyRow> {
    Ok(ReplyRow {
        id: row.get(0)?,
        comment_id: row.get(1)?,
        post_id: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_reply(conn: &Connection, id: i64) -> Result<Option<ReplyRow>, StoreError> {
    let mut stmt = conn.prepare(&format!("{REPLY_SELECT} WHERE r.id = ?1"))?;
    stmt.query_row([id], map_reply).optional()
}
