use rusqlite::{Connection, Row, params};

use super::list_page;
use crate::Database;
use crate::error::{OptionalExt, StoreError};
use crate::filter::{Filter, Pagination};
use crate::models::{Listing, NewPost, PostFilter, PostRow, PostUpdate};
use crate::store::PostStore;

const POST_SELECT: &str = "SELECT p.id, p.header, p.body, p.author_id, u.name, p.created_at
     FROM posts p
     INNER JOIN users u ON p.author_id = u.id";

impl PostStore for Database {
    fn create_post(&self, post: &NewPost) -> Result<PostRow, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (header, body, author_id) VALUES (?1, ?2, ?3)",
                params![post.header, post.body, post.author_id],
            )?;
            let id = conn.last_insert_rowid();
            query_post(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    fn get_post(&self, id: i64) -> Result<Option<PostRow>, StoreError> {
        self.with_conn(|conn| query_post(conn, id))
    }

    fn update_post(&self, update: &PostUpdate) -> Result<PostRow, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET header = ?1, body = ?2 WHERE id = ?3 AND author_id = ?4",
                params![update.header, update.body, update.id, update.author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            query_post(conn, update.id)?.ok_or(StoreError::NotFound)
        })
    }

    fn delete_post(&self, id: i64, author_id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
                params![id, author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn list_posts(
        &self,
        filter: &PostFilter,
        page: &Pagination,
    ) -> Result<Listing<PostRow>, StoreError> {
        let filter = Filter::new().eq_opt("p.author_id", filter.author_id);
        self.with_conn(|conn| {
            list_page(
                conn,
                POST_SELECT,
                "FROM posts p",
                &filter,
                page,
                "p.created_at",
                "p.id",
                map_post,
            )
        })
    }
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        header: row.get(1)?,
        body: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_post(conn: &Connection, id: i64) -> Result<Option<PostRow>, StoreError> {
    let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1"))?;
    stmt.query_row([id], map_post).optional()
}

#[cfg(test)]
mod tests {
    use quill_types::models::Role;

    use super::*;
    use crate::filter::SortOrder;
    use crate::queries::test_support::{db, user};

    fn post(db: &Database, author_id: i64, header: &str) -> PostRow {
        db.create_post(&NewPost {
            header: header.to_string(),
            body: "body".to_string(),
            author_id,
        })
        .unwrap()
    }

    #[test]
    fn create_joins_author_name() {
        let db = db();
        let author = user(&db, "a@x.com", Role::Blogger);
        let row = post(&db, author, "H");

        assert_eq!(row.header, "H");
        assert_eq!(row.author_id, author);
        assert_eq!(row.author_name, "a");

        let fetched = db.get_post(row.id).unwrap().unwrap();
        assert_eq!(fetched.created_at, row.created_at);
        assert!(db.get_post(row.id + 1).unwrap().is_none());
    }

    #[test]
    fn foreign_owner_cannot_update_or_delete() {
        let db = db();
        let owner = user(&db, "a@x.com", Role::Blogger);
        let other = user(&db, "b@x.com", Role::Blogger);
        let row = post(&db, owner, "first draft");

        let err = db
            .update_post(&PostUpdate {
                id: row.id,
                author_id: other,
                header: "hijacked".into(),
                body: "hijacked".into(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(matches!(db.delete_post(row.id, other), Err(StoreError::NotFound)));

        let unchanged = db.get_post(row.id).unwrap().unwrap();
        assert_eq!(unchanged.header, "first draft");
    }

    #[test]
    fn owner_update_keeps_identity() {
        let db = db();
        let owner = user(&db, "a@x.com", Role::Blogger);
        let row = post(&db, owner, "H");

        let updated = db
            .update_post(&PostUpdate {
                id: row.id,
                author_id: owner,
                header: "H2".into(),
                body: "B2".into(),
            })
            .unwrap();
        assert_eq!(updated.id, row.id);
        assert_eq!(updated.header, "H2");
        assert_eq!(updated.body, "B2");
        assert_eq!(updated.author_id, owner);
        assert_eq!(updated.created_at, row.created_at);

        db.delete_post(row.id, owner).unwrap();
        assert!(db.get_post(row.id).unwrap().is_none());
    }

    #[test]
    fn second_page_holds_items_eleven_to_twenty() {
        let db = db();
        let author = user(&db, "a@x.com", Role::Blogger);
        let other = user(&db, "b@x.com", Role::Blogger);
        let ids: Vec<i64> = (1..=25).map(|i| post(&db, author, &format!("p{i}")).id).collect();
        post(&db, other, "not mine");

        let page = Pagination { limit: 10, page: 2, sort: SortOrder::Desc };
        let listing = db
            .list_posts(&PostFilter { author_id: Some(author) }, &page)
            .unwrap();

        assert_eq!(listing.total, 25);
        let got: Vec<i64> = listing.rows.iter().map(|r| r.id).collect();
        let expected: Vec<i64> = ids.iter().rev().skip(10).take(10).copied().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn ascending_sort_and_unfiltered_count() {
        let db = db();
        let a = user(&db, "a@x.com", Role::Blogger);
        let b = user(&db, "b@x.com", Role::Blogger);
        let first = post(&db, a, "first").id;
        post(&db, b, "second");
        post(&db, a, "third");

        let page = Pagination { limit: 2, page: 1, sort: SortOrder::Asc };
        let listing = db.list_posts(&PostFilter::default(), &page).unwrap();
        assert_eq!(listing.total, 3);
        assert_eq!(listing.rows.len(), 2);
        assert_eq!(listing.rows[0].id, first);
    }
}
