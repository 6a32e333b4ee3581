mod comments;
mod posts;
mod replies;
mod users;

use rusqlite::{Connection, params_from_iter};

use crate::error::StoreError;
use crate::filter::{Filter, Pagination};
use crate::models::Listing;

/// Runs the page query and the matching COUNT under one filter, so
/// `total` always describes the same set the page was cut from.
#[allow(clippy::too_many_arguments)]
fn list_page<T>(
    conn: &Connection,
    select: &str,
    count_from: &str,
    filter: &Filter,
    page: &Pagination,
    order_column: &'static str,
    tie_column: &'static str,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Listing<T>, StoreError> {
    let (suffix, params) = filter.page_clause(order_column, tie_column, page);

    let mut stmt = conn.prepare(&format!("{select}{suffix}"))?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), map)?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {count_from}{}", filter.where_clause()),
        params_from_iter(filter.params().iter()),
        |row| row.get(0),
    )?;

    Ok(Listing { rows, total })
}
