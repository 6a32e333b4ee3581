//! Parameterized WHERE/ORDER/LIMIT composition for listing queries.
//!
//! Column names are `&'static str` supplied by the query modules; every
//! caller-controlled value travels as a bound `?N` parameter.

use std::str::FromStr;

use rusqlite::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("sort should be either asc or desc, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub page: u32,
    pub sort: SortOrder,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Rows skipped before this page: `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            page: 1,
            sort: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: i64) -> Self {
        self.params.push(Value::Integer(value));
        self.clauses
            .push(format!("{} = ?{}", column, self.params.len()));
        self
    }

    pub fn eq_opt(self, column: &'static str, value: Option<i64>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// `" WHERE a = ?1 AND b = ?2"`, or empty when nothing was added.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// WHERE + ORDER BY + LIMIT/OFFSET suffix for a page query, with the
    /// filter's parameters followed by limit and offset.
    pub fn page_clause(
        &self,
        order_column: &'static str,
        tie_column: &'static str,
        page: &Pagination,
    ) -> (String, Vec<Value>) {
        let n = self.params.len();
        let dir = page.sort.as_sql();
        let sql = format!(
            "{} ORDER BY {order_column} {dir}, {tie_column} {dir} LIMIT ?{} OFFSET ?{}",
            self.where_clause(),
            n + 1,
            n + 2,
        );

        let mut params = self.params.clone();
        params.push(Value::Integer(i64::from(page.limit)));
        params.push(Value::Integer(page.offset()));
        (sql, params)
    }
}
