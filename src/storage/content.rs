//! Content items stored in `{prefix}posts`

use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::driver::{SqlDriver, SqlValue};
use super::sqlite::SqliteStore;
use crate::Result;

/// Status given to items unless stated otherwise
pub const PUBLISHED: &str = "publish";

/// A content item (post, page, custom type entry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "ID")]
    pub id: i64,
    pub post_type: String,
    pub title: String,
    pub status: String,
}

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<ContentItem>,
    /// Number of matches across all pages
    pub found: usize,
}

impl ItemPage {
    /// Number of pages needed for `found` at `per_page`
    pub fn max_pages(&self, per_page: u32) -> u32 {
        if per_page == 0 {
            return 0;
        }
        self.found.div_ceil(per_page as usize) as u32
    }
}

impl SqliteStore {
    /// Insert a content item, returning its new id
    pub fn insert_item(&self, post_type: &str, title: &str, status: &str) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} (post_type, post_title, post_status) VALUES (?1, ?2, ?3)",
            self.posts()
        );
        self.conn.execute(&sql, params![post_type, title, status])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get an item by id
    pub fn get_item(&self, id: i64) -> Result<Option<ContentItem>> {
        let sql = format!(
            "SELECT ID, post_type, post_title, post_status FROM {} WHERE ID = ?1",
            self.posts()
        );
        self.conn
            .query_row(&sql, [id], Self::row_to_item)
            .optional()
            .map_err(Into::into)
    }

    /// Remove the item row only; relationship cleanup lives in [`crate::AppContext`]
    pub fn delete_item_row(&self, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE ID = ?1", self.posts());
        Ok(self.conn.execute(&sql, [id])? > 0)
    }

    /// Count all items
    pub fn count_items(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.posts());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Published items of the given types whose title contains `search`,
    /// newest first
    pub fn search_items(
        &self,
        post_types: &[String],
        search: &str,
        page: u32,
        per_page: u32,
        exclude_id: Option<i64>,
    ) -> Result<ItemPage> {
        if post_types.is_empty() {
            return Ok(ItemPage::default());
        }

        let mut values: Vec<SqlValue> = vec![
            SqlValue::Text(PUBLISHED.to_string()),
            SqlValue::Text(format!("%{}%", escape_like(search))),
        ];
        let type_slots: Vec<String> = post_types
            .iter()
            .map(|t| {
                values.push(SqlValue::Text(t.clone()));
                format!("?{}", values.len())
            })
            .collect();

        let mut filter = format!(
            "post_status = ?1 AND post_title LIKE ?2 ESCAPE '\\' AND post_type IN ({})",
            type_slots.join(", ")
        );
        if let Some(id) = exclude_id {
            values.push(SqlValue::Integer(id));
            filter.push_str(&format!(" AND ID != ?{}", values.len()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {}", self.posts(), filter);
        let found: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        let page = page.max(1);
        let offset = (page - 1) as i64 * per_page as i64;
        let select_sql = format!(
            "SELECT ID, post_type, post_title, post_status FROM {} WHERE {} ORDER BY ID DESC LIMIT {} OFFSET {}",
            self.posts(),
            filter,
            per_page,
            offset
        );
        let mut stmt = self.conn.prepare(&select_sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ItemPage {
            items,
            found: found as usize,
        })
    }

    /// Items related to `item_id` through a junction table, restricted to
    /// `post_types`
    pub fn related_items(
        &self,
        junction_table: &str,
        relationship_name: &str,
        item_id: i64,
        post_types: &[String],
        order_by_relationship: bool,
    ) -> Result<Vec<ContentItem>> {
        if post_types.is_empty() {
            return Ok(Vec::new());
        }

        let dialect = self.dialect();
        let mut values = vec![
            SqlValue::Integer(item_id),
            SqlValue::Text(relationship_name.to_string()),
        ];
        let type_slots: Vec<String> = post_types
            .iter()
            .map(|t| {
                values.push(SqlValue::Text(t.clone()));
                format!("?{}", values.len())
            })
            .collect();

        let order = if order_by_relationship {
            "j.\"order\" ASC, p.ID ASC"
        } else {
            "p.ID DESC"
        };
        let sql = format!(
            "SELECT p.ID, p.post_type, p.post_title, p.post_status
             FROM {} p
             INNER JOIN {} j ON p.ID = j.id2
             WHERE j.id1 = ?1 AND j.name = ?2 AND p.post_type IN ({})
             ORDER BY {}",
            self.posts(),
            dialect.quote_ident(junction_table),
            type_slots.join(", "),
            order
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn posts(&self) -> String {
        self.dialect().quote_ident(&self.table("posts"))
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<ContentItem> {
        Ok(ContentItem {
            id: row.get(0)?,
            post_type: row.get(1)?,
            title: row.get(2)?,
            status: row.get(3)?,
        })
    }
}

/// Escape LIKE wildcards so the search term matches literally
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
