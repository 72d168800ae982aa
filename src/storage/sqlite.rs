//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{KeywordCount, StoredPage};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite page store
///
/// The connection sits behind a mutex that is only taken on a blocking
/// thread, so the async crawl loop never holds it.
#[derive(Clone)]
pub struct SqlitePageStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePageStore {
    /// Opens (or creates) a page store database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqlitePageStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Stores a page synchronously; see [`PageStore::persist_page`]
    pub fn save_page(
        &self,
        url: &str,
        title: &str,
        summary: &str,
        keywords: &[String],
    ) -> StorageResult<()> {
        let mut conn = lock(&self.conn)?;
        write_page(&mut conn, url, title, summary, keywords)
    }

    /// Counts stored pages
    pub fn count_pages(&self) -> StorageResult<u64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Counts distinct keywords
    pub fn count_keywords(&self) -> StorageResult<u64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns the keywords linked to the most pages, most linked first
    pub fn top_keywords(&self, limit: usize) -> StorageResult<Vec<KeywordCount>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT k.name, COUNT(pk.page_id) AS pages
             FROM keywords k
             JOIN page_keywords pk ON pk.keyword_id = k.id
             GROUP BY k.id
             ORDER BY pages DESC, k.name ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(KeywordCount {
                keyword: row.get(0)?,
                pages: row.get::<_, i64>(1)? as u64,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Loads a single page by URL
    pub fn get_page(&self, url: &str) -> StorageResult<Option<StoredPage>> {
        let conn = lock(&self.conn)?;
        let row = conn
            .query_row(
                "SELECT id, url, title, summary, last_updated FROM pages WHERE url = ?1",
                params![url],
                |row| Ok((row.get::<_, i64>(0)?, page_from_row(row)?)),
            )
            .optional()?;

        match row {
            Some((id, mut page)) => {
                page.keywords = keywords_for_page(&conn, id)?;
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }

    /// Loads every stored page, ordered by URL
    pub fn list_pages(&self) -> StorageResult<Vec<StoredPage>> {
        let conn = lock(&self.conn)?;
        let mut stmt =
            conn.prepare("SELECT id, url, title, summary, last_updated FROM pages ORDER BY url")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, page_from_row(row)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        attach_keywords(&conn, rows)
    }

    /// Loads the pages linked to a keyword, ordered by URL
    pub fn pages_with_keyword(&self, keyword: &str) -> StorageResult<Vec<StoredPage>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.url, p.title, p.summary, p.last_updated
             FROM pages p
             JOIN page_keywords pk ON pk.page_id = p.id
             JOIN keywords k ON k.id = pk.keyword_id
             WHERE k.name = ?1
             ORDER BY p.url",
        )?;
        let rows = stmt
            .query_map(params![keyword], |row| {
                Ok((row.get::<_, i64>(0)?, page_from_row(row)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        attach_keywords(&conn, rows)
    }
}

#[async_trait]
impl PageStore for SqlitePageStore {
    async fn persist_page(
        &self,
        url: &str,
        title: &str,
        summary: &str,
        keywords: &[String],
    ) -> StorageResult<()> {
        let store = self.clone();
        let url = url.to_string();
        let title = title.to_string();
        let summary = summary.to_string();
        let keywords = keywords.to_vec();

        tokio::task::spawn_blocking(move || store.save_page(&url, &title, &summary, &keywords))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
}

/// Upserts a page and merges in its keyword links in one transaction
///
/// Links from earlier persists are kept; repeated links are ignored.
fn write_page(
    conn: &mut Connection,
    url: &str,
    title: &str,
    summary: &str,
    keywords: &[String],
) -> StorageResult<()> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO pages (url, title, summary, last_updated) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(url) DO UPDATE SET
             title = excluded.title,
             summary = excluded.summary,
             last_updated = excluded.last_updated",
        params![url, title, summary, now],
    )?;

    let page_id: i64 = tx.query_row(
        "SELECT id FROM pages WHERE url = ?1",
        params![url],
        |row| row.get(0),
    )?;

    for keyword in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        tx.execute(
            "INSERT OR IGNORE INTO keywords (name) VALUES (?1)",
            params![keyword],
        )?;
        let keyword_id: i64 = tx.query_row(
            "SELECT id FROM keywords WHERE name = ?1",
            params![keyword],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO page_keywords (page_id, keyword_id) VALUES (?1, ?2)",
            params![page_id, keyword_id],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn page_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredPage> {
    Ok(StoredPage {
        url: row.get(1)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        keywords: Vec::new(),
        last_updated: row.get(4)?,
    })
}

fn keywords_for_page(conn: &Connection, page_id: i64) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT k.name FROM keywords k
         JOIN page_keywords pk ON pk.keyword_id = k.id
         WHERE pk.page_id = ?1
         ORDER BY k.name",
    )?;
    let names = stmt
        .query_map(params![page_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

fn attach_keywords(
    conn: &Connection,
    rows: Vec<(i64, StoredPage)>,
) -> StorageResult<Vec<StoredPage>> {
    rows.into_iter()
        .map(|(id, mut page)| {
            page.keywords = keywords_for_page(conn, id)?;
            Ok(page)
        })
        .collect()
}
