//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the page store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawled page
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);

-- Distinct keywords across all pages
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Page to keyword associations
CREATE TABLE IF NOT EXISTS page_keywords (
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
    UNIQUE(page_id, keyword_id)
);

CREATE INDEX IF NOT EXISTS idx_page_keywords_keyword ON page_keywords(keyword_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
