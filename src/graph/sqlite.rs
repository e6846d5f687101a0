//! SQLite-backed link graph.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::GraphStore;
use crate::db::Db;
use crate::{Result, WikipathError};

/// Page and link totals, as reported by the `stats` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub pages: i64,
    pub links: i64,
    pub expanded_pages: i64,
}

/// A completed search, as stored in `search_runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRunRecord {
    pub start_title: String,
    pub goal_title: String,
    pub max_depth: usize,
    pub top_n: usize,
    /// `None` when no path was found.
    pub path: Option<Vec<String>>,
    pub expansions: usize,
    pub backtracks: usize,
    pub latency_ms: u64,
    /// Set by the database on insert.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Graph store persisted in the `pages` and `links` tables.
#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    db: Db,
}

fn insert_page(conn: &Connection, title: &str) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO pages (title) VALUES (?1)", params![title])?;
    Ok(())
}

fn insert_link(conn: &Connection, from: &str, to: &str) -> Result<()> {
    insert_page(conn, from)?;
    insert_page(conn, to)?;
    conn.execute(
        "INSERT OR IGNORE INTO links (source_title, target_title) VALUES (?1, ?2)",
        params![from, to],
    )?;
    Ok(())
}

fn mark_page_expanded(conn: &Connection, title: &str) -> Result<()> {
    conn.execute(
        "UPDATE pages SET expanded_at = CURRENT_TIMESTAMP WHERE title = ?1",
        params![title],
    )?;
    Ok(())
}

impl SqliteGraphStore {
    /// Wrap an already-migrated database.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn stats(&self) -> Result<GraphStats> {
        self.db
            .with_connection(|conn| {
                let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0));
                Ok(GraphStats {
                    pages: count("SELECT COUNT(*) FROM pages")?,
                    links: count("SELECT COUNT(*) FROM links")?,
                    expanded_pages: count("SELECT COUNT(*) FROM pages WHERE expanded_at IS NOT NULL")?,
                })
            })
            .await
    }

    /// Append a row to `search_runs`.
    pub async fn record_search_run(&self, run: &SearchRunRecord) -> Result<()> {
        let path_json = run.path.as_ref().map(serde_json::to_string).transpose()?;
        let run = run.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO search_runs (
                        start_title, goal_title, max_depth, top_n, found,
                        path_json, expansions, backtracks, latency_ms
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        run.start_title,
                        run.goal_title,
                        run.max_depth as i64,
                        run.top_n as i64,
                        run.path.is_some(),
                        path_json,
                        run.expansions as i64,
                        run.backtracks as i64,
                        run.latency_ms as i64,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Most recent search runs, newest first.
    pub async fn recent_search_runs(&self, limit: usize) -> Result<Vec<SearchRunRecord>> {
        let rows = self
            .db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT start_title, goal_title, max_depth, top_n, path_json,
                           expansions, backtracks, latency_ms, timestamp
                    FROM search_runs
                    ORDER BY run_id DESC
                    LIMIT ?1
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![limit as i64], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, i64>(6)?,
                            row.get::<_, i64>(7)?,
                            row.get::<_, Option<String>>(8)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(start, goal, depth, top_n, path_json, expansions, backtracks, latency, ts)| -> Result<SearchRunRecord> {
                let path = path_json
                    .map(|json| serde_json::from_str::<Vec<String>>(&json))
                    .transpose()?;
                Ok(SearchRunRecord {
                    start_title: start,
                    goal_title: goal,
                    max_depth: depth as usize,
                    top_n: top_n as usize,
                    path,
                    expansions: expansions as usize,
                    backtracks: backtracks as usize,
                    latency_ms: latency as u64,
                    timestamp: ts,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn upsert_page(&self, title: &str) -> Result<()> {
        let title = title.to_string();
        self.db.with_connection(move |conn| insert_page(conn, &title)).await
    }

    async fn upsert_link(&self, from: &str, to: &str) -> Result<()> {
        let from = from.to_string();
        let to = to.to_string();
        self.db
            .with_connection(move |conn| insert_link(conn, &from, &to))
            .await
    }

    async fn list_successors(&self, title: &str) -> Result<Vec<String>> {
        let title = title.to_string();
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT target_title FROM links WHERE source_title = ?1 ORDER BY rowid",
                )?;
                let successors = stmt
                    .query_map(params![title], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(WikipathError::Database)?;
                Ok(successors)
            })
            .await
    }

    async fn is_expanded(&self, title: &str) -> Result<bool> {
        let title = title.to_string();
        self.db
            .with_connection(move |conn| {
                let expanded: Option<Option<String>> = conn
                    .query_row(
                        "SELECT expanded_at FROM pages WHERE title = ?1",
                        params![title],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(matches!(expanded, Some(Some(_))))
            })
            .await
    }

    async fn mark_expanded(&self, title: &str) -> Result<()> {
        let title = title.to_string();
        self.db
            .with_connection(move |conn| {
                insert_page(conn, &title)?;
                mark_page_expanded(conn, &title)
            })
            .await
    }

    /// One transaction per expansion instead of one connection per link.
    async fn record_expansion(&self, title: &str, neighbors: &[String]) -> Result<()> {
        let title = title.to_string();
        let neighbors = neighbors.to_vec();
        self.db
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                insert_page(&tx, &title)?;
                for neighbor in &neighbors {
                    insert_link(&tx, &title, neighbor)?;
                }
                mark_page_expanded(&tx, &title)?;
                tx.commit()?;
                log::debug!("Stored {} links from {}", neighbors.len(), title);
                Ok(())
            })
            .await
    }
}
