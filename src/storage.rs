//! The storage module persists page specifications, together with the brief and
//! brand context they were generated from, in a local SQLite database.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::page::{BrandContext, Brief, PageSpecification, Section, sort_sections};

/// Document-store operations the page lifecycle depends on.
pub trait PageStore: Send + Sync {
    /// Inserts a freshly generated page at its current version, unpublished.
    ///
    /// # Errors
    ///
    /// Returns an error if the page id already exists or the write fails.
    fn save(
        &self,
        spec: &PageSpecification,
        brief: &Brief,
        brand_context: Option<&BrandContext>,
        user_id: Option<&str>,
    ) -> Result<StoredPage>;

    /// # Errors
    ///
    /// Returns an error if the read fails or the stored document is corrupt.
    fn get_by_id(&self, page_id: &str) -> Result<Option<StoredPage>>;

    /// Most recently updated pages first, optionally only those of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn list_summaries(&self, user_id: Option<&str>, limit: u32) -> Result<Vec<PageSummary>>;

    /// Replaces the sections of a page that is still at `expected_version`,
    /// bumping its version and update time in the same statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn update_sections(
        &self,
        page_id: &str,
        sections: &[Section],
        expected_version: u32,
    ) -> Result<SectionUpdate>;

    /// Sets the published flag and update time; the version is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn mark_published(&self, page_id: &str) -> Result<Option<StoredPage>>;

    /// Returns whether a page was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete_by_id(&self, page_id: &str) -> Result<bool>;
}

/// Outcome of a conditional section update.
#[derive(Debug)]
pub enum SectionUpdate {
    Updated(Box<StoredPage>),
    NotFound,
    /// The page moved on since the caller read it.
    VersionMismatch { current: u32 },
}

/// A persisted page with its generation inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPage {
    #[serde(flatten)]
    pub spec: PageSpecification,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub published: bool,
    pub user_context: Brief,
    #[serde(skip)]
    pub brand_context: Option<BrandContext>,
}

/// Listing entry for a stored page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub page_id: String,
    pub version: u32,
    pub section_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published: bool,
}

/// Storage provides SQLite-backed persistence for page specifications.
pub struct Storage {
    /// The underlying SQLite connection wrapped in Arc<Mutex<>> to make it thread-safe
    conn: Arc<Mutex<Connection>>,
}

const PAGE_COLUMNS: &str = "page_id, version, sections, created_at, updated_at, user_id, published, user_context, crawled_context";

impl Storage {
    /// Opens or creates the database at `database_path` (`:memory:` for a
    /// throwaway one).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .with_context(|| format!("Unable to open database {database_path}"))?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initializes the database schema with the pages table if it doesn't exist.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS pages (
                    page_id TEXT PRIMARY KEY,
                    version INTEGER NOT NULL,
                    sections TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    user_id TEXT NULL,
                    published INTEGER NOT NULL DEFAULT 0,
                    user_context TEXT NOT NULL,
                    crawled_context TEXT NULL
                );
                CREATE INDEX IF NOT EXISTS pages_updated_at ON pages (updated_at);
                CREATE INDEX IF NOT EXISTS pages_user_id ON pages (user_id);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("Storage mutex poisoned")
    }

    fn select_page(conn: &Connection, page_id: &str) -> Result<Option<StoredPage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE page_id = ?1"
        ))?;
        let page_row: Option<PageRow> = stmt
            .query_row([page_id], |row| {
                Ok(PageRow {
                    page_id: row.get(0)?,
                    version: row.get(1)?,
                    sections: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    user_id: row.get(5)?,
                    published: row.get(6)?,
                    user_context: row.get(7)?,
                    crawled_context: row.get(8)?,
                })
            })
            .optional()
            .map_err(|e| anyhow::anyhow!("Unable to fetch page row: {e}"))?;

        page_row.map(StoredPage::try_from).transpose()
    }

    fn current_version(conn: &Connection, page_id: &str) -> Result<Option<u32>> {
        let version: Option<u32> = conn
            .query_row(
                "SELECT version FROM pages WHERE page_id = ?1",
                [page_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(version)
    }
}

impl PageStore for Storage {
    fn save(
        &self,
        spec: &PageSpecification,
        brief: &Brief,
        brand_context: Option<&BrandContext>,
        user_id: Option<&str>,
    ) -> Result<StoredPage> {
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            &format!("INSERT INTO pages ({PAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                spec.page_id,
                spec.version,
                serde_json::to_string(&spec.sections)?,
                now.timestamp_millis(),
                now.timestamp_millis(),
                user_id,
                false,
                serde_json::to_string(brief)?,
                brand_context.map(BrandContext::as_str),
            ],
        )
        .with_context(|| format!("Unable to save page {}", spec.page_id))?;

        Self::select_page(&conn, &spec.page_id)?.context("Saved page is missing")
    }

    fn get_by_id(&self, page_id: &str) -> Result<Option<StoredPage>> {
        Self::select_page(&self.lock(), page_id)
    }

    fn list_summaries(&self, user_id: Option<&str>, limit: u32) -> Result<Vec<PageSummary>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT page_id, version, json_array_length(sections), created_at, updated_at, published
             FROM pages
             WHERE ?1 IS NULL OR user_id = ?1
             ORDER BY updated_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(SummaryRow {
                page_id: row.get(0)?,
                version: row.get(1)?,
                section_count: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                published: row.get(5)?,
            })
        })?;

        rows.map(|row| PageSummary::try_from(row?)).collect()
    }

    fn update_sections(
        &self,
        page_id: &str,
        sections: &[Section],
        expected_version: u32,
    ) -> Result<SectionUpdate> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE pages SET sections = ?1, version = version + 1, updated_at = ?2
             WHERE page_id = ?3 AND version = ?4",
            params![
                serde_json::to_string(sections)?,
                Utc::now().timestamp_millis(),
                page_id,
                expected_version
            ],
        )?;

        if changed == 0 {
            return Ok(match Self::current_version(&conn, page_id)? {
                Some(current) => SectionUpdate::VersionMismatch { current },
                None => SectionUpdate::NotFound,
            });
        }

        let page = Self::select_page(&conn, page_id)?.context("Updated page is missing")?;
        Ok(SectionUpdate::Updated(Box::new(page)))
    }

    fn mark_published(&self, page_id: &str) -> Result<Option<StoredPage>> {
        let conn = self.lock();
        conn.execute(
            "UPDATE pages SET published = 1, updated_at = ?1 WHERE page_id = ?2",
            params![Utc::now().timestamp_millis(), page_id],
        )?;

        Self::select_page(&conn, page_id)
    }

    fn delete_by_id(&self, page_id: &str) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM pages WHERE page_id = ?1", params![page_id])?;
        Ok(deleted > 0)
    }
}

/// Represents a page stored in the database
#[derive(Debug)]
struct PageRow {
    page_id: String,
    version: u32,
    sections: String,
    created_at: i64,
    updated_at: i64,
    user_id: Option<String>,
    published: bool,
    user_context: String,
    crawled_context: Option<String>,
}

#[derive(Debug)]
struct SummaryRow {
    page_id: String,
    version: u32,
    section_count: u32,
    created_at: i64,
    updated_at: i64,
    published: bool,
}

fn timestamp(millis: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .with_context(|| format!("Unable to initialize {column} from database"))
}

impl TryFrom<PageRow> for StoredPage {
    type Error = anyhow::Error;

    fn try_from(page_row: PageRow) -> Result<Self> {
        let mut sections: Vec<Section> = serde_json::from_str(&page_row.sections)
            .with_context(|| format!("Corrupt sections for page {}", page_row.page_id))?;
        sort_sections(&mut sections);

        Ok(StoredPage {
            created_at: timestamp(page_row.created_at, "created_at")?,
            updated_at: timestamp(page_row.updated_at, "updated_at")?,
            user_id: page_row.user_id,
            published: page_row.published,
            user_context: serde_json::from_str(&page_row.user_context)
                .context("Corrupt user context")?,
            brand_context: page_row.crawled_context.map(BrandContext::new),
            spec: PageSpecification {
                page_id: page_row.page_id,
                version: page_row.version,
                sections,
            },
        })
    }
}

impl TryFrom<SummaryRow> for PageSummary {
    type Error = anyhow::Error;

    fn try_from(row: SummaryRow) -> Result<Self> {
        Ok(PageSummary {
            page_id: row.page_id,
            version: row.version,
            section_count: row.section_count,
            created_at: timestamp(row.created_at, "created_at")?,
            updated_at: timestamp(row.updated_at, "updated_at")?,
            published: row.published,
        })
    }
}
