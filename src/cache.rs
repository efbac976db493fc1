//! Per-document SQLite cache. Classifications (with their page texts) are
//! keyed by document hash; extraction results additionally by the layout
//! hints they were computed under.

use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::PipelineError;
use crate::model::{
    Classification, ExtractionResult, PageText, ScriptClassification, Section, StrategyKind,
    TextBackend,
};
use crate::util::now_utc_string;

pub const CACHE_SCHEMA_VERSION: &str = "1";

/// What an extraction cache hit needs to answer without reclassifying.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub page_count: u32,
    pub script: ScriptClassification,
    pub backend: TextBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheCounts {
    pub documents: i64,
    pub pages: i64,
    pub extractions: i64,
    pub sections: i64,
}

pub struct ExtractionCache {
    connection: Connection,
}

impl ExtractionCache {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let connection = Connection::open(path)?;
        configure_connection(&connection)?;
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self, PipelineError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, PipelineError> {
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn schema_version(&self) -> Result<Option<String>> {
        self.connection
            .query_row(
                "SELECT value FROM metadata WHERE key = 'cache_schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read cache schema version")
    }

    pub fn store_classification(&mut self, classification: &Classification) -> Result<()> {
        let mut stored = classification.clone();
        let pages = std::mem::take(&mut stored.pages);
        let classification_json =
            serde_json::to_string(&stored).context("failed to serialize classification")?;
        let script_json =
            serde_json::to_string(&stored.script).context("failed to serialize script classification")?;

        let tx = self.connection.transaction()?;
        tx.execute(
            "
            INSERT INTO documents(doc_sha256, page_count, backend, script_json, classification_json, created_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(doc_sha256) DO UPDATE SET
              page_count=excluded.page_count,
              backend=excluded.backend,
              script_json=excluded.script_json,
              classification_json=excluded.classification_json
            ",
            params![
                &stored.doc_sha256,
                stored.page_count,
                stored.backend.as_str(),
                script_json,
                classification_json,
                now_utc_string()
            ],
        )?;
        tx.execute("DELETE FROM pages WHERE doc_sha256 = ?1", [&stored.doc_sha256])?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO pages(doc_sha256, page, text, image_count) VALUES(?1, ?2, ?3, ?4)",
            )?;
            for page in &pages {
                statement.execute(params![&stored.doc_sha256, page.page, &page.text, page.image_count])?;
            }
        }
        tx.commit()?;

        debug!(sha256 = %stored.doc_sha256, pages = pages.len(), "cached classification");
        Ok(())
    }

    pub fn load_classification(&self, doc_sha256: &str) -> Result<Option<Classification>> {
        let raw: Option<String> = self
            .connection
            .query_row(
                "SELECT classification_json FROM documents WHERE doc_sha256 = ?1",
                [doc_sha256],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut classification: Classification = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse cached classification for {doc_sha256}"))?;
        classification.pages = self.load_pages(doc_sha256)?;
        Ok(Some(classification))
    }

    pub fn load_pages(&self, doc_sha256: &str) -> Result<Vec<PageText>> {
        let mut statement = self.connection.prepare(
            "SELECT page, text, image_count FROM pages WHERE doc_sha256 = ?1 ORDER BY page",
        )?;
        let rows = statement.query_map([doc_sha256], |row| {
            Ok(PageText {
                page: row.get(0)?,
                text: row.get(1)?,
                image_count: row.get(2)?,
            })
        })?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?);
        }
        Ok(pages)
    }

    pub fn load_summary(&self, doc_sha256: &str) -> Result<Option<DocumentSummary>> {
        let row: Option<(u32, String, String)> = self
            .connection
            .query_row(
                "SELECT page_count, backend, script_json FROM documents WHERE doc_sha256 = ?1",
                [doc_sha256],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((page_count, backend, script_json)) = row else {
            return Ok(None);
        };

        let Some(backend) = TextBackend::parse(&backend) else {
            bail!("unknown cached backend '{backend}' for {doc_sha256}");
        };
        let script = serde_json::from_str(&script_json)
            .with_context(|| format!("failed to parse cached script classification for {doc_sha256}"))?;

        Ok(Some(DocumentSummary {
            page_count,
            script,
            backend,
        }))
    }

    pub fn store_extraction(
        &mut self,
        doc_sha256: &str,
        hints_key: &str,
        result: &ExtractionResult,
    ) -> Result<()> {
        let tx = self.connection.transaction()?;
        tx.execute(
            "
            INSERT INTO extractions(doc_sha256, hints_key, strategy, found, created_at)
            VALUES(?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(doc_sha256, hints_key) DO UPDATE SET
              strategy=excluded.strategy,
              found=excluded.found,
              created_at=excluded.created_at
            ",
            params![
                doc_sha256,
                hints_key,
                result.strategy.as_str(),
                result.found,
                now_utc_string()
            ],
        )?;
        tx.execute(
            "DELETE FROM sections WHERE doc_sha256 = ?1 AND hints_key = ?2",
            params![doc_sha256, hints_key],
        )?;
        {
            let mut statement = tx.prepare(
                "
                INSERT INTO sections(doc_sha256, hints_key, ordinal, section_id, title, level, page_start, page_end)
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )?;
            for (ordinal, section) in result.sections.iter().enumerate() {
                statement.execute(params![
                    doc_sha256,
                    hints_key,
                    ordinal as i64,
                    &section.id,
                    &section.title,
                    section.level,
                    section.page_start,
                    section.page_end
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            sha256 = %doc_sha256,
            hints = %hints_key,
            sections = result.sections.len(),
            "cached extraction"
        );
        Ok(())
    }

    pub fn load_extraction(&self, doc_sha256: &str, hints_key: &str) -> Result<Option<ExtractionResult>> {
        let header: Option<(String, bool)> = self
            .connection
            .query_row(
                "SELECT strategy, found FROM extractions WHERE doc_sha256 = ?1 AND hints_key = ?2",
                params![doc_sha256, hints_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((strategy, found)) = header else {
            return Ok(None);
        };
        let Some(strategy) = StrategyKind::parse(&strategy) else {
            bail!("unknown cached strategy '{strategy}' for {doc_sha256}");
        };

        let mut statement = self.connection.prepare(
            "
            SELECT section_id, title, level, page_start, page_end
            FROM sections
            WHERE doc_sha256 = ?1 AND hints_key = ?2
            ORDER BY ordinal
            ",
        )?;
        let rows = statement.query_map(params![doc_sha256, hints_key], |row| {
            Ok(Section {
                id: row.get(0)?,
                title: row.get(1)?,
                level: row.get(2)?,
                page_start: row.get(3)?,
                page_end: row.get(4)?,
            })
        })?;

        let mut sections = Vec::new();
        for row in rows {
            sections.push(row?);
        }

        Ok(Some(ExtractionResult {
            found,
            strategy,
            sections,
        }))
    }

    pub fn counts(&self) -> Result<CacheCounts> {
        Ok(CacheCounts {
            documents: count_rows(&self.connection, "SELECT COUNT(*) FROM documents")?,
            pages: count_rows(&self.connection, "SELECT COUNT(*) FROM pages")?,
            extractions: count_rows(&self.connection, "SELECT COUNT(*) FROM extractions")?,
            sections: count_rows(&self.connection, "SELECT COUNT(*) FROM sections")?,
        })
    }
}

fn configure_connection(connection: &Connection) -> rusqlite::Result<()> {
    connection.pragma_update(None, "journal_mode", "WAL")?;
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          doc_sha256 TEXT PRIMARY KEY,
          page_count INTEGER NOT NULL,
          backend TEXT NOT NULL,
          script_json TEXT NOT NULL,
          classification_json TEXT NOT NULL,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pages (
          doc_sha256 TEXT NOT NULL,
          page INTEGER NOT NULL,
          text TEXT NOT NULL,
          image_count INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (doc_sha256, page),
          FOREIGN KEY (doc_sha256) REFERENCES documents(doc_sha256) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS extractions (
          doc_sha256 TEXT NOT NULL,
          hints_key TEXT NOT NULL,
          strategy TEXT NOT NULL,
          found INTEGER NOT NULL,
          created_at TEXT NOT NULL,
          PRIMARY KEY (doc_sha256, hints_key)
        );

        CREATE TABLE IF NOT EXISTS sections (
          doc_sha256 TEXT NOT NULL,
          hints_key TEXT NOT NULL,
          ordinal INTEGER NOT NULL,
          section_id TEXT NOT NULL,
          title TEXT NOT NULL,
          level INTEGER NOT NULL,
          page_start INTEGER NOT NULL,
          page_end INTEGER NOT NULL,
          PRIMARY KEY (doc_sha256, hints_key, ordinal),
          FOREIGN KEY (doc_sha256, hints_key) REFERENCES extractions(doc_sha256, hints_key) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_sections_doc ON sections(doc_sha256);
        ",
    )?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('cache_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [CACHE_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('cache_created_at', ?1)
         ON CONFLICT(key) DO NOTHING",
        [now_utc_string()],
    )?;

    Ok(())
}

fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows: {sql}"))?;
    Ok(count)
}
