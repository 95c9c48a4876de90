//! Embedding index over reference segments using SQLite and sqlite-vec.
//!
//! The index is built once at start-up from the chunked corpus and is
//! read-only on the request path. `build` fully replaces prior contents,
//! so a rebuild is indistinguishable from a fresh build.

use rusqlite::{Connection, params};
use sqlite_vec::sqlite3_vec_init;
use std::sync::Once;
use thiserror::Error;
use tracing::info;

use crate::chunker::Segment;
use crate::corpus::SourceTable;
use crate::embedder::{Embedder, EmbedderError};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Embedding(#[from] EmbedderError),
}

/// A segment returned from a similarity search.
#[derive(Debug, Clone)]
pub struct RetrievedSegment {
    pub segment_id: i64,
    pub source_table: SourceTable,
    pub record_position: usize,
    pub content: String,
    pub similarity: f64,
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// In-memory similarity index: one row plus one vector per segment.
pub struct EmbeddingIndex {
    conn: Connection,
    dimensions: usize,
}

impl EmbeddingIndex {
    /// Open an empty in-memory index for vectors of the given dimension.
    pub fn open(dimensions: usize) -> Result<Self, IndexError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;

        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        info!("sqlite-vec version: {vec_version}");

        let schema = format!(
            r#"
CREATE TABLE IF NOT EXISTS segments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_table TEXT NOT NULL,
    record_position INTEGER NOT NULL,
    chunk_position INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS vec_segments USING vec0(
    embedding FLOAT[{dimensions}]
);
"#
        );
        conn.execute_batch(&schema)?;

        Ok(Self { conn, dimensions })
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed segments.
    pub fn len(&self) -> Result<usize, IndexError> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM segments", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Embed and store all segments, replacing any prior contents.
    pub fn build(&mut self, segments: &[Segment], embedder: &dyn Embedder) -> Result<(), IndexError> {
        let texts: Vec<&str> = segments.iter().map(|s| s.content.as_str()).collect();
        let vectors = embedder.embed_batch(&texts)?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM vec_segments", [])?;
        tx.execute("DELETE FROM segments", [])?;

        for (segment, vector) in segments.iter().zip(&vectors) {
            tx.execute(
                "INSERT INTO segments (source_table, record_position, chunk_position, content) VALUES (?, ?, ?, ?)",
                params![
                    segment.source_table.as_str(),
                    segment.record_position as i64,
                    segment.chunk_position as i64,
                    segment.content
                ],
            )?;
            let segment_id = tx.last_insert_rowid();

            let blob = serialize_vector(vector);
            tx.execute(
                "INSERT INTO vec_segments (rowid, embedding) VALUES (?, ?)",
                params![segment_id, blob],
            )?;
        }

        tx.commit()?;
        info!("Indexed {} segments", segments.len());
        Ok(())
    }

    /// Return the `k` most similar segments for `query_text`, descending
    /// by cosine similarity, ties broken by insertion order.
    ///
    /// An empty index (or `k == 0`) returns an empty vec, never an error.
    pub fn search(
        &self,
        query_text: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedSegment>, IndexError> {
        if k == 0 || self.is_empty()? {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query_text)?;
        let blob = serialize_vector(&query_vector);

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                s.id,
                s.source_table,
                s.record_position,
                s.content,
                vec_distance_cosine(v.embedding, ?) as distance
            FROM vec_segments v
            JOIN segments s ON v.rowid = s.id
            ORDER BY distance ASC, s.id ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(params![blob, k as i64], |row| {
            let distance: f64 = row.get(4)?;
            let table: String = row.get(1)?;
            // Only known table names are ever inserted; anything else
            // means the storage was tampered with and must not be
            // relabeled as nutrition data.
            let source_table = SourceTable::parse(&table).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    format!("unknown source_table: {table}").into(),
                )
            })?;
            Ok(RetrievedSegment {
                segment_id: row.get(0)?,
                source_table,
                record_position: row.get::<_, i64>(2)? as usize,
                content: row.get(3)?,
                similarity: 1.0 - (distance / 2.0),
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }
}

/// Serialize a float32 vector into bytes for the vec0 virtual table.
fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

// ── Tests ────────────────────────────────────────────────────────────
