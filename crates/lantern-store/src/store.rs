use std::path::Path;

use rusqlite::{Connection, Row, params};

use lantern_core::{Message, validate_content};

use crate::error::{Result, StoreError};
use crate::schema;

/// Columns shared by every message read. All reads filter on
/// `approved = 1 AND deleted_at IS NULL` — unfiltered results are never
/// trusted, even though intake stamps `approved = 1` today.
const MESSAGE_COLUMNS: &str = "id, content, created_at, approved, deleted_at";

pub struct MessageStore {
    conn: Connection,
}

impl MessageStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection access for diagnostics and tests. Moderation tooling
    /// flips `approved`/`deleted_at` directly; the engine never does.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Reads (visibility-filtered) ---

    /// Up to `limit` visible messages with `id <= min(from_id, ceiling_id)`,
    /// descending by id. The historical scan's page read.
    pub fn range_backward(&self, from_id: i64, limit: usize, ceiling_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE id <= ?1 AND id <= ?2 AND approved = 1 AND deleted_at IS NULL
             ORDER BY id DESC LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![from_id, ceiling_id, limit as i64], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Visible messages with `id > watermark`, ascending. The new-message
    /// discovery read.
    pub fn above(&self, watermark: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE id > ?1 AND approved = 1 AND deleted_at IS NULL
             ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map([watermark], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Highest visible id, 0 when the store holds no visible messages.
    pub fn max_id(&self) -> Result<i64> {
        let max = self.conn.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM messages
             WHERE approved = 1 AND deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    pub fn count_visible(&self) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE approved = 1 AND deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // --- Intake ---

    /// Insert a new message stamped with the current time.
    pub fn insert(&self, content: &str) -> Result<Message> {
        self.insert_at(content, chrono::Utc::now().timestamp())
    }

    /// Insert with an explicit timestamp — seeding and tests backdate.
    pub fn insert_at(&self, content: &str, created_at: i64) -> Result<Message> {
        let content = validate_content(content).map_err(StoreError::ContentRejected)?;
        self.conn.execute(
            "INSERT INTO messages (content, created_at, approved) VALUES (?1, ?2, 1)",
            params![content, created_at],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "message inserted");
        Ok(Message {
            id,
            content: content.to_string(),
            created_at,
            approved: true,
            deleted_at: None,
        })
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
        approved: row.get::<_, i64>(3)? != 0,
        deleted_at: row.get(4)?,
    })
}
