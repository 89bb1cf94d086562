use serde::{Deserialize, Serialize};

/// Maximum content length in characters, enforced at intake.
pub const MAX_CONTENT_CHARS: usize = 280;

/// A single submitted message. Immutable once admitted to the store —
/// the engine reads messages, it never mutates or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonically increasing store id, the sole ordering key.
    pub id: i64,
    pub content: String,
    /// Unix seconds, UTC.
    pub created_at: i64,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Message {
    /// Only approved, non-deleted messages are eligible anywhere in the
    /// engine. Staleness after admission to the working set is tolerated.
    pub fn is_visible(&self) -> bool {
        self.approved && self.deleted_at.is_none()
    }

    /// Content length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Validate raw submission content: trimmed, non-empty, at most
/// [`MAX_CONTENT_CHARS`] characters. Returns the trimmed slice.
pub fn validate_content(raw: &str) -> Result<&str, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("content must not be empty".to_string());
    }
    let chars = trimmed.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(format!(
            "content is {chars} characters, maximum is {MAX_CONTENT_CHARS}"
        ));
    }
    Ok(trimmed)
}
