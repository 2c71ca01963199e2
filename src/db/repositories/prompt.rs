//! Prompt repository
//!
//! Point lookups, the atomic hit counter and fork lineage for saved prompts.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::error::{constraint_of, Constraint, StoreError};
use crate::db::Database;

const PROMPT_COLUMNS: &str = "id, system_prompt, user_prompt, model, response, created_at, hits";

/// A stored prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptRecord {
    pub id: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
    pub hits: u64,
}

/// Lineage entry linking a forked prompt to its parent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkRecord {
    pub id: String,
    pub parent_id: String,
    pub forked_at: DateTime<Utc>,
}

/// Insert payload; the caller owns id generation
#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub id: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub response: String,
}

/// Persistence contract for prompts and their fork lineage
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Insert a new prompt. Fails with `DuplicateKey` if the id is taken.
    async fn save_prompt(&self, prompt: NewPrompt) -> Result<PromptRecord, StoreError>;

    /// Increment the hit counter and return the updated record.
    async fn get_prompt(&self, id: &str) -> Result<PromptRecord, StoreError>;

    /// Overwrite the stored response.
    async fn update_response(&self, id: &str, response: &str) -> Result<(), StoreError>;

    /// Record that `fork_id` was derived from `parent_id`.
    async fn create_fork(&self, fork_id: &str, parent_id: &str) -> Result<ForkRecord, StoreError>;

    /// Lineage entry for a prompt, if it is a fork.
    async fn get_fork(&self, id: &str) -> Result<Option<ForkRecord>, StoreError>;

    /// Newest prompts first. Does not count as a hit.
    async fn list_recent(&self, limit: usize) -> Result<Vec<PromptRecord>, StoreError>;

    /// Most fetched prompts first. Does not count as a hit.
    async fn list_popular(&self, limit: usize) -> Result<Vec<PromptRecord>, StoreError>;
}

pub struct PromptRepository {
    db: Database,
}

impl PromptRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn list_ordered(
        &self,
        order_by: &'static str,
        limit: usize,
    ) -> Result<Vec<PromptRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM prompts ORDER BY {} LIMIT ?1",
                    PROMPT_COLUMNS, order_by
                ))?;
                let prompts = stmt
                    .query_map(params![limit], map_prompt)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(prompts)
            })
            .await
    }
}

#[async_trait]
impl PromptStore for PromptRepository {
    async fn save_prompt(&self, prompt: NewPrompt) -> Result<PromptRecord, StoreError> {
        let record = PromptRecord {
            id: prompt.id,
            system_prompt: prompt.system_prompt,
            user_prompt: prompt.user_prompt,
            model: prompt.model,
            response: prompt.response,
            created_at: now(),
            hits: 0,
        };

        let record = self
            .db
            .with_conn(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO prompts (id, system_prompt, user_prompt, model, response, created_at, hits)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                    params![
                        record.id,
                        record.system_prompt,
                        record.user_prompt,
                        record.model,
                        record.response,
                        format_timestamp(&record.created_at),
                    ],
                );
                match inserted {
                    Ok(_) => Ok(record),
                    Err(e) if constraint_of(&e) == Some(Constraint::Unique) => {
                        Err(StoreError::DuplicateKey(record.id))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        tracing::debug!("Saved prompt: {}", record.id);
        Ok(record)
    }

    async fn get_prompt(&self, id: &str) -> Result<PromptRecord, StoreError> {
        let id = id.to_string();
        self.db
            .with_conn(move |conn| {
                // One statement: the increment and the read cannot interleave
                // with another fetch of the same row.
                let prompt = conn
                    .query_row(
                        &format!(
                            "UPDATE prompts SET hits = hits + 1 WHERE id = ?1 RETURNING {}",
                            PROMPT_COLUMNS
                        ),
                        params![id],
                        map_prompt,
                    )
                    .optional()?;
                prompt.ok_or(StoreError::NotFound(id))
            })
            .await
    }

    async fn update_response(&self, id: &str, response: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let response = response.to_string();
        self.db
            .with_conn(move |conn| {
                let changed = conn.execute(
                    "UPDATE prompts SET response = ?1 WHERE id = ?2",
                    params![response, id],
                )?;
                if changed == 0 {
                    return Err(StoreError::NotFound(id));
                }
                tracing::debug!("Updated response for prompt: {}", id);
                Ok(())
            })
            .await
    }

    async fn create_fork(&self, fork_id: &str, parent_id: &str) -> Result<ForkRecord, StoreError> {
        let fork = ForkRecord {
            id: fork_id.to_string(),
            parent_id: parent_id.to_string(),
            forked_at: now(),
        };

        self.db
            .with_conn(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO prompt_forks (id, parent_id, forked_at) VALUES (?1, ?2, ?3)",
                    params![fork.id, fork.parent_id, format_timestamp(&fork.forked_at)],
                );
                match inserted {
                    Ok(_) => {
                        tracing::debug!("Recorded fork {} -> {}", fork.parent_id, fork.id);
                        Ok(fork)
                    }
                    Err(e) => match constraint_of(&e) {
                        Some(Constraint::ForeignKey) => Err(StoreError::ForeignKeyViolation(
                            format!("fork {} references missing prompt", fork.id),
                        )),
                        Some(Constraint::Unique) => Err(StoreError::DuplicateKey(fork.id)),
                        None => Err(e.into()),
                    },
                }
            })
            .await
    }

    async fn get_fork(&self, id: &str) -> Result<Option<ForkRecord>, StoreError> {
        let id = id.to_string();
        self.db
            .with_conn(move |conn| {
                let fork = conn
                    .query_row(
                        "SELECT id, parent_id, forked_at FROM prompt_forks WHERE id = ?1",
                        params![id],
                        |row| {
                            Ok(ForkRecord {
                                id: row.get(0)?,
                                parent_id: row.get(1)?,
                                forked_at: parse_timestamp(row, 2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(fork)
            })
            .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<PromptRecord>, StoreError> {
        self.list_ordered("created_at DESC", limit).await
    }

    async fn list_popular(&self, limit: usize) -> Result<Vec<PromptRecord>, StoreError> {
        self.list_ordered("hits DESC, created_at DESC", limit).await
    }
}

fn map_prompt(row: &rusqlite::Row) -> rusqlite::Result<PromptRecord> {
    let hits: i64 = row.get(6)?;
    Ok(PromptRecord {
        id: row.get(0)?,
        system_prompt: row.get(1)?,
        user_prompt: row.get(2)?,
        model: row.get(3)?,
        response: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        created_at: parse_timestamp(row, 5)?,
        hits: u64::try_from(hits).unwrap_or(0),
    })
}

fn now() -> DateTime<Utc> {
    // Round-trip through the stored format so the returned record matches
    // what a later read produces.
    let stamp = format_timestamp(&Utc::now());
    DateTime::parse_from_rfc3339(&stamp)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Fixed-width UTC stamp: lexical order equals chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T09:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let (a, b) = (format_timestamp(&early), format_timestamp(&late));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
