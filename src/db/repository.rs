//! Repositories for debates, turns, and character memory.
//!
//! Structured fields (participant lists, working memory) are stored as JSON
//! text columns; enums are stored by their kebab-case identifiers.

use sqlx::SqlitePool;

use crate::db::models::{CharacterMemory, Debate, DebateTurn};
use crate::debate::{DebateFormat, TurnRole};
use crate::error::{AgoraError, Result};
use crate::memory::WorkingMemory;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ─── Debates ───

#[derive(Clone)]
pub struct DebateRepository {
    pool: SqlitePool,
}

impl DebateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        title: &str,
        topic: &str,
        format: DebateFormat,
        participants: &[String],
        user_participating: bool,
    ) -> Result<Debate> {
        let debate = Debate {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            topic: topic.to_string(),
            format,
            participants: participants.to_vec(),
            user_participating,
            created_at: now_rfc3339(),
        };
        let participants_json = serde_json::to_string(&debate.participants)
            .map_err(|e| AgoraError::InvalidRequest(e.to_string()))?;

        sqlx::query(
            "INSERT INTO debates (id, title, topic, format, participants, user_participating, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&debate.id)
        .bind(&debate.title)
        .bind(&debate.topic)
        .bind(debate.format.as_str())
        .bind(&participants_json)
        .bind(debate.user_participating)
        .bind(&debate.created_at)
        .execute(&self.pool)
        .await?;

        Ok(debate)
    }

    pub async fn get(&self, debate_id: &str) -> Result<Debate> {
        let row: Option<DebateRow> = sqlx::query_as(
            "SELECT id, title, topic, format, participants, user_participating, created_at
             FROM debates WHERE id = ?1",
        )
        .bind(debate_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => debate_from_row(row),
            None => Err(AgoraError::DebateNotFound(debate_id.to_string())),
        }
    }

    pub async fn list(&self) -> Result<Vec<Debate>> {
        let rows: Vec<DebateRow> = sqlx::query_as(
            "SELECT id, title, topic, format, participants, user_participating, created_at
             FROM debates ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(debate_from_row).collect()
    }
}

type DebateRow = (String, String, String, String, String, bool, String);

fn debate_from_row(
    (id, title, topic, format, participants, user_participating, created_at): DebateRow,
) -> Result<Debate> {
    let format = DebateFormat::parse(&format)
        .ok_or_else(|| AgoraError::InvalidRequest(format!("unknown format in db: {format}")))?;
    let participants: Vec<String> = serde_json::from_str(&participants)
        .map_err(|e| AgoraError::InvalidRequest(format!("bad participants JSON: {e}")))?;
    Ok(Debate {
        id,
        title,
        topic,
        format,
        participants,
        user_participating,
        created_at,
    })
}

// ─── Turns ───

#[derive(Clone)]
pub struct TurnRepository {
    pool: SqlitePool,
}

impl TurnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a turn, assigning the next turn number inside the insert
    /// statement itself. Two concurrent appends can never observe the same
    /// maximum: the unique index on (debate_id, turn_number) turns a lost
    /// race into a constraint error rather than a duplicate number.
    pub async fn append(
        &self,
        debate_id: &str,
        character_id: Option<&str>,
        role: TurnRole,
        content: &str,
    ) -> Result<DebateTurn> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = now_rfc3339();

        let (turn_number,): (i64,) = sqlx::query_as(
            "INSERT INTO debate_turns (id, debate_id, character_id, role, content, turn_number, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, COALESCE(MAX(turn_number), 0) + 1, ?6
             FROM debate_turns WHERE debate_id = ?2
             RETURNING turn_number",
        )
        .bind(&id)
        .bind(debate_id)
        .bind(character_id)
        .bind(role.as_str())
        .bind(content)
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(DebateTurn {
            id,
            debate_id: debate_id.to_string(),
            character_id: character_id.map(String::from),
            role,
            content: content.to_string(),
            turn_number,
            created_at,
        })
    }

    /// Full transcript, ordered by turn number ascending.
    pub async fn list_for_debate(&self, debate_id: &str) -> Result<Vec<DebateTurn>> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, debate_id, character_id, role, content, turn_number, created_at
             FROM debate_turns WHERE debate_id = ?1 ORDER BY turn_number ASC",
        )
        .bind(debate_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(turn_from_row).collect()
    }

    /// Turns spoken by one character, ordered by turn number ascending.
    pub async fn list_for_character(
        &self,
        debate_id: &str,
        character_id: &str,
    ) -> Result<Vec<DebateTurn>> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, debate_id, character_id, role, content, turn_number, created_at
             FROM debate_turns
             WHERE debate_id = ?1 AND character_id = ?2
             ORDER BY turn_number ASC",
        )
        .bind(debate_id)
        .bind(character_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(turn_from_row).collect()
    }

    /// Persona turns only; spectator turns never advance the schedule.
    pub async fn count_ai_turns(&self, debate_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM debate_turns
             WHERE debate_id = ?1 AND character_id IS NOT NULL",
        )
        .bind(debate_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// All turns, spectator turns included. This is the transcript length and
    /// therefore the number the next appended turn will receive, minus one.
    pub async fn count_turns(&self, debate_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM debate_turns WHERE debate_id = ?1",
        )
        .bind(debate_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_character_turns(
        &self,
        debate_id: &str,
        character_id: &str,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM debate_turns
             WHERE debate_id = ?1 AND character_id = ?2",
        )
        .bind(debate_id)
        .bind(character_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

type TurnRow = (String, String, Option<String>, String, String, i64, String);

fn turn_from_row(
    (id, debate_id, character_id, role, content, turn_number, created_at): TurnRow,
) -> Result<DebateTurn> {
    let role = TurnRole::parse(&role)
        .ok_or_else(|| AgoraError::InvalidRequest(format!("unknown turn role in db: {role}")))?;
    Ok(DebateTurn {
        id,
        debate_id,
        character_id,
        role,
        content,
        turn_number,
        created_at,
    })
}

// ─── Character memory ───

#[derive(Clone)]
pub struct MemoryRepository {
    pool: SqlitePool,
}

impl MemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        debate_id: &str,
        character_id: &str,
    ) -> Result<Option<CharacterMemory>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT working_memory, episodic_summary, updated_at
             FROM character_memory WHERE debate_id = ?1 AND character_id = ?2",
        )
        .bind(debate_id)
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((working_memory, episodic_summary, updated_at)) => {
                let working_memory: WorkingMemory = serde_json::from_str(&working_memory)
                    .map_err(|e| {
                        AgoraError::InvalidRequest(format!("bad working memory JSON: {e}"))
                    })?;
                Ok(Some(CharacterMemory {
                    debate_id: debate_id.to_string(),
                    character_id: character_id.to_string(),
                    working_memory,
                    episodic_summary,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace the working memory, leaving any episodic summary
    /// untouched.
    pub async fn save_working_memory(
        &self,
        debate_id: &str,
        character_id: &str,
        memory: &WorkingMemory,
    ) -> Result<()> {
        let json = serde_json::to_string(memory)
            .map_err(|e| AgoraError::InvalidRequest(e.to_string()))?;

        sqlx::query(
            "INSERT INTO character_memory (debate_id, character_id, working_memory, episodic_summary, updated_at)
             VALUES (?1, ?2, ?3, '', ?4)
             ON CONFLICT(debate_id, character_id)
             DO UPDATE SET working_memory = ?3, updated_at = ?4",
        )
        .bind(debate_id)
        .bind(character_id)
        .bind(&json)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the episodic summary wholesale, leaving working memory
    /// untouched. Memory rows are seeded at debate creation, so a missing row
    /// here is a logic error worth surfacing in the logs.
    pub async fn save_episodic_summary(
        &self,
        debate_id: &str,
        character_id: &str,
        summary: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE character_memory SET episodic_summary = ?3, updated_at = ?4
             WHERE debate_id = ?1 AND character_id = ?2",
        )
        .bind(debate_id)
        .bind(character_id)
        .bind(summary)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                "No memory row for {} in debate {}; episodic summary dropped",
                character_id,
                debate_id
            );
        }
        Ok(())
    }
}
