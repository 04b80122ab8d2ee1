//! Turn execution engine.
//!
//! `run_turn` validates eligibility synchronously, then hands the expensive
//! part (model streaming, persistence, memory maintenance) to a detached
//! background task. Deltas are forwarded to the caller over a channel, but
//! the pipeline does not depend on anyone listening: a disconnected client
//! never aborts a turn that the model has already started speaking.

use std::sync::Arc;

use sqlx::SqlitePool;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::db::models::{Debate, DebateTurn};
use crate::db::{DebateRepository, MemoryRepository, TurnRepository};
use crate::debate::{next_turn, DebateFormat, NextTurn, TurnRole};
use crate::error::{AgoraError, ConflictKind, Result};
use crate::memory::{compress, should_compress, update_working_memory, ContextAssembler, WorkingMemory};
use crate::persona;
use crate::provider::{LLMRequest, Message, Provider, StreamEvent, Tool};

/// Events emitted while a turn executes.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Delta { text: String },
    Error { message: String },
    Done,
}

#[derive(Clone)]
pub struct TurnEngine {
    debates: DebateRepository,
    turns: TurnRepository,
    memories: MemoryRepository,
    provider: Arc<dyn Provider>,
    generation_model: String,
    extraction_model: String,
    recent_turns_window: usize,
    compression_threshold: i64,
    turn_max_tokens: u32,
    extraction_max_tokens: u32,
    summary_max_tokens: u32,
    topics_max_tokens: u32,
}

/// The forced-tool schema a topic-suggestion call must answer with.
fn suggest_topics_tool() -> Tool {
    Tool {
        name: "suggest_topics".to_string(),
        description: "Return 5 suggested debate topics".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "topics": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Five debate topic suggestions"
                }
            },
            "required": ["topics"]
        }),
    }
}

impl TurnEngine {
    pub fn new(pool: SqlitePool, provider: Arc<dyn Provider>, config: &Config) -> Self {
        Self {
            debates: DebateRepository::new(pool.clone()),
            turns: TurnRepository::new(pool.clone()),
            memories: MemoryRepository::new(pool),
            provider,
            generation_model: config.provider.generation_model.clone(),
            extraction_model: config.provider.extraction_model.clone(),
            recent_turns_window: config.engine.recent_turns_window,
            compression_threshold: config.engine.compression_threshold,
            turn_max_tokens: config.engine.turn_max_tokens,
            extraction_max_tokens: config.engine.extraction_max_tokens,
            summary_max_tokens: config.engine.summary_max_tokens,
            topics_max_tokens: config.engine.topics_max_tokens,
        }
    }

    /// Create a debate and seed working memory for every participant.
    pub async fn create_debate(
        &self,
        topic: &str,
        format: DebateFormat,
        participants: &[String],
        user_participating: bool,
    ) -> Result<Debate> {
        if topic.trim().is_empty() {
            return Err(AgoraError::InvalidRequest("topic must not be empty".into()));
        }
        if participants.len() < 2 || participants.len() > 4 {
            return Err(AgoraError::InvalidRequest(
                "a debate needs between 2 and 4 participants".into(),
            ));
        }
        persona::validate_roster(participants)?;

        let names: Vec<&str> = participants
            .iter()
            .map(|id| persona::lookup(id).map(|p| p.name))
            .collect::<Result<_>>()?;
        let title = format!("{}: {}", names.join(" vs. "), topic);

        let debate = self
            .debates
            .create(&title, topic, format, participants, user_participating)
            .await?;
        for character_id in participants {
            let memory = WorkingMemory::init(character_id, &debate.id, topic);
            self.memories
                .save_working_memory(&debate.id, character_id, &memory)
                .await?;
        }
        tracing::info!(
            "Created debate {} ({:?}, {} participants)",
            debate.id,
            format,
            participants.len()
        );
        Ok(debate)
    }

    pub async fn get_debate(&self, debate_id: &str) -> Result<Debate> {
        self.debates.get(debate_id).await
    }

    pub async fn list_debates(&self) -> Result<Vec<Debate>> {
        self.debates.list().await
    }

    pub async fn transcript(&self, debate_id: &str) -> Result<Vec<DebateTurn>> {
        self.debates.get(debate_id).await?;
        self.turns.list_for_debate(debate_id).await
    }

    /// Who speaks next, if the schedule has anyone left.
    ///
    /// The schedule itself only counts persona turns, but the advertised turn
    /// number is a transcript position, and spectator turns occupy positions
    /// too. Report the number the next appended turn will actually receive.
    pub async fn peek_next_turn(&self, debate_id: &str) -> Result<Option<NextTurn>> {
        let debate = self.debates.get(debate_id).await?;
        let completed = self.turns.count_ai_turns(debate_id).await?;
        let Some(mut next) = next_turn(debate.format, &debate.participants, completed) else {
            return Ok(None);
        };
        next.turn_number = self.turns.count_turns(debate_id).await? + 1;
        Ok(Some(next))
    }

    /// Ask the model for five debate topics where the given personas would
    /// genuinely clash, grounded in their registry profiles.
    pub async fn suggest_topics(&self, character_ids: &[String]) -> Result<Vec<String>> {
        if character_ids.len() < 2 {
            return Err(AgoraError::InvalidRequest(
                "characterIds must be an array of at least 2 IDs".into(),
            ));
        }
        let personas = character_ids
            .iter()
            .map(|id| persona::lookup(id))
            .collect::<Result<Vec<_>>>()?;

        let profiles = personas
            .iter()
            .map(|p| format!("**{}**:\n{}", p.name, p.knowledge))
            .collect::<Vec<_>>()
            .join("\n\n");
        let names = personas
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
            .join(" and ");

        let request = LLMRequest::new(
            &self.extraction_model,
            vec![Message::user(format!(
                "Suggest 5 compelling debate topics for {names}.\n\n\
                 Character profiles:\n{profiles}\n\n\
                 Return exactly 5 specific, argumentative topics where these thinkers \
                 would genuinely clash. Phrase them as provocative questions or resolutions."
            ))],
        )
        .with_system(
            "You are an expert in intellectual history who specializes in identifying \
             the most thought-provoking and substantive debate topics between \
             historical and contemporary thinkers.",
        )
        .with_max_tokens(self.topics_max_tokens)
        .with_forced_tool(suggest_topics_tool());

        let payload = self
            .provider
            .extract(request)
            .await?
            .ok_or(AgoraError::TopicGeneration)?;
        let mut topics: Vec<String> = serde_json::from_value(
            payload
                .get("topics")
                .cloned()
                .ok_or(AgoraError::TopicGeneration)?,
        )
        .map_err(|_| AgoraError::TopicGeneration)?;
        topics.truncate(5);
        Ok(topics)
    }

    /// Record a spectator interjection. It lands in the transcript (and thus
    /// in every character's context window) but never advances the schedule.
    pub async fn add_user_turn(&self, debate_id: &str, content: &str) -> Result<DebateTurn> {
        if content.trim().is_empty() {
            return Err(AgoraError::InvalidRequest("content must not be empty".into()));
        }
        let debate = self.debates.get(debate_id).await?;
        if !debate.user_participating {
            return Err(AgoraError::InvalidRequest(
                "this debate was created without user participation".into(),
            ));
        }
        self.turns
            .append(debate_id, None, TurnRole::Argument, content)
            .await
    }

    /// Execute one turn for `character_id`.
    ///
    /// Validation failures (unknown debate, unknown character, out-of-order
    /// request, completed debate) are returned synchronously before any model
    /// call. On success the returned receiver yields `Delta` events followed
    /// by a single `Done`, or an `Error` if the stream breaks mid-turn — in
    /// which case nothing is persisted and the schedule is unchanged.
    pub async fn run_turn(
        &self,
        debate_id: &str,
        character_id: &str,
    ) -> Result<mpsc::Receiver<TurnEvent>> {
        let debate = self.debates.get(debate_id).await?;
        let persona = persona::lookup(character_id)?;

        let completed = self.turns.count_ai_turns(debate_id).await?;
        let next = next_turn(debate.format, &debate.participants, completed)
            .ok_or(AgoraError::Conflict(ConflictKind::DebateComplete))?;
        if next.character_id != character_id {
            return Err(AgoraError::Conflict(ConflictKind::NotYourTurn {
                expected: next.character_id,
                requested: character_id.to_string(),
            }));
        }

        let (working_memory, episodic_summary) =
            match self.memories.get(debate_id, character_id).await? {
                Some(row) => (row.working_memory, row.episodic_summary),
                // Debates created before seeding existed; recover in place.
                None => {
                    let memory = WorkingMemory::init(character_id, debate_id, &debate.topic);
                    self.memories
                        .save_working_memory(debate_id, character_id, &memory)
                        .await?;
                    (memory, String::new())
                }
            };

        let all_turns = self.turns.list_for_debate(debate_id).await?;
        let context = ContextAssembler::new(self.recent_turns_window).assemble(
            &debate,
            persona,
            next.role,
            &working_memory,
            &episodic_summary,
            &all_turns,
        );

        let request = LLMRequest::new(&self.generation_model, context.messages)
            .with_system(context.system)
            .with_max_tokens(self.turn_max_tokens);

        let (tx, rx) = mpsc::channel(64);
        let engine = self.clone();
        let debate_id = debate_id.to_string();
        let character_id = character_id.to_string();
        let role = next.role;

        tokio::spawn(async move {
            engine
                .execute_turn(debate_id, character_id, role, request, working_memory, tx)
                .await;
        });

        Ok(rx)
    }

    async fn execute_turn(
        &self,
        debate_id: String,
        character_id: String,
        role: TurnRole,
        request: LLMRequest,
        working_memory: WorkingMemory,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let mut stream = match self.provider.stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Turn for {} failed to start: {}", character_id, e);
                let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
                return;
            }
        };

        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::TextDelta { text: delta }) => {
                    text.push_str(&delta);
                    // A gone listener is not a reason to stop the turn.
                    let _ = tx.send(TurnEvent::Delta { text: delta }).await;
                }
                Ok(StreamEvent::MessageStop) => break,
                Ok(StreamEvent::Ping) => {}
                Err(e) => {
                    tracing::error!(
                        "Stream broke mid-turn for {} in debate {}: {}",
                        character_id,
                        debate_id,
                        e
                    );
                    let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
                    return;
                }
            }
        }

        if text.is_empty() {
            tracing::error!("Model produced no text for {} in {}", character_id, debate_id);
            let _ = tx
                .send(TurnEvent::Error { message: "model produced no text".into() })
                .await;
            return;
        }

        let turn = match self
            .turns
            .append(&debate_id, Some(&character_id), role, &text)
            .await
        {
            Ok(turn) => turn,
            Err(e) => {
                tracing::error!("Failed to persist turn for {}: {}", character_id, e);
                let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
                return;
            }
        };
        tracing::info!(
            "Persisted turn {} ({:?}) for {} in debate {}",
            turn.turn_number,
            role,
            character_id,
            debate_id
        );

        // Memory maintenance is fail-soft from here on: the turn is already
        // part of the record, and a missed update only costs context quality.
        let updated = update_working_memory(
            self.provider.as_ref(),
            &self.extraction_model,
            self.extraction_max_tokens,
            &character_id,
            &text,
            working_memory,
        )
        .await;
        if let Err(e) = self
            .memories
            .save_working_memory(&debate_id, &character_id, &updated)
            .await
        {
            tracing::warn!("Failed to save working memory for {}: {}", character_id, e);
        }

        self.maybe_compress(&debate_id, &character_id).await;

        let _ = tx.send(TurnEvent::Done).await;
    }

    async fn maybe_compress(&self, debate_id: &str, character_id: &str) {
        let own_count = match self.turns.count_character_turns(debate_id, character_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Compression check failed for {}: {}", character_id, e);
                return;
            }
        };
        if !should_compress(own_count, self.compression_threshold) {
            return;
        }

        let own_turns = match self.turns.list_for_character(debate_id, character_id).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!("Compression load failed for {}: {}", character_id, e);
                return;
            }
        };
        let existing = match self.memories.get(debate_id, character_id).await {
            Ok(Some(row)) => row.episodic_summary,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!("Compression read failed for {}: {}", character_id, e);
                return;
            }
        };

        let summary = compress(
            self.provider.as_ref(),
            &self.extraction_model,
            self.summary_max_tokens,
            character_id,
            &own_turns,
            existing,
        )
        .await;
        if let Err(e) = self
            .memories
            .save_episodic_summary(debate_id, character_id, &summary)
            .await
        {
            tracing::warn!("Failed to save episodic summary for {}: {}", character_id, e);
        }
    }
}
