//! Database models for debates, turns, and character memory.

use serde::{Deserialize, Serialize};

use crate::debate::{DebateFormat, TurnRole};
use crate::memory::WorkingMemory;

/// A debate between registered personas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debate {
    pub id: String,
    /// Display title derived at creation, e.g. "Socrates vs. Nietzsche: ...".
    pub title: String,
    pub topic: String,
    pub format: DebateFormat,
    /// Character ids in speaking order.
    pub participants: Vec<String>,
    /// Whether a human spectator may inject turns into this debate.
    pub user_participating: bool,
    pub created_at: String,
}

/// One completed turn in a debate's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTurn {
    pub id: String,
    pub debate_id: String,
    /// None for turns injected by a human spectator.
    pub character_id: Option<String>,
    pub role: TurnRole,
    pub content: String,
    pub turn_number: i64,
    pub created_at: String,
}

/// Per-character memory state within one debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterMemory {
    pub debate_id: String,
    pub character_id: String,
    pub working_memory: WorkingMemory,
    pub episodic_summary: String,
    pub updated_at: String,
}
