//! Turn scheduler.
//!
//! Pure function from (format, participants, completed AI turns) to the next
//! speaker/role/turn-number, or None when the format's phase sequence is
//! exhausted. Participants rotate through each phase in list order, so every
//! participant speaks once per phase before any phase advances.
//!
//! Only AI-attributed turns advance the counter — human turns interleave in
//! the transcript but never consume a scheduling slot.

use serde::Serialize;

use super::format::{DebateFormat, TurnRole, turn_sequence};

/// The scheduler's verdict for the upcoming slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTurn {
    pub character_id: String,
    pub role: TurnRole,
    /// 1-based, equal to `completed_ai_turns + 1`.
    pub turn_number: i64,
}

/// Compute the next turn. Returns None when the debate is complete, i.e. when
/// `completed_ai_turns >= participants.len() * phases.len()`.
pub fn next_turn(
    format: DebateFormat,
    participant_ids: &[String],
    completed_ai_turns: i64,
) -> Option<NextTurn> {
    let phases = turn_sequence(format);
    let n = participant_ids.len() as i64;
    debug_assert!(n >= 2, "a debate needs at least two participants");

    let phase_index = completed_ai_turns / n;
    let participant_index = completed_ai_turns % n;

    if phase_index >= phases.len() as i64 {
        return None;
    }

    Some(NextTurn {
        character_id: participant_ids[participant_index as usize].clone(),
        role: phases[phase_index as usize],
        turn_number: completed_ai_turns + 1,
    })
}
