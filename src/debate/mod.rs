//! Debate domain core: format catalog and turn scheduling.

pub mod format;
pub mod scheduler;

pub use format::{DebateFormat, TurnRole, format_label, turn_instruction, turn_sequence};
pub use scheduler::{NextTurn, next_turn};
