//! Episodic memory compression.
//!
//! Once a character has produced enough turns, their full turn history is
//! collapsed into a short first-person narrative summary. The summary is
//! replaced wholesale on every compression — each run re-synthesizes from the
//! previous summary plus the turns being incorporated. This is what keeps
//! per-turn model input bounded as a debate grows arbitrarily long.

use crate::db::models::DebateTurn;
use crate::provider::{LLMRequest, Message, Provider};

/// A character's own-turn count must exceed this before compression runs.
pub const COMPRESSION_THRESHOLD: i64 = 4;

/// True once `character_turn_count` strictly exceeds the threshold.
pub fn should_compress(character_turn_count: i64, threshold: i64) -> bool {
    character_turn_count > threshold
}

/// Re-synthesize the episodic summary from the existing one plus the turns to
/// incorporate. With no turns to compress this is an idempotent no-op and the
/// existing summary is returned byte-for-byte.
///
/// Fail-soft: a provider failure keeps the existing summary.
pub async fn compress(
    provider: &dyn Provider,
    model: &str,
    max_tokens: u32,
    character_id: &str,
    turns_to_compress: &[DebateTurn],
    existing_summary: String,
) -> String {
    if turns_to_compress.is_empty() {
        return existing_summary;
    }

    let turns_text = turns_to_compress
        .iter()
        .map(|t| {
            format!(
                "[Turn {}] {}: {}",
                t.turn_number,
                t.character_id.as_deref().unwrap_or("User"),
                t.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::new();
    if !existing_summary.is_empty() {
        prompt.push_str(&format!("Existing summary:\n{existing_summary}\n\n"));
    }
    prompt.push_str(&format!(
        "Turns to incorporate:\n{turns_text}\n\nWrite an updated first-person summary."
    ));

    let request = LLMRequest::new(model, vec![Message::user(prompt)])
        .with_system(format!(
            "You are writing a compressed memory summary from the perspective of \
             {character_id}. Write in first person as that historical figure would remember \
             the debate so far. Focus on key arguments, emotional dynamics, and strategic \
             observations. Be concise — 2–4 sentences."
        ))
        .with_max_tokens(max_tokens);

    match provider.complete(request).await {
        Ok(response) => {
            let text = response.text();
            if text.is_empty() {
                tracing::warn!(
                    "Episodic compression for {} produced no text; keeping existing summary",
                    character_id
                );
                existing_summary
            } else {
                text
            }
        }
        Err(e) => {
            tracing::warn!(
                "Episodic compression for {} failed: {}; keeping existing summary",
                character_id,
                e
            );
            existing_summary
        }
    }
}
