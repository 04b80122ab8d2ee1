//! Working memory: a character's evolving mental state within one debate.
//!
//! One live instance per (character, debate), seeded deterministically at
//! debate creation and updated exactly once after each of that character's
//! turns via a structured extraction call. The merge policy is append-only
//! for list fields; emotional state, momentum, and strategy are replaced
//! wholesale on every update.

use crate::provider::{LLMRequest, Message, Provider, Tool};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A character's structured short-term state for one debate.
///
/// Serialized as camelCase JSON into the `character_memory` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingMemory {
    pub character_id: String,
    pub debate_id: String,
    /// Current thesis; replaced only when an update supplies a non-empty one.
    pub my_main_thesis: String,
    /// Append-only; insertion order is meaningful and repetition is allowed.
    pub key_arguments_made: Vec<String>,
    /// Arguments attributed to each opponent, append-only per key.
    pub opponent_arguments: BTreeMap<String, Vec<String>>,
    /// Opponent points not yet rebutted; resolved items are removed by exact
    /// text match, new ones appended.
    pub points_not_yet_addressed: Vec<String>,
    pub emotional_state: String,
    pub current_momentum: String,
    /// Tactical plan for the next turn, fully replaced each update.
    pub next_turn_strategy: String,
    pub concessions: Vec<String>,
    pub position_refinements: Vec<String>,
}

impl WorkingMemory {
    /// Deterministic neutral seed state, created once at debate creation.
    pub fn init(character_id: &str, debate_id: &str, topic: &str) -> Self {
        Self {
            character_id: character_id.to_string(),
            debate_id: debate_id.to_string(),
            my_main_thesis: format!("To be established — topic: \"{topic}\""),
            key_arguments_made: Vec::new(),
            opponent_arguments: BTreeMap::new(),
            points_not_yet_addressed: Vec::new(),
            emotional_state: "composed".to_string(),
            current_momentum: "neutral".to_string(),
            next_turn_strategy:
                "Begin with a clear opening statement that establishes my core position."
                    .to_string(),
            concessions: Vec::new(),
            position_refinements: Vec::new(),
        }
    }

    /// Apply an extraction result. Pure merge, no model involvement.
    pub fn apply(mut self, update: MemoryUpdate) -> Self {
        if let Some(thesis) = update.my_main_thesis
            && !thesis.is_empty()
        {
            self.my_main_thesis = thesis;
        }

        self.key_arguments_made.extend(update.new_key_arguments);

        for (opponent_id, args) in update.new_opponent_arguments {
            self.opponent_arguments
                .entry(opponent_id)
                .or_default()
                .extend(args);
        }

        let resolved = update.resolved_points;
        self.points_not_yet_addressed
            .retain(|p| !resolved.contains(p));
        self.points_not_yet_addressed
            .extend(update.new_points_not_addressed);

        self.emotional_state = update.emotional_state;
        self.current_momentum = update.current_momentum;
        self.next_turn_strategy = update.next_turn_strategy;

        self.concessions.extend(update.new_concessions);
        self.position_refinements
            .extend(update.new_position_refinements);

        self
    }
}

/// One turn's worth of extracted memory changes.
///
/// Emotional state, momentum, and strategy are required by the tool schema;
/// everything else defaults to "no change".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUpdate {
    #[serde(default)]
    pub my_main_thesis: Option<String>,
    #[serde(default)]
    pub new_key_arguments: Vec<String>,
    #[serde(default)]
    pub new_opponent_arguments: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub resolved_points: Vec<String>,
    #[serde(default)]
    pub new_points_not_addressed: Vec<String>,
    pub emotional_state: String,
    pub current_momentum: String,
    pub next_turn_strategy: String,
    #[serde(default)]
    pub new_concessions: Vec<String>,
    #[serde(default)]
    pub new_position_refinements: Vec<String>,
}

/// The forced-tool schema the extraction call must answer with.
pub fn update_memory_tool() -> Tool {
    Tool {
        name: "update_working_memory".to_string(),
        description: "Update the debater's working memory based on the latest turn text"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "myMainThesis": {
                    "type": "string",
                    "description": "The character's core thesis or position — update only if it has been refined or clarified in this turn"
                },
                "newKeyArguments": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "New arguments or points the character made in this turn"
                },
                "newOpponentArguments": {
                    "type": "object",
                    "description": "New arguments made by opponents, keyed by their character ID",
                    "additionalProperties": { "type": "array", "items": { "type": "string" } }
                },
                "resolvedPoints": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Points from pointsNotYetAddressed that were addressed in this turn"
                },
                "newPointsNotAddressed": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "New points raised by opponents that haven't been countered yet"
                },
                "emotionalState": {
                    "type": "string",
                    "description": "The character's current emotional tone: composed, frustrated, enthusiastic, defensive, confident, dismissive, etc."
                },
                "currentMomentum": {
                    "type": "string",
                    "description": "How the debate is going from this character's perspective: winning, losing, neutral, pivoting, escalating"
                },
                "nextTurnStrategy": {
                    "type": "string",
                    "description": "The character's tactical plan for their next turn"
                },
                "newConcessions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Points the character conceded to their opponents in this turn"
                },
                "newPositionRefinements": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Ways the character has nuanced or qualified their position"
                }
            },
            "required": ["emotionalState", "currentMomentum", "nextTurnStrategy"]
        }),
    }
}

/// Run the structured-extraction update for one completed turn.
///
/// Fail-soft: any provider failure, missing tool call, or malformed payload
/// returns the prior memory unchanged. A missed update degrades future
/// context quality but must never break the turn pipeline.
pub async fn update_working_memory(
    provider: &dyn Provider,
    model: &str,
    max_tokens: u32,
    character_id: &str,
    turn_text: &str,
    prior: WorkingMemory,
) -> WorkingMemory {
    let prior_json = match serde_json::to_string_pretty(&prior) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Working memory for {} not serializable: {}", character_id, e);
            return prior;
        }
    };

    let request = LLMRequest::new(
        model,
        vec![Message::user(format!(
            "Prior working memory:\n{prior_json}\n\nLatest turn text:\n{turn_text}\n\n\
             Extract the working memory updates."
        ))],
    )
    .with_system(format!(
        "You are analyzing a debate turn from the perspective of {character_id}. \
         Extract structured updates to their working memory. Be precise and analytical."
    ))
    .with_max_tokens(max_tokens)
    .with_forced_tool(update_memory_tool());

    let payload = match provider.extract(request).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            tracing::warn!(
                "Memory extraction for {} returned no tool call; keeping prior memory",
                character_id
            );
            return prior;
        }
        Err(e) => {
            tracing::warn!(
                "Memory extraction for {} failed: {}; keeping prior memory",
                character_id,
                e
            );
            return prior;
        }
    };

    match serde_json::from_value::<MemoryUpdate>(payload) {
        Ok(update) => prior.apply(update),
        Err(e) => {
            tracing::warn!(
                "Memory extraction for {} returned malformed payload: {}; keeping prior memory",
                character_id,
                e
            );
            return prior;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, MockResponse};

    fn base_update() -> MemoryUpdate {
        MemoryUpdate {
            my_main_thesis: None,
            new_key_arguments: Vec::new(),
            new_opponent_arguments: BTreeMap::new(),
            resolved_points: Vec::new(),
            new_points_not_addressed: Vec::new(),
            emotional_state: "confident".to_string(),
            current_momentum: "winning".to_string(),
            next_turn_strategy: "Press the advantage.".to_string(),
            new_concessions: Vec::new(),
            new_position_refinements: Vec::new(),
        }
    }

    #[test]
    fn test_init_is_deterministic_and_independent() {
        let a = WorkingMemory::init("socrates", "d1", "Is virtue teachable?");
        let b = WorkingMemory::init("socrates", "d1", "Is virtue teachable?");
        assert_eq!(a, b);
        assert!(a.my_main_thesis.contains("Is virtue teachable?"));
        assert_eq!(a.emotional_state, "composed");
        assert_eq!(a.current_momentum, "neutral");

        // Mutating one instance's collections must not leak into the other.
        let mut a = a;
        a.key_arguments_made.push("the unexamined life".into());
        a.opponent_arguments
            .entry("nietzsche".into())
            .or_default()
            .push("will to power".into());
        assert!(b.key_arguments_made.is_empty());
        assert!(b.opponent_arguments.is_empty());
    }

    #[test]
    fn test_apply_is_append_only_for_lists() {
        let prior = WorkingMemory::init("socrates", "d1", "t").apply(MemoryUpdate {
            new_key_arguments: vec!["first".into()],
            new_concessions: vec!["minor point".into()],
            ..base_update()
        });

        let mut update = base_update();
        update.new_key_arguments = vec!["second".into(), "second".into()];
        update.new_position_refinements = vec!["narrower claim".into()];

        let prior_args = prior.key_arguments_made.len();
        let prior_concessions = prior.concessions.len();
        let prior_refinements = prior.position_refinements.len();

        let next = prior.apply(update);
        assert!(next.key_arguments_made.len() >= prior_args);
        assert!(next.concessions.len() >= prior_concessions);
        assert!(next.position_refinements.len() >= prior_refinements);
        // Duplicates are preserved, not deduplicated.
        assert_eq!(
            next.key_arguments_made,
            vec!["first", "second", "second"]
        );
    }

    #[test]
    fn test_thesis_replaced_only_when_nonempty() {
        let prior = WorkingMemory::init("socrates", "d1", "t");
        let original_thesis = prior.my_main_thesis.clone();

        let kept = prior.clone().apply(MemoryUpdate {
            my_main_thesis: Some(String::new()),
            ..base_update()
        });
        assert_eq!(kept.my_main_thesis, original_thesis);

        let replaced = prior.apply(MemoryUpdate {
            my_main_thesis: Some("Virtue is knowledge.".into()),
            ..base_update()
        });
        assert_eq!(replaced.my_main_thesis, "Virtue is knowledge.");
    }

    #[test]
    fn test_resolved_points_removed_by_exact_match() {
        let mut prior = WorkingMemory::init("socrates", "d1", "t");
        prior.points_not_yet_addressed = vec![
            "define virtue".into(),
            "address the regress".into(),
            "Define Virtue".into(),
        ];

        let next = prior.apply(MemoryUpdate {
            resolved_points: vec!["define virtue".into()],
            new_points_not_addressed: vec!["the Meno paradox".into()],
            ..base_update()
        });

        // Exact match only: the differently-cased item survives.
        assert_eq!(
            next.points_not_yet_addressed,
            vec!["address the regress", "Define Virtue", "the Meno paradox"]
        );
    }

    #[test]
    fn test_opponent_arguments_append_per_key() {
        let mut prior = WorkingMemory::init("socrates", "d1", "t");
        prior
            .opponent_arguments
            .insert("nietzsche".into(), vec!["god is dead".into()]);

        let mut update = base_update();
        update
            .new_opponent_arguments
            .insert("nietzsche".into(), vec!["morality is herd instinct".into()]);
        update
            .new_opponent_arguments
            .insert("karl-marx".into(), vec!["material conditions".into()]);

        let next = prior.apply(update);
        assert_eq!(
            next.opponent_arguments["nietzsche"],
            vec!["god is dead", "morality is herd instinct"]
        );
        assert_eq!(
            next.opponent_arguments["karl-marx"],
            vec!["material conditions"]
        );
    }

    #[tokio::test]
    async fn test_update_applies_extraction_payload() {
        let provider = MockProvider::new().with_response(MockResponse::ToolCall(
            serde_json::json!({
                "myMainThesis": "Virtue is knowledge.",
                "newKeyArguments": ["No one errs willingly."],
                "emotionalState": "confident",
                "currentMomentum": "winning",
                "nextTurnStrategy": "Ask for a counterexample."
            }),
        ));

        let prior = WorkingMemory::init("socrates", "d1", "t");
        let next =
            update_working_memory(&provider, "mock-model", 1024, "socrates", "turn text", prior)
                .await;

        assert_eq!(next.my_main_thesis, "Virtue is knowledge.");
        assert_eq!(next.key_arguments_made, vec!["No one errs willingly."]);
        assert_eq!(next.emotional_state, "confident");
    }

    #[tokio::test]
    async fn test_update_is_noop_on_extraction_failure() {
        for scripted in [
            MockResponse::NoToolCall,
            MockResponse::Failure("model unavailable".into()),
            MockResponse::ToolCall(serde_json::json!({"emotionalState": "x"})),
        ] {
            let provider = MockProvider::new().with_response(scripted);
            let prior = WorkingMemory::init("socrates", "d1", "t");
            let next = update_working_memory(
                &provider,
                "mock-model",
                1024,
                "socrates",
                "turn text",
                prior.clone(),
            )
            .await;
            assert_eq!(next, prior);
        }
    }
}
