//! Per-turn context assembly.
//!
//! Every turn is built against a bounded window: persona knowledge, the
//! character's working memory, the episodic summary of everything older, and
//! only the most recent turns verbatim. The assembled size stays roughly
//! constant no matter how long the debate runs.

use crate::db::models::{Debate, DebateTurn};
use crate::debate::{format_label, turn_instruction, TurnRole};
use crate::memory::WorkingMemory;
use crate::persona::Persona;
use crate::provider::{Message, Role};

/// Number of most-recent turns included verbatim in the message window.
pub const RECENT_TURNS_WINDOW: usize = 6;

/// Everything a turn-generation request needs from the debate state.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub system: String,
    pub messages: Vec<Message>,
}

pub struct ContextAssembler {
    recent_turns_window: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            recent_turns_window: RECENT_TURNS_WINDOW,
        }
    }
}

impl ContextAssembler {
    pub fn new(recent_turns_window: usize) -> Self {
        Self {
            recent_turns_window,
        }
    }

    /// Build the system prompt and message window for one turn.
    ///
    /// `all_turns` must be ordered by turn number ascending. The last
    /// `recent_turns_window` of them appear verbatim; older turns are
    /// represented only through `episodic_summary`.
    pub fn assemble(
        &self,
        debate: &Debate,
        persona: &Persona,
        role: TurnRole,
        working_memory: &WorkingMemory,
        episodic_summary: &str,
        all_turns: &[DebateTurn],
    ) -> AssembledContext {
        let system = self.build_system_prompt(debate, persona, working_memory, episodic_summary);

        let recent_start = all_turns.len().saturating_sub(self.recent_turns_window);
        let recent = &all_turns[recent_start..];

        let opponent_names: Vec<String> = debate
            .participants
            .iter()
            .filter(|id| id.as_str() != persona.id)
            .map(|id| display_name(id))
            .collect();
        let instruction =
            turn_instruction(debate.format, role, persona.name, &opponent_names);

        let mut messages: Vec<Message> = Vec::new();
        for turn in recent {
            let is_own = turn.character_id.as_deref() == Some(persona.id);
            let (role, text) = if is_own {
                (Role::Assistant, turn.content.clone())
            } else {
                // Transcript prefixes carry the raw speaker id, matching the
                // keys used in working memory's opponent sections.
                let speaker = turn.character_id.as_deref().unwrap_or("User");
                (
                    Role::User,
                    format!("[Turn {}] {}: {}", turn.turn_number, speaker, turn.content),
                )
            };
            // Adjacent same-role messages are merged; the wire format requires
            // strict user/assistant alternation.
            match messages.last_mut() {
                Some(last) if last.role == role => {
                    let merged = format!("{}\n\n{}", last.text(), text);
                    *last = Message {
                        role,
                        content: vec![crate::provider::ContentBlock::Text { text: merged }],
                    };
                }
                _ => messages.push(match role {
                    Role::User => Message::user(text),
                    Role::Assistant => Message::assistant(text),
                }),
            }
        }

        // The turn instruction rides on the trailing user message so the model
        // sees it last.
        match messages.last_mut() {
            Some(last) if last.role == Role::User => {
                let combined = format!("{}\n\n---\n{}", last.text(), instruction);
                *last = Message::user(combined);
            }
            _ => messages.push(Message::user(instruction)),
        }

        AssembledContext { system, messages }
    }

    fn build_system_prompt(
        &self,
        debate: &Debate,
        persona: &Persona,
        working_memory: &WorkingMemory,
        episodic_summary: &str,
    ) -> String {
        let mut sections: Vec<String> = Vec::new();

        sections.push(format!(
            "You are {}. Speak and reason exactly as this historical figure would, drawing on \
             their documented views, style of argument, and manner of speech. Do not break \
             character or acknowledge that you are an AI.",
            persona.name
        ));

        sections.push(format!("## Your Life and Knowledge\n\n{}", persona.knowledge));

        sections.push(format!(
            "## Debate Context\n\nTopic: \"{}\"\nFormat: {}",
            debate.topic,
            format_label(debate.format)
        ));

        sections.push(format!(
            "## Your Working Memory\n\n{}",
            render_working_memory(working_memory)
        ));

        if !episodic_summary.is_empty() {
            sections.push(format!(
                "## Earlier in This Debate (Your Memory)\n\n{episodic_summary}"
            ));
        }

        sections.push(
            "## Instructions\n\nStay in character at all times. Engage directly with your \
             opponents' arguments. Keep your response focused and substantive."
                .to_string(),
        );

        sections.join("\n\n")
    }
}

/// Render working memory as markdown, skipping empty fields.
fn render_working_memory(memory: &WorkingMemory) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !memory.my_main_thesis.is_empty() {
        lines.push(format!("**My thesis:** {}", memory.my_main_thesis));
    }
    if !memory.key_arguments_made.is_empty() {
        lines.push(format!(
            "**Arguments I've made:**\n{}",
            bullet_list(&memory.key_arguments_made)
        ));
    }
    if !memory.opponent_arguments.is_empty() {
        let mut section = String::from("**Opponent arguments:**");
        for (opponent, arguments) in &memory.opponent_arguments {
            section.push_str(&format!("\n- {}:\n{}", opponent, indented_list(arguments)));
        }
        lines.push(section);
    }
    if !memory.points_not_yet_addressed.is_empty() {
        lines.push(format!(
            "**Points I should address:**\n{}",
            bullet_list(&memory.points_not_yet_addressed)
        ));
    }
    if !memory.emotional_state.is_empty() {
        lines.push(format!("**My emotional state:** {}", memory.emotional_state));
    }
    if !memory.current_momentum.is_empty() {
        lines.push(format!("**Momentum:** {}", memory.current_momentum));
    }
    if !memory.next_turn_strategy.is_empty() {
        lines.push(format!("**My strategy:** {}", memory.next_turn_strategy));
    }
    if !memory.concessions.is_empty() {
        lines.push(format!(
            "**Concessions I've made:**\n{}",
            bullet_list(&memory.concessions)
        ));
    }
    if !memory.position_refinements.is_empty() {
        lines.push(format!(
            "**How my position has evolved:**\n{}",
            bullet_list(&memory.position_refinements)
        ));
    }

    if lines.is_empty() {
        "(no working memory yet)".to_string()
    } else {
        lines.join("\n")
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indented_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Display name for the turn instruction; unregistered ids (never expected
/// past creation validation) fall back to the raw id rather than failing a
/// render.
fn display_name(character_id: &str) -> String {
    crate::persona::lookup(character_id)
        .map(|p| p.name.to_string())
        .unwrap_or_else(|_| character_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::DebateFormat;
    use crate::memory::WorkingMemory;

    fn test_debate() -> Debate {
        Debate {
            id: "d1".to_string(),
            title: "Socrates vs. Friedrich Nietzsche: Is virtue teachable?".to_string(),
            topic: "Is virtue teachable?".to_string(),
            format: DebateFormat::Oxford,
            participants: vec!["socrates".to_string(), "nietzsche".to_string()],
            user_participating: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn turn(number: i64, character_id: Option<&str>, content: &str) -> DebateTurn {
        DebateTurn {
            id: format!("t{number}"),
            debate_id: "d1".to_string(),
            character_id: character_id.map(String::from),
            role: TurnRole::Argument,
            content: content.to_string(),
            turn_number: number,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn assemble_for(turns: &[DebateTurn]) -> AssembledContext {
        let debate = test_debate();
        let persona = crate::persona::lookup("socrates").unwrap();
        let memory = WorkingMemory::init("socrates", "d1", &debate.topic);
        ContextAssembler::default().assemble(
            &debate,
            persona,
            TurnRole::Argument,
            &memory,
            "",
            turns,
        )
    }

    #[test]
    fn test_system_prompt_sections() {
        let ctx = assemble_for(&[]);
        assert!(ctx.system.starts_with("You are Socrates."));
        assert!(ctx.system.contains("## Your Life and Knowledge"));
        assert!(ctx.system.contains("Topic: \"Is virtue teachable?\""));
        assert!(ctx.system.contains("Format: Oxford Debate"));
        assert!(ctx.system.contains("## Your Working Memory"));
        assert!(ctx.system.contains("**My thesis:**"));
        assert!(ctx.system.contains("## Instructions"));
        // No episodic section when the summary is empty.
        assert!(!ctx.system.contains("## Earlier in This Debate"));
    }

    #[test]
    fn test_episodic_section_present_when_summary_nonempty() {
        let debate = test_debate();
        let persona = crate::persona::lookup("socrates").unwrap();
        let memory = WorkingMemory::init("socrates", "d1", &debate.topic);
        let ctx = ContextAssembler::default().assemble(
            &debate,
            persona,
            TurnRole::Argument,
            &memory,
            "I recall pressing him on definitions.",
            &[],
        );
        assert!(ctx
            .system
            .contains("## Earlier in This Debate (Your Memory)\n\nI recall pressing him"));
    }

    #[test]
    fn test_empty_history_yields_single_instruction_message() {
        let ctx = assemble_for(&[]);
        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(ctx.messages[0].role, Role::User);
        assert!(ctx.messages[0].text().contains("Socrates"));
    }

    #[test]
    fn test_window_keeps_only_recent_turns() {
        let turns: Vec<DebateTurn> = (1..=10)
            .map(|n| {
                let speaker = if n % 2 == 1 { "socrates" } else { "nietzsche" };
                turn(n, Some(speaker), &format!("content {n}"))
            })
            .collect();
        let ctx = assemble_for(&turns);

        let all_text: String = ctx.messages.iter().map(|m| m.text()).collect();
        assert!(!all_text.contains("content 4"));
        assert!(all_text.contains("content 5"));
        assert!(all_text.contains("content 10"));
    }

    #[test]
    fn test_roles_alternate_and_own_turns_are_assistant() {
        let turns = vec![
            turn(1, Some("socrates"), "my opening"),
            turn(2, Some("nietzsche"), "his opening"),
            turn(3, None, "a user interjection"),
            turn(4, Some("socrates"), "my reply"),
        ];
        let ctx = assemble_for(&turns);

        for pair in ctx.messages.windows(2) {
            assert_ne!(pair[0].role, pair[1].role, "adjacent roles must differ");
        }
        // Own turns carry raw content; others are attributed.
        let assistant_text: Vec<String> = ctx
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.text())
            .collect();
        assert!(assistant_text.iter().any(|t| t.contains("my opening")));
        assert!(!assistant_text.iter().any(|t| t.contains("[Turn 1]")));
    }

    #[test]
    fn test_consecutive_opponent_turns_merge() {
        let turns = vec![
            turn(1, Some("nietzsche"), "first point"),
            turn(2, None, "user question"),
        ];
        let ctx = assemble_for(&turns);
        // Both foreign turns plus the instruction collapse into one user message.
        assert_eq!(ctx.messages.len(), 1);
        let text = ctx.messages[0].text();
        assert!(text.contains("[Turn 1] nietzsche: first point"));
        assert!(!text.contains("Friedrich Nietzsche: first point"));
        assert!(text.contains("[Turn 2] User: user question"));
        assert!(text.contains("\n\n---\n"));
    }

    #[test]
    fn test_instruction_appended_to_trailing_user_message() {
        let turns = vec![
            turn(1, Some("socrates"), "mine"),
            turn(2, Some("nietzsche"), "theirs"),
        ];
        let ctx = assemble_for(&turns);
        let last = ctx.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.text().contains("theirs"));
        assert!(last.text().contains("---\n"));
    }
}
