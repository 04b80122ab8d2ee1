//! Format catalog: each debate format is a fixed ordered sequence of turn
//! roles, plus per-role instruction text for the model.
//!
//! Instruction text is configuration, not logic — the scheduler only cares
//! about the phase sequences.

use serde::{Deserialize, Serialize};

/// Supported debate formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebateFormat {
    Oxford,
    LincolnDouglas,
    Socratic,
    Townhall,
}

impl DebateFormat {
    pub const ALL: [DebateFormat; 4] = [
        DebateFormat::Oxford,
        DebateFormat::LincolnDouglas,
        DebateFormat::Socratic,
        DebateFormat::Townhall,
    ];

    /// Stable string id (matches the wire/DB representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oxford => "oxford",
            Self::LincolnDouglas => "lincoln-douglas",
            Self::Socratic => "socratic",
            Self::Townhall => "townhall",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oxford" => Some(Self::Oxford),
            "lincoln-douglas" => Some(Self::LincolnDouglas),
            "socratic" => Some(Self::Socratic),
            "townhall" => Some(Self::Townhall),
            _ => None,
        }
    }
}

impl std::fmt::Display for DebateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles a single turn can take within a format's phase sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnRole {
    Opening,
    Argument,
    Rebuttal,
    CrossExamination,
    Closing,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Argument => "argument",
            Self::Rebuttal => "rebuttal",
            Self::CrossExamination => "cross-examination",
            Self::Closing => "closing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opening" => Some(Self::Opening),
            "argument" => Some(Self::Argument),
            "rebuttal" => Some(Self::Rebuttal),
            "cross-examination" => Some(Self::CrossExamination),
            "closing" => Some(Self::Closing),
            _ => None,
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed phase sequence for a format. Every format opens with an
/// opening role and ends with a closing role.
pub fn turn_sequence(format: DebateFormat) -> &'static [TurnRole] {
    use TurnRole::*;
    match format {
        DebateFormat::Oxford => &[Opening, Argument, Rebuttal, Closing],
        DebateFormat::LincolnDouglas => &[Opening, CrossExamination, Rebuttal, Closing],
        DebateFormat::Socratic => &[
            Opening,
            CrossExamination,
            CrossExamination,
            CrossExamination,
            Closing,
        ],
        DebateFormat::Townhall => &[Opening, Argument, Argument, Argument, Closing],
    }
}

/// Human-readable format label for prompts and UI.
pub fn format_label(format: DebateFormat) -> &'static str {
    match format {
        DebateFormat::Oxford => "Oxford",
        DebateFormat::LincolnDouglas => "Lincoln-Douglas",
        DebateFormat::Socratic => "Socratic",
        DebateFormat::Townhall => "Town Hall",
    }
}

/// Natural-language directions for the upcoming turn, parameterized by
/// speaker and opponent names.
pub fn turn_instruction(
    format: DebateFormat,
    role: TurnRole,
    speaker_name: &str,
    opponent_names: &[String],
) -> String {
    let opponents = opponent_names.join(" and ");

    match role {
        TurnRole::Opening => match format {
            DebateFormat::Oxford => format!(
                "{speaker_name}, you are delivering your opening statement in an Oxford-style \
                 debate. Clearly state your position on the topic and present your strongest \
                 initial argument. Be concise and compelling. Address the audience and the \
                 motion directly."
            ),
            DebateFormat::LincolnDouglas => format!(
                "{speaker_name}, you are delivering your opening constructive speech in a \
                 Lincoln-Douglas debate. Establish your value premise and criterion, then \
                 present your contentions. Be systematic and persuasive."
            ),
            DebateFormat::Socratic => format!(
                "{speaker_name}, open the Socratic dialogue by stating your initial position \
                 on the topic. Make a clear, examinable claim and invite rigorous questioning."
            ),
            DebateFormat::Townhall => format!(
                "{speaker_name}, deliver your opening statement for the Town Hall. Address the \
                 assembled audience and state your position clearly. Make it accessible and \
                 direct."
            ),
        },

        TurnRole::Argument => match format {
            DebateFormat::Oxford => format!(
                "{speaker_name}, develop your main argument in this Oxford debate. Build \
                 logically on your opening, introduce new evidence or reasoning, and \
                 preemptively address obvious counterarguments. Your opponent is {opponents}."
            ),
            _ => format!(
                "{speaker_name}, present your argument to the Town Hall. Engage with both the \
                 audience and respond to any points raised by {opponents}. Be persuasive and \
                 specific."
            ),
        },

        TurnRole::CrossExamination => match format {
            DebateFormat::LincolnDouglas => format!(
                "{speaker_name}, you are cross-examining {opponents}. Ask sharp, focused \
                 questions to expose weaknesses in their arguments. Do not make speeches — \
                 ask questions that force admissions or reveal contradictions. One question \
                 at a time."
            ),
            _ => format!(
                "{speaker_name}, engage in Socratic questioning with {opponents}. Probe their \
                 assumptions with precise, targeted questions. Expose inconsistencies through \
                 careful dialectic. Do not lecture — question."
            ),
        },

        TurnRole::Rebuttal => format!(
            "{speaker_name}, deliver your rebuttal. Directly address the strongest arguments \
             made by {opponents}. Challenge their reasoning, expose logical flaws, and \
             reinforce your own position. Be specific — reference what they actually said, \
             not a strawman version."
        ),

        TurnRole::Closing => match format {
            DebateFormat::Oxford => format!(
                "{speaker_name}, deliver your closing statement in the Oxford debate. \
                 Summarize why your position has prevailed, acknowledge any valid points from \
                 the opposition, and make a final appeal to the audience. Leave a lasting \
                 impression."
            ),
            DebateFormat::LincolnDouglas => format!(
                "{speaker_name}, deliver your final rebuttal and closing. Crystallize the \
                 debate around the key issues. Explain why your value framework and arguments \
                 should prevail. Make every word count."
            ),
            _ => format!(
                "{speaker_name}, deliver your closing statement. Synthesize the key points of \
                 the debate, explain why your position is most defensible, and leave the \
                 audience with something meaningful to consider."
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_opens_and_closes() {
        for format in DebateFormat::ALL {
            let phases = turn_sequence(format);
            assert!(
                phases.len() >= 4 && phases.len() <= 5,
                "{format} has {} phases",
                phases.len()
            );
            assert_eq!(phases.first(), Some(&TurnRole::Opening), "{format}");
            assert_eq!(phases.last(), Some(&TurnRole::Closing), "{format}");
        }
    }

    #[test]
    fn test_format_round_trips_through_string() {
        for format in DebateFormat::ALL {
            assert_eq!(DebateFormat::parse(format.as_str()), Some(format));
        }
        assert_eq!(DebateFormat::parse("freestyle"), None);
    }

    #[test]
    fn test_role_round_trips_through_string() {
        for role in [
            TurnRole::Opening,
            TurnRole::Argument,
            TurnRole::Rebuttal,
            TurnRole::CrossExamination,
            TurnRole::Closing,
        ] {
            assert_eq!(TurnRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_instruction_names_speaker_and_opponents() {
        let instruction = turn_instruction(
            DebateFormat::Oxford,
            TurnRole::Rebuttal,
            "Socrates",
            &["Friedrich Nietzsche".to_string()],
        );
        assert!(instruction.contains("Socrates"));
        assert!(instruction.contains("Friedrich Nietzsche"));
    }

    #[test]
    fn test_cross_examination_varies_by_format() {
        let ld = turn_instruction(
            DebateFormat::LincolnDouglas,
            TurnRole::CrossExamination,
            "A",
            &["B".to_string()],
        );
        let socratic = turn_instruction(
            DebateFormat::Socratic,
            TurnRole::CrossExamination,
            "A",
            &["B".to_string()],
        );
        assert!(ld.contains("cross-examining"));
        assert!(socratic.contains("Socratic questioning"));
    }
}
