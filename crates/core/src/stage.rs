//! Agent output stages.
//!
//! A case carries four canned agent outputs that are always played back in the same order.

use serde::{Deserialize, Serialize};

/// One ordered phase of agent output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Acuity assessment and red flags.
    Triage,
    /// Current management and information gaps.
    Context,
    /// Assessment and plan.
    Plan,
    /// Final consult note. Terminal stage.
    Note,
}

impl Stage {
    /// All stages in playback order.
    pub const ALL: [Stage; 4] = [Stage::Triage, Stage::Context, Stage::Plan, Stage::Note];

    /// Position of this stage in playback order.
    pub fn index(self) -> usize {
        match self {
            Stage::Triage => 0,
            Stage::Context => 1,
            Stage::Plan => 2,
            Stage::Note => 3,
        }
    }

    /// The stage that follows this one, or `None` for the note.
    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn is_note(self) -> bool {
        matches!(self, Stage::Note)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Triage => "triage",
            Stage::Context => "context",
            Stage::Plan => "plan",
            Stage::Note => "note",
        }
    }

    /// Tab label shown above the stage panel.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Triage => "Triage",
            Stage::Context => "Context & Gaps",
            Stage::Plan => "Assessment & Plan",
            Stage::Note => "Consult Note",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triage" => Ok(Stage::Triage),
            "context" => Ok(Stage::Context),
            "plan" => Ok(Stage::Plan),
            "note" => Ok(Stage::Note),
            other => Err(crate::ConsultError::InvalidInput(format!(
                "unknown stage: {other}"
            ))),
        }
    }
}

/// Display state of a single stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StageStatus {
    /// Nothing revealed yet.
    #[default]
    Empty,
    /// Rendered HTML is being revealed.
    Typing,
    /// Fully revealed and post-processed.
    Completed,
}
