//! The five sequential stages of a round-table discussion.

use serde::{Deserialize, Serialize};

/// One of the five sequential LLM calls that make up a discussion.
///
/// Stages are strictly ordered; the orchestrator only ever advances by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Guide,
    Discussant1,
    Discussant2,
    Discussant3,
    Summary,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Guide,
        Stage::Discussant1,
        Stage::Discussant2,
        Stage::Discussant3,
        Stage::Summary,
    ];

    /// Zero-based position in the pipeline.
    pub fn index(self) -> usize {
        match self {
            Stage::Guide => 0,
            Stage::Discussant1 => 1,
            Stage::Discussant2 => 2,
            Stage::Discussant3 => 3,
            Stage::Summary => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Stage::ALL.get(index).copied()
    }

    /// The stage that follows this one, or `None` after the summary.
    pub fn next(self) -> Option<Stage> {
        Stage::from_index(self.index() + 1)
    }

    /// Human-readable speaker label used when quoting a stage's contribution
    /// into later prompts.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Guide => "moderator",
            Stage::Discussant1 => "first discussant",
            Stage::Discussant2 => "second discussant",
            Stage::Discussant3 => "third discussant",
            Stage::Summary => "summarizer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_by_one_and_stop_after_summary() {
        assert_eq!(Stage::Guide.next(), Some(Stage::Discussant1));
        assert_eq!(Stage::Discussant3.next(), Some(Stage::Summary));
        assert_eq!(Stage::Summary.next(), None);
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(Stage::from_index(i), Some(*stage));
        }
    }
}
