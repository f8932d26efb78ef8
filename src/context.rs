//! The accumulated conversation context of one discussion.

use crate::error::GuardError;
use crate::types::stage::Stage;

/// Append-only store of the topic and each stage's completed contribution.
///
/// Owned exclusively by the orchestrator: stage completions write through
/// [`DialogContext::record`] exactly once, and only a full pipeline reset
/// clears recorded contributions. The topic survives resets.
#[derive(Debug, Clone)]
pub struct DialogContext {
    user_q: String,
    contents: [Option<String>; 5],
}

impl DialogContext {
    pub fn new(user_q: impl Into<String>) -> Self {
        Self {
            user_q: user_q.into(),
            contents: Default::default(),
        }
    }

    pub fn user_q(&self) -> &str {
        &self.user_q
    }

    /// The verbatim contribution recorded for a stage, if it completed.
    pub fn content(&self, stage: Stage) -> Option<&str> {
        self.contents[stage.index()].as_deref()
    }

    /// Record a stage's full text. Each slot is written exactly once.
    pub fn record(&mut self, stage: Stage, text: impl Into<String>) -> Result<(), GuardError> {
        let slot = &mut self.contents[stage.index()];
        if slot.is_some() {
            return Err(GuardError::AlreadyRecorded { stage });
        }
        *slot = Some(text.into());
        Ok(())
    }

    /// The earliest stage before `stage` whose contribution is missing or
    /// blank after trimming. `None` means the guard for `stage` is satisfied.
    pub fn first_missing_before(&self, stage: Stage) -> Option<Stage> {
        Stage::ALL
            .iter()
            .take(stage.index())
            .copied()
            .find(|prior| {
                self.content(*prior)
                    .map(|text| text.trim().is_empty())
                    .unwrap_or(true)
            })
    }

    /// Full pipeline reset: drop every contribution, keep the topic verbatim.
    pub fn reset(&mut self) {
        self.contents = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_write_once() {
        let mut ctx = DialogContext::new("t");
        ctx.record(Stage::Guide, "a").unwrap();
        assert_eq!(ctx.content(Stage::Guide), Some("a"));
        assert_eq!(
            ctx.record(Stage::Guide, "b"),
            Err(GuardError::AlreadyRecorded { stage: Stage::Guide })
        );
        assert_eq!(ctx.content(Stage::Guide), Some("a"));
    }

    #[test]
    fn missing_and_blank_contributions_fail_the_guard() {
        let mut ctx = DialogContext::new("t");
        assert_eq!(ctx.first_missing_before(Stage::Guide), None);
        assert_eq!(
            ctx.first_missing_before(Stage::Discussant1),
            Some(Stage::Guide)
        );

        ctx.record(Stage::Guide, "  \n ").unwrap();
        assert_eq!(
            ctx.first_missing_before(Stage::Discussant1),
            Some(Stage::Guide)
        );
    }

    #[test]
    fn reset_preserves_topic_and_clears_contributions() {
        let mut ctx = DialogContext::new("topic");
        ctx.record(Stage::Guide, "g").unwrap();
        ctx.reset();
        assert_eq!(ctx.user_q(), "topic");
        assert_eq!(ctx.content(Stage::Guide), None);
        ctx.record(Stage::Guide, "again").unwrap();
    }
}
