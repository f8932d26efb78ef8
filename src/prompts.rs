//! Per-stage system prompts and synthesized user prompts.
//!
//! Built-in defaults form a pure fallback table; callers may override any
//! stage's system prompt through [`PromptSet`]. Blank overrides fall back to
//! the default.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::context::DialogContext;
use crate::types::stage::Stage;

static DEFAULT_PROMPTS: Lazy<HashMap<Stage, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            Stage::Guide,
            "You are the moderator of a round-table discussion, a calm and \
             wise thinker versed in sociology, economics, anthropology and \
             philosophy. When the user shares a topic, open the discussion \
             with a broad, multi-perspective framing: offer at least three \
             distinct angles, use accessible metaphors over jargon, and lay \
             out a framework the following discussants can build on. Stay \
             strictly on the user's topic and keep the structure clear.",
        ),
        (
            Stage::Discussant1,
            "You are an energetic first-principles thinker, full of \
             curiosity and creative drive. Strip the topic back to its \
             fundamentals, question the assumptions hidden in what has been \
             said so far, and propose unexpected but workable ideas. Prefer \
             vivid, concrete examples over abstractions, and keep your \
             suggestions practical despite their novelty.",
        ),
        (
            Stage::Discussant2,
            "You are a cool-headed pragmatist with a sharp, systematic mind. \
             Analyze the topic with facts and data, point out logical gaps \
             and blind spots in the discussion so far, and give direct, \
             cost-aware recommendations that can be acted on. Stay \
             constructive: when you criticize, offer a simpler alternative.",
        ),
        (
            Stage::Discussant3,
            "You are an empathetic critical thinker with high emotional \
             intelligence. Surface the human dimension the others may have \
             missed: the feelings, values and relationships at stake. Ask \
             whether the discussion is answering the question the user truly \
             cares about, and balance rational advice with emotional needs. \
             Be warm, but do not shy away from pointed questions.",
        ),
        (
            Stage::Summary,
            "You return as the moderator, now closing the discussion. \
             Present each participant's core viewpoint fairly, identify where \
             they align, differ and complement one another, and distill the \
             exchange into a few simple, deep insights. Finish by opening one \
             new angle that extends naturally from what was said. Be more \
             concise than any previous speaker and do not introduce unrelated \
             topics.",
        ),
    ])
});

/// Per-stage system prompts with built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    overrides: HashMap<Stage, String>,
}

impl PromptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the system prompt for one stage. Blank text is ignored so a
    /// cleared override falls back to the default.
    pub fn with_override(mut self, stage: Stage, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.trim().is_empty() {
            self.overrides.insert(stage, prompt);
        }
        self
    }

    /// The system prompt to use for a stage: the override when one exists,
    /// otherwise the built-in default.
    pub fn system_prompt(&self, stage: Stage) -> &str {
        self.overrides
            .get(&stage)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROMPTS[&stage])
    }
}

/// Build the stage-specific user prompt, quoting the verbatim text of every
/// previously completed stage in pipeline order, each labeled by speaker.
///
/// Callers must have validated that all required prior contributions are
/// present; missing ones are simply skipped here.
pub(crate) fn synthesize_user_prompt(stage: Stage, ctx: &DialogContext) -> String {
    if stage == Stage::Guide {
        return ctx.user_q().to_string();
    }

    let opening = if stage == Stage::Summary {
        "We have just finished a discussion around the following topic:"
    } else {
        "We are holding a discussion around the following topic:"
    };

    let mut prompt = format!("{}\n{}\n", opening, ctx.user_q());
    for prior in Stage::ALL.iter().take(stage.index()) {
        if let Some(text) = ctx.content(*prior) {
            prompt.push_str(&format!("\nWhat the {} said:\n{}\n", prior.label(), text));
        }
    }

    let instruction = match stage {
        Stage::Guide => unreachable!("guide prompt handled above"),
        Stage::Discussant1 => {
            "Speak now as the first discussant. Start from your own distinct \
             viewpoint instead of restating what the moderator already said."
        }
        Stage::Discussant2 => {
            "Speak now as the second discussant. Bring your own distinct \
             viewpoint: neither repeat the moderator nor simply agree or \
             disagree with the first discussant."
        }
        Stage::Discussant3 => {
            "Speak now as the third discussant. Offer a new insight or a \
             different angle from your own distinct viewpoint rather than \
             repeating what has already been said."
        }
        Stage::Summary => {
            "As the summarizer, weave the viewpoints together from your own \
             distinct vantage point, distill the core insights, and close \
             with a higher-level reflection."
        }
    };
    prompt.push('\n');
    prompt.push_str(instruction);
    prompt
}
