//! Per-provider frame interpretation (JSON value -> [`StreamEvent`]).
//!
//! A small closed set of pure functions, one per provider dialect, dispatched
//! by [`Provider`]. No shape inference happens at runtime beyond the one
//! documented alternate-casing probe for Hunyuan.

use serde_json::Value;

use crate::config::Provider;
use crate::types::events::StreamEvent;

/// Translate one decoded frame into a normalized event.
///
/// A frame that only announces `delta.role` yields an empty, non-final delta;
/// the caller treats it as a no-op rather than an error.
pub fn interpret_frame(provider: Provider, frame: &Value) -> StreamEvent {
    match provider {
        Provider::DeepSeek | Provider::Moonshot | Provider::Doubao => openai_compatible(frame),
        Provider::Hunyuan => hunyuan(frame),
    }
}

/// The standard OpenAI-compatible dialect: content at
/// `choices[0].delta.content`, finality at `choices[0].finish_reason`.
fn openai_compatible(frame: &Value) -> StreamEvent {
    let choice = frame.get("choices").and_then(|c| c.get(0));
    StreamEvent {
        delta: choice
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        stream_id: frame_id(frame),
        is_final: choice
            .and_then(|c| c.get("finish_reason"))
            .and_then(Value::as_str)
            .map(|r| r == "stop")
            .unwrap_or(false),
    }
}

/// Hunyuan dialect: standard lower-case fields, but some deployments emit
/// alternate-cased containers (`Choices[0].Delta.Content`, `FinishReason`).
/// Both paths are probed before concluding the frame carries no content.
fn hunyuan(frame: &Value) -> StreamEvent {
    let standard = openai_compatible(frame);
    if !standard.delta.is_empty() || standard.is_final {
        return standard;
    }

    let choice = frame.get("Choices").and_then(|c| c.get(0));
    StreamEvent {
        delta: choice
            .and_then(|c| c.get("Delta"))
            .and_then(|d| d.get("Content"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        stream_id: standard.stream_id,
        is_final: choice
            .and_then(|c| c.get("FinishReason"))
            .and_then(Value::as_str)
            .map(|r| r == "stop")
            .unwrap_or(false),
    }
}

fn frame_id(frame: &Value) -> Option<String> {
    frame
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_content_and_id() {
        let frame = json!({
            "id": "chat-1",
            "choices": [{"delta": {"content": "Hello"}, "finish_reason": null}]
        });
        let event = interpret_frame(Provider::DeepSeek, &frame);
        assert_eq!(event.delta, "Hello");
        assert_eq!(event.stream_id.as_deref(), Some("chat-1"));
        assert!(!event.is_final);
    }

    #[test]
    fn finish_reason_stop_marks_final() {
        let frame = json!({"choices": [{"delta": {}, "finish_reason": "stop"}]});
        assert!(interpret_frame(Provider::Moonshot, &frame).is_final);

        let frame = json!({"choices": [{"delta": {}, "finish_reason": "length"}]});
        assert!(!interpret_frame(Provider::Moonshot, &frame).is_final);
    }

    #[test]
    fn role_announcement_is_a_noop_frame() {
        let frame = json!({"choices": [{"delta": {"role": "assistant"}}]});
        let event = interpret_frame(Provider::Doubao, &frame);
        assert!(event.delta.is_empty());
        assert!(!event.is_final);
    }

    #[test]
    fn hunyuan_probes_the_alternate_cased_path() {
        let frame = json!({
            "id": "hy-9",
            "Choices": [{"Delta": {"Content": "case"}, "FinishReason": null}]
        });
        let event = interpret_frame(Provider::Hunyuan, &frame);
        assert_eq!(event.delta, "case");
        assert_eq!(event.stream_id.as_deref(), Some("hy-9"));

        let done = json!({"Choices": [{"Delta": {}, "FinishReason": "stop"}]});
        assert!(interpret_frame(Provider::Hunyuan, &done).is_final);
    }

    #[test]
    fn hunyuan_prefers_the_standard_path_when_present() {
        let frame = json!({"choices": [{"delta": {"content": "std"}}]});
        assert_eq!(interpret_frame(Provider::Hunyuan, &frame).delta, "std");
    }

    #[test]
    fn missing_choices_yields_an_empty_event() {
        let event = interpret_frame(Provider::DeepSeek, &json!({"object": "ping"}));
        assert_eq!(event, StreamEvent::default());
    }
}
