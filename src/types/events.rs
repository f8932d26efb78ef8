//! Normalized per-frame stream events.

/// The normalized result of interpreting one decoded frame.
///
/// Transient value: the session accumulates `delta` into its running buffer
/// and does not retain the event itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// Incremental text extracted from the frame. Empty for no-op frames
    /// such as role announcements.
    pub delta: String,
    /// Stream identifier carried by the frame, if any. The session freezes
    /// the first id it sees for the whole call.
    pub stream_id: Option<String>,
    /// Whether the provider flagged this frame as terminal
    /// (`finish_reason == "stop"`).
    pub is_final: bool,
}
