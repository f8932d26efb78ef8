//! Core type definitions (stages, messages, stream events).

pub mod events;
pub mod message;
pub mod stage;

pub use events::StreamEvent;
pub use message::{Message, MessageRole};
pub use stage::Stage;
