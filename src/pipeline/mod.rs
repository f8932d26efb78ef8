//! Streaming ingestion pipeline: raw bytes -> frames -> normalized events.
//!
//! ```text
//! Raw bytes → FrameDecoder → serde_json → interpret_frame → StreamEvent
//!     │            │                            │
//!   HTTP        data:-line                per-provider
//!   body         framing                  field probing
//! ```
//!
//! The decoder knows nothing about providers; the adapters know nothing
//! about framing. [`crate::session::StreamSession`] composes the two.

pub mod adapt;
pub mod decode;

pub use adapt::interpret_frame;
pub use decode::FrameDecoder;
