//! # roundtable
//!
//! Streaming round-table discussion orchestrator over multi-provider LLM
//! chat APIs.
//!
//! ## Overview
//!
//! A discussion is a fixed sequence of five streaming chat-completion calls
//! to four providers: a moderator opens, three discussants respond in turn,
//! and the moderator closes with a summary. Each stage's full text is
//! threaded verbatim into the next stage's prompt, so the pipeline is
//! strictly sequential and single-flight.
//!
//! ## Key components
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pipeline`] | SSE frame decoding and per-provider frame adapters |
//! | [`session`] | One streaming call: retry, timeout, cancel, callbacks |
//! | [`discussion`] | The five-stage sequential orchestrator |
//! | [`context`] | Append-only store of the topic and stage contributions |
//! | [`config`] | Vendor descriptors, prompts, timing configuration |
//! | [`transport`] | HTTP transport seam (reqwest in production) |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roundtable::{DiscussionConfig, HttpTransport, RoundTable, Stage};
//! use roundtable::discussion::DiscussionSink;
//!
//! struct Printer;
//! impl DiscussionSink for Printer {
//!     fn on_chunk(&self, _stage: Stage, delta: &str, _stream_id: &str) {
//!         print!("{}", delta);
//!     }
//!     fn on_stage_complete(&self, stage: Stage, _full_text: &str) {
//!         println!("\n--- {} done ---", stage.label());
//!     }
//!     fn on_stage_error(&self, stage: Stage, message: &str, can_retry: bool) {
//!         eprintln!("{} failed: {message} (retryable: {can_retry})", stage.label());
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> roundtable::Result<()> {
//! let table = RoundTable::new(
//!     DiscussionConfig::default(),
//!     Arc::new(HttpTransport::new()?),
//!     Arc::new(Printer),
//! );
//! table.start("why do cities exist")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod discussion;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{provider_for, DiscussionConfig, Provider, ProviderConfig};
pub use context::DialogContext;
pub use discussion::{PipelinePhase, PipelineState, RequestStatus, RoundTable};
pub use error::{Error, GuardError};
pub use prompts::PromptSet;
pub use session::{SessionConfig, SessionHandle, StreamSession};
pub use transport::{HttpTransport, RequestSpec, StreamTransport};
pub use types::{Message, MessageRole, Stage, StreamEvent};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of fallible items.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;
