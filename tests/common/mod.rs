#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use roundtable::discussion::DiscussionSink;
use roundtable::transport::TransportError;
use roundtable::{BoxStream, Error, Provider, RequestSpec, Stage, StreamTransport};

/// One scripted response for a provider call.
pub enum Script {
    /// Deliver these raw stream chunks, then end the body.
    Stream(Vec<String>),
    /// Deliver these exact byte slices, then end the body. Lets a test split
    /// the body inside a multi-byte character.
    Bytes(Vec<Vec<u8>>),
    /// Fail at connection establishment.
    Refuse,
    /// Connect, then never deliver a byte.
    Hang,
}

/// Transport that replays scripted responses per provider and records every
/// attempt and request body.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<Provider, VecDeque<Script>>>,
    pub attempts: AtomicUsize,
    pub bodies: Mutex<Vec<(Provider, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            attempts: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, provider: Provider, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(provider)
            .or_default()
            .push_back(script);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The nth recorded request body's user-message content.
    pub fn user_content(&self, n: usize) -> String {
        let bodies = self.bodies.lock().unwrap();
        bodies[n].1["messages"][1]["content"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

#[async_trait::async_trait]
impl StreamTransport for ScriptedTransport {
    async fn open_stream(&self, spec: &RequestSpec) -> roundtable::Result<BoxStream<'static, Bytes>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .unwrap()
            .push((spec.provider, spec.body.clone()));

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&spec.provider)
            .and_then(|queue| queue.pop_front());

        match script {
            Some(Script::Stream(chunks)) => Ok(Box::pin(futures::stream::iter(
                chunks.into_iter().map(|c| Ok(Bytes::from(c))),
            ))),
            Some(Script::Bytes(chunks)) => Ok(Box::pin(futures::stream::iter(
                chunks.into_iter().map(|c| Ok(Bytes::from(c))),
            ))),
            Some(Script::Hang) => Ok(Box::pin(futures::stream::pending())),
            Some(Script::Refuse) => Err(Error::Transport(TransportError::Other(
                "connection refused".to_string(),
            ))),
            None => Err(Error::Transport(TransportError::Other(
                "no scripted response".to_string(),
            ))),
        }
    }
}

/// A well-formed SSE reply: role announcement, one frame per piece, sentinel.
pub fn sse_reply(id: &str, pieces: &[&str]) -> Script {
    let mut chunks = vec![format!(
        "data: {{\"id\":\"{id}\",\"choices\":[{{\"delta\":{{\"role\":\"assistant\"}}}}]}}\n"
    )];
    for piece in pieces {
        chunks.push(format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{piece}\"}}}}]}}\n"
        ));
    }
    chunks.push("data: [DONE]\n".to_string());
    Script::Stream(chunks)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Chunk {
        stage: Stage,
        delta: String,
        stream_id: String,
    },
    StageComplete {
        stage: Stage,
        full_text: String,
    },
    StageError {
        stage: Stage,
        message: String,
        can_retry: bool,
    },
    DiscussionComplete,
}

/// Sink that forwards every event over a channel for the test to await.
pub struct ChannelSink {
    tx: UnboundedSender<SinkEvent>,
}

pub fn channel_sink() -> (Arc<ChannelSink>, UnboundedReceiver<SinkEvent>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(ChannelSink { tx }), rx)
}

impl DiscussionSink for ChannelSink {
    fn on_chunk(&self, stage: Stage, delta: &str, stream_id: &str) {
        let _ = self.tx.send(SinkEvent::Chunk {
            stage,
            delta: delta.to_string(),
            stream_id: stream_id.to_string(),
        });
    }

    fn on_stage_complete(&self, stage: Stage, full_text: &str) {
        let _ = self.tx.send(SinkEvent::StageComplete {
            stage,
            full_text: full_text.to_string(),
        });
    }

    fn on_stage_error(&self, stage: Stage, message: &str, can_retry: bool) {
        let _ = self.tx.send(SinkEvent::StageError {
            stage,
            message: message.to_string(),
            can_retry,
        });
    }

    fn on_discussion_complete(&self) {
        let _ = self.tx.send(SinkEvent::DiscussionComplete);
    }
}

/// Await the next sink event, failing the test if none arrives in time.
pub async fn next_event(rx: &mut UnboundedReceiver<SinkEvent>) -> SinkEvent {
    tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for sink event")
        .expect("sink channel closed")
}
