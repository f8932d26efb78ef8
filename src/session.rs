//! One streaming call's lifecycle: open, chunk delivery, completion, cancel.
//!
//! The session composes the transport with the frame decoder and the
//! provider adapter, owns the connection-establishment retry policy and the
//! wall-clock timeout, and funnels every outcome through a single delivery
//! gate so that exactly one of complete/error fires per session and nothing
//! fires after `cancel()` returns.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::ThreadId;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Provider;
use crate::pipeline::{interpret_frame, FrameDecoder};
use crate::transport::{RequestSpec, StreamTransport};
use crate::{BoxStream, Error, Result};

/// Retry and timeout policy for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wall-clock budget from `open` to a terminal signal.
    pub timeout: Duration,
    /// Retries after a connection-establishment failure.
    pub max_connect_retries: u32,
    /// Base backoff delay; retry n sleeps `base * 2^(n-1)`.
    pub retry_base_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_connect_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Factory for streaming sessions over a shared transport.
pub struct StreamSession {
    transport: Arc<dyn StreamTransport>,
    config: SessionConfig,
}

/// Cancel handle for one in-flight session.
///
/// `cancel` is idempotent and safe to call after the session settled. Once it
/// returns, no further callback will be invoked. It may be called from inside
/// a session callback; the gate recognizes its own delivering thread and does
/// not wait on it.
#[derive(Clone)]
pub struct SessionHandle {
    token: CancellationToken,
    gate: Arc<Gate>,
}

impl SessionHandle {
    pub fn cancel(&self) {
        self.gate.cancel_and_wait();
        self.token.cancel();
    }
}

/// Serializes callback delivery against cancellation.
///
/// Callbacks are invoked with the lock released; the gate instead records
/// which thread is mid-delivery, and `cancel_and_wait` blocks until that
/// delivery returns, unless the canceller *is* the delivering thread.
#[derive(Default)]
struct Gate {
    state: Mutex<GateState>,
    idle: Condvar,
}

#[derive(Default)]
struct GateState {
    cancelled: bool,
    settled: bool,
    delivering: Option<ThreadId>,
}

impl Gate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the right to invoke a callback on the current thread. Returns
    /// false once the session is cancelled or settled.
    fn begin(&self, terminal: bool) -> bool {
        let mut state = self.lock();
        if state.cancelled || state.settled {
            return false;
        }
        if terminal {
            state.settled = true;
        }
        state.delivering = Some(std::thread::current().id());
        true
    }

    /// Release the delivery claim taken by [`Gate::begin`].
    fn end(&self) {
        let mut state = self.lock();
        state.delivering = None;
        self.idle.notify_all();
    }

    fn cancel_and_wait(&self) {
        let me = std::thread::current().id();
        let mut state = self.lock();
        state.cancelled = true;
        while state.delivering.is_some() && state.delivering != Some(me) {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

impl StreamSession {
    pub fn new(transport: Arc<dyn StreamTransport>, config: SessionConfig) -> Self {
        Self { transport, config }
    }

    /// Issue one streaming call. Chunk callbacks receive the incremental text
    /// and the session's frozen stream id; exactly one of
    /// `on_complete(full_text)` / `on_error` fires, unless the session is
    /// cancelled before any outcome, in which case neither does.
    pub fn open(
        &self,
        spec: RequestSpec,
        on_chunk: impl FnMut(&str, &str) + Send + 'static,
        on_complete: impl FnOnce(String) + Send + 'static,
        on_error: impl FnOnce(Error) + Send + 'static,
    ) -> SessionHandle {
        let gate = Arc::new(Gate::default());
        let token = CancellationToken::new();
        let handle = SessionHandle {
            token: token.clone(),
            gate: gate.clone(),
        };

        let transport = self.transport.clone();
        let config = self.config.clone();
        let task_gate = gate.clone();
        let mut on_chunk = on_chunk;

        tokio::spawn(async move {
            let mut pump = Pump {
                provider: spec.provider,
                decoder: FrameDecoder::new(),
                carry: Vec::new(),
                full_text: String::new(),
                stream_id: None,
                gate: task_gate.clone(),
                on_chunk: &mut on_chunk,
            };

            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(config.timeout) => Err(Error::Timeout {
                    after: config.timeout,
                }),
                result = run_attempts(&*transport, &spec, &config, &mut pump) => result,
            };

            if !task_gate.begin(true) {
                return;
            }
            match outcome {
                Ok(full_text) => on_complete(full_text),
                Err(err) => on_error(err),
            }
            task_gate.end();
        });

        handle
    }
}

/// Connection attempts with exponential backoff. Only establishment failures
/// are retried here; once bytes flow, any error ends the session.
async fn run_attempts(
    transport: &dyn StreamTransport,
    spec: &RequestSpec,
    config: &SessionConfig,
    pump: &mut Pump<'_>,
) -> Result<String> {
    let mut retries = 0u32;
    loop {
        match transport.open_stream(spec).await {
            Ok(stream) => return pump.drain(stream).await,
            Err(err) if retries < config.max_connect_retries => {
                retries += 1;
                let delay = config.retry_base_delay * 2u32.pow(retries - 1);
                warn!(
                    provider = spec.provider.id(),
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "connection failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Err(Error::RetriesExhausted {
                    retries,
                    message: err.to_string(),
                })
            }
        }
    }
}

struct Pump<'a> {
    provider: Provider,
    decoder: FrameDecoder,
    carry: Vec<u8>,
    full_text: String,
    stream_id: Option<String>,
    gate: Arc<Gate>,
    on_chunk: &'a mut (dyn FnMut(&str, &str) + Send),
}

impl Pump<'_> {
    /// Consume the byte stream to its terminal signal: sentinel, adapter
    /// finality, or natural end of body, whichever comes first.
    async fn drain(&mut self, mut stream: BoxStream<'static, Bytes>) -> Result<String> {
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            let text = self.take_text(&bytes);
            if self.feed(&text) || self.decoder.is_done() {
                return Ok(std::mem::take(&mut self.full_text));
            }
        }

        let trailing = String::from_utf8_lossy(&std::mem::take(&mut self.carry)).into_owned();
        if !self.feed(&trailing) {
            if let Some(payload) = self.decoder.finish() {
                self.apply(&payload);
            }
        }
        Ok(std::mem::take(&mut self.full_text))
    }

    /// Decode one delivery as UTF-8. Deliveries are arbitrary byte slices of
    /// the transfer, so a multi-byte character can be split across them; the
    /// incomplete trailing bytes are carried into the next delivery instead
    /// of being decoded to replacement characters.
    fn take_text(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let buf = std::mem::take(&mut self.carry);
        let split = match std::str::from_utf8(&buf) {
            Ok(_) => buf.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => buf.len(),
        };
        self.carry = buf[split..].to_vec();
        String::from_utf8_lossy(&buf[..split]).into_owned()
    }

    /// Push decoded text through the framer; returns true on a terminal frame.
    fn feed(&mut self, text: &str) -> bool {
        for payload in self.decoder.push(text) {
            if self.apply(&payload) {
                return true;
            }
        }
        false
    }

    /// Interpret one frame payload; returns true on a terminal frame.
    /// Malformed JSON is a local failure: log, skip, keep streaming.
    fn apply(&mut self, payload: &str) -> bool {
        let frame: serde_json::Value = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, payload, "skipping malformed frame");
                return false;
            }
        };

        let event = interpret_frame(self.provider, &frame);
        if self.stream_id.is_none() {
            if let Some(id) = event.stream_id {
                debug!(stream_id = id.as_str(), "stream id frozen");
                self.stream_id = Some(id);
            }
        }

        if !event.delta.is_empty() {
            self.full_text.push_str(&event.delta);
            let stream_id = self.stream_id.as_deref().unwrap_or("response");
            // Deliver with the gate released so the callback may cancel.
            if self.gate.begin(false) {
                (self.on_chunk)(&event.delta, stream_id);
                self.gate.end();
            }
        }

        event.is_final
    }
}
