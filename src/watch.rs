use bytes::{Bytes, BytesMut};
use serde::de::IgnoredAny;
use tracing::{debug, warn};

use crate::consumer::{Consumer, ConsumerState, Outcome};
use crate::k8s;
use crate::models::{UiEvent, UiSink};

/// Largest partial event kept while waiting for the rest of it.
const MAX_PENDING: usize = 1 << 20;

/// Consumes a pod watch: echoes every chunk to the log pane as it arrives and
/// forwards decoded events to the table.
pub struct WatchConsumer {
    namespace: String,
    sink: UiSink,
    pending: BytesMut,
}

enum Frame {
    Empty,
    Partial,
    Value(usize),
    Invalid(serde_json::Error),
}

impl WatchConsumer {
    pub fn new(namespace: impl Into<String>, sink: UiSink) -> Self {
        Self {
            namespace: namespace.into(),
            sink,
            pending: BytesMut::new(),
        }
    }

    fn log(&self, line: String) {
        let _ = self.sink.send(UiEvent::Log(line));
    }

    fn next_frame(&self) -> Frame {
        let mut values = serde_json::Deserializer::from_slice(&self.pending).into_iter::<IgnoredAny>();
        match values.next() {
            None => Frame::Empty,
            Some(Ok(_)) => Frame::Value(values.byte_offset()),
            Some(Err(err)) if err.is_eof() => Frame::Partial,
            Some(Err(err)) => Frame::Invalid(err),
        }
    }

    /// Decode every complete event in `pending`. Events may be separated by
    /// newlines or simply follow one another.
    fn decode_pending(&mut self) {
        loop {
            match self.next_frame() {
                Frame::Empty => {
                    self.pending.clear();
                    return;
                }
                Frame::Partial => {
                    if self.pending.len() > MAX_PENDING {
                        warn!(namespace = %self.namespace, len = self.pending.len(), "discarding oversized watch event");
                        self.log(format!("Discarding watch event larger than {MAX_PENDING} bytes"));
                        self.pending.clear();
                    }
                    return;
                }
                Frame::Value(end) => {
                    let frame = self.pending.split_to(end);
                    self.decode(&frame);
                }
                Frame::Invalid(err) => {
                    // Resynchronise on the next line.
                    match self.pending.iter().position(|b| *b == b'\n') {
                        Some(pos) => drop(self.pending.split_to(pos + 1)),
                        None => self.pending.clear(),
                    }
                    self.reject(err.into());
                }
            }
        }
    }

    fn decode(&self, raw: &[u8]) {
        match k8s::parse_watch_event(raw) {
            Ok(event) => {
                let _ = self.sink.send(UiEvent::Watch {
                    namespace: self.namespace.clone(),
                    event,
                });
            }
            Err(err) => self.reject(err),
        }
    }

    fn reject(&self, err: crate::error::Error) {
        warn!(namespace = %self.namespace, %err, "skipping undecodable watch event");
        self.log(format!("Failed to decode watch event: {err}"));
    }
}

impl Consumer for WatchConsumer {
    type Output = ();

    fn step(&mut self, chunk: Bytes) -> Outcome<()> {
        let text = String::from_utf8_lossy(&chunk);
        let text = text.trim();
        if !text.is_empty() {
            self.log(text.to_string());
        }
        self.pending.extend_from_slice(&chunk);
        self.decode_pending();
        Outcome::Continue
    }

    fn finish(&mut self, state: ConsumerState) {
        match state {
            ConsumerState::Drained => {
                if let Frame::Partial = self.next_frame() {
                    let rest = self.pending.split();
                    if let Err(err) = k8s::parse_watch_event(&rest) {
                        self.reject(err);
                    }
                }
                self.log(format!("Watch for namespace {} ended", self.namespace));
            }
            _ => debug!(namespace = %self.namespace, ?state, "watch stopped"),
        }
    }
}
