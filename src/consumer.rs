//! Incremental consumers for long-lived response bodies.
//!
//! A [`Consumer`] receives the raw chunks of one response, one at a time and
//! in arrival order, and decides after each chunk whether it wants more.
//! The driver owns the body stream; whichever way the consumer terminates
//! (completed, drained or cancelled) the stream is dropped exactly once and
//! no further `step` calls are made.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a consumer wants after seeing a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Continue,
    Complete(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Init,
    Running,
    Completed,
    Drained,
    Cancelled,
}

impl ConsumerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConsumerState::Completed | ConsumerState::Drained | ConsumerState::Cancelled
        )
    }
}

/// How a consumer run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination<T> {
    Completed(T),
    Drained,
    Cancelled,
}

impl<T> Termination<T> {
    pub fn state(&self) -> ConsumerState {
        match self {
            Termination::Completed(_) => ConsumerState::Completed,
            Termination::Drained => ConsumerState::Drained,
            Termination::Cancelled => ConsumerState::Cancelled,
        }
    }
}

pub trait Consumer: Send + 'static {
    type Output: Send + 'static;

    fn step(&mut self, chunk: Bytes) -> Outcome<Self::Output>;

    /// Called once, after the transport has been released, with the terminal state.
    fn finish(&mut self, _state: ConsumerState) {}
}

/// Handle on a consumer running in the background.
///
/// Dropping the handle does not stop the consumer; call [`StreamHandle::cancel`].
pub struct StreamHandle<T> {
    cancel: Arc<Notify>,
    state: watch::Receiver<ConsumerState>,
    task: JoinHandle<Termination<T>>,
}

impl<T> StreamHandle<T> {
    /// Request teardown. Takes effect between chunks, never in the middle of a `step`.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        !self.state().is_terminal()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.state.clone()
    }

    pub async fn join(self) -> Result<Termination<T>, tokio::task::JoinError> {
        self.task.await
    }
}

/// Spawn a driver that feeds `stream` into `consumer` on the current runtime.
pub fn spawn<S, E, C>(stream: S, consumer: C) -> StreamHandle<C::Output>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
    C: Consumer,
{
    let cancel = Arc::new(Notify::new());
    let (state_tx, state_rx) = watch::channel(ConsumerState::Init);
    let task = tokio::spawn(drive(stream, consumer, cancel.clone(), state_tx));
    StreamHandle {
        cancel,
        state: state_rx,
        task,
    }
}

/// Drive `consumer` to a terminal state on the caller's task.
///
/// Nothing outlives the returned future: dropping it drops the stream.
pub async fn run_inline<S, E, C>(stream: S, consumer: C) -> Termination<C::Output>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
    C: Consumer,
{
    let (state_tx, _state_rx) = watch::channel(ConsumerState::Init);
    drive(stream, consumer, Arc::new(Notify::new()), state_tx).await
}

async fn drive<S, E, C>(
    stream: S,
    mut consumer: C,
    cancel: Arc<Notify>,
    state: watch::Sender<ConsumerState>,
) -> Termination<C::Output>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
    C: Consumer,
{
    let mut stream = Box::pin(stream);

    let termination = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.notified() => break Termination::Cancelled,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                state.send_if_modified(|s| {
                    let first = *s == ConsumerState::Init;
                    if first {
                        *s = ConsumerState::Running;
                    }
                    first
                });
                if let Outcome::Complete(value) = consumer.step(chunk) {
                    break Termination::Completed(value);
                }
            }
            Some(Err(err)) => {
                warn!(%err, "stream transport failed, draining consumer");
                break Termination::Drained;
            }
            None => break Termination::Drained,
        }
    };

    // Release the transport before anyone can observe the terminal state.
    drop(stream);

    let terminal = termination.state();
    debug!(state = ?terminal, "stream consumer finished");
    consumer.finish(terminal);
    state.send_replace(terminal);
    termination
}
