use std::{
    fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use txgate_wire::PacketBuffer;

/// Receives the effect of a frame's completion.
pub trait CompletionSink: Send + Sync + 'static {
    /// Called exactly once per frame, with [`CompletionState::Completed`] when the network
    /// stack completes it or [`CompletionState::RolledBack`] when it is handed back rejected.
    fn release(&self, outcome: CompletionState);

    /// Called for every explicit completion after the first.
    fn duplicate(&self) {}
}

const ARMED: u8 = 0;
const COMPLETED: u8 = 1;
const ROLLED_BACK: u8 = 2;

/// The state a [`Completion`] is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// Submitted, or about to be, and not yet done.
    Armed,
    /// Completed by the network stack.
    Completed,
    /// Rejected and handed back to the submitter.
    RolledBack,
}

/// One-shot completion notification attached to a [`Frame`].
///
/// The handle can be cloned and invoked any number of times, from any thread. Only the first
/// transition out of [`CompletionState::Armed`] reaches the [`CompletionSink`]; everything
/// after that is absorbed.
#[derive(Clone)]
pub struct Completion {
    inner: Arc<Inner>,
}

struct Inner {
    state: AtomicU8,
    sink: Box<dyn CompletionSink>,
}

impl Completion {
    pub fn new(sink: impl CompletionSink) -> Self {
        Self { inner: Arc::new(Inner { state: AtomicU8::new(ARMED), sink: Box::new(sink) }) }
    }

    /// Signals that the network stack is done with the frame. Returns `true` only for the call
    /// that had an effect.
    pub fn complete(&self) -> bool {
        match self.transition(COMPLETED) {
            Ok(()) => true,
            Err(COMPLETED) => {
                tracing::error!("frame completed more than once, ignoring");
                self.inner.sink.duplicate();
                false
            }
            Err(_) => {
                tracing::warn!("completion for a rolled back frame, ignoring");
                false
            }
        }
    }

    pub fn state(&self) -> CompletionState {
        CompletionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Completion performed by the frame itself when it is dropped. Silent if the frame was
    /// already completed or rolled back.
    fn complete_on_drop(&self) {
        let _ = self.transition(COMPLETED);
    }

    fn rollback(&self) -> bool {
        match self.transition(ROLLED_BACK) {
            Ok(()) => true,
            Err(state) => {
                tracing::debug!(state, "rollback of a finished frame, ignoring");
                false
            }
        }
    }

    fn transition(&self, to: u8) -> Result<(), u8> {
        self.inner.state.compare_exchange(ARMED, to, Ordering::AcqRel, Ordering::Acquire)?;
        self.inner.sink.release(CompletionState::from_u8(to));
        Ok(())
    }
}

impl CompletionState {
    const fn from_u8(state: u8) -> Self {
        match state {
            ARMED => Self::Armed,
            COMPLETED => Self::Completed,
            _ => Self::RolledBack,
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").field("state", &self.state()).finish()
    }
}

/// A packet buffer on its way to the network stack, with its completion attached.
///
/// Whoever owns the frame when it is dropped completes it, unless it was completed or rolled
/// back before.
#[derive(Debug)]
pub struct Frame {
    buffer: PacketBuffer,
    completion: Completion,
}

impl Frame {
    pub fn new(buffer: PacketBuffer, completion: Completion) -> Self {
        Self { buffer, completion }
    }

    /// The bytes to put on the wire.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    #[inline]
    pub fn buffer(&self) -> &PacketBuffer {
        &self.buffer
    }

    /// A handle to this frame's completion, for network stacks that signal completion
    /// separately from releasing the frame.
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Releases a frame that was never accepted by the network stack, without completing it.
    /// Returns `false` if the frame had already been completed.
    pub fn rollback(self) -> bool {
        self.completion.rollback()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.completion.complete_on_drop();
    }
}
