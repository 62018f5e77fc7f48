use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a [`TranscriptionEngine`](crate::TranscriptionEngine).
///
/// `Recording` means a worker may keep capturing. `Finalizing` means stop was
/// requested (or the source ran dry) but the worker has not yet released its
/// session and source. Only the worker moves the engine back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Recording = 1,
    Finalizing = 2,
    Disposed = 3,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => EngineState::Recording,
            2 => EngineState::Finalizing,
            3 => EngineState::Disposed,
            _ => EngineState::Idle,
        }
    }
}

/// The one piece of state shared between the caller thread and the worker.
///
/// Transitions publish with Release and observe with Acquire, so everything
/// the worker did before storing `Idle` is visible to the caller that sees it.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: EngineState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Compare-and-set `from → to`. On failure returns the state actually observed.
    pub(crate) fn transition(&self, from: EngineState, to: EngineState) -> Result<(), EngineState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(EngineState::from_u8)
    }

    pub(crate) fn store(&self, state: EngineState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
