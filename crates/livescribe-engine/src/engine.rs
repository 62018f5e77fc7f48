use crate::loader::ModelLoader;
use crate::model::SpeechModel;
use crate::sink::ResultSink;
use crate::state::{EngineState, StateCell};
use crate::worker::{CycleContext, CycleReport, WorkerHandle};
use livescribe_audio::AudioSourceFactory;
use livescribe_core::EngineError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of a [`TranscriptionEngine::start`] call that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new worker was spawned for this cycle.
    Started { cycle: u64 },
    /// A cycle is already recording; nothing was spawned.
    AlreadyRecording,
    /// The previous worker is still finalizing; call `wait()` and retry.
    Busy,
}

/// Single-session streaming transcription.
///
/// `start()` spawns one worker thread that opens an audio source, creates a
/// decoder session, and emits partial hypotheses until `stop()` is observed,
/// then emits exactly one final hypothesis. `start()` and `stop()` never
/// block; `wait()` joins the worker.
pub struct TranscriptionEngine {
    state: Arc<StateCell>,
    model: Mutex<Option<Arc<dyn SpeechModel>>>,
    loader: ModelLoader,
    sources: Arc<dyn AudioSourceFactory>,
    sink: Arc<dyn ResultSink>,
    frame_size: usize,
    cycles: AtomicU64,
    worker: Mutex<Option<WorkerHandle>>,
    last_report: Mutex<Option<CycleReport>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TranscriptionEngine {
    pub fn new(
        loader: ModelLoader,
        sources: Arc<dyn AudioSourceFactory>,
        sink: Arc<dyn ResultSink>,
        frame_size: usize,
    ) -> Self {
        Self {
            state: Arc::new(StateCell::new(EngineState::Idle)),
            model: Mutex::new(None),
            loader,
            sources,
            sink,
            frame_size: frame_size.max(1),
            cycles: AtomicU64::new(0),
            worker: Mutex::new(None),
            last_report: Mutex::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.load()
    }

    pub fn is_recording(&self) -> bool {
        self.state() == EngineState::Recording
    }

    pub fn has_model(&self) -> bool {
        lock(&self.model).is_some()
    }

    /// Resolve and load a model by name, replacing any model already held.
    ///
    /// Rejected while a cycle is active. A failed load leaves no model set.
    pub fn load(&self, model_name: &str, scorer_name: &str) -> Result<(), EngineError> {
        let mut slot = lock(&self.model);
        self.ensure_idle("load() called while a transcription cycle is active")?;

        match self.loader.load(model_name, scorer_name) {
            Ok(model) => {
                *slot = Some(model);
                Ok(())
            }
            Err(e) => {
                *slot = None;
                Err(e.into())
            }
        }
    }

    /// Boolean form of [`load`](Self::load); failures are logged.
    pub fn load_from_name(&self, model_name: &str, scorer_name: &str) -> bool {
        match self.load(model_name, scorer_name) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(model = model_name, scorer = scorer_name, "{e}");
                false
            }
        }
    }

    /// Install an already-constructed model. Same preconditions as `load`.
    pub fn install_model(&self, model: Arc<dyn SpeechModel>) -> Result<(), EngineError> {
        let mut slot = lock(&self.model);
        self.ensure_idle("install_model() called while a transcription cycle is active")?;
        tracing::info!(model = %model.name(), "model installed");
        *slot = Some(model);
        Ok(())
    }

    /// Begin a transcription cycle on a new worker thread.
    pub fn start(&self) -> Result<StartOutcome, EngineError> {
        let model = {
            let slot = lock(&self.model);
            let model = match slot.as_ref() {
                Some(model) => Arc::clone(model),
                None if self.state() == EngineState::Disposed => return Err(EngineError::Disposed),
                None => {
                    return Err(EngineError::PreconditionViolation(
                        "start() called before a model was loaded",
                    ))
                }
            };

            if let Err(current) = self
                .state
                .transition(EngineState::Idle, EngineState::Recording)
            {
                return match current {
                    EngineState::Recording => Ok(StartOutcome::AlreadyRecording),
                    EngineState::Finalizing => {
                        tracing::debug!("start() rejected, previous cycle still finalizing");
                        Ok(StartOutcome::Busy)
                    }
                    EngineState::Disposed => Err(EngineError::Disposed),
                    EngineState::Idle => Ok(StartOutcome::Busy),
                };
            }
            model
        };

        // The previous worker stored Idle before exiting, so this join is immediate.
        self.reap_worker();

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let ctx = CycleContext {
            cycle,
            model,
            sources: Arc::clone(&self.sources),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            frame_size: self.frame_size,
        };

        match WorkerHandle::spawn(ctx) {
            Ok(handle) => {
                *lock(&self.worker) = Some(handle);
                Ok(StartOutcome::Started { cycle })
            }
            Err(e) => {
                self.state.store(EngineState::Idle);
                Err(EngineError::Spawn(e.to_string()))
            }
        }
    }

    /// Request that the current cycle stop after its in-flight frame.
    ///
    /// Returns `true` if a recording cycle was asked to stop. Does not wait
    /// for the worker; capture may continue for up to one frame.
    pub fn stop(&self) -> bool {
        let requested = self
            .state
            .transition(EngineState::Recording, EngineState::Finalizing)
            .is_ok();
        if requested {
            tracing::debug!("stop requested");
        }
        requested
    }

    /// Join the current worker, if any, and return its report.
    ///
    /// Without an active worker, returns the report of a cycle that was
    /// reaped by a later `start()`/`dispose()` and not yet collected.
    pub fn wait(&self) -> Option<CycleReport> {
        let handle = lock(&self.worker).take();
        match handle {
            Some(handle) => handle.join(),
            None => lock(&self.last_report).take(),
        }
    }

    /// Release the model. The engine cannot be used afterwards.
    ///
    /// Rejected while a cycle is recording or finalizing; stop and `wait()`
    /// first. Disposing twice is a no-op.
    pub fn dispose(&self) -> Result<(), EngineError> {
        let mut slot = lock(&self.model);
        match self
            .state
            .transition(EngineState::Idle, EngineState::Disposed)
        {
            Ok(()) => {}
            Err(EngineState::Disposed) => return Ok(()),
            Err(_) => {
                return Err(EngineError::PreconditionViolation(
                    "dispose() called while a transcription cycle is active",
                ))
            }
        }

        self.reap_worker();
        *slot = None;
        tracing::info!("engine disposed");
        Ok(())
    }

    fn ensure_idle(&self, violation: &'static str) -> Result<(), EngineError> {
        match self.state() {
            EngineState::Idle => Ok(()),
            EngineState::Disposed => Err(EngineError::Disposed),
            EngineState::Recording | EngineState::Finalizing => {
                Err(EngineError::PreconditionViolation(violation))
            }
        }
    }

    fn reap_worker(&self) {
        let handle = lock(&self.worker).take();
        if let Some(report) = handle.and_then(WorkerHandle::join) {
            *lock(&self.last_report) = Some(report);
        }
    }
}

impl Drop for TranscriptionEngine {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = lock(&self.worker).take() {
            handle.join();
        }
    }
}
