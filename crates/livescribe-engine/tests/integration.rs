use livescribe_audio::{AudioSource, AudioSourceFactory, FrameRead};
use livescribe_core::{AudioError, CycleError, DecodeError, EngineError, TranscriptEvent};
use livescribe_engine::{
    DecoderSession, EngineState, ModelLoader, ResultSink, SpeechModel, StartOutcome,
    TranscriptionEngine,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::time::Duration;

const FRAME_SIZE: usize = 160;
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ── Probe ─────────────────────────────────────────────────────

#[derive(Default)]
struct Probe {
    opens: AtomicUsize,
    source_stops: AtomicUsize,
    source_drops: AtomicUsize,
    sessions_created: AtomicUsize,
    sessions_finished: AtomicUsize,
    sessions_dropped: AtomicUsize,
}

fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

// ── Scripted audio source ─────────────────────────────────────

struct ScriptedFactory {
    probe: Arc<Probe>,
    fail_open: bool,
    open_gate: Option<Arc<Barrier>>,
    permits: Mutex<Option<mpsc::Receiver<()>>>,
    frame_limit: Option<usize>,
    fail_read_at: Option<usize>,
}

impl ScriptedFactory {
    fn free_running(probe: &Arc<Probe>) -> Self {
        Self {
            probe: Arc::clone(probe),
            fail_open: false,
            open_gate: None,
            permits: Mutex::new(None),
            frame_limit: None,
            fail_read_at: None,
        }
    }

    /// Each read waits for one permit; dropping the sender ends the stream.
    fn permitted(probe: &Arc<Probe>) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let factory = Self {
            permits: Mutex::new(Some(rx)),
            ..Self::free_running(probe)
        };
        (factory, tx)
    }
}

impl AudioSourceFactory for ScriptedFactory {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn open(&self, sample_rate: u32, _frame_size: usize) -> Result<Box<dyn AudioSource>, AudioError> {
        bump(&self.probe.opens);
        if let Some(gate) = &self.open_gate {
            gate.wait();
        }
        if self.fail_open {
            return Err(AudioError::DeviceNotFound("scripted mic".to_string()));
        }
        Ok(Box::new(ScriptedSource {
            probe: Arc::clone(&self.probe),
            permits: self.permits.lock().unwrap().take(),
            frame_limit: self.frame_limit,
            fail_read_at: self.fail_read_at,
            reads: 0,
            sample_rate,
        }))
    }
}

struct ScriptedSource {
    probe: Arc<Probe>,
    permits: Option<mpsc::Receiver<()>>,
    frame_limit: Option<usize>,
    fail_read_at: Option<usize>,
    reads: usize,
    sample_rate: u32,
}

impl AudioSource for ScriptedSource {
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<FrameRead, AudioError> {
        self.reads += 1;
        if self.fail_read_at == Some(self.reads) {
            return Err(AudioError::StreamError("device unplugged".to_string()));
        }
        if matches!(self.frame_limit, Some(limit) if self.reads > limit) {
            return Ok(FrameRead::EndOfStream);
        }
        match &self.permits {
            Some(rx) => {
                if rx.recv().is_err() {
                    return Ok(FrameRead::EndOfStream);
                }
            }
            None => std::thread::sleep(Duration::from_millis(1)),
        }
        frame.fill(self.reads as i16);
        Ok(FrameRead::Full)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        bump(&self.probe.source_stops);
        Ok(())
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        bump(&self.probe.source_drops);
    }
}

// ── Scripted model ────────────────────────────────────────────

struct ScriptedModel {
    probe: Arc<Probe>,
    feed_fails_at: Option<usize>,
    finish_gate: Option<Arc<Barrier>>,
}

impl ScriptedModel {
    fn new(probe: &Arc<Probe>) -> Self {
        Self {
            probe: Arc::clone(probe),
            feed_fails_at: None,
            finish_gate: None,
        }
    }
}

impl SpeechModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn sample_rate(&self) -> u32 {
        16000
    }

    fn create_session(&self) -> Result<Box<dyn DecoderSession>, DecodeError> {
        bump(&self.probe.sessions_created);
        Ok(Box::new(ScriptedSession {
            probe: Arc::clone(&self.probe),
            fed: 0,
            feed_fails_at: self.feed_fails_at,
            finish_gate: self.finish_gate.clone(),
        }))
    }
}

struct ScriptedSession {
    probe: Arc<Probe>,
    fed: usize,
    feed_fails_at: Option<usize>,
    finish_gate: Option<Arc<Barrier>>,
}

impl DecoderSession for ScriptedSession {
    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError> {
        assert_eq!(samples.len(), FRAME_SIZE);
        self.fed += 1;
        if self.feed_fails_at == Some(self.fed) {
            return Err(DecodeError::Feed("corrupt frame".to_string()));
        }
        Ok(())
    }

    fn intermediate_decode(&mut self) -> Result<String, DecodeError> {
        Ok(format!("partial {}", self.fed))
    }

    fn finish(self: Box<Self>) -> Result<String, DecodeError> {
        if let Some(gate) = &self.finish_gate {
            gate.wait();
        }
        bump(&self.probe.sessions_finished);
        if self.fed == 0 {
            return Ok(String::new());
        }
        Ok(format!("final {}", self.fed))
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        bump(&self.probe.sessions_dropped);
    }
}

// ── Recording sink ────────────────────────────────────────────

struct RecordingSink {
    tx: Mutex<mpsc::Sender<TranscriptEvent>>,
}

impl ResultSink for RecordingSink {
    fn emit(&self, event: TranscriptEvent) {
        let _ = self.tx.lock().unwrap().send(event);
    }
}

fn recording_sink() -> (Arc<RecordingSink>, mpsc::Receiver<TranscriptEvent>) {
    let (tx, rx) = mpsc::channel();
    (Arc::new(RecordingSink { tx: Mutex::new(tx) }), rx)
}

fn drain(rx: &mpsc::Receiver<TranscriptEvent>) -> Vec<TranscriptEvent> {
    rx.try_iter().collect()
}

fn engine_with(
    factory: ScriptedFactory,
    model: ScriptedModel,
    sink: Arc<RecordingSink>,
) -> TranscriptionEngine {
    let engine = TranscriptionEngine::new(
        ModelLoader::new("/nonexistent/models", "null"),
        Arc::new(factory),
        sink,
        FRAME_SIZE,
    );
    engine.install_model(Arc::new(model)).unwrap();
    engine
}

/// Zero or more partials, then exactly one final, then nothing.
fn assert_well_formed_cycle(events: &[TranscriptEvent]) {
    let (last, partials) = events.split_last().expect("cycle emitted no events");
    assert!(last.is_final, "last event must be final: {:?}", events);
    assert!(partials.iter().all(|e| !e.is_final), "final emitted early: {:?}", events);
}

// ── Tests ─────────────────────────────────────────────────────

#[test]
fn test_five_frames_then_stop_yields_partials_then_one_final() {
    let probe = Arc::new(Probe::default());
    let (factory, permits) = ScriptedFactory::permitted(&probe);
    let (sink, rx) = recording_sink();
    let engine = engine_with(factory, ScriptedModel::new(&probe), sink);

    assert_eq!(engine.start().unwrap(), StartOutcome::Started { cycle: 1 });
    for i in 1..=5 {
        permits.send(()).unwrap();
        let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(event, TranscriptEvent::partial(1, format!("partial {i}")));
    }

    assert!(engine.stop());
    // Unblock the read the worker is parked in.
    drop(permits);

    let report = engine.wait().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.partials, 5);
    assert_eq!(report.final_text.as_deref(), Some("final 5"));

    let rest = drain(&rx);
    assert_eq!(rest, vec![TranscriptEvent::final_result(1, "final 5")]);
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_stop_before_first_frame_still_emits_one_final() {
    let probe = Arc::new(Probe::default());
    let gate = Arc::new(Barrier::new(2));
    let factory = ScriptedFactory {
        open_gate: Some(Arc::clone(&gate)),
        ..ScriptedFactory::free_running(&probe)
    };
    let (sink, rx) = recording_sink();
    let engine = engine_with(factory, ScriptedModel::new(&probe), sink);

    engine.start().unwrap();
    assert!(engine.stop());
    gate.wait();

    let report = engine.wait().unwrap();
    assert_eq!(report.frames, 0);
    assert_eq!(drain(&rx), vec![TranscriptEvent::final_result(1, "")]);
    assert_eq!(count(&probe.sessions_finished), 1);
}

#[test]
fn test_double_start_spawns_one_worker() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    assert_eq!(engine.start().unwrap(), StartOutcome::Started { cycle: 1 });
    assert_eq!(engine.start().unwrap(), StartOutcome::AlreadyRecording);

    rx.recv_timeout(RECV_TIMEOUT).unwrap();
    engine.stop();
    engine.wait().unwrap();

    assert_eq!(count(&probe.opens), 1);
    assert_eq!(count(&probe.sessions_created), 1);
}

#[test]
fn test_stop_when_idle_is_noop() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    assert!(!engine.stop());
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.wait().is_none());
    assert!(drain(&rx).is_empty());
    assert_eq!(count(&probe.opens), 0);
}

#[test]
fn test_restart_after_full_cycle() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    for cycle in 1..=3u64 {
        assert_eq!(engine.start().unwrap(), StartOutcome::Started { cycle });
        rx.recv_timeout(RECV_TIMEOUT).unwrap();
        engine.stop();
        let report = engine.wait().unwrap();
        assert_eq!(report.cycle, cycle);
        assert!(report.is_complete());
    }

    assert_eq!(count(&probe.opens), 3);
    assert_eq!(count(&probe.sessions_created), 3);
    assert_eq!(count(&probe.source_drops), 3);
    assert_eq!(count(&probe.sessions_dropped), 3);
}

#[test]
fn test_events_are_well_formed_per_cycle() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    for _ in 0..3 {
        engine.start().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        engine.stop();
        engine.wait().unwrap();
    }

    let events = drain(&rx);
    for cycle in 1..=3u64 {
        let cycle_events: Vec<_> = events.iter().filter(|e| e.cycle == cycle).cloned().collect();
        assert_well_formed_cycle(&cycle_events);
    }
    // Cycles never interleave.
    let cycles: Vec<u64> = events.iter().map(|e| e.cycle).collect();
    let mut sorted = cycles.clone();
    sorted.sort();
    assert_eq!(cycles, sorted);
}

#[test]
fn test_resources_released_once_on_normal_stop() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    engine.start().unwrap();
    rx.recv_timeout(RECV_TIMEOUT).unwrap();
    engine.stop();
    engine.wait().unwrap();

    assert_eq!(count(&probe.source_stops), 1);
    assert_eq!(count(&probe.source_drops), 1);
    assert_eq!(count(&probe.sessions_finished), 1);
    assert_eq!(count(&probe.sessions_dropped), 1);
}

#[test]
fn test_device_open_failure_emits_nothing_and_releases_session() {
    let probe = Arc::new(Probe::default());
    let factory = ScriptedFactory {
        fail_open: true,
        ..ScriptedFactory::free_running(&probe)
    };
    let (sink, rx) = recording_sink();
    let engine = engine_with(factory, ScriptedModel::new(&probe), sink);

    engine.start().unwrap();
    let report = engine.wait().unwrap();

    assert!(matches!(report.outcome, Err(CycleError::DeviceUnavailable(_))));
    assert!(report.final_text.is_none());
    assert!(drain(&rx).is_empty());
    assert_eq!(engine.state(), EngineState::Idle);

    assert_eq!(count(&probe.sessions_created), 1);
    assert_eq!(count(&probe.sessions_finished), 0);
    assert_eq!(count(&probe.sessions_dropped), 1);
    assert_eq!(count(&probe.source_drops), 0);

    // The engine is immediately usable again.
    assert_eq!(engine.start().unwrap(), StartOutcome::Started { cycle: 2 });
    engine.wait();
}

#[test]
fn test_read_failure_aborts_cycle_without_final() {
    let probe = Arc::new(Probe::default());
    let factory = ScriptedFactory {
        fail_read_at: Some(3),
        ..ScriptedFactory::free_running(&probe)
    };
    let (sink, rx) = recording_sink();
    let engine = engine_with(factory, ScriptedModel::new(&probe), sink);

    engine.start().unwrap();
    let report = engine.wait().unwrap();

    assert!(matches!(report.outcome, Err(CycleError::Capture(_))));
    assert_eq!(report.partials, 2);
    let events = drain(&rx);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| !e.is_final));

    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(count(&probe.sessions_finished), 0);
    assert_eq!(count(&probe.sessions_dropped), 1);
    assert_eq!(count(&probe.source_stops), 1);
    assert_eq!(count(&probe.source_drops), 1);
}

#[test]
fn test_decode_failure_aborts_cycle_without_final() {
    let probe = Arc::new(Probe::default());
    let model = ScriptedModel {
        feed_fails_at: Some(2),
        ..ScriptedModel::new(&probe)
    };
    let (sink, rx) = recording_sink();
    let engine = engine_with(ScriptedFactory::free_running(&probe), model, sink);

    engine.start().unwrap();
    let report = engine.wait().unwrap();

    assert!(matches!(report.outcome, Err(CycleError::Decode(_))));
    assert_eq!(drain(&rx), vec![TranscriptEvent::partial(1, "partial 1")]);
    assert_eq!(count(&probe.sessions_dropped), 1);
    assert_eq!(count(&probe.source_drops), 1);
}

#[test]
fn test_end_of_stream_finalizes_without_stop() {
    let probe = Arc::new(Probe::default());
    let factory = ScriptedFactory {
        frame_limit: Some(3),
        ..ScriptedFactory::free_running(&probe)
    };
    let (sink, rx) = recording_sink();
    let engine = engine_with(factory, ScriptedModel::new(&probe), sink);

    engine.start().unwrap();
    let report = engine.wait().unwrap();

    assert!(report.is_complete());
    assert_eq!(report.frames, 3);
    let events = drain(&rx);
    assert_eq!(events.len(), 4);
    assert_well_formed_cycle(&events);
    assert_eq!(events[3].text, "final 3");
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_start_while_finalizing_is_busy() {
    let probe = Arc::new(Probe::default());
    let gate = Arc::new(Barrier::new(2));
    let model = ScriptedModel {
        finish_gate: Some(Arc::clone(&gate)),
        ..ScriptedModel::new(&probe)
    };
    let (sink, rx) = recording_sink();
    let engine = engine_with(ScriptedFactory::free_running(&probe), model, sink);

    engine.start().unwrap();
    rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert!(engine.stop());

    // The worker cannot leave Finalizing until the gate opens.
    assert_eq!(engine.state(), EngineState::Finalizing);
    assert_eq!(engine.start().unwrap(), StartOutcome::Busy);
    assert!(!engine.stop());

    gate.wait();
    engine.wait().unwrap();
    assert_eq!(engine.start().unwrap(), StartOutcome::Started { cycle: 2 });
    engine.stop();
    gate.wait();
    engine.wait().unwrap();
    assert_eq!(count(&probe.opens), 2);
}

#[test]
fn test_dispose_while_recording_is_rejected() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    engine.start().unwrap();
    rx.recv_timeout(RECV_TIMEOUT).unwrap();

    assert!(matches!(
        engine.dispose(),
        Err(EngineError::PreconditionViolation(_))
    ));
    assert!(engine.has_model());

    // The in-flight cycle is unaffected and still completes normally.
    engine.stop();
    let report = engine.wait().unwrap();
    assert!(report.is_complete());

    engine.dispose().unwrap();
    assert_eq!(engine.state(), EngineState::Disposed);
    assert!(!engine.has_model());
    assert!(matches!(engine.start(), Err(EngineError::Disposed)));
    engine.dispose().unwrap();
}

#[test]
fn test_start_without_model_is_precondition_violation() {
    let probe = Arc::new(Probe::default());
    let (sink, _rx) = recording_sink();
    let engine = TranscriptionEngine::new(
        ModelLoader::new("/nonexistent/models", "null"),
        Arc::new(ScriptedFactory::free_running(&probe)),
        sink,
        FRAME_SIZE,
    );

    assert!(matches!(
        engine.start(),
        Err(EngineError::PreconditionViolation(_))
    ));
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(count(&probe.opens), 0);
}

#[test]
fn test_load_rejected_while_recording() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    engine.start().unwrap();
    rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert!(matches!(
        engine.load("m.tflite", "m.scorer"),
        Err(EngineError::PreconditionViolation(_))
    ));
    assert!(engine.has_model());

    engine.stop();
    engine.wait().unwrap();
}

#[test]
fn test_drop_stops_and_joins_worker() {
    let probe = Arc::new(Probe::default());
    let (sink, rx) = recording_sink();
    let engine = engine_with(
        ScriptedFactory::free_running(&probe),
        ScriptedModel::new(&probe),
        sink,
    );

    engine.start().unwrap();
    rx.recv_timeout(RECV_TIMEOUT).unwrap();
    drop(engine);

    assert_eq!(count(&probe.source_drops), 1);
    assert_eq!(count(&probe.sessions_dropped), 1);
    let events = drain(&rx);
    assert!(events.last().map(|e| e.is_final).unwrap_or(false));
}
