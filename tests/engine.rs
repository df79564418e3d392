//! End-to-end scenarios: capture through a scripted frame source, then
//! edit the sealed capture through a project.

use std::sync::Arc;

use parking_lot::Mutex;

use audio_edit_core::{
    ArtifactStore, AudioFormat, AudioFrame, AudioProject, CaptureOutcome, EditCommand,
    EngineError, FrameSink, FrameSource, MemoryArtifactStore, RecorderDelegate, RecorderState,
    RecordingController, SharedStore, SourceEvent,
};

/// Frame source driven by the test: events are pushed by hand through
/// the captured sink.
struct ScriptedSource {
    format: AudioFormat,
    sink: Arc<Mutex<Option<FrameSink>>>,
}

impl ScriptedSource {
    fn new(format: AudioFormat) -> (Self, Arc<Mutex<Option<FrameSink>>>) {
        let sink = Arc::new(Mutex::new(None));
        (
            Self {
                format,
                sink: Arc::clone(&sink),
            },
            sink,
        )
    }
}

impl FrameSource for ScriptedSource {
    fn is_available(&self) -> bool {
        true
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn start(&mut self, sink: FrameSink) -> Result<(), EngineError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        *self.sink.lock() = None;
        Ok(())
    }
}

fn push_frame(sink: &Arc<Mutex<Option<FrameSink>>>, seq: u64, samples: Vec<f32>) {
    let sink = sink.lock().clone().expect("source not started");
    sink(SourceEvent::Frame(AudioFrame::new(seq, samples)));
}

fn shared_store() -> (SharedStore, Arc<Mutex<MemoryArtifactStore>>) {
    let concrete = Arc::new(Mutex::new(MemoryArtifactStore::new()));
    let store: SharedStore = concrete.clone();
    (store, concrete)
}

/// Record `secs` of a synthetic tone at 44.1kHz mono in 10ms frames and
/// return the sealed capture. Distinct amplitudes yield distinct content
/// addresses, which matters because the store dedupes identical audio.
fn capture_tone_at(store: SharedStore, secs: f64, amplitude: f32) -> CaptureOutcome {
    let format = AudioFormat::mono(44_100);
    let (source, sink) = ScriptedSource::new(format);
    let mut controller = RecordingController::new(source, store).unwrap();

    controller.start().unwrap();
    let frame_len = 441; // 10ms
    let frames = (secs * 100.0).round() as u64;
    for seq in 0..frames {
        let samples: Vec<f32> = (0..frame_len)
            .map(|i| amplitude * ((seq * frame_len as u64 + i) as f32 * 0.01).sin())
            .collect();
        push_frame(&sink, seq, samples);
    }
    controller.stop().unwrap()
}

fn capture_tone(store: SharedStore, secs: f64) -> CaptureOutcome {
    capture_tone_at(store, secs, 0.2)
}

#[test]
fn capture_three_seconds_then_trim_undo_redo() {
    let (store, _) = shared_store();
    let outcome = capture_tone(Arc::clone(&store), 3.0);

    assert_eq!(outcome.frames, 300);
    assert!((outcome.duration_secs - 3.0).abs() < 0.011); // ±one frame
    assert_eq!(outcome.checksum.len(), 64);

    let mut project = AudioProject::new(store, outcome.artifact).unwrap();
    assert!((project.duration_secs().unwrap() - 3.0).abs() < 0.011);

    project
        .apply_edit(EditCommand::Trim {
            start_secs: 0.5,
            end_secs: 2.5,
        })
        .unwrap();
    assert!((project.duration_secs().unwrap() - 2.0).abs() < 1e-6);

    project.undo().unwrap();
    assert!((project.duration_secs().unwrap() - 3.0).abs() < 0.011);

    project.redo().unwrap();
    assert!((project.duration_secs().unwrap() - 2.0).abs() < 1e-6);
}

#[test]
fn pitch_shift_then_double_noise_reduction_coalesces() {
    let (store, store_inner) = shared_store();
    let outcome = capture_tone(Arc::clone(&store), 1.0);

    let mut project = AudioProject::new(store, outcome.artifact).unwrap();
    project
        .apply_edit(EditCommand::PitchShift { ratio: 1.5 })
        .unwrap();
    project.apply_edit(EditCommand::NoiseReduction).unwrap();

    let artifact = project.current_artifact().unwrap();
    let bytes = store_inner.lock().read(artifact).unwrap();

    // Second consecutive noise reduction is coalesced away: the history
    // stores it once and the output is unchanged.
    project.apply_edit(EditCommand::NoiseReduction).unwrap();
    assert_eq!(project.history().active().len(), 2);
    let after = project.current_artifact().unwrap();
    assert_eq!(after, artifact);
    assert_eq!(store_inner.lock().read(after).unwrap(), bytes);

    // 1.5x pitch shortens 1.0s to ~0.667s.
    assert!((project.duration_secs().unwrap() - 1.0 / 1.5).abs() < 1e-3);
}

#[test]
fn apply_after_undo_discards_redo_buffer() {
    let (store, _) = shared_store();
    let outcome = capture_tone(Arc::clone(&store), 2.0);
    let mut project = AudioProject::new(store, outcome.artifact).unwrap();

    project
        .apply_edit(EditCommand::ToneChange {
            profile: "warm".into(),
        })
        .unwrap();
    project
        .apply_edit(EditCommand::PitchShift { ratio: 0.8 })
        .unwrap();
    project.undo().unwrap();
    project.apply_edit(EditCommand::NoiseReduction).unwrap();

    assert_eq!(project.redo(), Err(EngineError::NothingToRedo));
    assert_eq!(project.history().active().len(), 2);
}

#[test]
fn mix_with_missing_reference_mutates_nothing() {
    let (store, store_inner) = shared_store();
    let outcome = capture_tone(Arc::clone(&store), 1.0);

    // A second capture that is then released, leaving a dangling handle.
    let dangling = capture_tone_at(Arc::clone(&store), 1.0, 0.5).artifact;
    store_inner.lock().release(dangling).unwrap();

    let mut project = AudioProject::new(store, outcome.artifact).unwrap();
    let before = project.current_artifact().unwrap();

    let result = project.apply_edit(EditCommand::Mix {
        source: dangling,
        gain: 0.5,
    });
    assert_eq!(result, Err(EngineError::MissingReference(dangling)));
    assert!(project.history().active().is_empty());
    assert_eq!(project.current_artifact().unwrap(), before);
}

#[test]
fn mix_blends_a_background_track() {
    let (store, store_inner) = shared_store();
    let voice = capture_tone(Arc::clone(&store), 2.0);
    let background = capture_tone(Arc::clone(&store), 1.0);

    let mut project = AudioProject::new(store, voice.artifact).unwrap();
    project
        .apply_edit(EditCommand::Mix {
            source: background.artifact,
            gain: 0.25,
        })
        .unwrap();

    // Mixing never shortens the primary track.
    assert!((project.duration_secs().unwrap() - 2.0).abs() < 1e-3);
    let artifact = project.current_artifact().unwrap();
    assert!(store_inner.lock().is_sealed(artifact));
}

#[test]
fn deterministic_re_export_after_history_detours() {
    let (store, store_inner) = shared_store();
    let outcome = capture_tone(Arc::clone(&store), 2.0);
    let mut project = AudioProject::new(store, outcome.artifact).unwrap();

    project
        .apply_edit(EditCommand::Trim {
            start_secs: 0.2,
            end_secs: 1.8,
        })
        .unwrap();
    project
        .apply_edit(EditCommand::ToneChange {
            profile: "bright".into(),
        })
        .unwrap();
    let artifact_a = project.current_artifact().unwrap();
    let export_a = store_inner.lock().read(artifact_a).unwrap();

    // Wander the history and come back to the same active commands.
    project.undo().unwrap();
    project.undo().unwrap();
    project.redo().unwrap();
    project.redo().unwrap();

    let artifact_b = project.current_artifact().unwrap();
    let export_b = store_inner.lock().read(artifact_b).unwrap();
    assert_eq!(export_a, export_b);
}

#[test]
fn pause_rejects_frames_and_keeps_accumulated_audio() {
    let format = AudioFormat::mono(44_100);
    let (source, sink) = ScriptedSource::new(format);
    let (store, _) = shared_store();
    let mut controller = RecordingController::new(source, store).unwrap();

    controller.start().unwrap();
    for seq in 0..100 {
        push_frame(&sink, seq, vec![0.1; 441]);
    }

    controller.pause().unwrap();
    assert!(controller.state().is_paused());
    for seq in 100..200 {
        push_frame(&sink, seq, vec![0.9; 441]);
    }

    controller.resume().unwrap();
    for seq in 200..300 {
        push_frame(&sink, seq, vec![0.1; 441]);
    }

    let outcome = controller.stop().unwrap();
    // The paused second never lands in the raw capture.
    assert_eq!(outcome.frames, 200);
    assert!((outcome.duration_secs - 2.0).abs() < 1e-9);
}

#[test]
fn amplitude_feed_tracks_capture_without_gating_it() {
    let format = AudioFormat::mono(44_100);
    let (source, sink) = ScriptedSource::new(format);
    let (store, _) = shared_store();
    let mut controller = RecordingController::new(source, store).unwrap();

    controller.start().unwrap();
    for seq in 0..300 {
        push_frame(&sink, seq, vec![0.5; 441]);
    }
    let outcome = controller.stop().unwrap();
    assert_eq!(outcome.frames, 300);

    let ticks = controller.drain_amplitudes();
    assert!(!ticks.is_empty());
    // Default feed capacity bounds the backlog regardless of how many
    // ticks were produced.
    assert!(ticks.len() <= 256);
    for tick in &ticks {
        assert!((tick.value - 0.5).abs() < 1e-3);
    }
    // Tick indices stay monotone even after drops.
    for pair in ticks.windows(2) {
        assert!(pair[0].tick < pair[1].tick);
    }
}

#[derive(Default)]
struct RecordingEvents {
    states: Mutex<Vec<&'static str>>,
    finished: Mutex<Vec<CaptureOutcome>>,
    errors: Mutex<Vec<EngineError>>,
}

impl RecorderDelegate for RecordingEvents {
    fn on_state_changed(&self, state: &RecorderState) {
        self.states.lock().push(state.name());
    }

    fn on_error(&self, error: &EngineError) {
        self.errors.lock().push(error.clone());
    }

    fn on_capture_finished(&self, outcome: &CaptureOutcome) {
        self.finished.lock().push(outcome.clone());
    }
}

#[test]
fn delegate_observes_lifecycle() {
    let format = AudioFormat::mono(44_100);
    let (source, sink) = ScriptedSource::new(format);
    let (store, _) = shared_store();
    let mut controller = RecordingController::new(source, store).unwrap();

    let events = Arc::new(RecordingEvents::default());
    controller.set_delegate(events.clone());

    controller.start().unwrap();
    push_frame(&sink, 0, vec![0.1; 441]);
    controller.pause().unwrap();
    controller.resume().unwrap();
    let outcome = controller.stop().unwrap();

    assert_eq!(
        *events.states.lock(),
        vec!["recording", "paused", "recording", "stopped", "idle"]
    );
    let finished = events.finished.lock();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].artifact, outcome.artifact);
    assert!(events.errors.lock().is_empty());
}
