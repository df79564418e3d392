use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::models::config::RecorderConfig;
use crate::models::error::EngineError;
use crate::models::frame::{AmplitudeSample, AudioFormat, AudioFrame};
use crate::models::outcome::CaptureOutcome;
use crate::models::state::RecorderState;
use crate::processing::amplitude::{AmplitudeFeed, AmplitudeReducer};
use crate::processing::pcm::PcmCodec;
use crate::storage::{ArtifactId, SharedStore};
use crate::traits::codec::AudioCodec;
use crate::traits::delegate::RecorderDelegate;
use crate::traits::frame_source::{FrameSink, FrameSource, SourceEvent};

const WATCHDOG_POLL: Duration = Duration::from_millis(25);

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct RecorderShared {
    state: RecorderState,
    capture_start: Option<Instant>,
    paused_duration: Duration,
    last_pause: Option<Instant>,
    artifact: Option<ArtifactId>,
    reducer: Option<AmplitudeReducer>,
    last_seq: Option<u64>,
    frames_received: u64,
    frames_written: u64,
    samples_written: u64,
}

impl RecorderShared {
    fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            capture_start: None,
            paused_duration: Duration::ZERO,
            last_pause: None,
            artifact: None,
            reducer: None,
            last_seq: None,
            frames_received: 0,
            frames_written: 0,
            samples_written: 0,
        }
    }

    /// Wall-clock recording time, excluding pauses (including one still
    /// in progress).
    fn elapsed_secs(&self) -> f64 {
        let Some(start) = self.capture_start else {
            return 0.0;
        };
        let mut active = start.elapsed().saturating_sub(self.paused_duration);
        if let Some(pause_start) = self.last_pause {
            active = active.saturating_sub(pause_start.elapsed());
        }
        active.as_secs_f64()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// The capture state machine.
///
/// Owns the frame source lifecycle and splits every accepted frame two
/// ways with very different delivery guarantees:
///
/// ```text
/// [FrameSource] → intake ─┬→ [AmplitudeReducer] → [AmplitudeFeed]   (drop-oldest, never blocks)
///                         └→ [bounded frame queue] → writer thread
///                                → PCM encode → [ArtifactStore]     (blocking, never drops)
/// ```
///
/// Losing a waveform tick is cosmetic; losing a recorded frame is data
/// loss, so visualization backpressure never reaches the raw path.
pub struct RecordingController<S: FrameSource> {
    source: S,
    format: AudioFormat,
    config: RecorderConfig,
    store: SharedStore,
    shared: Arc<Mutex<RecorderShared>>,
    feed: Arc<Mutex<AmplitudeFeed>>,
    delegate: Option<Arc<dyn RecorderDelegate>>,

    frame_tx: Option<Sender<AudioFrame>>,
    writer_handle: Option<thread::JoinHandle<()>>,

    watchdog_running: Arc<AtomicBool>,
    watchdog_handle: Option<thread::JoinHandle<()>>,
}

impl<S: FrameSource> RecordingController<S> {
    pub fn new(source: S, store: SharedStore) -> Result<Self, EngineError> {
        Self::with_config(source, store, RecorderConfig::default())
    }

    pub fn with_config(
        source: S,
        store: SharedStore,
        config: RecorderConfig,
    ) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(EngineError::ParameterOutOfRange)?;
        let format = source.format();
        format.validate()?;
        let feed_capacity = config.amplitude_feed_capacity;
        Ok(Self {
            source,
            format,
            config,
            store,
            shared: Arc::new(Mutex::new(RecorderShared::new())),
            feed: Arc::new(Mutex::new(AmplitudeFeed::new(feed_capacity))),
            delegate: None,
            frame_tx: None,
            writer_handle: None,
            watchdog_running: Arc::new(AtomicBool::new(false)),
            watchdog_handle: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Current state, with the live duration filled in.
    pub fn state(&self) -> RecorderState {
        let mut shared = self.shared.lock();
        let elapsed = shared.elapsed_secs();
        match &mut shared.state {
            RecorderState::Recording { duration_secs }
            | RecorderState::Paused { duration_secs } => *duration_secs = elapsed,
            _ => {}
        }
        shared.state.clone()
    }

    /// Handle to the visualization queue. Consumers drain it at their
    /// own pace; falling behind only costs them the oldest ticks.
    pub fn amplitude_feed(&self) -> Arc<Mutex<AmplitudeFeed>> {
        Arc::clone(&self.feed)
    }

    /// Drain all unread amplitude ticks, oldest first.
    pub fn drain_amplitudes(&self) -> Vec<AmplitudeSample> {
        self.feed.lock().drain()
    }

    /// Acquire the source and begin capturing. Valid only from `Idle`.
    pub fn start(&mut self) -> Result<(), EngineError> {
        {
            let shared = self.shared.lock();
            if !shared.state.is_idle() {
                return Err(EngineError::InvalidTransition {
                    action: "start",
                    from: shared.state.name(),
                });
            }
        }
        if !self.source.is_available() {
            let error = EngineError::DeviceUnavailable;
            fail_session(&self.shared, &self.store, self.delegate.as_ref(), error.clone());
            return Err(error);
        }

        let artifact = self.store.lock().allocate(self.format);
        let (tx, rx) = bounded::<AudioFrame>(self.config.raw_queue_frames);

        {
            let mut shared = self.shared.lock();
            shared.reset();
            shared.artifact = Some(artifact);
            shared.reducer = Some(AmplitudeReducer::new(
                self.format,
                self.config.amplitude_window_ms,
            ));
            shared.capture_start = Some(Instant::now());
        }
        self.feed.lock().clear();

        self.spawn_writer(rx)?;

        let sink = self.make_sink(tx.clone());
        self.frame_tx = Some(tx);

        // Accept frames from the very first callback: the source may
        // start pushing before `start` returns.
        self.set_state(RecorderState::Recording { duration_secs: 0.0 });

        if let Err(error) = self.source.start(sink) {
            log::error!("frame source failed to start: {error}");
            self.teardown_threads();
            fail_session(&self.shared, &self.store, self.delegate.as_ref(), error.clone());
            return Err(error);
        }

        self.spawn_watchdog();
        log::debug!("recording started into {artifact}");
        Ok(())
    }

    /// Suspend frame intake. Valid only from `Recording`. Frames already
    /// queued for the raw artifact are still written.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        let duration = {
            let mut shared = self.shared.lock();
            if !shared.state.is_recording() {
                return Err(EngineError::InvalidTransition {
                    action: "pause",
                    from: shared.state.name(),
                });
            }
            shared.last_pause = Some(Instant::now());
            shared.elapsed_secs()
        };
        self.set_state(RecorderState::Paused {
            duration_secs: duration,
        });
        Ok(())
    }

    /// Resume frame intake. Valid only from `Paused`.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        let duration = {
            let mut shared = self.shared.lock();
            if !shared.state.is_paused() {
                return Err(EngineError::InvalidTransition {
                    action: "resume",
                    from: shared.state.name(),
                });
            }
            if let Some(pause_start) = shared.last_pause.take() {
                shared.paused_duration += pause_start.elapsed();
            }
            shared.elapsed_secs()
        };
        self.set_state(RecorderState::Recording {
            duration_secs: duration,
        });
        Ok(())
    }

    /// Stop capture, drain the write queue, seal the raw artifact and
    /// hand its handle back. Valid from `Recording` or `Paused`.
    pub fn stop(&mut self) -> Result<CaptureOutcome, EngineError> {
        {
            let shared = self.shared.lock();
            if let RecorderState::Failed { error, .. } = &shared.state {
                return Err(error.clone());
            }
            if !shared.state.is_active() {
                return Err(EngineError::InvalidTransition {
                    action: "stop",
                    from: shared.state.name(),
                });
            }
        }
        self.set_state(RecorderState::Stopped);

        if let Err(error) = self.source.stop() {
            log::warn!("frame source stop reported: {error}");
        }
        self.teardown_threads();

        // The writer may have failed the session while we were draining.
        let (artifact, frames, samples) = {
            let mut shared = self.shared.lock();
            if let RecorderState::Failed { error, .. } = &shared.state {
                return Err(error.clone());
            }
            let artifact = shared
                .artifact
                .take()
                .ok_or_else(|| EngineError::Storage("no capture artifact".into()))?;

            // Trailing partial amplitude window.
            if let Some(tail) = shared.reducer.as_mut().and_then(|r| r.flush()) {
                self.feed.lock().push(tail);
            }
            (artifact, shared.frames_written, shared.samples_written)
        };

        let sealed = self.store.lock().seal(artifact)?;
        let outcome = CaptureOutcome::new(&sealed, self.format, frames, samples);
        log::debug!(
            "capture finished: {} ({:.3}s, {} frames)",
            sealed.id,
            outcome.duration_secs,
            frames
        );

        if let Some(delegate) = &self.delegate {
            delegate.on_capture_finished(&outcome);
        }

        self.shared.lock().reset();
        self.set_state(RecorderState::Idle);
        Ok(outcome)
    }

    /// Abandon an in-progress capture and release its artifact. Valid
    /// from `Recording` or `Paused`.
    pub fn discard(&mut self) -> Result<(), EngineError> {
        {
            let shared = self.shared.lock();
            if !shared.state.is_active() {
                return Err(EngineError::InvalidTransition {
                    action: "discard",
                    from: shared.state.name(),
                });
            }
        }
        self.set_state(RecorderState::Stopped);

        if let Err(error) = self.source.stop() {
            log::warn!("frame source stop reported: {error}");
        }
        self.teardown_threads();

        let artifact = self.shared.lock().artifact.take();
        if let Some(id) = artifact {
            if let Err(error) = self.store.lock().release(id) {
                log::warn!("failed to release discarded capture {id}: {error}");
            }
        }

        self.shared.lock().reset();
        self.set_state(RecorderState::Idle);
        Ok(())
    }

    /// Leave the `Failed` state. The partial capture, if any, stays in
    /// the store for recovery.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        {
            let shared = self.shared.lock();
            if !shared.state.is_failed() {
                return Err(EngineError::InvalidTransition {
                    action: "reset",
                    from: shared.state.name(),
                });
            }
        }
        let _ = self.source.stop();
        self.teardown_threads();
        self.shared.lock().reset();
        self.set_state(RecorderState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: RecorderState) {
        self.shared.lock().state = new_state.clone();
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    /// Build the intake sink handed to the frame source.
    fn make_sink(&self, tx: Sender<AudioFrame>) -> FrameSink {
        let shared = Arc::clone(&self.shared);
        let feed = Arc::clone(&self.feed);
        let store = Arc::clone(&self.store);
        let delegate = self.delegate.clone();

        Arc::new(move |event: SourceEvent| match event {
            SourceEvent::Frame(frame) => {
                let ticks = {
                    let mut s = shared.lock();
                    s.frames_received += 1;
                    if !s.state.is_recording() {
                        log::debug!("dropping frame {} while {}", frame.seq, s.state.name());
                        return;
                    }
                    match s.reducer.as_mut() {
                        Some(reducer) => reducer.reduce(&frame),
                        None => Vec::new(),
                    }
                };
                if !ticks.is_empty() {
                    let mut feed = feed.lock();
                    for tick in ticks {
                        feed.push(tick);
                    }
                }
                // Blocking send: raw audio must not be lost.
                if tx.send(frame).is_err() {
                    log::warn!("raw frame queue closed; frame dropped at intake");
                }
            }
            SourceEvent::Closed => {
                log::debug!("frame source closed");
            }
            SourceEvent::Fault(error) => {
                log::error!("frame source fault: {error}");
                fail_session(&shared, &store, delegate.as_ref(), error);
            }
        })
    }

    /// Spawn the writer thread draining the bounded queue into the raw
    /// artifact, in strict sequence order.
    fn spawn_writer(&mut self, rx: Receiver<AudioFrame>) -> Result<(), EngineError> {
        let shared = Arc::clone(&self.shared);
        let store = Arc::clone(&self.store);
        let delegate = self.delegate.clone();

        let handle = thread::Builder::new()
            .name("raw-writer".into())
            .spawn(move || {
                let codec = PcmCodec;
                while let Ok(frame) = rx.recv() {
                    let artifact = {
                        let mut s = shared.lock();
                        if let Some(last) = s.last_seq {
                            if frame.seq <= last {
                                drop(s);
                                fail_session(
                                    &shared,
                                    &store,
                                    delegate.as_ref(),
                                    EngineError::FrameSequenceViolation {
                                        expected_after: last,
                                        got: frame.seq,
                                    },
                                );
                                return;
                            }
                        }
                        s.last_seq = Some(frame.seq);
                        s.artifact
                    };
                    let Some(artifact) = artifact else {
                        return;
                    };

                    let bytes = codec.encode(&frame.samples);
                    if let Err(error) = store.lock().append(artifact, &bytes) {
                        log::error!("raw append to {artifact} failed: {error}");
                        fail_session(&shared, &store, delegate.as_ref(), error);
                        return;
                    }

                    let mut s = shared.lock();
                    s.frames_written += 1;
                    s.samples_written += frame.samples.len() as u64;
                }
            })
            .map_err(|e| EngineError::Storage(format!("failed to spawn writer thread: {e}")))?;

        self.writer_handle = Some(handle);
        Ok(())
    }

    /// Spawn the first-frame watchdog: a source that never delivers is a
    /// dead device, not a silent hang.
    fn spawn_watchdog(&mut self) {
        self.watchdog_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.watchdog_running);
        let shared = Arc::clone(&self.shared);
        let store = Arc::clone(&self.store);
        let delegate = self.delegate.clone();
        let timeout = self.config.first_frame_timeout;

        let handle = thread::Builder::new()
            .name("first-frame-watchdog".into())
            .spawn(move || {
                let deadline = Instant::now() + timeout;
                while running.load(Ordering::SeqCst) && Instant::now() < deadline {
                    if shared.lock().frames_received > 0 {
                        return;
                    }
                    thread::sleep(WATCHDOG_POLL);
                }
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                let starved = {
                    let s = shared.lock();
                    s.frames_received == 0 && s.state.is_active()
                };
                if starved {
                    log::error!("no frames within {timeout:?}; treating device as unavailable");
                    fail_session(
                        &shared,
                        &store,
                        delegate.as_ref(),
                        EngineError::DeviceUnavailable,
                    );
                }
            });

        match handle {
            Ok(handle) => self.watchdog_handle = Some(handle),
            Err(e) => log::warn!("failed to spawn watchdog thread: {e}"),
        }
    }

    /// Close the frame queue and join worker threads. The sender inside
    /// the sink must already be gone (`FrameSource::stop` contract) for
    /// the writer to observe the close.
    fn teardown_threads(&mut self) {
        self.watchdog_running.store(false, Ordering::SeqCst);
        self.frame_tx = None;
        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.watchdog_handle.take() {
            let _ = handle.join();
        }
    }
}

impl<S: FrameSource> Drop for RecordingController<S> {
    fn drop(&mut self) {
        let _ = self.source.stop();
        self.teardown_threads();
    }
}

/// Move the session to `Failed`, sealing whatever audio landed before
/// the failure so it can be recovered.
fn fail_session(
    shared: &Arc<Mutex<RecorderShared>>,
    store: &SharedStore,
    delegate: Option<&Arc<dyn RecorderDelegate>>,
    error: EngineError,
) {
    let artifact = {
        let mut s = shared.lock();
        if s.state.is_failed() {
            return;
        }
        s.state = RecorderState::Failed {
            error: error.clone(),
            partial: None,
        };
        s.artifact.take()
    };

    let partial = artifact.and_then(|id| match store.lock().seal(id) {
        Ok(sealed) => Some(sealed.id),
        Err(seal_error) => {
            log::warn!("failed to seal partial capture {id}: {seal_error}");
            None
        }
    });

    let state = {
        let mut s = shared.lock();
        s.state = RecorderState::Failed {
            error: error.clone(),
            partial,
        };
        s.state.clone()
    };

    if let Some(delegate) = delegate {
        delegate.on_error(&error);
        delegate.on_state_changed(&state);
    }
}
