use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use arc_swap::ArcSwap;
use vs_audio::{AudioError, FeatureExtractor};
use vs_core::buffer::AudioBuffer;
use vs_core::config::{CaptureConfig, VoiceConfig};
use vs_core::features::FeatureSet;
use vs_core::report::DiagnosticReport;
use vs_core::traits::Recorder;

/// Pause between attempts after a failed capture, so an unplugged device
/// does not spin the worker.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// How long a paused worker blocks on the command channel per poll.
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Commandes envoyées au thread de session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Pause,
    Resume,
    Quit,
}

/// Ce que le thread de session publie.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One completed cycle. `elapsed` covers extraction and rule evaluation.
    Cycle {
        features: FeatureSet,
        report: DiagnosticReport,
        elapsed: Duration,
    },
    /// A capture failed; the session carries on with the next cycle.
    Error(String),
    /// The source is exhausted or the cycle limit is reached. Always the
    /// last event.
    Finished,
}

/// Builds the recorder on the worker thread. Called again after a failed
/// open or a lost device.
pub type RecorderFactory = Box<dyn FnMut() -> Result<Box<dyn Recorder>> + Send>;

/// Recorder opened on first use and reopened after a device failure.
///
/// An open failure is reported as a capture failure of that cycle, so the
/// session keeps retrying instead of giving up on a missing microphone.
pub struct LazyRecorder {
    open: RecorderFactory,
    inner: Option<Box<dyn Recorder>>,
}

impl LazyRecorder {
    #[must_use]
    pub fn new(open: RecorderFactory) -> Self {
        Self { open, inner: None }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

impl Recorder for LazyRecorder {
    fn capture(&mut self, config: &CaptureConfig) -> Result<AudioBuffer> {
        let mut recorder = match self.inner.take() {
            Some(r) => r,
            None => {
                let opened = (self.open)()?;
                log::info!("Source audio ouverte");
                opened
            }
        };
        let captured = recorder.capture(config);
        let lost = captured.as_ref().is_err_and(|e| {
            matches!(
                e.downcast_ref::<AudioError>(),
                Some(AudioError::StreamError(_) | AudioError::CaptureTimeout { .. })
            )
        });
        if lost {
            log::warn!("Périphérique perdu, réouverture au prochain cycle");
        } else {
            self.inner = Some(recorder);
        }
        captured
    }

    fn has_more(&self) -> bool {
        self.inner.as_ref().is_none_or(|r| r.has_more())
    }
}

/// Handle on a running session: events out, commands in.
pub struct SessionHandle {
    pub events: flume::Receiver<SessionEvent>,
    pub commands: flume::Sender<SessionCommand>,
    thread: JoinHandle<()>,
}

impl SessionHandle {
    /// Ask the worker to stop after the current cycle.
    pub fn stop(&self) {
        let _ = self.commands.send(SessionCommand::Quit);
    }

    /// Wait for the worker thread. Blocks for up to one capture.
    pub fn join(self) {
        if self.thread.join().is_err() {
            log::error!("Le thread de session a paniqué");
        }
    }
}

/// Spawn the capture → extract → evaluate worker.
///
/// The recorder is built inside the thread (a cpal stream stays on the
/// thread that opened it) and reopened there whenever opening fails. Results
/// go out over a bounded channel; when nobody reads them the worker blocks
/// instead of piling up buffers.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_session(
    open: RecorderFactory,
    config: Arc<ArcSwap<VoiceConfig>>,
    max_cycles: Option<u64>,
) -> Result<SessionHandle> {
    let (event_tx, event_rx) = flume::bounded(4);
    let (cmd_tx, cmd_rx) = flume::bounded(16);

    let thread = thread::Builder::new()
        .name("vs-session".to_string())
        .spawn(move || {
            let mut recorder = LazyRecorder::new(open);
            run_session(&mut recorder, &config, &cmd_rx, &event_tx, max_cycles);
        })?;

    Ok(SessionHandle {
        events: event_rx,
        commands: cmd_tx,
        thread,
    })
}

/// Run cycles until the source ends, the limit is reached, a `Quit` arrives
/// or the event receiver is dropped.
///
/// Each cycle loads a fresh config snapshot, so edits to thresholds or
/// analysis parameters apply on the next cycle. Failed captures count
/// towards `max_cycles`.
pub fn run_session(
    recorder: &mut dyn Recorder,
    config: &ArcSwap<VoiceConfig>,
    commands: &flume::Receiver<SessionCommand>,
    events: &flume::Sender<SessionEvent>,
    max_cycles: Option<u64>,
) {
    let mut extractor = FeatureExtractor::new(config.load().analysis.clone());
    let mut paused = false;
    let mut cycles = 0u64;

    loop {
        // === Commandes ===
        for cmd in commands.try_iter() {
            match cmd {
                SessionCommand::Pause => paused = true,
                SessionCommand::Resume => paused = false,
                SessionCommand::Quit => return,
            }
        }
        if paused {
            match commands.recv_timeout(PAUSE_POLL) {
                Ok(SessionCommand::Quit) | Err(flume::RecvTimeoutError::Disconnected) => return,
                Ok(SessionCommand::Resume) => paused = false,
                Ok(SessionCommand::Pause) | Err(flume::RecvTimeoutError::Timeout) => {}
            }
            continue;
        }

        if max_cycles.is_some_and(|max| cycles >= max) || !recorder.has_more() {
            log::info!("Session terminée après {cycles} cycle(s)");
            let _ = events.send(SessionEvent::Finished);
            return;
        }

        // === Capture ===
        let snapshot = config.load_full();
        let captured = recorder.capture(&snapshot.capture);
        cycles += 1;

        let event = match captured {
            Ok(buffer) => {
                if extractor.config() != &snapshot.analysis {
                    log::info!("Paramètres d'analyse modifiés, extracteur reconstruit");
                    extractor = FeatureExtractor::new(snapshot.analysis.clone());
                }
                let (features, report, elapsed) = analyze(&extractor, &buffer, &snapshot);
                log::debug!(
                    "Cycle {cycles} : {} diagnostic(s) en {:.1} ms",
                    report.len(),
                    elapsed.as_secs_f64() * 1000.0
                );
                SessionEvent::Cycle {
                    features,
                    report,
                    elapsed,
                }
            }
            Err(e) if matches!(e.downcast_ref::<AudioError>(), Some(AudioError::EndOfStream)) => {
                log::info!("Fin de la source après {cycles} cycle(s)");
                let _ = events.send(SessionEvent::Finished);
                return;
            }
            Err(e) => {
                log::warn!("Cycle {cycles} : capture échouée : {e:#}");
                thread::sleep(RETRY_DELAY);
                SessionEvent::Error(format!("{e:#}"))
            }
        };

        if events.send(event).is_err() {
            log::debug!("Plus de récepteur, arrêt de la session");
            return;
        }
    }
}

/// One pipeline pass on a captured buffer.
fn analyze(
    extractor: &FeatureExtractor,
    buffer: &AudioBuffer,
    config: &VoiceConfig,
) -> (FeatureSet, DiagnosticReport, Duration) {
    let start = Instant::now();
    let features = extractor.extract(buffer);
    let report = vs_rules::analyze_speech_with(&features, &config.thresholds);
    (features, report, start.elapsed())
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use vs_audio::decode::FileRecorder;

    use super::*;

    /// Endless 220 Hz tone.
    struct Tone;

    impl Recorder for Tone {
        fn capture(&mut self, config: &CaptureConfig) -> Result<AudioBuffer> {
            let sr = config.sample_rate as f32;
            let samples = (0..config.frames_per_capture())
                .map(|i| 0.5 * (TAU * 220.0 * i as f32 / sr).sin())
                .collect();
            Ok(AudioBuffer::mono(samples, config.sample_rate))
        }
    }

    /// Device that is always unplugged.
    struct Unplugged;

    impl Recorder for Unplugged {
        fn capture(&mut self, _config: &CaptureConfig) -> Result<AudioBuffer> {
            Err(AudioError::NoInputDevice.into())
        }
    }

    fn short_config() -> ArcSwap<VoiceConfig> {
        let mut config = VoiceConfig::default();
        config.capture.duration_secs = 1.0;
        ArcSwap::from_pointee(config)
    }

    fn collect(
        recorder: &mut dyn Recorder,
        config: &ArcSwap<VoiceConfig>,
        max_cycles: Option<u64>,
    ) -> Vec<SessionEvent> {
        let (event_tx, event_rx) = flume::unbounded();
        let (_cmd_tx, cmd_rx) = flume::unbounded();
        run_session(recorder, config, &cmd_rx, &event_tx, max_cycles);
        drop(event_tx);
        event_rx.iter().collect()
    }

    #[test]
    fn cycle_limit_is_honoured() {
        let events = collect(&mut Tone, &short_config(), Some(2));
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], SessionEvent::Finished));
        let SessionEvent::Cycle { features, report, .. } = &events[0] else {
            panic!("expected a cycle, got {:?}", events[0]);
        };
        assert!((features.pitch_mean - 220.0).abs() < 10.0);
        assert!((5..=8).contains(&report.len()));
    }

    #[test]
    fn file_source_runs_to_its_end() {
        let mut rec = FileRecorder::from_buffer(AudioBuffer::mono(vec![0.0; 50_000], 22050));
        let events = collect(&mut rec, &short_config(), None);
        // 50000 samples in 22050-sample segments: 3 cycles.
        let cycles = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Cycle { .. }))
            .count();
        assert_eq!(cycles, 3);
        assert!(matches!(events.last(), Some(SessionEvent::Finished)));
    }

    #[test]
    fn capture_errors_are_published_and_counted() {
        let events = collect(&mut Unplugged, &short_config(), Some(2));
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], SessionEvent::Error(msg) if msg.contains("périphérique")));
        assert!(matches!(events[2], SessionEvent::Finished));
    }

    #[test]
    fn thresholds_are_read_each_cycle() {
        let config = short_config();
        let mut tone = Tone;
        let first = collect(&mut tone, &config, Some(1));

        let mut calibrated = (**config.load()).clone();
        calibrated.thresholds.pitch_high_hz = 200.0;
        config.store(Arc::new(calibrated));
        let second = collect(&mut tone, &config, Some(1));

        let level = |events: &[SessionEvent]| match &events[0] {
            SessionEvent::Cycle { report, .. } => {
                report.for_category(vs_core::report::RuleCategory::PitchLevel)
            }
            other => panic!("expected a cycle, got {other:?}"),
        };
        assert_eq!(level(&first), Some(vs_core::report::Diagnostic::PitchNatural));
        assert_eq!(level(&second), Some(vs_core::report::Diagnostic::PitchHigh));
    }

    #[test]
    fn quit_stops_before_capturing() {
        let (event_tx, event_rx) = flume::unbounded();
        let (cmd_tx, cmd_rx) = flume::unbounded();
        cmd_tx.send(SessionCommand::Quit).unwrap();
        run_session(&mut Tone, &short_config(), &cmd_rx, &event_tx, None);
        drop(event_tx);
        assert_eq!(event_rx.iter().count(), 0);
    }

    #[test]
    fn paused_session_captures_nothing_until_resumed() {
        let (event_tx, event_rx) = flume::unbounded();
        let (cmd_tx, cmd_rx) = flume::unbounded();
        cmd_tx.send(SessionCommand::Pause).unwrap();
        let handle = thread::spawn(move || {
            run_session(&mut Tone, &short_config(), &cmd_rx, &event_tx, Some(1));
        });
        thread::sleep(Duration::from_millis(300));
        assert!(event_rx.is_empty());
        cmd_tx.send(SessionCommand::Resume).unwrap();
        handle.join().unwrap();
        let events: Vec<_> = event_rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Cycle { .. }));
    }

    #[test]
    fn missing_device_is_retried_every_cycle() {
        let config = Arc::new(short_config());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let open: RecorderFactory = Box::new(move || -> Result<Box<dyn Recorder>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AudioError::NoInputDevice.into())
        });
        let handle = spawn_session(open, config, Some(3)).unwrap();
        let events: Vec<_> = handle.events.iter().collect();
        assert_eq!(events.len(), 4);
        assert!(
            events[..3]
                .iter()
                .all(|e| matches!(e, SessionEvent::Error(msg) if msg.contains("périphérique")))
        );
        assert!(matches!(events[3], SessionEvent::Finished));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        handle.join();
    }

    #[test]
    fn device_that_appears_later_is_used() {
        let mut failures_left = 1;
        let mut recorder = LazyRecorder::new(Box::new(move || -> Result<Box<dyn Recorder>> {
            if failures_left > 0 {
                failures_left -= 1;
                return Err(AudioError::NoInputDevice.into());
            }
            Ok(Box::new(Tone))
        }));
        let events = collect(&mut recorder, &short_config(), Some(2));
        assert!(matches!(events[0], SessionEvent::Error(_)));
        assert!(matches!(events[1], SessionEvent::Cycle { .. }));
        assert!(matches!(events[2], SessionEvent::Finished));
        assert!(recorder.is_open());
    }

    #[test]
    fn lost_stream_is_reopened() {
        struct Dropped;
        impl Recorder for Dropped {
            fn capture(&mut self, _config: &CaptureConfig) -> Result<AudioBuffer> {
                Err(AudioError::StreamError("débranché".into()).into())
            }
        }
        let mut recorder = LazyRecorder::new(Box::new(|| -> Result<Box<dyn Recorder>> {
            Ok(Box::new(Dropped))
        }));
        let config = CaptureConfig::default();
        assert!(recorder.capture(&config).is_err());
        assert!(!recorder.is_open());
    }
}
