use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use vs_audio::capture::MicRecorder;
use vs_audio::decode::FileRecorder;
use vs_core::config::{CaptureConfig, VoiceConfig};
use vs_core::traits::{Presenter, Recorder};
use vs_render::{JsonPresenter, PlainPresenter};

pub mod app;
pub mod cli;
pub mod hotreload;
pub mod session;

use cli::{Cli, OutputMode};
use session::{RecorderFactory, SessionEvent, SessionHandle};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config et appliquer les overrides CLI
    let overrides = cli.overrides();
    let mut config = resolve_config(&cli)?;
    overrides.apply(&mut config);
    let config = Arc::new(ArcSwap::from_pointee(config));

    // 4. Hot-reload (seulement si le fichier existe)
    let _watcher = if cli.config.exists() {
        match hotreload::spawn_config_watcher(&cli.config, &config, move |c| overrides.apply(c)) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Surveillance de la config impossible : {e:#}");
                None
            }
        }
    } else {
        None
    };

    // 5. Source audio, ouverte dans le thread de session
    let open = recorder_factory(&cli, &config.load().capture)?;
    let session = session::spawn_session(open, Arc::clone(&config), cli.cycles)?;
    log::info!("Session démarrée ({})", cli.source_label());

    // 6. Présentation
    match cli.output_mode() {
        OutputMode::Plain => run_headless(session, &mut PlainPresenter::stdout()),
        OutputMode::Json => run_headless(session, &mut JsonPresenter::stdout()),
        OutputMode::Tui => {
            let terminal = ratatui::init();
            let result = app::App::new(session, cli.source_label()).run(terminal);
            // Restaurer le terminal (TOUJOURS, même en cas d'erreur)
            ratatui::restore();
            result
        }
    }
}

/// Resolve config: a missing file means defaults.
fn resolve_config(cli: &Cli) -> Result<VoiceConfig> {
    if cli.config.exists() {
        vs_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(VoiceConfig::default())
    }
}

/// Pick the audio source. A file is decoded here so a bad path fails before
/// any output starts; the microphone is opened on the session thread, and
/// reopened there until a device shows up.
fn recorder_factory(cli: &Cli, capture: &CaptureConfig) -> Result<RecorderFactory> {
    if let Some(path) = &cli.file {
        let recorder = FileRecorder::open(path)
            .with_context(|| format!("Lecture de {} impossible", path.display()))?;
        log::info!(
            "{} : {} segment(s) de {:.1} s",
            path.display(),
            recorder.segment_count(capture),
            capture.duration_secs
        );
        let mut pending = Some(recorder);
        return Ok(Box::new(move || -> Result<Box<dyn Recorder>> {
            match pending.take() {
                Some(r) => Ok(Box::new(r)),
                None => anyhow::bail!("Fichier audio déjà consommé"),
            }
        }));
    }
    let capture = capture.clone();
    Ok(Box::new(move || -> Result<Box<dyn Recorder>> {
        log::info!("Ouverture du micro");
        Ok(Box::new(MicRecorder::open(&capture)?))
    }))
}

/// Plain/JSON loop: print every event until the session finishes or Ctrl-C.
fn run_headless(session: SessionHandle, presenter: &mut impl Presenter) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || stop_handler.store(true, Ordering::SeqCst))
        .context("Installation du gestionnaire Ctrl-C impossible")?;

    loop {
        if stop.load(Ordering::SeqCst) {
            log::info!("Interruption, arrêt de la session");
            session.stop();
            return Ok(());
        }
        match session.events.recv_timeout(Duration::from_millis(100)) {
            Ok(SessionEvent::Cycle {
                features,
                report,
                ..
            }) => presenter.present(&features, &report),
            Ok(SessionEvent::Error(message)) => presenter.present_error(&message),
            Ok(SessionEvent::Finished) | Err(flume::RecvTimeoutError::Disconnected) => break,
            Err(flume::RecvTimeoutError::Timeout) => {}
        }
    }

    session.join();
    Ok(())
}
