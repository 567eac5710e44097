use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use vs_core::traits::Presenter;
use vs_render::{Dashboard, RenderState};

use crate::session::{SessionCommand, SessionEvent, SessionHandle};

/// Redraw period when nothing happens. Cycles last seconds, keys need to
/// feel instant.
const TICK: Duration = Duration::from_millis(50);

/// Application TUI : tableau de bord + thread de session.
pub struct App {
    pub dashboard: Dashboard,
    session: SessionHandle,
    quitting: bool,
}

impl App {
    #[must_use]
    pub fn new(session: SessionHandle, source: impl Into<String>) -> Self {
        Self {
            dashboard: Dashboard::new(source),
            session,
            quitting: false,
        }
    }

    /// Boucle principale : événements clavier, résultats de session, rendu.
    ///
    /// # Errors
    /// Returns an error if terminal I/O fails.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.quitting {
            terminal.draw(|frame| vs_render::ui::draw(frame, &self.dashboard))?;

            if event::poll(TICK)? {
                self.handle_event(&event::read()?);
            }
            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }

            self.drain_session();
        }

        self.session.stop();
        // The worker may be blocked in a capture; it exits on its own once
        // the capture returns and sees Quit or the dropped receiver.
        Ok(())
    }

    /// Apply every pending session event to the dashboard.
    fn drain_session(&mut self) {
        for event in self.session.events.try_iter() {
            apply_event(&mut self.dashboard, event);
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = *event
        {
            match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.quitting = true;
                }
                KeyCode::Char('q') => self.quitting = true,
                KeyCode::Esc => {
                    if self.dashboard.show_help {
                        self.dashboard.show_help = false;
                    } else {
                        self.quitting = true;
                    }
                }
                KeyCode::Char(' ') => self.toggle_pause(),
                KeyCode::Char('?') => self.dashboard.show_help = !self.dashboard.show_help,
                _ => {}
            }
        }
    }

    fn toggle_pause(&mut self) {
        if self.dashboard.state == RenderState::Finished {
            return;
        }
        self.dashboard.toggle_pause();
        let cmd = if self.dashboard.is_paused() {
            SessionCommand::Pause
        } else {
            SessionCommand::Resume
        };
        if self.session.commands.send(cmd).is_err() {
            log::warn!("Session arrêtée, commande {cmd:?} ignorée");
        }
    }
}

/// Fold one session event into the dashboard.
pub fn apply_event(dashboard: &mut Dashboard, event: SessionEvent) {
    match event {
        SessionEvent::Cycle {
            features,
            report,
            elapsed,
        } => {
            dashboard.present(&features, &report);
            dashboard.record_latency(elapsed);
        }
        SessionEvent::Error(message) => dashboard.present_error(&message),
        SessionEvent::Finished => dashboard.state = RenderState::Finished,
    }
}

#[cfg(test)]
mod tests {
    use vs_core::features::FeatureSet;
    use vs_core::report::{Diagnostic, DiagnosticReport};

    use super::*;

    #[test]
    fn cycle_updates_values_and_timer() {
        let mut dash = Dashboard::new("micro");
        let report: DiagnosticReport = [Diagnostic::VolumeOk].into_iter().collect();
        apply_event(
            &mut dash,
            SessionEvent::Cycle {
                features: FeatureSet::default(),
                report: report.clone(),
                elapsed: Duration::from_millis(40),
            },
        );
        assert_eq!(dash.cycles, 1);
        assert_eq!(dash.report, report);
        assert!((dash.timer.last_ms - 40.0).abs() < 1e-6);
    }

    #[test]
    fn error_then_finish() {
        let mut dash = Dashboard::new("talk.wav");
        apply_event(&mut dash, SessionEvent::Error("débranché".into()));
        apply_event(&mut dash, SessionEvent::Finished);
        assert_eq!(dash.errors, 1);
        assert_eq!(dash.last_error.as_deref(), Some("débranché"));
        assert_eq!(dash.state, RenderState::Finished);
    }
}
