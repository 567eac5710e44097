use std::time::Duration;

use vs_core::features::FeatureSet;
use vs_core::report::DiagnosticReport;
use vs_core::traits::Presenter;

use crate::timing::CycleTimer;

/// Application state (mirrored for rendering decisions).
///
/// # Example
/// ```
/// use vs_render::RenderState;
/// let state = RenderState::Listening;
/// assert_eq!(state.label(), "● ÉCOUTE");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    /// Capturing and analyzing.
    Listening,
    /// No capture until resumed.
    Paused,
    /// The source is exhausted (file mode).
    Finished,
}

impl RenderState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RenderState::Listening => "● ÉCOUTE",
            RenderState::Paused => "⏸ PAUSE",
            RenderState::Finished => "⏹ FIN",
        }
    }
}

/// Everything the TUI shows, updated as cycle results arrive.
///
/// # Example
/// ```
/// use vs_core::features::FeatureSet;
/// use vs_core::report::DiagnosticReport;
/// use vs_core::traits::Presenter;
/// use vs_render::Dashboard;
///
/// let mut dash = Dashboard::new("micro");
/// dash.present(&FeatureSet::default(), &DiagnosticReport::default());
/// assert_eq!(dash.cycles, 1);
/// assert!(dash.features.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct Dashboard {
    /// Latest feature set, `None` before the first cycle.
    pub features: Option<FeatureSet>,
    /// Latest diagnostics.
    pub report: DiagnosticReport,
    /// Completed cycles.
    pub cycles: u64,
    /// Failed cycles.
    pub errors: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    pub state: RenderState,
    /// Help overlay visible.
    pub show_help: bool,
    /// Where audio comes from ("micro" or a file name).
    pub source: String,
    /// Analysis time per cycle.
    pub timer: CycleTimer,
}

impl Dashboard {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            features: None,
            report: DiagnosticReport::default(),
            cycles: 0,
            errors: 0,
            last_error: None,
            state: RenderState::Listening,
            show_help: false,
            source: source.into(),
            timer: CycleTimer::default(),
        }
    }

    /// Flip between listening and paused. A finished source stays finished.
    pub fn toggle_pause(&mut self) {
        self.state = match self.state {
            RenderState::Listening => RenderState::Paused,
            RenderState::Paused => RenderState::Listening,
            RenderState::Finished => RenderState::Finished,
        };
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == RenderState::Paused
    }

    /// Record how long the last analysis took.
    pub fn record_latency(&mut self, elapsed: Duration) {
        self.timer.record(elapsed);
    }
}

impl Presenter for Dashboard {
    fn present(&mut self, features: &FeatureSet, report: &DiagnosticReport) {
        self.features = Some(*features);
        self.report = report.clone();
        self.cycles += 1;
        self.last_error = None;
    }

    fn present_error(&mut self, message: &str) {
        self.errors += 1;
        self.last_error = Some(message.to_owned());
    }
}
