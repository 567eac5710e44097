use std::collections::VecDeque;
use std::time::Duration;

/// Durée moyenne d'analyse sur une fenêtre glissante.
///
/// Fed with the time each cycle spent between the end of capture and the
/// published report.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use vs_render::timing::CycleTimer;
/// let mut timer = CycleTimer::new(4);
/// timer.record(Duration::from_millis(10));
/// timer.record(Duration::from_millis(30));
/// assert!((timer.average_ms() - 20.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct CycleTimer {
    /// Durées des derniers cycles.
    samples: VecDeque<Duration>,
    /// Taille de la fenêtre.
    window: usize,
    /// Durée du dernier cycle en ms.
    pub last_ms: f64,
}

impl CycleTimer {
    /// Create a timer averaging over the last `window` cycles.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window + 1),
            window,
            last_ms: 0.0,
        }
    }

    /// Appeler une fois par cycle terminé.
    pub fn record(&mut self, elapsed: Duration) {
        self.last_ms = elapsed.as_secs_f64() * 1000.0;
        self.samples.push_back(elapsed);
        if self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Mean over the window, ms; 0 before the first cycle.
    #[must_use]
    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: Duration = self.samples.iter().sum();
        total.as_secs_f64() * 1000.0 / self.samples.len() as f64
    }
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new(16)
    }
}
