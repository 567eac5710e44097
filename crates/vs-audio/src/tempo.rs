// Tempo estimation from the onset-strength envelope.
//
// Several strategies are tried in order; the first that produces a value wins.

use vs_core::config::AnalysisConfig;

use crate::error::FeatureError;
use crate::onset::OnsetEnvelope;

/// One way of turning an onset envelope into a BPM value.
pub trait TempoEstimator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Estimated tempo in BPM.
    ///
    /// # Errors
    /// [`FeatureError::Unavailable`] when the strategy cannot run on this
    /// envelope, [`FeatureError::Degenerate`] when it finds no periodicity.
    fn estimate(&self, envelope: &OnsetEnvelope) -> Result<f32, FeatureError>;
}

/// Autocorrelation of the envelope weighted by a log-normal tempo prior.
#[derive(Clone, Debug)]
pub struct AutocorrelationTempo {
    /// Centre of the prior, BPM.
    pub start_bpm: f32,
    /// Width of the prior, octaves.
    pub std_octaves: f32,
    pub min_bpm: f32,
    pub max_bpm: f32,
}

impl AutocorrelationTempo {
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            start_bpm: config.tempo_start_bpm,
            std_octaves: 1.0,
            min_bpm: config.tempo_min_bpm,
            max_bpm: config.tempo_max_bpm,
        }
    }

    #[inline]
    fn prior(&self, bpm: f32) -> f32 {
        let octaves = (bpm / self.start_bpm).log2() / self.std_octaves;
        (-0.5 * octaves * octaves).exp()
    }
}

impl TempoEstimator for AutocorrelationTempo {
    fn name(&self) -> &'static str {
        "autocorrelation"
    }

    fn estimate(&self, envelope: &OnsetEnvelope) -> Result<f32, FeatureError> {
        let fps = envelope.frame_rate;
        if !(fps > 0.0) || !(self.min_bpm > 0.0) || self.max_bpm <= self.min_bpm {
            return Err(FeatureError::InvalidParameter("plage de tempo"));
        }

        let n = envelope.len();
        let lag_min = ((60.0 * fps / self.max_bpm).ceil() as usize).max(1);
        let lag_max = ((60.0 * fps / self.min_bpm).floor() as usize).min(n / 2);
        if lag_max < lag_min {
            return Err(FeatureError::Unavailable("enveloppe trop courte"));
        }

        let mean = envelope.values.iter().sum::<f32>() / n as f32;
        let centered: Vec<f32> = envelope.values.iter().map(|v| v - mean).collect();
        let energy: f32 = centered.iter().map(|v| v * v).sum::<f32>() / n as f32;
        if energy <= f32::EPSILON {
            return Err(FeatureError::Degenerate("enveloppe plate"));
        }

        // Autocorrelation normalized by lag 0, times the prior.
        let score = |lag: usize| -> f32 {
            let ac: f32 = centered
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f32>()
                / n as f32
                / energy;
            ac * self.prior(60.0 * fps / lag as f32)
        };
        let scores: Vec<f32> = (lag_min..=lag_max).map(score).collect();

        let (best_idx, best) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |acc, (i, s)| if s > acc.1 { (i, s) } else { acc });
        if best <= 0.0 {
            return Err(FeatureError::Degenerate("aucune périodicité"));
        }

        let mut lag = (lag_min + best_idx) as f32;
        if best_idx > 0 && best_idx + 1 < scores.len() {
            let (prev, next) = (scores[best_idx - 1], scores[best_idx + 1]);
            let curvature = 2.0 * best - prev - next;
            if curvature > f32::EPSILON {
                lag += 0.5 * (next - prev) / curvature;
            }
        }
        Ok(60.0 * fps / lag)
    }
}

/// Adaptive-threshold onset picking, BPM from the median inter-onset interval.
///
/// Kept as a fallback for envelopes too short for the autocorrelation.
#[derive(Clone, Debug)]
pub struct OnsetIntervalTempo {
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Minimum time between two onsets, seconds.
    pub cooldown_secs: f32,
    /// Leading frames ignored while the running average settles.
    pub warmup_frames: usize,
}

impl OnsetIntervalTempo {
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            min_bpm: config.tempo_min_bpm,
            max_bpm: config.tempo_max_bpm,
            cooldown_secs: 0.13,
            warmup_frames: 2,
        }
    }

    /// Frame indices of detected onsets.
    fn onsets(&self, envelope: &OnsetEnvelope) -> Vec<usize> {
        let cooldown = (envelope.frame_rate * self.cooldown_secs).max(2.0) as usize;
        let mut flux_avg = 0.0f32;
        let mut last: Option<usize> = None;
        let mut found = Vec::new();

        for (i, &flux) in envelope.values.iter().enumerate() {
            flux_avg = flux_avg * 0.93 + flux * 0.07;
            let threshold = flux_avg * 1.5 + 0.01;
            let cooled = last.is_none_or(|l| i - l > cooldown);
            if i >= self.warmup_frames && flux > threshold && cooled {
                found.push(i);
                last = Some(i);
            }
        }
        found
    }

    /// Double or halve until inside `[min_bpm, max_bpm]`.
    fn fold_into_range(&self, mut bpm: f32) -> f32 {
        while bpm < self.min_bpm {
            bpm *= 2.0;
        }
        while bpm > self.max_bpm {
            bpm /= 2.0;
        }
        bpm.max(self.min_bpm)
    }
}

impl TempoEstimator for OnsetIntervalTempo {
    fn name(&self) -> &'static str {
        "onset-interval"
    }

    fn estimate(&self, envelope: &OnsetEnvelope) -> Result<f32, FeatureError> {
        let rate_ok = envelope.frame_rate > 0.0;
        let range_ok = self.min_bpm > 0.0 && self.max_bpm >= self.min_bpm * 2.0;
        if !rate_ok || !range_ok {
            return Err(FeatureError::InvalidParameter("plage de tempo"));
        }

        let onsets = self.onsets(envelope);
        let mut intervals: Vec<usize> = onsets.windows(2).map(|w| w[1] - w[0]).collect();
        if intervals.len() < 2 {
            return Err(FeatureError::Unavailable("moins de trois attaques"));
        }
        intervals.sort_unstable();
        let mid = intervals.len() / 2;
        let median = if intervals.len() % 2 == 0 {
            (intervals[mid - 1] + intervals[mid]) as f32 / 2.0
        } else {
            intervals[mid] as f32
        };

        let bpm = 60.0 * envelope.frame_rate / median;
        if !bpm.is_finite() {
            return Err(FeatureError::NonFinite);
        }
        Ok(self.fold_into_range(bpm))
    }
}

/// Ordered list of strategies; the first `Ok` wins.
///
/// # Example
/// ```
/// use vs_audio::onset::OnsetEnvelope;
/// use vs_audio::tempo::TempoChain;
/// use vs_core::config::AnalysisConfig;
///
/// let chain = TempoChain::standard(&AnalysisConfig::default());
/// assert_eq!(chain.names(), vec!["autocorrelation", "onset-interval"]);
/// let silent = OnsetEnvelope { values: vec![0.0; 130], frame_rate: 43.07 };
/// assert!(chain.estimate(&silent).is_err());
/// ```
pub struct TempoChain {
    strategies: Vec<Box<dyn TempoEstimator>>,
}

impl TempoChain {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn TempoEstimator>>) -> Self {
        Self { strategies }
    }

    /// Autocorrelation first, onset intervals as fallback.
    #[must_use]
    pub fn standard(config: &AnalysisConfig) -> Self {
        Self::new(vec![
            Box::new(AutocorrelationTempo::new(config)),
            Box::new(OnsetIntervalTempo::new(config)),
        ])
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the strategies in order.
    ///
    /// # Errors
    /// The last strategy's error when none succeeds, or
    /// [`FeatureError::Unavailable`] for an empty chain.
    pub fn estimate(&self, envelope: &OnsetEnvelope) -> Result<f32, FeatureError> {
        let mut last_err = FeatureError::Unavailable("aucune stratégie de tempo");
        for strategy in &self.strategies {
            match strategy.estimate(envelope) {
                Ok(bpm) if bpm.is_finite() && bpm > 0.0 => return Ok(bpm),
                Ok(_) => last_err = FeatureError::NonFinite,
                Err(e) => {
                    log::debug!("tempo: {} indisponible ({e})", strategy.name());
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
