use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Configuration complète, rechargeable à chaud.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use vs_core::config::VoiceConfig;
/// let config = VoiceConfig::default();
/// assert_eq!(config.capture.sample_rate, 22050);
/// assert!((config.thresholds.pitch_low_hz - 100.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VoiceConfig {
    /// Paramètres d'acquisition micro.
    pub capture: CaptureConfig,
    /// Paramètres d'analyse (STFT, pitch, tempo).
    pub analysis: AnalysisConfig,
    /// Seuils des règles de diagnostic.
    pub thresholds: Thresholds,
}

/// Acquisition parameters handed to the `Recorder` on each cycle.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CaptureConfig {
    /// Sample rate requested from the device, Hz.
    pub sample_rate: u32,
    /// Length of each recording, seconds.
    pub duration_secs: f32,
    /// Channels requested from the device.
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            duration_secs: 3.0,
            channels: 1,
        }
    }
}

impl CaptureConfig {
    /// Number of frames one capture should deliver.
    ///
    /// # Example
    /// ```
    /// use vs_core::config::CaptureConfig;
    /// assert_eq!(CaptureConfig::default().frames_per_capture(), 66150);
    /// ```
    #[must_use]
    pub fn frames_per_capture(&self) -> usize {
        (self.sample_rate as f32 * self.duration_secs).round() as usize
    }
}

/// Feature-extraction parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AnalysisConfig {
    /// FFT window length in samples (power of two recommended).
    pub n_fft: usize,
    /// Hop between successive frames, samples.
    pub hop_length: usize,
    /// Mel bands used for MFCC and onset strength.
    pub n_mels: usize,
    /// Lowest pitch candidate, Hz.
    pub pitch_fmin: f32,
    /// Highest pitch candidate (exclusive), Hz.
    pub pitch_fmax: f32,
    /// Peak threshold relative to the frame maximum.
    pub pitch_threshold: f32,
    /// Centre of the tempo prior, BPM.
    pub tempo_start_bpm: f32,
    /// Slowest tempo considered, BPM.
    pub tempo_min_bpm: f32,
    /// Fastest tempo considered, BPM.
    pub tempo_max_bpm: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            pitch_fmin: 150.0,
            pitch_fmax: 4000.0,
            pitch_threshold: 0.1,
            tempo_start_bpm: 120.0,
            tempo_min_bpm: 30.0,
            tempo_max_bpm: 320.0,
        }
    }
}

/// Seuils de classification. Les valeurs par défaut sont celles du coaching vocal d'origine.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Thresholds {
    /// Below: low-pitched voice, Hz.
    pub pitch_low_hz: f32,
    /// Above: high-pitched voice, Hz.
    pub pitch_high_hz: f32,
    /// Below: monotone delivery, Hz of pitch std-dev.
    pub pitch_variation_min_hz: f32,
    /// Below: speaking too softly (RMS).
    pub rms_soft: f32,
    /// Above: too loud or harsh (RMS).
    pub rms_loud: f32,
    /// Below: too slow, BPM.
    pub tempo_slow_bpm: f32,
    /// Above: too fast, BPM.
    pub tempo_fast_bpm: f32,
    /// Above: sharp or hissy articulation (ZCR).
    pub zcr_sharp: f32,
    /// Below: unclear or low-energy speech, Hz of spectral centroid.
    pub centroid_clear_hz: f32,
    /// Below: muffled voice, Hz of spectral bandwidth.
    pub bandwidth_muffled_hz: f32,
    /// Below: flat expressiveness (mean chroma).
    pub chroma_expressive: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pitch_low_hz: 100.0,
            pitch_high_hz: 250.0,
            pitch_variation_min_hz: 10.0,
            rms_soft: 0.02,
            rms_loud: 0.1,
            tempo_slow_bpm: 90.0,
            tempo_fast_bpm: 160.0,
            zcr_sharp: 0.1,
            centroid_clear_hz: 1500.0,
            bandwidth_muffled_hz: 1800.0,
            chroma_expressive: 0.3,
        }
    }
}

impl VoiceConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        let capture_defaults = CaptureConfig::default();
        let analysis_defaults = AnalysisConfig::default();

        let c = &mut self.capture;
        c.sample_rate = c.sample_rate.clamp(8000, 192_000);
        c.duration_secs =
            finite_or(c.duration_secs, capture_defaults.duration_secs).clamp(0.5, 30.0);
        c.channels = c.channels.clamp(1, 8);

        let a = &mut self.analysis;
        a.n_fft = a.n_fft.clamp(256, 16384);
        a.hop_length = a.hop_length.clamp(64, a.n_fft);
        a.n_mels = a.n_mels.clamp(16, 256);
        a.pitch_fmin = finite_or(a.pitch_fmin, analysis_defaults.pitch_fmin).clamp(20.0, 2000.0);
        a.pitch_fmax = finite_or(a.pitch_fmax, analysis_defaults.pitch_fmax)
            .clamp(a.pitch_fmin + 1.0, 20000.0);
        a.pitch_threshold =
            finite_or(a.pitch_threshold, analysis_defaults.pitch_threshold).clamp(0.0, 1.0);
        a.tempo_min_bpm =
            finite_or(a.tempo_min_bpm, analysis_defaults.tempo_min_bpm).clamp(10.0, 200.0);
        a.tempo_max_bpm = finite_or(a.tempo_max_bpm, analysis_defaults.tempo_max_bpm)
            .clamp(a.tempo_min_bpm + 1.0, 600.0);
        a.tempo_start_bpm = finite_or(a.tempo_start_bpm, analysis_defaults.tempo_start_bpm)
            .clamp(a.tempo_min_bpm, a.tempo_max_bpm);
    }

    /// Check cross-field consistency that clamping cannot repair.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] when a lower threshold exceeds its upper pair.
    pub fn validate(&self) -> Result<(), CoreError> {
        let t = &self.thresholds;
        let pairs = [
            ("pitch_low_hz", t.pitch_low_hz, "pitch_high_hz", t.pitch_high_hz),
            ("rms_soft", t.rms_soft, "rms_loud", t.rms_loud),
            ("tempo_slow_bpm", t.tempo_slow_bpm, "tempo_fast_bpm", t.tempo_fast_bpm),
        ];
        for (lo_name, lo, hi_name, hi) in pairs {
            if lo > hi {
                return Err(CoreError::Config(format!(
                    "{lo_name} ({lo}) > {hi_name} ({hi})"
                )));
            }
        }
        let all = [
            t.pitch_low_hz,
            t.pitch_high_hz,
            t.pitch_variation_min_hz,
            t.rms_soft,
            t.rms_loud,
            t.tempo_slow_bpm,
            t.tempo_fast_bpm,
            t.zcr_sharp,
            t.centroid_clear_hz,
            t.bandwidth_muffled_hz,
            t.chroma_expressive,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(CoreError::Config(
                "les seuils doivent être finis et positifs".into(),
            ));
        }
        Ok(())
    }
}

/// NaN/inf from a hand-edited file would poison `clamp`.
fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    capture: Option<CaptureSection>,
    analysis: Option<AnalysisSection>,
    thresholds: Option<ThresholdsSection>,
}

#[derive(Deserialize)]
struct CaptureSection {
    sample_rate: Option<u32>,
    duration_secs: Option<f32>,
    channels: Option<u16>,
}

#[derive(Deserialize)]
struct AnalysisSection {
    n_fft: Option<usize>,
    hop_length: Option<usize>,
    n_mels: Option<usize>,
    pitch_fmin: Option<f32>,
    pitch_fmax: Option<f32>,
    pitch_threshold: Option<f32>,
    tempo_start_bpm: Option<f32>,
    tempo_min_bpm: Option<f32>,
    tempo_max_bpm: Option<f32>,
}

#[derive(Deserialize)]
struct ThresholdsSection {
    pitch_low_hz: Option<f32>,
    pitch_high_hz: Option<f32>,
    pitch_variation_min_hz: Option<f32>,
    rms_soft: Option<f32>,
    rms_loud: Option<f32>,
    tempo_slow_bpm: Option<f32>,
    tempo_fast_bpm: Option<f32>,
    zcr_sharp: Option<f32>,
    centroid_clear_hz: Option<f32>,
    bandwidth_muffled_hz: Option<f32>,
    chroma_expressive: Option<f32>,
}

macro_rules! merge {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $src.$field {
                $dst.$field = v;
            }
        )+
    };
}

/// Parse du TOML et fusion avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed or the merged thresholds are inconsistent.
///
/// # Example
/// ```
/// use vs_core::config::parse_config;
/// let config = parse_config("[thresholds]\npitch_low_hz = 85.0\n").unwrap();
/// assert!((config.thresholds.pitch_low_hz - 85.0).abs() < f32::EPSILON);
/// assert!((config.thresholds.pitch_high_hz - 250.0).abs() < f32::EPSILON);
/// ```
pub fn parse_config(content: &str) -> Result<VoiceConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = VoiceConfig::default();

    if let Some(c) = file.capture {
        merge!(config.capture, c, sample_rate, duration_secs, channels);
    }
    if let Some(a) = file.analysis {
        merge!(
            config.analysis,
            a,
            n_fft,
            hop_length,
            n_mels,
            pitch_fmin,
            pitch_fmax,
            pitch_threshold,
            tempo_start_bpm,
            tempo_min_bpm,
            tempo_max_bpm,
        );
    }
    if let Some(t) = file.thresholds {
        merge!(
            config.thresholds,
            t,
            pitch_low_hz,
            pitch_high_hz,
            pitch_variation_min_hz,
            rms_soft,
            rms_loud,
            tempo_slow_bpm,
            tempo_fast_bpm,
            zcr_sharp,
            centroid_clear_hz,
            bandwidth_muffled_hz,
            chroma_expressive,
        );
    }

    config.clamp_all();
    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use vs_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<VoiceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide dans {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, VoiceConfig::default());
    }

    #[test]
    fn partial_sections_merge_over_defaults() {
        let config = parse_config(
            "[capture]\nduration_secs = 5.0\n\n[analysis]\nhop_length = 256\n",
        )
        .unwrap();
        assert!((config.capture.duration_secs - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.capture.sample_rate, 22050);
        assert_eq!(config.analysis.hop_length, 256);
        assert_eq!(config.analysis.n_fft, 2048);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = parse_config("[capture]\nchannels = 0\nduration_secs = 900.0\n").unwrap();
        assert_eq!(config.capture.channels, 1);
        assert!((config.capture.duration_secs - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = parse_config("[thresholds]\nrms_soft = 0.5\nrms_loud = 0.1\n");
        assert!(err.is_err());
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(parse_config("[thresholds]\nzcr_sharp = -1.0\n").is_err());
    }

    #[test]
    fn nan_analysis_value_falls_back_to_default() {
        let config = parse_config("[analysis]\npitch_fmin = nan\n").unwrap();
        assert!((config.analysis.pitch_fmin - 150.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        assert!(parse_config("[capture]\nsample_rate = \"fast\"\n").is_err());
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds]\ntempo_fast_bpm = 180.0").unwrap();
        let config = load_config(file.path()).unwrap();
        assert!((config.thresholds.tempo_fast_bpm - 180.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/voicescope.toml")).is_err());
    }
}
