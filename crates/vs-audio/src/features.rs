use vs_core::buffer::AudioBuffer;
use vs_core::config::AnalysisConfig;
use vs_core::features::{FeatureFlags, FeatureName, FeatureSet, MFCC_COUNT};

use crate::chroma;
use crate::error::FeatureError;
use crate::fft::Spectrogram;
use crate::mel::{self, MelSpectrogram};
use crate::onset::OnsetEnvelope;
use crate::pitch::{self, PitchStats};
use crate::sanitize;
use crate::spectral;
use crate::tempo::TempoChain;
use crate::temporal;

/// A feature value and whether it is the fallback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Computed<T> {
    pub value: T,
    pub defaulted: bool,
}

/// Values that can be checked for NaN/inf before being published.
pub trait Finite {
    fn all_finite(&self) -> bool;
}

impl Finite for f32 {
    fn all_finite(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for [f32; MFCC_COUNT] {
    fn all_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }
}

impl Finite for PitchStats {
    fn all_finite(&self) -> bool {
        self.mean.is_finite() && self.std.is_finite()
    }
}

/// Run `f`; on error or non-finite output return `default`, flagged.
///
/// # Example
/// ```
/// use vs_audio::FeatureError;
/// use vs_audio::features::compute_or_default;
///
/// let ok = compute_or_default("rms", 0.0, || Ok(0.25));
/// assert!(!ok.defaulted);
/// let failed = compute_or_default("rms", 0.0, || Err(FeatureError::EmptySignal));
/// assert!(failed.defaulted);
/// let nan = compute_or_default("rms", 0.0, || Ok(f32::NAN));
/// assert_eq!((nan.value, nan.defaulted), (0.0, true));
/// ```
pub fn compute_or_default<T: Finite>(
    name: &str,
    default: T,
    f: impl FnOnce() -> Result<T, FeatureError>,
) -> Computed<T> {
    let result = match f() {
        Ok(v) if !v.all_finite() => Err(FeatureError::NonFinite),
        other => other,
    };
    match result {
        Ok(value) => Computed {
            value,
            defaulted: false,
        },
        Err(e) => {
            log::debug!("{name} : valeur par défaut ({e})");
            Computed {
                value: default,
                defaulted: true,
            }
        }
    }
}

/// Borrow a shared intermediate, cloning its error for the dependent feature.
fn shared<T>(intermediate: &Result<T, FeatureError>) -> Result<&T, FeatureError> {
    intermediate.as_ref().map_err(Clone::clone)
}

/// Unwrap a `Computed`, recording its flag under each of `names`.
fn record<T>(flags: &mut FeatureFlags, names: &[FeatureName], computed: Computed<T>) -> T {
    if computed.defaulted {
        for &name in names {
            flags.insert(name);
        }
    }
    computed.value
}

/// Computes the nine features of one buffer with a fixed analysis setup.
///
/// # Example
/// ```
/// use vs_audio::FeatureExtractor;
/// use vs_core::buffer::AudioBuffer;
/// use vs_core::config::AnalysisConfig;
///
/// let extractor = FeatureExtractor::new(AnalysisConfig::default());
/// let features = extractor.extract(&AudioBuffer::mono(vec![0.0; 22050], 22050));
/// assert_eq!(features.rms_mean, 0.0);
/// assert!(features.is_finite());
/// ```
pub struct FeatureExtractor {
    config: AnalysisConfig,
    tempo: TempoChain,
}

impl FeatureExtractor {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let tempo = TempoChain::standard(&config);
        Self { config, tempo }
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Never fails: every feature that cannot be computed takes its default
    /// and is listed in [`FeatureSet::defaulted`].
    #[must_use]
    pub fn extract(&self, buffer: &AudioBuffer) -> FeatureSet {
        let a = &self.config;
        let signal = sanitize::prepare(buffer);

        let spec = Spectrogram::compute(&signal, buffer.sample_rate, a.n_fft, a.hop_length);
        let mel = shared(&spec).and_then(|s| MelSpectrogram::from_spectrogram(s, a.n_mels));

        let mut flags = FeatureFlags::default();

        let pitch = record(
            &mut flags,
            &[FeatureName::PitchMean, FeatureName::PitchStd],
            compute_or_default("pitch", PitchStats::default(), || {
                pitch::track(shared(&spec)?, a)
            }),
        );

        let rms_mean = record(
            &mut flags,
            &[FeatureName::RmsMean],
            compute_or_default("rms_mean", 0.0, || {
                temporal::rms_mean(&signal, a.n_fft, a.hop_length)
            }),
        );

        let zcr_mean = record(
            &mut flags,
            &[FeatureName::ZcrMean],
            compute_or_default("zcr_mean", 0.0, || {
                temporal::zcr_mean(&signal, a.n_fft, a.hop_length)
            }),
        );

        let tempo = record(
            &mut flags,
            &[FeatureName::Tempo],
            compute_or_default("tempo", 0.0, || {
                let frame_rate = shared(&spec)?.frame_rate(a.hop_length);
                let envelope = OnsetEnvelope::from_mel(shared(&mel)?, frame_rate);
                self.tempo.estimate(&envelope)
            }),
        );

        let mfccs = record(
            &mut flags,
            &[FeatureName::Mfccs],
            compute_or_default("mfccs", [0.0; MFCC_COUNT], || mel::mfcc_means(shared(&mel)?)),
        );

        let spectral_centroid = record(
            &mut flags,
            &[FeatureName::SpectralCentroid],
            compute_or_default("spectral_centroid", 0.0, || {
                spectral::centroid_mean(shared(&spec)?)
            }),
        );

        let spectral_bandwidth = record(
            &mut flags,
            &[FeatureName::SpectralBandwidth],
            compute_or_default("spectral_bandwidth", 0.0, || {
                spectral::bandwidth_mean(shared(&spec)?)
            }),
        );

        let chroma_mean = record(
            &mut flags,
            &[FeatureName::ChromaMean],
            compute_or_default("chroma_mean", 0.0, || chroma::chroma_mean(shared(&spec)?)),
        );

        if !flags.is_empty() {
            log::debug!("{} mesure(s) par défaut sur ce buffer", flags.len());
        }

        FeatureSet {
            pitch_mean: pitch.mean,
            pitch_std: pitch.std,
            rms_mean,
            zcr_mean,
            tempo,
            mfccs,
            spectral_centroid,
            spectral_bandwidth,
            chroma_mean,
            defaulted: flags,
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// Extract the nine features with the default analysis parameters.
///
/// # Example
/// ```
/// use vs_audio::extract_features;
/// use vs_core::buffer::AudioBuffer;
///
/// let features = extract_features(&AudioBuffer::mono(Vec::new(), 22050));
/// assert!(features.is_finite());
/// assert_eq!(features.defaulted.len(), 9);
/// ```
#[must_use]
pub fn extract_features(buffer: &AudioBuffer) -> FeatureSet {
    FeatureExtractor::default().extract(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amp: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / 22050.0).sin())
            .collect()
    }

    #[test]
    fn silence_defaults_pitch_and_tempo() {
        let f = extract_features(&AudioBuffer::mono(vec![0.0; 66150], 22050));
        assert_eq!(f.pitch_mean, 0.0);
        assert_eq!(f.pitch_std, 0.0);
        assert_eq!(f.rms_mean, 0.0);
        assert!(f.defaulted.contains(FeatureName::PitchMean));
        assert!(f.defaulted.contains(FeatureName::PitchStd));
        assert!(f.defaulted.contains(FeatureName::Tempo));
        assert!(!f.defaulted.contains(FeatureName::RmsMean));
    }

    #[test]
    fn zero_sample_rate_keeps_time_domain_features() {
        let f = extract_features(&AudioBuffer::mono(sine(220.0, 0.5, 22050), 0));
        assert!(f.is_finite());
        assert!(!f.defaulted.contains(FeatureName::RmsMean));
        assert!(f.defaulted.contains(FeatureName::SpectralCentroid));
        assert!(f.defaulted.contains(FeatureName::Mfccs));
        assert_eq!(f.mfccs, [0.0; MFCC_COUNT]);
    }

    #[test]
    fn tone_is_not_defaulted() {
        let f = extract_features(&AudioBuffer::mono(sine(220.0, 0.5, 66150), 22050));
        for name in [
            FeatureName::PitchMean,
            FeatureName::RmsMean,
            FeatureName::ZcrMean,
            FeatureName::Mfccs,
            FeatureName::SpectralCentroid,
            FeatureName::SpectralBandwidth,
            FeatureName::ChromaMean,
        ] {
            assert!(!f.defaulted.contains(name), "{name} defaulted");
        }
    }

    #[test]
    fn shared_clones_the_error() {
        let failed: Result<Spectrogram, FeatureError> = Err(FeatureError::EmptySignal);
        assert_eq!(shared(&failed).unwrap_err(), FeatureError::EmptySignal);
    }

    #[test]
    fn mfcc_nan_is_rejected() {
        let mut bad = [0.0f32; MFCC_COUNT];
        bad[3] = f32::INFINITY;
        let c = compute_or_default("mfccs", [0.0; MFCC_COUNT], || Ok(bad));
        assert!(c.defaulted);
        assert_eq!(c.value, [0.0; MFCC_COUNT]);
    }

    #[test]
    fn custom_config_is_used() {
        let config = AnalysisConfig {
            n_fft: 1024,
            hop_length: 256,
            ..AnalysisConfig::default()
        };
        let extractor = FeatureExtractor::new(config);
        assert_eq!(extractor.config().n_fft, 1024);
        let f = extractor.extract(&AudioBuffer::mono(sine(440.0, 0.3, 22050), 22050));
        assert!((f.pitch_mean - 440.0).abs() < 30.0, "pitch = {}", f.pitch_mean);
    }
}
