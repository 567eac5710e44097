use crate::buffer::AudioBuffer;
use crate::config::CaptureConfig;
use crate::features::FeatureSet;
use crate::report::DiagnosticReport;

/// Fournit un enregistrement de durée fixe à chaque cycle.
///
/// Implémenté par : `MicRecorder` (cpal), `FileRecorder` (fichier décodé).
///
/// # Example
/// ```
/// use vs_core::traits::Recorder;
/// use vs_core::buffer::AudioBuffer;
/// use vs_core::config::CaptureConfig;
///
/// struct Silence;
/// impl Recorder for Silence {
///     fn capture(&mut self, config: &CaptureConfig) -> anyhow::Result<AudioBuffer> {
///         Ok(AudioBuffer::mono(vec![0.0; config.frames_per_capture()], config.sample_rate))
///     }
/// }
/// let buf = Silence.capture(&CaptureConfig::default()).unwrap();
/// assert_eq!(buf.frames(), 66150);
/// ```
pub trait Recorder {
    /// Bloque jusqu'à ce que `config.duration_secs` d'audio soient disponibles.
    ///
    /// # Errors
    /// Device or decoding failures. The caller skips the cycle and continues.
    fn capture(&mut self, config: &CaptureConfig) -> anyhow::Result<AudioBuffer>;

    /// `false` once a finite source has no more audio to deliver.
    fn has_more(&self) -> bool {
        true
    }
}

/// Affiche le résultat d'un cycle. Ne modifie jamais ses entrées.
///
/// # Example
/// ```
/// use vs_core::traits::Presenter;
/// use vs_core::features::FeatureSet;
/// use vs_core::report::DiagnosticReport;
///
/// struct Count(usize);
/// impl Presenter for Count {
///     fn present(&mut self, _f: &FeatureSet, report: &DiagnosticReport) {
///         self.0 += report.len();
///     }
///     fn present_error(&mut self, _message: &str) {}
/// }
/// ```
pub trait Presenter {
    /// Display one completed cycle.
    fn present(&mut self, features: &FeatureSet, report: &DiagnosticReport);

    /// Display a failed cycle (capture error); the loop continues afterwards.
    fn present_error(&mut self, message: &str);
}
