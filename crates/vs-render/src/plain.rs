use std::io::{self, Write};

use vs_core::features::{FeatureName, FeatureSet};
use vs_core::report::DiagnosticReport;
use vs_core::traits::Presenter;

/// Line-oriented text output, one block per cycle.
///
/// # Example
/// ```
/// use vs_core::features::FeatureSet;
/// use vs_core::report::DiagnosticReport;
/// use vs_core::traits::Presenter;
/// use vs_render::PlainPresenter;
///
/// let mut out = PlainPresenter::new(Vec::new());
/// let features = FeatureSet { pitch_mean: 181.26, ..FeatureSet::default() };
/// out.present(&features, &DiagnosticReport::default());
/// let text = String::from_utf8(out.into_inner()).unwrap();
/// assert!(text.contains("Pitch: 181.3 Hz"));
/// ```
pub struct PlainPresenter<W: Write> {
    out: W,
    cycle: u64,
}

impl PlainPresenter<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PlainPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, cycle: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_cycle(&mut self, features: &FeatureSet, report: &DiagnosticReport) -> io::Result<()> {
        let mark = |name| if features.defaulted.contains(name) { "*" } else { "" };
        writeln!(self.out, "── cycle {} ──", self.cycle)?;
        writeln!(
            self.out,
            "Pitch: {:.1} Hz{} (±{:.1}) | RMS: {:.3}{} | Tempo: {:.1} BPM{} | ZCR: {:.3}{}",
            features.pitch_mean,
            mark(FeatureName::PitchMean),
            features.pitch_std,
            features.rms_mean,
            mark(FeatureName::RmsMean),
            features.tempo,
            mark(FeatureName::Tempo),
            features.zcr_mean,
            mark(FeatureName::ZcrMean),
        )?;
        writeln!(
            self.out,
            "Centroid: {:.0} Hz{} | Bandwidth: {:.0} Hz{} | Chroma: {:.2}{}",
            features.spectral_centroid,
            mark(FeatureName::SpectralCentroid),
            features.spectral_bandwidth,
            mark(FeatureName::SpectralBandwidth),
            features.chroma_mean,
            mark(FeatureName::ChromaMean),
        )?;
        for message in report.messages() {
            writeln!(self.out, "  • {message}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> Presenter for PlainPresenter<W> {
    fn present(&mut self, features: &FeatureSet, report: &DiagnosticReport) {
        self.cycle += 1;
        if let Err(e) = self.write_cycle(features, report) {
            log::warn!("Sortie texte impossible : {e}");
        }
    }

    fn present_error(&mut self, message: &str) {
        self.cycle += 1;
        let result = writeln!(self.out, "── cycle {} ── erreur : {message}", self.cycle)
            .and_then(|()| writeln!(self.out, "  Poursuite avec l'échantillon suivant…"))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            log::warn!("Sortie texte impossible : {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use vs_core::report::Diagnostic;

    use super::*;

    fn text(p: PlainPresenter<Vec<u8>>) -> String {
        String::from_utf8(p.into_inner()).unwrap()
    }

    #[test]
    fn messages_follow_values() {
        let mut p = PlainPresenter::new(Vec::new());
        let report: DiagnosticReport =
            [Diagnostic::PitchLow, Diagnostic::VolumeOk].into_iter().collect();
        p.present(&FeatureSet::default(), &report);
        let out = text(p);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "── cycle 1 ──");
        assert_eq!(lines[3], "  • ⚠️ Voice may sound dull or low-pitched.");
        assert_eq!(lines[4], "  • ✅ Volume level seems appropriate.");
    }

    #[test]
    fn defaulted_values_are_starred() {
        let mut features = FeatureSet::default();
        features.defaulted.insert(FeatureName::Tempo);
        let mut p = PlainPresenter::new(Vec::new());
        p.present(&features, &DiagnosticReport::default());
        assert!(text(p).contains("Tempo: 0.0 BPM* |"));
    }

    #[test]
    fn errors_do_not_stop_numbering() {
        let mut p = PlainPresenter::new(Vec::new());
        p.present_error("pas de micro");
        p.present(&FeatureSet::default(), &DiagnosticReport::default());
        let out = text(p);
        assert!(out.contains("cycle 1 ── erreur : pas de micro"));
        assert!(out.contains("── cycle 2 ──"));
    }
}
