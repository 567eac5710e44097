//! Règles de coaching vocal : `FeatureSet` → `DiagnosticReport`.
//!
//! Eight threshold rules evaluated in a fixed order. The first five always
//! emit exactly one diagnostic (warning or positive); the last three only
//! emit a hint when their condition holds. Evaluation is pure.

use vs_core::config::Thresholds;
use vs_core::features::FeatureSet;
use vs_core::report::{Diagnostic, DiagnosticReport, RuleCategory};

/// One rule: `None` means the category stays silent for this input.
type Rule = fn(&FeatureSet, &Thresholds) -> Option<Diagnostic>;

/// The rule table, in report order.
const RULES: [(RuleCategory, Rule); 8] = [
    (RuleCategory::PitchLevel, pitch_level),
    (RuleCategory::PitchVariation, pitch_variation),
    (RuleCategory::Loudness, loudness),
    (RuleCategory::Tempo, tempo),
    (RuleCategory::Articulation, articulation),
    (RuleCategory::Clarity, clarity),
    (RuleCategory::Muffledness, muffledness),
    (RuleCategory::Expressiveness, expressiveness),
];

/// Evaluate a feature set against the default thresholds.
///
/// # Example
/// ```
/// use vs_core::features::FeatureSet;
/// use vs_rules::analyze_speech;
///
/// let report = analyze_speech(&FeatureSet::default());
/// assert_eq!(report.messages().next(), Some("⚠️ Voice may sound dull or low-pitched."));
/// ```
#[must_use]
pub fn analyze_speech(features: &FeatureSet) -> DiagnosticReport {
    analyze_speech_with(features, &Thresholds::default())
}

/// Evaluate a feature set against calibrated thresholds.
///
/// Comparisons are strict, so a value equal to a bound falls on the
/// positive side. A NaN feature never satisfies a condition.
#[must_use]
pub fn analyze_speech_with(features: &FeatureSet, thresholds: &Thresholds) -> DiagnosticReport {
    let report: DiagnosticReport = RULES
        .iter()
        .filter_map(|(category, rule)| {
            let d = rule(features, thresholds);
            debug_assert!(d.is_none_or(|d| d.category() == *category));
            d
        })
        .collect();
    log::trace!("{} diagnostic(s), {} alerte(s)", report.len(), report.warnings().count());
    report
}

/// Three-way band rule shared by pitch level, loudness and tempo.
#[inline]
fn band(
    value: f32,
    low: f32,
    high: f32,
    below: Diagnostic,
    above: Diagnostic,
    ok: Diagnostic,
) -> Diagnostic {
    if value < low {
        below
    } else if value > high {
        above
    } else {
        ok
    }
}

fn pitch_level(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    Some(band(
        f.pitch_mean,
        t.pitch_low_hz,
        t.pitch_high_hz,
        Diagnostic::PitchLow,
        Diagnostic::PitchHigh,
        Diagnostic::PitchNatural,
    ))
}

fn pitch_variation(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    Some(if f.pitch_std < t.pitch_variation_min_hz {
        Diagnostic::PitchFlat
    } else {
        Diagnostic::PitchVaried
    })
}

fn loudness(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    Some(band(
        f.rms_mean,
        t.rms_soft,
        t.rms_loud,
        Diagnostic::VolumeSoft,
        Diagnostic::VolumeLoud,
        Diagnostic::VolumeOk,
    ))
}

fn tempo(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    Some(band(
        f.tempo,
        t.tempo_slow_bpm,
        t.tempo_fast_bpm,
        Diagnostic::PaceSlow,
        Diagnostic::PaceFast,
        Diagnostic::PaceNatural,
    ))
}

fn articulation(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    Some(if f.zcr_mean > t.zcr_sharp {
        Diagnostic::ArticulationSharp
    } else {
        Diagnostic::ArticulationOk
    })
}

fn clarity(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    (f.spectral_centroid < t.centroid_clear_hz).then_some(Diagnostic::ClarityLow)
}

fn muffledness(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    (f.spectral_bandwidth < t.bandwidth_muffled_hz).then_some(Diagnostic::Muffled)
}

fn expressiveness(f: &FeatureSet, t: &Thresholds) -> Option<Diagnostic> {
    (f.chroma_mean < t.chroma_expressive).then_some(Diagnostic::ExpressivenessLow)
}

#[cfg(test)]
mod tests {
    use vs_core::report::Severity;

    use super::*;

    #[allow(clippy::too_many_arguments)]
    fn features(
        pitch_mean: f32,
        pitch_std: f32,
        rms_mean: f32,
        tempo: f32,
        zcr_mean: f32,
        spectral_centroid: f32,
        spectral_bandwidth: f32,
        chroma_mean: f32,
    ) -> FeatureSet {
        FeatureSet {
            pitch_mean,
            pitch_std,
            rms_mean,
            tempo,
            zcr_mean,
            spectral_centroid,
            spectral_bandwidth,
            chroma_mean,
            ..FeatureSet::default()
        }
    }

    #[test]
    fn nominal_speech_is_all_positive() {
        let report = analyze_speech(&features(180.0, 20.0, 0.05, 120.0, 0.05, 2000.0, 2000.0, 0.5));
        assert_eq!(
            report.messages().collect::<Vec<_>>(),
            [
                "✅ Pitch is within a natural speaking range.",
                "✅ Good pitch variation detected.",
                "✅ Volume level seems appropriate.",
                "✅ Speaking pace looks natural.",
                "✅ Speech articulation is within a normal range.",
            ]
        );
        assert!(report.iter().all(|d| d.severity() == Severity::Positive));
    }

    #[test]
    fn worst_case_emits_all_eight_in_order() {
        let report = analyze_speech(&features(50.0, 5.0, 0.15, 200.0, 0.2, 1000.0, 1500.0, 0.1));
        assert_eq!(
            report.as_slice(),
            [
                Diagnostic::PitchLow,
                Diagnostic::PitchFlat,
                Diagnostic::VolumeLoud,
                Diagnostic::PaceFast,
                Diagnostic::ArticulationSharp,
                Diagnostic::ClarityLow,
                Diagnostic::Muffled,
                Diagnostic::ExpressivenessLow,
            ]
        );
        assert_eq!(report.warnings().count(), 8);
    }

    #[test]
    fn opposite_extremes() {
        let report = analyze_speech(&features(300.0, 30.0, 0.01, 60.0, 0.01, 3000.0, 3000.0, 0.9));
        assert_eq!(
            report.as_slice(),
            [
                Diagnostic::PitchHigh,
                Diagnostic::PitchVaried,
                Diagnostic::VolumeSoft,
                Diagnostic::PaceSlow,
                Diagnostic::ArticulationOk,
            ]
        );
    }

    #[test]
    fn mandatory_categories_appear_exactly_once() {
        let grid = [0.0, 0.015, 0.05, 0.2, 50.0, 95.0, 130.0, 200.0, 1600.0, 5000.0];
        for &a in &grid {
            for &b in &grid {
                let report = analyze_speech(&features(a, b, a, b, a / 1000.0, b, a, b / 1000.0));
                assert!((5..=8).contains(&report.len()));
                for category in RuleCategory::ALL.iter().filter(|c| c.is_mandatory()) {
                    assert_eq!(report.iter().filter(|d| d.category() == *category).count(), 1);
                }
                let categories: Vec<_> = report.iter().map(Diagnostic::category).collect();
                assert!(categories.is_sorted());
            }
        }
    }

    #[test]
    fn bounds_are_positive() {
        let t = Thresholds::default();
        let report = analyze_speech(&features(
            t.pitch_low_hz,
            t.pitch_variation_min_hz,
            t.rms_loud,
            t.tempo_fast_bpm,
            t.zcr_sharp,
            t.centroid_clear_hz,
            t.bandwidth_muffled_hz,
            t.chroma_expressive,
        ));
        assert_eq!(report.len(), 5);
        assert_eq!(report.warnings().count(), 0);
    }

    #[test]
    fn evaluation_is_pure() {
        let f = features(120.0, 8.0, 0.03, 100.0, 0.12, 1400.0, 2500.0, 0.2);
        let first = analyze_speech(&f);
        assert_eq!(first, analyze_speech(&f));
        assert_eq!(first, analyze_speech(&f));
    }

    #[test]
    fn calibrated_thresholds_apply() {
        let f = features(90.0, 20.0, 0.05, 120.0, 0.05, 2000.0, 2000.0, 0.5);
        assert_eq!(
            analyze_speech(&f).for_category(RuleCategory::PitchLevel),
            Some(Diagnostic::PitchLow)
        );
        let deep_voice = Thresholds {
            pitch_low_hz: 80.0,
            ..Thresholds::default()
        };
        assert_eq!(
            analyze_speech_with(&f, &deep_voice).for_category(RuleCategory::PitchLevel),
            Some(Diagnostic::PitchNatural)
        );
    }
}
