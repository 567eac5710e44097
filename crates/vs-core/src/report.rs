use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Rule categories, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    PitchLevel,
    PitchVariation,
    Loudness,
    Tempo,
    Articulation,
    Clarity,
    Muffledness,
    Expressiveness,
}

impl RuleCategory {
    /// Every category, in evaluation order.
    pub const ALL: [RuleCategory; 8] = [
        RuleCategory::PitchLevel,
        RuleCategory::PitchVariation,
        RuleCategory::Loudness,
        RuleCategory::Tempo,
        RuleCategory::Articulation,
        RuleCategory::Clarity,
        RuleCategory::Muffledness,
        RuleCategory::Expressiveness,
    ];

    /// `true` for the five categories that always produce exactly one diagnostic.
    #[must_use]
    pub fn is_mandatory(self) -> bool {
        self <= RuleCategory::Articulation
    }
}

/// Nature d'un diagnostic, pour la mise en forme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Value within the comfortable range.
    Positive,
    /// Value outside the comfortable range.
    Warning,
    /// Conditional advice with no positive counterpart.
    Hint,
}

/// Un message de diagnostic. Chaque variante porte un texte fixe.
///
/// # Example
/// ```
/// use vs_core::report::{Diagnostic, RuleCategory, Severity};
/// let d = Diagnostic::PaceFast;
/// assert_eq!(d.category(), RuleCategory::Tempo);
/// assert_eq!(d.severity(), Severity::Warning);
/// assert_eq!(d.message(), "⚠️ You may be speaking too fast.");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    PitchLow,
    PitchHigh,
    PitchNatural,
    PitchFlat,
    PitchVaried,
    VolumeSoft,
    VolumeLoud,
    VolumeOk,
    PaceSlow,
    PaceFast,
    PaceNatural,
    ArticulationSharp,
    ArticulationOk,
    ClarityLow,
    Muffled,
    ExpressivenessLow,
}

impl Diagnostic {
    /// Category this diagnostic belongs to.
    #[must_use]
    pub fn category(self) -> RuleCategory {
        match self {
            Self::PitchLow | Self::PitchHigh | Self::PitchNatural => RuleCategory::PitchLevel,
            Self::PitchFlat | Self::PitchVaried => RuleCategory::PitchVariation,
            Self::VolumeSoft | Self::VolumeLoud | Self::VolumeOk => RuleCategory::Loudness,
            Self::PaceSlow | Self::PaceFast | Self::PaceNatural => RuleCategory::Tempo,
            Self::ArticulationSharp | Self::ArticulationOk => RuleCategory::Articulation,
            Self::ClarityLow => RuleCategory::Clarity,
            Self::Muffled => RuleCategory::Muffledness,
            Self::ExpressivenessLow => RuleCategory::Expressiveness,
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::PitchNatural
            | Self::PitchVaried
            | Self::VolumeOk
            | Self::PaceNatural
            | Self::ArticulationOk => Severity::Positive,
            Self::ClarityLow | Self::Muffled | Self::ExpressivenessLow => Severity::Hint,
            _ => Severity::Warning,
        }
    }

    /// Texte affiché à l'utilisateur.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::PitchLow => "⚠️ Voice may sound dull or low-pitched.",
            Self::PitchHigh => "⚠️ Voice might be too high-pitched.",
            Self::PitchNatural => "✅ Pitch is within a natural speaking range.",
            Self::PitchFlat => "⚠️ Try adding more pitch variation for expressiveness.",
            Self::PitchVaried => "✅ Good pitch variation detected.",
            Self::VolumeSoft => "⚠️ Speaking too softly. Increase volume.",
            Self::VolumeLoud => "⚠️ Voice might be too loud or harsh.",
            Self::VolumeOk => "✅ Volume level seems appropriate.",
            Self::PaceSlow => "⚠️ You may be speaking too slowly.",
            Self::PaceFast => "⚠️ You may be speaking too fast.",
            Self::PaceNatural => "✅ Speaking pace looks natural.",
            Self::ArticulationSharp => "⚠️ Speech may be sharp or hissy (check articulation).",
            Self::ArticulationOk => "✅ Speech articulation is within a normal range.",
            Self::ClarityLow => "🔈 Try to speak more clearly or with more energy.",
            Self::Muffled => "📉 Your voice may sound muffled or dull — increase enunciation.",
            Self::ExpressivenessLow => "🎵 Add more variation to your pitch for expressive delivery.",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Diagnostic", 3)?;
        s.serialize_field("category", &self.category())?;
        s.serialize_field("severity", &self.severity())?;
        s.serialize_field("message", self.message())?;
        s.end()
    }
}

/// Liste ordonnée des diagnostics d'un cycle.
///
/// # Example
/// ```
/// use vs_core::report::{Diagnostic, DiagnosticReport};
/// let report: DiagnosticReport = [Diagnostic::PitchNatural, Diagnostic::Muffled]
///     .into_iter()
///     .collect();
/// assert_eq!(report.len(), 2);
/// assert_eq!(report.warnings().count(), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticReport {
    items: Vec<Diagnostic>,
}

impl DiagnosticReport {
    /// Number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Diagnostics in category order.
    pub fn iter(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.items.iter().copied()
    }

    /// Message strings in category order.
    pub fn messages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(Diagnostic::message)
    }

    /// Diagnostics that are not positive outcomes.
    pub fn warnings(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.iter().filter(|d| d.severity() != Severity::Positive)
    }

    /// Diagnostic emitted for `category`, if any.
    #[must_use]
    pub fn for_category(&self, category: RuleCategory) -> Option<Diagnostic> {
        self.iter().find(|d| d.category() == category)
    }

    /// Borrow the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }
}

impl FromIterator<Diagnostic> for DiagnosticReport {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
