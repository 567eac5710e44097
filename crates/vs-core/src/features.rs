use std::fmt;

use serde::{Serialize, Serializer};

/// Nombre fixe de coefficients MFCC conservés.
pub const MFCC_COUNT: usize = 13;

/// The nine feature keys, in presentation order.
///
/// # Example
/// ```
/// use vs_core::features::FeatureName;
/// assert_eq!(FeatureName::ALL.len(), 9);
/// assert_eq!(FeatureName::PitchMean.as_str(), "pitch_mean");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureName {
    PitchMean,
    PitchStd,
    RmsMean,
    ZcrMean,
    Tempo,
    Mfccs,
    SpectralCentroid,
    SpectralBandwidth,
    ChromaMean,
}

impl FeatureName {
    /// Every feature name, in the canonical order.
    pub const ALL: [FeatureName; 9] = [
        FeatureName::PitchMean,
        FeatureName::PitchStd,
        FeatureName::RmsMean,
        FeatureName::ZcrMean,
        FeatureName::Tempo,
        FeatureName::Mfccs,
        FeatureName::SpectralCentroid,
        FeatureName::SpectralBandwidth,
        FeatureName::ChromaMean,
    ];

    /// Snake-case key used in reports and JSON output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PitchMean => "pitch_mean",
            Self::PitchStd => "pitch_std",
            Self::RmsMean => "rms_mean",
            Self::ZcrMean => "zcr_mean",
            Self::Tempo => "tempo",
            Self::Mfccs => "mfccs",
            Self::SpectralCentroid => "spectral_centroid",
            Self::SpectralBandwidth => "spectral_bandwidth",
            Self::ChromaMean => "chroma_mean",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ensemble des features dont le calcul a échoué et qui portent leur valeur par défaut.
///
/// # Example
/// ```
/// use vs_core::features::{FeatureFlags, FeatureName};
/// let mut flags = FeatureFlags::default();
/// flags.insert(FeatureName::Tempo);
/// assert!(flags.contains(FeatureName::Tempo));
/// assert!(!flags.contains(FeatureName::RmsMean));
/// assert_eq!(flags.len(), 1);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags(u16);

impl FeatureFlags {
    /// Mark a feature.
    pub fn insert(&mut self, name: FeatureName) {
        self.0 |= name.bit();
    }

    /// `true` if the feature is marked.
    #[must_use]
    pub fn contains(self, name: FeatureName) -> bool {
        self.0 & name.bit() != 0
    }

    /// Number of marked features.
    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// `true` if no feature is marked.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Marked features, in canonical order.
    pub fn iter(self) -> impl Iterator<Item = FeatureName> {
        FeatureName::ALL
            .into_iter()
            .filter(move |&n| self.contains(n))
    }
}

impl Serialize for FeatureFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(FeatureName::as_str))
    }
}

/// Valeur d'une feature : scalaire ou vecteur MFCC.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureValue {
    /// Single measurement.
    Scalar(f32),
    /// The 13 mean MFCC coefficients.
    Vector([f32; MFCC_COUNT]),
}

impl FeatureValue {
    /// Scalar value, `None` for the MFCC vector.
    #[must_use]
    pub fn as_scalar(self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(v),
            Self::Vector(_) => None,
        }
    }
}

/// Résultat de l'extraction pour un buffer audio.
///
/// Every field is always present and finite. A feature whose computation
/// failed carries its default (0, or a zero vector for `mfccs`) and is
/// listed in `defaulted`.
///
/// # Example
/// ```
/// use vs_core::features::{FeatureName, FeatureSet, FeatureValue};
/// let f = FeatureSet { pitch_mean: 180.0, ..FeatureSet::default() };
/// assert_eq!(f.get(FeatureName::PitchMean), FeatureValue::Scalar(180.0));
/// assert!(f.is_finite());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FeatureSet {
    // === Hauteur ===
    /// Mean of the strictly positive pitch-track values, Hz.
    pub pitch_mean: f32,
    /// Population standard deviation of the same values, Hz.
    pub pitch_std: f32,

    // === Intensité / articulation ===
    /// Mean per-frame RMS energy.
    pub rms_mean: f32,
    /// Mean per-frame zero-crossing rate [0, 1].
    pub zcr_mean: f32,

    // === Rythme ===
    /// Primary tempo estimate, BPM.
    pub tempo: f32,

    // === Timbre ===
    /// Per-coefficient mean MFCCs.
    pub mfccs: [f32; MFCC_COUNT],
    /// Mean spectral centroid, Hz.
    pub spectral_centroid: f32,
    /// Mean spectral bandwidth, Hz.
    pub spectral_bandwidth: f32,
    /// Mean chroma energy [0, 1].
    pub chroma_mean: f32,

    /// Features that fell back to their default value.
    pub defaulted: FeatureFlags,
}

impl FeatureSet {
    /// Lookup by name.
    #[must_use]
    pub fn get(&self, name: FeatureName) -> FeatureValue {
        match name {
            FeatureName::PitchMean => FeatureValue::Scalar(self.pitch_mean),
            FeatureName::PitchStd => FeatureValue::Scalar(self.pitch_std),
            FeatureName::RmsMean => FeatureValue::Scalar(self.rms_mean),
            FeatureName::ZcrMean => FeatureValue::Scalar(self.zcr_mean),
            FeatureName::Tempo => FeatureValue::Scalar(self.tempo),
            FeatureName::Mfccs => FeatureValue::Vector(self.mfccs),
            FeatureName::SpectralCentroid => FeatureValue::Scalar(self.spectral_centroid),
            FeatureName::SpectralBandwidth => FeatureValue::Scalar(self.spectral_bandwidth),
            FeatureName::ChromaMean => FeatureValue::Scalar(self.chroma_mean),
        }
    }

    /// All nine entries, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, FeatureValue)> + '_ {
        FeatureName::ALL.into_iter().map(|n| (n, self.get(n)))
    }

    /// `true` if every scalar and every MFCC coefficient is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, v)| match v {
            FeatureValue::Scalar(s) => s.is_finite(),
            FeatureValue::Vector(vs) => vs.iter().all(|c| c.is_finite()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_yields_every_key_once() {
        let set = FeatureSet::default();
        let names: Vec<&str> = set.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "pitch_mean",
                "pitch_std",
                "rms_mean",
                "zcr_mean",
                "tempo",
                "mfccs",
                "spectral_centroid",
                "spectral_bandwidth",
                "chroma_mean"
            ]
        );
    }

    #[test]
    fn mfccs_lookup_is_vector() {
        let set = FeatureSet {
            mfccs: [1.0; MFCC_COUNT],
            ..FeatureSet::default()
        };
        assert_eq!(set.get(FeatureName::Mfccs).as_scalar(), None);
        assert_eq!(
            set.get(FeatureName::Mfccs),
            FeatureValue::Vector([1.0; MFCC_COUNT])
        );
    }

    #[test]
    fn non_finite_detected() {
        let mut set = FeatureSet::default();
        assert!(set.is_finite());
        set.mfccs[4] = f32::NAN;
        assert!(!set.is_finite());
    }

    #[test]
    fn flags_iterate_in_canonical_order() {
        let mut flags = FeatureFlags::default();
        flags.insert(FeatureName::ChromaMean);
        flags.insert(FeatureName::PitchStd);
        flags.insert(FeatureName::PitchStd);
        let listed: Vec<FeatureName> = flags.iter().collect();
        assert_eq!(listed, [FeatureName::PitchStd, FeatureName::ChromaMean]);
        assert_eq!(flags.len(), 2);
    }
}
