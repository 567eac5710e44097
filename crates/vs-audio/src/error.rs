use std::time::Duration;

use thiserror::Error;

/// Errors originating from the audio devices and file sources.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("Aucun périphérique audio d'entrée trouvé")]
    NoInputDevice,

    /// Unsupported audio format.
    #[error("Format audio non supporté : {0}")]
    UnsupportedFormat(String),

    /// Audio stream error.
    #[error("Erreur de stream audio : {0}")]
    StreamError(String),

    /// The device did not deliver enough samples in time.
    #[error("Capture incomplète : {got}/{wanted} échantillons après {waited:?}")]
    CaptureTimeout {
        /// Samples received.
        got: usize,
        /// Samples requested.
        wanted: usize,
        /// Time spent waiting.
        waited: Duration,
    },

    /// Audio decode error.
    #[error("Erreur de décodage : {0}")]
    DecodeError(String),

    /// A finite source has been fully consumed.
    #[error("Fin de la source audio")]
    EndOfStream,
}

/// Why a single feature could not be computed.
///
/// Never escapes the extractor: each variant is turned into the feature's
/// default value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// No samples after sanitation.
    #[error("signal vide")]
    EmptySignal,

    /// Sample rate of 0 Hz.
    #[error("fréquence d'échantillonnage invalide : {0} Hz")]
    InvalidSampleRate(u32),

    /// Analysis parameter unusable for this buffer.
    #[error("paramètre invalide : {0}")]
    InvalidParameter(&'static str),

    /// The frame iterator produced nothing.
    #[error("aucune trame analysable")]
    NoFrames,

    /// No strictly positive pitch candidate in any frame.
    #[error("aucune hauteur détectée")]
    NoPitch,

    /// The signal carries no usable structure for this measure.
    #[error("signal dégénéré : {0}")]
    Degenerate(&'static str),

    /// A tempo strategy cannot run on this input.
    #[error("stratégie indisponible : {0}")]
    Unavailable(&'static str),

    /// The computation produced NaN or infinity.
    #[error("valeur non finie")]
    NonFinite,

    /// FFT backend failure.
    #[error("FFT : {0}")]
    Fft(String),
}
