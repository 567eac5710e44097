use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Interleaved sample count is not a multiple of the channel count.
    #[error("Buffer audio invalide : {samples} échantillons pour {channels} canaux")]
    InvalidBuffer {
        /// Number of interleaved samples.
        samples: usize,
        /// Declared channel count.
        channels: u16,
    },
}
