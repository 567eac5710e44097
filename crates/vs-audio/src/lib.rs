// Audio capture, decoding, and per-buffer feature extraction for voicescope.

pub mod capture;
pub mod chroma;
pub mod decode;
pub mod error;
pub mod features;
pub mod fft;
pub mod frames;
pub mod mel;
pub mod onset;
pub mod pitch;
pub mod sanitize;
pub mod spectral;
pub mod tempo;
pub mod temporal;

pub use error::{AudioError, FeatureError};
pub use features::{FeatureExtractor, extract_features};
