//! Types partagés, configuration et traits pour voicescope.
//!
//! This crate contains the data model exchanged between the recorder, the
//! feature extractor, the rule evaluator and the presenters.

pub mod buffer;
pub mod config;
pub mod error;
pub mod features;
pub mod report;
pub mod traits;

pub use buffer::AudioBuffer;
pub use config::{AnalysisConfig, CaptureConfig, Thresholds, VoiceConfig};
pub use error::CoreError;
pub use features::{FeatureFlags, FeatureName, FeatureSet, FeatureValue, MFCC_COUNT};
pub use report::{Diagnostic, DiagnosticReport, RuleCategory, Severity};
