//! Présentation des résultats de voicescope.
//!
//! Provides the ratatui dashboard, the line-oriented text presenter and the
//! JSON-lines presenter.

pub mod dashboard;
pub mod json;
pub mod plain;
pub mod timing;
pub mod ui;

pub use dashboard::{Dashboard, RenderState};
pub use json::JsonPresenter;
pub use plain::PlainPresenter;
