//! Scoring and configuration for the SETA shot telemetry service.
//!
//! # Modules
//!
//! - [`scoring`] -- Pure impact-to-score function
//! - [`config`] -- `seta-config.yaml` loading with environment overrides

pub mod config;
pub mod scoring;

pub use config::{ConfigError, SetaConfig};
pub use scoring::{score, score_shot, total_score};
