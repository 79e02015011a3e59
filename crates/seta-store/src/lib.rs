//! Durable shot storage for the SETA shot telemetry service.
//!
//! Shots are kept as one JSON file per shot in a two-level directory tree:
//!
//! ```text
//! <data_dir>/
//!     <shooter_id>/
//!         <race_id>/
//!             20250301T101502.123456Z.json
//!             20250301T101503.004211Z.json
//! ```
//!
//! Each race directory is an independent append-only partition. Writers to
//! different partitions never contend; writers to the same partition are
//! serialized just long enough to allocate a unique timestamp and land the
//! file.
//!
//! # Modules
//!
//! - [`shot_store`] -- [`ShotStore`] append and enumeration
//! - [`error`] -- [`StoreError`]

pub mod error;
pub mod shot_store;

pub use error::StoreError;
pub use shot_store::ShotStore;
