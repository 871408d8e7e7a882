//! `doppel-accuracy`: accuracy statistics for generated populations.
//!
//! Compares two estimators against published marginal control totals: the
//! weighted PUMS sample (baseline) and the generated population (synthetic).
//! The engine receives parsed tables and returns plain values; reading CSVs
//! from a data directory is behind the [`PumaLoader`] seam.

pub mod batch;
pub mod comparison;
pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod table;

pub use batch::{run_config, run_pumas, BatchOptions};
pub use config::{AccuracyConfig, Geography, LoadErrorPolicy};
pub use controls::{ControlSpec, VariableSelection};
pub use engine::Accuracy;
pub use error::AccuracyError;
pub use loader::{DataDirLoader, PumaLoader};
pub use metrics::{Statistic, ZeroDenominator};
pub use model::{AccuracyInput, BatchSummary, ComparisonTable, ErrorPair, MetricReport};
pub use table::Table;
