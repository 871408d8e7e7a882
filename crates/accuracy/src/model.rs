use serde::Serialize;

use crate::metrics::{Statistic, ZeroDenominator};
use crate::table::Table;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The five tables one accuracy run reads, all for the same (state, puma).
#[derive(Debug, Clone)]
pub struct AccuracyInput {
    pub person_pums: Table,
    pub household_pums: Table,
    pub marginals: Table,
    pub generated_persons: Table,
    pub generated_households: Table,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Three aligned estimates of one (variable, bin) count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub variable: String,
    pub bin: String,
    /// Weight sum over matching survey records.
    pub pums: f64,
    /// Row count over matching generated records.
    pub generated: usize,
    /// Published control total.
    pub marginal: f64,
}

/// Rows ordered variable-major, then by bin order in the control spec.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, variable: &str, bin: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.variable == variable && r.bin == bin)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Baseline (PUMS vs. marginal) and synthetic (generated vs. marginal) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorPair {
    #[serde(rename = "marginal-pums")]
    pub baseline: f64,
    #[serde(rename = "marginal-doppelganger")]
    pub synthetic: f64,
}

/// Per-row error for statistics that reduce with a final mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub variable: String,
    pub bin: String,
    #[serde(flatten)]
    pub error: ErrorPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricReport {
    pub statistic: Statistic,
    pub zero_denominator: ZeroDenominator,
    #[serde(flatten)]
    pub totals: ErrorPair,
    /// Per-row errors. `None` for RMSE, where the mean is taken before the
    /// square root and rows don't explain the total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<RowError>>,
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PumaResult {
    pub state: String,
    pub puma: String,
    #[serde(flatten)]
    pub error: ErrorPair,
    /// Per-row errors behind `error`, when the statistic has them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<RowError>>,
}

/// A unit dropped under the skip load-error policy.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPuma {
    pub state: String,
    pub puma: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub meta: BatchMeta,
    /// One row per processed (state, puma), in input order.
    pub pumas: Vec<PumaResult>,
    /// Column means over `pumas`, NaN entries skipped.
    pub mean: ErrorPair,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedPuma>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchMeta {
    pub config_name: String,
    pub statistic: Statistic,
    pub variables: Vec<String>,
    pub zero_denominator: ZeroDenominator,
    pub engine_version: String,
    pub run_at: String,
}

impl BatchSummary {
    pub fn get(&self, state: &str, puma: &str) -> Option<&ErrorPair> {
        self.pumas
            .iter()
            .find(|p| p.state == state && p.puma == puma)
            .map(|p| &p.error)
    }
}
