//! Error statistics over a comparison table.
//!
//! Every statistic yields a pair: the baseline compares the weighted PUMS
//! estimate with the marginal, the synthetic side compares the generated
//! population count with the marginal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccuracyError;
use crate::model::{ComparisonRow, ComparisonTable, ErrorPair, MetricReport, RowError};

// ---------------------------------------------------------------------------
// Statistic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Symmetric mean absolute percentage error.
    #[default]
    MeanAbsolutePctError,
    /// Mean of per-row absolute differences.
    MeanRootSquaredError,
    RootMeanSquaredError,
}

impl Statistic {
    pub const ALL: [Statistic; 3] = [
        Self::MeanAbsolutePctError,
        Self::MeanRootSquaredError,
        Self::RootMeanSquaredError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MeanAbsolutePctError => "mean_absolute_pct_error",
            Self::MeanRootSquaredError => "mean_root_squared_error",
            Self::RootMeanSquaredError => "root_mean_squared_error",
        }
    }
}

impl FromStr for Statistic {
    type Err = AccuracyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.name() == s)
            .ok_or_else(|| AccuracyError::UnknownStatistic(s.into()))
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Zero-denominator policy
// ---------------------------------------------------------------------------

/// What a percentage error does with a row whose `(estimate + marginal) / 2`
/// is zero.
///
/// The row's own error is 0/0 under both `skip` and `propagate`; they differ
/// only in how the mean treats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDenominator {
    /// Keep the NaN in the mean, so one degenerate row makes the total NaN.
    Propagate,
    /// Leave the NaN row out of that column's mean.
    #[default]
    Skip,
    /// Count the row as zero error. Both operands are zero, so they agree.
    Zero,
    /// Fail with [`AccuracyError::DegenerateRow`].
    Error,
}

impl ZeroDenominator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Propagate => "propagate",
            Self::Skip => "skip",
            Self::Zero => "zero",
            Self::Error => "error",
        }
    }
}

impl FromStr for ZeroDenominator {
    type Err = AccuracyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Propagate, Self::Skip, Self::Zero, Self::Error]
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                AccuracyError::ConfigValidation(format!(
                    "zero_denominator must be propagate, skip, zero or error, got '{s}'"
                ))
            })
    }
}

impl std::fmt::Display for ZeroDenominator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Compute one statistic. The policy only affects percentage error.
pub fn compute(
    statistic: Statistic,
    table: &ComparisonTable,
    policy: ZeroDenominator,
) -> Result<MetricReport, AccuracyError> {
    let (totals, rows) = match statistic {
        Statistic::RootMeanSquaredError => (root_mean_squared_error(table), None),
        Statistic::MeanRootSquaredError => {
            let (totals, rows) = mean_root_squared_error(table);
            (totals, Some(rows))
        }
        Statistic::MeanAbsolutePctError => {
            let (totals, rows) = mean_absolute_pct_error(table, policy)?;
            (totals, Some(rows))
        }
    };
    Ok(MetricReport { statistic, zero_denominator: policy, totals, rows })
}

/// `sqrt(mean((x - m)^2))` per side.
pub fn root_mean_squared_error(table: &ComparisonTable) -> ErrorPair {
    let mse = |estimate: fn(&ComparisonRow) -> f64| {
        mean(table.rows.iter().map(|r| (estimate(r) - r.marginal).powi(2)), false)
    };
    ErrorPair {
        baseline: mse(|r| r.pums).sqrt(),
        synthetic: mse(|r| r.generated as f64).sqrt(),
    }
}

/// Per row `sqrt((x - m)^2)`, i.e. the absolute difference, then the mean.
pub fn mean_root_squared_error(table: &ComparisonTable) -> (ErrorPair, Vec<RowError>) {
    let rows: Vec<RowError> = table
        .rows
        .iter()
        .map(|r| RowError {
            variable: r.variable.clone(),
            bin: r.bin.clone(),
            error: ErrorPair {
                baseline: (r.pums - r.marginal).powi(2).sqrt(),
                synthetic: (r.generated as f64 - r.marginal).powi(2).sqrt(),
            },
        })
        .collect();
    (reduce(&rows, false), rows)
}

/// Per row `|x - m| / ((x + m) / 2)`, then the mean.
pub fn mean_absolute_pct_error(
    table: &ComparisonTable,
    policy: ZeroDenominator,
) -> Result<(ErrorPair, Vec<RowError>), AccuracyError> {
    let mut rows = Vec::with_capacity(table.len());
    for r in &table.rows {
        rows.push(RowError {
            variable: r.variable.clone(),
            bin: r.bin.clone(),
            error: ErrorPair {
                baseline: pct_error(r, r.pums, policy)?,
                synthetic: pct_error(r, r.generated as f64, policy)?,
            },
        });
    }
    Ok((reduce(&rows, policy == ZeroDenominator::Skip), rows))
}

fn pct_error(row: &ComparisonRow, estimate: f64, policy: ZeroDenominator) -> Result<f64, AccuracyError> {
    let denom = (estimate + row.marginal) / 2.0;
    if denom != 0.0 {
        return Ok((estimate - row.marginal).abs() / denom);
    }
    match policy {
        // Skipped rows stay NaN in the detail and are dropped by the reduction.
        ZeroDenominator::Propagate | ZeroDenominator::Skip => {
            Ok((estimate - row.marginal).abs() / denom)
        }
        ZeroDenominator::Zero => Ok(0.0),
        ZeroDenominator::Error => Err(AccuracyError::DegenerateRow {
            variable: row.variable.clone(),
            bin: row.bin.clone(),
        }),
    }
}

/// Column means of per-row errors.
fn reduce(rows: &[RowError], skip_nan: bool) -> ErrorPair {
    ErrorPair {
        baseline: mean(rows.iter().map(|r| r.error.baseline), skip_nan),
        synthetic: mean(rows.iter().map(|r| r.error.synthetic), skip_nan),
    }
}

/// Arithmetic mean; NaN for no values.
pub(crate) fn mean(values: impl Iterator<Item = f64>, skip_nan: bool) -> f64 {
    let (sum, n) = values
        .filter(|v| !(skip_nan && v.is_nan()))
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

impl MetricReport {
    /// Mean error per variable, in table order. Empty for statistics without
    /// per-row detail.
    pub fn by_variable(&self) -> Vec<(String, ErrorPair)> {
        let Some(ref rows) = self.rows else {
            return Vec::new();
        };
        let skip_nan = self.zero_denominator == ZeroDenominator::Skip
            && self.statistic == Statistic::MeanAbsolutePctError;

        let mut order: Vec<&str> = Vec::new();
        for r in rows {
            if !order.contains(&r.variable.as_str()) {
                order.push(&r.variable);
            }
        }

        order
            .into_iter()
            .map(|var| {
                let group: Vec<RowError> =
                    rows.iter().filter(|r| r.variable == var).cloned().collect();
                (var.to_string(), reduce(&group, skip_nan))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
