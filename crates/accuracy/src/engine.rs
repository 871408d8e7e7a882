use std::path::Path;

use crate::comparison::build_comparison;
use crate::controls::{ControlSpec, VariableSelection};
use crate::error::AccuracyError;
use crate::loader::{DataDirLoader, PumaLoader};
use crate::metrics::{self, Statistic, ZeroDenominator};
use crate::model::{AccuracyInput, ComparisonTable, ErrorPair, MetricReport};

/// Accuracy of one generated population: its five input tables plus the
/// control specification they are compared under.
#[derive(Debug, Clone)]
pub struct Accuracy {
    controls: ControlSpec,
    input: AccuracyInput,
}

impl Accuracy {
    /// Compare under the default controls.
    pub fn new(input: AccuracyInput) -> Self {
        Self::with_controls(input, ControlSpec::default())
    }

    pub fn with_controls(input: AccuracyInput, controls: ControlSpec) -> Self {
        Self { controls, input }
    }

    /// Load `state_<state>_puma_<puma>_*` tables from a data directory.
    pub fn from_data_dir(state: &str, puma: &str, data_dir: impl AsRef<Path>) -> Result<Self, AccuracyError> {
        let input = DataDirLoader::new(data_dir).load(state, puma)?;
        Ok(Self::new(input))
    }

    pub fn comparison(&self, variables: &VariableSelection) -> Result<ComparisonTable, AccuracyError> {
        build_comparison(&self.controls, &self.input, variables)
    }

    /// No per-row detail: the mean is taken inside the square root. Use
    /// [`Accuracy::mean_root_squared_error`] for a per-row analog.
    pub fn root_mean_squared_error(&self, variables: &VariableSelection) -> Result<ErrorPair, AccuracyError> {
        Ok(metrics::root_mean_squared_error(&self.comparison(variables)?))
    }

    pub fn mean_root_squared_error(&self, variables: &VariableSelection) -> Result<MetricReport, AccuracyError> {
        self.statistic(Statistic::MeanRootSquaredError, variables, ZeroDenominator::default())
    }

    pub fn mean_absolute_pct_error(
        &self,
        variables: &VariableSelection,
        policy: ZeroDenominator,
    ) -> Result<MetricReport, AccuracyError> {
        self.statistic(Statistic::MeanAbsolutePctError, variables, policy)
    }

    pub fn statistic(
        &self,
        statistic: Statistic,
        variables: &VariableSelection,
        policy: ZeroDenominator,
    ) -> Result<MetricReport, AccuracyError> {
        let table = self.comparison(variables)?;
        metrics::compute(statistic, &table, policy)
    }
}
