use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controls::{ControlSpec, VariableSelection};
use crate::error::AccuracyError;
use crate::metrics::{Statistic, ZeroDenominator};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A batch accuracy run, usually read from `*.accuracy.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccuracyConfig {
    pub name: String,
    /// Directory holding the per-PUMA CSVs, relative to the config file.
    pub data_dir: String,
    #[serde(default)]
    pub variables: VariableSelection,
    /// Kept as text so an unknown name surfaces as
    /// [`AccuracyError::UnknownStatistic`].
    #[serde(default = "default_statistic")]
    pub statistic: String,
    #[serde(default)]
    pub zero_denominator: ZeroDenominator,
    #[serde(default)]
    pub on_load_error: LoadErrorPolicy,
    /// Optional control specification file, relative to the config file.
    #[serde(default)]
    pub controls: Option<String>,
    pub geography: Vec<Geography>,
}

fn default_statistic() -> String {
    Statistic::default().name().into()
}

/// One state and the PUMAs to score in it. Order is preserved in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Geography {
    pub state: String,
    pub pumas: Vec<String>,
}

impl Geography {
    pub fn new(state: &str, pumas: &[&str]) -> Self {
        Self {
            state: state.into(),
            pumas: pumas.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// What the batch runner does when a PUMA's tables cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorPolicy {
    /// Abort the batch with the load error.
    #[default]
    FailFast,
    /// Record the PUMA as skipped and continue.
    Skip,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AccuracyConfig {
    pub fn from_toml(input: &str) -> Result<Self, AccuracyError> {
        let config: AccuracyConfig =
            toml::from_str(input).map_err(|e| AccuracyError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AccuracyError> {
        self.statistic.parse::<Statistic>()?;

        if let VariableSelection::Only(ref names) = self.variables {
            if names.is_empty() {
                return Err(AccuracyError::ConfigValidation(
                    "variables must be [\"all\"] or a non-empty list".into(),
                ));
            }
        }

        if self.geography.is_empty() {
            return Err(AccuracyError::ConfigValidation(
                "at least one [[geography]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for geo in &self.geography {
            if geo.state.is_empty() {
                return Err(AccuracyError::ConfigValidation("geography with empty state".into()));
            }
            for puma in &geo.pumas {
                if !seen.insert((geo.state.as_str(), puma.as_str())) {
                    return Err(AccuracyError::ConfigValidation(format!(
                        "state {} puma {puma} listed more than once",
                        geo.state
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn data_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.data_dir)
    }

    /// The configured control specification, or the default controls.
    pub fn load_controls(&self, base_dir: &Path) -> Result<ControlSpec, AccuracyError> {
        match self.controls {
            None => Ok(ControlSpec::default()),
            Some(ref file) => {
                let path = base_dir.join(file);
                let input = std::fs::read_to_string(&path)
                    .map_err(|source| AccuracyError::Io { path: path.clone(), source })?;
                ControlSpec::from_toml(&input)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
