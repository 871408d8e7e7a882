use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AccuracyError;

/// Pseudo-bin carrying a variable's total rather than a category.
pub const TOTAL_BIN: &str = "count";

// ---------------------------------------------------------------------------
// Control specification
// ---------------------------------------------------------------------------

/// Marginal control variables and the bins that partition each one.
///
/// Variable order is significant: `all` expands in this order and the
/// comparison table is laid out variable-major.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlSpec {
    pub variables: Vec<ControlVariable>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlVariable {
    pub name: String,
    /// Which record tables this variable is counted over.
    pub source: RecordSource,
    pub bins: Vec<String>,
    /// Bin that holds a total (e.g. household `count`). Never scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bin: Option<String>,
    /// Category column in the record tables. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// Record level a control variable is measured on. Fixes the weight column
/// used for the survey estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Persons,
    Households,
}

impl RecordSource {
    pub fn weight_column(&self) -> &'static str {
        match self {
            Self::Persons => "person_weight",
            Self::Households => "household_weight",
        }
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persons => write!(f, "persons"),
            Self::Households => write!(f, "households"),
        }
    }
}

impl ControlVariable {
    fn new(name: &str, source: RecordSource, bins: &[&str], total_bin: Option<&str>) -> Self {
        Self {
            name: name.into(),
            source,
            bins: bins.iter().map(|b| b.to_string()).collect(),
            total_bin: total_bin.map(Into::into),
            column: None,
        }
    }

    pub fn category_column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    /// Bins that get a comparison row, in specification order.
    pub fn scored_bins(&self) -> impl Iterator<Item = &str> {
        self.bins
            .iter()
            .map(String::as_str)
            .filter(move |b| Some(*b) != self.total_bin.as_deref())
    }

    /// Name of the marginal-table column for one bin: `<variable>_<bin>`.
    pub fn marginal_column(&self, bin: &str) -> String {
        format!("{}_{}", self.name, bin)
    }
}

impl Default for ControlSpec {
    /// The controls populations are fitted to: person age plus household
    /// size and vehicle count.
    fn default() -> Self {
        Self {
            variables: vec![
                ControlVariable::new(
                    "age",
                    RecordSource::Persons,
                    &["0-17", "18-34", "35-64", "65+"],
                    None,
                ),
                ControlVariable::new(
                    "num_people",
                    RecordSource::Households,
                    &[TOTAL_BIN, "1", "2", "3", "4+"],
                    Some(TOTAL_BIN),
                ),
                ControlVariable::new(
                    "num_vehicles",
                    RecordSource::Households,
                    &["0", "1", "2", "3+"],
                    None,
                ),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ControlSpec {
    pub fn from_toml(input: &str) -> Result<Self, AccuracyError> {
        let spec: ControlSpec =
            toml::from_str(input).map_err(|e| AccuracyError::ConfigParse(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), AccuracyError> {
        if self.variables.is_empty() {
            return Err(AccuracyError::ConfigValidation(
                "control specification defines no variables".into(),
            ));
        }

        let mut names = HashSet::new();
        for var in &self.variables {
            if var.name.is_empty() {
                return Err(AccuracyError::ConfigValidation("variable with empty name".into()));
            }
            if !names.insert(var.name.as_str()) {
                return Err(AccuracyError::ConfigValidation(format!(
                    "variable '{}' defined more than once",
                    var.name
                )));
            }

            let mut bins = HashSet::new();
            for bin in &var.bins {
                if !bins.insert(bin.as_str()) {
                    return Err(AccuracyError::ConfigValidation(format!(
                        "variable '{}': duplicate bin '{bin}'",
                        var.name
                    )));
                }
            }

            if let Some(ref total) = var.total_bin {
                if !bins.contains(total.as_str()) {
                    return Err(AccuracyError::ConfigValidation(format!(
                        "variable '{}': total bin '{total}' is not one of its bins",
                        var.name
                    )));
                }
            }

            if var.scored_bins().next().is_none() {
                return Err(AccuracyError::ConfigValidation(format!(
                    "variable '{}' has no scored bins",
                    var.name
                )));
            }
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ControlVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Resolve a selection to control variables. Explicit lists keep their
    /// order; repeated names are only scored once.
    pub fn select(&self, selection: &VariableSelection) -> Result<Vec<&ControlVariable>, AccuracyError> {
        match selection {
            VariableSelection::All => Ok(self.variables.iter().collect()),
            VariableSelection::Only(names) => {
                if names.is_empty() {
                    return Err(AccuracyError::ConfigValidation(
                        "no marginal variables requested".into(),
                    ));
                }
                let mut seen = HashSet::new();
                let mut out = Vec::with_capacity(names.len());
                for name in names {
                    let var = self
                        .get(name)
                        .ok_or_else(|| AccuracyError::UnknownVariable(name.clone()))?;
                    if seen.insert(name.as_str()) {
                        out.push(var);
                    }
                }
                Ok(out)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Variable selection
// ---------------------------------------------------------------------------

/// Which marginal variables to score. Written as `["all"]` or a list of
/// variable names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum VariableSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl From<Vec<String>> for VariableSelection {
    fn from(names: Vec<String>) -> Self {
        if names.len() == 1 && names[0] == "all" {
            Self::All
        } else {
            Self::Only(names)
        }
    }
}

impl From<VariableSelection> for Vec<String> {
    fn from(selection: VariableSelection) -> Self {
        match selection {
            VariableSelection::All => vec!["all".into()],
            VariableSelection::Only(names) => names,
        }
    }
}

impl std::fmt::Display for VariableSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(names) => write!(f, "{}", names.join(",")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
