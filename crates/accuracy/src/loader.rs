use std::path::{Path, PathBuf};

use crate::error::AccuracyError;
use crate::model::AccuracyInput;
use crate::table::Table;

/// Suffixes of the five per-PUMA files, in `AccuracyInput` field order.
pub const PERSONS_PUMS: &str = "persons_pums.csv";
pub const HOUSEHOLDS_PUMS: &str = "households_pums.csv";
pub const MARGINALS: &str = "marginals.csv";
pub const GENERATED_PERSONS: &str = "people.csv";
pub const GENERATED_HOUSEHOLDS: &str = "households.csv";

/// `state_<state>_puma_<puma>_<suffix>`
pub fn file_name(state: &str, puma: &str, suffix: &str) -> String {
    format!("state_{state}_puma_{puma}_{suffix}")
}

/// Source of the five tables for one (state, puma).
pub trait PumaLoader {
    fn load(&self, state: &str, puma: &str) -> Result<AccuracyInput, AccuracyError>;
}

/// Reads the CSV layout written by the download/allocate/generate run: five
/// files per PUMA, all in one directory.
#[derive(Debug, Clone)]
pub struct DataDirLoader {
    data_dir: PathBuf,
}

impl DataDirLoader {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self { data_dir: data_dir.as_ref().to_path_buf() }
    }

    pub fn path(&self, state: &str, puma: &str, suffix: &str) -> PathBuf {
        self.data_dir.join(file_name(state, puma, suffix))
    }

    fn read(&self, state: &str, puma: &str, suffix: &str) -> Result<Table, AccuracyError> {
        let path = self.path(state, puma, suffix);
        let csv_data = std::fs::read_to_string(&path).map_err(|source| {
            log::error!(
                "cannot read {} (expected files named state_<state>_puma_<puma>_<suffix> \
                 for suffixes {PERSONS_PUMS}, {HOUSEHOLDS_PUMS}, {MARGINALS}, \
                 {GENERATED_PERSONS}, {GENERATED_HOUSEHOLDS}): {source}",
                path.display()
            );
            AccuracyError::Io { path: path.clone(), source }
        })?;
        let name = suffix.trim_end_matches(".csv");
        Table::from_csv(name, &csv_data)
    }
}

impl PumaLoader for DataDirLoader {
    fn load(&self, state: &str, puma: &str) -> Result<AccuracyInput, AccuracyError> {
        log::debug!("loading state {state} puma {puma} from {}", self.data_dir.display());
        Ok(AccuracyInput {
            person_pums: self.read(state, puma, PERSONS_PUMS)?,
            household_pums: self.read(state, puma, HOUSEHOLDS_PUMS)?,
            marginals: self.read(state, puma, MARGINALS)?,
            generated_persons: self.read(state, puma, GENERATED_PERSONS)?,
            generated_households: self.read(state, puma, GENERATED_HOUSEHOLDS)?,
        })
    }
}
