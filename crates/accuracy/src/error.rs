use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AccuracyError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty bins, duplicate variable, etc.).
    ConfigValidation(String),
    /// A requested variable is not defined in the control specification.
    UnknownVariable(String),
    /// The marginal table has no `<variable>_<bin>` column.
    MissingMarginal { column: String },
    /// Missing required column in a record table.
    MissingColumn { table: String, column: String },
    /// Weight or marginal value parse error.
    ValueParse { table: String, row: usize, column: String, value: String },
    /// Statistic name outside the known set.
    UnknownStatistic(String),
    /// Zero denominator in a percentage error under the `error` policy.
    DegenerateRow { variable: String, bin: String },
    /// Malformed CSV content.
    Csv { table: String, message: String },
    /// IO error (file read, etc.). Keeps the underlying cause.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for AccuracyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownVariable(name) => {
                write!(f, "unknown marginal variable '{name}' (not in control specification)")
            }
            Self::MissingMarginal { column } => {
                write!(f, "marginals: missing column '{column}'")
            }
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::ValueParse { table, row, column, value } => {
                write!(f, "table '{table}', row {row}: cannot parse '{column}' value '{value}'")
            }
            Self::UnknownStatistic(name) => write!(
                f,
                "accuracy statistic not recognized: '{name}' (expected mean_absolute_pct_error, \
                 mean_root_squared_error or root_mean_squared_error)"
            ),
            Self::DegenerateRow { variable, bin } => {
                write!(f, "zero denominator in percentage error for {variable}={bin}")
            }
            Self::Csv { table, message } => write!(f, "table '{table}': {message}"),
            Self::Io { path, source } => write!(f, "IO error reading {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for AccuracyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
