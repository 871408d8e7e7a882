//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Scripts rely on them.
//!
//! | Range   | Domain     | Description                              |
//! |---------|------------|------------------------------------------|
//! | 0       | Universal  | Success                                  |
//! | 1       | Universal  | General error (unspecified)              |
//! | 2       | Universal  | CLI usage error (emitted by clap)        |
//! | 60-69   | accuracy   | Accuracy run codes                       |

use doppel_accuracy::AccuracyError;

// =============================================================================
// Universal
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

// =============================================================================
// Accuracy (60-69)
// =============================================================================

/// Config or control specification failed to parse or validate, or names a
/// variable / marginal column that does not exist.
pub const EXIT_ACCURACY_INVALID_CONFIG: u8 = 60;

/// Data could not be read or parsed, or a statistic hit a degenerate row
/// under the `error` policy.
pub const EXIT_ACCURACY_RUNTIME: u8 = 61;

/// Statistic name not recognized.
pub const EXIT_ACCURACY_UNKNOWN_STATISTIC: u8 = 62;

/// Map an engine error to its exit code.
pub fn accuracy_exit_code(err: &AccuracyError) -> u8 {
    match err {
        AccuracyError::ConfigParse(_)
        | AccuracyError::ConfigValidation(_)
        | AccuracyError::UnknownVariable(_)
        | AccuracyError::MissingMarginal { .. } => EXIT_ACCURACY_INVALID_CONFIG,
        AccuracyError::UnknownStatistic(_) => EXIT_ACCURACY_UNKNOWN_STATISTIC,
        AccuracyError::MissingColumn { .. }
        | AccuracyError::ValueParse { .. }
        | AccuracyError::DegenerateRow { .. }
        | AccuracyError::Csv { .. }
        | AccuracyError::Io { .. } => EXIT_ACCURACY_RUNTIME,
    }
}
