//! `doppel accuracy`: score generated populations against PUMS and marginals.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use doppel_accuracy::model::RowError;
use doppel_accuracy::{
    Accuracy, AccuracyConfig, AccuracyError, BatchSummary, ControlSpec, DataDirLoader,
    MetricReport, PumaLoader, Statistic, VariableSelection, ZeroDenominator,
};

use crate::exit_codes::{accuracy_exit_code, EXIT_ACCURACY_RUNTIME};
use crate::CliError;

#[derive(Subcommand)]
pub enum AccuracyCommands {
    /// Score every PUMA listed in an accuracy config
    #[command(after_help = "\
Examples:
  doppel accuracy run kansas.accuracy.toml
  doppel accuracy run kansas.accuracy.toml --json
  doppel accuracy run kansas.accuracy.toml --output result.json
  doppel -v accuracy run kansas.accuracy.toml")]
    Run {
        /// Path to the .accuracy.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score a single PUMA from a data directory
    #[command(after_help = "\
Examples:
  doppel accuracy puma --state 20 --puma 00500 --data-dir output
  doppel accuracy puma --state 20 --puma 00500 --data-dir output --statistic root_mean_squared_error
  doppel accuracy puma --state 29 --puma 00901 --data-dir output --variable age --variable num_vehicles")]
    Puma {
        /// State FIPS code
        #[arg(long)]
        state: String,

        /// PUMA code within the state
        #[arg(long)]
        puma: String,

        /// Directory holding state_<state>_puma_<puma>_*.csv
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,

        /// mean_absolute_pct_error, mean_root_squared_error or root_mean_squared_error
        #[arg(long, default_value = "mean_absolute_pct_error")]
        statistic: String,

        /// Marginal variable to score. Repeatable; omit for all.
        #[arg(long = "variable", value_name = "NAME")]
        variables: Vec<String>,

        /// skip (default), propagate, zero or error
        #[arg(long, default_value = "skip")]
        zero_denominator: String,

        /// Control specification TOML (defaults to the built-in controls)
        #[arg(long)]
        controls: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,
    },

    /// Validate an accuracy config without running
    #[command(after_help = "\
Examples:
  doppel accuracy validate kansas.accuracy.toml")]
    Validate {
        /// Path to the .accuracy.toml config file
        config: PathBuf,
    },
}

pub fn cmd_accuracy(cmd: AccuracyCommands, verbose: bool) -> Result<(), CliError> {
    match cmd {
        AccuracyCommands::Run { config, json, output } => cmd_accuracy_run(config, json, output, verbose),
        AccuracyCommands::Puma {
            state,
            puma,
            data_dir,
            statistic,
            variables,
            zero_denominator,
            controls,
            json,
        } => cmd_accuracy_puma(
            state,
            puma,
            data_dir,
            statistic,
            variables,
            zero_denominator,
            controls,
            json,
            verbose,
        ),
        AccuracyCommands::Validate { config } => cmd_accuracy_validate(config),
    }
}

fn accuracy_err(err: AccuracyError) -> CliError {
    let hint = match err {
        AccuracyError::Io { .. } => Some(
            "expected files named state_<state>_puma_<puma>_{persons_pums,households_pums,marginals,people,households}.csv"
                .to_string(),
        ),
        AccuracyError::MissingMarginal { .. } => {
            Some("marginal columns are named <variable>_<bin>".to_string())
        }
        _ => None,
    };
    CliError { code: accuracy_exit_code(&err), message: err.to_string(), hint }
}

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_ACCURACY_RUNTIME, message: msg.into(), hint: None }
}

fn load_config(config_path: &Path) -> Result<AccuracyConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| runtime_err(format!("cannot read config: {e}")))?;
    AccuracyConfig::from_toml(&config_str).map_err(accuracy_err)
}

fn cmd_accuracy_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    verbose: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve data_dir and controls relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let summary = doppel_accuracy::run_config(&config, base_dir).map_err(accuracy_err)?;

    if verbose {
        for p in &summary.pumas {
            if let Some(ref rows) = p.detail {
                log::info!("state {} puma {}\n{}", p.state, p.puma, format_rows(rows));
            }
        }
    }

    write_json(&summary, json_output, output_file.as_deref())?;
    print_summary(&summary);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_accuracy_puma(
    state: String,
    puma: String,
    data_dir: PathBuf,
    statistic: String,
    variables: Vec<String>,
    zero_denominator: String,
    controls: Option<PathBuf>,
    json_output: bool,
    verbose: bool,
) -> Result<(), CliError> {
    let statistic: Statistic = statistic.parse().map_err(accuracy_err)?;
    let policy: ZeroDenominator = zero_denominator.parse().map_err(accuracy_err)?;
    let selection = if variables.is_empty() {
        VariableSelection::All
    } else {
        VariableSelection::from(variables)
    };

    let spec = match controls {
        Some(path) => {
            let input = std::fs::read_to_string(&path)
                .map_err(|e| runtime_err(format!("cannot read {}: {e}", path.display())))?;
            ControlSpec::from_toml(&input).map_err(accuracy_err)?
        }
        None => ControlSpec::default(),
    };

    let input = DataDirLoader::new(&data_dir).load(&state, &puma).map_err(accuracy_err)?;
    let report = Accuracy::with_controls(input, spec)
        .statistic(statistic, &selection, policy)
        .map_err(accuracy_err)?;

    if verbose {
        if let Some(ref rows) = report.rows {
            log::info!("state {state} puma {puma}\n{}", format_rows(rows));
        }
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| runtime_err(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_report(&state, &puma, &report);
    Ok(())
}

fn cmd_accuracy_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let spec = config.load_controls(base_dir).map_err(accuracy_err)?;
    let variables = spec.select(&config.variables).map_err(accuracy_err)?;

    let pumas: usize = config.geography.iter().map(|g| g.pumas.len()).sum();
    eprintln!(
        "valid: \"{}\": {} PUMA(s) in {} state(s), {} variable(s), statistic {}",
        config.name,
        pumas,
        config.geography.len(),
        variables.len(),
        config.statistic,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn write_json(summary: &BatchSummary, json_output: bool, output_file: Option<&Path>) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(summary)
        .map_err(|e| runtime_err(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| runtime_err(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(summary: &BatchSummary) {
    eprintln!("{} ({})", summary.meta.config_name, summary.meta.statistic);
    eprintln!("{:<8}{:<8}{:>16}{:>24}", "state", "puma", "marginal-pums", "marginal-doppelganger");
    for p in &summary.pumas {
        eprintln!("{:<8}{:<8}{:>16.6}{:>24.6}", p.state, p.puma, p.error.baseline, p.error.synthetic);
    }
    eprintln!("{:<16}{:>16.6}{:>24.6}", "mean", summary.mean.baseline, summary.mean.synthetic);
    for s in &summary.skipped {
        eprintln!("skipped state {} puma {}: {}", s.state, s.puma, s.reason);
    }
}

fn print_report(state: &str, puma: &str, report: &MetricReport) {
    eprintln!(
        "state {state} puma {puma}, {}: marginal-pums {:.6}, marginal-doppelganger {:.6}",
        report.statistic, report.totals.baseline, report.totals.synthetic,
    );
    for (variable, e) in report.by_variable() {
        eprintln!("  {variable:<16}{:>12.6}{:>12.6}", e.baseline, e.synthetic);
    }
}

/// Per-row error table for logging.
fn format_rows(rows: &[RowError]) -> String {
    let mut out = format!("{:<16}{:<10}{:>16}{:>24}", "variable", "bin", "marginal-pums", "marginal-doppelganger");
    for r in rows {
        out.push_str(&format!(
            "\n{:<16}{:<10}{:>16.6}{:>24.6}",
            r.variable, r.bin, r.error.baseline, r.error.synthetic
        ));
    }
    out
}
