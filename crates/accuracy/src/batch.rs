use std::path::Path;

use crate::config::{AccuracyConfig, Geography, LoadErrorPolicy};
use crate::controls::{ControlSpec, VariableSelection};
use crate::engine::Accuracy;
use crate::error::AccuracyError;
use crate::loader::{DataDirLoader, PumaLoader};
use crate::metrics::{mean, Statistic, ZeroDenominator};
use crate::model::{BatchMeta, BatchSummary, ErrorPair, PumaResult, SkippedPuma};

/// Settings shared by every PUMA in a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub name: String,
    pub controls: ControlSpec,
    pub variables: VariableSelection,
    /// Resolved before any table is loaded.
    pub statistic: String,
    pub zero_denominator: ZeroDenominator,
    pub on_load_error: LoadErrorPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            name: "accuracy".into(),
            controls: ControlSpec::default(),
            variables: VariableSelection::All,
            statistic: Statistic::default().name().into(),
            zero_denominator: ZeroDenominator::default(),
            on_load_error: LoadErrorPolicy::default(),
        }
    }
}

/// Score every (state, puma) in order and summarize.
///
/// An unknown statistic or variable fails before anything is loaded. Load
/// failures abort the batch unless the options say to skip them.
pub fn run_pumas<L: PumaLoader + ?Sized>(
    loader: &L,
    geography: &[Geography],
    options: &BatchOptions,
) -> Result<BatchSummary, AccuracyError> {
    let statistic: Statistic = options.statistic.parse().map_err(|e: AccuracyError| {
        log::error!("{e}");
        e
    })?;
    options.controls.validate()?;
    options.controls.select(&options.variables)?;

    let mut pumas = Vec::new();
    let mut skipped = Vec::new();

    for geo in geography {
        for puma in &geo.pumas {
            log::info!("run accuracy: {} {}", geo.state, puma);

            let input = match loader.load(&geo.state, puma) {
                Ok(input) => input,
                Err(e) if options.on_load_error == LoadErrorPolicy::Skip => {
                    log::warn!("skipping state {} puma {puma}: {e}", geo.state);
                    skipped.push(SkippedPuma {
                        state: geo.state.clone(),
                        puma: puma.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let accuracy = Accuracy::with_controls(input, options.controls.clone());
            let report = accuracy.statistic(statistic, &options.variables, options.zero_denominator)?;
            log::debug!(
                "state {} puma {puma}: {statistic} pums={} doppelganger={}",
                geo.state,
                report.totals.baseline,
                report.totals.synthetic
            );

            pumas.push(PumaResult {
                state: geo.state.clone(),
                puma: puma.clone(),
                error: report.totals,
                detail: report.rows,
            });
        }
    }

    let column_mean = ErrorPair {
        baseline: mean(pumas.iter().map(|p| p.error.baseline), true),
        synthetic: mean(pumas.iter().map(|p| p.error.synthetic), true),
    };
    log::info!(
        "PUMA totals: {} processed, {} skipped, mean marginal-pums={} marginal-doppelganger={}",
        pumas.len(),
        skipped.len(),
        column_mean.baseline,
        column_mean.synthetic
    );

    Ok(BatchSummary {
        meta: BatchMeta {
            config_name: options.name.clone(),
            statistic,
            variables: options.variables.clone().into(),
            zero_denominator: options.zero_denominator,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        pumas,
        mean: column_mean,
        skipped,
    })
}

/// Run a parsed config. Relative paths resolve against `base_dir`, normally
/// the config file's directory.
pub fn run_config(config: &AccuracyConfig, base_dir: &Path) -> Result<BatchSummary, AccuracyError> {
    let options = BatchOptions {
        name: config.name.clone(),
        controls: config.load_controls(base_dir)?,
        variables: config.variables.clone(),
        statistic: config.statistic.clone(),
        zero_denominator: config.zero_denominator,
        on_load_error: config.on_load_error,
    };
    let loader = DataDirLoader::new(config.data_dir(base_dir));
    run_pumas(&loader, &config.geography, &options)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::model::AccuracyInput;
    use crate::table::Table;

    /// In-memory loader keyed by (state, puma). Records every load.
    struct MemLoader {
        inputs: HashMap<(String, String), AccuracyInput>,
        calls: RefCell<Vec<String>>,
    }

    impl MemLoader {
        fn new(units: &[(&str, &str, f64)]) -> Self {
            let inputs = units
                .iter()
                .map(|(s, p, w)| ((s.to_string(), p.to_string()), input(*w)))
                .collect();
            Self { inputs, calls: RefCell::new(Vec::new()) }
        }
    }

    impl PumaLoader for MemLoader {
        fn load(&self, state: &str, puma: &str) -> Result<AccuracyInput, AccuracyError> {
            self.calls.borrow_mut().push(format!("{state}/{puma}"));
            self.inputs
                .get(&(state.to_string(), puma.to_string()))
                .cloned()
                .ok_or_else(|| AccuracyError::Io {
                    path: format!("state_{state}_puma_{puma}_persons_pums.csv").into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                })
        }
    }

    /// One age bin with marginal 100, PUMS weight `w` and 100 generated people.
    fn input(w: f64) -> AccuracyInput {
        let people: Vec<&[&str]> = vec![&["18-34"][..]; 100];
        let weight = w.to_string();
        AccuracyInput {
            person_pums: Table::from_rows("persons_pums", &["age", "person_weight"], &[&["18-34", weight.as_str()]]),
            household_pums: Table::from_rows("households_pums", &["household_weight"], &[]),
            marginals: Table::from_rows("marginals", &["age_18-34"], &[&["100"]]),
            generated_persons: Table::from_rows("people", &["age"], &people),
            generated_households: Table::from_rows("households", &[], &[]),
        }
    }

    /// Adds an empty `65+` bin whose marginal is `marginal_65`. With a zero
    /// marginal the bin is 0 vs. 0 on both sides.
    fn two_bin_input(w: f64, marginal_65: &str) -> AccuracyInput {
        let mut inp = input(w);
        inp.marginals = Table::from_rows("marginals", &["age_18-34", "age_65+"], &[&["100", marginal_65]]);
        inp
    }

    fn two_bin_options(zero_denominator: ZeroDenominator) -> BatchOptions {
        BatchOptions {
            controls: ControlSpec::from_toml(
                "[[variables]]\nname = \"age\"\nsource = \"persons\"\nbins = [\"18-34\", \"65+\"]\n",
            )
            .unwrap(),
            zero_denominator,
            ..BatchOptions::default()
        }
    }

    fn two_bin_loader() -> MemLoader {
        let mut loader = MemLoader::new(&[]);
        for (state, puma, w, marginal_65) in
            [("20", "00500", 50.0, "0"), ("20", "00602", 100.0, "0"), ("29", "00901", 80.0, "10")]
        {
            loader
                .inputs
                .insert((state.to_string(), puma.to_string()), two_bin_input(w, marginal_65));
        }
        loader
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn options(statistic: &str) -> BatchOptions {
        BatchOptions {
            controls: ControlSpec::from_toml(
                "[[variables]]\nname = \"age\"\nsource = \"persons\"\nbins = [\"18-34\"]\n",
            )
            .unwrap(),
            statistic: statistic.into(),
            ..BatchOptions::default()
        }
    }

    fn geography() -> Vec<Geography> {
        vec![Geography::new("20", &["00500", "00602"]), Geography::new("29", &["00901"])]
    }

    #[test]
    fn summary_rows_in_input_order() {
        let loader = MemLoader::new(&[("20", "00500", 50.0), ("20", "00602", 100.0), ("29", "00901", 80.0)]);
        let summary = run_pumas(&loader, &geography(), &options("mean_root_squared_error"))
            .unwrap();
        let keys: Vec<_> = summary.pumas.iter().map(|p| (p.state.as_str(), p.puma.as_str())).collect();
        assert_eq!(keys, [("20", "00500"), ("20", "00602"), ("29", "00901")]);
        assert_eq!(summary.get("20", "00500").unwrap().baseline, 50.0);
        assert_eq!(summary.get("29", "00901").unwrap().baseline, 20.0);
        assert_eq!(summary.mean.baseline, (50.0 + 0.0 + 20.0) / 3.0);
        assert_eq!(summary.mean.synthetic, 0.0);
        assert!(summary.skipped.is_empty());
        assert_eq!(summary.meta.statistic, Statistic::MeanRootSquaredError);
    }

    #[test]
    fn unknown_statistic_loads_nothing() {
        let loader = MemLoader::new(&[("20", "00500", 50.0)]);
        let err = run_pumas(&loader, &geography(), &options("bogus_stat")).unwrap_err();
        assert!(matches!(err, AccuracyError::UnknownStatistic(ref s) if s == "bogus_stat"));
        assert!(loader.calls.borrow().is_empty());
    }

    #[test]
    fn unknown_variable_loads_nothing() {
        let loader = MemLoader::new(&[("20", "00500", 50.0)]);
        let mut opts = options("mean_absolute_pct_error");
        opts.variables = VariableSelection::Only(vec!["income".into()]);
        assert!(run_pumas(&loader, &geography(), &opts).is_err());
        assert!(loader.calls.borrow().is_empty());
    }

    #[test]
    fn load_failure_is_fatal_by_default() {
        let loader = MemLoader::new(&[("20", "00500", 50.0), ("29", "00901", 80.0)]);
        let err = run_pumas(&loader, &geography(), &options("root_mean_squared_error")).unwrap_err();
        assert!(err.to_string().contains("puma_00602"));
        // Stopped at the failing unit
        assert_eq!(*loader.calls.borrow(), ["20/00500", "20/00602"]);
    }

    #[test]
    fn load_failure_skipped_when_configured() {
        let loader = MemLoader::new(&[("20", "00500", 50.0), ("29", "00901", 80.0)]);
        let mut opts = options("root_mean_squared_error");
        opts.on_load_error = LoadErrorPolicy::Skip;
        let summary = run_pumas(&loader, &geography(), &opts).unwrap();
        assert_eq!(summary.pumas.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].puma, "00602");
        assert_eq!(summary.mean.baseline, 35.0);
    }

    #[test]
    fn detail_kept_for_row_statistics() {
        let loader = MemLoader::new(&[("20", "00500", 50.0), ("20", "00602", 100.0), ("29", "00901", 80.0)]);
        let summary = run_pumas(&loader, &geography(), &options("mean_absolute_pct_error")).unwrap();
        assert_eq!(summary.pumas[0].detail.as_ref().unwrap().len(), 1);

        let summary = run_pumas(&loader, &geography(), &options("root_mean_squared_error")).unwrap();
        assert!(summary.pumas[0].detail.is_none());
    }

    #[test]
    fn degenerate_bins_skipped_in_puma_and_batch_means() {
        let summary = run_pumas(&two_bin_loader(), &geography(), &two_bin_options(ZeroDenominator::default()))
            .unwrap();

        // 00500: only 18-34 counts, |50 - 100| / 75
        let first = summary.get("20", "00500").unwrap();
        assert!(approx(first.baseline, 2.0 / 3.0));
        assert_eq!(first.synthetic, 0.0);
        let detail = summary.pumas[0].detail.as_ref().unwrap();
        assert!(detail[1].error.baseline.is_nan());

        assert_eq!(summary.get("20", "00602").unwrap().baseline, 0.0);

        // 00901: 18-34 gives 20/90 and 0; 65+ is 0 vs. 10 on both sides, error 2
        let last = summary.get("29", "00901").unwrap();
        assert!(approx(last.baseline, (2.0 / 9.0 + 2.0) / 2.0));
        assert!(approx(last.synthetic, 1.0));

        assert!(approx(summary.mean.baseline, (2.0 / 3.0 + 0.0 + 10.0 / 9.0) / 3.0));
        assert!(approx(summary.mean.synthetic, 1.0 / 3.0));
    }

    #[test]
    fn nan_puma_left_out_of_batch_mean() {
        let summary = run_pumas(&two_bin_loader(), &geography(), &two_bin_options(ZeroDenominator::Propagate))
            .unwrap();
        assert!(summary.get("20", "00500").unwrap().baseline.is_nan());
        assert!(summary.get("20", "00602").unwrap().synthetic.is_nan());

        let last = *summary.get("29", "00901").unwrap();
        assert_eq!(summary.mean, last);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["pumas"][0]["marginal-pums"].is_null());
        assert!(json["mean"]["marginal-pums"].is_f64());
    }

    #[test]
    fn summary_json_columns() {
        let loader = MemLoader::new(&[("20", "00500", 50.0), ("20", "00602", 100.0), ("29", "00901", 80.0)]);
        let summary = run_pumas(&loader, &geography(), &options("root_mean_squared_error")).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        let first = &json["pumas"][0];
        assert_eq!(first["state"], "20");
        assert_eq!(first["marginal-pums"], 50.0);
        assert_eq!(first["marginal-doppelganger"], 0.0);
        assert_eq!(json["meta"]["statistic"], "root_mean_squared_error");
        assert!(json.get("skipped").is_none());
    }
}
