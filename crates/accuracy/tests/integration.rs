use std::path::PathBuf;

use doppel_accuracy::loader::file_name;
use doppel_accuracy::{
    run_config, run_pumas, Accuracy, AccuracyConfig, AccuracyError, BatchOptions, ControlSpec,
    DataDirLoader, Geography, LoadErrorPolicy, PumaLoader, Statistic, VariableSelection, ZeroDenominator,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn kansas_00500() -> Accuracy {
    Accuracy::from_data_dir("20", "00500", fixtures_dir()).unwrap()
}

fn kansas_missouri() -> Vec<Geography> {
    vec![Geography::new("20", &["00500", "00602"]), Geography::new("29", &["00901"])]
}

// -------------------------------------------------------------------------
// Single PUMA
// -------------------------------------------------------------------------

#[test]
fn comparison_table_from_csvs() {
    let table = kansas_00500().comparison(&VariableSelection::All).unwrap();
    assert_eq!(table.len(), 12);
    assert!(table.get("num_people", "count").is_none());

    // Two PUMS persons aged 18-34 with weights 15 and 10
    let row = table.get("age", "18-34").unwrap();
    assert_eq!(row.pums, 25.0);
    assert_eq!(row.generated, 2);
    assert_eq!(row.marginal, 25.0);

    let row = table.get("num_vehicles", "1").unwrap();
    assert_eq!(row.pums, 38.0);
    assert_eq!(row.generated, 1);

    let row = table.get("num_people", "3").unwrap();
    assert_eq!(row.pums, 0.0);
    assert_eq!(row.marginal, 4.0);
}

#[test]
fn single_puma_statistics() {
    let acc = kansas_00500();
    let all = VariableSelection::All;

    let rmse = acc.root_mean_squared_error(&all).unwrap();
    assert_close(rmse.baseline, 1.75f64.sqrt());
    assert_close(rmse.synthetic, 21.246568350363468);

    let mrse = acc.mean_root_squared_error(&all).unwrap();
    assert_close(mrse.totals.baseline, 7.0 / 12.0);
    assert_close(mrse.totals.synthetic, 16.75);
    assert_eq!(mrse.rows.as_ref().unwrap().len(), 12);

    let mape = acc.mean_absolute_pct_error(&all, ZeroDenominator::default()).unwrap();
    assert_close(mape.totals.baseline, 0.5);
    assert_close(mape.totals.synthetic, 1.807302494802495);
}

#[test]
fn age_only_baseline_is_exact() {
    let acc = kansas_00500();
    let rmse = acc
        .root_mean_squared_error(&VariableSelection::Only(vec!["age".into()]))
        .unwrap();
    assert_eq!(rmse.baseline, 0.0);
    assert!(rmse.synthetic > 0.0);
}

#[test]
fn per_variable_breakdown() {
    let report = kansas_00500()
        .mean_root_squared_error(&VariableSelection::All)
        .unwrap();
    let by_var = report.by_variable();
    let names: Vec<_> = by_var.iter().map(|(v, _)| v.as_str()).collect();
    assert_eq!(names, ["age", "num_people", "num_vehicles"]);
    assert_eq!(by_var[0].1.baseline, 0.0);
    // |0 - 4| and |0 - 2| over four bins
    assert_close(by_var[1].1.baseline, 1.5);
    assert_close(by_var[2].1.baseline, 0.25);
}

#[test]
fn custom_controls_file() {
    let spec_toml =
        std::fs::read_to_string(fixtures_dir().join("households-only.controls.toml")).unwrap();
    let spec = ControlSpec::from_toml(&spec_toml).unwrap();
    let input = DataDirLoader::new(fixtures_dir()).load("20", "00500").unwrap();
    let acc = Accuracy::with_controls(input, spec);
    let table = acc.comparison(&VariableSelection::All).unwrap();
    assert_eq!(table.len(), 8);
    assert!(table.rows.iter().all(|r| r.variable != "age"));
}

#[test]
fn missing_puma_files() {
    let err = Accuracy::from_data_dir("20", "99999", fixtures_dir()).unwrap_err();
    match err {
        AccuracyError::Io { path, .. } => {
            assert_eq!(
                path.file_name().unwrap().to_str().unwrap(),
                file_name("20", "99999", "persons_pums.csv")
            );
        }
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn missing_marginal_column_in_csv() {
    let dir = tempfile::tempdir().unwrap();
    for suffix in ["persons_pums.csv", "households_pums.csv", "people.csv", "households.csv"] {
        std::fs::copy(
            fixtures_dir().join(file_name("20", "00500", suffix)),
            dir.path().join(file_name("20", "00500", suffix)),
        )
        .unwrap();
    }
    std::fs::write(
        dir.path().join(file_name("20", "00500", "marginals.csv")),
        "age_0-17,age_18-34,age_35-64\n12,25,38\n",
    )
    .unwrap();

    let acc = Accuracy::from_data_dir("20", "00500", dir.path()).unwrap();
    let err = acc
        .comparison(&VariableSelection::Only(vec!["age".into()]))
        .unwrap_err();
    assert!(matches!(err, AccuracyError::MissingMarginal { ref column } if column == "age_65+"));
}

// -------------------------------------------------------------------------
// Batch
// -------------------------------------------------------------------------

#[test]
fn batch_summary_shape_and_means() {
    let loader = DataDirLoader::new(fixtures_dir());
    let summary = run_pumas(&loader, &kansas_missouri(), &BatchOptions::default()).unwrap();

    assert_eq!(summary.meta.statistic, Statistic::MeanAbsolutePctError);
    let keys: Vec<_> = summary
        .pumas
        .iter()
        .map(|p| (p.state.as_str(), p.puma.as_str()))
        .collect();
    assert_eq!(keys, [("20", "00500"), ("20", "00602"), ("29", "00901")]);

    let baseline: Vec<f64> = summary.pumas.iter().map(|p| p.error.baseline).collect();
    let synthetic: Vec<f64> = summary.pumas.iter().map(|p| p.error.synthetic).collect();
    assert_close(summary.mean.baseline, baseline.iter().sum::<f64>() / 3.0);
    assert_close(summary.mean.synthetic, synthetic.iter().sum::<f64>() / 3.0);

    assert_close(summary.get("20", "00602").unwrap().baseline, 0.5803277305652168);
    assert_close(summary.get("29", "00901").unwrap().synthetic, 1.871183838163167);
}

#[test]
fn batch_bogus_statistic() {
    let loader = DataDirLoader::new(fixtures_dir());
    let options = BatchOptions {
        statistic: "bogus_stat".into(),
        ..BatchOptions::default()
    };
    let err = run_pumas(&loader, &kansas_missouri(), &options).unwrap_err();
    assert!(matches!(err, AccuracyError::UnknownStatistic(_)));
}

#[test]
fn batch_missing_puma_fails_fast_or_skips() {
    let loader = DataDirLoader::new(fixtures_dir());
    let geography = vec![Geography::new("20", &["00500", "99999", "00602"])];

    let err = run_pumas(&loader, &geography, &BatchOptions::default()).unwrap_err();
    assert!(matches!(err, AccuracyError::Io { .. }));

    let options = BatchOptions {
        on_load_error: LoadErrorPolicy::Skip,
        ..BatchOptions::default()
    };
    let summary = run_pumas(&loader, &geography, &options).unwrap();
    assert_eq!(summary.pumas.len(), 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].puma, "99999");
}

#[test]
fn run_from_config_file() {
    let path = fixtures_dir().join("kansas-missouri.accuracy.toml");
    let config = AccuracyConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let summary = run_config(&config, path.parent().unwrap()).unwrap();

    assert_eq!(summary.meta.config_name, "Kansas + Missouri");
    assert_eq!(summary.meta.variables, ["all"]);
    assert_eq!(summary.pumas.len(), 3);
    assert_close(summary.get("20", "00500").unwrap().baseline, 0.5);
}
