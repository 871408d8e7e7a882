use crate::controls::{ControlSpec, ControlVariable, RecordSource, VariableSelection};
use crate::error::AccuracyError;
use crate::model::{AccuracyInput, ComparisonRow, ComparisonTable};
use crate::table::Table;

/// Build the (variable, bin) comparison table for the selected variables.
///
/// Every marginal column is resolved before any record table is scanned, so
/// a missing `<variable>_<bin>` column fails without doing partial work.
pub fn build_comparison(
    spec: &ControlSpec,
    input: &AccuracyInput,
    selection: &VariableSelection,
) -> Result<ComparisonTable, AccuracyError> {
    let variables = spec.select(selection)?;

    // (variable, bin, marginal total)
    let mut cells: Vec<(&ControlVariable, &str, f64)> = Vec::new();
    for var in variables.iter().copied() {
        for bin in var.scored_bins() {
            let column = var.marginal_column(bin);
            let marginal = input
                .marginals
                .column_sum(&column)?
                .ok_or(AccuracyError::MissingMarginal { column })?;
            cells.push((var, bin, marginal));
        }
    }

    let mut rows = Vec::with_capacity(cells.len());
    for (var, bin, marginal) in cells {
        let (survey, generated) = record_tables(input, var.source);
        let column = var.category_column();
        let pums = survey.weighted_count_where(column, bin, var.source.weight_column())?;
        let generated = generated.count_where(column, bin)?;

        rows.push(ComparisonRow {
            variable: var.name.clone(),
            bin: bin.to_string(),
            pums,
            generated,
            marginal,
        });
    }

    log::debug!(
        "comparison table: {} rows over {} variable(s) ({selection})",
        rows.len(),
        variables.len()
    );

    Ok(ComparisonTable { rows })
}

/// (survey, generated) tables for a record level.
fn record_tables(input: &AccuracyInput, source: RecordSource) -> (&Table, &Table) {
    match source {
        RecordSource::Persons => (&input.person_pums, &input.generated_persons),
        RecordSource::Households => (&input.household_pums, &input.generated_households),
    }
}
