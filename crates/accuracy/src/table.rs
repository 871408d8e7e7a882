use crate::error::AccuracyError;

/// A parsed CSV table: named columns over string cells.
///
/// Cells stay as text. Categories are matched by exact string equality and
/// numeric columns are parsed only where a statistic needs them.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse CSV text with a header row.
    pub fn from_csv(name: &str, csv_data: &str) -> Result<Self, AccuracyError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let csv_err = |e: csv::Error| AccuracyError::Csv {
            table: name.into(),
            message: e.to_string(),
        };

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self { name: name.into(), headers, rows })
    }

    /// Build a table from in-memory cells. Short rows are padded with empty
    /// cells.
    pub fn from_rows(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        let width = headers.len();
        let rows = rows
            .iter()
            .map(|r| {
                let mut row: Vec<String> = r.iter().map(|c| c.to_string()).collect();
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    fn require_column(&self, column: &str) -> Result<usize, AccuracyError> {
        self.column_index(column).ok_or_else(|| AccuracyError::MissingColumn {
            table: self.name.clone(),
            column: column.into(),
        })
    }

    fn cell(row: &[String], idx: usize) -> &str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Number of rows whose `column` equals `value`.
    pub fn count_where(&self, column: &str, value: &str) -> Result<usize, AccuracyError> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().filter(|r| Self::cell(r, idx) == value).count())
    }

    /// Sum of `weight_column` over rows whose `column` equals `value`.
    /// Empty weights count as missing and are skipped.
    pub fn weighted_count_where(
        &self,
        column: &str,
        value: &str,
        weight_column: &str,
    ) -> Result<f64, AccuracyError> {
        let idx = self.require_column(column)?;
        let weight_idx = self.require_column(weight_column)?;

        let mut total = 0.0;
        for (i, row) in self.rows.iter().enumerate() {
            if Self::cell(row, idx) != value {
                continue;
            }
            if let Some(w) = self.parse_number(row, i, weight_idx)? {
                total += w;
            }
        }
        Ok(total)
    }

    /// Sum of a numeric column over all rows, or `None` if the column does
    /// not exist. Empty cells are skipped.
    pub fn column_sum(&self, column: &str) -> Result<Option<f64>, AccuracyError> {
        let Some(idx) = self.column_index(column) else {
            return Ok(None);
        };
        let mut total = 0.0;
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(v) = self.parse_number(row, i, idx)? {
                total += v;
            }
        }
        Ok(Some(total))
    }

    /// Parse a non-negative finite number. Blank cells are `None`.
    fn parse_number(&self, row: &[String], row_idx: usize, col_idx: usize) -> Result<Option<f64>, AccuracyError> {
        let raw = Self::cell(row, col_idx).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
            _ => Err(AccuracyError::ValueParse {
                table: self.name.clone(),
                row: row_idx + 1,
                column: self.headers[col_idx].clone(),
                value: raw.into(),
            }),
        }
    }
}
