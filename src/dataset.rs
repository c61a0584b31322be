use crate::error::{Error, Result};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Column holding the obesity-level label of each survey row.
pub const DEFAULT_LABEL_FIELD: &str = "NObeyesdad";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Categorical,
    Integer,
    Real,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Real)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: FieldKind,
    values: ColumnValues,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    /// Numeric view of the column, or `NotNumeric` for categorical columns.
    pub fn numeric(&self) -> Result<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Ok(v),
            ColumnValues::Categorical(_) => Err(Error::NotNumeric {
                field: self.name.clone(),
            }),
        }
    }

    /// Value of `row` as a category key. Numbers are rendered the way they
    /// would be written back to CSV.
    pub fn category(&self, row: usize) -> Option<Cow<'_, str>> {
        match &self.values {
            ColumnValues::Categorical(v) => v.get(row)?.as_deref().map(Cow::Borrowed),
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(|x| Cow::Owned(format_number(x))),
        }
    }

    pub fn non_null_count(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.iter().filter(|x| x.is_some()).count(),
            ColumnValues::Categorical(v) => v.iter().filter(|x| x.is_some()).count(),
        }
    }

    /// Distinct non-null category keys in order of first appearance.
    pub fn distinct(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in 0..self.len() {
            if let Some(key) = self.category(row) {
                if seen.insert(key.to_string()) {
                    out.push(key.into_owned());
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable, column-oriented survey table. Loaded once, never mutated.
#[derive(Debug, Clone)]
pub struct RecordTable {
    columns: Vec<Column>,
    label_field: String,
    row_count: usize,
}

impl RecordTable {
    /// Load the CSV at `path`. Any I/O or structural problem is a `DataLoad` error.
    pub fn load(path: impl AsRef<Path>, label_field: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::data_load(path, e.to_string()))?;
        let table = Self::from_reader(file, path, label_field)?;
        info!(
            path = %path.display(),
            rows = table.row_count,
            columns = table.columns.len(),
            "dataset loaded"
        );
        Ok(table)
    }

    pub fn from_csv_str(content: &str, label_field: &str) -> Result<Self> {
        Self::from_reader(content.as_bytes(), Path::new("<memory>"), label_field)
    }

    pub fn from_reader<R: io::Read>(reader: R, origin: &Path, label_field: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::data_load(origin, format!("failed to read CSV headers: {}", e)))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut seen = HashSet::new();
        for h in &headers {
            if !seen.insert(h.as_str()) {
                return Err(Error::data_load(origin, format!("duplicate column '{}'", h)));
            }
        }
        if !headers.iter().any(|h| h == label_field) {
            return Err(Error::data_load(
                origin,
                format!("label column '{}' missing from header", label_field),
            ));
        }

        // Column-major raw cells
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut row_count = 0;
        for result in reader.records() {
            let record = result
                .map_err(|e| Error::data_load(origin, format!("failed to read CSV record: {}", e)))?;
            for (col, cell) in raw.iter_mut().zip(record.iter()) {
                col.push(cell.to_string());
            }
            row_count += 1;
        }

        if row_count == 0 {
            return Err(Error::data_load(origin, "CSV must contain at least one data row"));
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| {
                let force_categorical = name == label_field;
                build_column(name, cells, force_categorical)
            })
            .collect::<Vec<_>>();

        for c in &columns {
            debug!(field = c.name(), kind = ?c.kind(), "inferred field kind");
        }

        Ok(RecordTable {
            columns,
            label_field: label_field.to_string(),
            row_count,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::UnknownField {
                field: name.to_string(),
                available: self.field_names(),
            })
    }

    pub fn field_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn label_field(&self) -> &str {
        &self.label_field
    }

    pub fn label_column(&self) -> &Column {
        // Presence is checked in from_reader
        self.columns
            .iter()
            .find(|c| c.name == self.label_field)
            .unwrap_or(&self.columns[0])
    }

    /// Label of each row; `None` where the label cell was empty.
    pub fn labels(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        let col = self.label_column();
        (0..self.row_count).map(move |row| match &col.values {
            ColumnValues::Categorical(v) => v[row].as_deref(),
            ColumnValues::Numeric(_) => None,
        })
    }

    /// Distinct obesity-level labels, first appearance first.
    pub fn label_groups(&self) -> Vec<String> {
        self.label_column().distinct()
    }

    /// Every field other than the label field, in header order.
    pub fn feature_fields(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.name != self.label_field).collect()
    }

    pub fn numeric_fields(&self) -> Vec<&Column> {
        self.feature_fields().into_iter().filter(|c| c.kind.is_numeric()).collect()
    }

    pub fn categorical_fields(&self) -> Vec<&Column> {
        self.feature_fields().into_iter().filter(|c| !c.kind.is_numeric()).collect()
    }
}

/// Cell contents read as a missing value, as pandas does by default.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_null_marker(cell: &str) -> bool {
    NULL_MARKERS.contains(&cell)
}

/// Finite number in `cell`; NaN and infinities count as missing.
fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn build_column(name: String, cells: Vec<String>, force_categorical: bool) -> Column {
    let cells: Vec<Option<String>> = cells
        .into_iter()
        .map(|s| if is_null_marker(&s) { None } else { Some(s) })
        .collect();
    let present = || cells.iter().flatten();
    let has_values = present().next().is_some();

    let kind = if force_categorical || !has_values {
        FieldKind::Categorical
    } else if present().all(|s| s.parse::<i64>().is_ok()) {
        FieldKind::Integer
    } else if present().all(|s| s.parse::<f64>().is_ok()) {
        FieldKind::Real
    } else {
        FieldKind::Categorical
    };

    let values = if kind.is_numeric() {
        ColumnValues::Numeric(cells.iter().map(|c| c.as_deref().and_then(parse_finite)).collect())
    } else {
        ColumnValues::Categorical(cells)
    };

    Column { name, kind, values }
}

fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        x.to_string()
    }
}
