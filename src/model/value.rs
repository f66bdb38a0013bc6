use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Cell text that a CSV reader treats as missing data.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// The storage class of a column. Each variant maps to the SQLite declared type of the same name.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    #[default]
    Real,
    Text,
}

serde_plain::derive_display_from_serialize!(ColumnType);
serde_plain::derive_fromstr_from_deserialize!(ColumnType);

impl ColumnType {
    /// Picks the narrowest type that holds every non-null value. An all-null column is `Real`,
    /// which is how a dataframe would type a column of missing numbers.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut seen_integer = false;
        let mut seen_real = false;
        for value in values {
            match value {
                Value::Null => {}
                Value::Integer(_) => seen_integer = true,
                Value::Real(_) => seen_real = true,
                Value::Text(_) => return ColumnType::Text,
            }
        }
        if seen_integer && !seen_real {
            ColumnType::Integer
        } else {
            ColumnType::Real
        }
    }

    /// Maps a declared SQLite column type back onto a `ColumnType` using SQLite's affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            ColumnType::Integer
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
            ColumnType::Text
        } else {
            ColumnType::Real
        }
    }

    /// The zero that fills a missing value in a column of this type.
    pub fn zero(self) -> Value {
        match self {
            ColumnType::Integer => Value::Integer(0),
            ColumnType::Real => Value::Real(0.0),
            ColumnType::Text => Value::Text(String::from("0")),
        }
    }
}

/// A single cell.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Interprets a raw CSV field. NA markers become `Null`, numbers become `Integer` or `Real`,
    /// and anything else is kept verbatim as `Text`.
    pub fn parse_field(field: &str) -> Self {
        if is_na(field) {
            return Value::Null;
        }
        let trimmed = field.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Real(f);
        }
        Value::Text(field.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the numeric value of `Integer` and `Real` cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Null | Value::Text(_) => None,
        }
    }

    /// Converts the cell to the given column type, the way the column was typed on read. Cells
    /// that do not fit (e.g. text in a numeric column) are returned unchanged.
    pub(crate) fn conform(self, column_type: ColumnType) -> Self {
        match (column_type, self) {
            (ColumnType::Real, Value::Integer(i)) => Value::Real(i as f64),
            (ColumnType::Text, Value::Integer(i)) => Value::Text(i.to_string()),
            (ColumnType::Text, Value::Real(f)) => Value::Text(f.to_string()),
            (_, other) => other,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

fn is_na(field: &str) -> bool {
    NA_MARKERS.contains(&field)
}
