use std::fmt;

use crate::constants::MISSING_TOKENS;

/// A single cell of a loaded table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Missing entry (an empty field in the source file).
    Null,
}

/// The kind of a [`CellValue`], used for type assertions and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Bool,
    Null,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Null => "null",
        };
        f.write_str(name)
    }
}

impl CellValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            CellValue::String(_) => ValueKind::String,
            CellValue::Integer(_) => ValueKind::Integer,
            CellValue::Float(_) => ValueKind::Float,
            CellValue::Bool(_) => ValueKind::Bool,
            CellValue::Null => ValueKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lookup key used when matching values across tables.
    ///
    /// Integral floats share a key with the equivalent integer, so a label read
    /// as `1.0` in one file matches `1` in another.
    pub fn key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Float(v) if v.fract() == 0.0 && v.is_finite() => {
                Some(format!("{}", *v as i64))
            }
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

/// Infer the type of a whole column from its raw text fields.
///
/// A column is integer only if every non-empty field parses as one, then float,
/// then bool; anything else is a string column. Empty fields and the usual
/// missing-value markers (`NA`, `NaN`, `null`, ...) are always `Null`.
pub fn infer_column(fields: &[&str]) -> Vec<CellValue> {
    let present = || fields.iter().filter(|f| !is_missing(f));

    let kind = if present().next().is_none() {
        ValueKind::String
    } else if present().all(|f| f.trim().parse::<i64>().is_ok()) {
        ValueKind::Integer
    } else if present().all(|f| f.trim().parse::<f64>().is_ok()) {
        ValueKind::Float
    } else if present().all(|f| parse_bool(f).is_some()) {
        ValueKind::Bool
    } else {
        ValueKind::String
    };

    fields
        .iter()
        .map(|field| {
            if is_missing(field) {
                return CellValue::Null;
            }
            match kind {
                ValueKind::Integer => field
                    .trim()
                    .parse()
                    .map(CellValue::Integer)
                    .unwrap_or(CellValue::Null),
                ValueKind::Float => field
                    .trim()
                    .parse()
                    .map(CellValue::Float)
                    .unwrap_or(CellValue::Null),
                ValueKind::Bool => parse_bool(field).map(CellValue::Bool).unwrap_or(CellValue::Null),
                _ => CellValue::String(field.to_string()),
            }
        })
        .collect()
}

fn is_missing(field: &str) -> bool {
    field.is_empty() || MISSING_TOKENS.contains(&field)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_integer_column_with_gaps() {
        let cells = infer_column(&["1", "", "3"]);
        assert_eq!(
            cells,
            vec![CellValue::Integer(1), CellValue::Null, CellValue::Integer(3)]
        );
    }

    #[test]
    fn mixed_column_stays_text() {
        let cells = infer_column(&["42", "Great price!!"]);
        assert_eq!(cells[0], CellValue::String("42".to_string()));
        assert_eq!(cells[1].kind(), ValueKind::String);
    }

    #[test]
    fn bool_and_float_columns() {
        assert_eq!(infer_column(&["True", "false"])[0], CellValue::Bool(true));
        assert_eq!(infer_column(&["1.5", "2"])[1], CellValue::Float(2.0));
    }

    #[test]
    fn missing_markers_are_null_and_do_not_decide_the_type() {
        let cells = infer_column(&["NA", "2", "NaN", "null", "4"]);
        assert_eq!(
            cells,
            vec![
                CellValue::Null,
                CellValue::Integer(2),
                CellValue::Null,
                CellValue::Null,
                CellValue::Integer(4)
            ]
        );
        assert_eq!(infer_column(&["na", "n/a"])[0], CellValue::String("na".to_string()));
    }

    #[test]
    fn integral_float_shares_key_with_integer() {
        assert_eq!(CellValue::Float(1.0).key(), CellValue::Integer(1).key());
        assert_eq!(CellValue::Null.key(), None);
    }
}
