//! Per-column type inference over sampled cells.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredColumnType {
    Number,
    Boolean,
    Date,
    String,
    Null,
}

impl InferredColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::String => "string",
            Self::Null => "null",
        }
    }

    fn accepts(self, value: &str) -> bool {
        match self {
            Self::Boolean => is_boolean(value),
            Self::Number => is_number(value),
            Self::Date => is_date(value),
            Self::String => true,
            Self::Null => false,
        }
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

fn is_boolean(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
}

fn is_number(value: &str) -> bool {
    value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn is_date(value: &str) -> bool {
    if DateTime::parse_from_rfc3339(value).is_ok() || DateTime::parse_from_rfc2822(value).is_ok() {
        return true;
    }
    DATE_FORMATS
        .iter()
        .any(|f| NaiveDate::parse_from_str(value, f).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(value, f).is_ok())
}

/// Most specific type of a single non-empty value.
fn classify(value: &str) -> InferredColumnType {
    if is_boolean(value) {
        InferredColumnType::Boolean
    } else if is_number(value) {
        InferredColumnType::Number
    } else if is_date(value) {
        InferredColumnType::Date
    } else {
        InferredColumnType::String
    }
}

/// Infer one column's type. Empty cells are nulls and are ignored.
///
/// The first non-null sample picks the candidate type (boolean, then
/// number, then date). Any later sample the candidate rejects drops the
/// column to `String`. Numbers win over dates, so `"2024"` is a number and
/// a column mixing `"2024"` with `"2024-01-05"` ends up `String`.
pub fn infer_column_type<'a, I>(samples: I) -> InferredColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut held: Option<InferredColumnType> = None;
    for raw in samples {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        match held {
            None => held = Some(classify(value)),
            Some(InferredColumnType::String) => break,
            Some(t) if !t.accepts(value) => {
                held = Some(InferredColumnType::String);
                break;
            }
            Some(_) => {}
        }
    }
    held.unwrap_or(InferredColumnType::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_columns() {
        assert_eq!(infer_column_type(["1", "2", "3"]), InferredColumnType::Number);
        assert_eq!(infer_column_type(["TRUE", "false"]), InferredColumnType::Boolean);
        assert_eq!(
            infer_column_type(["2024-01-05", "03/15/2023", "2023-12-01T10:00:00Z"]),
            InferredColumnType::Date
        );
        assert_eq!(infer_column_type(["Acme", "Globex"]), InferredColumnType::String);
    }

    #[test]
    fn test_broken_sample_falls_back_to_string() {
        assert_eq!(infer_column_type(["1", "x", "3"]), InferredColumnType::String);
        assert_eq!(infer_column_type(["true", "1"]), InferredColumnType::String);
    }

    #[test]
    fn test_number_checked_before_date() {
        assert_eq!(infer_column_type(["2024", "1999"]), InferredColumnType::Number);
        assert_eq!(
            infer_column_type(["2024", "2024-01-05"]),
            InferredColumnType::String
        );
        assert_eq!(
            infer_column_type(["2024-01-05", "2024"]),
            InferredColumnType::String
        );
    }

    #[test]
    fn test_nulls_are_ignored() {
        assert_eq!(infer_column_type(["", " ", "4.5"]), InferredColumnType::Number);
        assert_eq!(infer_column_type(["", ""]), InferredColumnType::Null);
        assert_eq!(infer_column_type(std::iter::empty()), InferredColumnType::Null);
    }

    #[test]
    fn test_non_finite_is_not_a_number() {
        assert_eq!(infer_column_type(["NaN"]), InferredColumnType::String);
        assert_eq!(infer_column_type(["inf"]), InferredColumnType::String);
    }
}
