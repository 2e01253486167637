use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::period::{Month, MonthYear};

/// Marker stored in `precursorAuxiliar` for an auxiliary-pioneer month
pub const AUXILIARY_MARKER: &str = "PA";

/// One publisher's monthly field-service report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "idPublicador", default)]
    pub publisher_id: String,
    #[serde(rename = "anioCalendario", deserialize_with = "lenient_year")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: Month,
    #[serde(rename = "participacion", default, deserialize_with = "lenient_bool")]
    pub participated: bool,
    #[serde(rename = "precursorAuxiliar", default, deserialize_with = "lenient_string")]
    pub auxiliary_marker: String,
    #[serde(rename = "cursosBiblicos", default, deserialize_with = "lenient_count")]
    pub bible_courses: Option<u32>,
    #[serde(rename = "horas", default, deserialize_with = "lenient_hours")]
    pub hours: Option<f64>,
    #[serde(rename = "notas", default, deserialize_with = "lenient_string")]
    pub notes: String,
}

/// Natural key: at most one report per publisher and month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportKey {
    pub publisher_id: String,
    pub period: MonthYear,
}

impl ServiceReport {
    /// Empty, non-participating report for a publisher and month
    pub fn blank(publisher_id: &str, period: MonthYear) -> Self {
        Self {
            id: None,
            publisher_id: publisher_id.to_string(),
            year: period.year,
            month: period.month,
            participated: false,
            auxiliary_marker: String::new(),
            bible_courses: None,
            hours: None,
            notes: String::new(),
        }
    }

    pub fn period(&self) -> MonthYear {
        MonthYear::new(self.month, self.year)
    }

    pub fn key(&self) -> ReportKey {
        ReportKey {
            publisher_id: self.publisher_id.clone(),
            period: self.period(),
        }
    }

    pub fn is_for(&self, publisher_id: &str, period: MonthYear) -> bool {
        self.publisher_id == publisher_id && self.year == period.year && self.month == period.month
    }

    pub fn is_auxiliary(&self) -> bool {
        self.auxiliary_marker.trim().eq_ignore_ascii_case(AUXILIARY_MARKER)
    }

    pub fn courses(&self) -> u32 {
        self.bible_courses.unwrap_or(0)
    }

    pub fn hours_or_zero(&self) -> f64 {
        self.hours.unwrap_or(0.0)
    }
}

// Stored documents come from hand-edited forms: numbers may arrive as
// strings, blanks or garbage. Anything unusable becomes absent.

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite() && *n >= 0.0)
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value)
        .filter(|n| n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

fn lenient_hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let year = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    year.and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid calendar year: {}", value)))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "si" | "sí" | "1"),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        _ => false,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
