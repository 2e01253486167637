//! Month arithmetic for report periods.
//!
//! Reports are keyed by calendar `(month, year)`. Dashboards look at rolling
//! windows that walk backward from a reference month, and at service years,
//! which run September through August and are labeled by the calendar year
//! they end in.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Default size of the irregular-publisher window
pub const DEFAULT_WINDOW: usize = 6;

/// Months the newly-inactive rule looks back over (6 misses plus the last hit)
pub const INACTIVE_LOOKBACK: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January = 1,
    February = 2,
    March = 3,
    April = 4,
    May = 5,
    June = 6,
    July = 7,
    August = 8,
    September = 9,
    October = 10,
    November = 11,
    December = 12,
}

const ALL_MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

const ENGLISH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

impl Month {
    pub fn all() -> [Month; 12] {
        ALL_MONTHS
    }

    /// 1-based month number
    pub fn number(&self) -> u32 {
        *self as u32
    }

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1..=12 => Some(ALL_MONTHS[(n - 1) as usize]),
            _ => None,
        }
    }

    /// Name as stored in report documents.
    pub fn name(&self) -> &'static str {
        match self {
            Month::January => "Enero",
            Month::February => "Febrero",
            Month::March => "Marzo",
            Month::April => "Abril",
            Month::May => "Mayo",
            Month::June => "Junio",
            Month::July => "Julio",
            Month::August => "Agosto",
            Month::September => "Septiembre",
            Month::October => "Octubre",
            Month::November => "Noviembre",
            Month::December => "Diciembre",
        }
    }

    /// Three-letter label used in missed-month lists and chart axes.
    pub fn abbrev(&self) -> &'static str {
        &self.name()[..3]
    }

    pub fn pred(&self) -> Self {
        match self {
            Month::January => Month::December,
            m => ALL_MONTHS[(m.number() - 2) as usize],
        }
    }

    pub fn succ(&self) -> Self {
        match self {
            Month::December => Month::January,
            m => ALL_MONTHS[m.number() as usize],
        }
    }

    /// September through December open the next service year
    pub fn opens_service_year(&self) -> bool {
        self.number() >= Month::September.number()
    }

    /// Parse the Spanish or English name, a three-letter abbreviation, or a
    /// month number.
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if let Ok(n) = lower.parse::<u32>() {
            return Self::from_number(n);
        }
        // "setiembre" is a common spelling for September
        if lower == "setiembre" {
            return Some(Month::September);
        }
        ALL_MONTHS.iter().copied().find(|m| {
            let spanish = m.name().to_lowercase();
            let english = ENGLISH_NAMES[(m.number() - 1) as usize];
            lower == spanish
                || lower == english
                || (lower.chars().count() == 3
                    && (spanish.starts_with(&lower) || english.starts_with(&lower)))
        })
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Month {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::parse(s).ok_or_else(|| ValidationError::UnknownMonth(s.to_string()))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Month::from_number(n)
                .ok_or_else(|| de::Error::custom(format!("month number out of range: {}", n))),
            Raw::Text(s) => {
                Month::parse(&s).ok_or_else(|| de::Error::custom(format!("unknown month: {}", s)))
            }
        }
    }
}

/// A calendar month of a specific year. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthYear {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: Month,
}

impl MonthYear {
    pub fn new(month: Month, year: i32) -> Self {
        Self { year, month }
    }

    /// The month before, wrapping January back to December of the prior year.
    pub fn pred(&self) -> Self {
        match self.month {
            Month::January => Self::new(Month::December, self.year - 1),
            m => Self::new(m.pred(), self.year),
        }
    }

    pub fn succ(&self) -> Self {
        match self.month {
            Month::December => Self::new(Month::January, self.year + 1),
            m => Self::new(m.succ(), self.year),
        }
    }

    /// Service year this month belongs to.
    pub fn service_year(&self) -> i32 {
        if self.month.opens_service_year() {
            self.year + 1
        } else {
            self.year
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.month.abbrev(), self.year)
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month.name(), self.year)
    }
}

/// `size` months ending at `end`, most recent first.
pub fn rolling_window(end: MonthYear, size: usize) -> Vec<MonthYear> {
    let mut window = Vec::with_capacity(size);
    let mut current = end;
    for _ in 0..size {
        window.push(current);
        current = current.pred();
    }
    window
}

/// Calendar year of `month` inside the service year ending in `service_year`.
pub fn service_year_calendar_year(month: Month, service_year: i32) -> i32 {
    if month.opens_service_year() {
        service_year - 1
    } else {
        service_year
    }
}

pub fn service_year_of(period: MonthYear) -> i32 {
    period.service_year()
}

/// September of the prior year through August, oldest first.
pub fn service_year_months(service_year: i32) -> Vec<MonthYear> {
    let end = MonthYear::new(Month::August, service_year);
    let mut months = rolling_window(end, 12);
    months.reverse();
    months
}

/// Twelve months ending at `cursor` placed inside `service_year`, oldest first.
pub fn chart_window(cursor: Month, service_year: i32) -> Vec<MonthYear> {
    let end = MonthYear::new(cursor, service_year_calendar_year(cursor, service_year));
    let mut months = rolling_window(end, 12);
    months.reverse();
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window_starts_at_end() {
        let end = MonthYear::new(Month::June, 2024);
        let window = rolling_window(end, DEFAULT_WINDOW);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0], end);
        assert_eq!(window[5], MonthYear::new(Month::January, 2024));
    }

    #[test]
    fn test_rolling_window_wraps_year() {
        let window = rolling_window(MonthYear::new(Month::February, 2024), 4);
        assert_eq!(
            window,
            vec![
                MonthYear::new(Month::February, 2024),
                MonthYear::new(Month::January, 2024),
                MonthYear::new(Month::December, 2023),
                MonthYear::new(Month::November, 2023),
            ]
        );
    }

    #[test]
    fn test_rolling_window_each_step_is_one_month() {
        let window = rolling_window(MonthYear::new(Month::March, 2025), 30);
        for pair in window.windows(2) {
            assert_eq!(pair[0].pred(), pair[1]);
            assert!(pair[1] < pair[0]);
        }
        assert_eq!(window[12], MonthYear::new(Month::March, 2024));
    }

    #[test]
    fn test_rolling_window_is_deterministic() {
        let end = MonthYear::new(Month::December, 2024);
        assert_eq!(rolling_window(end, 12), rolling_window(end, 12));
        assert!(rolling_window(end, 0).is_empty());
    }

    #[test]
    fn test_service_year_calendar_year() {
        assert_eq!(service_year_calendar_year(Month::September, 2025), 2024);
        assert_eq!(service_year_calendar_year(Month::December, 2025), 2024);
        assert_eq!(service_year_calendar_year(Month::January, 2025), 2025);
        assert_eq!(service_year_calendar_year(Month::August, 2025), 2025);
    }

    #[test]
    fn test_service_year_of() {
        assert_eq!(service_year_of(MonthYear::new(Month::October, 2024)), 2025);
        assert_eq!(service_year_of(MonthYear::new(Month::August, 2024)), 2024);
    }

    #[test]
    fn test_service_year_months() {
        let months = service_year_months(2025);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], MonthYear::new(Month::September, 2024));
        assert_eq!(months[11], MonthYear::new(Month::August, 2025));
    }

    #[test]
    fn test_chart_window_ends_at_cursor() {
        let months = chart_window(Month::November, 2025);
        assert_eq!(months[11], MonthYear::new(Month::November, 2024));
        assert_eq!(months[0], MonthYear::new(Month::December, 2023));

        let months = chart_window(Month::March, 2025);
        assert_eq!(months[11], MonthYear::new(Month::March, 2025));
        assert_eq!(months[0], MonthYear::new(Month::April, 2024));
    }

    #[test]
    fn test_month_parse_variants() {
        assert_eq!(Month::parse("Marzo"), Some(Month::March));
        assert_eq!(Month::parse("marzo "), Some(Month::March));
        assert_eq!(Month::parse("March"), Some(Month::March));
        assert_eq!(Month::parse("Mar"), Some(Month::March));
        assert_eq!(Month::parse("ago"), Some(Month::August));
        assert_eq!(Month::parse("Aug"), Some(Month::August));
        assert_eq!(Month::parse("setiembre"), Some(Month::September));
        assert_eq!(Month::parse("12"), Some(Month::December));
        assert_eq!(Month::parse("13"), None);
        assert_eq!(Month::parse(""), None);
        assert_eq!(Month::parse("Ma"), None);
    }

    #[test]
    fn test_month_abbrev() {
        assert_eq!(Month::March.abbrev(), "Mar");
        assert_eq!(Month::January.abbrev(), "Ene");
        assert_eq!(Month::August.abbrev(), "Ago");
    }

    #[test]
    fn test_month_serde() {
        let json = serde_json::to_string(&Month::May).unwrap();
        assert_eq!(json, "\"Mayo\"");
        let parsed: Month = serde_json::from_str("\"Diciembre\"").unwrap();
        assert_eq!(parsed, Month::December);
        let parsed: Month = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Month::April);
        assert!(serde_json::from_str::<Month>("\"Smarch\"").is_err());
    }

    #[test]
    fn test_month_pred_succ_wrap() {
        assert_eq!(Month::January.pred(), Month::December);
        assert_eq!(Month::December.succ(), Month::January);
        assert_eq!(MonthYear::new(Month::December, 2023).succ(), MonthYear::new(Month::January, 2024));
    }
}
