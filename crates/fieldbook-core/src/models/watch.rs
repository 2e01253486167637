use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::period::{Month, MonthYear};

/// One dated watch-duty assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "grupo", default)]
    pub group: String,
    /// Publisher in charge, if one was named
    #[serde(rename = "encargado", default)]
    pub lead_publisher_id: Option<String>,
    #[serde(rename = "notas", default)]
    pub notes: String,
}

impl WatchAssignment {
    pub fn period(&self) -> Option<MonthYear> {
        Month::from_number(self.date.month()).map(|m| MonthYear::new(m, self.date.year()))
    }

    pub fn formatted_date(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

/// Assignments dated inside `period`, earliest first.
pub fn watch_for_month(assignments: &[WatchAssignment], period: MonthYear) -> Vec<&WatchAssignment> {
    let mut found: Vec<&WatchAssignment> = assignments
        .iter()
        .filter(|a| a.period() == Some(period))
        .collect();
    found.sort_by_key(|a| a.date);
    found
}

/// Assignments for a group, earliest first.
pub fn watch_for_group<'a>(assignments: &'a [WatchAssignment], group: &str) -> Vec<&'a WatchAssignment> {
    let mut found: Vec<&WatchAssignment> = assignments
        .iter()
        .filter(|a| a.group.trim().eq_ignore_ascii_case(group.trim()))
        .collect();
    found.sort_by_key(|a| a.date);
    found
}
