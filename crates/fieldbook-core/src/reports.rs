//! Report views built from a snapshot and a selection.
//!
//! The caller owns the selection (year, month, group) and passes it in as a
//! `ReportFilter`; every view is recomputed from scratch.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::aggregate::{summarize_month, summarize_window, MonthlySummary, WindowSummary};
use crate::classify::{bucket_for, irregular, newly_inactive, pending, ReportBucket};
use crate::models::{Publisher, ServiceReport};
use crate::period::{rolling_window, Month, MonthYear};
use crate::snapshot::Snapshot;
use crate::utils::cmp_ignore_case;

/// Label for publishers without a service group
pub const NO_GROUP: &str = "Sin grupo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub year: i32,
    pub month: Month,
    /// `None` selects every group
    pub group: Option<String>,
}

impl ReportFilter {
    pub fn new(month: Month, year: i32) -> Self {
        Self {
            year,
            month,
            group: None,
        }
    }

    pub fn with_group(mut self, group: Option<String>) -> Self {
        self.group = group.filter(|g| !g.trim().is_empty());
        self
    }

    pub fn period(&self) -> MonthYear {
        MonthYear::new(self.month, self.year)
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Publishers of the selected group and the reports that belong to them.
fn scope(snapshot: &Snapshot, group: Option<&str>) -> (Vec<Publisher>, Vec<ServiceReport>) {
    if group.is_none() {
        return (snapshot.publishers.clone(), snapshot.reports.clone());
    }
    let publishers: Vec<Publisher> = snapshot
        .publishers
        .iter()
        .filter(|p| p.in_group(group))
        .cloned()
        .collect();
    let ids: HashSet<&str> = publishers.iter().map(|p| p.id.as_str()).collect();
    let reports = snapshot
        .reports
        .iter()
        .filter(|r| ids.contains(r.publisher_id.as_str()))
        .cloned()
        .collect();
    (publishers, reports)
}

/// One row of the editable monthly grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReportRow {
    pub publisher: Publisher,
    /// The stored report, or a blank one for the month
    pub report: ServiceReport,
    /// Whether `report` came from the store
    pub stored: bool,
    /// Bucket of a participating report
    pub bucket: Option<ReportBucket>,
}

/// Active publishers of the selected group with their report for the month,
/// sorted by display name.
pub fn group_report(snapshot: &Snapshot, filter: &ReportFilter) -> Vec<GroupReportRow> {
    let period = filter.period();
    let mut publishers: Vec<&Publisher> = snapshot
        .publishers
        .iter()
        .filter(|p| p.is_active() && p.in_group(filter.group()))
        .collect();
    publishers.sort_by(|a, b| {
        cmp_ignore_case(&a.last_name, &b.last_name)
            .then_with(|| cmp_ignore_case(&a.first_name, &b.first_name))
    });

    publishers
        .into_iter()
        .map(|p| {
            let stored = snapshot.reports.iter().find(|r| r.is_for(&p.id, period));
            let report = stored
                .cloned()
                .unwrap_or_else(|| ServiceReport::blank(&p.id, period));
            let bucket = report.participated.then(|| bucket_for(&report, Some(p)));
            GroupReportRow {
                publisher: p.clone(),
                report,
                stored: stored.is_some(),
                bucket,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    #[serde(rename = "grupo")]
    pub group: String,
    #[serde(flatten)]
    pub summary: MonthlySummary,
}

/// Per-group and congregation-wide totals for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedReport {
    #[serde(rename = "periodo")]
    pub period: MonthYear,
    #[serde(rename = "grupos")]
    pub groups: Vec<GroupSummary>,
    pub total: MonthlySummary,
}

/// Reports of unknown publishers only show up in `total`.
pub fn consolidated(snapshot: &Snapshot, period: MonthYear) -> ConsolidatedReport {
    let mut by_group: BTreeMap<String, (String, Vec<Publisher>)> = BTreeMap::new();
    for p in &snapshot.publishers {
        let name = p.group_name().unwrap_or(NO_GROUP);
        by_group
            .entry(name.to_lowercase())
            .or_insert_with(|| (name.to_string(), Vec::new()))
            .1
            .push(p.clone());
    }

    let groups = by_group
        .into_values()
        .map(|(group, publishers)| {
            let ids: HashSet<&str> = publishers.iter().map(|p| p.id.as_str()).collect();
            let reports: Vec<ServiceReport> = snapshot
                .reports
                .iter()
                .filter(|r| r.period() == period && ids.contains(r.publisher_id.as_str()))
                .cloned()
                .collect();
            GroupSummary {
                summary: summarize_month(&publishers, &reports, period),
                group,
            }
        })
        .collect();

    ConsolidatedReport {
        period,
        groups,
        total: summarize_month(&snapshot.publishers, &snapshot.reports, period),
    }
}

/// Publisher reference for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublisherEntry {
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "grupo")]
    pub group: Option<String>,
}

impl From<&Publisher> for PublisherEntry {
    fn from(p: &Publisher) -> Self {
        Self {
            id: p.id.clone(),
            name: p.display_name(),
            group: p.group_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrregularEntry {
    #[serde(flatten)]
    pub publisher: PublisherEntry,
    /// Three-letter month labels, oldest first
    #[serde(rename = "mesesSinInforme")]
    pub missed: Vec<String>,
}

/// Everything the dashboard shows for a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    #[serde(rename = "periodo")]
    pub period: MonthYear,
    #[serde(rename = "grupo")]
    pub group: Option<String>,
    #[serde(rename = "resumen")]
    pub summary: MonthlySummary,
    #[serde(rename = "pendientes")]
    pub pending: Vec<PublisherEntry>,
    #[serde(rename = "irregulares")]
    pub irregular: Vec<IrregularEntry>,
    #[serde(rename = "nuevosInactivos")]
    pub newly_inactive: Vec<PublisherEntry>,
    #[serde(rename = "ventana")]
    pub window: WindowSummary,
}

impl Dashboard {
    /// `window_size` months ending at the selected month feed the irregular
    /// list and the window summary.
    pub fn build(snapshot: &Snapshot, filter: &ReportFilter, window_size: usize) -> Self {
        let period = filter.period();
        let (publishers, reports) = scope(snapshot, filter.group());
        let window = rolling_window(period, window_size);

        Self {
            period,
            group: filter.group.clone(),
            summary: summarize_month(&publishers, &reports, period),
            pending: pending(&publishers, &reports, period)
                .into_iter()
                .map(PublisherEntry::from)
                .collect(),
            irregular: irregular(&publishers, &reports, &window)
                .into_iter()
                .map(|entry| IrregularEntry {
                    publisher: PublisherEntry::from(entry.publisher),
                    missed: entry.missed_abbrevs().into_iter().map(str::to_string).collect(),
                })
                .collect(),
            newly_inactive: newly_inactive(&publishers, &reports, period)
                .into_iter()
                .map(PublisherEntry::from)
                .collect(),
            window: summarize_window(&publishers, &reports, &window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublisherStatus, REGULAR_PIONEER};
    use crate::period::DEFAULT_WINDOW;

    fn publisher(id: &str, last: &str, group: &str) -> Publisher {
        Publisher {
            id: id.to_string(),
            first_name: id.to_uppercase(),
            last_name: last.to_string(),
            group: Some(group.to_string()),
            status: PublisherStatus::Active,
            ..Default::default()
        }
    }

    fn report(id: &str, period: MonthYear) -> ServiceReport {
        let mut r = ServiceReport::blank(id, period);
        r.participated = true;
        r
    }

    fn sample() -> Snapshot {
        let mut pioneer = publisher("c", "Castro", "Sur");
        pioneer.additional_privilege = Some(REGULAR_PIONEER.to_string());
        let mut gone = publisher("d", "Duarte", "Norte");
        gone.status = PublisherStatus::Transferred;

        let may = MonthYear::new(Month::May, 2024);
        let mut pioneer_report = report("c", may);
        pioneer_report.hours = Some(50.0);

        Snapshot {
            publishers: vec![
                publisher("b", "Benítez", "Norte"),
                publisher("a", "Álvarez", "norte"),
                pioneer,
                gone,
                Publisher {
                    group: None,
                    ..publisher("e", "Esquivel", "")
                },
            ],
            reports: vec![report("a", may), pioneer_report, report("e", may), report("x", may)],
            ..Default::default()
        }
    }

    #[test]
    fn test_group_report_rows() {
        let snapshot = sample();
        let filter = ReportFilter::new(Month::May, 2024).with_group(Some("Norte".to_string()));
        let rows = group_report(&snapshot, &filter);

        // Transferred publisher excluded; "Álvarez" sorts before "Benítez"
        let ids: Vec<&str> = rows.iter().map(|r| r.publisher.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(rows[0].bucket, Some(ReportBucket::Publisher));
        let benitez = &rows[1];
        assert!(!benitez.stored);
        assert!(!benitez.report.participated);
        assert_eq!(benitez.bucket, None);
    }

    #[test]
    fn test_group_report_all_groups() {
        let snapshot = sample();
        let rows = group_report(&snapshot, &ReportFilter::new(Month::May, 2024));
        assert_eq!(rows.len(), 4);
        let castro = rows.iter().find(|r| r.publisher.id == "c").unwrap();
        assert_eq!(castro.bucket, Some(ReportBucket::Regular));
        assert!(castro.stored);
    }

    #[test]
    fn test_consolidated_per_group() {
        let snapshot = sample();
        let report = consolidated(&snapshot, MonthYear::new(Month::May, 2024));
        let names: Vec<&str> = report.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(names, vec!["Norte", "Sin grupo", "Sur"]);

        assert_eq!(report.groups[0].summary.total_count(), 1);
        assert_eq!(report.groups[2].summary.regulars.hours, 50.0);
        // The report of unknown publisher "x" only counts in the total
        assert_eq!(report.total.total_count(), 4);
        let group_sum: u32 = report.groups.iter().map(|g| g.summary.total_count()).sum();
        assert_eq!(group_sum, 3);
    }

    #[test]
    fn test_dashboard_scoped_to_group() {
        let snapshot = sample();
        let filter = ReportFilter::new(Month::May, 2024).with_group(Some("Norte".to_string()));
        let dashboard = Dashboard::build(&snapshot, &filter, DEFAULT_WINDOW);

        assert_eq!(dashboard.summary.total_count(), 1);
        let pending_ids: Vec<&str> = dashboard.pending.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(pending_ids, vec!["b"]);
        assert_eq!(dashboard.irregular.len(), 2);
        let alvarez = dashboard.irregular.iter().find(|e| e.publisher.id == "a").unwrap();
        assert_eq!(alvarez.missed, vec!["Dic", "Ene", "Feb", "Mar", "Abr"]);
        assert_eq!(dashboard.window.active_reporting, 1);
        assert_eq!(dashboard.window.regular_pioneers, 0);
    }

    #[test]
    fn test_blank_group_means_all() {
        let filter = ReportFilter::new(Month::May, 2024).with_group(Some("  ".to_string()));
        assert_eq!(filter.group(), None);
    }

    #[test]
    fn test_dashboard_serializes() {
        let snapshot = sample();
        let dashboard = Dashboard::build(&snapshot, &ReportFilter::new(Month::May, 2024), DEFAULT_WINDOW);
        let value = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(value["resumen"]["regulares"]["cantidad"], 1);
        assert!(value["pendientes"].as_array().unwrap().iter().any(|p| p["id"] == "b"));
        assert_eq!(value["periodo"]["mes"], "Mayo");
        assert_eq!(value["periodo"]["anio"], 2024);
    }

    #[test]
    fn test_consolidated_serializes_period() {
        let snapshot = sample();
        let report = consolidated(&snapshot, MonthYear::new(Month::May, 2024));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["periodo"]["mes"], "Mayo");
        assert_eq!(value["total"]["periodo"]["anio"], 2024);
        assert_eq!(value["grupos"][0]["grupo"], "Norte");
        assert_eq!(value["grupos"][0]["periodo"]["mes"], "Mayo");
    }
}
