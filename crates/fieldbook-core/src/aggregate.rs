//! Count, hour and course totals per report bucket.

use std::collections::HashSet;

use serde::Serialize;

use crate::classify::{bucket_for, distinct_auxiliaries, publishers_by_id, ReportBucket};
use crate::models::{Publisher, ServiceReport};
use crate::period::{chart_window, Month, MonthYear};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct BucketTotals {
    #[serde(rename = "cantidad")]
    pub count: u32,
    #[serde(rename = "horas")]
    pub hours: f64,
    #[serde(rename = "cursos")]
    pub courses: u32,
}

impl BucketTotals {
    fn add(&mut self, report: &ServiceReport) {
        self.count += 1;
        self.hours += report.hours_or_zero();
        self.courses += report.courses();
    }
}

/// Totals for one month, split by bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct MonthlySummary {
    #[serde(rename = "periodo")]
    #[cfg_attr(feature = "ts", ts(type = "{ anio: number, mes: string }"))]
    pub period: MonthYear,
    #[serde(rename = "publicadores")]
    pub publishers: BucketTotals,
    #[serde(rename = "auxiliares")]
    pub auxiliaries: BucketTotals,
    #[serde(rename = "regulares")]
    pub regulars: BucketTotals,
}

impl MonthlySummary {
    pub fn empty(period: MonthYear) -> Self {
        Self {
            period,
            publishers: BucketTotals::default(),
            auxiliaries: BucketTotals::default(),
            regulars: BucketTotals::default(),
        }
    }

    pub fn bucket(&self, bucket: ReportBucket) -> &BucketTotals {
        match bucket {
            ReportBucket::Publisher => &self.publishers,
            ReportBucket::Auxiliary => &self.auxiliaries,
            ReportBucket::Regular => &self.regulars,
        }
    }

    fn bucket_mut(&mut self, bucket: ReportBucket) -> &mut BucketTotals {
        match bucket {
            ReportBucket::Publisher => &mut self.publishers,
            ReportBucket::Auxiliary => &mut self.auxiliaries,
            ReportBucket::Regular => &mut self.regulars,
        }
    }

    pub fn total_count(&self) -> u32 {
        self.publishers.count + self.auxiliaries.count + self.regulars.count
    }

    /// Publisher-only reports carry no meaningful hours
    pub fn total_hours(&self) -> f64 {
        self.auxiliaries.hours + self.regulars.hours
    }

    pub fn total_courses(&self) -> u32 {
        self.publishers.courses + self.auxiliaries.courses + self.regulars.courses
    }
}

/// Buckets every participating report of `period`.
pub fn summarize_month(
    publishers: &[Publisher],
    reports: &[ServiceReport],
    period: MonthYear,
) -> MonthlySummary {
    let by_id = publishers_by_id(publishers);
    let mut summary = MonthlySummary::empty(period);
    for report in reports.iter().filter(|r| r.participated && r.period() == period) {
        let owner = by_id.get(report.publisher_id.as_str()).copied();
        summary.bucket_mut(bucket_for(report, owner)).add(report);
    }
    summary
}

/// Headcounts over a rolling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct WindowSummary {
    /// Active regular pioneers today, not historically
    #[serde(rename = "precursoresRegulares")]
    pub regular_pioneers: usize,
    #[serde(rename = "publicadoresActivos")]
    pub active_reporting: usize,
    #[serde(rename = "precursoresAuxiliares")]
    pub auxiliaries: usize,
}

pub fn summarize_window(
    publishers: &[Publisher],
    reports: &[ServiceReport],
    window: &[MonthYear],
) -> WindowSummary {
    let periods: HashSet<MonthYear> = window.iter().copied().collect();
    let active: HashSet<&str> = publishers
        .iter()
        .filter(|p| p.is_active())
        .map(|p| p.id.as_str())
        .collect();

    let active_reporting = reports
        .iter()
        .filter(|r| r.participated && periods.contains(&r.period()))
        .map(|r| r.publisher_id.as_str())
        .filter(|id| active.contains(id))
        .collect::<HashSet<_>>()
        .len();

    WindowSummary {
        regular_pioneers: publishers
            .iter()
            .filter(|p| p.is_active() && p.is_regular_pioneer())
            .count(),
        active_reporting,
        auxiliaries: distinct_auxiliaries(reports, window),
    }
}

/// Monthly summaries for the 12 months ending at `cursor` in `service_year`,
/// oldest first.
pub fn service_year_series(
    publishers: &[Publisher],
    reports: &[ServiceReport],
    cursor: Month,
    service_year: i32,
) -> Vec<MonthlySummary> {
    chart_window(cursor, service_year)
        .into_iter()
        .map(|period| summarize_month(publishers, reports, period))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublisherStatus, REGULAR_PIONEER};
    use crate::period::rolling_window;

    fn active(id: &str) -> Publisher {
        Publisher {
            id: id.to_string(),
            status: PublisherStatus::Active,
            ..Default::default()
        }
    }

    fn pioneer(id: &str) -> Publisher {
        Publisher {
            additional_privilege: Some(REGULAR_PIONEER.to_string()),
            ..active(id)
        }
    }

    fn report(id: &str, period: MonthYear, hours: Option<f64>, courses: Option<u32>) -> ServiceReport {
        let mut r = ServiceReport::blank(id, period);
        r.participated = true;
        r.hours = hours;
        r.bible_courses = courses;
        r
    }

    #[test]
    fn test_regular_pioneer_scenario() {
        let ana = Publisher {
            first_name: "Ana".to_string(),
            last_name: "Gómez".to_string(),
            ..pioneer("ana")
        };
        let may = MonthYear::new(Month::May, 2024);
        let reports = vec![report("ana", may, Some(55.0), Some(3))];

        let summary = summarize_month(&[ana], &reports, may);
        assert_eq!(summary.regulars.count, 1);
        assert_eq!(summary.regulars.hours, 55.0);
        assert_eq!(summary.regulars.courses, 3);
        assert_eq!(summary.publishers, BucketTotals::default());
        assert_eq!(summary.auxiliaries, BucketTotals::default());
    }

    #[test]
    fn test_bucket_counts_sum_to_participating() {
        let publishers = vec![active("a"), pioneer("b"), active("c"), active("d")];
        let may = MonthYear::new(Month::May, 2024);
        let mut aux = report("c", may, Some(30.0), Some(1));
        aux.auxiliary_marker = "PA".to_string();
        let mut skipped = report("d", may, None, None);
        skipped.participated = false;
        let reports = vec![
            report("a", may, None, Some(2)),
            report("b", may, Some(50.0), Some(4)),
            aux,
            skipped,
            report("a", may.pred(), None, Some(9)),
        ];

        let summary = summarize_month(&publishers, &reports, may);
        let participating = reports
            .iter()
            .filter(|r| r.participated && r.period() == may)
            .count() as u32;
        assert_eq!(summary.total_count(), participating);
        assert_eq!(summary.total_count(), 3);
        assert_eq!(summary.total_hours(), 80.0);
        assert_eq!(summary.total_courses(), 7);
    }

    #[test]
    fn test_publisher_hours_excluded_from_total() {
        let may = MonthYear::new(Month::May, 2024);
        let reports = vec![report("a", may, Some(12.0), None)];
        let summary = summarize_month(&[active("a")], &reports, may);
        assert_eq!(summary.publishers.hours, 12.0);
        assert_eq!(summary.total_hours(), 0.0);
    }

    #[test]
    fn test_unknown_publisher_counted_as_publisher() {
        let may = MonthYear::new(Month::May, 2024);
        let reports = vec![report("ghost", may, None, Some(1))];
        let summary = summarize_month(&[], &reports, may);
        assert_eq!(summary.publishers.count, 1);
    }

    #[test]
    fn test_summarize_window() {
        let mut inactive_pioneer = pioneer("z");
        inactive_pioneer.status = PublisherStatus::Inactive;
        let publishers = vec![active("a"), pioneer("b"), active("c"), inactive_pioneer];
        let end = MonthYear::new(Month::December, 2024);
        let window = rolling_window(end, 6);

        let mut aux = report("c", MonthYear::new(Month::August, 2024), None, None);
        aux.auxiliary_marker = "PA".to_string();
        let reports = vec![
            report("a", end, None, None),
            report("a", end.pred(), None, None),
            report("b", MonthYear::new(Month::July, 2024), None, None),
            aux,
            report("z", end, None, None),
            // Outside the window
            report("c", MonthYear::new(Month::June, 2024), None, None),
        ];

        let summary = summarize_window(&publishers, &reports, &window);
        assert_eq!(summary.regular_pioneers, 1);
        assert_eq!(summary.active_reporting, 3);
        assert_eq!(summary.auxiliaries, 1);
    }

    #[test]
    fn test_service_year_series_follows_chart_window() {
        let publishers = vec![active("a")];
        let oct = MonthYear::new(Month::October, 2024);
        let reports = vec![report("a", oct, None, Some(1))];

        let series = service_year_series(&publishers, &reports, Month::November, 2025);
        assert_eq!(series.len(), 12);
        assert_eq!(series[11].period, MonthYear::new(Month::November, 2024));
        assert_eq!(series[10].period, oct);
        assert_eq!(series[10].total_count(), 1);
        assert_eq!(series[9].total_count(), 0);
    }

    #[test]
    fn test_series_json_labels_each_month() {
        let series = service_year_series(&[], &[], Month::November, 2025);
        let value = serde_json::to_value(&series).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[0]["periodo"], serde_json::json!({"anio": 2023, "mes": "Diciembre"}));
        assert_eq!(entries[11]["periodo"], serde_json::json!({"anio": 2024, "mes": "Noviembre"}));
        assert_eq!(entries[11]["regulares"]["cantidad"], 0);
    }
}
