//! Publisher and report classification.
//!
//! Everything here is a pure function of the publisher list, the report list
//! and a period. Only active publishers take part in the pending, irregular
//! and newly-inactive lists. A publisher "reported" for a month when a
//! report for that month exists with `participacion = true`; a missing
//! report and a non-participating one are the same thing.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{Publisher, ServiceReport};
use crate::period::{rolling_window, MonthYear, INACTIVE_LOOKBACK};

/// Which total a participating report is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum ReportBucket {
    #[serde(rename = "publicadores")]
    Publisher,
    #[serde(rename = "auxiliares")]
    Auxiliary,
    #[serde(rename = "regulares")]
    Regular,
}

impl ReportBucket {
    pub fn label(&self) -> &'static str {
        match self {
            ReportBucket::Publisher => "Publicadores",
            ReportBucket::Auxiliary => "Precursores auxiliares",
            ReportBucket::Regular => "Precursores regulares",
        }
    }
}

/// Auxiliary marker first, then the publisher's *current* privilege.
pub fn bucket_for(report: &ServiceReport, publisher: Option<&Publisher>) -> ReportBucket {
    if report.is_auxiliary() {
        ReportBucket::Auxiliary
    } else if publisher.map(|p| p.is_regular_pioneer()).unwrap_or(false) {
        ReportBucket::Regular
    } else {
        ReportBucket::Publisher
    }
}

/// Set of (publisher, month) pairs with a participating report.
#[derive(Debug, Default)]
pub struct ReportIndex<'a> {
    reported: HashSet<(&'a str, MonthYear)>,
}

impl<'a> ReportIndex<'a> {
    pub fn new(reports: &'a [ServiceReport]) -> Self {
        let reported = reports
            .iter()
            .filter(|r| r.participated)
            .map(|r| (r.publisher_id.as_str(), r.period()))
            .collect();
        Self { reported }
    }

    pub fn has_reported(&self, publisher_id: &str, period: MonthYear) -> bool {
        self.reported.contains(&(publisher_id, period))
    }
}

pub fn has_reported(reports: &[ServiceReport], publisher_id: &str, period: MonthYear) -> bool {
    reports
        .iter()
        .any(|r| r.participated && r.is_for(publisher_id, period))
}

/// Active publishers without a participating report for `period`.
pub fn pending<'a>(
    publishers: &'a [Publisher],
    reports: &[ServiceReport],
    period: MonthYear,
) -> Vec<&'a Publisher> {
    let index = ReportIndex::new(reports);
    publishers
        .iter()
        .filter(|p| p.is_active() && !index.has_reported(&p.id, period))
        .collect()
}

/// An active publisher with at least one missed month in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct IrregularPublisher<'a> {
    pub publisher: &'a Publisher,
    /// Oldest first
    pub missed: Vec<MonthYear>,
}

impl IrregularPublisher<'_> {
    pub fn missed_abbrevs(&self) -> Vec<&'static str> {
        self.missed.iter().map(|p| p.month.abbrev()).collect()
    }
}

/// Active publishers that missed any month of `window`.
///
/// `window` may be in any order; missed months are reported oldest first.
pub fn irregular<'a>(
    publishers: &'a [Publisher],
    reports: &[ServiceReport],
    window: &[MonthYear],
) -> Vec<IrregularPublisher<'a>> {
    let index = ReportIndex::new(reports);
    let mut chronological = window.to_vec();
    chronological.sort();

    publishers
        .iter()
        .filter(|p| p.is_active())
        .filter_map(|p| {
            let missed: Vec<MonthYear> = chronological
                .iter()
                .copied()
                .filter(|period| !index.has_reported(&p.id, *period))
                .collect();
            if missed.is_empty() {
                None
            } else {
                Some(IrregularPublisher { publisher: p, missed })
            }
        })
        .collect()
}

/// Active publishers who just reached six straight months without reporting.
///
/// Looks at `period` and the six months before it: the six most recent must
/// all be misses and the oldest must be a report. Once the streak is longer
/// than six the oldest month is a miss too, so each transition fires once.
pub fn newly_inactive<'a>(
    publishers: &'a [Publisher],
    reports: &[ServiceReport],
    period: MonthYear,
) -> Vec<&'a Publisher> {
    let index = ReportIndex::new(reports);
    let window = rolling_window(period, INACTIVE_LOOKBACK);
    let Some((oldest, recent)) = window.split_last() else {
        return Vec::new();
    };

    publishers
        .iter()
        .filter(|p| p.is_active())
        .filter(|p| {
            recent.iter().all(|m| !index.has_reported(&p.id, *m))
                && index.has_reported(&p.id, *oldest)
        })
        .collect()
}

/// Distinct publishers with an auxiliary-marked report anywhere in `window`.
pub fn distinct_auxiliaries(reports: &[ServiceReport], window: &[MonthYear]) -> usize {
    let periods: HashSet<MonthYear> = window.iter().copied().collect();
    reports
        .iter()
        .filter(|r| r.is_auxiliary() && periods.contains(&r.period()))
        .map(|r| r.publisher_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Publishers keyed by id, for joining reports back to their owners.
pub fn publishers_by_id(publishers: &[Publisher]) -> HashMap<&str, &Publisher> {
    publishers.iter().map(|p| (p.id.as_str(), p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublisherStatus, REGULAR_PIONEER};
    use crate::period::Month;

    fn publisher(id: &str, status: PublisherStatus) -> Publisher {
        Publisher {
            id: id.to_string(),
            first_name: id.to_string(),
            status,
            ..Default::default()
        }
    }

    fn report(id: &str, month: Month, year: i32, participated: bool) -> ServiceReport {
        let mut r = ServiceReport::blank(id, MonthYear::new(month, year));
        r.participated = participated;
        r
    }

    #[test]
    fn test_pending_when_no_report() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        let march = MonthYear::new(Month::March, 2024);
        let result = pending(&publishers, &[], march);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[test]
    fn test_pending_iff_no_participating_report() {
        let publishers = vec![
            publisher("a", PublisherStatus::Active),
            publisher("b", PublisherStatus::Active),
            publisher("c", PublisherStatus::Active),
        ];
        let may = MonthYear::new(Month::May, 2024);
        let reports = vec![
            report("a", Month::May, 2024, true),
            report("b", Month::May, 2024, false),
            report("c", Month::May, 2023, true),
        ];
        let ids: Vec<&str> = pending(&publishers, &reports, may)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);

        for p in &publishers {
            let is_pending = ids.contains(&p.id.as_str());
            assert_eq!(is_pending, !has_reported(&reports, &p.id, may));
        }
    }

    #[test]
    fn test_pending_ignores_inactive() {
        let publishers = vec![
            publisher("a", PublisherStatus::Inactive),
            publisher("b", PublisherStatus::Transferred),
        ];
        assert!(pending(&publishers, &[], MonthYear::new(Month::May, 2024)).is_empty());
    }

    #[test]
    fn test_irregular_lists_missed_months_oldest_first() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        let reports: Vec<ServiceReport> = [Month::January, Month::February, Month::April, Month::May, Month::June]
            .iter()
            .map(|m| report("a", *m, 2024, true))
            .collect();
        let window = rolling_window(MonthYear::new(Month::June, 2024), 6);

        let result = irregular(&publishers, &reports, &window);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].missed_abbrevs(), vec!["Mar"]);
        assert!(pending(&publishers, &reports, MonthYear::new(Month::March, 2024)).len() == 1);
    }

    #[test]
    fn test_irregular_order_across_year_boundary() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        let reports = vec![
            report("a", Month::December, 2023, true),
            report("a", Month::January, 2024, true),
            report("a", Month::March, 2024, true),
        ];
        let window = rolling_window(MonthYear::new(Month::March, 2024), 6);
        let result = irregular(&publishers, &reports, &window);
        assert_eq!(
            result[0].missed,
            vec![
                MonthYear::new(Month::October, 2023),
                MonthYear::new(Month::November, 2023),
                MonthYear::new(Month::February, 2024),
            ]
        );
        assert_eq!(result[0].missed_abbrevs(), vec!["Oct", "Nov", "Feb"]);
    }

    #[test]
    fn test_regular_publisher_not_irregular() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        let window = rolling_window(MonthYear::new(Month::June, 2024), 6);
        let reports: Vec<ServiceReport> = window
            .iter()
            .map(|p| report("a", p.month, p.year, true))
            .collect();
        assert!(irregular(&publishers, &reports, &window).is_empty());
    }

    #[test]
    fn test_newly_inactive_fires_once() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        // Last report in June 2024, nothing after
        let reports = vec![report("a", Month::June, 2024, true)];

        let december = MonthYear::new(Month::December, 2024);
        let found = newly_inactive(&publishers, &reports, december);
        assert_eq!(found.len(), 1);

        // One month later the streak is seven long
        assert!(newly_inactive(&publishers, &reports, december.succ()).is_empty());
        // One month earlier the streak is only five long
        assert!(newly_inactive(&publishers, &reports, december.pred()).is_empty());
    }

    #[test]
    fn test_newly_inactive_requires_all_six_misses() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        let reports = vec![
            report("a", Month::June, 2024, true),
            report("a", Month::September, 2024, true),
        ];
        let december = MonthYear::new(Month::December, 2024);
        assert!(newly_inactive(&publishers, &reports, december).is_empty());
    }

    #[test]
    fn test_newly_inactive_non_participating_is_miss() {
        let publishers = vec![publisher("a", PublisherStatus::Active)];
        let reports = vec![
            report("a", Month::June, 2024, true),
            report("a", Month::August, 2024, false),
        ];
        let december = MonthYear::new(Month::December, 2024);
        assert_eq!(newly_inactive(&publishers, &reports, december).len(), 1);
    }

    #[test]
    fn test_bucket_precedence() {
        let mut regular = publisher("a", PublisherStatus::Active);
        regular.additional_privilege = Some(REGULAR_PIONEER.to_string());
        let plain = publisher("b", PublisherStatus::Active);

        let mut r = report("a", Month::May, 2024, true);
        assert_eq!(bucket_for(&r, Some(&regular)), ReportBucket::Regular);
        assert_eq!(bucket_for(&r, Some(&plain)), ReportBucket::Publisher);
        assert_eq!(bucket_for(&r, None), ReportBucket::Publisher);

        r.auxiliary_marker = "PA".to_string();
        assert_eq!(bucket_for(&r, Some(&regular)), ReportBucket::Auxiliary);
    }

    #[test]
    fn test_distinct_auxiliaries_deduplicates() {
        let window = rolling_window(MonthYear::new(Month::December, 2024), 6);
        let mut reports = Vec::new();
        for m in [Month::July, Month::September, Month::November] {
            let mut r = report("a", m, 2024, true);
            r.auxiliary_marker = "PA".to_string();
            reports.push(r);
        }
        let mut other = report("b", Month::October, 2024, true);
        other.auxiliary_marker = "PA".to_string();
        reports.push(other);
        // Outside the window
        let mut old = report("c", Month::June, 2024, true);
        old.auxiliary_marker = "PA".to_string();
        reports.push(old);

        assert_eq!(distinct_auxiliaries(&reports, &window), 2);
    }

    #[test]
    fn test_report_index_matches_linear_scan() {
        let reports = vec![
            report("a", Month::May, 2024, true),
            report("a", Month::June, 2024, false),
        ];
        let index = ReportIndex::new(&reports);
        for period in rolling_window(MonthYear::new(Month::July, 2024), 4) {
            assert_eq!(
                index.has_reported("a", period),
                has_reported(&reports, "a", period)
            );
        }
    }
}
