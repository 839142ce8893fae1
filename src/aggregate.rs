use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{AssessmentRecord, PeriodLabel, PeriodSnapshot, SubjectScores};
use crate::subject::{canonicalize, SubjectTally};

/// How a record timestamp is turned into a period label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodFormat {
    /// Abbreviated month name ("Jan"). The same month in different years
    /// shares a bucket.
    #[default]
    MonthName,
    /// "2026-01".
    YearMonth,
}

impl PeriodFormat {
    fn pattern(self) -> &'static str {
        match self {
            PeriodFormat::MonthName => "%b",
            PeriodFormat::YearMonth => "%Y-%m",
        }
    }
}

/// Groups one learner's history into calendar-month buckets and averages
/// each tracked subject per bucket.
#[derive(Debug, Clone, Copy)]
pub struct TemporalAggregator {
    offset: FixedOffset,
    format: PeriodFormat,
}

impl Default for TemporalAggregator {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            format: PeriodFormat::default(),
        }
    }
}

impl TemporalAggregator {
    pub fn new(offset: FixedOffset, format: PeriodFormat) -> Self {
        Self { offset, format }
    }

    pub fn period_label(&self, occurred_at: DateTime<Utc>) -> String {
        occurred_at
            .with_timezone(&self.offset)
            .format(self.format.pattern())
            .to_string()
    }

    /// Buckets `records` in the order given; the caller supplies them
    /// chronologically. Periods come out in first-seen order.
    ///
    /// An empty history yields a single [`PeriodLabel::NoData`] snapshot.
    pub fn aggregate(&self, records: &[AssessmentRecord]) -> Vec<PeriodSnapshot> {
        if records.is_empty() {
            return vec![PeriodSnapshot::no_data()];
        }

        let mut order: Vec<(String, SubjectTally)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            let label = self.period_label(record.occurred_at);
            let slot = match index.get(&label) {
                Some(&slot) => slot,
                None => {
                    index.insert(label.clone(), order.len());
                    order.push((label, SubjectTally::default()));
                    order.len() - 1
                }
            };
            order[slot].1.record(canonicalize(&record.subject), record.score);
        }

        debug!(
            records = records.len(),
            periods = order.len(),
            "aggregated learner history"
        );

        order
            .into_iter()
            .map(|(label, tally)| PeriodSnapshot {
                label: PeriodLabel::Period(label),
                scores: SubjectScores::from_fn(|subject| tally.mean(subject)),
                record_count: tally.total(),
                untracked_count: tally.untracked(),
            })
            .collect()
    }
}

/// [`TemporalAggregator::aggregate`] with UTC month-name buckets.
pub fn aggregate(records: &[AssessmentRecord]) -> Vec<PeriodSnapshot> {
    TemporalAggregator::default().aggregate(records)
}

/// The latest snapshot's five subject values; all zero for an empty trend.
pub fn current_scores(snapshots: &[PeriodSnapshot]) -> SubjectScores {
    snapshots
        .last()
        .map(|snapshot| snapshot.scores)
        .unwrap_or_default()
}

/// Unweighted mean of the latest snapshot's subject values.
pub fn overall_current(snapshots: &[PeriodSnapshot]) -> f64 {
    current_scores(snapshots).mean()
}

/// A learner's trend together with the latest-period view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProgress {
    pub snapshots: Vec<PeriodSnapshot>,
    pub current: SubjectScores,
    pub overall: f64,
}

impl LearnerProgress {
    pub fn from_snapshots(snapshots: Vec<PeriodSnapshot>) -> Self {
        let current = current_scores(&snapshots);
        Self {
            current,
            overall: current.mean(),
            snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn record(subject: &str, score: f64, occurred_at: DateTime<Utc>) -> AssessmentRecord {
        AssessmentRecord::new("learner-1", subject, score, occurred_at)
    }

    #[test]
    fn empty_history_yields_no_data_sentinel() {
        let snapshots = aggregate(&[]);
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].label.is_no_data());
        assert_eq!(snapshots[0].scores, SubjectScores::default());
    }

    #[test]
    fn averages_within_a_period() {
        let records = vec![
            record("social science", 60.0, at(2026, 1, 5)),
            record("Social", 80.0, at(2026, 1, 20)),
        ];
        let snapshots = aggregate(&records);

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].label, PeriodLabel::Period("Jan".to_string()));
        assert_eq!(snapshots[0].scores.social_science, 70.0);
        assert_eq!(snapshots[0].scores.mathematics, 0.0);
        assert_eq!(snapshots[0].record_count, 2);
    }

    #[test]
    fn periods_keep_first_seen_order() {
        let records = vec![
            record("mathematics", 50.0, at(2026, 3, 1)),
            record("mathematics", 70.0, at(2026, 1, 1)),
            record("science", 90.0, at(2026, 3, 2)),
        ];
        let labels: Vec<String> = aggregate(&records)
            .iter()
            .map(|snapshot| snapshot.label.to_string())
            .collect();

        assert_eq!(labels, vec!["Mar", "Jan"]);
    }

    #[test]
    fn untracked_only_period_is_kept_with_zeros() {
        let records = vec![
            record("mathematics", 40.0, at(2026, 1, 3)),
            record("physics", 99.0, at(2026, 2, 3)),
        ];
        let snapshots = aggregate(&records);

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].scores, SubjectScores::default());
        assert_eq!(snapshots[1].record_count, 1);
        assert_eq!(snapshots[1].untracked_count, 1);
    }

    #[test]
    fn month_name_merges_years_but_year_month_does_not() {
        let records = vec![
            record("english", 40.0, at(2025, 1, 10)),
            record("english", 80.0, at(2026, 1, 10)),
        ];
        assert_eq!(aggregate(&records).len(), 1);

        let aggregator = TemporalAggregator::new(
            FixedOffset::east_opt(0).unwrap(),
            PeriodFormat::YearMonth,
        );
        let snapshots = aggregator.aggregate(&records);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].label, PeriodLabel::Period("2025-01".to_string()));
    }

    #[test]
    fn offset_moves_records_across_month_boundaries() {
        let late_january = Utc.with_ymd_and_hms(2026, 1, 31, 22, 0, 0).unwrap();
        let ist = TemporalAggregator::new(
            FixedOffset::east_opt(5 * 3600 + 1800).unwrap(),
            PeriodFormat::MonthName,
        );

        assert_eq!(ist.period_label(late_january), "Feb");
        assert_eq!(TemporalAggregator::default().period_label(late_january), "Jan");
    }

    #[test]
    fn current_scores_come_from_latest_period() {
        let records = vec![
            record("tamil", 40.0, at(2026, 1, 3)),
            record("tamil", 90.0, at(2026, 2, 3)),
            record("english", 60.0, at(2026, 2, 4)),
        ];
        let snapshots = aggregate(&records);
        let current = current_scores(&snapshots);

        assert_eq!(current.tamil, 90.0);
        assert_eq!(current.english, 60.0);
        assert_eq!(overall_current(&snapshots), 30.0);
    }

    #[test]
    fn period_averages_are_not_clamped() {
        let records = vec![
            record("english", 140.0, at(2026, 4, 1)),
            record("english", 160.0, at(2026, 4, 2)),
            record("tamil", -20.0, at(2026, 4, 3)),
        ];
        let snapshots = aggregate(&records);

        assert_eq!(snapshots[0].scores.english, 150.0);
        assert_eq!(snapshots[0].scores.tamil, -20.0);
        assert_eq!(overall_current(&snapshots), 26.0);
    }

    #[test]
    fn progress_carries_latest_scores() {
        let records = vec![
            record("science", 20.0, at(2026, 1, 3)),
            record("science", 100.0, at(2026, 2, 3)),
        ];
        let progress = LearnerProgress::from_snapshots(aggregate(&records));

        assert_eq!(progress.snapshots.len(), 2);
        assert_eq!(progress.current.science, 100.0);
        assert_eq!(progress.overall, 20.0);

        let empty = LearnerProgress::from_snapshots(aggregate(&[]));
        assert!(empty.snapshots[0].label.is_no_data());
        assert_eq!(empty.overall, 0.0);
    }
}
