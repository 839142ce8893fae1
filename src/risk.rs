use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::{
    AssessmentRecord, Classification, CohortSummary, LearnerId, LearnerSummary, StatusTier,
    SubjectScores,
};
use crate::subject::{canonicalize, SubjectTally};

pub const AT_RISK_BELOW: f64 = 50.0;
pub const EXCEEDING_ABOVE: f64 = 75.0;

/// Tier for an overall score. 50 and 75 are both on-track.
pub fn tier_for(overall: f64) -> StatusTier {
    if overall < AT_RISK_BELOW {
        StatusTier::AtRisk
    } else if overall > EXCEEDING_ABOVE {
        StatusTier::Exceeding
    } else {
        StatusTier::OnTrack
    }
}

/// Summarizes every learner in `roster` over their whole history and rolls
/// the results up into cohort averages and tier counts.
///
/// Output order follows the roster; repeated ids keep their first position.
/// Records for learners outside the roster are ignored.
pub fn classify(roster: &[LearnerId], records: &[AssessmentRecord]) -> Classification {
    let mut seen = HashSet::new();
    let roster: Vec<&LearnerId> = roster.iter().filter(|id| seen.insert(*id)).collect();

    let mut tallies: HashMap<&LearnerId, SubjectTally> =
        roster.iter().map(|id| (*id, SubjectTally::default())).collect();
    let mut ignored = 0usize;

    for record in records {
        match tallies.get_mut(&record.learner_id) {
            Some(tally) => tally.record(canonicalize(&record.subject), record.score),
            None => ignored += 1,
        }
    }

    let learners: Vec<LearnerSummary> = roster
        .iter()
        .map(|id| {
            let tally = tallies.remove(*id).unwrap_or_default();
            summarize_learner((*id).clone(), &tally)
        })
        .collect();

    let summary = summarize_cohort(&learners);
    debug!(
        learners = summary.total_learners,
        at_risk = summary.at_risk,
        ignored_records = ignored,
        "classified roster"
    );

    Classification { learners, summary }
}

fn summarize_learner(learner_id: LearnerId, tally: &SubjectTally) -> LearnerSummary {
    let averages = SubjectScores::from_fn(|subject| tally.mean(subject));
    let overall = averages.mean();

    LearnerSummary {
        learner_id,
        averages,
        overall,
        tier: tier_for(overall),
        assessment_count: tally.total(),
    }
}

/// Cohort subject averages divide by roster size, so a learner with no
/// attempts in a subject pulls that subject's average down.
fn summarize_cohort(learners: &[LearnerSummary]) -> CohortSummary {
    let total = learners.len();
    let averages = if total == 0 {
        SubjectScores::default()
    } else {
        SubjectScores::from_fn(|subject| {
            learners
                .iter()
                .map(|learner| learner.averages.get(subject))
                .sum::<f64>()
                / total as f64
        })
    };

    let count_tier =
        |tier: StatusTier| learners.iter().filter(|learner| learner.tier == tier).count();

    CohortSummary {
        total_learners: total,
        averages,
        at_risk: count_tier(StatusTier::AtRisk),
        on_track: count_tier(StatusTier::OnTrack),
        exceeding: count_tier(StatusTier::Exceeding),
        lessons_completed: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_record(learner: &str, subject: &str, score: f64) -> AssessmentRecord {
        AssessmentRecord::new(learner, subject, score, Utc::now() - Duration::days(3))
    }

    fn roster(ids: &[&str]) -> Vec<LearnerId> {
        ids.iter().map(|id| LearnerId::from(*id)).collect()
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(tier_for(0.0), StatusTier::AtRisk);
        assert_eq!(tier_for(49.9999), StatusTier::AtRisk);
        assert_eq!(tier_for(50.0), StatusTier::OnTrack);
        assert_eq!(tier_for(50.0001), StatusTier::OnTrack);
        assert_eq!(tier_for(75.0), StatusTier::OnTrack);
        assert_eq!(tier_for(75.0001), StatusTier::Exceeding);
    }

    #[test]
    fn learner_without_records_is_at_risk() {
        let result = classify(&roster(&["b"]), &[]);
        let learner = &result.learners[0];

        assert_eq!(learner.averages, SubjectScores::default());
        assert_eq!(learner.overall, 0.0);
        assert_eq!(learner.tier, StatusTier::AtRisk);
        assert!(!learner.has_data());
    }

    #[test]
    fn output_follows_roster_order() {
        let records = vec![
            sample_record("c", "mathematics", 100.0),
            sample_record("a", "science", 10.0),
        ];
        let result = classify(&roster(&["c", "a", "b", "a"]), &records);
        let ids: Vec<&str> = result
            .learners
            .iter()
            .map(|learner| learner.learner_id.as_str())
            .collect();

        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(result.summary.total_learners, 3);
    }

    #[test]
    fn learners_outside_roster_are_ignored() {
        let records = vec![
            sample_record("a", "english", 90.0),
            sample_record("ghost", "english", 10.0),
        ];
        let result = classify(&roster(&["a"]), &records);

        assert_eq!(result.learners.len(), 1);
        assert_eq!(result.summary.averages.english, 90.0);
    }

    #[test]
    fn untracked_subjects_count_but_do_not_score() {
        let records = vec![
            sample_record("a", "physics", 100.0),
            sample_record("a", "Tamil", 80.0),
        ];
        let result = classify(&roster(&["a"]), &records);
        let learner = &result.learners[0];

        assert_eq!(learner.assessment_count, 2);
        assert_eq!(learner.averages.tamil, 80.0);
        assert!((learner.overall - 16.0).abs() < 1e-9);
    }

    #[test]
    fn high_scores_exceed_and_counts_add_up() {
        let mut records = Vec::new();
        for subject in ["mathematics", "science", "english", "social", "tamil"] {
            records.push(sample_record("top", subject, 90.0));
            records.push(sample_record("mid", subject, 60.0));
        }
        let result = classify(&roster(&["top", "mid", "none"]), &records);

        assert_eq!(result.learners[0].tier, StatusTier::Exceeding);
        assert_eq!(result.learners[1].tier, StatusTier::OnTrack);
        assert_eq!(result.summary.exceeding, 1);
        assert_eq!(result.summary.on_track, 1);
        assert_eq!(result.summary.at_risk, 1);
        assert_eq!(result.at_risk().count(), 1);
        assert_eq!(result.summary.lessons_completed, 0);
        assert_eq!(result.with_lessons_completed(4).summary.lessons_completed, 4);
    }

    #[test]
    fn out_of_range_scores_pass_through() {
        let records: Vec<AssessmentRecord> = ["mathematics", "science", "english", "social", "tamil"]
            .into_iter()
            .map(|subject| sample_record("a", subject, 140.0))
            .collect();
        let result = classify(&roster(&["a"]), &records);
        let learner = &result.learners[0];

        assert_eq!(learner.averages, SubjectScores::from_fn(|_| 140.0));
        assert_eq!(learner.overall, 140.0);
        assert_eq!(learner.tier, StatusTier::Exceeding);
        assert_eq!(result.summary.averages.tamil, 140.0);
    }

    #[test]
    fn empty_roster_gives_zero_summary() {
        let result = classify(&[], &[sample_record("a", "science", 70.0)]);
        assert!(result.learners.is_empty());
        assert_eq!(result.summary, CohortSummary::default());
    }
}
