use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subject::{round_half_up, Subject};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(String);

impl LearnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LearnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LearnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An assessment row as handed over by a data source, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawAssessment {
    pub learner_id: Option<String>,
    pub subject: Option<String>,
    pub score: Option<f64>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// A validated assessment. Scores are not clamped to 0..=100.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRecord {
    pub learner_id: LearnerId,
    pub subject: String,
    pub score: f64,
    pub occurred_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn new(
        learner_id: impl Into<LearnerId>,
        subject: impl Into<String>,
        score: f64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            learner_id: learner_id.into(),
            subject: subject.into(),
            score,
            occurred_at,
        }
    }
}

/// One value per tracked subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectScores {
    pub mathematics: f64,
    pub science: f64,
    pub english: f64,
    pub social_science: f64,
    pub tamil: f64,
}

impl SubjectScores {
    pub fn from_fn(mut f: impl FnMut(Subject) -> f64) -> Self {
        Self {
            mathematics: f(Subject::Mathematics),
            science: f(Subject::Science),
            english: f(Subject::English),
            social_science: f(Subject::SocialScience),
            tamil: f(Subject::Tamil),
        }
    }

    pub fn get(&self, subject: Subject) -> f64 {
        match subject {
            Subject::Mathematics => self.mathematics,
            Subject::Science => self.science,
            Subject::English => self.english,
            Subject::SocialScience => self.social_science,
            Subject::Tamil => self.tamil,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subject, f64)> + '_ {
        Subject::ALL.into_iter().map(move |subject| (subject, self.get(subject)))
    }

    /// Unweighted mean of the five values; an absent subject counts as 0.
    pub fn mean(&self) -> f64 {
        self.iter().map(|(_, value)| value).sum::<f64>() / Subject::ALL.len() as f64
    }

    pub fn rounded(&self) -> Self {
        Self::from_fn(|subject| round_half_up(self.get(subject)))
    }

    /// Distance to a perfect score for each subject (`100 - value`).
    pub fn deficits(&self) -> Self {
        Self::from_fn(|subject| 100.0 - self.get(subject))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum PeriodLabel {
    /// Placeholder emitted when a learner has no assessments at all.
    NoData,
    Period(String),
}

impl PeriodLabel {
    pub fn is_no_data(&self) -> bool {
        matches!(self, PeriodLabel::NoData)
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::NoData => f.write_str("No data yet"),
            PeriodLabel::Period(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    pub label: PeriodLabel,
    pub scores: SubjectScores,
    /// Every record that fell in this bucket, tracked subject or not.
    pub record_count: usize,
    pub untracked_count: usize,
}

impl PeriodSnapshot {
    pub fn no_data() -> Self {
        Self {
            label: PeriodLabel::NoData,
            scores: SubjectScores::default(),
            record_count: 0,
            untracked_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusTier {
    AtRisk,
    OnTrack,
    Exceeding,
}

impl StatusTier {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTier::AtRisk => "at-risk",
            StatusTier::OnTrack => "on-track",
            StatusTier::Exceeding => "exceeding",
        }
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub learner_id: LearnerId,
    pub averages: SubjectScores,
    pub overall: f64,
    pub tier: StatusTier,
    /// Number of records seen for this learner, tracked subject or not.
    pub assessment_count: usize,
}

impl LearnerSummary {
    pub fn has_data(&self) -> bool {
        self.assessment_count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub total_learners: usize,
    pub averages: SubjectScores,
    pub at_risk: usize,
    pub on_track: usize,
    pub exceeding: usize,
    /// Completed lesson-progress rows, counted by the data source.
    pub lessons_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub learners: Vec<LearnerSummary>,
    pub summary: CohortSummary,
}

impl Classification {
    pub fn with_lessons_completed(mut self, count: usize) -> Self {
        self.summary.lessons_completed = count;
        self
    }

    /// At-risk learners in roster order.
    pub fn at_risk(&self) -> impl Iterator<Item = &LearnerSummary> {
        self.learners
            .iter()
            .filter(|learner| learner.tier == StatusTier::AtRisk)
    }
}
