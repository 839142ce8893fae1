//! Assessment aggregation and classification for learner progress views.
//!
//! [`aggregate::aggregate`] turns one learner's history into monthly per-subject
//! snapshots; [`risk::classify`] summarizes a roster and assigns status
//! tiers. Both share the canonicalization and averaging in [`subject`].

pub mod aggregate;
pub mod db;
pub mod import;
pub mod ingest;
pub mod models;
pub mod report;
pub mod risk;
pub mod subject;

pub use aggregate::{
    aggregate, current_scores, overall_current, LearnerProgress, PeriodFormat, TemporalAggregator,
};
pub use ingest::{validate, Ingested, RecordError};
pub use models::{
    AssessmentRecord, Classification, CohortSummary, LearnerId, LearnerSummary, PeriodLabel,
    PeriodSnapshot, RawAssessment, StatusTier, SubjectScores,
};
pub use risk::{classify, tier_for};
pub use subject::{canonicalize, round_half_up, Subject, SubjectKey};
