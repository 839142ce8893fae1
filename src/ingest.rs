use thiserror::Error;
use tracing::warn;

use crate::models::{AssessmentRecord, LearnerId, RawAssessment};

/// Why a raw assessment could not become an [`AssessmentRecord`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("assessment has no learner id")]
    MissingLearnerId,

    #[error("assessment for learner {learner_id} has no timestamp")]
    MissingTimestamp { learner_id: String },
}

impl TryFrom<RawAssessment> for AssessmentRecord {
    type Error = RecordError;

    fn try_from(raw: RawAssessment) -> Result<Self, Self::Error> {
        let learner_id = raw
            .learner_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(RecordError::MissingLearnerId)?;
        let occurred_at = raw
            .occurred_at
            .ok_or_else(|| RecordError::MissingTimestamp {
                learner_id: learner_id.clone(),
            })?;

        Ok(AssessmentRecord {
            learner_id: LearnerId::from(learner_id),
            subject: raw.subject.unwrap_or_default(),
            score: raw.score.filter(|score| score.is_finite()).unwrap_or(0.0),
            occurred_at,
        })
    }
}

/// Outcome of validating a batch of raw rows.
#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<AssessmentRecord>,
    /// Input position and reason for every skipped row.
    pub rejected: Vec<(usize, RecordError)>,
}

/// Validates every row independently; a bad row is skipped and reported,
/// never fatal for the rest of the batch. Input order is preserved.
pub fn validate<I>(rows: I) -> Ingested
where
    I: IntoIterator<Item = RawAssessment>,
{
    let mut ingested = Ingested::default();

    for (position, raw) in rows.into_iter().enumerate() {
        match AssessmentRecord::try_from(raw) {
            Ok(record) => ingested.records.push(record),
            Err(err) => {
                warn!(position, error = %err, "skipping assessment");
                ingested.rejected.push((position, err));
            }
        }
    }

    ingested
}
