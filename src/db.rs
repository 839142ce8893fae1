use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::import::RosterEntry;
use crate::models::{LearnerId, RawAssessment};

/// Every learner profile, in a stable order.
pub async fn fetch_roster(pool: &PgPool) -> anyhow::Result<Vec<RosterEntry>> {
    let rows = sqlx::query("SELECT id, name FROM student_profiles ORDER BY name NULLS LAST, id")
        .fetch_all(pool)
        .await
        .context("failed to load student profiles")?;

    let mut roster = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.try_get("id")?;
        roster.push(RosterEntry {
            learner_id: LearnerId::from(id.to_string()),
            name: row.try_get("name")?,
        });
    }

    Ok(roster)
}

/// Number of completed rows in `progress_tracking`.
pub async fn count_completed_lessons(pool: &PgPool) -> anyhow::Result<usize> {
    let count: i64 = sqlx::query("SELECT COUNT(*) AS completed FROM progress_tracking WHERE completed")
        .fetch_one(pool)
        .await
        .context("failed to count completed lessons")?
        .try_get("completed")?;

    Ok(usize::try_from(count).unwrap_or_default())
}

/// Assessments oldest first, optionally limited to one learner.
///
/// Columns are read as nullable; validation decides what to keep.
pub async fn fetch_assessments(
    pool: &PgPool,
    learner: Option<&str>,
) -> anyhow::Result<Vec<RawAssessment>> {
    let mut query = String::from(
        "SELECT student_id::text AS student_id, subject, score::float8 AS score, created_at \
         FROM assessments",
    );

    if learner.is_some() {
        query.push_str(" WHERE student_id::text = $1");
    }
    query.push_str(" ORDER BY created_at ASC");

    let mut rows = sqlx::query(&query);
    if let Some(value) = learner {
        rows = rows.bind(value);
    }

    let records = rows
        .fetch_all(pool)
        .await
        .context("failed to load assessments")?;
    let mut assessments = Vec::with_capacity(records.len());

    for row in records {
        assessments.push(RawAssessment {
            learner_id: row.try_get::<Option<String>, _>("student_id")?,
            subject: row.try_get::<Option<String>, _>("subject")?,
            score: row.try_get::<Option<f64>, _>("score")?,
            occurred_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
        });
    }

    Ok(assessments)
}
