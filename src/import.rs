use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{LearnerId, RawAssessment};

#[derive(serde::Deserialize)]
struct RecordRow {
    learner_id: Option<String>,
    subject: Option<String>,
    score: Option<String>,
    occurred_at: Option<String>,
}

#[derive(serde::Deserialize)]
struct RosterRow {
    learner_id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(serde::Deserialize)]
struct LessonRow {
    #[serde(default)]
    completed: Option<String>,
}

/// A roster line: who the learner is and what to call them in reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub learner_id: LearnerId,
    pub name: Option<String>,
}

/// Reads `learner_id,subject,score,occurred_at` rows.
///
/// Cells are kept loose here; a score that does not parse is treated as
/// absent and an unreadable timestamp as missing, so validation decides.
pub fn load_records(csv_path: &Path) -> anyhow::Result<Vec<RawAssessment>> {
    let reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    read_records(reader)
}

pub fn read_records<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> anyhow::Result<Vec<RawAssessment>> {
    let mut rows = Vec::new();

    for result in reader.deserialize::<RecordRow>() {
        let row = result.context("malformed assessment row")?;
        rows.push(RawAssessment {
            learner_id: non_empty(row.learner_id),
            subject: non_empty(row.subject),
            score: non_empty(row.score).and_then(|raw| raw.parse::<f64>().ok()),
            occurred_at: non_empty(row.occurred_at).and_then(|raw| parse_timestamp(&raw)),
        });
    }

    Ok(rows)
}

/// Reads `learner_id,name` rows; blank ids are skipped.
pub fn load_roster(csv_path: &Path) -> anyhow::Result<Vec<RosterEntry>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut entries = Vec::new();

    for result in reader.deserialize::<RosterRow>() {
        let row = result.context("malformed roster row")?;
        let id = row.learner_id.trim();
        if id.is_empty() {
            continue;
        }
        entries.push(RosterEntry {
            learner_id: LearnerId::from(id),
            name: non_empty(row.name),
        });
    }

    Ok(entries)
}

/// Counts completed rows in a `learner_id,completed` lesson-progress file.
pub fn load_lessons_completed(csv_path: &Path) -> anyhow::Result<usize> {
    let reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    count_lessons_completed(reader)
}

pub fn count_lessons_completed<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<usize> {
    let mut completed = 0usize;

    for result in reader.deserialize::<LessonRow>() {
        let row = result.context("malformed lesson progress row")?;
        if non_empty(row.completed).is_some_and(|value| is_truthy(&value)) {
            completed += 1;
        }
    }

    Ok(completed)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
