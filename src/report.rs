use std::collections::HashMap;
use std::fmt::Write;

use crate::aggregate::{current_scores, overall_current};
use crate::models::{Classification, LearnerId, PeriodSnapshot, StatusTier, SubjectScores};
use crate::subject::{round_half_up, Subject};

/// Display names keyed by learner id; missing names fall back to the id.
pub type LearnerNames = HashMap<LearnerId, String>;

fn display_name<'a>(names: &'a LearnerNames, id: &'a LearnerId) -> &'a str {
    names.get(id).map(String::as_str).unwrap_or(id.as_str())
}

fn percent(value: f64) -> String {
    format!("{:.0}%", round_half_up(value))
}

fn subject_line(scores: &SubjectScores) -> String {
    scores
        .iter()
        .map(|(subject, value)| format!("{} {}", subject.display_name(), percent(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Markdown view of one learner's monthly trend.
pub fn build_progress_report(
    learner: &LearnerId,
    names: &LearnerNames,
    snapshots: &[PeriodSnapshot],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "## Progress for {}", display_name(names, learner));
    let _ = writeln!(output);

    if snapshots.iter().all(|snapshot| snapshot.label.is_no_data()) {
        let _ = writeln!(output, "No assessments recorded yet.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Period | Mathematics | Science | English | Social | Tamil |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for snapshot in snapshots {
        let scores = snapshot.scores.rounded();
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            snapshot.label,
            scores.mathematics,
            scores.science,
            scores.english,
            scores.social_science,
            scores.tamil
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Current: {} (overall {})",
        subject_line(&current_scores(snapshots)),
        percent(overall_current(snapshots))
    );

    output
}

/// Markdown view of a roster classification.
pub fn build_roster_report(
    cohort: Option<&str>,
    classification: &Classification,
    names: &LearnerNames,
    limit: usize,
) -> String {
    let summary = &classification.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# Cohort Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} learners)",
        cohort.unwrap_or("all learners"),
        summary.total_learners
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Averages");

    if summary.total_learners == 0 {
        let _ = writeln!(output, "No learners on the roster.");
        return output;
    }

    let deficits = summary.averages.rounded().deficits();
    for subject in Subject::ALL {
        let _ = writeln!(
            output,
            "- {}: {} (gap {})",
            subject.display_name(),
            percent(summary.averages.get(subject)),
            percent(deficits.get(subject))
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    for (tier, count) in [
        (StatusTier::AtRisk, summary.at_risk),
        (StatusTier::OnTrack, summary.on_track),
        (StatusTier::Exceeding, summary.exceeding),
    ] {
        let _ = writeln!(output, "- {}: {} learners", tier, count);
    }
    let _ = writeln!(output, "- lessons completed: {}", summary.lessons_completed);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learners At Risk");

    if summary.at_risk == 0 {
        let _ = writeln!(output, "All learners are at 50% or above.");
    } else {
        for learner in classification.at_risk().take(limit) {
            let note = if learner.has_data() {
                String::new()
            } else {
                " (no assessments yet)".to_string()
            };
            let _ = writeln!(
                output,
                "- {} overall {}{}: {}",
                display_name(names, &learner.learner_id),
                percent(learner.overall),
                note,
                subject_line(&learner.averages)
            );
        }
    }

    output
}
