use serde::{Deserialize, Serialize};

/// One of the five tracked subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Mathematics,
    Science,
    English,
    SocialScience,
    Tamil,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::Mathematics,
        Subject::Science,
        Subject::English,
        Subject::SocialScience,
        Subject::Tamil,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Mathematics => "mathematics",
            Subject::Science => "science",
            Subject::English => "english",
            Subject::SocialScience => "social science",
            Subject::Tamil => "tamil",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Subject::Mathematics => "Mathematics",
            Subject::Science => "Science",
            Subject::English => "English",
            Subject::SocialScience => "Social",
            Subject::Tamil => "Tamil",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Subject::Mathematics => 0,
            Subject::Science => 1,
            Subject::English => 2,
            Subject::SocialScience => 3,
            Subject::Tamil => 4,
        }
    }
}

/// Result of canonicalizing a free-text subject label.
///
/// Labels outside the table land in `General`: they still count toward a
/// bucket's record total but never reach the five-subject outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Tracked(Subject),
    General,
}

impl SubjectKey {
    pub fn tracked(self) -> Option<Subject> {
        match self {
            SubjectKey::Tracked(subject) => Some(subject),
            SubjectKey::General => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKey::Tracked(subject) => subject.as_str(),
            SubjectKey::General => "general",
        }
    }
}

static SUBJECT_TABLE: &[(&str, Subject)] = &[
    ("mathematics", Subject::Mathematics),
    ("science", Subject::Science),
    ("english", Subject::English),
    ("social science", Subject::SocialScience),
    ("social", Subject::SocialScience),
    ("tamil", Subject::Tamil),
];

/// Maps a raw subject label to its canonical key.
///
/// Matching is case-insensitive and treats runs of whitespace, `-` and `_`
/// as a single space, so "Social  Science", "social_science" and "social"
/// all resolve to [`Subject::SocialScience`]. Never fails.
pub fn canonicalize(raw: &str) -> SubjectKey {
    let normalized = normalize_label(raw);
    SUBJECT_TABLE
        .iter()
        .find(|(label, _)| *label == normalized)
        .map(|(_, subject)| SubjectKey::Tracked(*subject))
        .unwrap_or(SubjectKey::General)
}

fn normalize_label(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Round-half-up to the nearest integer.
///
/// Compares the fractional part instead of computing `floor(x + 0.5)`,
/// which rounds values just below one half up. Only applied where values
/// leave the engine for display.
pub fn round_half_up(x: f64) -> f64 {
    let whole = x.floor();
    if x - whole >= 0.5 {
        whole + 1.0
    } else {
        whole
    }
}

/// Running sum/count per tracked subject, plus a count of untracked records.
///
/// Shared by the per-period aggregator and the per-learner classifier so
/// both apply identical averaging rules.
#[derive(Debug, Clone, Default)]
pub struct SubjectTally {
    sums: [f64; 5],
    counts: [usize; 5],
    untracked: usize,
}

impl SubjectTally {
    pub fn record(&mut self, key: SubjectKey, score: f64) {
        match key {
            SubjectKey::Tracked(subject) => {
                let idx = subject.index();
                self.sums[idx] += score;
                self.counts[idx] += 1;
            }
            SubjectKey::General => self.untracked += 1,
        }
    }

    /// Mean of all scores recorded for `subject`, or 0.0 when there are none.
    pub fn mean(&self, subject: Subject) -> f64 {
        let idx = subject.index();
        if self.counts[idx] == 0 {
            0.0
        } else {
            self.sums[idx] / self.counts[idx] as f64
        }
    }

    pub fn count(&self, subject: Subject) -> usize {
        self.counts[subject.index()]
    }

    pub fn untracked(&self) -> usize {
        self.untracked
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.untracked
    }
}
