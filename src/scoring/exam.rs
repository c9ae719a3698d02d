// src/scoring/exam.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::exam::Subject;

/// Totals for one student over one set of subjects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub total_score: f64,
    pub max_total_score: f64,
    pub percentage: f64,
}

/// One subject row of a student's report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectOutcome {
    pub subject_id: i64,
    pub subject_name: String,
    /// `None` when no score was entered.
    pub score: Option<f64>,
    pub max_score: f64,
    pub pass_marks: f64,
    pub passed: bool,
}

/// Full report of one student in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub student_id: i64,
    #[serde(flatten)]
    pub aggregate: Aggregate,
    pub grade: &'static str,
    pub passed: bool,
    pub subjects: Vec<SubjectOutcome>,
}

/// Report plus position within the category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedReport {
    pub position: usize,
    #[serde(flatten)]
    pub report: StudentReport,
}

/// `part / whole * 100`, or 0 when there is nothing to divide by.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score a student needs on `subject`. Subject pass marks win over the ratio.
pub fn pass_mark(subject: &Subject, default_ratio: f64) -> f64 {
    subject
        .pass_marks
        .unwrap_or(subject.max_score * default_ratio)
}

/// Collapses entries to one score per known subject, clamped to `[0, max_score]`.
/// Later entries for the same subject replace earlier ones.
fn entered_scores(subjects: &[Subject], entries: &[(i64, f64)]) -> HashMap<i64, f64> {
    let max_by_id: HashMap<i64, f64> = subjects.iter().map(|s| (s.id, s.max_score)).collect();

    let mut scores = HashMap::with_capacity(entries.len());
    for &(subject_id, score) in entries {
        if let Some(&max) = max_by_id.get(&subject_id) {
            scores.insert(subject_id, score.clamp(0.0, max.max(0.0)));
        }
    }
    scores
}

/// Sums a student's entered scores against every subject's maximum.
///
/// Subjects without an entry still count toward `max_total_score`.
/// Entries for subjects not in `subjects` are ignored.
pub fn aggregate(subjects: &[Subject], entries: &[(i64, f64)]) -> Aggregate {
    let scores = entered_scores(subjects, entries);
    let total_score: f64 = scores.values().sum();
    let max_total_score: f64 = subjects.iter().map(|s| s.max_score).sum();

    Aggregate {
        total_score,
        max_total_score,
        percentage: round2(percentage(total_score, max_total_score)),
    }
}

pub fn grade(percentage: f64) -> &'static str {
    match percentage {
        p if p >= 90.0 => "A+",
        p if p >= 80.0 => "A",
        p if p >= 70.0 => "B+",
        p if p >= 60.0 => "B",
        p if p >= 50.0 => "C",
        p if p >= 40.0 => "D",
        _ => "F",
    }
}

/// Builds a student's report. A missing score counts as 0 for the pass check,
/// so a student passes only when every subject is scored at or above its pass mark.
pub fn student_report(
    student_id: i64,
    subjects: &[Subject],
    entries: &[(i64, f64)],
    default_ratio: f64,
) -> StudentReport {
    let scores = entered_scores(subjects, entries);
    let aggregate = aggregate(subjects, entries);

    let mut ordered: Vec<&Subject> = subjects.iter().collect();
    ordered.sort_by_key(|s| (s.order, s.id));

    let outcomes: Vec<SubjectOutcome> = ordered
        .into_iter()
        .map(|subject| {
            let score = scores.get(&subject.id).copied();
            let pass_marks = pass_mark(subject, default_ratio);
            SubjectOutcome {
                subject_id: subject.id,
                subject_name: subject.name.clone(),
                score,
                max_score: subject.max_score,
                pass_marks,
                passed: score.unwrap_or(0.0) >= pass_marks,
            }
        })
        .collect();

    StudentReport {
        student_id,
        grade: grade(aggregate.percentage),
        passed: outcomes.iter().all(|o| o.passed),
        aggregate,
        subjects: outcomes,
    }
}

/// Orders reports by total score, highest first. Ties share a position and the
/// next position skips accordingly (1, 2, 2, 4). Equal totals keep student id order.
pub fn rank(mut reports: Vec<StudentReport>) -> Vec<RankedReport> {
    reports.sort_by(|a, b| {
        b.aggregate
            .total_score
            .total_cmp(&a.aggregate.total_score)
            .then(a.student_id.cmp(&b.student_id))
    });

    let mut ranked = Vec::with_capacity(reports.len());
    let mut previous: Option<f64> = None;
    let mut position = 0;
    for (index, report) in reports.into_iter().enumerate() {
        if previous != Some(report.aggregate.total_score) {
            position = index + 1;
            previous = Some(report.aggregate.total_score);
        }
        ranked.push(RankedReport { position, report });
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: i64, name: &str, max_score: f64) -> Subject {
        Subject {
            id,
            category_id: 1,
            name: name.to_string(),
            max_score,
            pass_marks: None,
            order: id as i32,
        }
    }

    #[test]
    fn math_and_science_example() {
        let subjects = vec![subject(1, "Math", 100.0), subject(2, "Science", 100.0)];
        let agg = aggregate(&subjects, &[(1, 80.0), (2, 60.0)]);

        assert_eq!(agg.total_score, 140.0);
        assert_eq!(agg.max_total_score, 200.0);
        assert_eq!(agg.percentage, 70.0);
    }

    #[test]
    fn no_subjects_means_zero_percent() {
        let agg = aggregate(&[], &[]);
        assert_eq!(agg.total_score, 0.0);
        assert_eq!(agg.max_total_score, 0.0);
        assert_eq!(agg.percentage, 0.0);
        assert_eq!(percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn missing_entries_still_count_toward_max() {
        let subjects = vec![subject(1, "Math", 50.0), subject(2, "Art", 50.0)];
        let agg = aggregate(&subjects, &[(1, 40.0)]);

        assert_eq!(agg.total_score, 40.0);
        assert_eq!(agg.max_total_score, 100.0);
        assert_eq!(agg.percentage, 40.0);
    }

    #[test]
    fn unknown_subjects_are_ignored_and_scores_clamped() {
        let subjects = vec![subject(1, "Math", 50.0)];
        let agg = aggregate(&subjects, &[(1, 75.0), (9, 30.0)]);

        assert_eq!(agg.total_score, 50.0);
        assert!(agg.total_score <= agg.max_total_score);
    }

    #[test]
    fn total_never_exceeds_max_for_valid_entries() {
        let subjects: Vec<Subject> = (1..=6)
            .map(|id| subject(id, "S", 10.0 * id as f64))
            .collect();

        for step in 0..=10 {
            let fraction = step as f64 / 10.0;
            let entries: Vec<(i64, f64)> = subjects
                .iter()
                .filter(|s| s.id % 2 == step % 2)
                .map(|s| (s.id, s.max_score * fraction))
                .collect();
            let agg = aggregate(&subjects, &entries);
            assert!(agg.total_score <= agg.max_total_score);
        }
    }

    #[test]
    fn later_entry_replaces_earlier_one() {
        let subjects = vec![subject(1, "Math", 100.0)];
        let agg = aggregate(&subjects, &[(1, 20.0), (1, 90.0)]);
        assert_eq!(agg.total_score, 90.0);
    }

    #[test]
    fn default_pass_mark_is_a_quarter_of_max() {
        let math = subject(1, "Math", 80.0);
        assert_eq!(pass_mark(&math, 0.25), 20.0);

        let strict = Subject {
            pass_marks: Some(40.0),
            ..subject(2, "Physics", 80.0)
        };
        assert_eq!(pass_mark(&strict, 0.25), 40.0);
    }

    #[test]
    fn report_fails_when_any_subject_is_below_pass_mark_or_missing() {
        let subjects = vec![subject(1, "Math", 100.0), subject(2, "Science", 100.0)];

        let pass = student_report(5, &subjects, &[(1, 25.0), (2, 90.0)], 0.25);
        assert!(pass.passed);
        assert!(pass.subjects.iter().all(|s| s.passed));

        let below = student_report(5, &subjects, &[(1, 24.5), (2, 90.0)], 0.25);
        assert!(!below.passed);

        let missing = student_report(5, &subjects, &[(2, 90.0)], 0.25);
        assert!(!missing.passed);
        assert_eq!(missing.subjects[0].score, None);
    }

    #[test]
    fn grades_follow_percentage_bands() {
        assert_eq!(grade(95.0), "A+");
        assert_eq!(grade(90.0), "A+");
        assert_eq!(grade(89.99), "A");
        assert_eq!(grade(70.0), "B+");
        assert_eq!(grade(65.0), "B");
        assert_eq!(grade(50.0), "C");
        assert_eq!(grade(40.0), "D");
        assert_eq!(grade(39.9), "F");
        assert_eq!(grade(0.0), "F");
    }

    #[test]
    fn ties_share_a_position() {
        let subjects = vec![subject(1, "Math", 100.0)];
        let reports = vec![
            student_report(1, &subjects, &[(1, 70.0)], 0.25),
            student_report(2, &subjects, &[(1, 90.0)], 0.25),
            student_report(3, &subjects, &[(1, 70.0)], 0.25),
            student_report(4, &subjects, &[(1, 10.0)], 0.25),
        ];

        let ranked = rank(reports);
        let positions: Vec<(i64, usize)> = ranked
            .iter()
            .map(|r| (r.report.student_id, r.position))
            .collect();
        assert_eq!(positions, vec![(2, 1), (1, 2), (3, 2), (4, 4)]);
    }
}
