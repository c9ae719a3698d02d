// src/scoring/quiz.rs

use serde::Serialize;

use crate::models::quiz::{Question, SubmittedAnswer};

/// Result of one question for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question_index: usize,
    pub selected_answer: Option<usize>,
    pub correct_answer_index: usize,
    pub points_awarded: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub score: u32,
    pub total_points: u32,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
    pub passed: bool,
    pub breakdown: Vec<QuestionOutcome>,
}

/// Scores submitted answers against the answer key.
///
/// Each question awards its points when the selection equals
/// `correct_answer_index`. Skipped questions score 0, answers pointing past the
/// last question are ignored, and only the first answer to a question counts.
pub fn score_quiz(
    questions: &[Question],
    answers: &[SubmittedAnswer],
    passing_score: u32,
) -> QuizScore {
    let mut selections: Vec<Option<usize>> = vec![None; questions.len()];
    let mut answered = vec![false; questions.len()];
    for answer in answers {
        if answer.question_index >= questions.len() || answered[answer.question_index] {
            continue;
        }
        answered[answer.question_index] = true;
        selections[answer.question_index] = answer.selected_answer;
    }

    let breakdown: Vec<QuestionOutcome> = questions
        .iter()
        .zip(selections)
        .enumerate()
        .map(|(index, (question, selected))| QuestionOutcome {
            question_index: index,
            selected_answer: selected,
            correct_answer_index: question.correct_answer_index,
            points_awarded: if selected == Some(question.correct_answer_index) {
                question.points
            } else {
                0
            },
        })
        .collect();

    let score: u32 = breakdown.iter().map(|o| o.points_awarded).sum();
    let total_points: u32 = questions.iter().map(|q| q.points).sum();
    let percentage = rounded_percentage(score, total_points);

    QuizScore {
        score,
        total_points,
        percentage,
        passed: percentage >= passing_score,
        breakdown,
    }
}

fn rounded_percentage(score: u32, total_points: u32) -> u32 {
    if total_points == 0 {
        return 0;
    }
    (f64::from(score) / f64::from(total_points) * 100.0).round() as u32
}
