// src/report.rs

//! Pure presentation logic: everything that turns a [`Submission`] into the
//! text an operator receives. Nothing in here performs I/O or can fail.

use std::collections::BTreeMap;

use crate::{
    models::{
        answer_key::{AnswerKey, QUESTION_COUNT},
        submission::Submission,
    },
    utils::markdown::escape_markdown,
};

const NO_ANSWER: &str = "No answer";
const UNKNOWN_KEY: &str = "?";

/// Renders elapsed seconds as `M:SS`.
pub fn format_duration(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Qualitative result band derived from the percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Excellent,
    Average,
    NeedsImprovement,
}

impl Band {
    /// Inclusive lower thresholds: 75 and 50. Missing or NaN lands in the lowest band.
    pub fn from_percentage(percentage: Option<f64>) -> Self {
        match percentage {
            Some(p) if p >= 75.0 => Band::Excellent,
            Some(p) if p >= 50.0 => Band::Average,
            _ => Band::NeedsImprovement,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Excellent => "EXCELLENT",
            Band::Average => "AVERAGE/NEEDS PRACTICE",
            Band::NeedsImprovement => "NEEDS IMPROVEMENT",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Band::Excellent => "✅",
            Band::Average => "⚠️",
            Band::NeedsImprovement => "❌",
        }
    }
}

/// Grading outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub number: u8,
    pub submitted: String,
    pub expected: String,
    pub correct: bool,
}

/// Grades questions `1..=QUESTION_COUNT` against `key`.
///
/// Answers are looked up as `q1`, `q2`, ... and compared case-sensitively.
/// A missing answer is recorded as "No answer", a missing key entry as "?".
pub fn grade_answers(
    answers: &BTreeMap<String, String>,
    key: &AnswerKey,
) -> Vec<QuestionResult> {
    (1..=QUESTION_COUNT)
        .map(|number| {
            let submitted = answers
                .get(&format!("q{}", number))
                .map(String::as_str)
                .unwrap_or(NO_ANSWER);
            let expected = key.correct_answer(number).unwrap_or(UNKNOWN_KEY);
            QuestionResult {
                number,
                submitted: submitted.to_string(),
                expected: expected.to_string(),
                correct: submitted == expected,
            }
        })
        .collect()
}

/// Floors to one decimal so the shown value never rounds up across a band threshold.
pub fn display_percentage(percentage: f64) -> f64 {
    (percentage * 10.0).floor() / 10.0
}

/// Percentage floored to one decimal, integers without a fraction.
pub fn format_percentage(percentage: f64) -> String {
    let percentage = display_percentage(percentage);
    if percentage.fract() == 0.0 {
        format!("{}", percentage as i64)
    } else {
        format!("{:.1}", percentage)
    }
}

/// Builds the operator notification in Telegram legacy Markdown.
pub fn compose_message(submission: &Submission, key: &AnswerKey, title: &str) -> String {
    // Band on the value the operator sees.
    let band = Band::from_percentage(submission.percentage.map(display_percentage));
    let percentage = submission
        .percentage
        .map(|p| format!(" ({}%)", format_percentage(p)))
        .unwrap_or_default();

    let mut message = format!(
        "📝 *{title}*\n\
         \n\
         👤 *Student:* {name}\n\
         🏫 *Group:* {group}\n\
         📊 *Score:* {score}/{total}{percentage}\n\
         ⏱️ *Time:* {time}\n\
         🚪 *Page Leaves:* {leaves}\n\
         📅 *Submitted:* {submitted}\n\
         \n\
         {emoji} {label}",
        title = escape_markdown(title),
        name = escape_markdown(&submission.name),
        group = escape_markdown(&submission.group),
        score = submission.score,
        total = QUESTION_COUNT,
        time = format_duration(submission.time_secs),
        leaves = submission.leaves,
        submitted = submission.submitted_at.format("%Y-%m-%d %H:%M:%S UTC"),
        emoji = band.emoji(),
        label = band.label(),
    );

    if let Some(answers) = &submission.answers {
        let results = grade_answers(answers, key);
        let correct = results.iter().filter(|r| r.correct).count();
        message.push_str(&format!(
            "\n\n📋 *Answers:* {}/{} correct",
            correct,
            results.len()
        ));
        for result in &results {
            let line = if result.correct {
                format!("\n{}. ✅ {}", result.number, escape_markdown(&result.submitted))
            } else {
                format!(
                    "\n{}. ❌ {} (correct: {})",
                    result.number,
                    escape_markdown(&result.submitted),
                    escape_markdown(&result.expected)
                )
            };
            message.push_str(&line);
        }
    }

    message
}
