// src/models/answer_key.rs

use std::{collections::BTreeMap, sync::LazyLock};

/// Number of questions on the test; scores are reported out of this.
pub const QUESTION_COUNT: u8 = 20;

const STANDARD_KEY: [&str; QUESTION_COUNT as usize] = [
    "b", "c", "a", "d", "b", "a", "c", "d", "a", "b", //
    "d", "c", "b", "a", "c", "d", "b", "a", "d", "c",
];

static STANDARD: LazyLock<AnswerKey> = LazyLock::new(|| {
    AnswerKey::new(
        STANDARD_KEY
            .iter()
            .zip(1..=QUESTION_COUNT)
            .map(|(letter, number)| (number, letter.to_string())),
    )
});

/// Read-only mapping from question number to the correct option letter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    answers: BTreeMap<u8, String>,
}

impl AnswerKey {
    pub fn new(entries: impl IntoIterator<Item = (u8, String)>) -> Self {
        Self {
            answers: entries.into_iter().collect(),
        }
    }

    /// The key shipped with the test.
    pub fn standard() -> &'static AnswerKey {
        &STANDARD
    }

    /// Correct letter for `question`, if the key has one.
    pub fn correct_answer(&self, question: u8) -> Option<&str> {
        self.answers.get(&question).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
