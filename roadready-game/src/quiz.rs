//! Transient state for one quiz attempt.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::content::Question;

/// Result of answering the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Correct; the session moved on to `next`.
    Advanced { next: usize },
    /// Correct answer to the final question.
    Passed,
    /// Wrong answer; the index and unlocked set are untouched.
    Incorrect { expected: usize },
    /// The option index does not exist; nothing changed.
    InvalidOption,
}

/// One continuous run through a node's questions.
///
/// `current` is always a member of `unlocked`, and `unlocked` is always a
/// contiguous range starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    questions: Vec<Question>,
    current: usize,
    unlocked: BTreeSet<usize>,
    passed: bool,
}

impl QuizSession {
    /// Start a session. `questions` must be non-empty; the content layer
    /// validates that before a session is ever created.
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current: 0,
            unlocked: BTreeSet::from([0]),
            passed: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub const fn unlocked(&self) -> &BTreeSet<usize> {
        &self.unlocked
    }

    #[must_use]
    pub fn is_unlocked(&self, index: usize) -> bool {
        self.unlocked.contains(&index)
    }

    /// Every question was answered correctly in this run.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        self.passed
    }

    /// Check `option` against the current question.
    pub fn answer(&mut self, option: usize) -> AnswerOutcome {
        let Some(question) = self.questions.get(self.current) else {
            return AnswerOutcome::InvalidOption;
        };
        if self.passed || option >= question.options.len() {
            return AnswerOutcome::InvalidOption;
        }
        if !question.is_correct(option) {
            return AnswerOutcome::Incorrect {
                expected: question.correct_answer_index,
            };
        }
        let next = self.current + 1;
        if next >= self.questions.len() {
            self.passed = true;
            return AnswerOutcome::Passed;
        }
        self.unlocked.insert(next);
        self.current = next;
        AnswerOutcome::Advanced { next }
    }

    /// Jump to an already unlocked question. Returns whether the index moved.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.passed || !self.unlocked.contains(&index) || index == self.current {
            return false;
        }
        self.current = index;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.current
            .checked_sub(1)
            .is_some_and(|index| self.go_to(index))
    }

    /// Throw away all progress of this run.
    pub fn restart(&mut self) {
        self.current = 0;
        self.unlocked = BTreeSet::from([0]);
        self.passed = false;
    }
}
