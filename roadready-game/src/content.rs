//! Course content assets: road layout, per-node slide decks and quiz bank.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::ContentLoader;
use crate::config::CourseConfig;
use crate::path::{PathStop, Vec2};
use crate::progression::NodeId;

const DEFAULT_COURSE_DATA: &str = include_str!("../assets/data/course.json");
const DEFAULT_QUIZ_DATA: &str = include_str!("../assets/data/quiz.json");
const DEFAULT_CONFIG_DATA: &str = include_str!("../assets/data/config.json");

/// Recoverable content problems. Each one disables a single node's popup or
/// quiz; the rest of the course stays playable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("{0} is not part of this course")]
    UnknownNode(NodeId),
    #[error("{0} has no slides")]
    EmptyDeck(NodeId),
    #[error("no quiz entry for {0}")]
    MissingQuiz(NodeId),
    #[error("quiz for {0} has no questions")]
    EmptyQuiz(NodeId),
    #[error("quiz for {node}, question {question}: no options")]
    NoOptions { node: NodeId, question: usize },
    #[error(
        "quiz for {node}, question {question}: answer index {index} out of range ({options} options)"
    )]
    AnswerOutOfRange {
        node: NodeId,
        question: usize,
        index: usize,
        options: usize,
    },
    #[error("quiz for {0} is defined more than once")]
    DuplicateQuiz(NodeId),
}

/// One page of lesson content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Ordered lesson slides for one node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideDeck {
    pub slides: Vec<Slide>,
}

impl SlideDeck {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }
}

/// A node of the course map as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseNode {
    pub id: NodeId,
    pub title: String,
    /// Curve parameter of the node marker.
    pub stop: f32,
    #[serde(default)]
    pub deck: SlideDeck,
}

/// Full course layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseData {
    pub title: String,
    pub path: Vec<Vec2>,
    pub nodes: Vec<CourseNode>,
}

impl CourseData {
    /// Load course data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into course data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CourseNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Marker stops in course order.
    #[must_use]
    pub fn stops(&self) -> Vec<PathStop> {
        self.nodes
            .iter()
            .map(|node| PathStop::new(node.id, node.stop))
            .collect()
    }

    /// Slide deck for a node.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` for unknown nodes or empty decks.
    pub fn deck(&self, id: NodeId) -> Result<&SlideDeck, ContentError> {
        let node = self.node(id).ok_or(ContentError::UnknownNode(id))?;
        if node.deck.is_empty() {
            return Err(ContentError::EmptyDeck(id));
        }
        Ok(&node.deck)
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
}

impl Question {
    #[must_use]
    pub const fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer_index
    }

    fn validate(&self, node: NodeId, question: usize) -> Result<(), ContentError> {
        if self.options.is_empty() {
            return Err(ContentError::NoOptions { node, question });
        }
        if self.correct_answer_index >= self.options.len() {
            return Err(ContentError::AnswerOutOfRange {
                node,
                question,
                index: self.correct_answer_index,
                options: self.options.len(),
            });
        }
        Ok(())
    }
}

/// Questions for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizEntry {
    pub node_id: NodeId,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Every quiz of the course, loaded from a single data asset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuizBank {
    pub entries: Vec<QuizEntry>,
}

impl QuizBank {
    /// Create an empty quiz bank (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Load a quiz bank from JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a quiz bank.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn from_entries(entries: Vec<QuizEntry>) -> Self {
        Self { entries }
    }

    /// Validated questions for `node`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` when the node has no entry, more than one entry,
    /// no questions, or a question whose answer index is not one of its options.
    pub fn questions_for(&self, node: NodeId) -> Result<Vec<Question>, ContentError> {
        let mut matches = self.entries.iter().filter(|entry| entry.node_id == node);
        let entry = matches.next().ok_or(ContentError::MissingQuiz(node))?;
        if matches.next().is_some() {
            return Err(ContentError::DuplicateQuiz(node));
        }
        if entry.questions.is_empty() {
            return Err(ContentError::EmptyQuiz(node));
        }
        for (index, question) in entry.questions.iter().enumerate() {
            question.validate(node, index)?;
        }
        Ok(entry.questions.clone())
    }

    /// Every problem in the bank for a course of `node_count` nodes, for
    /// start-up diagnostics.
    #[must_use]
    pub fn audit(&self, node_count: usize) -> Vec<ContentError> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();
        for entry in &self.entries {
            if entry.node_id.index() >= node_count {
                problems.push(ContentError::UnknownNode(entry.node_id));
            } else if !seen.insert(entry.node_id) {
                problems.push(ContentError::DuplicateQuiz(entry.node_id));
            }
        }
        for idx in 0..node_count {
            if let Err(err) = self.questions_for(NodeId(idx)) {
                if !problems.contains(&err) {
                    problems.push(err);
                }
            }
        }
        problems
    }
}

/// Loads the course shipped inside the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLoader;

impl ContentLoader for EmbeddedLoader {
    type Error = serde_json::Error;

    fn load_course(&self) -> Result<CourseData, Self::Error> {
        CourseData::from_json(DEFAULT_COURSE_DATA)
    }

    fn load_quiz_bank(&self) -> Result<QuizBank, Self::Error> {
        QuizBank::from_json(DEFAULT_QUIZ_DATA)
    }

    fn load_config(&self) -> Result<CourseConfig, Self::Error> {
        CourseConfig::from_json(DEFAULT_CONFIG_DATA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ_JSON: &str = r#"{
        "entries": [
            {
                "node_id": 0,
                "questions": [
                    { "question": "Red light?", "options": ["Go", "Stop"], "correct_answer_index": 1 }
                ]
            },
            {
                "node_id": 1,
                "questions": [
                    { "question": "Broken", "options": ["A"], "correct_answer_index": 3 }
                ]
            },
            { "node_id": 2, "questions": [] }
        ]
    }"#;

    #[test]
    fn parses_and_validates_quiz_entries() {
        let bank = QuizBank::from_json(QUIZ_JSON).unwrap();
        let questions = bank.questions_for(NodeId(0)).unwrap();
        assert_eq!(questions.len(), 1);
        assert!(questions[0].is_correct(1));
        assert_eq!(
            bank.questions_for(NodeId(1)),
            Err(ContentError::AnswerOutOfRange {
                node: NodeId(1),
                question: 0,
                index: 3,
                options: 1
            })
        );
        assert_eq!(
            bank.questions_for(NodeId(2)),
            Err(ContentError::EmptyQuiz(NodeId(2)))
        );
        assert_eq!(
            bank.questions_for(NodeId(7)),
            Err(ContentError::MissingQuiz(NodeId(7)))
        );
    }

    #[test]
    fn audit_reports_every_problem_once() {
        let bank = QuizBank::from_json(QUIZ_JSON).unwrap();
        let problems = bank.audit(4);
        assert_eq!(problems.len(), 3);
        assert!(problems.contains(&ContentError::MissingQuiz(NodeId(3))));
    }

    #[test]
    fn course_deck_lookup_reports_empty_and_unknown() {
        let course = CourseData::from_json(
            r#"{
                "title": "Test",
                "path": [{ "x": 0.0, "y": 0.0 }, { "x": 10.0, "y": 0.0 }],
                "nodes": [
                    { "id": 0, "title": "Start", "stop": 0.0, "deck": [{ "title": "Hi" }] },
                    { "id": 1, "title": "End", "stop": 1.0 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(course.deck(NodeId(0)).unwrap().len(), 1);
        assert_eq!(course.deck(NodeId(1)), Err(ContentError::EmptyDeck(NodeId(1))));
        assert_eq!(
            course.deck(NodeId(5)),
            Err(ContentError::UnknownNode(NodeId(5)))
        );
        assert_eq!(course.stops()[1], PathStop::new(NodeId(1), 1.0));
    }

    #[test]
    fn shipped_quizzes_cover_every_node() {
        let course = EmbeddedLoader.load_course().unwrap();
        let bank = EmbeddedLoader.load_quiz_bank().unwrap();
        assert!(bank.audit(course.node_count()).is_empty());
        for node in &course.nodes {
            assert!(!node.deck.is_empty(), "{} has no slides", node.id);
        }
    }
}
