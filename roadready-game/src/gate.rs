//! Lesson popup: slide deck first, then the quiz that completes the node.
//!
//! Phases: `Closed → ShowingSlides ⇄ InQuiz → {Success, Failure}`.
//! `Failure` only leaves through a quiz restart and `Success` only through
//! the automatic close. The gate reports completion upward as an event and
//! never touches progression itself.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::anim::{AnimationTask, Easing, Tween};
use crate::config::CourseConfig;
use crate::content::{ContentError, Question, QuizBank, Slide, SlideDeck};
use crate::events::Outbox;
use crate::numbers::frame_delta;
use crate::progression::NodeId;
use crate::quiz::{AnswerOutcome, QuizSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    Closed,
    ShowingSlides,
    InQuiz,
    Success,
    Failure,
}

/// Popup framing: a fresh lesson, or a read-only replay of a completed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateChrome {
    Lesson,
    Replay,
}

/// Why a popup request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRejection {
    /// An enter/exit animation is still running.
    Transitioning,
    /// The request does not apply to the current phase.
    WrongPhase(GatePhase),
    /// Slide navigation past either end of the deck.
    OutOfRange,
    /// The quiz can only start from the last slide.
    NotOnLastSlide,
    /// Completed nodes replay their slides without a quiz.
    AlreadyCompleted,
    /// The node's quiz content is missing or malformed.
    QuizUnavailable,
    /// The option index does not exist for the current question.
    InvalidOption,
    /// The question has not been unlocked in this run.
    QuestionLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateEvent {
    Opened {
        node: NodeId,
        chrome: GateChrome,
    },
    PhaseChanged {
        node: NodeId,
        from: GatePhase,
        to: GatePhase,
    },
    Answered {
        node: NodeId,
        question: usize,
        outcome: AnswerOutcome,
    },
    /// Every question was answered correctly; the node may be completed.
    NodeCompleted {
        node: NodeId,
    },
    Closed {
        node: NodeId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transition {
    Enter(Tween),
    Exit(Tween),
}

impl Transition {
    fn update(&mut self, dt: f32) -> bool {
        match self {
            Self::Enter(tween) | Self::Exit(tween) => tween.update(dt).is_done(),
        }
    }
}

/// Popup state machine for one node at a time.
#[derive(Debug)]
pub struct ContentGate {
    quizzes: QuizBank,
    quiz_cache: HashMap<NodeId, Result<Vec<Question>, ContentError>>,
    node: Option<NodeId>,
    phase: GatePhase,
    chrome: GateChrome,
    deck: SlideDeck,
    slide: usize,
    session: Option<QuizSession>,
    transition: Option<Transition>,
    transition_secs: f32,
    close_secs: f32,
    events: Outbox<GateEvent>,
}

impl ContentGate {
    #[must_use]
    pub fn new(quizzes: QuizBank, config: &CourseConfig) -> Self {
        Self {
            quizzes,
            quiz_cache: HashMap::new(),
            node: None,
            phase: GatePhase::Closed,
            chrome: GateChrome::Lesson,
            deck: SlideDeck::default(),
            slide: 0,
            session: None,
            transition: None,
            transition_secs: config.slide_transition_secs,
            close_secs: config.popup_close_secs,
            events: Outbox::new(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> GatePhase {
        self.phase
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self.phase, GatePhase::Closed)
    }

    #[must_use]
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    #[must_use]
    pub const fn chrome(&self) -> GateChrome {
        self.chrome
    }

    #[must_use]
    pub const fn slide_index(&self) -> usize {
        self.slide
    }

    #[must_use]
    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    #[must_use]
    pub fn current_slide(&self) -> Option<&Slide> {
        if self.is_open() {
            self.deck.get(self.slide)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_last_slide(&self) -> bool {
        self.slide + 1 == self.deck.len()
    }

    #[must_use]
    pub const fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// An enter/exit animation is running; navigation requests are dropped.
    #[must_use]
    pub const fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Open the popup on the first slide of `deck`.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` when a popup is already open.
    pub fn open(
        &mut self,
        node: NodeId,
        deck: &SlideDeck,
        already_completed: bool,
    ) -> Result<(), GateRejection> {
        if self.is_open() {
            return Err(GateRejection::WrongPhase(self.phase));
        }
        self.node = Some(node);
        self.deck = deck.clone();
        self.slide = 0;
        self.session = None;
        self.chrome = if already_completed {
            GateChrome::Replay
        } else {
            GateChrome::Lesson
        };
        self.events.push(GateEvent::Opened {
            node,
            chrome: self.chrome,
        });
        self.set_phase(GatePhase::ShowingSlides);
        self.begin_enter();
        Ok(())
    }

    /// Advance to the next slide.
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` when not showing slides, mid-transition, or
    /// already on the last slide.
    pub fn next(&mut self) -> Result<(), GateRejection> {
        self.ready_for(GatePhase::ShowingSlides)?;
        if self.slide + 1 >= self.deck.len() {
            return Err(GateRejection::OutOfRange);
        }
        self.slide += 1;
        self.begin_enter();
        Ok(())
    }

    /// Go back one slide.
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` when not showing slides, mid-transition, or
    /// already on the first slide.
    pub fn previous(&mut self) -> Result<(), GateRejection> {
        self.ready_for(GatePhase::ShowingSlides)?;
        if self.slide == 0 {
            return Err(GateRejection::OutOfRange);
        }
        self.slide -= 1;
        self.begin_enter();
        Ok(())
    }

    /// Whether the "start quiz" affordance should be offered right now.
    #[must_use]
    pub fn can_start_quiz(&self) -> bool {
        self.phase == GatePhase::ShowingSlides
            && self.chrome == GateChrome::Lesson
            && self.is_last_slide()
            && self
                .node
                .is_some_and(|node| !matches!(self.quiz_cache.get(&node), Some(Err(_))))
    }

    /// Enter the quiz from the last slide, resuming a run left via
    /// [`Self::back_to_slides`].
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` when the affordance is not available; a node
    /// whose quiz content is broken keeps answering `QuizUnavailable`.
    pub fn start_quiz(&mut self) -> Result<(), GateRejection> {
        self.ready_for(GatePhase::ShowingSlides)?;
        if self.chrome == GateChrome::Replay {
            return Err(GateRejection::AlreadyCompleted);
        }
        if !self.is_last_slide() {
            return Err(GateRejection::NotOnLastSlide);
        }
        let node = self.node.ok_or(GateRejection::WrongPhase(self.phase))?;
        let questions = self.questions(node)?;
        if self.session.is_none() {
            self.session = Some(QuizSession::new(questions));
        }
        self.set_phase(GatePhase::InQuiz);
        self.begin_enter();
        Ok(())
    }

    fn questions(&mut self, node: NodeId) -> Result<Vec<Question>, GateRejection> {
        let quizzes = &self.quizzes;
        let cached = self.quiz_cache.entry(node).or_insert_with(|| {
            let loaded = quizzes.questions_for(node);
            if let Err(err) = &loaded {
                log::error!("quiz disabled: {err}");
            }
            loaded
        });
        cached.clone().map_err(|_| GateRejection::QuizUnavailable)
    }

    /// Leave the quiz for the slides, keeping the run's progress.
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` when not in the quiz or mid-transition.
    pub fn back_to_slides(&mut self) -> Result<(), GateRejection> {
        self.ready_for(GatePhase::InQuiz)?;
        self.set_phase(GatePhase::ShowingSlides);
        self.begin_enter();
        Ok(())
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` when not in the quiz, mid-transition, or the
    /// option does not exist.
    pub fn answer(&mut self, option: usize) -> Result<AnswerOutcome, GateRejection> {
        self.ready_for(GatePhase::InQuiz)?;
        let node = self.node.ok_or(GateRejection::WrongPhase(self.phase))?;
        let session = self
            .session
            .as_mut()
            .ok_or(GateRejection::WrongPhase(self.phase))?;
        let question = session.current_index();
        let outcome = session.answer(option);
        match outcome {
            AnswerOutcome::InvalidOption => return Err(GateRejection::InvalidOption),
            AnswerOutcome::Advanced { .. } => self.begin_enter(),
            AnswerOutcome::Incorrect { .. } => {
                self.set_phase(GatePhase::Failure);
                self.begin_enter();
            }
            AnswerOutcome::Passed => {
                self.set_phase(GatePhase::Success);
                log::info!("quiz for {node} passed");
                self.events.push(GateEvent::NodeCompleted { node });
                self.begin_exit();
            }
        }
        self.events.push(GateEvent::Answered {
            node,
            question,
            outcome,
        });
        Ok(outcome)
    }

    /// Jump to an unlocked question of the current run.
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` when not in the quiz, mid-transition, or the
    /// question is still locked.
    pub fn go_to_question(&mut self, index: usize) -> Result<(), GateRejection> {
        self.ready_for(GatePhase::InQuiz)?;
        let session = self
            .session
            .as_mut()
            .ok_or(GateRejection::WrongPhase(self.phase))?;
        if !session.is_unlocked(index) {
            return Err(GateRejection::QuestionLocked);
        }
        if session.go_to(index) {
            self.begin_enter();
        }
        Ok(())
    }

    /// Start the quiz over from question one after a failure.
    ///
    /// # Errors
    ///
    /// Returns a `GateRejection` unless the popup shows the failure display.
    pub fn restart_quiz(&mut self) -> Result<(), GateRejection> {
        self.ready_for(GatePhase::Failure)?;
        if let Some(session) = self.session.as_mut() {
            session.restart();
        }
        self.set_phase(GatePhase::InQuiz);
        self.begin_enter();
        Ok(())
    }

    /// Dismiss the popup from the slides.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside the slide phase; the quiz branch only
    /// exits through a restart or a pass.
    pub fn close(&mut self) -> Result<(), GateRejection> {
        if self.phase != GatePhase::ShowingSlides {
            return Err(GateRejection::WrongPhase(self.phase));
        }
        self.finish_close();
        Ok(())
    }

    /// Tear the popup down from any phase, dropping the quiz run.
    pub fn dismiss(&mut self) {
        if self.is_open() {
            self.finish_close();
        }
    }

    /// Advance the running transition. The automatic close after a pass
    /// completes here.
    pub fn tick(&mut self, dt: f32) {
        let Some(mut transition) = self.transition else {
            return;
        };
        if !transition.update(frame_delta(dt)) {
            self.transition = Some(transition);
            return;
        }
        self.transition = None;
        if matches!(transition, Transition::Exit(_)) && self.phase == GatePhase::Success {
            self.finish_close();
        }
    }

    fn finish_close(&mut self) {
        self.transition = None;
        self.session = None;
        self.set_phase(GatePhase::Closed);
        if let Some(node) = self.node.take() {
            self.events.push(GateEvent::Closed { node });
        }
        self.deck = SlideDeck::default();
        self.slide = 0;
    }

    fn ready_for(&self, phase: GatePhase) -> Result<(), GateRejection> {
        if self.phase != phase {
            return Err(GateRejection::WrongPhase(self.phase));
        }
        if self.is_transitioning() {
            return Err(GateRejection::Transitioning);
        }
        Ok(())
    }

    fn set_phase(&mut self, to: GatePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        if let Some(node) = self.node {
            log::debug!("gate for {node}: {from:?} -> {to:?}");
            self.events.push(GateEvent::PhaseChanged { node, from, to });
        }
    }

    fn begin_enter(&mut self) {
        self.transition = Some(Transition::Enter(Tween::new(
            0.0,
            1.0,
            self.transition_secs,
            Easing::EaseOutQuad,
        )));
    }

    fn begin_exit(&mut self) {
        self.transition = Some(Transition::Exit(Tween::new(
            1.0,
            0.0,
            self.close_secs,
            Easing::EaseInQuad,
        )));
    }

    pub fn drain_events(&mut self) -> Vec<GateEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::QuizEntry;
    use std::collections::BTreeSet;

    fn deck(len: usize) -> SlideDeck {
        SlideDeck {
            slides: (0..len)
                .map(|i| Slide {
                    title: format!("slide {i}"),
                    body: String::new(),
                    image: None,
                })
                .collect(),
        }
    }

    fn bank() -> QuizBank {
        let question = |correct: usize| Question {
            question: "q".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer_index: correct,
        };
        QuizBank::from_entries(vec![QuizEntry {
            node_id: NodeId(0),
            questions: vec![question(0), question(1), question(2)],
        }])
    }

    fn settle(gate: &mut ContentGate) {
        for _ in 0..200 {
            if !gate.is_transitioning() {
                return;
            }
            gate.tick(1.0 / 60.0);
        }
    }

    fn gate_in_quiz() -> ContentGate {
        let mut gate = ContentGate::new(bank(), &CourseConfig::default());
        gate.open(NodeId(0), &deck(2), false).unwrap();
        settle(&mut gate);
        gate.next().unwrap();
        settle(&mut gate);
        gate.start_quiz().unwrap();
        settle(&mut gate);
        gate
    }

    #[test]
    fn slide_navigation_stays_in_bounds() {
        let mut gate = ContentGate::new(bank(), &CourseConfig::default());
        gate.open(NodeId(0), &deck(3), false).unwrap();
        assert_eq!(gate.next(), Err(GateRejection::Transitioning));
        settle(&mut gate);
        assert_eq!(gate.previous(), Err(GateRejection::OutOfRange));
        gate.next().unwrap();
        settle(&mut gate);
        gate.next().unwrap();
        settle(&mut gate);
        assert_eq!(gate.next(), Err(GateRejection::OutOfRange));
        assert_eq!(gate.slide_index(), 2);
        assert!(gate.can_start_quiz());
    }

    #[test]
    fn requests_during_transition_are_dropped() {
        let mut gate = ContentGate::new(bank(), &CourseConfig::default());
        gate.open(NodeId(0), &deck(3), false).unwrap();
        settle(&mut gate);
        gate.next().unwrap();
        assert_eq!(gate.next(), Err(GateRejection::Transitioning));
        settle(&mut gate);
        assert_eq!(gate.slide_index(), 1);
    }

    #[test]
    fn passing_reports_completion_then_closes() {
        let mut gate = gate_in_quiz();
        for option in 0..3 {
            gate.answer(option).unwrap();
            settle(&mut gate);
        }
        let events = gate.drain_events();
        let completions = events
            .iter()
            .filter(|e| matches!(e, GateEvent::NodeCompleted { .. }))
            .count();
        assert_eq!(completions, 1);
        assert_eq!(events.last(), Some(&GateEvent::Closed { node: NodeId(0) }));
        assert_eq!(gate.phase(), GatePhase::Closed);
        assert!(gate.session().is_none());
    }

    #[test]
    fn correct_correct_incorrect_lands_on_failure() {
        let mut gate = gate_in_quiz();
        gate.answer(0).unwrap();
        settle(&mut gate);
        gate.answer(1).unwrap();
        settle(&mut gate);
        assert_eq!(
            gate.answer(0),
            Ok(AnswerOutcome::Incorrect { expected: 2 })
        );
        assert_eq!(gate.phase(), GatePhase::Failure);
        let session = gate.session().unwrap();
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.unlocked(), &BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn failure_only_exits_through_restart() {
        let mut gate = gate_in_quiz();
        gate.answer(0).unwrap();
        settle(&mut gate);
        gate.answer(0).unwrap();
        settle(&mut gate);
        assert_eq!(
            gate.close(),
            Err(GateRejection::WrongPhase(GatePhase::Failure))
        );
        assert_eq!(
            gate.answer(1),
            Err(GateRejection::WrongPhase(GatePhase::Failure))
        );
        assert_eq!(gate.restart_quiz(), Err(GateRejection::Transitioning));
        settle(&mut gate);
        gate.restart_quiz().unwrap();
        let session = gate.session().unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.unlocked(), &BTreeSet::from([0]));
        assert_eq!(gate.phase(), GatePhase::InQuiz);
    }

    #[test]
    fn replay_of_completed_node_never_enters_quiz() {
        let mut gate = ContentGate::new(bank(), &CourseConfig::default());
        gate.open(NodeId(0), &deck(1), true).unwrap();
        settle(&mut gate);
        assert_eq!(gate.chrome(), GateChrome::Replay);
        assert!(!gate.can_start_quiz());
        assert_eq!(gate.start_quiz(), Err(GateRejection::AlreadyCompleted));
        gate.close().unwrap();
        assert!(!gate.is_open());
    }

    #[test]
    fn missing_quiz_disables_the_affordance() {
        let mut gate = ContentGate::new(bank(), &CourseConfig::default());
        gate.open(NodeId(5), &deck(1), false).unwrap();
        settle(&mut gate);
        assert!(gate.can_start_quiz());
        assert_eq!(gate.start_quiz(), Err(GateRejection::QuizUnavailable));
        assert!(!gate.can_start_quiz());
        assert_eq!(gate.start_quiz(), Err(GateRejection::QuizUnavailable));
        assert_eq!(gate.phase(), GatePhase::ShowingSlides);
    }

    #[test]
    fn back_to_slides_keeps_run_progress() {
        let mut gate = gate_in_quiz();
        gate.answer(0).unwrap();
        settle(&mut gate);
        gate.back_to_slides().unwrap();
        settle(&mut gate);
        gate.start_quiz().unwrap();
        settle(&mut gate);
        assert_eq!(gate.session().unwrap().current_index(), 1);
        gate.go_to_question(0).unwrap();
        settle(&mut gate);
        assert_eq!(gate.go_to_question(2), Err(GateRejection::QuestionLocked));
    }

    #[test]
    fn open_is_refused_while_a_popup_is_up() {
        let mut gate = ContentGate::new(bank(), &CourseConfig::default());
        gate.open(NodeId(0), &deck(1), false).unwrap();
        assert_eq!(
            gate.open(NodeId(1), &deck(1), false),
            Err(GateRejection::WrongPhase(GatePhase::ShowingSlides))
        );
    }
}
