//! Composition of the progression screen.
//!
//! The coordinator owns every component, forwards player requests to them and
//! drains their outboxes once per dispatch in a fixed order: registry, gate,
//! navigation, progression. Reactions may raise further events; those are
//! handled in the same dispatch.
use serde::{Deserialize, Serialize};

use crate::config::CourseConfig;
use crate::content::{CourseData, QuizBank};
use crate::events::Outbox;
use crate::gate::{ContentGate, GateEvent, GatePhase, GateRejection};
use crate::navigation::{Avatar, MoveRejection, NavigationController, NavigationEvent};
use crate::path::{PathCurve, Vec2};
use crate::progression::{NodeId, ProgressionEvent, ProgressionState};
use crate::quiz::AnswerOutcome;
use crate::registry::{NodeRegistry, RegistryError, RegistryEvent};
use crate::store::PersistentStore;

const MAX_DISPATCH_PASSES: usize = 8;

/// Screens the progression screen can hand off to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenId {
    MainMenu,
    DrivingChallenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRequest {
    pub screen: ScreenId,
    pub node: Option<NodeId>,
}

/// Notifications for the presentation shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScreenEvent {
    /// Negative feedback on a node marker.
    Shake(NodeId),
    GateOpened(NodeId),
    GateClosed(NodeId),
    LoadScene(SceneRequest),
    CourseFinished,
}

/// Keyboard and controller shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    StepForward,
    StepBack,
    Confirm,
    Cancel,
}

pub struct ProgressionCoordinator<S: PersistentStore> {
    course: CourseData,
    config: CourseConfig,
    progression: ProgressionState<S>,
    registry: NodeRegistry,
    navigation: NavigationController,
    gate: ContentGate,
    events: Outbox<ScreenEvent>,
}

impl<S: PersistentStore> ProgressionCoordinator<S> {
    /// Wire up the screen. Nothing is placed until [`Self::enter`].
    #[must_use]
    pub fn new(course: CourseData, quizzes: QuizBank, config: CourseConfig, store: S) -> Self {
        if let Err(err) = config.validate() {
            log::warn!("course tuning out of range: {err}; falling back to safe bounds");
        }
        let progression = ProgressionState::load(store, course.node_count());
        let registry = NodeRegistry::new(config.pulse_scale, config.pulse_secs, config.hit_radius);
        let navigation = NavigationController::new(&config);
        let gate = ContentGate::new(quizzes, &config);
        Self {
            course,
            config,
            progression,
            registry,
            navigation,
            gate,
            events: Outbox::new(),
        }
    }

    /// Scene entry: build the markers, snap them to their current status and
    /// park the avatar on the saved car node, catching up to the frontier.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` when the course's road or stops are unusable.
    /// The screen then stays inert: clicks find no markers.
    pub fn enter(&mut self) -> Result<(), RegistryError> {
        let built = PathCurve::new(self.course.path.clone(), self.config.arc_samples)
            .map_err(RegistryError::from)
            .and_then(|path| {
                self.registry
                    .initialize(path, &self.course.stops(), self.course.node_count())
            });
        if let Err(err) = built {
            log::error!("course map for '{}' unusable: {err}", self.course.title);
            return Err(err);
        }
        self.refresh_all(false);
        self.navigation.enter(&self.progression, &self.registry);
        self.dispatch();
        Ok(())
    }

    #[must_use]
    pub const fn course(&self) -> &CourseData {
        &self.course
    }

    #[must_use]
    pub const fn config(&self) -> &CourseConfig {
        &self.config
    }

    #[must_use]
    pub const fn progression(&self) -> &ProgressionState<S> {
        &self.progression
    }

    #[must_use]
    pub const fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    #[must_use]
    pub const fn gate(&self) -> &ContentGate {
        &self.gate
    }

    #[must_use]
    pub const fn avatar(&self) -> &Avatar {
        self.navigation.avatar()
    }

    /// Player clicked a node marker.
    pub fn click_node(&mut self, node: NodeId) {
        if !self.registry.click(node) {
            log::debug!("click on {node} ignored: no marker");
        }
        self.dispatch();
    }

    /// Player clicked somewhere on the map; returns the marker that was hit.
    pub fn click_at(&mut self, point: Vec2) -> Option<NodeId> {
        let hit = self.registry.click_at(point);
        self.dispatch();
        hit
    }

    /// Shortcut input. Steps move relative to the node under the avatar.
    pub fn handle_input(&mut self, action: InputAction) {
        match action {
            InputAction::StepForward => self.step(true),
            InputAction::StepBack => self.step(false),
            InputAction::Confirm => self.confirm(),
            InputAction::Cancel => self.cancel(),
        }
        self.dispatch();
    }

    /// Node the avatar is on, or heading to.
    #[must_use]
    pub fn avatar_node(&self) -> NodeId {
        self.navigation
            .target()
            .unwrap_or_else(|| self.progression.car_node())
    }

    fn step(&mut self, forward: bool) {
        if self.gate.is_open() {
            log::debug!("step ignored while the lesson popup is open");
            return;
        }
        let base = self.avatar_node();
        let target = if forward { Some(base.next()) } else { base.prev() };
        let Some(target) = target.filter(|t| self.progression.contains(*t)) else {
            log::debug!("step from {base} leaves the course; ignored");
            return;
        };
        let _ = self
            .navigation
            .move_to_node(target, &self.progression, &self.registry);
    }

    fn confirm(&mut self) {
        let result = match self.gate.phase() {
            GatePhase::Closed => {
                if self.navigation.is_moving() {
                    log::debug!("confirm ignored while travelling");
                } else {
                    let node = self.progression.car_node();
                    self.registry.click(node);
                }
                Ok(())
            }
            GatePhase::ShowingSlides if self.gate.is_last_slide() => self.gate.start_quiz(),
            GatePhase::ShowingSlides => self.gate.next(),
            GatePhase::Failure => self.gate.restart_quiz(),
            GatePhase::InQuiz | GatePhase::Success => Ok(()),
        };
        if let Err(reason) = result {
            log::debug!("confirm rejected: {reason:?}");
        }
    }

    fn cancel(&mut self) {
        let result = match self.gate.phase() {
            GatePhase::ShowingSlides => self.gate.close(),
            GatePhase::InQuiz => self.gate.back_to_slides(),
            _ => Ok(()),
        };
        if let Err(reason) = result {
            log::debug!("cancel rejected: {reason:?}");
        }
    }

    /// Drive the avatar to `node` without opening its lesson.
    ///
    /// # Errors
    ///
    /// Returns the `MoveRejection`; rejections that warrant feedback shake
    /// the marker.
    pub fn move_to_node(&mut self, node: NodeId) -> Result<(), MoveRejection> {
        let result = self
            .navigation
            .move_to_node(node, &self.progression, &self.registry);
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn next_slide(&mut self) -> Result<(), GateRejection> {
        let result = self.gate.next();
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn previous_slide(&mut self) -> Result<(), GateRejection> {
        let result = self.gate.previous();
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn start_quiz(&mut self) -> Result<(), GateRejection> {
        let result = self.gate.start_quiz();
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn answer(&mut self, option: usize) -> Result<AnswerOutcome, GateRejection> {
        let result = self.gate.answer(option);
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn go_to_question(&mut self, index: usize) -> Result<(), GateRejection> {
        let result = self.gate.go_to_question(index);
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn restart_quiz(&mut self) -> Result<(), GateRejection> {
        let result = self.gate.restart_quiz();
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn back_to_slides(&mut self) -> Result<(), GateRejection> {
        let result = self.gate.back_to_slides();
        self.dispatch();
        result
    }

    /// # Errors
    ///
    /// Returns the gate's `GateRejection` when the request does not apply.
    pub fn close_gate(&mut self) -> Result<(), GateRejection> {
        let result = self.gate.close();
        self.dispatch();
        result
    }

    /// Hand off to the driving mini-game for an open node.
    pub fn enter_driving_challenge(&mut self, node: NodeId) {
        if self.progression.is_unlocked(node) {
            log::info!("loading driving challenge for {node}");
            self.events.push(ScreenEvent::LoadScene(SceneRequest {
                screen: ScreenId::DrivingChallenge,
                node: Some(node),
            }));
        } else {
            log::debug!("driving challenge for locked {node} refused");
            self.events.push(ScreenEvent::Shake(node));
        }
    }

    pub fn leave_to_menu(&mut self) {
        self.events.push(ScreenEvent::LoadScene(SceneRequest {
            screen: ScreenId::MainMenu,
            node: None,
        }));
    }

    /// Wipe progress back to first-run state and park the avatar on node 0.
    pub fn reset_progress(&mut self) {
        self.gate.dismiss();
        self.navigation.cancel();
        self.progression.reset();
        self.navigation.snap_to(NodeId(0), &self.registry);
        self.dispatch();
    }

    /// Advance every animation by one frame and react to what happened.
    pub fn tick(&mut self, dt: f32) {
        self.registry.tick(dt);
        self.gate.tick(dt);
        self.navigation
            .tick(dt, &mut self.progression, &self.registry);
        self.dispatch();
    }

    /// Take the shell notifications raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<ScreenEvent> {
        self.events.drain()
    }

    fn dispatch(&mut self) {
        for _ in 0..MAX_DISPATCH_PASSES {
            let clicks = self.registry.drain_events();
            let gate = self.gate.drain_events();
            let travel = self.navigation.drain_events();
            let progress = self.progression.drain_events();
            if clicks.is_empty() && gate.is_empty() && travel.is_empty() && progress.is_empty() {
                return;
            }
            clicks.into_iter().for_each(|e| self.on_registry(e));
            gate.into_iter().for_each(|e| self.on_gate(e));
            travel.into_iter().for_each(|e| self.on_navigation(e));
            progress.into_iter().for_each(|e| self.on_progression(e));
        }
        log::warn!("event dispatch did not settle after {MAX_DISPATCH_PASSES} passes");
    }

    fn on_registry(&mut self, event: RegistryEvent) {
        let RegistryEvent::NodeClicked { node } = event;
        if self.gate.is_open() {
            log::debug!("click on {node} ignored while the lesson popup is open");
            return;
        }
        if !self.progression.is_unlocked(node) {
            log::debug!("click on locked {node}");
            self.events.push(ScreenEvent::Shake(node));
            return;
        }
        let deck = match self.course.deck(node) {
            Ok(deck) => deck,
            Err(err) => {
                log::error!("cannot open lesson: {err}");
                return;
            }
        };
        if let Err(reason) = self
            .gate
            .open(node, deck, self.progression.is_completed(node))
        {
            log::debug!("lesson for {node} not opened: {reason:?}");
            return;
        }
        if node != self.avatar_node() {
            let _ = self
                .navigation
                .move_to_node(node, &self.progression, &self.registry);
        }
    }

    fn on_gate(&mut self, event: GateEvent) {
        match event {
            GateEvent::Opened { node, .. } => self.events.push(ScreenEvent::GateOpened(node)),
            GateEvent::Closed { node } => self.events.push(ScreenEvent::GateClosed(node)),
            GateEvent::NodeCompleted { node } => {
                if self.progression.is_completed(node) {
                    log::debug!("{node} was already completed; closing only");
                } else {
                    self.progression.complete(node);
                }
            }
            GateEvent::PhaseChanged { .. } | GateEvent::Answered { .. } => {}
        }
    }

    fn on_navigation(&mut self, event: NavigationEvent) {
        match event {
            NavigationEvent::Rejected { target, reason } if reason.wants_feedback() => {
                self.events.push(ScreenEvent::Shake(target));
            }
            NavigationEvent::Arrived { .. } => self.refresh_all(true),
            _ => {}
        }
    }

    fn on_progression(&mut self, event: ProgressionEvent) {
        match event {
            ProgressionEvent::NodeCompleted { unlocked, .. } => {
                self.refresh_all(true);
                if let Some(next) = unlocked {
                    let _ = self
                        .navigation
                        .move_to_node(next, &self.progression, &self.registry);
                }
                if self.progression.is_finished() {
                    log::info!("course '{}' finished", self.course.title);
                    self.events.push(ScreenEvent::CourseFinished);
                }
            }
            ProgressionEvent::Reset => self.refresh_all(false),
        }
    }

    fn refresh_all(&mut self, animate: bool) {
        let car = self.progression.car_node();
        for index in 0..self.registry.len() {
            let id = NodeId(index);
            self.registry
                .refresh(id, self.progression.status(id), id == car, animate);
        }
    }
}

impl<S: PersistentStore> std::fmt::Debug for ProgressionCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionCoordinator")
            .field("course", &self.course.title)
            .field("snapshot", self.progression.snapshot())
            .field("gate", &self.gate.phase())
            .field("avatar", self.navigation.avatar())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CourseNode, Question, QuizEntry, Slide, SlideDeck};
    use crate::progression::NodeStatus;
    use crate::registry::Presentation;
    use crate::store::MemoryStore;

    fn course(nodes: usize) -> CourseData {
        let deck = SlideDeck {
            slides: vec![
                Slide {
                    title: "Intro".into(),
                    body: String::new(),
                    image: None,
                },
                Slide {
                    title: "Rules".into(),
                    body: String::new(),
                    image: None,
                },
            ],
        };
        #[allow(clippy::cast_precision_loss)]
        let last = (nodes - 1) as f32;
        CourseData {
            title: "Test course".into(),
            path: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(300.0, 0.0),
                Vec2::new(600.0, 0.0),
            ],
            nodes: (0..nodes)
                .map(|i| {
                    #[allow(clippy::cast_precision_loss)]
                    let stop = i as f32 / last;
                    CourseNode {
                        id: NodeId(i),
                        title: format!("Lesson {i}"),
                        stop,
                        deck: deck.clone(),
                    }
                })
                .collect(),
        }
    }

    fn quizzes(nodes: usize) -> QuizBank {
        QuizBank::from_entries(
            (0..nodes)
                .map(|i| QuizEntry {
                    node_id: NodeId(i),
                    questions: vec![
                        Question {
                            question: "first".into(),
                            options: vec!["a".into(), "b".into()],
                            correct_answer_index: 0,
                        },
                        Question {
                            question: "second".into(),
                            options: vec!["a".into(), "b".into()],
                            correct_answer_index: 1,
                        },
                    ],
                })
                .collect(),
        )
    }

    fn coordinator(store: MemoryStore) -> ProgressionCoordinator<MemoryStore> {
        let mut coordinator =
            ProgressionCoordinator::new(course(4), quizzes(4), CourseConfig::default(), store);
        coordinator.enter().unwrap();
        coordinator
    }

    fn run(coordinator: &mut ProgressionCoordinator<MemoryStore>, secs: f32) {
        let frames = (secs * 60.0).ceil() as usize;
        for _ in 0..frames {
            coordinator.tick(1.0 / 60.0);
        }
    }

    fn pass_lesson(coordinator: &mut ProgressionCoordinator<MemoryStore>, node: NodeId) {
        coordinator.click_node(node);
        run(coordinator, 1.0);
        coordinator.next_slide().unwrap();
        run(coordinator, 1.0);
        coordinator.start_quiz().unwrap();
        run(coordinator, 1.0);
        coordinator.answer(0).unwrap();
        run(coordinator, 1.0);
        assert_eq!(coordinator.answer(1), Ok(AnswerOutcome::Passed));
        run(coordinator, 8.0);
    }

    #[test]
    fn inverted_travel_bounds_still_reach_the_unlocked_node() {
        let config = CourseConfig {
            min_travel_secs: 9.0,
            max_travel_secs: 2.0,
            ..CourseConfig::default()
        };
        let mut coordinator =
            ProgressionCoordinator::new(course(4), quizzes(4), config, MemoryStore::new());
        coordinator.enter().unwrap();
        pass_lesson(&mut coordinator, NodeId(0));
        run(&mut coordinator, 4.0);
        assert!(!coordinator.navigation().is_moving());
        assert_eq!(coordinator.progression().car_node(), NodeId(1));
        assert_eq!(
            coordinator.registry().visual(NodeId(1)).unwrap().presentation,
            Presentation::Active
        );
    }

    #[test]
    fn locked_click_shakes_without_mutation() {
        let store = MemoryStore::new();
        let mut coordinator = coordinator(store.clone());
        coordinator.progression.complete(NodeId(0));
        coordinator.dispatch();
        coordinator.drain_events();
        let before = store.entries();
        coordinator.click_node(NodeId(2));
        assert_eq!(coordinator.drain_events(), vec![ScreenEvent::Shake(NodeId(2))]);
        assert!(!coordinator.gate().is_open());
        assert_eq!(store.entries(), before);
    }

    #[test]
    fn passing_a_lesson_unlocks_and_drives_to_the_next_node() {
        let mut coordinator = coordinator(MemoryStore::new());
        pass_lesson(&mut coordinator, NodeId(0));
        let progression = coordinator.progression();
        assert!(progression.is_completed(NodeId(0)));
        assert_eq!(progression.active_node(), NodeId(1));
        assert_eq!(progression.car_node(), NodeId(1));
        assert!(!coordinator.navigation().is_moving());
        assert_eq!(coordinator.gate().phase(), GatePhase::Closed);
        let registry = coordinator.registry();
        assert_eq!(
            registry.visual(NodeId(0)).unwrap().presentation,
            Presentation::Completed
        );
        assert_eq!(
            registry.visual(NodeId(1)).unwrap().presentation,
            Presentation::Active
        );
        assert_eq!(
            registry.visual(NodeId(2)).unwrap().presentation,
            Presentation::Locked
        );
        let events = coordinator.drain_events();
        assert!(events.contains(&ScreenEvent::GateOpened(NodeId(0))));
        assert!(events.contains(&ScreenEvent::GateClosed(NodeId(0))));
    }

    #[test]
    fn replaying_a_completed_node_does_not_complete_twice() {
        let mut coordinator = coordinator(MemoryStore::new());
        pass_lesson(&mut coordinator, NodeId(0));
        let snapshot = coordinator.progression().snapshot().clone();
        coordinator.click_node(NodeId(0));
        run(&mut coordinator, 1.0);
        assert_eq!(coordinator.start_quiz(), Err(GateRejection::AlreadyCompleted));
        coordinator.close_gate().unwrap();
        assert_eq!(coordinator.progression().snapshot().active_node, snapshot.active_node);
        assert_eq!(coordinator.progression().snapshot().completed, snapshot.completed);
    }

    #[test]
    fn finishing_every_node_reports_course_finished() {
        let mut coordinator = coordinator(MemoryStore::new());
        for i in 0..4 {
            pass_lesson(&mut coordinator, NodeId(i));
        }
        assert!(coordinator.progression().is_finished());
        assert!(coordinator
            .drain_events()
            .contains(&ScreenEvent::CourseFinished));
    }

    #[test]
    fn keyboard_steps_respect_unlock_rules() {
        let mut coordinator = coordinator(MemoryStore::new());
        coordinator.handle_input(InputAction::StepForward);
        assert_eq!(coordinator.drain_events(), vec![ScreenEvent::Shake(NodeId(1))]);
        coordinator.handle_input(InputAction::StepBack);
        assert!(coordinator.drain_events().is_empty());

        pass_lesson(&mut coordinator, NodeId(0));
        coordinator.drain_events();
        coordinator.handle_input(InputAction::StepBack);
        assert_eq!(coordinator.navigation().target(), Some(NodeId(0)));
        run(&mut coordinator, 8.0);
        assert_eq!(coordinator.progression().car_node(), NodeId(0));
        coordinator.handle_input(InputAction::StepForward);
        run(&mut coordinator, 8.0);
        assert_eq!(coordinator.progression().car_node(), NodeId(1));
    }

    #[test]
    fn confirm_and_cancel_drive_the_popup() {
        let mut coordinator = coordinator(MemoryStore::new());
        coordinator.handle_input(InputAction::Confirm);
        assert_eq!(coordinator.gate().phase(), GatePhase::ShowingSlides);
        run(&mut coordinator, 1.0);
        coordinator.handle_input(InputAction::Confirm);
        run(&mut coordinator, 1.0);
        coordinator.handle_input(InputAction::Confirm);
        assert_eq!(coordinator.gate().phase(), GatePhase::InQuiz);
        run(&mut coordinator, 1.0);
        coordinator.handle_input(InputAction::Cancel);
        assert_eq!(coordinator.gate().phase(), GatePhase::ShowingSlides);
        coordinator.handle_input(InputAction::Cancel);
        assert_eq!(coordinator.gate().phase(), GatePhase::Closed);
    }

    #[test]
    fn entry_catches_up_to_the_frontier() {
        let store = MemoryStore::new();
        {
            let mut first = coordinator(store.clone());
            first.progression.complete(NodeId(0));
            first.navigation.cancel();
        }
        let mut second = coordinator(store);
        assert_eq!(second.progression().car_node(), NodeId(0));
        assert_eq!(second.navigation().target(), Some(NodeId(1)));
        run(&mut second, 8.0);
        assert_eq!(second.progression().car_node(), NodeId(1));
        let expected = second.registry().position(NodeId(1)).unwrap();
        assert!(second.avatar().position.distance(expected) < 1e-3);
    }

    #[test]
    fn driving_challenge_only_for_open_nodes() {
        let mut coordinator = coordinator(MemoryStore::new());
        coordinator.enter_driving_challenge(NodeId(3));
        coordinator.enter_driving_challenge(NodeId(0));
        coordinator.leave_to_menu();
        assert_eq!(
            coordinator.drain_events(),
            vec![
                ScreenEvent::Shake(NodeId(3)),
                ScreenEvent::LoadScene(SceneRequest {
                    screen: ScreenId::DrivingChallenge,
                    node: Some(NodeId(0)),
                }),
                ScreenEvent::LoadScene(SceneRequest {
                    screen: ScreenId::MainMenu,
                    node: None,
                }),
            ]
        );
    }

    #[test]
    fn reset_returns_to_first_run_state() {
        let mut coordinator = coordinator(MemoryStore::new());
        pass_lesson(&mut coordinator, NodeId(0));
        coordinator.click_node(NodeId(1));
        coordinator.reset_progress();
        assert!(!coordinator.gate().is_open());
        assert_eq!(coordinator.progression().status(NodeId(1)), NodeStatus::Locked);
        assert_eq!(coordinator.progression().car_node(), NodeId(0));
        assert_eq!(
            coordinator.registry().visual(NodeId(0)).unwrap().presentation,
            Presentation::Active
        );
        let origin = coordinator.registry().position(NodeId(0)).unwrap();
        assert!(coordinator.avatar().position.distance(origin) < 1e-3);
    }

    #[test]
    fn broken_road_leaves_screen_inert() {
        let mut broken = course(4);
        broken.path.truncate(1);
        let mut coordinator = ProgressionCoordinator::new(
            broken,
            quizzes(4),
            CourseConfig::default(),
            MemoryStore::new(),
        );
        assert!(coordinator.enter().is_err());
        coordinator.click_node(NodeId(0));
        assert!(!coordinator.gate().is_open());
    }
}
