use anyhow::{Context, Result, bail, ensure};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use roadready_game::{
    CourseContent, CourseEngine, EmbeddedLoader, GatePhase, InputAction, MemoryStore, NodeId,
    NodeStatus, Presentation, ProgressionCoordinator, ScreenEvent,
};

/// Upper bound on frames spent waiting for animations to finish.
const SETTLE_FRAME_LIMIT: usize = 10_000;

/// Course content shared by every playthrough of a run.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    content: CourseContent,
}

impl TesterAssets {
    /// Load the course shipped with the game crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded assets fail to load or validate.
    pub fn load_default() -> Result<Self> {
        let engine = CourseEngine::new(EmbeddedLoader, MemoryStore::new());
        let content = engine.load_content().context("loading embedded course")?;
        Ok(Self { content })
    }

    #[must_use]
    pub const fn content(&self) -> &CourseContent {
        &self.content
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.content.course.node_count()
    }
}

/// One headless session on the course map, driven frame by frame.
pub struct Playthrough {
    assets: Arc<TesterAssets>,
    store: MemoryStore,
    coordinator: ProgressionCoordinator<MemoryStore>,
    rng: ChaCha8Rng,
    frame_secs: f32,
    frames: usize,
    events: Vec<ScreenEvent>,
    seed: u64,
}

impl Playthrough {
    /// Start a fresh session on an empty save.
    ///
    /// # Errors
    ///
    /// Returns an error if the course map cannot be built.
    pub fn new(assets: Arc<TesterAssets>, seed: u64, frame_secs: f32) -> Result<Self> {
        let store = MemoryStore::new();
        let coordinator = build_coordinator(&assets, store.clone())?;
        let mut play = Self {
            assets,
            store,
            coordinator,
            rng: ChaCha8Rng::seed_from_u64(seed),
            frame_secs,
            frames: 0,
            events: Vec::new(),
            seed,
        };
        play.pump();
        Ok(play)
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.assets.node_count()
    }

    #[must_use]
    pub const fn coordinator(&self) -> &ProgressionCoordinator<MemoryStore> {
        &self.coordinator
    }

    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Shell notifications collected so far.
    #[must_use]
    pub fn events(&self) -> &[ScreenEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ScreenEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn count_events(&self, wanted: ScreenEvent) -> usize {
        self.events.iter().filter(|e| **e == wanted).count()
    }

    /// Run a request against the screen and collect what it reported.
    pub fn act<R>(&mut self, f: impl FnOnce(&mut ProgressionCoordinator<MemoryStore>) -> R) -> R {
        let result = f(&mut self.coordinator);
        self.pump();
        result
    }

    fn pump(&mut self) {
        self.events.extend(self.coordinator.drain_events());
    }

    /// Advance one frame and re-check the invariants.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated invariant.
    pub fn tick(&mut self) -> Result<()> {
        let dt = self.frame_secs;
        self.act(|c| c.tick(dt));
        self.frames += 1;
        self.check_invariants()
    }

    /// # Errors
    ///
    /// Returns an error if an invariant breaks along the way.
    pub fn run_for(&mut self, secs: f32) -> Result<()> {
        let mut elapsed = 0.0;
        while elapsed < secs {
            self.tick()?;
            elapsed += self.frame_secs;
        }
        Ok(())
    }

    /// Tick until neither the popup nor the avatar is animating.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant breaks or the screen never settles.
    pub fn settle(&mut self) -> Result<()> {
        for _ in 0..SETTLE_FRAME_LIMIT {
            let c = &self.coordinator;
            if !c.gate().is_transitioning() && !c.navigation().is_moving() {
                return Ok(());
            }
            self.tick()?;
        }
        bail!("screen did not settle within {SETTLE_FRAME_LIMIT} frames")
    }

    /// Throw away the screen and build it again on the same save.
    ///
    /// # Errors
    ///
    /// Returns an error if the course map cannot be rebuilt.
    pub fn reopen(&mut self) -> Result<()> {
        log::debug!("reopening course screen after {} frames", self.frames);
        self.coordinator = build_coordinator(&self.assets, self.store.clone())?;
        self.pump();
        self.check_invariants()
    }

    /// Click a node and settle the popup's entry animation.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant breaks.
    pub fn open_node(&mut self, node: NodeId) -> Result<()> {
        self.settle()?;
        self.act(|c| c.click_node(node));
        self.settle()
    }

    /// Page to the deck's last slide.
    ///
    /// # Errors
    ///
    /// Returns an error if the popup is not showing slides.
    pub fn read_slides(&mut self) -> Result<()> {
        ensure!(
            self.coordinator.gate().phase() == GatePhase::ShowingSlides,
            "expected slides, popup is {:?}",
            self.coordinator.gate().phase()
        );
        while !self.coordinator.gate().is_last_slide() {
            self.act(ProgressionCoordinator::next_slide)
                .map_err(|r| anyhow::anyhow!("next slide rejected: {r:?}"))?;
            self.settle()?;
        }
        Ok(())
    }

    /// Correct option for the question on screen.
    ///
    /// # Errors
    ///
    /// Returns an error when no quiz question is showing.
    pub fn correct_option(&self) -> Result<usize> {
        self.coordinator
            .gate()
            .session()
            .and_then(|s| s.current_question())
            .map(|q| q.correct_answer_index)
            .context("no quiz question on screen")
    }

    /// A wrong option for the question on screen.
    ///
    /// # Errors
    ///
    /// Returns an error when no question is showing or it has a single option.
    pub fn wrong_option(&self) -> Result<usize> {
        let question = self
            .coordinator
            .gate()
            .session()
            .and_then(|s| s.current_question())
            .context("no quiz question on screen")?;
        (0..question.options.len())
            .find(|i| !question.is_correct(*i))
            .context("question has no wrong option")
    }

    /// Answer every remaining question correctly and wait for the popup to close.
    ///
    /// # Errors
    ///
    /// Returns an error if the quiz is not running or an answer is rejected.
    pub fn finish_quiz(&mut self) -> Result<()> {
        while self.coordinator.gate().phase() == GatePhase::InQuiz {
            self.settle()?;
            let option = self.correct_option()?;
            self.act(|c| c.answer(option))
                .map_err(|r| anyhow::anyhow!("answer rejected: {r:?}"))?;
        }
        ensure!(
            self.coordinator.gate().phase() == GatePhase::Success,
            "quiz ended in {:?}",
            self.coordinator.gate().phase()
        );
        self.settle()
    }

    /// Open a node, read its lesson and pass its quiz.
    ///
    /// # Errors
    ///
    /// Returns an error if any step is refused or an invariant breaks.
    pub fn pass_node(&mut self, node: NodeId) -> Result<()> {
        self.open_node(node)?;
        ensure!(
            self.coordinator.gate().node() == Some(node),
            "popup for {node} did not open"
        );
        self.read_slides()?;
        self.act(ProgressionCoordinator::start_quiz)
            .map_err(|r| anyhow::anyhow!("quiz for {node} refused: {r:?}"))?;
        self.finish_quiz()?;
        ensure!(
            self.coordinator.progression().is_completed(node),
            "{node} not completed after passing its quiz"
        );
        Ok(())
    }

    /// One random player action, rejections included.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant breaks while time passes.
    pub fn random_action(&mut self) -> Result<()> {
        let nodes = self.node_count();
        match self.rng.gen_range(0..10) {
            0 | 1 => {
                let node = NodeId(self.rng.gen_range(0..nodes));
                self.act(|c| c.click_node(node));
            }
            2 => {
                let option = match self.correct_option() {
                    Ok(correct) if self.rng.gen_bool(0.8) => correct,
                    _ => self.rng.gen_range(0..4),
                };
                let _ = self.act(|c| c.answer(option));
            }
            3 => {
                let _ = self.act(ProgressionCoordinator::next_slide);
            }
            4 => {
                let _ = self.act(ProgressionCoordinator::previous_slide);
            }
            5 => {
                let _ = self.act(ProgressionCoordinator::start_quiz);
            }
            6 => {
                let _ = self.act(ProgressionCoordinator::restart_quiz);
            }
            7 => {
                let action = match self.rng.gen_range(0..4) {
                    0 => InputAction::StepForward,
                    1 => InputAction::StepBack,
                    2 => InputAction::Confirm,
                    _ => InputAction::Cancel,
                };
                self.act(|c| c.handle_input(action));
            }
            8 => {
                let node = NodeId(self.rng.gen_range(0..nodes));
                let _ = self.act(|c| c.move_to_node(node));
            }
            _ => {
                let secs = self.rng.gen_range(0.02..1.5);
                self.run_for(secs)?;
            }
        }
        self.check_invariants()
    }

    /// Ordering rules, pointer rules and marker consistency.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first violated invariant.
    pub fn check_invariants(&self) -> Result<()> {
        let c = &self.coordinator;
        let progression = c.progression();
        let snapshot = progression.snapshot();
        ensure!(snapshot.is_consistent(), "inconsistent progress {snapshot:?}");
        for i in 0..progression.node_count() {
            let id = NodeId(i);
            if progression.is_completed(id) {
                ensure!(progression.is_unlocked(id), "{id} completed but locked");
            }
            if progression.is_unlocked(id.next()) {
                ensure!(
                    progression.is_completed(id),
                    "{} unlocked before {id} was completed",
                    id.next()
                );
            }
            let presentation = c.registry().visual(id).map(|v| v.presentation);
            let locked = progression.status(id) == NodeStatus::Locked;
            ensure!(
                locked == (presentation == Some(Presentation::Locked)),
                "{id} is {:?} but drawn {presentation:?}",
                progression.status(id)
            );
        }
        ensure!(
            progression.is_unlocked(progression.car_node()),
            "avatar parked on locked {}",
            progression.car_node()
        );
        if let Some(node) = c.gate().node() {
            ensure!(
                progression.is_unlocked(node),
                "lesson open on locked {node}"
            );
        }
        if let Some(session) = c.gate().session() {
            ensure!(
                session.is_unlocked(session.current_index()),
                "quiz shows locked question {}",
                session.current_index()
            );
        }
        Ok(())
    }

    /// Short description of where the session stands, for failure reports.
    #[must_use]
    pub fn describe(&self) -> String {
        let progression = self.coordinator.progression();
        format!(
            "seed {} frame {} completed {}/{} active {} car {} popup {:?}",
            self.seed,
            self.frames,
            progression.completed_count(),
            progression.node_count(),
            progression.active_node(),
            progression.car_node(),
            self.coordinator.gate().phase()
        )
    }
}

fn build_coordinator(
    assets: &TesterAssets,
    store: MemoryStore,
) -> Result<ProgressionCoordinator<MemoryStore>> {
    let content = assets.content();
    let mut coordinator = ProgressionCoordinator::new(
        content.course.clone(),
        content.quizzes.clone(),
        content.config.clone(),
        store,
    );
    coordinator.enter().context("entering course map")?;
    Ok(coordinator)
}
