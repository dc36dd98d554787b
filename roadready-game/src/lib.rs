//! RoadReady Course Engine
//!
//! Platform-agnostic core of the RoadReady driving-lesson course map: node
//! unlocking, avatar travel along the road, lesson slides and quizzes.
//! This crate has no rendering, input-device or platform dependencies; a shell
//! feeds it clicks, shortcuts and frame deltas and draws what it reports.

pub mod anim;
pub mod config;
pub mod constants;
pub mod content;
pub mod coordinator;
pub mod events;
pub mod gate;
pub mod navigation;
pub mod numbers;
pub mod path;
pub mod progression;
pub mod quiz;
pub mod registry;
pub mod store;

use anyhow::Context;

// Re-export commonly used types
pub use anim::{AnimationTask, Easing, Pulse, Scheduler, TaskStatus, Tween};
pub use config::{ConfigError, CourseConfig};
pub use content::{
    ContentError, CourseData, CourseNode, EmbeddedLoader, Question, QuizBank, QuizEntry, Slide,
    SlideDeck,
};
pub use coordinator::{InputAction, ProgressionCoordinator, SceneRequest, ScreenEvent, ScreenId};
pub use events::Outbox;
pub use gate::{ContentGate, GateChrome, GateEvent, GatePhase, GateRejection};
pub use navigation::{
    Avatar, MoveRejection, NavigationController, NavigationEvent, TravelDirection,
};
pub use path::{PathCurve, PathError, PathStop, Vec2};
pub use progression::{NodeId, NodeStatus, ProgressSnapshot, ProgressionEvent, ProgressionState};
pub use quiz::{AnswerOutcome, QuizSession};
pub use registry::{
    NodeRegistry, NodeVisual, Presentation, PresentationStrategy, RegistryError, RegistryEvent,
    StandardPresentation,
};
pub use store::{JsonFileStore, MemoryStore, PersistentStore, StoreError, StoreValue};

/// Trait for abstracting course content loading
/// Platform-specific implementations should provide this
pub trait ContentLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the course layout and slide decks
    ///
    /// # Errors
    ///
    /// Returns an error if the course data cannot be loaded.
    fn load_course(&self) -> Result<CourseData, Self::Error>;

    /// Load every node's quiz
    ///
    /// # Errors
    ///
    /// Returns an error if the quiz bank cannot be loaded or parsed.
    fn load_quiz_bank(&self) -> Result<QuizBank, Self::Error>;

    /// Load the screen tuning
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<CourseConfig, Self::Error>;
}

/// Everything a course screen is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseContent {
    pub course: CourseData,
    pub quizzes: QuizBank,
    pub config: CourseConfig,
}

/// Composition root: binds a content source to a progress store
pub struct CourseEngine<L, S>
where
    L: ContentLoader,
    S: PersistentStore,
{
    loader: L,
    store: S,
}

impl<L, S> CourseEngine<L, S>
where
    L: ContentLoader,
    S: PersistentStore,
{
    /// Create a new engine with the provided loader and store
    pub const fn new(loader: L, store: S) -> Self {
        Self { loader, store }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Load and validate every content asset.
    ///
    /// Quiz problems are reported but not fatal: the affected nodes keep
    /// their slides and lose only the quiz.
    ///
    /// # Errors
    ///
    /// Returns an error if an asset cannot be loaded or the tuning is invalid.
    pub fn load_content(&self) -> Result<CourseContent, anyhow::Error> {
        let config = self.loader.load_config().context("loading course config")?;
        config.validate().context("validating course config")?;
        let course = self.loader.load_course().context("loading course data")?;
        let quizzes = self.loader.load_quiz_bank().context("loading quiz bank")?;
        for problem in quizzes.audit(course.node_count()) {
            log::warn!("quiz content: {problem}");
        }
        Ok(CourseContent {
            course,
            quizzes,
            config,
        })
    }

    /// Build the course screen on top of the saved progress and enter it.
    ///
    /// # Errors
    ///
    /// Returns an error if content fails to load or the course map cannot be
    /// built from it.
    pub fn start(self) -> Result<ProgressionCoordinator<S>, anyhow::Error> {
        let CourseContent {
            course,
            quizzes,
            config,
        } = self.load_content()?;
        let title = course.title.clone();
        let mut coordinator = ProgressionCoordinator::new(course, quizzes, config, self.store);
        coordinator
            .enter()
            .with_context(|| format!("building course map for '{title}'"))?;
        Ok(coordinator)
    }
}
