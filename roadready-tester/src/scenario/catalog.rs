use anyhow::{Context, Result, ensure};
use rand::Rng;
use std::collections::BTreeSet;

use crate::logic::Playthrough;
use crate::scenario::Scenario;
use roadready_game::{
    AnswerOutcome, GatePhase, InputAction, NodeId, NodeStatus, ProgressionCoordinator, ScreenEvent,
};

/// Random actions per random-play iteration.
const RANDOM_PLAY_STEPS: usize = 400;

pub fn catalog_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            key: "smoke",
            name: "Smoke",
            description: "Fresh save loads, markers and avatar are placed",
            run: smoke_expectation,
        },
        Scenario {
            key: "full-course",
            name: "Full Course",
            description: "Pass every lesson in order and finish the course",
            run: full_course_expectation,
        },
        Scenario {
            key: "quiz-retry",
            name: "Quiz Retry",
            description: "A wrong answer fails the quiz; restart starts over from question one",
            run: quiz_retry_expectation,
        },
        Scenario {
            key: "locked-click",
            name: "Locked Click",
            description: "Clicking a locked node shakes it and changes nothing",
            run: locked_click_expectation,
        },
        Scenario {
            key: "movement-supersede",
            name: "Movement Supersede",
            description: "A second move request replaces the leg in flight",
            run: movement_supersede_expectation,
        },
        Scenario {
            key: "save-roundtrip",
            name: "Save Round Trip",
            description: "Progress survives rebuilding the screen on the same save",
            run: save_roundtrip_expectation,
        },
        Scenario {
            key: "keyboard-shortcuts",
            name: "Keyboard Shortcuts",
            description: "Step/confirm/cancel keys follow the same rules as clicks",
            run: keyboard_shortcuts_expectation,
        },
        Scenario {
            key: "random-play",
            name: "Random Play",
            description: "Seeded random clicks, answers and keys never break progression rules",
            run: random_play_expectation,
        },
    ]
}

fn smoke_expectation(play: &mut Playthrough) -> Result<()> {
    let c = play.coordinator();
    let progression = c.progression();
    ensure!(
        progression.status(NodeId(0)) == NodeStatus::Unlocked,
        "node 0 should start unlocked"
    );
    ensure!(
        (1..progression.node_count()).all(|i| progression.status(NodeId(i)) == NodeStatus::Locked),
        "every later node should start locked"
    );
    ensure!(
        c.registry().len() == play.node_count(),
        "one marker per node"
    );
    let origin = c
        .registry()
        .position(NodeId(0))
        .context("node 0 has no marker")?;
    ensure!(
        c.avatar().position.distance(origin) < 1e-3,
        "avatar should start on node 0"
    );
    ensure!(c.gate().phase() == GatePhase::Closed, "popup starts closed");
    play.run_for(1.0)
}

fn full_course_expectation(play: &mut Playthrough) -> Result<()> {
    for i in 0..play.node_count() {
        play.pass_node(NodeId(i))?;
    }
    play.settle()?;
    let progression = play.coordinator().progression();
    ensure!(progression.is_finished(), "course should be finished");
    let last = NodeId(play.node_count() - 1);
    ensure!(
        progression.car_node() == last,
        "avatar should rest on the last node"
    );
    ensure!(
        play.count_events(ScreenEvent::CourseFinished) == 1,
        "course finished should be reported exactly once"
    );
    ensure!(
        !play
            .events()
            .iter()
            .any(|e| matches!(e, ScreenEvent::Shake(_))),
        "an in-order run should never shake"
    );
    Ok(())
}

fn quiz_retry_expectation(play: &mut Playthrough) -> Result<()> {
    play.open_node(NodeId(0))?;
    play.read_slides()?;
    play.act(ProgressionCoordinator::start_quiz)
        .map_err(|r| anyhow::anyhow!("quiz refused: {r:?}"))?;
    play.settle()?;

    let first = play.correct_option()?;
    play.act(|c| c.answer(first))
        .map_err(|r| anyhow::anyhow!("answer refused: {r:?}"))?;
    play.settle()?;
    let wrong = play.wrong_option()?;
    let outcome = play
        .act(|c| c.answer(wrong))
        .map_err(|r| anyhow::anyhow!("answer refused: {r:?}"))?;
    ensure!(
        matches!(outcome, AnswerOutcome::Incorrect { .. }),
        "wrong answer reported as {outcome:?}"
    );

    let gate = play.coordinator().gate();
    ensure!(gate.phase() == GatePhase::Failure, "quiz should have failed");
    let session = gate.session().context("quiz session missing")?;
    ensure!(
        session.current_index() == 1,
        "failure must not move the question index"
    );
    ensure!(
        session.unlocked() == &BTreeSet::from([0, 1]),
        "failure must not unlock anything"
    );
    ensure!(
        !play.coordinator().progression().is_completed(NodeId(0)),
        "failing must not complete the node"
    );

    play.settle()?;
    play.act(ProgressionCoordinator::restart_quiz)
        .map_err(|r| anyhow::anyhow!("restart refused: {r:?}"))?;
    let session = play
        .coordinator()
        .gate()
        .session()
        .context("quiz session missing")?;
    ensure!(
        session.current_index() == 0 && session.unlocked() == &BTreeSet::from([0]),
        "restart must begin at question one"
    );
    play.finish_quiz()?;
    ensure!(
        play.coordinator().progression().is_completed(NodeId(0)),
        "passing after a restart completes the node"
    );
    Ok(())
}

fn locked_click_expectation(play: &mut Playthrough) -> Result<()> {
    play.pass_node(NodeId(0))?;
    play.settle()?;
    play.take_events();
    let before = play.store().entries();
    let snapshot = play.coordinator().progression().snapshot().clone();

    let locked = NodeId(2);
    play.act(|c| c.click_node(locked));

    ensure!(
        play.events() == [ScreenEvent::Shake(locked)],
        "expected a single shake, got {:?}",
        play.events()
    );
    ensure!(!play.coordinator().gate().is_open(), "no popup may open");
    ensure!(play.store().entries() == before, "store must be untouched");
    ensure!(
        play.coordinator().progression().snapshot() == &snapshot,
        "progress must be untouched"
    );
    Ok(())
}

fn movement_supersede_expectation(play: &mut Playthrough) -> Result<()> {
    play.pass_node(NodeId(0))?;
    play.pass_node(NodeId(1))?;
    play.settle()?;

    play.act(|c| c.move_to_node(NodeId(0)))
        .map_err(|r| anyhow::anyhow!("move refused: {r:?}"))?;
    let delay = play.rng().gen_range(0.0..0.5);
    play.run_for(delay)?;
    play.act(|c| c.move_to_node(NodeId(1)))
        .map_err(|r| anyhow::anyhow!("move refused: {r:?}"))?;
    ensure!(
        play.coordinator().navigation().target() == Some(NodeId(1)),
        "second request should own the leg"
    );
    play.settle()?;

    let c = play.coordinator();
    ensure!(
        c.progression().car_node() == NodeId(1),
        "avatar should end on node 1, not {}",
        c.progression().car_node()
    );
    let expected = c.registry().position(NodeId(1)).context("no marker")?;
    ensure!(
        c.avatar().position.distance(expected) < 1e-3,
        "avatar should rest exactly on node 1"
    );
    Ok(())
}

fn save_roundtrip_expectation(play: &mut Playthrough) -> Result<()> {
    let nodes = play.node_count();
    let completed = play.rng().gen_range(0..=nodes);
    for i in 0..completed {
        play.pass_node(NodeId(i))?;
    }
    play.settle()?;
    let before = play.coordinator().progression().snapshot().clone();

    play.reopen()?;
    ensure!(
        play.coordinator().progression().snapshot() == &before,
        "reloaded progress differs after {completed} lessons"
    );
    play.settle()?;
    let c = play.coordinator();
    ensure!(
        c.progression().car_node() == before.car_node,
        "avatar should resume on {}",
        before.car_node
    );
    Ok(())
}

fn keyboard_shortcuts_expectation(play: &mut Playthrough) -> Result<()> {
    play.act(|c| c.handle_input(InputAction::StepForward));
    ensure!(
        play.take_events() == vec![ScreenEvent::Shake(NodeId(1))],
        "stepping onto a locked node should shake it"
    );

    play.act(|c| c.handle_input(InputAction::Confirm));
    ensure!(
        play.coordinator().gate().node() == Some(NodeId(0)),
        "confirm should open the lesson under the avatar"
    );
    while play.coordinator().gate().phase() == GatePhase::ShowingSlides {
        play.settle()?;
        play.act(|c| c.handle_input(InputAction::Confirm));
    }
    ensure!(
        play.coordinator().gate().phase() == GatePhase::InQuiz,
        "confirm on the last slide should start the quiz"
    );
    play.finish_quiz()?;

    play.act(|c| c.handle_input(InputAction::StepBack));
    play.settle()?;
    ensure!(
        play.coordinator().progression().car_node() == NodeId(0),
        "step back should return to node 0"
    );
    play.act(|c| c.handle_input(InputAction::StepForward));
    play.settle()?;
    ensure!(
        play.coordinator().progression().car_node() == NodeId(1),
        "step forward should reach node 1"
    );

    play.act(|c| c.handle_input(InputAction::Confirm));
    play.settle()?;
    play.act(|c| c.handle_input(InputAction::Cancel));
    ensure!(
        !play.coordinator().gate().is_open(),
        "cancel should close the lesson from its slides"
    );
    Ok(())
}

fn random_play_expectation(play: &mut Playthrough) -> Result<()> {
    let mut completed = 0;
    for _ in 0..RANDOM_PLAY_STEPS {
        play.random_action()?;
        let now = play.coordinator().progression().completed_count();
        ensure!(now >= completed, "completion went backwards");
        completed = now;
    }
    play.settle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::TesterAssets;
    use std::sync::Arc;

    #[test]
    fn every_scenario_passes_on_a_fixed_seed() {
        let assets = Arc::new(TesterAssets::load_default().unwrap());
        for scenario in catalog_scenarios() {
            let mut play = Playthrough::new(Arc::clone(&assets), 1337, 1.0 / 60.0).unwrap();
            if let Err(err) = (scenario.run)(&mut play) {
                panic!("{} failed: {err:#} ({})", scenario.key, play.describe());
            }
        }
    }
}
