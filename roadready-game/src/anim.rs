//! Frame-driven animation tasks.
//!
//! Every animation is a task advanced by `update(dt)` once per frame until it
//! reports [`TaskStatus::Done`]. Cancelling an animation means dropping its
//! task; no completion side effect ever runs for a dropped task.
use serde::{Deserialize, Serialize};

use crate::numbers::clamp_unit;

/// Outcome of advancing a task by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Done,
}

impl TaskStatus {
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Timing curves available to tweens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    #[default]
    SmoothStep,
    EaseInQuad,
    EaseOutQuad,
}

impl Easing {
    /// Map linear progress `x ∈ [0, 1]` onto the curve.
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        let x = clamp_unit(x);
        match self {
            Self::Linear => x,
            Self::SmoothStep => x * x * (3.0 - 2.0 * x),
            Self::EaseInQuad => x * x,
            Self::EaseOutQuad => x * (2.0 - x),
        }
    }
}

/// Anything the scheduler can drive.
pub trait AnimationTask {
    /// Advance by `dt` seconds.
    fn update(&mut self, dt: f32) -> TaskStatus;
}

/// Declarative interpolation from `start` to `end` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    start: f32,
    end: f32,
    duration: f32,
    elapsed: f32,
    easing: Easing,
}

impl Tween {
    #[must_use]
    pub fn new(start: f32, end: f32, duration: f32, easing: Easing) -> Self {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        Self {
            start,
            end,
            duration,
            elapsed: 0.0,
            easing,
        }
    }

    /// Linear progress through the tween in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= f32::EPSILON {
            1.0
        } else {
            clamp_unit(self.elapsed / self.duration)
        }
    }

    /// Eased progress in `[0, 1]`.
    #[must_use]
    pub fn eased(&self) -> f32 {
        self.easing.apply(self.progress())
    }

    /// Current interpolated value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.start + (self.end - self.start) * self.eased()
    }

    #[must_use]
    pub const fn start(&self) -> f32 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> f32 {
        self.end
    }

    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

impl AnimationTask for Tween {
    fn update(&mut self, dt: f32) -> TaskStatus {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed = (self.elapsed + dt).min(self.duration);
        }
        if self.is_finished() {
            TaskStatus::Done
        } else {
            TaskStatus::InProgress
        }
    }
}

/// Up-then-down scale pulse used when a node marker changes presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    tween: Tween,
    peak: f32,
}

impl Pulse {
    #[must_use]
    pub fn new(peak: f32, duration: f32) -> Self {
        Self {
            tween: Tween::new(0.0, 1.0, duration, Easing::Linear),
            peak,
        }
    }

    /// Scale at the current point of the pulse: 1 at both ends, `peak` midway.
    #[must_use]
    pub fn scale(&self) -> f32 {
        let x = self.tween.progress();
        let tri = 1.0 - (2.0 * x - 1.0).abs();
        1.0 + (self.peak - 1.0) * Easing::SmoothStep.apply(tri)
    }
}

impl AnimationTask for Pulse {
    fn update(&mut self, dt: f32) -> TaskStatus {
        self.tween.update(dt)
    }
}

/// Keyed set of running tasks. Starting a task under a key that is already
/// running replaces the old task outright.
#[derive(Debug, Clone)]
pub struct Scheduler<K, T> {
    tasks: Vec<(K, T)>,
}

impl<K: Copy + PartialEq, T: AnimationTask> Scheduler<K, T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Start `task` under `key`, superseding any task already running there.
    pub fn start(&mut self, key: K, task: T) {
        if let Some(slot) = self.tasks.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = task;
        } else {
            self.tasks.push((key, task));
        }
    }

    /// Drop the task under `key`. Returns whether one was running.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(k, _)| *k != key);
        before != self.tasks.len()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    #[must_use]
    pub fn get(&self, key: K) -> Option<&T> {
        self.tasks.iter().find(|(k, _)| *k == key).map(|(_, t)| t)
    }

    #[must_use]
    pub fn is_running(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Advance every task; finished tasks are removed and their keys returned
    /// in start order.
    pub fn tick(&mut self, dt: f32) -> Vec<K> {
        let mut finished = Vec::new();
        self.tasks.retain_mut(|(key, task)| {
            if task.update(dt).is_done() {
                finished.push(*key);
                false
            } else {
                true
            }
        });
        finished
    }
}

impl<K: Copy + PartialEq, T: AnimationTask> Default for Scheduler<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothstep_is_symmetric_and_bounded() {
        let e = Easing::SmoothStep;
        assert!(e.apply(0.0).abs() < f32::EPSILON);
        assert!((e.apply(1.0) - 1.0).abs() < f32::EPSILON);
        assert!((e.apply(0.5) - 0.5).abs() < f32::EPSILON);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-6);
        assert!((e.apply(4.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn tween_reaches_end_value() {
        let mut tween = Tween::new(10.0, 20.0, 1.0, Easing::Linear);
        assert_eq!(tween.update(0.5), TaskStatus::InProgress);
        assert!((tween.value() - 15.0).abs() < 1e-5);
        assert_eq!(tween.update(0.75), TaskStatus::Done);
        assert!((tween.value() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_duration_tween_finishes_immediately() {
        let mut tween = Tween::new(0.0, 1.0, 0.0, Easing::SmoothStep);
        assert!((tween.value() - 1.0).abs() < f32::EPSILON);
        assert_eq!(tween.update(0.0), TaskStatus::Done);
    }

    #[test]
    fn pulse_peaks_midway_and_settles() {
        let mut pulse = Pulse::new(1.5, 1.0);
        assert!((pulse.scale() - 1.0).abs() < f32::EPSILON);
        pulse.update(0.5);
        assert!((pulse.scale() - 1.5).abs() < 1e-5);
        assert_eq!(pulse.update(0.5), TaskStatus::Done);
        assert!((pulse.scale() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn scheduler_supersedes_and_cancels() {
        let mut scheduler: Scheduler<u8, Tween> = Scheduler::new();
        scheduler.start(1, Tween::new(0.0, 1.0, 1.0, Easing::Linear));
        scheduler.start(2, Tween::new(0.0, 1.0, 0.1, Easing::Linear));
        scheduler.tick(0.5);
        scheduler.start(1, Tween::new(0.0, 1.0, 1.0, Easing::Linear));
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.get(1).unwrap().progress() < f32::EPSILON);
        assert_eq!(scheduler.tick(0.9), Vec::<u8>::new());
        assert_eq!(scheduler.tick(0.2), vec![1]);
        scheduler.start(3, Tween::new(0.0, 1.0, 1.0, Easing::Linear));
        assert!(scheduler.cancel(3));
        assert!(!scheduler.cancel(3));
        assert!(scheduler.is_empty());
    }
}
