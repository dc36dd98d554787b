//! Node markers: where each node sits on the road and how it is presented.
//!
//! The registry knows nothing about unlock rules. It resolves positions,
//! reports clicks, and animates presentation changes it is told about.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::anim::{Pulse, Scheduler};
use crate::events::Outbox;
use crate::path::{PathCurve, PathError, PathStop, Vec2};
use crate::progression::{NodeId, NodeStatus};

/// Visual state of a node marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    Locked,
    Active,
    Completed,
}

/// Decides how a node looks for a given status and avatar occupancy.
pub trait PresentationStrategy: fmt::Debug {
    fn presentation(&self, status: NodeStatus, occupied: bool) -> Presentation;

    /// Whether switching between two presentations plays the scale pulse.
    fn pulses(&self, from: Presentation, to: Presentation) -> bool {
        from != to
    }
}

/// Locked nodes look locked, the occupied node and the frontier look active,
/// and every other completed node looks completed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPresentation;

impl PresentationStrategy for StandardPresentation {
    fn presentation(&self, status: NodeStatus, occupied: bool) -> Presentation {
        match status {
            NodeStatus::Locked => Presentation::Locked,
            NodeStatus::Unlocked => Presentation::Active,
            NodeStatus::Completed if occupied => Presentation::Active,
            NodeStatus::Completed => Presentation::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("course has {markers} node markers but {stops} path stops")]
    CountMismatch { markers: usize, stops: usize },
    #[error("stop for {node} at t={t} lies outside [0, 1]")]
    StopOutOfRange { node: NodeId, t: f32 },
    #[error("stop {index} belongs to {node}; stops must be listed in node order")]
    StopOrder { index: usize, node: NodeId },
    #[error("stop for {node} at t={t} comes before the previous node's stop")]
    StopBehind { node: NodeId, t: f32 },
    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    NodeClicked { node: NodeId },
}

/// Marker for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeVisual {
    pub stop: PathStop,
    pub position: Vec2,
    pub presentation: Presentation,
}

/// Positions and marker visuals for every node on the road.
#[derive(Debug)]
pub struct NodeRegistry {
    path: Option<PathCurve>,
    visuals: Vec<NodeVisual>,
    pulses: Scheduler<NodeId, Pulse>,
    strategy: Box<dyn PresentationStrategy>,
    pulse_scale: f32,
    pulse_secs: f32,
    hit_radius: f32,
    events: Outbox<RegistryEvent>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new(pulse_scale: f32, pulse_secs: f32, hit_radius: f32) -> Self {
        Self::with_strategy(
            Box::new(StandardPresentation),
            pulse_scale,
            pulse_secs,
            hit_radius,
        )
    }

    #[must_use]
    pub fn with_strategy(
        strategy: Box<dyn PresentationStrategy>,
        pulse_scale: f32,
        pulse_secs: f32,
        hit_radius: f32,
    ) -> Self {
        Self {
            path: None,
            visuals: Vec::new(),
            pulses: Scheduler::new(),
            strategy,
            pulse_scale,
            pulse_secs,
            hit_radius,
            events: Outbox::new(),
        }
    }

    /// (Re)build every marker from the road and its stops.
    ///
    /// On error the registry is left empty so no stale marker survives.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` when the stop list does not match the marker
    /// count, is out of node order, or places a stop off the road.
    pub fn initialize(
        &mut self,
        path: PathCurve,
        stops: &[PathStop],
        marker_count: usize,
    ) -> Result<(), RegistryError> {
        self.path = None;
        self.visuals.clear();
        self.pulses.clear();
        self.events.clear();

        if stops.len() != marker_count || stops.is_empty() {
            return Err(RegistryError::CountMismatch {
                markers: marker_count,
                stops: stops.len(),
            });
        }
        let mut previous_t = 0.0_f32;
        for (index, stop) in stops.iter().enumerate() {
            if stop.node.index() != index {
                return Err(RegistryError::StopOrder {
                    index,
                    node: stop.node,
                });
            }
            if !(0.0..=1.0).contains(&stop.t) {
                return Err(RegistryError::StopOutOfRange {
                    node: stop.node,
                    t: stop.t,
                });
            }
            if stop.t < previous_t {
                return Err(RegistryError::StopBehind {
                    node: stop.node,
                    t: stop.t,
                });
            }
            previous_t = stop.t;
        }

        self.visuals = stops
            .iter()
            .map(|stop| NodeVisual {
                stop: *stop,
                position: path.point_at(stop.t),
                presentation: Presentation::Locked,
            })
            .collect();
        self.path = Some(path);
        log::debug!("registry initialized with {} markers", self.visuals.len());
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.path.is_some()
    }

    #[must_use]
    pub const fn path(&self) -> Option<&PathCurve> {
        self.path.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    #[must_use]
    pub fn visual(&self, id: NodeId) -> Option<&NodeVisual> {
        self.visuals.get(id.index())
    }

    #[must_use]
    pub fn visuals(&self) -> &[NodeVisual] {
        &self.visuals
    }

    #[must_use]
    pub fn stop(&self, id: NodeId) -> Option<PathStop> {
        self.visual(id).map(|v| v.stop)
    }

    /// Curve parameter of the node's stop.
    #[must_use]
    pub fn param(&self, id: NodeId) -> Option<f32> {
        self.stop(id).map(|s| s.t)
    }

    /// World position of the node's marker.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<Vec2> {
        let path = self.path.as_ref()?;
        self.stop(id).map(|s| path.point_at(s.t))
    }

    /// Current marker scale; 1 at rest, larger while pulsing.
    #[must_use]
    pub fn scale(&self, id: NodeId) -> f32 {
        self.pulses.get(id).map_or(1.0, Pulse::scale)
    }

    #[must_use]
    pub fn is_pulsing(&self, id: NodeId) -> bool {
        self.pulses.is_running(id)
    }

    /// Resolve and apply the presentation for a node.
    ///
    /// With `animate` the change plays the scale pulse; without it the marker
    /// snaps (used when the screen is first built). Returns whether the
    /// presentation changed.
    pub fn refresh(&mut self, id: NodeId, status: NodeStatus, occupied: bool, animate: bool) -> bool {
        let target = self.strategy.presentation(status, occupied);
        let Some(visual) = self.visuals.get_mut(id.index()) else {
            return false;
        };
        let from = visual.presentation;
        if from == target {
            return false;
        }
        visual.presentation = target;
        if animate && self.strategy.pulses(from, target) {
            self.pulses
                .start(id, Pulse::new(self.pulse_scale, self.pulse_secs));
        }
        log::debug!("{id} presentation {from:?} -> {target:?}");
        true
    }

    /// Report a click on a node marker.
    pub fn click(&mut self, id: NodeId) -> bool {
        if self.visual(id).is_none() {
            return false;
        }
        self.events.push(RegistryEvent::NodeClicked { node: id });
        true
    }

    /// Nearest node whose marker lies within the hit radius of `point`.
    #[must_use]
    pub fn hit_test(&self, point: Vec2) -> Option<NodeId> {
        self.visuals
            .iter()
            .map(|v| (v.stop.node, v.position.distance(point)))
            .filter(|(_, d)| *d <= self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(node, _)| node)
    }

    /// Click whatever marker sits under `point`.
    pub fn click_at(&mut self, point: Vec2) -> Option<NodeId> {
        let hit = self.hit_test(point)?;
        self.click(hit);
        Some(hit)
    }

    /// Advance marker pulses.
    pub fn tick(&mut self, dt: f32) {
        self.pulses.tick(dt);
    }

    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road() -> PathCurve {
        PathCurve::new(vec![Vec2::new(0.0, 0.0), Vec2::new(300.0, 0.0)], 64).unwrap()
    }

    fn stops() -> Vec<PathStop> {
        vec![
            PathStop::new(NodeId(0), 0.0),
            PathStop::new(NodeId(1), 0.5),
            PathStop::new(NodeId(2), 1.0),
        ]
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new(1.25, 0.3, 20.0);
        registry.initialize(road(), &stops(), 3).unwrap();
        registry
    }

    #[test]
    fn mismatched_counts_are_rejected_and_leave_registry_empty() {
        let mut registry = registry();
        let err = registry.initialize(road(), &stops(), 4).unwrap_err();
        assert_eq!(
            err,
            RegistryError::CountMismatch {
                markers: 4,
                stops: 3
            }
        );
        assert!(registry.is_empty());
        assert!(registry.position(NodeId(0)).is_none());
    }

    #[test]
    fn stops_must_be_ordered_and_on_the_road() {
        let mut registry = NodeRegistry::new(1.25, 0.3, 20.0);
        let mut bad = stops();
        bad[1].t = 1.5;
        assert!(matches!(
            registry.initialize(road(), &bad, 3),
            Err(RegistryError::StopOutOfRange { .. })
        ));
        let mut swapped = stops();
        swapped.swap(0, 1);
        assert!(matches!(
            registry.initialize(road(), &swapped, 3),
            Err(RegistryError::StopOrder { index: 0, .. })
        ));
        let mut behind = stops();
        behind[2].t = 0.2;
        assert!(matches!(
            registry.initialize(road(), &behind, 3),
            Err(RegistryError::StopBehind { .. })
        ));
    }

    #[test]
    fn positions_are_stable_and_follow_the_road() {
        let registry = registry();
        let first = registry.position(NodeId(1)).unwrap();
        assert_eq!(registry.position(NodeId(1)), Some(first));
        assert!((first.x - 150.0).abs() < 1e-2);
        assert!(registry.position(NodeId(9)).is_none());
    }

    #[test]
    fn clicks_raise_events_without_unlock_checks() {
        let mut registry = registry();
        assert!(registry.click(NodeId(2)));
        assert!(!registry.click(NodeId(7)));
        assert_eq!(registry.click_at(Vec2::new(152.0, 5.0)), Some(NodeId(1)));
        assert_eq!(registry.click_at(Vec2::new(80.0, 80.0)), None);
        assert_eq!(
            registry.drain_events(),
            vec![
                RegistryEvent::NodeClicked { node: NodeId(2) },
                RegistryEvent::NodeClicked { node: NodeId(1) },
            ]
        );
    }

    #[test]
    fn presentation_changes_pulse_only_when_animated() {
        let mut registry = registry();
        assert!(registry.refresh(NodeId(0), NodeStatus::Unlocked, true, false));
        assert!(!registry.is_pulsing(NodeId(0)));
        assert!(registry.refresh(NodeId(0), NodeStatus::Completed, false, true));
        assert!(registry.is_pulsing(NodeId(0)));
        assert_eq!(
            registry.visual(NodeId(0)).unwrap().presentation,
            Presentation::Completed
        );
        registry.tick(0.15);
        assert!(registry.scale(NodeId(0)) > 1.2);
        registry.tick(0.2);
        assert!(!registry.is_pulsing(NodeId(0)));
        assert!((registry.scale(NodeId(0)) - 1.0).abs() < f32::EPSILON);
        assert!(!registry.refresh(NodeId(0), NodeStatus::Completed, false, true));
    }

    #[test]
    fn completed_node_stays_completed_when_vacated() {
        let style = StandardPresentation;
        assert_eq!(
            style.presentation(NodeStatus::Completed, true),
            Presentation::Active
        );
        assert_eq!(
            style.presentation(NodeStatus::Completed, false),
            Presentation::Completed
        );
        assert_eq!(
            style.presentation(NodeStatus::Locked, true),
            Presentation::Locked
        );
    }
}
