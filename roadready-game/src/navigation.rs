//! Avatar travel between node markers.
//!
//! Travel runs at constant speed along the road's arc length with a
//! smoothstep ease at both ends. At most one leg is ever in flight: a new
//! request drops the current leg on the spot and departs from wherever the
//! avatar is.
use serde::{Deserialize, Serialize};

use crate::anim::{AnimationTask, Easing, Tween};
use crate::config::CourseConfig;
use crate::events::Outbox;
use crate::numbers::frame_delta;
use crate::path::{PathCurve, Vec2};
use crate::progression::{NodeId, ProgressionState};
use crate::registry::NodeRegistry;
use crate::store::PersistentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDirection {
    Forward,
    Backward,
}

impl TravelDirection {
    /// Sign applied to wheel spin.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }
}

/// Why a movement request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejection {
    /// No marker exists for the node.
    UnknownNode,
    /// The node is still locked.
    Locked,
    /// Moving forward needs the occupied node to be completed first.
    ForwardBlocked { current: NodeId },
    /// The avatar is already parked on the node.
    AlreadyThere,
}

impl MoveRejection {
    /// Whether the player should get negative feedback for this refusal.
    #[must_use]
    pub const fn wants_feedback(self) -> bool {
        !matches!(self, Self::AlreadyThere)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationEvent {
    Departed {
        target: NodeId,
        direction: TravelDirection,
        /// The leg this departure replaced, if one was in flight.
        superseded: Option<NodeId>,
    },
    Arrived {
        node: NodeId,
    },
    Rejected {
        target: NodeId,
        reason: MoveRejection,
    },
}

/// Where the avatar is and how it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Avatar {
    /// Curve parameter of the avatar.
    pub t: f32,
    pub position: Vec2,
    /// Radians, following the road tangent.
    pub heading: f32,
    /// Accumulated wheel rotation in radians; decreases while reversing.
    pub wheel_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Travel {
    target: NodeId,
    from_distance: f32,
    to_distance: f32,
    clock: Tween,
    direction: TravelDirection,
}

impl Travel {
    fn distance_now(&self) -> f32 {
        self.from_distance + (self.to_distance - self.from_distance) * self.clock.eased()
    }
}

#[derive(Debug)]
pub struct NavigationController {
    avatar: Avatar,
    travel: Option<Travel>,
    speed: f32,
    min_secs: f32,
    max_secs: f32,
    wheel_radius: f32,
    events: Outbox<NavigationEvent>,
}

impl NavigationController {
    #[must_use]
    pub fn new(config: &CourseConfig) -> Self {
        Self {
            avatar: Avatar::default(),
            travel: None,
            speed: config.avatar_speed,
            min_secs: config.min_travel_secs,
            max_secs: config.max_travel_secs,
            wheel_radius: config.wheel_radius,
            events: Outbox::new(),
        }
    }

    #[must_use]
    pub const fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.travel.is_some()
    }

    /// Node of the leg in flight.
    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        self.travel.map(|leg| leg.target)
    }

    #[must_use]
    pub fn direction(&self) -> Option<TravelDirection> {
        self.travel.map(|leg| leg.direction)
    }

    /// Place the avatar on a node instantly, dropping any leg in flight.
    pub fn snap_to(&mut self, node: NodeId, registry: &NodeRegistry) -> bool {
        let (Some(path), Some(t)) = (registry.path(), registry.param(node)) else {
            return false;
        };
        self.travel = None;
        self.place(path, t);
        true
    }

    /// Screen entry: park on the saved car node, then catch up to the frontier.
    pub fn enter<S: PersistentStore>(
        &mut self,
        progression: &ProgressionState<S>,
        registry: &NodeRegistry,
    ) {
        let car = progression.car_node();
        if !self.snap_to(car, registry) {
            log::error!("cannot place avatar on {car}: registry has no marker for it");
            return;
        }
        let active = progression.active_node();
        if car != active {
            log::debug!("avatar parked on {car}; catching up to {active}");
            let _ = self.move_to_node(active, progression, registry);
        }
    }

    /// Start travelling to `target`, replacing any leg in flight.
    ///
    /// # Errors
    ///
    /// Returns the `MoveRejection` when the node is unknown, locked, not
    /// reachable forward from the occupied node, or already occupied. A
    /// rejection event is queued as well.
    pub fn move_to_node<S: PersistentStore>(
        &mut self,
        target: NodeId,
        progression: &ProgressionState<S>,
        registry: &NodeRegistry,
    ) -> Result<(), MoveRejection> {
        if let Err(reason) = self.check_reachable(target, progression, registry) {
            return Err(self.reject(target, reason));
        }
        let (Some(path), Some(target_t)) = (registry.path(), registry.param(target)) else {
            return Err(self.reject(target, MoveRejection::UnknownNode));
        };

        let from_distance = path.distance_at(self.avatar.t);
        let to_distance = path.distance_at(target_t);
        let span = (to_distance - from_distance).abs();
        let duration = if span <= f32::EPSILON {
            0.0
        } else {
            self.travel_secs(span)
        };
        let direction = if to_distance >= from_distance {
            TravelDirection::Forward
        } else {
            TravelDirection::Backward
        };
        let superseded = self.travel.take().map(|leg| leg.target);
        if let Some(old) = superseded {
            log::debug!("leg to {old} superseded by {target}");
        }
        self.travel = Some(Travel {
            target,
            from_distance,
            to_distance,
            clock: Tween::new(0.0, 1.0, duration, Easing::SmoothStep),
            direction,
        });
        self.events.push(NavigationEvent::Departed {
            target,
            direction,
            superseded,
        });
        Ok(())
    }

    /// Leg duration for `span` path units, bounded by the configured minimum
    /// and maximum. Bounds that are inverted, negative or non-finite degrade
    /// to the nearest usable value instead of failing.
    fn travel_secs(&self, span: f32) -> f32 {
        let min = if self.min_secs.is_finite() {
            self.min_secs.max(0.0)
        } else {
            0.0
        };
        let max = if self.max_secs.is_finite() {
            self.max_secs.max(min)
        } else {
            min
        };
        let raw = span / self.speed;
        if raw.is_finite() && raw > 0.0 {
            raw.max(min).min(max)
        } else {
            max
        }
    }

    fn reject(&mut self, target: NodeId, reason: MoveRejection) -> MoveRejection {
        log::debug!("move to {target} rejected: {reason:?}");
        self.events
            .push(NavigationEvent::Rejected { target, reason });
        reason
    }

    fn check_reachable<S: PersistentStore>(
        &self,
        target: NodeId,
        progression: &ProgressionState<S>,
        registry: &NodeRegistry,
    ) -> Result<(), MoveRejection> {
        if registry.param(target).is_none() || !progression.contains(target) {
            return Err(MoveRejection::UnknownNode);
        }
        if !progression.is_unlocked(target) {
            return Err(MoveRejection::Locked);
        }
        let current = progression.car_node();
        if target > current && !progression.is_completed(current) {
            return Err(MoveRejection::ForwardBlocked { current });
        }
        if self.travel.is_none() && target == current {
            return Err(MoveRejection::AlreadyThere);
        }
        Ok(())
    }

    /// Drop the leg in flight without any arrival side effects.
    pub fn cancel(&mut self) -> bool {
        self.travel.take().is_some()
    }

    /// Advance the leg in flight by one frame.
    ///
    /// On arrival the car node is recorded and `Arrived` is queued; marker
    /// presentation is left to whoever drains the event. Returns the node
    /// reached.
    pub fn tick<S: PersistentStore>(
        &mut self,
        dt: f32,
        progression: &mut ProgressionState<S>,
        registry: &NodeRegistry,
    ) -> Option<NodeId> {
        let mut leg = self.travel?;
        let Some(path) = registry.path() else {
            log::warn!("registry lost its road mid-travel; dropping leg to {}", leg.target);
            self.travel = None;
            return None;
        };

        let status = leg.clock.update(frame_delta(dt));
        let before = path.distance_at(self.avatar.t);
        let distance = leg.distance_now();
        let t = path.t_at_distance(distance);
        self.place(path, t);
        self.spin_wheels(distance - before);

        if !status.is_done() {
            self.travel = Some(leg);
            return None;
        }

        self.travel = None;
        let target = leg.target;
        if let Some(stop_t) = registry.param(target) {
            self.place(path, stop_t);
        }
        progression.set_car_node(target);
        log::info!("avatar arrived at {target}");
        self.events.push(NavigationEvent::Arrived { node: target });
        Some(target)
    }

    fn place(&mut self, path: &PathCurve, t: f32) {
        self.avatar.t = t;
        self.avatar.position = path.point_at(t);
        self.avatar.heading = path.tangent_at(t).angle();
    }

    fn spin_wheels(&mut self, travelled: f32) {
        if self.wheel_radius > f32::EPSILON {
            self.avatar.wheel_angle += travelled / self.wheel_radius;
        }
    }

    pub fn drain_events(&mut self) -> Vec<NavigationEvent> {
        self.events.drain()
    }
}
