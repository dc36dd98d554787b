//! Course road geometry: a Catmull-Rom curve with an arc-length table.
//!
//! Nodes sit at parametric stops `t ∈ [0, 1]`, but the avatar travels at
//! constant speed along the road, so every conversion between parameter space
//! and distance goes through the sampled arc-length table.
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};
use thiserror::Error;

use crate::constants::{MAX_ARC_SAMPLES, MIN_ARC_SAMPLES};
use crate::numbers::{clamp_unit, floor_f32_to_usize, usize_to_f32};
use crate::progression::NodeId;

/// Where a node sits along the road, as a curve parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStop {
    pub node: NodeId,
    pub t: f32,
}

impl PathStop {
    #[must_use]
    pub const fn new(node: NodeId, t: f32) -> Self {
        Self { node, t }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len > f32::EPSILON && len.is_finite() {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    /// Heading in radians, counter-clockwise from +x.
    #[must_use]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("path needs at least 2 control points (got {count})")]
    TooFewPoints { count: usize },
    #[error("control point {index} is not finite")]
    NonFinitePoint { index: usize },
}

/// Smooth road through a list of control points.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCurve {
    points: Vec<Vec2>,
    /// Cumulative length at `i / samples` for `i in 0..=samples`.
    arc: Vec<f32>,
    samples: usize,
}

impl PathCurve {
    /// Build a curve and its arc-length table.
    ///
    /// # Errors
    ///
    /// Returns `PathError` when fewer than two points are given or any point
    /// is non-finite.
    pub fn new(points: Vec<Vec2>, samples: usize) -> Result<Self, PathError> {
        if points.len() < 2 {
            return Err(PathError::TooFewPoints {
                count: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(PathError::NonFinitePoint { index });
        }
        let samples = samples.clamp(MIN_ARC_SAMPLES, MAX_ARC_SAMPLES);
        let mut curve = Self {
            points,
            arc: Vec::with_capacity(samples + 1),
            samples,
        };
        curve.arc = curve.build_arc_table();
        Ok(curve)
    }

    fn build_arc_table(&self) -> Vec<f32> {
        let mut arc = Vec::with_capacity(self.samples + 1);
        let mut total = 0.0;
        let mut prev = self.point_at(0.0);
        arc.push(0.0);
        for i in 1..=self.samples {
            let point = self.point_at(usize_to_f32(i) / usize_to_f32(self.samples));
            total += point.distance(prev);
            arc.push(total);
            prev = point;
        }
        arc
    }

    #[must_use]
    pub fn control_points(&self) -> &[Vec2] {
        &self.points
    }

    /// Total road length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.arc.last().copied().unwrap_or(0.0)
    }

    fn segment(&self, t: f32) -> (usize, f32) {
        let segments = self.points.len() - 1;
        let scaled = clamp_unit(t) * usize_to_f32(segments);
        let seg = floor_f32_to_usize(scaled).min(segments - 1);
        (seg, scaled - usize_to_f32(seg))
    }

    fn control(&self, seg: usize) -> [Vec2; 4] {
        let last = self.points.len() - 1;
        let p1 = self.points[seg];
        let p2 = self.points[(seg + 1).min(last)];
        let p0 = if seg == 0 { p1 } else { self.points[seg - 1] };
        let p3 = if seg + 2 > last {
            p2
        } else {
            self.points[seg + 2]
        };
        [p0, p1, p2, p3]
    }

    /// Point on the curve at parameter `t` (clamped into `[0, 1]`).
    #[must_use]
    pub fn point_at(&self, t: f32) -> Vec2 {
        let (seg, u) = self.segment(t);
        let [p0, p1, p2, p3] = self.control(seg);
        let u2 = u * u;
        let u3 = u2 * u;
        let a = p1 * 2.0;
        let b = (p2 - p0) * u;
        let c = (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * u2;
        let d = (p1 * 3.0 - p0 - p2 * 3.0 + p3) * u3;
        (a + b + c + d) * 0.5
    }

    /// Unit direction of travel at `t`, falling back to the chord direction on
    /// degenerate spans.
    #[must_use]
    pub fn tangent_at(&self, t: f32) -> Vec2 {
        let (seg, u) = self.segment(t);
        let [p0, p1, p2, p3] = self.control(seg);
        let b = p2 - p0;
        let c = (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * (2.0 * u);
        let d = (p1 * 3.0 - p0 - p2 * 3.0 + p3) * (3.0 * u * u);
        ((b + c + d) * 0.5)
            .normalized()
            .or_else(|| (p2 - p1).normalized())
            .unwrap_or(Vec2::RIGHT)
    }

    /// Distance travelled along the road from `t = 0` to `t`.
    #[must_use]
    pub fn distance_at(&self, t: f32) -> f32 {
        let scaled = clamp_unit(t) * usize_to_f32(self.samples);
        let lo = floor_f32_to_usize(scaled).min(self.samples - 1);
        let frac = scaled - usize_to_f32(lo);
        self.arc[lo] + (self.arc[lo + 1] - self.arc[lo]) * frac
    }

    /// Parameter at which the road has covered `distance` (clamped to the
    /// road's length).
    #[must_use]
    pub fn t_at_distance(&self, distance: f32) -> f32 {
        let total = self.length();
        if total <= f32::EPSILON || distance.is_nan() {
            return 0.0;
        }
        let d = distance.clamp(0.0, total);
        let hi = self.arc.partition_point(|&c| c < d).min(self.samples);
        if hi == 0 {
            return 0.0;
        }
        let lo = hi - 1;
        let span = self.arc[hi] - self.arc[lo];
        let frac = if span > f32::EPSILON {
            (d - self.arc[lo]) / span
        } else {
            0.0
        };
        clamp_unit((usize_to_f32(lo) + frac) / usize_to_f32(self.samples))
    }
}
