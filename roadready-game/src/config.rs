//! Tunable timings and sizes for the course map screen.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_ARC_SAMPLES, DEFAULT_AVATAR_SPEED, DEFAULT_HIT_RADIUS, DEFAULT_MAX_TRAVEL_SECS,
    DEFAULT_MIN_TRAVEL_SECS, DEFAULT_POPUP_CLOSE_SECS, DEFAULT_PULSE_SCALE, DEFAULT_PULSE_SECS,
    DEFAULT_SLIDE_TRANSITION_SECS, DEFAULT_WHEEL_RADIUS, MAX_ARC_SAMPLES, MAX_PULSE_SCALE,
    MIN_ARC_SAMPLES,
};

/// Errors raised when course configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero (got {value:.3})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("travel minimum {min:.2}s exceeds maximum {max:.2}s")]
    TravelMinExceedsMax { min: f32, max: f32 },
    #[error("arc_samples must be between {min} and {max} (got {value})")]
    ArcSamples { min: usize, max: usize, value: usize },
}

/// Screen tuning. Every field falls back to its default when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Path units per second.
    #[serde(default = "CourseConfig::default_avatar_speed")]
    pub avatar_speed: f32,
    #[serde(default = "CourseConfig::default_min_travel_secs")]
    pub min_travel_secs: f32,
    #[serde(default = "CourseConfig::default_max_travel_secs")]
    pub max_travel_secs: f32,
    #[serde(default = "CourseConfig::default_slide_transition_secs")]
    pub slide_transition_secs: f32,
    #[serde(default = "CourseConfig::default_popup_close_secs")]
    pub popup_close_secs: f32,
    #[serde(default = "CourseConfig::default_pulse_secs")]
    pub pulse_secs: f32,
    #[serde(default = "CourseConfig::default_pulse_scale")]
    pub pulse_scale: f32,
    /// Click radius around a node marker, in path units.
    #[serde(default = "CourseConfig::default_hit_radius")]
    pub hit_radius: f32,
    #[serde(default = "CourseConfig::default_wheel_radius")]
    pub wheel_radius: f32,
    #[serde(default = "CourseConfig::default_arc_samples")]
    pub arc_samples: usize,
}

impl CourseConfig {
    const fn default_avatar_speed() -> f32 {
        DEFAULT_AVATAR_SPEED
    }

    const fn default_min_travel_secs() -> f32 {
        DEFAULT_MIN_TRAVEL_SECS
    }

    const fn default_max_travel_secs() -> f32 {
        DEFAULT_MAX_TRAVEL_SECS
    }

    const fn default_slide_transition_secs() -> f32 {
        DEFAULT_SLIDE_TRANSITION_SECS
    }

    const fn default_popup_close_secs() -> f32 {
        DEFAULT_POPUP_CLOSE_SECS
    }

    const fn default_pulse_secs() -> f32 {
        DEFAULT_PULSE_SECS
    }

    const fn default_pulse_scale() -> f32 {
        DEFAULT_PULSE_SCALE
    }

    const fn default_hit_radius() -> f32 {
        DEFAULT_HIT_RADIUS
    }

    const fn default_wheel_radius() -> f32 {
        DEFAULT_WHEEL_RADIUS
    }

    const fn default_arc_samples() -> usize {
        DEFAULT_ARC_SAMPLES
    }

    /// Parse a config document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the tuning values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::positive("avatar_speed", self.avatar_speed)?;
        Self::positive("max_travel_secs", self.max_travel_secs)?;
        Self::positive("wheel_radius", self.wheel_radius)?;
        Self::positive("hit_radius", self.hit_radius)?;
        Self::non_negative("min_travel_secs", self.min_travel_secs)?;
        Self::non_negative("slide_transition_secs", self.slide_transition_secs)?;
        Self::non_negative("popup_close_secs", self.popup_close_secs)?;
        Self::non_negative("pulse_secs", self.pulse_secs)?;
        if self.min_travel_secs > self.max_travel_secs {
            return Err(ConfigError::TravelMinExceedsMax {
                min: self.min_travel_secs,
                max: self.max_travel_secs,
            });
        }
        if !(1.0..=MAX_PULSE_SCALE).contains(&self.pulse_scale) {
            return Err(ConfigError::RangeViolation {
                field: "pulse_scale",
                min: 1.0,
                max: MAX_PULSE_SCALE,
                value: self.pulse_scale,
            });
        }
        if !(MIN_ARC_SAMPLES..=MAX_ARC_SAMPLES).contains(&self.arc_samples) {
            return Err(ConfigError::ArcSamples {
                min: MIN_ARC_SAMPLES,
                max: MAX_ARC_SAMPLES,
                value: self.arc_samples,
            });
        }
        Ok(())
    }

    fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NotPositive { field, value })
        }
    }

    fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::RangeViolation {
                field,
                min: 0.0,
                max: f32::MAX,
                value,
            })
        }
    }
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            avatar_speed: Self::default_avatar_speed(),
            min_travel_secs: Self::default_min_travel_secs(),
            max_travel_secs: Self::default_max_travel_secs(),
            slide_transition_secs: Self::default_slide_transition_secs(),
            popup_close_secs: Self::default_popup_close_secs(),
            pulse_secs: Self::default_pulse_secs(),
            pulse_scale: Self::default_pulse_scale(),
            hit_radius: Self::default_hit_radius(),
            wheel_radius: Self::default_wheel_radius(),
            arc_samples: Self::default_arc_samples(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(CourseConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CourseConfig::from_json(r#"{ "avatar_speed": 120.0 }"#).unwrap();
        assert!((cfg.avatar_speed - 120.0).abs() < f32::EPSILON);
        assert_eq!(cfg.arc_samples, DEFAULT_ARC_SAMPLES);
    }

    #[test]
    fn validation_names_the_offending_field() {
        let cfg = CourseConfig {
            avatar_speed: 0.0,
            ..CourseConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                field: "avatar_speed",
                value: 0.0
            })
        );

        let cfg = CourseConfig {
            min_travel_secs: 9.0,
            max_travel_secs: 2.0,
            ..CourseConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::TravelMinExceedsMax { .. })
        ));

        let cfg = CourseConfig {
            arc_samples: 2,
            ..CourseConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ArcSamples { .. })));
    }
}
