//! Centralized tuning constants and persistence keys for the course map.
//!
//! Defaults for every `CourseConfig` field live here so that the JSON config
//! may omit any of them, and so the save layout is spelled out in one place.

// Persistence keys ---------------------------------------------------------
pub(crate) const KEY_CAR_NODE: &str = "progress.car_node";
pub(crate) const KEY_ACTIVE_NODE: &str = "progress.active_node";
pub(crate) const KEY_NODE_PREFIX: &str = "progress.node.";
pub(crate) const KEY_UNLOCKED_SUFFIX: &str = ".unlocked";
pub(crate) const KEY_COMPLETED_SUFFIX: &str = ".completed";

// Avatar travel -------------------------------------------------------------
/// Path units travelled per second at cruising speed.
pub(crate) const DEFAULT_AVATAR_SPEED: f32 = 240.0;
pub(crate) const DEFAULT_MIN_TRAVEL_SECS: f32 = 0.35;
pub(crate) const DEFAULT_MAX_TRAVEL_SECS: f32 = 6.0;
pub(crate) const DEFAULT_WHEEL_RADIUS: f32 = 9.0;
pub(crate) const DEFAULT_ARC_SAMPLES: usize = 256;
pub(crate) const MIN_ARC_SAMPLES: usize = 8;
pub(crate) const MAX_ARC_SAMPLES: usize = 8_192;

// Popup & slides -------------------------------------------------------------
pub(crate) const DEFAULT_SLIDE_TRANSITION_SECS: f32 = 0.25;
pub(crate) const DEFAULT_POPUP_CLOSE_SECS: f32 = 0.4;

// Node markers ----------------------------------------------------------------
pub(crate) const DEFAULT_PULSE_SECS: f32 = 0.3;
pub(crate) const DEFAULT_PULSE_SCALE: f32 = 1.25;
pub(crate) const DEFAULT_HIT_RADIUS: f32 = 32.0;
pub(crate) const MAX_PULSE_SCALE: f32 = 4.0;

/// Longest single frame the controllers will integrate; larger deltas (tab
/// switches, debugger pauses) are clamped so animations never skip states.
pub(crate) const MAX_FRAME_DELTA_SECS: f32 = 0.25;
