//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

use crate::constants::MAX_FRAME_DELTA_SECS;

/// Convert a count or index to f32, saturating at `f32::MAX` for absurd values.
#[must_use]
pub fn usize_to_f32(value: usize) -> f32 {
    cast::<usize, f32>(value).unwrap_or(f32::MAX)
}

/// Floor a non-negative f32 to an index, returning 0 for NaN or negative values.
#[must_use]
pub fn floor_f32_to_usize(value: f32) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f32, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Clamp a value into `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Sanitize a frame delta: negative or non-finite deltas become zero and
/// oversized ones are clamped.
#[must_use]
pub fn frame_delta(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(MAX_FRAME_DELTA_SECS)
}

/// Convert a persisted integer to an index, rejecting negatives.
#[must_use]
pub fn i64_to_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}
