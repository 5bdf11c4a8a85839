//! Two-mode thermal approximation used when no physical probe exists.
//!
//! Forced heating/cooling drives the temperature toward the target in
//! banded steps while the system is active; passive cooling decays
//! toward room temperature while it is not. Both modes draw small
//! uniform jitter so traces look like a real oven rather than a ramp.

use rand::Rng;

/// Ambient temperature floor (°C).
pub const ROOM_TEMP_C: f32 = 25.0;

/// Band half-width around the target where stepping slows down (°C).
const NEAR_BAND_C: f32 = 5.0;

/// Advances the simulated temperature one tick toward `target`.
pub fn next_temp(target: f32, current: f32) -> f32 {
    let mut rng = rand::rng();

    let delta = if current < target - NEAR_BAND_C {
        2.0 + rng.random_range(0.0..1.0)
    } else if current < target {
        0.5 + rng.random_range(0.0..0.5)
    } else if current > target + NEAR_BAND_C {
        -(1.0 + rng.random_range(0.0..1.0))
    } else if current > target {
        -(0.3 + rng.random_range(0.0..0.3))
    } else {
        0.0
    };

    current + delta + rng.random_range(-0.1..0.1)
}

/// One tick of passive cooling toward room temperature.
///
/// The rate scales with the distance above ambient in four bands; the
/// result never drops below [`ROOM_TEMP_C`].
pub fn passive_cool(current: f32) -> f32 {
    let above_room = current - ROOM_TEMP_C;
    if above_room <= 0.0 {
        return ROOM_TEMP_C;
    }

    let mut rng = rand::rng();
    let rate = if above_room > 100.0 {
        1.5 + rng.random_range(0.0..0.5)
    } else if above_room > 50.0 {
        0.8 + rng.random_range(0.0..0.4)
    } else if above_room > 20.0 {
        0.4 + rng.random_range(0.0..0.2)
    } else {
        0.1 + rng.random_range(0.0..0.1)
    };

    (current - rate + rng.random_range(-0.05..0.05)).max(ROOM_TEMP_C)
}
