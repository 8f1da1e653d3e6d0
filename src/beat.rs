//! Beat arithmetic shared by every emitted event.

/// The editing grid the app places events on, in beats.
pub const HALF_BEAT: f64 = 0.5;

/// Decimal places kept on emitted durations.
pub const DURATION_PRECISION: i32 = 2;

/// Snap a beat position to the nearest half-beat, ties rounding up.
///
/// Non-power-of-two divisions produce positions like 6.25 or 30.75;
/// those land on 6.5 and 31.0.
pub fn snap_to_half_beat(beat: f64) -> f64 {
    (beat / HALF_BEAT + 0.5).floor() * HALF_BEAT
}

/// Round a duration to [`DURATION_PRECISION`] decimals to hide
/// floating-point noise from division-based arithmetic.
pub fn round_duration(beats: f64) -> f64 {
    let scale = 10f64.powi(DURATION_PRECISION);
    (beats * scale).round() / scale
}
