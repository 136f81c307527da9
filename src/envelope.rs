//! Attack/release envelope following and threshold gating.
//!
//! All pure functions: callers own the smoothed value between ticks, so
//! every consumer (segments, lights) can be unit tested without a renderer.

/// Exponential attack/release smoother.
///
/// Moves `current` toward `target` with time constant `attack` when rising
/// and `release` when falling. `k = 1 - exp(-dt/tau)` never exceeds 1, so
/// the result never overshoots the target. `dt = 0` returns `current`
/// unchanged.
pub fn follow(current: f32, target: f32, dt: f32, attack: f32, release: f32) -> f32 {
    let tau = if target > current { attack } else { release };
    let k = 1.0 - (-dt / tau).exp();
    current + (target - current) * k
}

/// How far `value` exceeds `threshold`, renormalized to [0, 1].
///
/// Returns 0 at or below the threshold and 1 when `value` is 1. The epsilon
/// guard keeps a threshold of 1.0 from dividing by zero.
pub fn threshold_excess(value: f32, threshold: f32) -> f32 {
    (value - threshold).max(0.0) / (1.0 - threshold).max(1e-6)
}

/// Threshold excess with a power curve applied.
///
/// Exponents below 1 boost small signals (the light rig uses 0.5 so quiet
/// passages still register).
pub fn threshold_excess_curved(value: f32, threshold: f32, power: f32) -> f32 {
    threshold_excess(value, threshold).powf(power)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_zero_dt_is_identity() {
        let v = follow(0.3, 0.9, 0.0, 0.05, 0.25);
        assert_eq!(v, 0.3);
    }

    #[test]
    fn test_follow_never_overshoots() {
        // Huge dt saturates toward target but must not pass it.
        let rising = follow(0.0, 0.8, 100.0, 0.05, 0.25);
        assert!(rising <= 0.8 + 1e-6);
        assert!(rising > 0.79);

        let falling = follow(1.0, 0.2, 100.0, 0.05, 0.25);
        assert!(falling >= 0.2 - 1e-6);
        assert!(falling < 0.21);
    }

    #[test]
    fn test_follow_monotone_approach() {
        let mut v = 0.0;
        let mut prev = v;
        for _ in 0..200 {
            v = follow(v, 1.0, 1.0 / 60.0, 0.05, 0.25);
            assert!(v >= prev);
            assert!(v <= 1.0);
            prev = v;
        }
        // Several attack time constants have passed; should be essentially there.
        assert!(v > 0.999);
    }

    #[test]
    fn test_follow_uses_asymmetric_constants() {
        // With a much slower release than attack, the same |delta| moves
        // further when rising than when falling.
        let dt = 1.0 / 60.0;
        let up = follow(0.5, 1.0, dt, 0.05, 0.25) - 0.5;
        let down = 0.5 - follow(0.5, 0.0, dt, 0.05, 0.25);
        assert!(up > down);
    }

    #[test]
    fn test_threshold_excess_range() {
        assert_eq!(threshold_excess(0.0, 0.05), 0.0);
        assert_eq!(threshold_excess(0.05, 0.05), 0.0);
        assert!((threshold_excess(1.0, 0.05) - 1.0).abs() < 1e-6);
        // Midpoint renormalizes correctly.
        let half = threshold_excess(0.525, 0.05);
        assert!((half - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_excess_full_threshold_guard() {
        // threshold = 1.0 would divide by zero without the guard
        let v = threshold_excess(1.0, 1.0);
        assert!(v.is_finite());
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_curved_excess_boosts_small_signals() {
        let plain = threshold_excess(0.3, 0.0);
        let curved = threshold_excess_curved(0.3, 0.0, 0.5);
        assert!(curved > plain);
        assert!(curved <= 1.0);
    }
}
