//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the range `[min, max]`.
///
/// NaN values are passed through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Limit a value to the symmetric range `[-limit, limit]`, returning the limited value and
/// whether the limit was applied.
pub fn clamp_sym<T>(value: T, limit: T) -> (T, bool)
where
    T: Float,
{
    let limit = limit.abs();
    let ret = clamp(value, -limit, limit);

    (ret, ret != value)
}

/// Get the signed angular distance from `a` to `b`, in the range `[-pi, pi]`.
///
/// Positive values mean `b` is anticlockwise of `a` (right hand rule about Z+).
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    rem_euclid(b - a + pi_t, tau_t) - pi_t
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_clamp_sym() {
        assert_eq!(clamp_sym(0.5f64, 0.2), (0.2, true));
        assert_eq!(clamp_sym(-0.5f64, 0.2), (-0.2, true));
        assert_eq!(clamp_sym(0.1f64, 0.2), (0.1, false));
        assert_eq!(clamp_sym(0.1f64, -0.2), (0.1, false));
    }

    #[test]
    fn test_get_ang_dist() {
        const PI: f64 = std::f64::consts::PI;

        assert!((get_ang_dist(1f64, 2f64) - 1.0).abs() < EPS);
        assert!((get_ang_dist(2f64, 1f64) + 1.0).abs() < EPS);
        assert!(get_ang_dist(0f64, 2.0 * PI).abs() < EPS);

        // Crossing the +/- pi boundary takes the short way round
        assert!((get_ang_dist(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-9);
        assert!((get_ang_dist(-PI + 0.1, PI - 0.1) + 0.2).abs() < 1e-9);
    }
}
