//! Euler spirals (clothoids), where curvature changes linearly with arclength. There's no closed
//! form for the position, so the Fresnel-style integrals are evaluated numerically.

/// Position and heading change after travelling `s` along a spiral starting at the origin, facing
/// +x, with curvature `k0` at the start and `dk` change in curvature per unit length.
pub(crate) fn spiral_local(k0: f64, dk: f64, s: f64) -> (f64, f64, f64) {
    if s <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let theta = |u: f64| k0 * u + 0.5 * dk * u * u;

    // More turning needs more intervals. Composite Simpson needs an even count.
    let turning = k0.abs() * s + 0.5 * dk.abs() * s * s;
    let mut n = (16.0 + 64.0 * turning).ceil() as usize;
    n = n.min(2048);
    if n % 2 == 1 {
        n += 1;
    }

    let h = s / (n as f64);
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for i in 0..=n {
        let weight = if i == 0 || i == n {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        let (sin, cos) = theta(h * (i as f64)).sin_cos();
        sum_x += weight * cos;
        sum_y += weight * sin;
    }
    (sum_x * h / 3.0, sum_y * h / 3.0, theta(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_curvature_is_straight() {
        let (x, y, theta) = spiral_local(0.0, 0.0, 12.0);
        assert!((x - 12.0).abs() < 1e-12);
        assert!(y.abs() < 1e-12);
        assert_eq!(theta, 0.0);
    }

    #[test]
    fn constant_curvature_is_an_arc() {
        let k = 0.1;
        let s = 10.0;
        let (x, y, theta) = spiral_local(k, 0.0, s);
        assert!((x - (k * s).sin() / k).abs() < 1e-7);
        assert!((y - (1.0 - (k * s).cos()) / k).abs() < 1e-7);
        assert!((theta - k * s).abs() < 1e-12);
    }

    #[test]
    fn standard_clothoid() {
        // With curvature growing at rate 1, x = integral of cos(u^2 / 2) and y = integral of
        // sin(u^2 / 2) over [0, 1]
        let (x, y, theta) = spiral_local(0.0, 1.0, 1.0);
        assert!((x - 0.975288).abs() < 1e-5);
        assert!((y - 0.163714).abs() < 1e-5);
        assert!((theta - 0.5).abs() < 1e-12);
    }
}
