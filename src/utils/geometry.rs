//! Planar vector and angle helpers

use std::f64::consts::{PI, TAU};

use crate::common::Point2D;

/// Map any angle into (-pi, pi]. Non-finite input is returned unchanged.
pub fn reduce_angle(phi: f64) -> f64 {
    if !phi.is_finite() {
        return phi;
    }
    let r = (phi + PI).rem_euclid(TAU) - PI;
    if r <= -PI {
        r + TAU
    } else {
        r
    }
}

/// Counter-clockwise angle from `base` to `target` in [0, 2pi).
pub fn angle_between(base: &Point2D, target: &Point2D) -> f64 {
    let cos_theta = clamp_unit(target.dot(base) / (target.norm() * base.norm()));
    let theta = cos_theta.acos();
    if target.dot(&perpendicular(base)) >= 0.0 {
        theta
    } else {
        let r = TAU - theta;
        if r >= TAU {
            0.0
        } else {
            r
        }
    }
}

/// Polar coordinates `(r, theta)` of a vector
pub fn polar(v: &Point2D) -> (f64, f64) {
    (v.norm(), v.y.atan2(v.x))
}

/// Rotate a vector counter-clockwise by `angle`
pub fn rotate_vector(v: &Point2D, angle: f64) -> Point2D {
    let (s, c) = angle.sin_cos();
    Point2D::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Left-hand normal (the vector rotated by +pi/2)
pub fn perpendicular(v: &Point2D) -> Point2D {
    Point2D::new(-v.y, v.x)
}

/// Clamp an inverse-trig argument into [-1, 1]. NaN stays NaN.
pub fn clamp_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reduce_angle_range() {
        assert_relative_eq!(reduce_angle(2.5 * PI), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(reduce_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(reduce_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(reduce_angle(0.25), 0.25);
        for k in -20..20 {
            let a = reduce_angle(k as f64 * 0.77);
            assert!(a > -PI && a <= PI);
        }
        assert!(reduce_angle(f64::NAN).is_nan());
    }

    #[test]
    fn test_angle_between() {
        let x = Point2D::new(1.0, 0.0);
        assert_relative_eq!(angle_between(&x, &Point2D::new(0.0, 1.0)), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(angle_between(&x, &Point2D::new(0.0, -2.0)), 3.0 * PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(angle_between(&x, &Point2D::new(-1.0, 0.0)), PI, epsilon = 1e-12);
        assert_eq!(angle_between(&x, &x), 0.0);
        let a = angle_between(&Point2D::new(1.0, 1.0), &Point2D::new(1.0, 0.0));
        assert_relative_eq!(a, 7.0 * PI / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_and_polar() {
        let v = rotate_vector(&Point2D::new(2.0, 0.0), PI / 2.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 2.0, epsilon = 1e-12);
        let (r, theta) = polar(&Point2D::new(-3.0, 0.0));
        assert_relative_eq!(r, 3.0);
        assert_relative_eq!(theta, PI);
        assert_eq!(perpendicular(&Point2D::new(1.0, 0.0)), Point2D::new(-0.0, 1.0));
    }
}
