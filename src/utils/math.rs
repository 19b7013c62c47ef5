//! Planar helpers layered on top of `glam`.

use glam::Vec2;

/// Cross product of a scalar angular velocity and a vector: `w × v`.
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Cross product of a vector and a scalar: `v × s`, the clockwise perpendicular scaled by `s`.
#[inline]
pub fn cross_vs(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(s * v.y, -s * v.x)
}

/// Rotates `v` by the inverse of the unit rotation `rot`.
#[inline]
pub fn inverse_rotate(rot: Vec2, v: Vec2) -> Vec2 {
    Vec2::new(rot.x, -rot.y).rotate(v)
}

/// Twice the signed area of the triangle `(a, b, c)`.
#[inline]
pub fn signed_area2(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Formats points for diagnostics as `(x, y)` pairs.
pub fn format_points(points: &[Vec2]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("({:.3}, {:.3})", p.x, p.y));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosses_match_perpendiculars() {
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(cross_sv(1.0, v), Vec2::new(0.0, 1.0));
        assert_eq!(cross_vs(v, 1.0), Vec2::new(0.0, -1.0));
        assert!(signed_area2(Vec2::ZERO, Vec2::X, Vec2::Y) > 0.0);
    }

    #[test]
    fn format_lists_every_point() {
        let text = format_points(&[Vec2::new(1.0, 2.0), Vec2::new(-3.5, 0.0)]);
        assert_eq!(text, "(1.000, 2.000), (-3.500, 0.000)");
    }
}
