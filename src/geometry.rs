//! Minimal geometry kernel: frames, rigid transforms, segments and planar tests.
//!
//! All geometry is `f32` and built on `glam`. A [`Frame`] is an origin plus an
//! orthonormal right-handed basis; transforms are plain [`Affine3A`] values so
//! they compose with `*` (the right-hand operand is applied first).

use glam::{Affine3A, Mat3, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Length below which a vector or segment is treated as degenerate.
pub const EPSILON: f32 = 1e-6;

/// An oriented coordinate frame (origin + orthonormal axes).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Origin of the frame in world space.
    pub point: Vec3,
    /// Unit X axis.
    pub xaxis: Vec3,
    /// Unit Y axis, orthogonal to `xaxis`.
    pub yaxis: Vec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self::world_xy()
    }
}

impl Frame {
    /// Builds a frame from an origin and two (not necessarily orthonormal) axes.
    ///
    /// `yaxis` is re-orthogonalised against `xaxis`. Degenerate input (zero or
    /// parallel axes) falls back to the world axes.
    pub fn new(point: Vec3, xaxis: Vec3, yaxis: Vec3) -> Self {
        let Some(x) = xaxis.try_normalize() else {
            return Self::world_xy().moved_to(point);
        };
        let Some(z) = x.cross(yaxis).try_normalize() else {
            return Self::world_xy().moved_to(point);
        };
        Self {
            point,
            xaxis: x,
            yaxis: z.cross(x),
        }
    }

    /// The world XY frame at the origin.
    pub fn world_xy() -> Self {
        Self {
            point: Vec3::ZERO,
            xaxis: Vec3::X,
            yaxis: Vec3::Y,
        }
    }

    /// Builds a frame from an orientation quaternion and an origin.
    pub fn from_quaternion(rotation: Quat, point: Vec3) -> Self {
        let rotation = rotation.normalize();
        Self {
            point,
            xaxis: rotation * Vec3::X,
            yaxis: rotation * Vec3::Y,
        }
    }

    fn moved_to(mut self, point: Vec3) -> Self {
        self.point = point;
        self
    }

    /// Unit Z axis (`xaxis × yaxis`).
    pub fn zaxis(&self) -> Vec3 {
        self.xaxis.cross(self.yaxis)
    }

    /// Orientation of the frame relative to the world axes.
    pub fn rotation(&self) -> Quat {
        Quat::from_mat3(&Mat3::from_cols(self.xaxis, self.yaxis, self.zaxis())).normalize()
    }

    /// Local-to-world rigid transform of this frame.
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation(), self.point)
    }

    /// Applies `transform` to this frame in place.
    pub fn transform(&mut self, transform: &Affine3A) {
        *self = self.transformed(transform);
    }

    /// Returns a copy of this frame with `transform` applied.
    ///
    /// Axes are re-orthonormalised so repeated transforms do not drift.
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        Self::new(
            transform.transform_point3(self.point),
            transform.transform_vector3(self.xaxis),
            transform.transform_vector3(self.yaxis),
        )
    }

    /// Returns the frame translated by `offset` (world space).
    pub fn translated(&self, offset: Vec3) -> Self {
        self.moved_to(self.point + offset)
    }

    /// Pose record `[x, y, z, qw, qx, qy, qz]`.
    pub fn pose_quaternion(&self) -> [f32; 7] {
        let q = self.rotation();
        [
            self.point.x,
            self.point.y,
            self.point.z,
            q.w,
            q.x,
            q.y,
            q.z,
        ]
    }
}

/// A rotation of `angle` radians about `axis` through `point`.
pub fn rotation_about(axis: Vec3, angle: f32, point: Vec3) -> Affine3A {
    let axis = axis.try_normalize().unwrap_or(Vec3::Z);
    Affine3A::from_translation(point)
        * Affine3A::from_axis_angle(axis, angle)
        * Affine3A::from_translation(-point)
}

/// A pure translation by `offset`.
pub fn translation(offset: Vec3) -> Affine3A {
    Affine3A::from_translation(offset)
}

/// A straight segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Vec3,
    pub end: Vec3,
}

impl Line {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    pub fn length(&self) -> f32 {
        self.direction().length()
    }

    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    pub fn transformed(&self, transform: &Affine3A) -> Self {
        Self {
            start: transform.transform_point3(self.start),
            end: transform.transform_point3(self.end),
        }
    }

    /// Closest points between this segment and `other`, in that order.
    ///
    /// Handles zero-length segments by treating them as points.
    pub fn closest_points(&self, other: &Line) -> (Vec3, Vec3) {
        let d1 = self.direction();
        let d2 = other.direction();
        let r = self.start - other.start;
        let a = d1.length_squared();
        let e = d2.length_squared();
        let f = d2.dot(r);

        let (s, t) = if a <= EPSILON && e <= EPSILON {
            (0.0, 0.0)
        } else if a <= EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(r);
            if e <= EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(d2);
                let denom = a * e - b * b;
                // Parallel segments: any s works, pick the start.
                let s = if denom > EPSILON * EPSILON {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let t = (b * s + f) / e;
                if t < 0.0 {
                    ((-c / a).clamp(0.0, 1.0), 0.0)
                } else if t > 1.0 {
                    (((b - c) / a).clamp(0.0, 1.0), 1.0)
                } else {
                    (s, t)
                }
            }
        };

        (self.start + d1 * s, other.start + d2 * t)
    }

    /// Minimum distance between this segment and `other`.
    pub fn distance_to(&self, other: &Line) -> f32 {
        let (a, b) = self.closest_points(other);
        a.distance(b)
    }
}

/// Geometry that can answer closest-point queries.
///
/// This is the boundary through which externally supplied target geometry
/// (a design surface, a guide curve) is measured against connectors.
pub trait ClosestPoint {
    fn closest_point(&self, point: Vec3) -> Vec3;
}

impl ClosestPoint for Vec3 {
    fn closest_point(&self, _point: Vec3) -> Vec3 {
        *self
    }
}

impl ClosestPoint for Line {
    fn closest_point(&self, point: Vec3) -> Vec3 {
        let d = self.direction();
        let len_sq = d.length_squared();
        if len_sq <= EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(d) / len_sq).clamp(0.0, 1.0);
        self.start + d * t
    }
}

/// The frame's XY plane.
impl ClosestPoint for Frame {
    fn closest_point(&self, point: Vec3) -> Vec3 {
        let normal = self.zaxis();
        point - normal * (point - self.point).dot(normal)
    }
}

/// Even-odd point-in-polygon test in the ground plane.
///
/// Returns `false` for non-finite points, so a degenerate resultant never
/// counts as supported.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if !point.is_finite() || polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Area-weighted centroid of a simple polygon (vertex average if degenerate).
pub fn polygon_centroid(polygon: &[Vec2]) -> Vec2 {
    let mut area = 0.0;
    let mut acc = Vec2::ZERO;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let cross = a.perp_dot(b);
        area += cross;
        acc += (a + b) * cross;
    }
    if area.abs() <= EPSILON {
        let n = polygon.len().max(1) as f32;
        return polygon.iter().copied().sum::<Vec2>() / n;
    }
    acc / (3.0 * area)
}
