//! Planar containment tests for attack hit-volumes.
//!
//! Height never discriminates a hit: every test zeroes the Y components
//! first. Boundaries are inclusive.

use std::f32::consts::PI;

use glam::Vec3;

const EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitShape {
    Sector { origin: Vec3, direction: Vec3, radius: f32, half_angle: f32 },
    Circle { origin: Vec3, radius: f32 },
}

impl HitShape {
    pub fn origin(&self) -> Vec3 {
        match *self {
            HitShape::Sector { origin, .. } | HitShape::Circle { origin, .. } => origin,
        }
    }

    pub fn contains(&self, target: Vec3, target_hit_radius: f32) -> bool {
        match *self {
            HitShape::Sector { origin, direction, radius, half_angle } => {
                sector_contains(origin, direction, radius, half_angle, target)
            }
            HitShape::Circle { origin, radius } => {
                circle_contains(origin, radius, target, target_hit_radius)
            }
        }
    }

    pub(crate) fn translate(&mut self, offset: Vec3) {
        match self {
            HitShape::Sector { origin, .. } | HitShape::Circle { origin, .. } => *origin += offset,
        }
    }
}

pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Angle in `[0, π]` between two directions, measured on the horizontal plane.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let a = flatten(a).normalize_or_zero();
    let b = flatten(b).normalize_or_zero();
    a.dot(b).clamp(-1.0, 1.0).acos()
}

pub fn sector_contains(
    origin: Vec3,
    facing: Vec3,
    radius: f32,
    half_angle: f32,
    target: Vec3,
) -> bool {
    let to_target = flatten(target - origin);
    let distance = to_target.length();
    if distance > radius {
        return false;
    }
    if distance <= EPSILON {
        return true;
    }
    if flatten(facing).length() <= EPSILON {
        // No facing: only a full circle can contain anything off-origin.
        return half_angle >= PI;
    }
    angle_between(facing, to_target) <= half_angle
}

pub fn circle_contains(origin: Vec3, radius: f32, target: Vec3, target_hit_radius: f32) -> bool {
    flatten(target - origin).length() <= radius + target_hit_radius
}
