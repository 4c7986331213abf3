//! Geometry and kinematics primitives
//!
//! Pure functions over `Vec2`: bounding boxes, speed floors, trajectory
//! clamping, wall reflection and floor re-entry. No state lives here.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sign_or_positive;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// A box that overlaps nothing
    pub const EMPTY: Aabb = Aabb {
        min: Vec2::new(-1.0, -1.0),
        max: Vec2::new(-1.0, -1.0),
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Zero-area boxes never overlap anything
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Strict overlap test: boxes that merely share an edge do not collide
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Speed floor for a level: `(level + offset) * scale`
#[inline]
pub fn speed_floor(level: u32, offset: f32, scale: f32) -> f32 {
    (level as f32 + offset) * scale
}

/// Bring a velocity up to at least `floor`, keeping its direction
///
/// A zero velocity has no direction to keep and becomes horizontal.
pub fn enforce_minimum_speed(vel: Vec2, floor: f32) -> Vec2 {
    let speed = vel.length();
    if speed == 0.0 {
        Vec2::new(floor.max(f32::EPSILON), 0.0)
    } else if speed < floor {
        vel * (floor / speed)
    } else {
        vel
    }
}

/// Steepen a near-horizontal trajectory so `|vy / vx| >= threshold`
pub fn clamp_to_minimum_angle(vel: Vec2, threshold: f32) -> Vec2 {
    if vel.x != 0.0 && (vel.y / vel.x).abs() < threshold {
        Vec2::new(vel.x, sign_or_positive(vel.y) * vel.x.abs() * threshold)
    } else {
        vel
    }
}

/// Field boundary a body touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wall {
    Left,
    Right,
    Top,
    /// Bottom edge; reflective only in intro mode
    Floor,
}

/// What happened at the field edges during one move
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WallContacts {
    /// Left or right wall bounce
    pub side: Option<Wall>,
    /// Top bounce, or floor bounce/exit
    pub vertical: Option<Wall>,
}

impl WallContacts {
    /// Walls the body bounced off (a non-intro floor exit is not a bounce)
    pub fn bounces(&self, intro: bool) -> impl Iterator<Item = Wall> {
        let floor_exit = !intro && self.vertical == Some(Wall::Floor);
        self.side
            .into_iter()
            .chain(self.vertical.filter(|_| !floor_exit))
    }

    pub fn fell_out(&self, intro: bool) -> bool {
        !intro && self.vertical == Some(Wall::Floor)
    }
}

/// Reflect a circle of `radius` off the field walls
///
/// Positions are clamped back onto the boundary. Side bounces also steepen
/// the trajectory by `angle_threshold`. Outside intro mode the floor is not
/// reflective: the contact is reported and the body is left for the caller.
pub fn bounce_off_walls(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    field: Vec2,
    damp: f32,
    angle_threshold: f32,
    intro: bool,
) -> WallContacts {
    let mut contacts = WallContacts::default();

    if pos.x < radius {
        pos.x = radius;
        vel.x = -vel.x * damp;
        *vel = clamp_to_minimum_angle(*vel, angle_threshold);
        contacts.side = Some(Wall::Left);
    } else if pos.x > field.x - radius {
        pos.x = field.x - radius;
        vel.x = -vel.x * damp;
        *vel = clamp_to_minimum_angle(*vel, angle_threshold);
        contacts.side = Some(Wall::Right);
    }

    if pos.y < radius {
        pos.y = radius;
        vel.y = -vel.y * damp;
        contacts.vertical = Some(Wall::Top);
    } else if pos.y > field.y - radius {
        if intro {
            pos.y = field.y - radius;
            vel.y = -vel.y * damp;
        }
        contacts.vertical = Some(Wall::Floor);
    }

    contacts
}

fn draw_in_range(rng: &mut impl Rng, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.random_range(lo..=hi) } else { lo }
}

/// Where a body that fell out re-enters play
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reentry {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Pick a random side and a small inward/upward velocity for re-entry
///
/// `speed` is the (min, max) range of each velocity component in reference
/// units; the result is multiplied by `scale`.
pub fn floor_reentry(
    rng: &mut impl Rng,
    field: Vec2,
    height_fraction: f32,
    speed: (f32, f32),
    scale: f32,
) -> Reentry {
    let from_left = rng.random_bool(0.5);
    let vx = draw_in_range(rng, speed) * scale;
    let vy = -draw_in_range(rng, speed) * scale;
    let (x, vx) = if from_left {
        (0.0, vx)
    } else {
        (field.x - 1.0, -vx)
    };
    Reentry {
        pos: Vec2::new(x, field.y * height_fraction),
        vel: Vec2::new(vx, vy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const FIELD: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_aabb_strict_overlap() {
        let a = Aabb::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let touching = Aabb::new(Vec2::new(10.0, 0.0), Vec2::new(20.0, 10.0));
        let inside = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(15.0, 15.0));
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(!a.overlaps(&Aabb::EMPTY));
        assert!(!Aabb::EMPTY.overlaps(&Aabb::EMPTY));
    }

    #[test]
    fn test_minimum_speed_zero_gets_default() {
        let v = enforce_minimum_speed(Vec2::ZERO, 3.0);
        assert!((v.length() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_minimum_speed_rescales_exactly() {
        let v = enforce_minimum_speed(Vec2::new(0.3, -0.4), 5.0);
        assert!((v.length() - 5.0).abs() < 1e-4);
        assert!((v.x - 3.0).abs() < 1e-4);
        assert!((v.y + 4.0).abs() < 1e-4);

        let fast = Vec2::new(10.0, 10.0);
        assert_eq!(enforce_minimum_speed(fast, 5.0), fast);
    }

    #[test]
    fn test_clamp_to_minimum_angle() {
        let v = clamp_to_minimum_angle(Vec2::new(10.0, -1.0), 0.35);
        assert_eq!(v.x, 10.0);
        assert!((v.y + 3.5).abs() < 1e-5);

        // Flat trajectories default downward-positive
        let v = clamp_to_minimum_angle(Vec2::new(-4.0, 0.0), 0.5);
        assert!((v.y - 2.0).abs() < 1e-5);

        // Steep or vertical trajectories are untouched
        assert_eq!(clamp_to_minimum_angle(Vec2::new(1.0, 5.0), 0.35), Vec2::new(1.0, 5.0));
        assert_eq!(clamp_to_minimum_angle(Vec2::new(0.0, 5.0), 0.35), Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_left_wall_bounce() {
        let mut pos = Vec2::new(3.0, 300.0);
        let mut vel = Vec2::new(-6.0, 4.0);
        let c = bounce_off_walls(&mut pos, &mut vel, 10.0, FIELD, 1.0, 0.35, false);
        assert_eq!(c.side, Some(Wall::Left));
        assert_eq!(pos.x, 10.0);
        assert_eq!(vel.x, 6.0);
        assert_eq!(vel.y, 4.0);
    }

    #[test]
    fn test_intro_damped_floor_bounce() {
        let mut pos = Vec2::new(400.0, 598.0);
        let mut vel = Vec2::new(0.0, 10.0);
        let c = bounce_off_walls(&mut pos, &mut vel, 10.0, FIELD, 0.7, 0.35, true);
        assert_eq!(c.vertical, Some(Wall::Floor));
        assert!(!c.fell_out(true));
        assert_eq!(pos.y, 590.0);
        assert!((vel.y + 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_floor_exit_reported_not_reflected() {
        let mut pos = Vec2::new(400.0, 598.0);
        let mut vel = Vec2::new(0.0, 10.0);
        let c = bounce_off_walls(&mut pos, &mut vel, 10.0, FIELD, 1.0, 0.35, false);
        assert!(c.fell_out(false));
        assert_eq!(c.bounces(false).count(), 0);
        assert_eq!(vel.y, 10.0);
    }

    #[test]
    fn test_floor_reentry_from_side() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..50 {
            let r = floor_reentry(&mut rng, FIELD, 0.8, (1.0, 4.0), 2.0);
            assert_eq!(r.pos.y, 480.0);
            assert!(r.pos.x == 0.0 || r.pos.x == FIELD.x - 1.0);
            // Always inward and upward
            if r.pos.x == 0.0 {
                assert!(r.vel.x >= 2.0 && r.vel.x <= 8.0);
            } else {
                assert!(r.vel.x <= -2.0 && r.vel.x >= -8.0);
            }
            assert!(r.vel.y <= -2.0 && r.vel.y >= -8.0);
        }
    }

    proptest! {
        #[test]
        fn prop_speed_floor_holds(vx in -50.0f32..50.0, vy in -50.0f32..50.0, floor in 0.5f32..20.0) {
            let v = enforce_minimum_speed(Vec2::new(vx, vy), floor);
            prop_assert!(v.length() >= floor * 0.9999);
        }

        #[test]
        fn prop_angle_clamp_keeps_vx(vx in -50.0f32..50.0, vy in -50.0f32..50.0) {
            let v = clamp_to_minimum_angle(Vec2::new(vx, vy), 0.35);
            prop_assert_eq!(v.x, vx);
            if vx != 0.0 {
                prop_assert!((v.y / v.x).abs() >= 0.35 * 0.9999);
            }
        }
    }
}
