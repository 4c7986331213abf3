//! Collision detection and response
//!
//! Every check starts with a strict AABB reject. Responses move the ball out
//! of the obstacle and rewrite its velocity in place; cues and target damage
//! are left to the caller.

use glam::Vec2;
use rand::Rng;

use super::state::{Ball, Beam, Paddle, Target};

/// Which part of an obstacle the ball touched
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    LeftEdge,
    RightEdge,
    TopEdge,
    BottomEdge,
    /// Circle-vs-point contact with a target corner
    Corner(Vec2),
    /// Circle-vs-circle contact with a paddle end cap centered here
    Cap(Vec2),
    /// Flat top of a paddle
    FlatTop,
}

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    pub contact: Option<Contact>,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            contact: None,
        }
    }

    fn with(contact: Contact) -> Self {
        Self {
            hit: true,
            contact: Some(contact),
        }
    }
}

/// Push a ball off a round obstacle and send it away along the normal
///
/// Returns false when the ball is not within `reach`.
fn push_out_round(ball: &mut Ball, center: Vec2, reach: f32) -> bool {
    let offset = ball.pos - center;
    let distance = offset.length();
    if distance >= reach {
        return false;
    }
    let normal = offset.try_normalize().unwrap_or(Vec2::X);
    ball.pos += normal * (reach - distance);
    ball.vel = normal * ball.vel.length();
    true
}

/// Ball against a paddle: rectangle body with semicircular end caps
pub fn ball_paddle_collision(ball: &mut Ball, paddle: &Paddle) -> CollisionResult {
    if !ball.aabb().overlaps(&paddle.aabb()) {
        return CollisionResult::miss();
    }

    let cap_radius = paddle.half.y;
    let left = paddle.x - paddle.half.x;
    let right = paddle.x + paddle.half.x;
    let cap_y = paddle.top + cap_radius;

    let cap = if ball.pos.x < left + cap_radius {
        Some(Vec2::new(left + cap_radius, cap_y))
    } else if ball.pos.x > right - cap_radius {
        Some(Vec2::new(right - cap_radius, cap_y))
    } else {
        None
    };

    match cap {
        Some(center) if push_out_round(ball, center, cap_radius + ball.radius) => {
            CollisionResult::with(Contact::Cap(center))
        }
        Some(_) => CollisionResult::miss(),
        None => {
            ball.pos.y = paddle.top - ball.radius;
            ball.vel.y = -ball.vel.y.abs();
            CollisionResult::with(Contact::FlatTop)
        }
    }
}

/// Random nudge a paddle gives the ball: sideways jitter plus an upward bias
/// that shrinks as difficulty rises
pub fn paddle_jitter(vel: Vec2, scale: f32, jitter_divisor: f32, rng: &mut impl Rng) -> Vec2 {
    let dx = (rng.random::<f32>() - 0.5) * scale;
    let dy = rng.random::<f32>() * scale / jitter_divisor;
    Vec2::new(vel.x + dx, vel.y - dy)
}

/// Ball against a target's box: edges reflect one component, corners reflect
/// along the contact normal
pub fn ball_target_collision(ball: &mut Ball, target: &Target) -> CollisionResult {
    let bbox = target.aabb();
    if !ball.aabb().overlaps(&bbox) {
        return CollisionResult::miss();
    }

    let (left, right) = (bbox.min.x, bbox.max.x);
    let (top, bottom) = (bbox.min.y, bbox.max.y);
    let r = ball.radius;

    let corner = if ball.pos.x < left {
        if ball.pos.y < top {
            Vec2::new(left, top)
        } else if ball.pos.y > bottom {
            Vec2::new(left, bottom)
        } else {
            ball.pos.x = left - r;
            ball.vel.x = -ball.vel.x.abs();
            return CollisionResult::with(Contact::LeftEdge);
        }
    } else if ball.pos.x > right {
        if ball.pos.y < top {
            Vec2::new(right, top)
        } else if ball.pos.y > bottom {
            Vec2::new(right, bottom)
        } else {
            ball.pos.x = right + r;
            ball.vel.x = ball.vel.x.abs();
            return CollisionResult::with(Contact::RightEdge);
        }
    } else if ball.pos.y < top {
        ball.pos.y = top - r;
        ball.vel.y = -ball.vel.y.abs();
        return CollisionResult::with(Contact::TopEdge);
    } else {
        ball.pos.y = bottom + r;
        ball.vel.y = ball.vel.y.abs();
        return CollisionResult::with(Contact::BottomEdge);
    };

    if push_out_round(ball, corner, r) {
        CollisionResult::with(Contact::Corner(corner))
    } else {
        CollisionResult::miss()
    }
}

/// Equal-mass collision between two balls
///
/// Separates them by half the penetration each and exchanges the velocity
/// component along the line of centers (scaled by `damp`). Returns the
/// normal component of the relative velocity.
pub fn ball_ball_collision(a: &mut Ball, b: &mut Ball, damp: f32) -> Option<f32> {
    let delta = b.pos - a.pos;
    let distance = delta.length();
    let reach = a.radius + b.radius;
    if distance >= reach || distance == 0.0 {
        return None;
    }

    let normal = delta / distance;
    let half_overlap = (reach - distance) * 0.5;
    a.pos -= normal * half_overlap;
    b.pos += normal * half_overlap;

    let vn = (a.vel - b.vel).dot(normal);
    a.vel -= normal * vn * damp;
    b.vel += normal * vn * damp;
    Some(vn)
}

/// Beam against a target, using the beam's thin hit strip
pub fn beam_target_collision(beam: &Beam, target: &Target) -> bool {
    beam.hit_box().overlaps(&target.aabb())
}
