//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time is passed in, never read
//! - Seeded RNG only
//! - Stable iteration order (pool order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod effects;
pub mod kinematics;
pub mod levels;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, Contact};
pub use kinematics::{Aabb, Wall};
pub use levels::{LevelCatalog, LevelLayout};
pub use state::{
    Arena, Ball, Beam, GameEvent, GamePhase, HitOutcome, Lives, Paddle, Session, SessionStats,
    Target, TargetKind,
};
pub use tick::{FrameInput, advance, setup_level, tick};
