//! Per-frame simulation step and the level/life state machine
//!
//! [`tick`] advances a `Playing` session by one step; [`advance`] resolves the
//! transitional phases (setup, cleared, life lost). The driver calls both.

use glam::Vec2;
use rand::Rng;

use super::collision::{
    ball_ball_collision, ball_paddle_collision, ball_target_collision, beam_target_collision,
    paddle_jitter,
};
use super::state::{Beam, GameEvent, GamePhase, Paddle, Session};
use crate::audio::SoundEffect;
use crate::consts::BALL_CLICK_CAP;
use crate::error::LevelError;
use crate::tuning::LifeLossPolicy;
use crate::velocity_to_volume;

/// Input commands for a single step
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Raw horizontal pointer position, before inversion
    pub pointer_x: f32,
    /// Wall-clock time of this step, in seconds
    pub now: f64,
    /// Primary button pressed: kick every ball
    pub kick: bool,
}

/// Advance a playing session by one step
pub fn tick(session: &mut Session, input: &FrameInput) {
    if session.phase != GamePhase::Playing {
        return;
    }
    let now = input.now;

    // Mapped through the inversion state as it stood when the sample was taken
    session.raw_pointer_x = input.pointer_x;
    session.pointer_x = session.effective_pointer(input.pointer_x);

    if input.kick {
        let ratio = session.tuning.kick_ratio;
        for ball in &mut session.balls {
            ball.kick(ratio);
        }
    }

    if session.darken_started.is_some() && session.darkness(now).is_none() {
        session.darken_started = None;
    }

    update_inversion(session, now);
    update_beams(session, now);
    update_paddles(session, now);
    let hero_dropped = update_balls(session, now);
    collide_ball_pairs(session);
    check_stale_play(session, now);
    check_progress(session, hero_dropped);

    session.frame += 1;
}

/// Tick/restore cues while inverted; mirror the pointer back at expiry
fn update_inversion(session: &mut Session, now: f64) {
    let Some(mut inv) = session.inversion else {
        return;
    };

    let remaining = inv.until - now;
    if remaining <= 0.0 {
        session.inversion = None;
        for paddle in session
            .paddles
            .iter_mut()
            .chain(session.paddle_pool.iter_mut())
        {
            paddle.inverted = false;
        }
        let x = session.arena.field.x - session.raw_pointer_x;
        session.events.push(GameEvent::WarpPointer { x });
        log::debug!("Controls restored");
        return;
    }

    if inv.next_cue >= 1.0 && remaining <= inv.next_cue {
        let effect = if inv.next_cue <= 1.0 {
            SoundEffect::Restore
        } else {
            SoundEffect::Tick
        };
        session.push_cue(effect, session.pointer_x, None);
        inv.next_cue = (remaining.ceil() - 1.0).min(inv.next_cue - 1.0);
    }
    session.inversion = Some(inv);
}

/// Move beams, resolve their hits, and emit new ones during a barrage
fn update_beams(session: &mut Session, now: f64) {
    let step = session.arena.step_fraction;
    let mut beams = std::mem::take(&mut session.beams);
    beams.retain_mut(|beam| {
        if !beam.advance(step) {
            return false;
        }
        match session
            .targets
            .iter()
            .position(|t| beam_target_collision(beam, t))
        {
            Some(index) => {
                session.hit_target(index, beam.pos.x, None, now);
                false
            }
            None => true,
        }
    });
    session.beams = beams;

    if !session.is_barrage_active(now) {
        if session.barrage_until.take().is_some() {
            log::debug!("Barrage over");
        }
        return;
    }

    // Each active paddle fires once per second, staggered by an eighth
    let fps = session.settings.frame_rate as u64;
    let stagger = fps >> 3;
    for idx in 0..session.paddles.len() {
        if session.frame % fps != idx as u64 * stagger {
            continue;
        }
        let paddle = &session.paddles[idx];
        let pos = Vec2::new(paddle.x, paddle.top + paddle.half.y);
        let beam = Beam::new(pos, &session.arena, paddle.id == 0);
        session.beams.push(beam);
        session.stats.beams_fired += 1;
        let variant = session.rng.random_range(0..=2u8);
        session.push_cue(SoundEffect::Laser(variant), pos.x, None);
    }
}

/// Paddles follow the pointer; expired extras return to the pool
fn update_paddles(session: &mut Session, now: f64) {
    let pointer = session.pointer_x;
    for paddle in &mut session.paddles {
        paddle.track(pointer);
    }

    if !session.paddles.iter().any(|p| p.is_expired(now)) {
        return;
    }
    let (expired, active): (Vec<Paddle>, Vec<Paddle>) = std::mem::take(&mut session.paddles)
        .into_iter()
        .partition(|p| p.is_expired(now));
    session.paddles = active;
    for paddle in expired {
        log::debug!("Extra paddle {} expired", paddle.id);
        session.paddle_pool.push(paddle);
    }
    session.paddle_pool.sort_by_key(|p| p.id);
}

/// Move every ball and resolve its paddle and target contacts
///
/// Returns true when the hero ball dropped out of the field this step.
fn update_balls(session: &mut Session, now: f64) -> bool {
    let floor = session.speed_floor();
    let scale = session.arena.scale;
    let volume_cap = session.tuning.volume_speed_cap * scale;
    let jitter = session.settings.difficulty.jitter_divisor();
    let mut hero_dropped = false;

    for bi in 0..session.balls.len() {
        let ball = &mut session.balls[bi];
        let moved = ball.advance(&session.arena, &session.tuning, floor, &mut session.rng);
        let (x, intro) = (ball.pos.x, ball.intro);

        for _ in moved.contacts.bounces(intro) {
            session.push_cue(SoundEffect::WallHit, x, None);
        }
        if moved.dropped {
            session.stats.drops += 1;
            session.push_cue(SoundEffect::Drop, x, None);
            if bi == 0 {
                hero_dropped = true;
                log::info!("Hero ball dropped, {} lives left", session.lives());
            }
        }

        for pi in 0..session.paddles.len() {
            let ball = &mut session.balls[bi];
            if !ball_paddle_collision(ball, &session.paddles[pi]).hit {
                continue;
            }
            let volume = velocity_to_volume(ball.vel, volume_cap);
            let x = ball.pos.x;
            ball.vel = paddle_jitter(ball.vel, scale, jitter, &mut session.rng);
            session.push_cue(SoundEffect::PaddleHit, x, Some(volume));
        }

        if session.balls[bi].pos.y < session.layout.lowest_target_y {
            for ti in 0..session.targets.len() {
                let ball = &mut session.balls[bi];
                if !ball_target_collision(ball, &session.targets[ti]).hit {
                    continue;
                }
                let volume = velocity_to_volume(ball.vel, volume_cap);
                let x = ball.pos.x;
                session.hit_target(ti, x, Some(volume), now);
                break;
            }
        }
    }

    // Bonus balls out of lives leave play; the hero (index 0) never does
    let before = session.balls.len();
    let mut index = 0;
    session.balls.retain(|ball| {
        let keep = index == 0 || !ball.lives.is_exhausted();
        index += 1;
        keep
    });
    if session.balls.len() < before {
        log::debug!("{} bonus balls lost", before - session.balls.len());
    }

    hero_dropped
}

/// Pairwise ball-ball collisions in pool order
fn collide_ball_pairs(session: &mut Session) {
    let n = session.balls.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (head, tail) = session.balls.split_at_mut(j);
            let (a, b) = (&mut head[i], &mut tail[0]);
            let damp = if a.intro {
                session.tuning.intro_damping
            } else {
                1.0
            };
            if let Some(vn) = ball_ball_collision(a, b, damp) {
                let x = a.pos.x;
                let volume = vn.abs().sqrt().min(BALL_CLICK_CAP) / BALL_CLICK_CAP;
                session.push_cue(SoundEffect::BallHit, x, Some(volume));
            }
        }
    }
}

/// Throw in a long-lived bonus ball when nothing has been destroyed for a while
fn check_stale_play(session: &mut Session, now: f64) {
    if now <= session.stale_deadline {
        return;
    }
    session.stale_deadline = now + session.tuning.stale_play_seconds;
    let x = session.spawn_bonus_ball(session.tuning.watchdog_ball_lives);
    session.push_cue(SoundEffect::Bonus, x, None);
    log::debug!("Stale play: bonus ball thrown in");
}

/// Every hero drop costs a life and passes through `LifeLost`, where
/// `advance` applies the life-loss policy (see `Tuning::life_loss_policy`)
fn check_progress(session: &mut Session, hero_dropped: bool) {
    if hero_dropped {
        session.set_phase(GamePhase::LifeLost);
    } else if session.remaining_targets() == 0 {
        session.set_phase(GamePhase::LevelCleared);
    }
}

/// Resolve a transitional phase; a no-op while playing or after the game ends
pub fn advance(session: &mut Session, now: f64) -> Result<(), LevelError> {
    match session.phase {
        GamePhase::LevelSetup => {
            setup_level(session, now)?;
            session.set_phase(GamePhase::Playing);
        }
        GamePhase::LevelCleared => {
            session.stats.levels_cleared += 1;
            if session.level < session.catalog.len() {
                session.level += 1;
                session.hero_mut().lives.gain(1);
                session.set_phase(GamePhase::LevelSetup);
            } else {
                session.push_cue(SoundEffect::Win, session.arena.field.x * 0.5, None);
                session.set_phase(GamePhase::Win);
            }
        }
        GamePhase::LifeLost => {
            if session.hero().lives.is_exhausted() {
                session.push_cue(SoundEffect::Die, session.arena.field.x * 0.5, None);
                session.set_phase(GamePhase::GameOver);
            } else if session.remaining_targets() == 0 {
                // The drop came on the clearing frame
                session.set_phase(GamePhase::LevelCleared);
            } else {
                match session.tuning.life_loss_policy {
                    LifeLossPolicy::KeepGrid => session.set_phase(GamePhase::Playing),
                    LifeLossPolicy::RestartLevel => session.set_phase(GamePhase::LevelSetup),
                }
            }
        }
        GamePhase::Playing | GamePhase::GameOver | GamePhase::Win => {}
    }
    Ok(())
}

/// Build the current level's grid and serve the hero ball
///
/// Clears every running effect, returns extra paddles to the pool and drops
/// all bonus balls and beams. The pointer is re-centred.
pub fn setup_level(session: &mut Session, now: f64) -> Result<(), LevelError> {
    let (layout, targets) = session.catalog.build(
        session.level,
        session.settings.difficulty,
        session.arena.field,
        session.arena.ball_radius,
        &mut session.rng,
    )?;
    session.layout = layout;
    session.targets = targets;

    session.darken_started = None;
    session.inversion = None;
    session.barrage_until = None;
    session.beams.clear();
    session.balls.truncate(1);

    let extras: Vec<Paddle> = session.paddles.drain(1..).collect();
    session.paddle_pool.extend(extras);
    session.paddle_pool.sort_by_key(|p| p.id);
    for paddle in session
        .paddles
        .iter_mut()
        .chain(session.paddle_pool.iter_mut())
    {
        paddle.inverted = false;
    }

    let center = session.arena.field.x * 0.5;
    session.raw_pointer_x = center;
    session.pointer_x = center;
    session.events.push(GameEvent::WarpPointer { x: center });
    session.paddles[0].track(center);
    session.paddles[0].vx = 0.0;

    let scale = session.arena.scale;
    let level = session.level as f32;
    let bonus = session.settings.difficulty.bonus_lives() as f32;
    let vx = session.rng.random_range(-1..=1) as f32 * scale;
    let vy = (-2.0 * (level + 1.0) - bonus) * scale;
    let y = session.arena.paddle_top - session.arena.ball_radius * 2.0;
    let hero = session.hero_mut();
    hero.pos = Vec2::new(center, y);
    hero.vel = Vec2::new(vx, vy);
    hero.intro = false;

    session.frame = 0;
    session.stale_deadline = now + session.tuning.stale_play_seconds;

    log::info!(
        "Level {} ready: {}x{} grid, {} targets to clear, {} lives",
        session.level,
        session.layout.rows,
        session.layout.columns,
        session.remaining_targets(),
        session.lives()
    );
    Ok(())
}
