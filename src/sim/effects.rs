//! Target hits and the effects destroyed targets trigger
//!
//! A destroyed target's kind picks its effect. Cascades force-kill their
//! neighbours through an explicit worklist, so a chain of cascade targets
//! never recurses and each target's effect runs exactly once.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;

use super::state::{Ball, GameEvent, HitOutcome, Inversion, Lives, Session, TargetKind};
use crate::audio::SoundEffect;

impl Session {
    /// Strike target `index` once, emitting its cue, and run its effect if
    /// the strike destroyed it
    ///
    /// `x` positions the cue in stereo. Out-of-range indices are ignored.
    pub fn hit_target(&mut self, index: usize, x: f32, volume: Option<f32>, now: f64) -> HitOutcome {
        let outcome = self.strike(index, x, volume, false);
        if outcome == HitOutcome::Destroyed {
            self.resolve_destruction(index, now);
        }
        outcome
    }

    /// Apply one hit and its cue without running any effect
    fn strike(&mut self, index: usize, x: f32, volume: Option<f32>, kill: bool) -> HitOutcome {
        let Some(target) = self.targets.get_mut(index) else {
            return HitOutcome::Ignored;
        };
        let kind = target.kind;
        let outcome = target.hit(kill);
        match outcome {
            HitOutcome::Ignored => {}
            HitOutcome::Damaged => self.push_cue(SoundEffect::TargetHit, x, volume),
            HitOutcome::Deflected => self.push_cue(SoundEffect::Explode(kind), x, volume),
            HitOutcome::Destroyed => self.push_cue(SoundEffect::Explode(kind), x, None),
        }
        outcome
    }

    /// Dedupe candidate indices and keep only live, destructible targets
    pub fn tidy_cascade(&self, candidates: &[isize]) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::with_capacity(candidates.len());
        for &c in candidates {
            let Ok(i) = usize::try_from(c) else { continue };
            let eligible = self
                .targets
                .get(i)
                .is_some_and(|t| t.is_alive() && !t.kind.is_indestructible());
            if eligible && !out.contains(&i) {
                out.push(i);
            }
        }
        out
    }

    /// Force-kill a set of targets (and anything their effects reach)
    ///
    /// Duplicates, out-of-range indices and targets that are already down or
    /// indestructible are skipped, so repeating a cascade is a no-op.
    pub fn cascade(&mut self, candidates: &[isize], now: f64) {
        let victims = self.tidy_cascade(candidates);
        let mut work = VecDeque::new();
        self.force_kill_into(&victims, &mut work);
        self.drain_destructions(work, now);
    }

    /// Run effects for target `index` and everything it chains into
    fn resolve_destruction(&mut self, index: usize, now: f64) {
        self.drain_destructions(VecDeque::from([index]), now);
    }

    fn drain_destructions(&mut self, mut work: VecDeque<usize>, now: f64) {
        while let Some(index) = work.pop_front() {
            let target = &self.targets[index];
            let (id, kind) = (target.id, target.kind);
            self.stats.targets_destroyed += 1;
            self.events.push(GameEvent::TargetDestroyed { id, kind });
            log::debug!("Target {id} ({kind:?}) destroyed");

            match kind {
                TargetKind::Neutral => {}
                TargetKind::BonusBall => {
                    self.spawn_bonus_ball(self.tuning.bonus_ball_lives);
                }
                TargetKind::BonusPaddle => self.activate_extra_paddle(now),
                TargetKind::ExtraLife => self.hero_mut().lives.gain(1),
                TargetKind::Darken => self.darken_started = Some(now),
                TargetKind::Invert => self.start_inversion(now),
                TargetKind::Cascade => {
                    let around: Vec<isize> = self
                        .layout
                        .neighbours(index)
                        .into_iter()
                        .map(|i| i as isize)
                        .collect();
                    let victims = self.tidy_cascade(&around);
                    self.force_kill_into(&victims, &mut work);
                }
                TargetKind::Indestructible => continue,
                TargetKind::Barrage => self.extend_barrage(now),
            }
            self.stale_deadline = now + self.tuning.stale_play_seconds;
        }
    }

    fn force_kill_into(&mut self, victims: &[usize], work: &mut VecDeque<usize>) {
        for &i in victims {
            let x = self.targets[i].center.x + self.targets[i].half.x;
            if self.strike(i, x, None, true) == HitOutcome::Destroyed {
                work.push_back(i);
            }
        }
    }

    /// Launch a bonus ball from a random bottom corner
    ///
    /// It flies up and inward at an angle from vertical drawn from the tuning
    /// range, at a fraction of the hero ball's speed. Returns its x.
    pub fn spawn_bonus_ball(&mut self, lives: u32) -> f32 {
        let field = self.arena.field;
        let from_left = self.rng.random_bool(0.5);
        let (lo, hi) = self.tuning.bonus_angle_deg;
        let degrees = if hi > lo {
            self.rng.random_range(lo..=hi)
        } else {
            lo
        };
        let angle = degrees.to_radians();
        let (rlo, rhi) = self.tuning.bonus_speed_ratio;
        let ratio = if rhi > rlo {
            self.rng.random_range(rlo..=rhi)
        } else {
            rlo
        };
        let speed = self.hero().speed() * ratio;

        let x = if from_left { 0.0 } else { field.x - 1.0 };
        let dir_x = if from_left { angle.sin() } else { -angle.sin() };
        let vel = Vec2::new(dir_x, -angle.cos()) * speed;
        let id = self.allocate_ball_id();
        self.balls.push(Ball::new(
            id,
            Vec2::new(x, field.y * self.tuning.reentry_height),
            vel,
            self.arena.ball_radius,
            Lives::Finite(lives),
        ));
        self.stats.bonus_balls += 1;
        log::debug!("Bonus ball {id} enters at x={x:.0} with {lives} lives");
        x
    }

    /// Bring the lowest-id pooled paddle into play; no-op when the pool is empty
    pub fn activate_extra_paddle(&mut self, now: f64) {
        if self.paddle_pool.is_empty() {
            log::debug!("Paddle pool empty");
            return;
        }
        self.paddle_pool.sort_by_key(|p| p.id);
        let mut paddle = self.paddle_pool.remove(0);
        paddle.activate(self.pointer_x, now + self.tuning.extra_paddle_seconds);
        log::debug!("Extra paddle {} active until {:.2}", paddle.id, now + self.tuning.extra_paddle_seconds);
        self.paddles.push(paddle);
    }

    /// Start or refresh control inversion
    ///
    /// Only the onset mirrors the physical pointer; a refresh just pushes the
    /// deadline back.
    pub fn start_inversion(&mut self, now: f64) {
        if self.inversion.is_none() {
            let x = self.arena.field.x - self.raw_pointer_x;
            self.events.push(GameEvent::WarpPointer { x });
        }
        let seconds = self.tuning.inversion_seconds;
        self.inversion = Some(Inversion {
            until: now + seconds,
            next_cue: seconds,
        });
        for paddle in self.paddles.iter_mut().chain(self.paddle_pool.iter_mut()) {
            paddle.inverted = true;
        }
        log::debug!("Controls inverted until {:.2}", now + seconds);
    }

    /// Extend the beam-emission window by the barrage duration
    pub fn extend_barrage(&mut self, now: f64) {
        let base = self.barrage_until.map_or(now, |until| until.max(now));
        self.barrage_until = Some(base + self.tuning.barrage_seconds);
        log::debug!("Barrage until {:.2}", base + self.tuning.barrage_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::levels::{LevelCatalog, LevelLayout};
    use crate::sim::state::Target;
    use crate::tuning::Tuning;

    /// Session with a hand-placed grid of `kinds` (row-major, `columns` wide)
    fn session_with(kinds: &[TargetKind], columns: usize) -> Session {
        let mut s = Session::new(Settings::default(), Tuning::default(), LevelCatalog::builtin());
        let rows = kinds.len().div_ceil(columns);
        s.layout = LevelLayout::new(rows, columns, s.arena.field, s.arena.ball_radius);
        s.targets = kinds
            .iter()
            .enumerate()
            .map(|(i, &k)| {
                let center = s.layout.center(i / columns, i % columns);
                Target::new(i as u32, k, center, s.layout.target_size * 0.5)
            })
            .collect();
        s.hero_mut().vel = Vec2::new(0.0, -10.0);
        s
    }

    fn destroyed(s: &Session) -> Vec<u32> {
        s.events
            .iter()
            .filter_map(|e| match e {
                GameEvent::TargetDestroyed { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_hit_cues() {
        let mut s = session_with(&[TargetKind::BonusPaddle, TargetKind::Indestructible], 2);
        assert_eq!(s.hit_target(0, 10.0, Some(0.5), 0.0), HitOutcome::Damaged);
        assert_eq!(s.hit_target(1, 10.0, Some(0.5), 0.0), HitOutcome::Deflected);
        assert_eq!(s.hit_target(0, 10.0, Some(0.5), 0.0), HitOutcome::Destroyed);
        assert_eq!(s.hit_target(0, 10.0, Some(0.5), 0.0), HitOutcome::Ignored);
        assert_eq!(s.hit_target(9, 10.0, Some(0.5), 0.0), HitOutcome::Ignored);
        let cues: Vec<SoundEffect> = s
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Cue(c) => Some(c.effect),
                _ => None,
            })
            .collect();
        assert_eq!(
            cues,
            vec![
                SoundEffect::TargetHit,
                SoundEffect::Explode(TargetKind::Indestructible),
                SoundEffect::Explode(TargetKind::BonusPaddle),
            ]
        );
    }

    #[test]
    fn test_cascade_kills_neighbours_once() {
        use TargetKind::*;
        // 3x3 grid, cascade in the middle, another cascade in a corner
        let mut s = session_with(
            &[
                Cascade, Neutral, Neutral, //
                Neutral, Cascade, Indestructible, //
                Neutral, Neutral, Neutral,
            ],
            3,
        );
        s.hit_target(4, 0.0, None, 1.0);
        s.hit_target(4, 0.0, None, 1.0);
        let mut ids = destroyed(&s);
        ids.sort();
        // Every destructible target dies exactly once
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 6, 7, 8]);
        assert!(s.targets[5].is_alive());
        assert_eq!(s.stats.targets_destroyed, 8);
        assert_eq!(s.stale_deadline, 1.0 + s.tuning.stale_play_seconds);
    }

    #[test]
    fn test_cascade_idempotent_with_junk_indices() {
        let mut s = session_with(&[TargetKind::Neutral; 4], 2);
        s.cascade(&[1, 1, -3, 40, 1], 0.0);
        assert_eq!(destroyed(&s), vec![1]);
        s.events.clear();
        s.cascade(&[1, 1, -3, 40, 1], 0.0);
        assert!(destroyed(&s).is_empty());
        assert!(s.targets[0].is_alive());
    }

    #[test]
    fn test_bonus_ball_spawn() {
        let mut s = session_with(&[TargetKind::BonusBall], 1);
        s.targets[0].hp = 1;
        s.hit_target(0, 0.0, None, 0.0);
        assert_eq!(s.balls.len(), 2);
        let bonus = &s.balls[1];
        assert_eq!(bonus.lives, Lives::Finite(2));
        assert!(bonus.pos.x == 0.0 || bonus.pos.x == s.arena.field.x - 1.0);
        assert!(bonus.vel.y < 0.0);
        // Heads inward
        assert!((bonus.pos.x == 0.0) == (bonus.vel.x > 0.0));
        let speed = bonus.vel.length();
        assert!((5.0 - 1e-3..=10.0 + 1e-3).contains(&speed));
    }

    #[test]
    fn test_extra_paddles_from_pool() {
        let mut s = session_with(&[TargetKind::Neutral], 1);
        s.paddle_pool.reverse();
        s.activate_extra_paddle(3.0);
        assert_eq!(s.paddles[1].id, 1);
        assert_eq!(s.paddles[1].expires_at, Some(13.0));
        for _ in 0..10 {
            s.activate_extra_paddle(3.0);
        }
        assert_eq!(s.paddles.len(), 7);
        assert!(s.paddle_pool.is_empty());
    }

    #[test]
    fn test_inversion_warps_only_at_onset() {
        let mut s = session_with(&[TargetKind::Neutral], 1);
        s.raw_pointer_x = 500.0;
        s.start_inversion(0.0);
        s.start_inversion(2.0);
        let warps: Vec<&GameEvent> = s
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::WarpPointer { .. }))
            .collect();
        assert_eq!(warps, vec![&GameEvent::WarpPointer { x: 1420.0 }]);
        assert_eq!(s.inversion.map(|i| i.until), Some(8.0));
        assert!(s.paddle_pool.iter().all(|p| p.inverted));
    }

    #[test]
    fn test_barrage_extends() {
        let mut s = session_with(&[TargetKind::Neutral], 1);
        s.extend_barrage(1.0);
        assert_eq!(s.barrage_until, Some(7.0));
        s.extend_barrage(2.0);
        assert_eq!(s.barrage_until, Some(13.0));
        s.extend_barrage(20.0);
        assert_eq!(s.barrage_until, Some(26.0));
    }

    #[test]
    fn test_extra_life_and_darken() {
        let mut s = session_with(&[TargetKind::ExtraLife, TargetKind::Darken], 2);
        let lives = s.lives();
        s.cascade(&[0, 1], 4.0);
        assert_eq!(s.lives(), lives + 1);
        assert_eq!(s.darken_started, Some(4.0));
    }
}
