//! Presentation boundary
//!
//! Once per frame the session describes every visible entity as a
//! [`DrawRequest`] and hands it to a [`PresentationSink`]. The core never
//! touches pixels; sinks decide how (and whether) to draw.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::{Session, TargetKind};

/// What a draw request depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawKind {
    Ball { hero: bool },
    Paddle { inverted: bool },
    Target { kind: TargetKind, hp: i32 },
    /// Destruction flash of a target that just went
    Burst { kind: TargetKind },
    Beam { primary: bool },
    /// Full-field darkening overlay
    Darkness,
}

/// One entity to draw this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawRequest {
    pub kind: DrawKind,
    /// Center
    pub pos: Vec2,
    /// Full extent; for round things both components are the diameter
    pub size: Vec2,
    /// 255 is opaque
    pub alpha: u8,
}

/// Per-frame status line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub level: u32,
    pub lives: u32,
    pub targets_left: usize,
    pub balls: usize,
    pub inverted: bool,
    pub barrage: bool,
}

pub trait PresentationSink {
    fn draw(&mut self, request: &DrawRequest);

    fn hud(&mut self, _hud: &Hud) {}
}

/// Sink that only counts what it is given (headless runs)
#[derive(Debug, Default)]
pub struct FrameTally {
    pub frames: u64,
    pub requests: u64,
    pub bursts: u64,
    pub last_hud: Option<Hud>,
}

impl PresentationSink for FrameTally {
    fn draw(&mut self, request: &DrawRequest) {
        self.requests += 1;
        if matches!(request.kind, DrawKind::Burst { .. }) {
            self.bursts += 1;
        }
    }

    fn hud(&mut self, hud: &Hud) {
        self.frames += 1;
        self.last_hud = Some(*hud);
    }
}

impl Session {
    /// Describe the current frame to `sink`
    ///
    /// Also advances destruction bursts by one draw tick, so this is called
    /// exactly once per displayed frame.
    pub fn present(&mut self, now: f64, sink: &mut dyn PresentationSink) {
        // Targets, then their bursts
        for target in &mut self.targets {
            if target.is_alive() {
                sink.draw(&DrawRequest {
                    kind: DrawKind::Target {
                        kind: target.kind,
                        hp: target.hp,
                    },
                    pos: target.center,
                    size: target.half * 2.0,
                    alpha: 255,
                });
            } else if let Some(radius) = target.burst_radius() {
                sink.draw(&DrawRequest {
                    kind: DrawKind::Burst { kind: target.kind },
                    pos: target.center,
                    size: Vec2::splat(radius * 2.0),
                    alpha: 255,
                });
                target.tick_burst();
            }
        }

        for beam in &self.beams {
            sink.draw(&DrawRequest {
                kind: DrawKind::Beam {
                    primary: beam.primary,
                },
                pos: beam.pos,
                size: beam.half * 2.0,
                alpha: 255,
            });
        }

        let fade = self.tuning.paddle_fade_seconds;
        for paddle in &self.paddles {
            sink.draw(&DrawRequest {
                kind: DrawKind::Paddle {
                    inverted: paddle.inverted,
                },
                pos: Vec2::new(paddle.x, paddle.top + paddle.half.y),
                size: paddle.half * 2.0,
                alpha: paddle.alpha(now, fade),
            });
        }

        for (i, ball) in self.balls.iter().enumerate() {
            sink.draw(&DrawRequest {
                kind: DrawKind::Ball { hero: i == 0 },
                pos: ball.pos,
                size: Vec2::splat(ball.radius * 2.0),
                alpha: 255,
            });
        }

        if let Some(alpha) = self.darkness(now) {
            sink.draw(&DrawRequest {
                kind: DrawKind::Darkness,
                pos: self.arena.field * 0.5,
                size: self.arena.field,
                alpha,
            });
        }

        sink.hud(&Hud {
            level: self.level,
            lives: self.lives(),
            targets_left: self.remaining_targets(),
            balls: self.balls.len(),
            inverted: self.is_inverted(),
            barrage: self.is_barrage_active(now),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::{LevelCatalog, advance};
    use crate::tuning::Tuning;

    #[derive(Default)]
    struct Recorder(Vec<DrawRequest>);

    impl PresentationSink for Recorder {
        fn draw(&mut self, request: &DrawRequest) {
            self.0.push(*request);
        }
    }

    fn started() -> Session {
        let mut s = Session::new(Settings::default(), Tuning::default(), LevelCatalog::builtin());
        advance(&mut s, 0.0).unwrap();
        s
    }

    #[test]
    fn test_present_every_entity() {
        let mut s = started();
        let mut rec = Recorder::default();
        s.present(0.0, &mut rec);
        // 20 targets, hero paddle, hero ball
        assert_eq!(rec.0.len(), 22);
        assert!(rec.0.iter().any(|r| r.kind == DrawKind::Ball { hero: true }));
        assert!(!rec.0.iter().any(|r| r.kind == DrawKind::Darkness));
    }

    #[test]
    fn test_burst_shrinks_each_frame() {
        let mut s = started();
        s.targets[0].kind = TargetKind::Neutral;
        s.targets[0].hp = 1;
        s.hit_target(0, 0.0, None, 0.0);

        let mut sizes = Vec::new();
        for _ in 0..25 {
            let mut rec = Recorder::default();
            s.present(0.0, &mut rec);
            if let Some(r) = rec.0.iter().find(|r| matches!(r.kind, DrawKind::Burst { .. })) {
                sizes.push(r.size.x);
            }
        }
        assert_eq!(sizes.len(), 21);
        assert!(sizes.windows(2).all(|w| w[1] < w[0]));
        assert!(s.targets[0].is_gone());
    }

    #[test]
    fn test_darkness_overlay_and_hud() {
        let mut s = started();
        s.darken_started = Some(0.0);
        let mut tally = FrameTally::default();
        s.present(2.0, &mut tally);
        assert_eq!(tally.frames, 1);
        let hud = tally.last_hud.unwrap();
        assert_eq!(hud.level, 1);
        assert_eq!(hud.lives, 4);
        assert_eq!(hud.targets_left, s.remaining_targets());

        let mut rec = Recorder::default();
        s.present(2.0, &mut rec);
        let dark = rec.0.iter().find(|r| r.kind == DrawKind::Darkness).unwrap();
        assert_eq!(dark.alpha, 60);
        assert_eq!(dark.size, s.arena.field);
    }

    #[test]
    fn test_fading_paddle_alpha() {
        let mut s = started();
        s.activate_extra_paddle(0.0);
        let mut rec = Recorder::default();
        s.present(9.5, &mut rec);
        let alphas: Vec<u8> = rec
            .0
            .iter()
            .filter(|r| matches!(r.kind, DrawKind::Paddle { .. }))
            .map(|r| r.alpha)
            .collect();
        assert_eq!(alphas, vec![255, 105]);
    }
}
