//! The game session: phase machine, session clock and the per-frame advance.
//!
//! A session owns every piece of mutable simulation state.  Callers drive it
//! with [`GameSession::advance`] once per display frame and read it back
//! through [`GameSession::view`], a borrowed snapshot that the renderer
//! consumes.

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, trace};

use crate::compute;
use crate::entities::{
    Enemy, Field, Level, Particle, Phase, Player, PowerUp, PowerUpKind, Projectile, Star, World,
};
use crate::timer::Cadence;
use crate::tuning::{Tuning, TuningError};

/// Receives the final score once per finished run.
pub type ScoreSink = Box<dyn FnMut(u32)>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {op} while {phase:?}")]
    InvalidTransition { op: &'static str, phase: Phase },
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Session time, advanced only by frames.
///
/// Frame timestamps from the caller are turned into deltas here.  The first
/// frame after a start or resume establishes a baseline and contributes no
/// time, so wall time spent paused or before the run never leaks in.
#[derive(Clone, Debug, Default, PartialEq)]
struct SessionClock {
    elapsed_ms: f64,
    last_frame: Option<f64>,
    paused: bool,
}

impl SessionClock {
    fn delta_for(&mut self, frame_time: f64) -> f64 {
        let delta = match self.last_frame {
            Some(last) => (frame_time - last).max(0.0),
            None => 0.0,
        };
        self.last_frame = Some(frame_time);
        delta
    }

    fn rebaseline(&mut self, frame_time: Option<f64>) {
        self.last_frame = frame_time;
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct GameSession {
    tuning: Tuning,
    phase: Phase,
    level: Option<Level>,
    world: World,
    clock: SessionClock,
    spawn: Cadence,
    player_fire: Cadence,
    fire_held: bool,
    high_score: u32,
    score_recorded: bool,
    /// Whether the last finished run strictly beat the previous high score.
    new_best: bool,
    sink: Option<ScoreSink>,
    rng: StdRng,
}

impl GameSession {
    /// New session awaiting a difficulty choice.  `high_score` is the value
    /// read from persistence at creation.  Fails if `tuning` does not
    /// validate.
    pub fn new(tuning: Tuning, high_score: u32) -> Result<Self, TuningError> {
        Self::with_rng(tuning, high_score, StdRng::from_entropy())
    }

    /// Deterministic session for tests and replays of a single run.
    pub fn seeded(tuning: Tuning, high_score: u32, seed: u64) -> Result<Self, TuningError> {
        Self::with_rng(tuning, high_score, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tuning: Tuning, high_score: u32, rng: StdRng) -> Result<Self, TuningError> {
        tuning.validate()?;
        let world = fresh_world(&tuning);
        Ok(Self {
            tuning,
            phase: Phase::AwaitingDifficulty,
            level: None,
            world,
            clock: SessionClock::default(),
            spawn: Cadence::armed_at(0.0),
            player_fire: Cadence::ready(),
            fire_held: false,
            high_score,
            score_recorded: false,
            new_best: false,
            sink: None,
            rng,
        })
    }

    /// Install the callback that receives each run's final score.
    pub fn on_game_over(&mut self, sink: impl FnMut(u32) + 'static) {
        self.sink = Some(Box::new(sink));
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn score(&self) -> u32 {
        self.world.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn hp(&self) -> u32 {
        self.world.player.hp
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.clock.elapsed_ms
    }

    pub fn is_paused(&self) -> bool {
        self.clock.paused
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn field(&self) -> Field {
        self.world.field
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access to the simulation state, for scripted scenarios.
    /// Bypasses every invariant the session maintains.
    #[doc(hidden)]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn view(&self) -> SessionView<'_> {
        let player = &self.world.player;
        let now = self.clock.elapsed_ms;
        let t = &self.tuning;
        SessionView {
            phase: self.phase,
            level: self.level,
            paused: self.clock.paused,
            clock_ms: now,
            field: self.world.field,
            score: self.world.score,
            high_score: self.high_score,
            new_best: self.new_best,
            max_hp: t.max_hp,
            player,
            projectiles: &self.world.projectiles,
            enemies: &self.world.enemies,
            power_ups: &self.world.power_ups,
            particles: &self.world.particles,
            stars: &self.world.stars,
            rapid_fire_ms: player.rapid_fire.remaining(now, t.power_up_ms),
            wide_shot_ms: player.wide_shot.remaining(now, t.power_up_ms),
            shield_ms: player.shield.remaining(now, t.shield_ms),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    pub fn select_difficulty(&mut self, level: Level) -> Result<(), SessionError> {
        self.expect_phase("select a difficulty", &[Phase::AwaitingDifficulty])?;
        self.level = Some(level);
        self.phase = Phase::AwaitingStart;
        info!(level = level.label(), "difficulty selected");
        Ok(())
    }

    /// Begin a run, or restart one that is over with the same tier.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.expect_phase("start", &[Phase::AwaitingStart, Phase::Over])?;
        self.world = fresh_world(&self.tuning);
        compute::seed_stars(&mut self.world, self.tuning.star_count, &mut self.rng);
        self.clock = SessionClock::default();
        self.spawn = Cadence::armed_at(0.0);
        self.player_fire = Cadence::ready();
        self.score_recorded = false;
        self.new_best = false;
        self.phase = Phase::Running;
        info!(level = ?self.level, "session started");
        Ok(())
    }

    /// Drop the tier and everything else; back to the difficulty choice.
    pub fn reset(&mut self) {
        self.world = fresh_world(&self.tuning);
        self.clock = SessionClock::default();
        self.level = None;
        self.fire_held = false;
        self.new_best = false;
        self.phase = Phase::AwaitingDifficulty;
        info!("session reset");
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.expect_phase("pause", &[Phase::Running])?;
        self.clock.paused = true;
        self.clock.rebaseline(None);
        Ok(())
    }

    /// Resume a paused run.  `frame_time` becomes the new baseline.
    pub fn resume(&mut self, frame_time: f64) -> Result<(), SessionError> {
        self.expect_phase("resume", &[Phase::Running])?;
        self.clock.paused = false;
        self.clock.rebaseline(Some(frame_time));
        Ok(())
    }

    pub fn toggle_pause(&mut self, frame_time: f64) -> Result<(), SessionError> {
        if self.clock.paused {
            self.resume(frame_time)
        } else {
            self.pause()
        }
    }

    // ── Input ────────────────────────────────────────────────────────────────

    /// Pointer position mapped to the player's centre, clamped to the field.
    pub fn steer_to(&mut self, center_x: f32) {
        if self.accepts_input() {
            let field = self.world.field;
            self.world.player.steer_to(center_x, field);
        }
    }

    /// Keyboard step; `direction` is -1 for left, +1 for right.
    pub fn nudge(&mut self, direction: f32) {
        if self.accepts_input() {
            let field = self.world.field;
            let step = direction.signum() * self.tuning.keyboard_step;
            self.world.player.nudge(step, field);
        }
    }

    /// Explicit fire intent; only consulted when auto-fire is off.
    pub fn set_fire_held(&mut self, held: bool) {
        self.fire_held = held;
    }

    fn accepts_input(&self) -> bool {
        self.phase == Phase::Running && !self.clock.paused
    }

    // ── Frame ────────────────────────────────────────────────────────────────

    /// Advance using a caller frame timestamp in milliseconds.
    pub fn advance(&mut self, frame_time: f64) -> Result<(), SessionError> {
        self.expect_phase("advance", &[Phase::Running])?;
        if self.clock.paused {
            return Ok(());
        }
        let delta = self.clock.delta_for(frame_time);
        self.step(delta);
        Ok(())
    }

    /// Advance by an explicit delta in milliseconds.
    pub fn tick(&mut self, delta_ms: f64) -> Result<(), SessionError> {
        self.expect_phase("advance", &[Phase::Running])?;
        if self.clock.paused {
            return Ok(());
        }
        self.step(delta_ms.max(0.0));
        Ok(())
    }

    fn step(&mut self, delta: f64) {
        let Some(level) = self.level else {
            return;
        };
        let tuning = &self.tuning;
        let params = *tuning.difficulty(level);
        let world = &mut self.world;
        let rng = &mut self.rng;

        self.clock.elapsed_ms += delta;
        let now = self.clock.elapsed_ms;

        let spawn_interval = params.spawn_interval_at(now, tuning.min_spawn_interval_ms);
        if self.spawn.poll(now, spawn_interval, rng) {
            compute::spawn_wave(world, tuning, level, now, rng);
        }

        if tuning.auto_fire || self.fire_held {
            let interval = tuning.player_fire_interval(world.player.rapid_fire.is_active());
            if self.player_fire.poll(now, interval, rng) {
                compute::player_volley(world, tuning);
            }
        }

        compute::enemy_fire(world, tuning, level, now, rng);

        let scale = compute::frame_scale(delta);
        compute::integrate(world, params.enemy_speed_at(now), scale, rng);

        let kills = compute::resolve_kills(world, tuning, rng);
        let hit = compute::resolve_player_hits(world, tuning, now, rng);
        let died = hit && world.player.hp == 0;
        if !died {
            compute::collect_power_ups(world, tuning, now);
        }

        compute::expire_effects(&mut world.player, tuning, now);
        compute::cull(world);

        trace!(
            now,
            kills = kills.kills,
            enemies = world.enemies.len(),
            projectiles = world.projectiles.len(),
            "frame"
        );

        if died {
            self.phase = Phase::Over;
            self.record_score();
        }
    }

    /// Report the final score once per run and fold it into the high score.
    fn record_score(&mut self) {
        if self.score_recorded {
            return;
        }
        self.score_recorded = true;
        let score = self.world.score;
        let new_best = score > self.high_score;
        self.new_best = new_best;
        self.high_score = self.high_score.max(score);
        info!(score, high_score = self.high_score, new_best, "game over");
        if let Some(sink) = self.sink.as_mut() {
            sink(score);
        }
    }

    fn expect_phase(&self, op: &'static str, allowed: &[Phase]) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                op,
                phase: self.phase,
            })
        }
    }
}

fn fresh_world(tuning: &Tuning) -> World {
    World::new(
        Field {
            width: tuning.field_width,
            height: tuning.field_height,
        },
        tuning.player_size,
        tuning.player_bottom_offset,
        tuning.max_hp,
    )
}

// ── Read-only snapshot ────────────────────────────────────────────────────────

/// Everything the renderer may look at, borrowed for one frame.
#[derive(Clone, Copy, Debug)]
pub struct SessionView<'a> {
    pub phase: Phase,
    pub level: Option<Level>,
    pub paused: bool,
    pub clock_ms: f64,
    pub field: Field,
    pub score: u32,
    pub high_score: u32,
    /// Set once a run ends with a score strictly above the previous best.
    pub new_best: bool,
    pub max_hp: u32,
    pub player: &'a Player,
    pub projectiles: &'a [Projectile],
    pub enemies: &'a [Enemy],
    pub power_ups: &'a [PowerUp],
    pub particles: &'a [Particle],
    pub stars: &'a [Star],
    pub rapid_fire_ms: f64,
    pub wide_shot_ms: f64,
    pub shield_ms: f64,
}

impl SessionView<'_> {
    /// The player blinks off on alternate 100 ms slices while invulnerable.
    pub fn player_visible(&self) -> bool {
        !(self.player.invulnerable.is_active() && (self.clock_ms / 100.0).floor() as u64 % 2 == 0)
    }

    pub fn shielded(&self) -> bool {
        self.player.shield.is_active()
    }

    /// Remaining ms of each active timed power-up.
    pub fn active_power_ups(&self) -> Vec<(PowerUpKind, f64)> {
        [
            (PowerUpKind::RapidFire, self.player.rapid_fire.is_active(), self.rapid_fire_ms),
            (PowerUpKind::WideShot, self.player.wide_shot.is_active(), self.wide_shot_ms),
            (PowerUpKind::Shield, self.player.shield.is_active(), self.shield_ms),
        ]
        .into_iter()
        .filter(|(_, active, _)| *active)
        .map(|(kind, _, ms)| (kind, ms))
        .collect()
    }
}
