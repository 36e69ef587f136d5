/// All game entity types.  Plain data plus geometry helpers; the per-frame
/// rules live in `compute`.

use crate::timer::{Cadence, EffectTimer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Easy, Level::Medium, Level::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Level::Easy => "Easy",
            Level::Medium => "Medium",
            Level::Hard => "Hard",
        }
    }
}

/// Session lifecycle.  Exactly one phase holds at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingDifficulty,
    AwaitingStart,
    Running,
    Over,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    /// Halves the fire interval and adds an extra shot per volley.
    RapidFire,
    /// Three-way fan of shots per volley.
    WideShot,
    /// Blocks all damage while active.
    Shield,
    /// Restores one health point, capped at the maximum.
    Heal,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::RapidFire,
        PowerUpKind::WideShot,
        PowerUpKind::Shield,
        PowerUpKind::Heal,
    ];
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in field pixels, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap: touching edges do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Size of the play field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

// ── Player ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub hp: u32,
    pub invulnerable: EffectTimer,
    pub rapid_fire: EffectTimer,
    pub wide_shot: EffectTimer,
    pub shield: EffectTimer,
}

impl Player {
    pub fn new(x: f32, y: f32, size: f32, hp: u32) -> Self {
        Self {
            x,
            y,
            size,
            hp,
            invulnerable: EffectTimer::default(),
            rapid_fire: EffectTimer::default(),
            wide_shot: EffectTimer::default(),
            shield: EffectTimer::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    /// True when enemy contact cannot hurt the player.
    pub fn is_protected(&self) -> bool {
        self.shield.is_active() || self.invulnerable.is_active()
    }

    /// Centre the player on `center_x`, clamped to the field.
    pub fn steer_to(&mut self, center_x: f32, field: Field) {
        let max_x = (field.width - self.size).max(0.0);
        self.x = (center_x - self.size / 2.0).clamp(0.0, max_x);
    }

    pub fn nudge(&mut self, dx: f32, field: Field) {
        let center = self.x + self.size / 2.0 + dx;
        self.steer_to(center, field);
    }
}

// ── Projectiles ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulletOwner {
    Player,
    Enemy,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Vertical velocity in pixels per nominal frame (negative = upward).
    pub vy: f32,
    pub owner: BulletOwner,
}

impl Projectile {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

// ── Enemies & pickups ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Downward speed in pixels per nominal frame.
    pub speed: f32,
    /// Destroying this enemy drops a power-up.
    pub drops_power_up: bool,
    pub fire: Cadence,
}

impl Enemy {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PowerUp {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed: f32,
    pub kind: PowerUpKind,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }
}

// ── Cosmetics ─────────────────────────────────────────────────────────────────

/// Explosion fragment.  Never affects gameplay.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining life in nominal frames.
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    /// Hue in degrees.
    pub hue: f32,
    /// Lightness in 0..1.
    pub lightness: f32,
}

impl Particle {
    /// Remaining life as a fraction of the initial life.
    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed: f32,
}

// ── Simulation state ──────────────────────────────────────────────────────────

/// Everything the simulation mutates during a run.  Owned by the session.
#[derive(Clone, Debug)]
pub struct World {
    pub field: Field,
    pub player: Player,
    pub projectiles: Vec<Projectile>,
    pub enemies: Vec<Enemy>,
    pub power_ups: Vec<PowerUp>,
    pub particles: Vec<Particle>,
    pub stars: Vec<Star>,
    pub score: u32,
}

impl World {
    /// Empty field with the player at bottom-centre.
    pub fn new(field: Field, player_size: f32, bottom_offset: f32, hp: u32) -> Self {
        let player = Player::new(
            field.width / 2.0 - player_size / 2.0,
            field.height - bottom_offset,
            player_size,
            hp,
        );
        Self {
            field,
            player,
            projectiles: Vec::new(),
            enemies: Vec::new(),
            power_ups: Vec::new(),
            particles: Vec::new(),
            stars: Vec::new(),
            score: 0,
        }
    }

    pub fn shots(&self, owner: BulletOwner) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter().filter(move |p| p.owner == owner)
    }
}
