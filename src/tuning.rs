/// Gameplay tuning: every balancing constant and the three difficulty tables.
///
/// Defaults reproduce the shipped balance.  A TOML file may override any
/// subset of fields; missing fields keep their defaults.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::entities::Level;

/// Environment variable naming an optional tuning file.
pub const CONFIG_ENV: &str = "STAR_ACE_CONFIG";

/// Length of the nominal frame that velocities are expressed against (60 Hz).
pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning file")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tuning: {0}")]
    Invalid(String),
}

// ── Difficulty ────────────────────────────────────────────────────────────────

/// Per-tier enemy behaviour.  Rates are per elapsed session millisecond.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifficultyParams {
    /// Base enemy speed in pixels per nominal frame.
    pub enemy_speed: f32,
    pub spawn_interval_ms: f64,
    pub enemy_fire_interval_ms: f64,
    pub speed_increase_rate: f64,
    pub spawn_decrease_rate: f64,
    pub enemy_count_multiplier: f64,
}

impl DifficultyParams {
    pub const EASY: Self = Self {
        enemy_speed: 1.5,
        spawn_interval_ms: 2500.0,
        enemy_fire_interval_ms: 3000.0,
        speed_increase_rate: 0.0001,
        spawn_decrease_rate: 0.00005,
        enemy_count_multiplier: 1.0,
    };

    pub const MEDIUM: Self = Self {
        enemy_speed: 2.5,
        spawn_interval_ms: 1800.0,
        enemy_fire_interval_ms: 2000.0,
        speed_increase_rate: 0.0002,
        spawn_decrease_rate: 0.0001,
        enemy_count_multiplier: 1.5,
    };

    pub const HARD: Self = Self {
        enemy_speed: 3.5,
        spawn_interval_ms: 1200.0,
        enemy_fire_interval_ms: 1500.0,
        speed_increase_rate: 0.0003,
        spawn_decrease_rate: 0.00015,
        enemy_count_multiplier: 2.0,
    };

    /// Enemy speed after `elapsed_ms` of play.
    pub fn enemy_speed_at(&self, elapsed_ms: f64) -> f32 {
        self.enemy_speed + (elapsed_ms * self.speed_increase_rate) as f32
    }

    /// Spawn interval after `elapsed_ms` of play, floored at `min_ms`.
    pub fn spawn_interval_at(&self, elapsed_ms: f64, min_ms: f64) -> f64 {
        (self.spawn_interval_ms - elapsed_ms * self.spawn_decrease_rate).max(min_ms)
    }
}

// ── Whole tuning ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    pub field_width: f32,
    pub field_height: f32,

    pub player_size: f32,
    /// Distance from the bottom edge to the player's top on start.
    pub player_bottom_offset: f32,
    pub max_hp: u32,
    pub invulnerable_ms: f64,
    pub power_up_ms: f64,
    pub shield_ms: f64,

    pub fire_interval_ms: f64,
    pub rapid_fire_interval_ms: f64,
    pub auto_fire: bool,
    /// Horizontal spacing of the wide-shot fan.
    pub wide_shot_spread: f32,
    /// How far above the muzzle the rapid-fire extra shot starts.
    pub rapid_fire_offset: f32,
    pub player_bullet_speed: f32,
    pub enemy_bullet_speed: f32,
    pub bullet_width: f32,
    pub bullet_height: f32,

    pub enemy_size: f32,
    pub min_spawn_interval_ms: f64,
    pub max_wave: u32,
    /// Wave growth per elapsed ms, multiplied by the tier's count multiplier.
    pub wave_growth_per_ms: f64,
    pub wave_row_spacing: f32,
    /// Enemies only fire once their top edge is below this line.
    pub enemy_entry_y: f32,
    pub enemy_fire_jitter: f64,

    pub kill_bonus: u32,
    pub power_up_drop_chance: f64,
    pub pickup_size: f32,
    pub pickup_speed: f32,

    pub explosion_particles: usize,
    pub particle_life: f32,
    pub particle_speed: f32,
    pub star_count: usize,
    pub keyboard_step: f32,

    pub easy: DifficultyParams,
    pub medium: DifficultyParams,
    pub hard: DifficultyParams,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            field_width: 400.0,
            field_height: 600.0,

            player_size: 40.0,
            player_bottom_offset: 100.0,
            max_hp: 3,
            invulnerable_ms: 1500.0,
            power_up_ms: 10_000.0,
            shield_ms: 10_000.0,

            fire_interval_ms: 200.0,
            rapid_fire_interval_ms: 100.0,
            auto_fire: true,
            wide_shot_spread: 15.0,
            rapid_fire_offset: 10.0,
            player_bullet_speed: 8.0,
            enemy_bullet_speed: 5.0,
            bullet_width: 6.0,
            bullet_height: 15.0,

            enemy_size: 40.0,
            min_spawn_interval_ms: 800.0,
            max_wave: 3,
            wave_growth_per_ms: 0.0001,
            wave_row_spacing: 60.0,
            enemy_entry_y: 50.0,
            enemy_fire_jitter: 0.0,

            kill_bonus: 10,
            power_up_drop_chance: 0.25,
            pickup_size: 30.0,
            pickup_speed: 3.0,

            explosion_particles: 15,
            particle_life: 30.0,
            particle_speed: 8.0,
            star_count: 100,
            keyboard_step: 20.0,

            easy: DifficultyParams::EASY,
            medium: DifficultyParams::MEDIUM,
            hard: DifficultyParams::HARD,
        }
    }
}

impl Tuning {
    pub fn difficulty(&self, level: Level) -> &DifficultyParams {
        match level {
            Level::Easy => &self.easy,
            Level::Medium => &self.medium,
            Level::Hard => &self.hard,
        }
    }

    /// Fire interval for the player's current rapid-fire state.
    pub fn player_fire_interval(&self, rapid_fire: bool) -> f64 {
        if rapid_fire {
            self.rapid_fire_interval_ms
        } else {
            self.fire_interval_ms
        }
    }

    /// Enemies spawned per wave after `elapsed_ms` on the given tier.
    pub fn wave_size(&self, level: Level, elapsed_ms: f64) -> u32 {
        let multiplier = self.difficulty(level).enemy_count_multiplier;
        let grown = (1.0 + elapsed_ms * multiplier * self.wave_growth_per_ms).floor() as u32;
        grown.clamp(1, self.max_wave.max(1))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = toml::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let text = std::fs::read_to_string(path).map_err(|source| TuningError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from `STAR_ACE_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> Result<Self, TuningError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return Err(TuningError::Invalid(
                "field_width and field_height must be positive".into(),
            ));
        }
        if self.field_width < self.player_size || self.field_width < self.enemy_size {
            return Err(TuningError::Invalid(
                "field_width must fit the player and enemies".into(),
            ));
        }
        if self.field_height <= self.player_bottom_offset {
            return Err(TuningError::Invalid(
                "field_height must exceed player_bottom_offset".into(),
            ));
        }
        if self.max_hp == 0 {
            return Err(TuningError::Invalid("max_hp must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.power_up_drop_chance) {
            return Err(TuningError::Invalid(
                "power_up_drop_chance must be within 0..=1".into(),
            ));
        }
        Ok(())
    }
}
