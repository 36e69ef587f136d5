/// Per-frame simulation steps.
///
/// Each function applies one step of the frame to a mutable `World`.  They do
/// no timekeeping of their own: the session passes in the session clock
/// (`now`, in ms) and the frame's velocity scale.  All randomness comes
/// through the injected RNG so tests can seed it.

use rand::Rng;
use tracing::debug;

use crate::entities::{
    BulletOwner, Enemy, Level, Particle, Player, PowerUp, PowerUpKind, Projectile, Star, World,
};
use crate::timer::Cadence;
use crate::tuning::{Tuning, NOMINAL_FRAME_MS};

/// Velocity multiplier for a frame lasting `delta_ms`.
pub fn frame_scale(delta_ms: f64) -> f32 {
    (delta_ms / NOMINAL_FRAME_MS) as f32
}

// ── Spawning ──────────────────────────────────────────────────────────────────

/// Spawn one wave of enemies above the visible field.
///
/// Wave size and speed grow with elapsed session time.  Each enemy is
/// independently marked to drop a power-up with the tuned drop chance.
pub fn spawn_wave<R: Rng + ?Sized>(
    world: &mut World,
    tuning: &Tuning,
    level: Level,
    elapsed_ms: f64,
    rng: &mut R,
) -> usize {
    let params = tuning.difficulty(level);
    let count = tuning.wave_size(level, elapsed_ms);
    let speed = params.enemy_speed_at(elapsed_ms);
    let max_x = (world.field.width - tuning.enemy_size).max(0.0);

    for i in 0..count {
        let x = if max_x > 0.0 {
            rng.gen_range(0.0..max_x)
        } else {
            0.0
        };
        world.enemies.push(Enemy {
            x,
            y: -tuning.enemy_size - i as f32 * tuning.wave_row_spacing,
            size: tuning.enemy_size,
            speed,
            drops_power_up: rng.gen_bool(tuning.power_up_drop_chance),
            fire: Cadence::ready().with_jitter(tuning.enemy_fire_jitter),
        });
    }

    debug!(count, speed, elapsed_ms, "enemy wave spawned");
    count as usize
}

/// Scatter the cosmetic starfield across the whole field.
pub fn seed_stars<R: Rng + ?Sized>(world: &mut World, count: usize, rng: &mut R) {
    let (w, h) = (world.field.width, world.field.height);
    world.stars = (0..count)
        .map(|_| Star {
            x: rng.gen_range(0.0..w),
            y: rng.gen_range(0.0..h),
            size: rng.gen_range(0.5..2.5),
            speed: rng.gen_range(1.0..3.0),
        })
        .collect();
}

// ── Firing ────────────────────────────────────────────────────────────────────

/// Emit one player volley from the muzzle.
///
/// Plain fire is a single shot.  Wide-shot turns it into a three-shot fan and
/// rapid-fire adds one extra shot above the muzzle; the two stack.
pub fn player_volley(world: &mut World, tuning: &Tuning) -> usize {
    let player = &world.player;
    let muzzle_x = player.x + player.size / 2.0 - tuning.bullet_width / 2.0;
    let muzzle_y = player.y;
    let shot = |x: f32, y: f32| Projectile {
        x,
        y,
        w: tuning.bullet_width,
        h: tuning.bullet_height,
        vy: -tuning.player_bullet_speed,
        owner: BulletOwner::Player,
    };

    let mut volley = Vec::with_capacity(4);
    if player.wide_shot.is_active() {
        for i in -1..=1 {
            volley.push(shot(muzzle_x + i as f32 * tuning.wide_shot_spread, muzzle_y));
        }
    } else {
        volley.push(shot(muzzle_x, muzzle_y));
    }
    if player.rapid_fire.is_active() {
        volley.push(shot(muzzle_x, muzzle_y - tuning.rapid_fire_offset));
    }

    let fired = volley.len();
    world.projectiles.extend(volley);
    fired
}

/// Let every enemy past the entry line fire once its own cadence allows.
pub fn enemy_fire<R: Rng + ?Sized>(
    world: &mut World,
    tuning: &Tuning,
    level: Level,
    now: f64,
    rng: &mut R,
) -> usize {
    let interval = tuning.difficulty(level).enemy_fire_interval_ms;
    let mut fired = 0;

    for enemy in &mut world.enemies {
        // Only enemies already inside the field consume their cadence.
        if enemy.y > tuning.enemy_entry_y && enemy.fire.poll(now, interval, rng) {
            world.projectiles.push(Projectile {
                x: enemy.x + enemy.size / 2.0 - tuning.bullet_width / 2.0,
                y: enemy.y + enemy.size,
                w: tuning.bullet_width,
                h: tuning.bullet_height,
                vy: tuning.enemy_bullet_speed,
                owner: BulletOwner::Enemy,
            });
            fired += 1;
        }
    }
    fired
}

// ── Kinematics ────────────────────────────────────────────────────────────────

/// Move everything by its velocity times `scale`.
///
/// Enemies all travel at `enemy_speed`, the tier's current speed, so the
/// whole formation accelerates together as the run goes on.
pub fn integrate<R: Rng + ?Sized>(world: &mut World, enemy_speed: f32, scale: f32, rng: &mut R) {
    for p in &mut world.projectiles {
        p.y += p.vy * scale;
    }
    for e in &mut world.enemies {
        e.speed = enemy_speed;
        e.y += e.speed * scale;
    }
    for p in &mut world.power_ups {
        p.y += p.speed * scale;
    }
    for p in &mut world.particles {
        p.x += p.vx * scale;
        p.y += p.vy * scale;
        p.life -= scale;
    }

    let (w, h) = (world.field.width, world.field.height);
    for s in &mut world.stars {
        s.y += s.speed * scale;
        if s.y > h {
            s.y = 0.0;
            s.x = rng.gen_range(0.0..w);
        }
    }
}

// ── Collisions ────────────────────────────────────────────────────────────────

/// Outcome of resolving player shots against enemies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KillReport {
    pub kills: u32,
    pub drops: u32,
}

/// Player shots × enemies.
///
/// Each enemy is matched with at most one live shot, and a consumed shot is
/// never matched again, so overlapping shots on one enemy score once.
pub fn resolve_kills<R: Rng + ?Sized>(world: &mut World, tuning: &Tuning, rng: &mut R) -> KillReport {
    let mut shot_used = vec![false; world.projectiles.len()];
    let mut enemy_dead = vec![false; world.enemies.len()];
    let mut wrecks: Vec<(f32, f32, bool)> = Vec::new();

    for (ei, enemy) in world.enemies.iter().enumerate() {
        let body = enemy.rect();
        let hit = world
            .projectiles
            .iter()
            .enumerate()
            .find(|(bi, b)| {
                !shot_used[*bi] && b.owner == BulletOwner::Player && b.rect().overlaps(&body)
            })
            .map(|(bi, _)| bi);

        if let Some(bi) = hit {
            shot_used[bi] = true;
            enemy_dead[ei] = true;
            let (cx, cy) = body.center();
            wrecks.push((cx, cy, enemy.drops_power_up));
        }
    }

    if wrecks.is_empty() {
        return KillReport::default();
    }

    retain_unmarked(&mut world.enemies, &enemy_dead);
    retain_unmarked(&mut world.projectiles, &shot_used);

    let mut report = KillReport::default();
    for (cx, cy, drops) in wrecks {
        report.kills += 1;
        world.score = world.score.saturating_add(tuning.kill_bonus);
        explode(&mut world.particles, cx, cy, tuning, rng);
        if drops {
            let kind = PowerUpKind::ALL[rng.gen_range(0..PowerUpKind::ALL.len())];
            world.power_ups.push(PowerUp {
                x: cx - tuning.pickup_size / 2.0,
                y: cy,
                size: tuning.pickup_size,
                speed: tuning.pickup_speed,
                kind,
            });
            report.drops += 1;
        }
    }
    report
}

/// Enemy shots, then enemy bodies × player.
///
/// Skipped entirely while the player is shielded or invulnerable.  The first
/// hit starts the invulnerability window, which blocks every later hit in the
/// same frame.  Returns true if the player was hit.
pub fn resolve_player_hits<R: Rng + ?Sized>(
    world: &mut World,
    tuning: &Tuning,
    now: f64,
    rng: &mut R,
) -> bool {
    if world.player.is_protected() {
        return false;
    }
    let hull = world.player.rect();

    let shot = world
        .projectiles
        .iter()
        .position(|b| b.owner == BulletOwner::Enemy && b.rect().overlaps(&hull));
    if let Some(i) = shot {
        world.projectiles.remove(i);
        take_damage(world, tuning, now, rng);
        return true;
    }

    let rammer = world.enemies.iter().position(|e| e.rect().overlaps(&hull));
    if let Some(i) = rammer {
        world.enemies.remove(i);
        take_damage(world, tuning, now, rng);
        return true;
    }

    false
}

fn take_damage<R: Rng + ?Sized>(world: &mut World, tuning: &Tuning, now: f64, rng: &mut R) {
    let player = &mut world.player;
    player.hp = player.hp.saturating_sub(1);
    player.invulnerable.start(now);
    let (cx, cy) = player.rect().center();
    debug!(hp = player.hp, now, "player hit");
    explode(&mut world.particles, cx, cy, tuning, rng);
}

/// Pickups × player.  Applies and removes every pickup the player touches.
pub fn collect_power_ups(world: &mut World, tuning: &Tuning, now: f64) -> Vec<PowerUpKind> {
    let hull = world.player.rect();
    let mut collected = Vec::new();

    world.power_ups.retain(|p| {
        if p.rect().overlaps(&hull) {
            collected.push(p.kind);
            false
        } else {
            true
        }
    });

    for &kind in &collected {
        apply_power_up(&mut world.player, kind, now, tuning.max_hp);
        debug!(?kind, now, "power-up collected");
    }
    collected
}

/// Apply a power-up.  Timed kinds restart their window rather than extend it.
pub fn apply_power_up(player: &mut Player, kind: PowerUpKind, now: f64, max_hp: u32) {
    match kind {
        PowerUpKind::RapidFire => player.rapid_fire.start(now),
        PowerUpKind::WideShot => player.wide_shot.start(now),
        PowerUpKind::Shield => player.shield.start(now),
        PowerUpKind::Heal => player.hp = (player.hp + 1).min(max_hp),
    }
}

// ── Housekeeping ──────────────────────────────────────────────────────────────

/// Close every effect window that has run past its duration.
pub fn expire_effects(player: &mut Player, tuning: &Tuning, now: f64) {
    player.rapid_fire.expire(now, tuning.power_up_ms);
    player.wide_shot.expire(now, tuning.power_up_ms);
    player.shield.expire(now, tuning.shield_ms);
    player.invulnerable.expire(now, tuning.invulnerable_ms);
}

/// Drop everything that has left the field or burned out.
pub fn cull(world: &mut World) {
    let height = world.field.height;
    world.enemies.retain(|e| e.y < height);
    world.power_ups.retain(|p| p.y < height + p.size);
    world.projectiles.retain(|b| match b.owner {
        BulletOwner::Player => b.y > -b.h,
        BulletOwner::Enemy => b.y < height + b.h,
    });
    world.particles.retain(|p| p.life > 0.0);
}

/// Burst of cosmetic particles centred on (x, y).
pub fn explode<R: Rng + ?Sized>(
    particles: &mut Vec<Particle>,
    x: f32,
    y: f32,
    tuning: &Tuning,
    rng: &mut R,
) {
    let spread = tuning.particle_speed;
    particles.extend((0..tuning.explosion_particles).map(|_| Particle {
        x,
        y,
        vx: (rng.gen::<f32>() - 0.5) * spread,
        vy: (rng.gen::<f32>() - 0.5) * spread,
        life: tuning.particle_life,
        max_life: tuning.particle_life,
        size: rng.gen_range(2.0..6.0),
        hue: rng.gen_range(10.0..70.0),
        lightness: rng.gen_range(0.5..0.8),
    }));
}

fn retain_unmarked<T>(items: &mut Vec<T>, marked: &[bool]) {
    let mut idx = 0;
    items.retain(|_| {
        let keep = !marked[idx];
        idx += 1;
        keep
    });
}
