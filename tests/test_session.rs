use std::cell::RefCell;
use std::rc::Rc;

use star_ace::entities::*;
use star_ace::session::{GameSession, SessionError};
use star_ace::tuning::{Tuning, TuningError};

const FRAME_MS: f64 = 16.0;

fn running(level: Level) -> GameSession {
    running_with(Tuning::default(), level)
}

fn running_with(tuning: Tuning, level: Level) -> GameSession {
    let mut s = GameSession::seeded(tuning, 0, 7).unwrap();
    s.select_difficulty(level).unwrap();
    s.start().unwrap();
    s
}

/// Records every score the session reports.
fn capture_scores(s: &mut GameSession) -> Rc<RefCell<Vec<u32>>> {
    let scores = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&scores);
    s.on_game_over(move |score| sink.borrow_mut().push(score));
    scores
}

fn enemy_shot_on_player(s: &GameSession) -> Projectile {
    let p = &s.world().player;
    Projectile {
        x: p.x + p.size / 2.0 - 3.0,
        y: p.y + 5.0,
        w: 6.0,
        h: 15.0,
        vy: 5.0,
        owner: BulletOwner::Enemy,
    }
}

fn pickup_on_player(s: &GameSession, kind: PowerUpKind) -> PowerUp {
    let p = &s.world().player;
    PowerUp {
        x: p.x + 5.0,
        y: p.y + 5.0,
        size: 30.0,
        speed: 3.0,
        kind,
    }
}

/// Kill the player on the next frame.
fn finish_run(s: &mut GameSession) {
    s.world_mut().player.hp = 1;
    let shot = enemy_shot_on_player(s);
    s.world_mut().projectiles.push(shot);
    s.tick(FRAME_MS).unwrap();
    assert_eq!(s.phase(), Phase::Over);
}

// ── phase machine ─────────────────────────────────────────────────────────────

#[test]
fn phases_follow_the_lifecycle() {
    let mut s = GameSession::seeded(Tuning::default(), 0, 1).unwrap();
    assert_eq!(s.phase(), Phase::AwaitingDifficulty);
    assert_eq!(
        s.start(),
        Err(SessionError::InvalidTransition {
            op: "start",
            phase: Phase::AwaitingDifficulty
        })
    );
    assert!(s.tick(FRAME_MS).is_err());

    s.select_difficulty(Level::Medium).unwrap();
    assert_eq!(s.phase(), Phase::AwaitingStart);
    assert_eq!(s.level(), Some(Level::Medium));
    assert!(s.select_difficulty(Level::Hard).is_err());
    assert!(s.advance(0.0).is_err());

    s.start().unwrap();
    assert_eq!(s.phase(), Phase::Running);
    assert!(s.select_difficulty(Level::Hard).is_err());
    assert!(s.start().is_err());
    assert_eq!(s.level(), Some(Level::Medium));

    s.reset();
    assert_eq!(s.phase(), Phase::AwaitingDifficulty);
    assert_eq!(s.level(), None);
}

#[test]
fn unusable_tuning_is_refused_up_front() {
    let greedy = Tuning {
        power_up_drop_chance: 1.5,
        ..Tuning::default()
    };
    assert!(matches!(
        GameSession::seeded(greedy, 0, 1),
        Err(TuningError::Invalid(_))
    ));

    let flat = Tuning {
        field_height: 0.0,
        ..Tuning::default()
    };
    assert!(matches!(
        GameSession::new(flat, 0),
        Err(TuningError::Invalid(_))
    ));
}

#[test]
fn start_places_a_fresh_player() {
    let s = running(Level::Easy);
    let w = s.world();
    assert_eq!((w.player.x, w.player.y), (180.0, 500.0));
    assert_eq!(w.player.hp, 3);
    assert_eq!(w.score, 0);
    assert!(w.enemies.is_empty() && w.projectiles.is_empty() && w.power_ups.is_empty());
    assert_eq!(w.stars.len(), 100);
    assert_eq!(s.elapsed_ms(), 0.0);
}

#[test]
fn restart_from_over_keeps_the_tier() {
    let mut s = running(Level::Hard);
    for _ in 0..100 {
        s.tick(FRAME_MS).unwrap();
    }
    s.world_mut().score = 70;
    finish_run(&mut s);

    s.start().unwrap();
    assert_eq!(s.phase(), Phase::Running);
    assert_eq!(s.level(), Some(Level::Hard));
    assert_eq!(s.score(), 0);
    assert_eq!(s.hp(), 3);
    assert_eq!(s.elapsed_ms(), 0.0);
    assert!(s.world().enemies.is_empty());
    assert_eq!(s.high_score(), 70);
}

// ── scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn three_quiet_seconds_on_easy_spawn_and_fire() {
    let mut s = running(Level::Easy);
    while s.elapsed_ms() < 3000.0 {
        s.tick(FRAME_MS).unwrap();
    }
    let w = s.world();
    // The first enemy may already have been shot down.
    assert!(!w.enemies.is_empty() || w.score > 0);
    assert!(w.shots(BulletOwner::Player).count() > 0);
    assert_eq!(s.phase(), Phase::Running);
}

#[test]
fn nothing_spawns_before_the_first_interval() {
    let mut s = running(Level::Easy);
    while s.elapsed_ms() + FRAME_MS <= 2500.0 {
        s.tick(FRAME_MS).unwrap();
    }
    assert!(s.world().enemies.is_empty());
    assert_eq!(s.score(), 0);
}

#[test]
fn last_hit_ends_the_run_in_the_same_frame() {
    let mut s = running(Level::Easy);
    let scores = capture_scores(&mut s);
    s.world_mut().score = 40;
    s.world_mut().player.hp = 1;
    let shot = enemy_shot_on_player(&s);
    s.world_mut().projectiles.push(shot);

    s.tick(FRAME_MS).unwrap();

    assert_eq!(s.hp(), 0);
    assert_eq!(s.phase(), Phase::Over);
    assert_eq!(*scores.borrow(), vec![40]);
    assert_eq!(
        s.tick(FRAME_MS),
        Err(SessionError::InvalidTransition {
            op: "advance",
            phase: Phase::Over
        })
    );
    assert_eq!(scores.borrow().len(), 1);
}

#[test]
fn health_stays_in_range_and_over_fires_once() {
    let mut s = running(Level::Hard);
    let scores = capture_scores(&mut s);
    let mut frames = 0;

    while s.phase() == Phase::Running && frames < 40_000 {
        // Sweep across the field to meet enemy fire.
        let sweep = 200.0 + 180.0 * ((frames as f32) / 90.0).sin();
        s.steer_to(sweep);
        let before = s.hp();
        s.tick(FRAME_MS).unwrap();
        assert!(s.hp() <= 3);
        assert!(s.hp() + 1 >= before, "lost more than one hp in a frame");
        if s.hp() == 0 {
            assert_eq!(s.phase(), Phase::Over);
        } else {
            assert_eq!(s.phase(), Phase::Running);
        }
        frames += 1;
    }

    assert!(scores.borrow().len() <= 1);
    if s.phase() == Phase::Over {
        assert_eq!(*scores.borrow(), vec![s.score()]);
    }
}

// ── protection windows ────────────────────────────────────────────────────────

#[test]
fn shield_then_invulnerability_block_every_hit() {
    let mut s = running(Level::Medium);
    s.world_mut().player.shield.start(0.0);

    while s.elapsed_ms() < 9_900.0 {
        let shot = enemy_shot_on_player(&s);
        s.world_mut().projectiles.push(shot);
        s.tick(FRAME_MS).unwrap();
        assert_eq!(s.hp(), 3);
    }

    // Shield lapses; keep firing until the first hit lands.
    let mut hit_at = None;
    for _ in 0..40 {
        let shot = enemy_shot_on_player(&s);
        s.world_mut().projectiles.push(shot);
        s.tick(FRAME_MS).unwrap();
        if s.hp() < 3 {
            hit_at = Some(s.elapsed_ms());
            break;
        }
    }
    let hit_at = hit_at.expect("shield never expired");
    assert!(hit_at > 10_000.0);
    assert_eq!(s.hp(), 2);

    while s.elapsed_ms() < hit_at + 1_400.0 {
        let shot = enemy_shot_on_player(&s);
        s.world_mut().projectiles.push(shot);
        s.tick(FRAME_MS).unwrap();
        assert!(s.hp() >= 2, "hit during invulnerability");
    }
}

#[test]
fn recollected_power_up_never_stacks() {
    let mut s = running(Level::Easy);
    let pickup = pickup_on_player(&s, PowerUpKind::RapidFire);
    s.world_mut().power_ups.push(pickup);
    s.tick(FRAME_MS).unwrap();
    assert!(s.world().player.rapid_fire.is_active());

    while s.elapsed_ms() < 5_000.0 {
        s.tick(FRAME_MS).unwrap();
        if s.phase() != Phase::Running {
            return;
        }
    }
    let pickup = pickup_on_player(&s, PowerUpKind::RapidFire);
    s.world_mut().power_ups.push(pickup);
    s.tick(FRAME_MS).unwrap();

    let view = s.view();
    assert!(view.rapid_fire_ms <= 10_000.0);
    assert!(view.rapid_fire_ms > 9_900.0);
}

// ── high score ────────────────────────────────────────────────────────────────

#[test]
fn high_score_is_the_max_of_old_and_final() {
    let mut s = GameSession::seeded(Tuning::default(), 100, 3).unwrap();
    let scores = capture_scores(&mut s);
    s.select_difficulty(Level::Easy).unwrap();

    s.start().unwrap();
    s.world_mut().score = 50;
    finish_run(&mut s);
    assert_eq!(s.high_score(), 100);
    assert!(!s.view().new_best);

    s.start().unwrap();
    s.world_mut().score = 100;
    finish_run(&mut s);
    assert_eq!(s.high_score(), 100);
    assert!(!s.view().new_best);

    s.start().unwrap();
    s.world_mut().score = 150;
    finish_run(&mut s);
    assert_eq!(s.high_score(), 150);
    assert!(s.view().new_best);

    s.start().unwrap();
    assert!(!s.view().new_best);
    s.world_mut().score = 20;
    finish_run(&mut s);
    assert_eq!(s.high_score(), 150);
    assert!(!s.view().new_best);

    assert_eq!(*scores.borrow(), vec![50, 100, 150, 20]);
}

// ── clock & pause ─────────────────────────────────────────────────────────────

#[test]
fn first_frame_sets_the_baseline() {
    let mut s = running(Level::Easy);
    s.advance(5_000.0).unwrap();
    assert_eq!(s.elapsed_ms(), 0.0);
    s.advance(5_016.0).unwrap();
    assert_eq!(s.elapsed_ms(), 16.0);
    // A clock going backwards contributes nothing.
    s.advance(5_010.0).unwrap();
    assert_eq!(s.elapsed_ms(), 16.0);
}

#[test]
fn paused_time_never_reaches_the_session_clock() {
    let mut s = running(Level::Easy);
    s.advance(1_000.0).unwrap();
    s.advance(1_016.0).unwrap();

    s.pause().unwrap();
    assert!(s.is_paused());
    let x = s.world().player.x;
    s.nudge(1.0);
    assert_eq!(s.world().player.x, x);
    s.advance(5_000.0).unwrap();
    s.tick(500.0).unwrap();
    assert_eq!(s.elapsed_ms(), 16.0);

    s.toggle_pause(60_000.0).unwrap();
    assert!(!s.is_paused());
    s.advance(60_016.0).unwrap();
    assert_eq!(s.elapsed_ms(), 32.0);
}

#[test]
fn pause_is_only_valid_while_running() {
    let mut s = GameSession::seeded(Tuning::default(), 0, 1).unwrap();
    assert!(s.pause().is_err());
    assert!(s.resume(0.0).is_err());
}

// ── input ─────────────────────────────────────────────────────────────────────

#[test]
fn pointer_input_is_clamped_to_the_field() {
    let mut s = running(Level::Easy);
    s.steer_to(-500.0);
    assert_eq!(s.world().player.x, 0.0);
    s.steer_to(5_000.0);
    assert_eq!(s.world().player.x, 360.0);
    s.steer_to(100.0);
    assert_eq!(s.world().player.x, 80.0);
    s.nudge(-1.0);
    assert_eq!(s.world().player.x, 60.0);
}

#[test]
fn input_is_ignored_outside_a_run() {
    let mut s = GameSession::seeded(Tuning::default(), 0, 1).unwrap();
    let x = s.world().player.x;
    s.steer_to(0.0);
    assert_eq!(s.world().player.x, x);
}

#[test]
fn manual_fire_needs_the_fire_intent() {
    let tuning = Tuning {
        auto_fire: false,
        ..Tuning::default()
    };
    let mut s = running_with(tuning, Level::Easy);
    for _ in 0..30 {
        s.tick(FRAME_MS).unwrap();
    }
    assert_eq!(s.world().shots(BulletOwner::Player).count(), 0);

    s.set_fire_held(true);
    s.tick(FRAME_MS).unwrap();
    assert_eq!(s.world().shots(BulletOwner::Player).count(), 1);
}
