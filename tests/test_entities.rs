use star_ace::entities::*;

const FIELD: Field = Field {
    width: 400.0,
    height: 600.0,
};

#[test]
fn enums_compare_by_variant() {
    assert_eq!(Level::Easy, Level::Easy);
    assert_ne!(Level::Easy, Level::Hard);
    assert_eq!(Level::ALL.len(), 3);
    assert_eq!(Level::Medium.label(), "Medium");
    assert_ne!(BulletOwner::Player, BulletOwner::Enemy);
    assert_eq!(PowerUpKind::ALL.len(), 4);
}

#[test]
fn touching_edges_do_not_overlap() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(a.overlaps(&Rect::new(9.0, 9.0, 10.0, 10.0)));
    assert!(!a.overlaps(&Rect::new(10.0, 0.0, 10.0, 10.0)));
    assert!(!a.overlaps(&Rect::new(0.0, 10.0, 10.0, 10.0)));
    assert!(Rect::new(2.0, 2.0, 2.0, 2.0).overlaps(&a));
    assert_eq!(a.center(), (5.0, 5.0));
}

#[test]
fn world_starts_empty_with_player_at_bottom_centre() {
    let w = World::new(FIELD, 40.0, 100.0, 3);
    assert_eq!((w.player.x, w.player.y), (180.0, 500.0));
    assert_eq!(w.player.hp, 3);
    assert!(!w.player.is_protected());
    assert_eq!(w.score, 0);
    assert!(w.projectiles.is_empty() && w.enemies.is_empty() && w.stars.is_empty());
}

#[test]
fn steering_clamps_to_the_field() {
    let mut p = Player::new(180.0, 500.0, 40.0, 3);
    p.steer_to(30.0, FIELD);
    assert_eq!(p.x, 10.0);
    p.steer_to(-1.0, FIELD);
    assert_eq!(p.x, 0.0);
    p.nudge(-20.0, FIELD);
    assert_eq!(p.x, 0.0);
    p.steer_to(399.0, FIELD);
    assert_eq!(p.x, 360.0);
    p.nudge(20.0, FIELD);
    assert_eq!(p.x, 360.0);
    p.nudge(-20.0, FIELD);
    assert_eq!(p.x, 340.0);
}

#[test]
fn protection_covers_shield_and_invulnerability() {
    let mut p = Player::new(0.0, 0.0, 40.0, 3);
    p.shield.start(0.0);
    assert!(p.is_protected());
    p.shield.clear();
    p.invulnerable.start(0.0);
    assert!(p.is_protected());
    p.invulnerable.clear();
    assert!(!p.is_protected());
}

#[test]
fn particle_alpha_tracks_remaining_life() {
    let mut p = Particle {
        x: 0.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
        life: 20.0,
        max_life: 40.0,
        size: 2.0,
        hue: 30.0,
        lightness: 0.6,
    };
    assert_eq!(p.alpha(), 0.5);
    p.life = -3.0;
    assert_eq!(p.alpha(), 0.0);
    p.max_life = 0.0;
    assert_eq!(p.alpha(), 0.0);
}

#[test]
fn shots_filter_by_owner() {
    let mut w = World::new(FIELD, 40.0, 100.0, 3);
    for owner in [BulletOwner::Player, BulletOwner::Enemy, BulletOwner::Player] {
        w.projectiles.push(Projectile {
            x: 0.0,
            y: 0.0,
            w: 6.0,
            h: 15.0,
            vy: 0.0,
            owner,
        });
    }
    assert_eq!(w.shots(BulletOwner::Player).count(), 2);
    assert_eq!(w.shots(BulletOwner::Enemy).count(), 1);
}
