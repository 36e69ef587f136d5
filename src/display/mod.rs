/// Rendering layer.
///
/// `render` paints a `SessionView` into a `Raster`; it never touches the
/// session.  The `terminal` submodule is the only place that talks to the
/// real terminal.

pub mod raster;
pub mod terminal;

use crate::entities::{
    BulletOwner, Enemy, Field, Level, Phase, PowerUp, PowerUpKind, Projectile,
};
use crate::session::SessionView;

pub use raster::{Cell, CellStyle, Raster, Rgb};

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Rgb = Rgb::new(40, 60, 140);
const C_HUD_SCORE: Rgb = Rgb::new(250, 204, 21);
const C_HUD_LIVES: Rgb = Rgb::new(239, 68, 68);
const C_HUD_LOST: Rgb = Rgb::new(90, 90, 90);
const C_PLAYER: Rgb = Rgb::new(59, 130, 246);
const C_SHIELD: Rgb = Rgb::new(96, 165, 250);
const C_ENEMY: Rgb = Rgb::new(239, 68, 68);
const C_BULLET_PLAYER: Rgb = Rgb::new(251, 191, 36);
const C_BULLET_ENEMY: Rgb = Rgb::new(220, 38, 38);
const C_STAR: Rgb = Rgb::new(150, 150, 170);
const C_HINT: Rgb = Rgb::new(110, 110, 110);
const C_TITLE: Rgb = Rgb::new(34, 211, 238);
const C_TEXT: Rgb = Rgb::new(230, 230, 230);
const C_EASY: Rgb = Rgb::new(22, 163, 74);
const C_MEDIUM: Rgb = Rgb::new(202, 138, 4);
const C_HARD: Rgb = Rgb::new(220, 38, 38);

// ── Viewport ──────────────────────────────────────────────────────────────────

/// Maps field pixels onto the bordered play area of the raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub left: u16,
    pub top: u16,
    pub cols: u16,
    pub rows: u16,
    pub field: Field,
}

impl Viewport {
    /// Play area inside the border: HUD on row 0, border rows 1 and
    /// height-2, hint on the last row.
    pub fn for_raster(width: u16, height: u16, field: Field) -> Self {
        Self {
            left: 1,
            top: 2,
            cols: width.saturating_sub(2).max(1),
            rows: height.saturating_sub(4).max(1),
            field,
        }
    }

    /// Cell holding field point (x, y), if it is inside the play area.
    pub fn cell(&self, x: f32, y: f32) -> Option<(u16, u16)> {
        if x < 0.0 || y < 0.0 || x >= self.field.width || y >= self.field.height {
            return None;
        }
        let cx = (x / self.field.width * self.cols as f32) as u16;
        let cy = (y / self.field.height * self.rows as f32) as u16;
        Some((self.left + cx.min(self.cols - 1), self.top + cy.min(self.rows - 1)))
    }

    /// Field x at the centre of terminal column `col`, clamped to the field.
    pub fn field_x(&self, col: u16) -> f32 {
        let rel = col.saturating_sub(self.left).min(self.cols - 1) as f32 + 0.5;
        (rel / self.cols as f32 * self.field.width).clamp(0.0, self.field.width)
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame.
pub fn render(raster: &mut Raster, view: &SessionView, caption: &str) {
    raster.clear();
    let vp = Viewport::for_raster(raster.width(), raster.height(), view.field);

    draw_border(raster);
    draw_hud(raster, view);

    match view.phase {
        Phase::AwaitingDifficulty => draw_menu(raster, view),
        Phase::AwaitingStart => draw_start_prompt(raster, view, caption),
        Phase::Running | Phase::Over => {
            draw_stars(raster, view, &vp);
            for p in view.projectiles {
                draw_projectile(raster, p, &vp);
            }
            for e in view.enemies {
                draw_enemy(raster, e, &vp);
            }
            for p in view.power_ups {
                draw_power_up(raster, p, &vp);
            }
            draw_particles(raster, view, &vp);
            draw_player(raster, view, &vp);
            if view.paused {
                draw_pause(raster);
            }
            if view.phase == Phase::Over {
                draw_game_over(raster, view);
            }
        }
    }

    draw_controls_hint(raster, view);
}

// ── Border & HUD ──────────────────────────────────────────────────────────────

fn draw_border(raster: &mut Raster) {
    let w = raster.width() as usize;
    let h = raster.height();
    let style = CellStyle::fg(C_BORDER);

    raster.put_str(0, 1, &format!("┌{}┐", "─".repeat(w.saturating_sub(2))), style);
    raster.put_str(
        0,
        h.saturating_sub(2),
        &format!("└{}┘", "─".repeat(w.saturating_sub(2))),
        style,
    );
    for row in 2..h.saturating_sub(2) {
        raster.put_char(0, row, '│', style);
        raster.put_char(raster.width().saturating_sub(1), row, '│', style);
    }
}

fn draw_hud(raster: &mut Raster, view: &SessionView) {
    raster.put_str(
        1,
        0,
        &format!("Score:{:>6}  Best:{:>6}", view.score, view.high_score),
        CellStyle::bold(C_HUD_SCORE),
    );

    if let Some(level) = view.level {
        let tag = format!("[ {} ]", level.label().to_uppercase());
        raster.put_centered(0, &tag, CellStyle::fg(level_color(level)));
    }

    // Right side: active power-ups, then hearts out of the maximum.
    let mut right: Vec<(String, Rgb)> = view
        .active_power_ups()
        .into_iter()
        .map(|(kind, ms)| {
            let secs = (ms / 1000.0).ceil() as u32;
            (format!("{} {:>2}s] ", power_up_label(kind), secs), power_up_color(kind))
        })
        .collect();
    let hearts: String = (0..view.max_hp)
        .map(|i| if i < view.player.hp { '♥' } else { '♡' })
        .collect();
    right.push((hearts, C_HUD_LIVES));

    let total: usize = right.iter().map(|(s, _)| s.chars().count()).sum();
    let mut x = raster.width().saturating_sub(total as u16 + 1);
    for (text, color) in right {
        let color = if color == C_HUD_LIVES && view.player.hp == 0 {
            C_HUD_LOST
        } else {
            color
        };
        raster.put_str(x, 0, &text, CellStyle::fg(color));
        x = x.saturating_add(text.chars().count() as u16);
    }
}

fn draw_controls_hint(raster: &mut Raster, view: &SessionView) {
    let hint = match view.phase {
        Phase::AwaitingDifficulty => "1/2/3 : Difficulty   Q : Quit",
        Phase::AwaitingStart => "ENTER : Start   M : Menu   Q : Quit",
        Phase::Running => "Mouse / ← → : Move   P : Pause   M : Menu   Q : Quit",
        Phase::Over => "R : Play Again   M : Menu   Q : Quit",
    };
    raster.put_str(1, raster.height().saturating_sub(1), hint, CellStyle::fg(C_HINT));
}

// ── Menus ─────────────────────────────────────────────────────────────────────

fn draw_menu(raster: &mut Raster, view: &SessionView) {
    let cy = raster.height() / 2;
    let cx = raster.width() / 2;

    raster.put_centered(cy.saturating_sub(6), "★  STAR  ACE  ★", CellStyle::bold(C_TITLE));
    if view.high_score > 0 {
        raster.put_centered(
            cy.saturating_sub(5),
            &format!("Best Score: {}", view.high_score),
            CellStyle::fg(C_HUD_SCORE),
        );
    }
    raster.put_str(cx.saturating_sub(14), cy.saturating_sub(3), "Select difficulty:", CellStyle::fg(C_TEXT));

    let options: [(&str, Level, &str); 3] = [
        ("1", Level::Easy, "Slow enemies, relaxed pace"),
        ("2", Level::Medium, "Balanced challenge"),
        ("3", Level::Hard, "Fast and relentless!"),
    ];
    for (i, (key, level, desc)) in options.iter().enumerate() {
        let row = cy.saturating_sub(1) + i as u16;
        let x = cx.saturating_sub(14);
        raster.put_str(x, row, &format!("[{}] ", key), CellStyle::fg(C_HINT));
        raster.put_str(x + 4, row, &format!("{:<7}", level.label()), CellStyle::bold(level_color(*level)));
        raster.put_str(x + 11, row, &format!(" - {}", desc), CellStyle::fg(C_HINT));
    }

    raster.put_str(cx.saturating_sub(14), cy + 3, "Power-ups (catch falling items):", CellStyle::fg(C_HINT));
    let legend: [(PowerUpKind, &str); 4] = [
        (PowerUpKind::RapidFire, " Rapid fire - faster shots"),
        (PowerUpKind::WideShot, " Wide shot  - 3-way fire"),
        (PowerUpKind::Shield, " Shield     - no damage"),
        (PowerUpKind::Heal, " Heal       - +1 health"),
    ];
    for (i, (kind, desc)) in legend.iter().enumerate() {
        let row = cy + 4 + i as u16;
        let x = cx.saturating_sub(14);
        raster.put_char(x, row, power_up_glyph(*kind), CellStyle::bold(power_up_color(*kind)));
        raster.put_str(x + 1, row, desc, CellStyle::fg(C_HINT));
    }
}

fn draw_start_prompt(raster: &mut Raster, view: &SessionView, caption: &str) {
    let cy = raster.height() / 2;
    raster.put_centered(cy.saturating_sub(4), "★  STAR  ACE  ★", CellStyle::bold(C_TITLE));
    if let Some(level) = view.level {
        raster.put_centered(
            cy.saturating_sub(2),
            &format!("Difficulty: {}", level.label()),
            CellStyle::fg(level_color(level)),
        );
    }
    raster.put_centered(cy, "Move with the mouse or ← →", CellStyle::fg(C_TEXT));
    raster.put_centered(cy + 2, "Press ENTER to launch", CellStyle::bold(C_HUD_SCORE));

    let max = raster.width().saturating_sub(4) as usize;
    for (i, line) in wrap(caption, max).iter().enumerate() {
        raster.put_centered(cy + 4 + i as u16, line, CellStyle::fg(C_SHIELD));
    }
}

fn draw_pause(raster: &mut Raster) {
    let cy = raster.height() / 2;
    raster.put_centered(cy, "║  PAUSED  ║", CellStyle::bold(C_TEXT));
    raster.put_centered(cy + 1, "P : Resume", CellStyle::fg(C_HINT));
}

fn draw_game_over(raster: &mut Raster, view: &SessionView) {
    let new_best = view.new_best;
    let best_line = if new_best {
        format!("★ NEW BEST: {:>6} ★", view.high_score)
    } else {
        format!("Best Score:  {:>6}", view.high_score)
    };

    let top = (raster.height() / 2).saturating_sub(3);
    let panel = CellStyle::bold(C_ENEMY);
    raster.put_centered(top, "╔════════════════════╗", panel);
    raster.put_centered(top + 1, "║    GAME  OVER      ║", panel);
    raster.put_centered(top + 2, "╚════════════════════╝", panel);
    raster.put_centered(top + 3, &format!("Final Score: {:>6}", view.score), CellStyle::fg(C_HUD_SCORE));
    raster.put_centered(
        top + 4,
        &best_line,
        CellStyle::fg(if new_best { C_HUD_SCORE } else { C_HINT }),
    );
    raster.put_centered(top + 5, "R - Play Again  Q - Quit", CellStyle::fg(C_TEXT));
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn draw_stars(raster: &mut Raster, view: &SessionView, vp: &Viewport) {
    for star in view.stars {
        if let Some((x, y)) = vp.cell(star.x, star.y) {
            let ch = if star.size > 1.8 { '•' } else { '·' };
            raster.put_char(x, y, ch, CellStyle::fg(C_STAR.faded(0.4 + star.size / 5.0)));
        }
    }
}

fn draw_projectile(raster: &mut Raster, p: &Projectile, vp: &Viewport) {
    let (cx, cy) = p.rect().center();
    if let Some((x, y)) = vp.cell(cx, cy) {
        match p.owner {
            BulletOwner::Player => raster.put_char(x, y, '║', CellStyle::bold(C_BULLET_PLAYER)),
            BulletOwner::Enemy => raster.put_char(x, y, '↓', CellStyle::bold(C_BULLET_ENEMY)),
        }
    }
}

fn draw_enemy(raster: &mut Raster, e: &Enemy, vp: &Viewport) {
    // Sprite:
    //   «◆»    ← hull
    //    ▼     ← nose
    if e.y + e.size <= 0.0 {
        return;
    }
    let (cx, _) = e.rect().center();
    let style = CellStyle::bold(C_ENEMY);
    if let Some((x, y)) = vp.cell(cx, e.y.max(0.0)) {
        raster.put_str(x.saturating_sub(1), y, "«◆»", style);
        if let Some((_, ny)) = vp.cell(cx, e.y + e.size * 0.75) {
            if ny > y {
                raster.put_char(x, ny, '▼', style);
            }
        }
    }
}

fn draw_power_up(raster: &mut Raster, p: &PowerUp, vp: &Viewport) {
    let (cx, cy) = p.rect().center();
    if let Some((x, y)) = vp.cell(cx, cy) {
        raster.put_char(x, y, power_up_glyph(p.kind), CellStyle::bold(power_up_color(p.kind)));
    }
}

fn draw_particles(raster: &mut Raster, view: &SessionView, vp: &Viewport) {
    for p in view.particles {
        let alpha = p.alpha();
        if alpha <= 0.0 {
            continue;
        }
        if let Some((x, y)) = vp.cell(p.x, p.y) {
            let ch = if alpha > 0.66 {
                '✶'
            } else if alpha > 0.33 {
                '+'
            } else {
                '·'
            };
            let color = Rgb::from_hsl(p.hue, 1.0, p.lightness).faded(alpha);
            raster.put_char(x, y, ch, CellStyle::fg(color));
        }
    }
}

fn draw_player(raster: &mut Raster, view: &SessionView, vp: &Viewport) {
    if !view.player_visible() {
        return;
    }
    // Sprite:
    //    ▲       ← nose   (top row)
    //   /█\      ← wings  (bottom row)
    let rect = view.player.rect();
    let (cx, _) = rect.center();
    let style = CellStyle::bold(C_PLAYER);

    let Some((x, top)) = vp.cell(cx, rect.y) else {
        return;
    };
    raster.put_char(x, top, '▲', style);
    let wing_row = vp
        .cell(cx, rect.y + rect.h * 0.75)
        .map(|(_, y)| y)
        .filter(|&y| y > top)
        .unwrap_or(top + 1);
    raster.put_str(x.saturating_sub(1), wing_row, "/█\\", style);

    if view.shielded() {
        let ring = CellStyle::bold(C_SHIELD);
        raster.put_char(x.saturating_sub(2), wing_row, '(', ring);
        raster.put_char(x.saturating_add(2), wing_row, ')', ring);
        raster.put_char(x, top.saturating_sub(1), '‿', ring);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn power_up_glyph(kind: PowerUpKind) -> char {
    match kind {
        PowerUpKind::RapidFire => '★',
        PowerUpKind::WideShot => '✦',
        PowerUpKind::Shield => '◉',
        PowerUpKind::Heal => '♥',
    }
}

fn power_up_color(kind: PowerUpKind) -> Rgb {
    match kind {
        PowerUpKind::RapidFire => Rgb::new(251, 191, 36),
        PowerUpKind::WideShot => Rgb::new(168, 85, 247),
        PowerUpKind::Shield => Rgb::new(59, 130, 246),
        PowerUpKind::Heal => Rgb::new(239, 68, 68),
    }
}

fn power_up_label(kind: PowerUpKind) -> &'static str {
    match kind {
        PowerUpKind::RapidFire => "[★ RAPID",
        PowerUpKind::WideShot => "[✦ WIDE",
        PowerUpKind::Shield => "[◉ SHIELD",
        PowerUpKind::Heal => "[♥ HEAL",
    }
}

fn level_color(level: Level) -> Rgb {
    match level {
        Level::Easy => C_EASY,
        Level::Medium => C_MEDIUM,
        Level::Hard => C_HARD,
    }
}

/// Greedy word wrap to at most `max` characters per line.
fn wrap(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let needed = line.chars().count() + word.chars().count() + usize::from(!line.is_empty());
        if needed > max && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert!(wrap("", 10).is_empty());
    }
}
