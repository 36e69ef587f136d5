//! Terminal I/O: raw-mode setup and flushing a raster to the screen.

use std::io::Write;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal, ExecutableCommand, QueueableCommand,
};

use super::raster::{CellStyle, Raster};

/// Puts the terminal into game mode and restores it on `leave`.
pub struct TerminalGuard {
    keyboard_enhanced: bool,
}

impl TerminalGuard {
    pub fn enter<W: Write>(out: &mut W) -> Result<Self> {
        terminal::enable_raw_mode()?;
        out.execute(terminal::EnterAlternateScreen)?;
        out.execute(cursor::Hide)?;
        out.execute(EnableMouseCapture)?;

        // Key-release events where supported (kitty protocol); others fall
        // back to press/repeat only.
        let keyboard_enhanced = out
            .execute(PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
            ))
            .is_ok();
        Ok(Self { keyboard_enhanced })
    }

    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    /// Best-effort restore; every step runs even if an earlier one fails.
    pub fn leave<W: Write>(self, out: &mut W) {
        if self.keyboard_enhanced {
            let _ = out.execute(PopKeyboardEnhancementFlags);
        }
        let _ = out.execute(DisableMouseCapture);
        let _ = out.execute(ResetColor);
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Redraw the whole screen from `raster`.
pub fn draw<W: Write>(out: &mut W, raster: &Raster) -> Result<()> {
    let mut current: Option<CellStyle> = None;

    for y in 0..raster.height() {
        out.queue(cursor::MoveTo(0, y))?;
        for x in 0..raster.width() {
            let cell = raster.get(x, y).unwrap_or_default();
            if current != Some(cell.style) {
                apply_style(out, cell.style)?;
                current = Some(cell.style);
            }
            out.queue(Print(cell.ch))?;
        }
    }

    out.queue(ResetColor)?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(cursor::MoveTo(0, raster.height().saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}

fn apply_style<W: Write>(out: &mut W, style: CellStyle) -> Result<()> {
    out.queue(SetAttribute(Attribute::Reset))?;
    if style.bold {
        out.queue(SetAttribute(Attribute::Bold))?;
    }
    out.queue(SetForegroundColor(Color::Rgb {
        r: style.fg.r,
        g: style.fg.g,
        b: style.fg.b,
    }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::raster::Rgb;

    #[test]
    fn draw_emits_every_cell() {
        let mut raster = Raster::new(3, 2);
        raster.put_str(0, 0, "ab", CellStyle::bold(Rgb::new(1, 2, 3)));
        let mut out: Vec<u8> = Vec::new();
        draw(&mut out, &raster).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("ab"));
        assert!(text.contains("38;2;1;2;3"));
    }
}
