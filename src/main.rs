use std::collections::HashMap;
use std::io::{stdout, BufWriter, Write};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::terminal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use star_ace::caption::{caption_or_fallback, CaptionFile, FALLBACK_CAPTION};
use star_ace::display::terminal::{self as term, TerminalGuard};
use star_ace::display::{self, Raster, Viewport};
use star_ace::entities::{Level, Phase};
use star_ace::high_score::{self, FileStore, HighScoreStore};
use star_ace::session::{GameSession, SessionError};
use star_ace::tuning::Tuning;

const FRAME: Duration = Duration::from_millis(16); // ≈60 FPS

/// Environment variable naming the log file.  Unset means no logging.
const LOG_ENV: &str = "STAR_ACE_LOG";

/// Space counts as held if its last press/repeat arrived within this many
/// frames.  Covers terminals that never report key releases: OS key repeat
/// refreshes it well before it lapses.
const HOLD_WINDOW: u64 = 8;

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_tracing() -> Result<()> {
    // The screen belongs to the game, so logs only ever go to a file.
    let Some(path) = std::env::var_os(LOG_ENV) else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.to_string_lossy()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("star_ace=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        error!(%info, ?backtrace, "panic");
    }));
    Ok(())
}

// ── Input ─────────────────────────────────────────────────────────────────────

enum Flow {
    Continue,
    Quit,
}

/// Per-run input bookkeeping that lives between frames.
struct InputState {
    frame: u64,
    /// Frame each key was last seen pressed or repeating.
    key_frame: HashMap<KeyCode, u64>,
}

impl InputState {
    fn is_held(&self, key: KeyCode) -> bool {
        self.key_frame
            .get(&key)
            .map(|&last| self.frame.saturating_sub(last) <= HOLD_WINDOW)
            .unwrap_or(false)
    }
}

fn ignore_invalid(result: Result<(), SessionError>) {
    if let Err(err) = result {
        debug!(%err, "input ignored");
    }
}

fn handle_key(session: &mut GameSession, input: &mut InputState, key: KeyEvent, now_ms: f64) -> Flow {
    let KeyEvent {
        code,
        kind,
        modifiers,
        ..
    } = key;

    match kind {
        KeyEventKind::Release => {
            input.key_frame.remove(&code);
            return Flow::Continue;
        }
        KeyEventKind::Repeat => {
            input.key_frame.insert(code, input.frame);
        }
        KeyEventKind::Press => {
            input.key_frame.insert(code, input.frame);
            match code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Flow::Quit,
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Flow::Quit;
                }
                KeyCode::Char('1') => ignore_invalid(session.select_difficulty(Level::Easy)),
                KeyCode::Char('2') => ignore_invalid(session.select_difficulty(Level::Medium)),
                KeyCode::Char('3') => ignore_invalid(session.select_difficulty(Level::Hard)),
                KeyCode::Enter if session.phase() == Phase::AwaitingStart => {
                    ignore_invalid(session.start());
                }
                KeyCode::Char('r') | KeyCode::Char('R') if session.phase() == Phase::Over => {
                    ignore_invalid(session.start());
                }
                KeyCode::Char('m') | KeyCode::Char('M') => session.reset(),
                KeyCode::Char('p') | KeyCode::Char('P') => {
                    ignore_invalid(session.toggle_pause(now_ms));
                }
                _ => {}
            }
        }
    }

    // Movement on press and on every OS repeat.
    match code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => session.nudge(-1.0),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => session.nudge(1.0),
        _ => {}
    }
    Flow::Continue
}

fn handle_mouse(session: &mut GameSession, mouse: MouseEvent, viewport: &Viewport) {
    if let MouseEventKind::Moved | MouseEventKind::Drag(_) = mouse.kind {
        session.steer_to(viewport.field_x(mouse.column));
    }
}

// ── Frame loop ────────────────────────────────────────────────────────────────

fn run<W: Write>(
    out: &mut W,
    session: &mut GameSession,
    rx: &mpsc::Receiver<Event>,
    caption: &str,
) -> Result<()> {
    let epoch = Instant::now();
    let (width, height) = terminal::size()?;
    let mut raster = Raster::new(width, height);
    let mut input = InputState {
        frame: 0,
        key_frame: HashMap::new(),
    };

    loop {
        let frame_start = Instant::now();
        let now_ms = epoch.elapsed().as_secs_f64() * 1000.0;
        input.frame += 1;

        let viewport = Viewport::for_raster(raster.width(), raster.height(), session.field());

        // Drain all pending input without blocking.
        while let Ok(ev) = rx.try_recv() {
            match ev {
                Event::Key(key) => {
                    if let Flow::Quit = handle_key(session, &mut input, key, now_ms) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse(session, mouse, &viewport),
                Event::Resize(w, h) => raster.resize(w, h),
                _ => {}
            }
        }

        session.set_fire_held(input.is_held(KeyCode::Char(' ')));

        if session.phase() == Phase::Running {
            session.advance(now_ms)?;
        }

        display::render(&mut raster, &session.view(), caption);
        term::draw(out, &raster)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing()?;

    let tuning = Tuning::from_env().context("loading tuning")?;
    let mut store = FileStore::default_location();
    let best = store.load();

    let caption = match CaptionFile::from_env() {
        Some(mut source) => caption_or_fallback(&mut source),
        None => FALLBACK_CAPTION.to_string(),
    };

    let mut session = GameSession::new(tuning, best).context("invalid tuning")?;
    session.on_game_over(move |score| match high_score::record(&mut store, score) {
        Ok(true) => info!(score, "new high score saved"),
        Ok(false) => {}
        Err(err) => warn!(error = %err, "could not save high score"),
    });

    let mut out = BufWriter::new(stdout());
    let guard = TerminalGuard::enter(&mut out)?;
    info!(keyboard_enhanced = guard.keyboard_enhanced(), "terminal ready");

    // Dedicated thread for blocking event reads so the frame loop never
    // blocks on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break; // receiver dropped → program exiting
            }
        }
    });

    let result = run(&mut out, &mut session, &rx, &caption);

    // Always restore the terminal
    guard.leave(&mut out);

    result
}
