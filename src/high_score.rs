/// High-score persistence: the only state that outlives a session.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub trait HighScoreStore {
    /// Stored high score; anything missing or unreadable counts as 0.
    fn load(&self) -> u32;

    fn save(&mut self, score: u32) -> Result<()>;
}

/// Write `score` only if it strictly beats the stored value.
/// Returns true when a new high score was written.
pub fn record<S: HighScoreStore + ?Sized>(store: &mut S, score: u32) -> Result<bool> {
    let previous = store.load();
    if score <= previous {
        return Ok(false);
    }
    store.save(score)?;
    debug!(previous, score, "high score updated");
    Ok(true)
}

// ── File store ────────────────────────────────────────────────────────────────

/// Plain-text integer in a file, `~/.star_ace_score` by default.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::at(PathBuf::from(home).join(".star_ace_score"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for FileStore {
    fn load(&self) -> u32 {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => text.trim().parse().unwrap_or_else(|_| {
                warn!(path = %self.path.display(), "ignoring unreadable high score");
                0
            }),
            Err(_) => 0,
        }
    }

    fn save(&mut self, score: u32) -> Result<()> {
        std::fs::write(&self.path, score.to_string())
            .with_context(|| format!("writing high score to {}", self.path.display()))
    }
}

// ── Memory store ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    value: u32,
    writes: usize,
}

impl MemoryStore {
    pub fn with_value(value: u32) -> Self {
        Self { value, writes: 0 }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&self) -> u32 {
        self.value
    }

    fn save(&mut self, score: u32) -> Result<()> {
        self.value = score;
        self.writes += 1;
        Ok(())
    }
}
