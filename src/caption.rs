/// Motivational caption shown on the start screen.
///
/// The text comes from an external source that may fail at any time; the
/// game only ever sees a string, falling back to a fixed line.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use tracing::warn;

pub const FALLBACK_CAPTION: &str =
    "Hey pilot! Every great builder starts one brick at a time. Let's fly!";

/// Environment variable naming a caption file, one caption per line.
pub const CAPTIONS_ENV: &str = "STAR_ACE_CAPTIONS";

pub trait CaptionSource {
    fn fetch(&mut self) -> Result<String>;
}

/// Fetch a caption, substituting the fallback on error or empty text.
pub fn caption_or_fallback<S: CaptionSource + ?Sized>(source: &mut S) -> String {
    match source.fetch() {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => FALLBACK_CAPTION.to_string(),
        Err(err) => {
            warn!(error = %err, "caption source failed, using fallback");
            FALLBACK_CAPTION.to_string()
        }
    }
}

/// Picks a random non-empty line from a text file.
#[derive(Clone, Debug)]
pub struct CaptionFile {
    path: PathBuf,
}

impl CaptionFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var_os(CAPTIONS_ENV).map(Self::at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptionSource for CaptionFile {
    fn fetch(&mut self) -> Result<String> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading captions from {}", self.path.display()))?;
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        match lines.choose(&mut rand::thread_rng()) {
            Some(line) => Ok((*line).to_string()),
            None => bail!("caption file {} is empty", self.path.display()),
        }
    }
}

/// Source used when nothing is configured: always fails over to the fallback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCaptions;

impl CaptionSource for NoCaptions {
    fn fetch(&mut self) -> Result<String> {
        bail!("no caption source configured")
    }
}
