//! Render pipeline configuration.
//!
//! The synthesis engine, transcoder, and soundbank locations are external
//! configuration, never hard-coded in the pipeline. Defaults resolve the
//! binaries on `PATH`; `validate()` is meant to run at startup so a
//! missing soundbank fails fast instead of at first render.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::RenderError;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the audio render pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Synthesis engine binary (resolved on PATH if not absolute).
    pub fluidsynth: PathBuf,
    /// Transcoder binary (resolved on PATH if not absolute).
    pub ffmpeg: PathBuf,
    /// Instrument soundbank (SoundFont) file.
    pub soundbank: PathBuf,
    /// Directory finished artifacts are written to.
    pub export_dir: PathBuf,
    /// Synthesis gain level, 0.0–10.0.
    pub gain: f64,
    /// Bounded wait for each external-process stage, in seconds.
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fluidsynth: PathBuf::from("fluidsynth"),
            ffmpeg: PathBuf::from("ffmpeg"),
            soundbank: PathBuf::from("/usr/share/sounds/sf2/FluidR3_GM.sf2"),
            export_dir: PathBuf::from("exports"),
            gain: 0.8,
            timeout_secs: 60,
        }
    }
}

impl RenderConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Validate external resources at startup: the soundbank must resolve
    /// to an existing file, and the export directory is created if absent.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !self.soundbank.is_file() {
            return Err(RenderError::SynthesisResourceMissing(
                self.soundbank.clone(),
            ));
        }
        std::fs::create_dir_all(&self.export_dir)
            .map_err(|e| RenderError::Serialization(e.to_string()))?;
        Ok(())
    }
}
