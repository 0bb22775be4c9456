//! exportlib — score modelling and audio/notation export.
//!
//! Converts a wire-format symbolic score (tracks of pitch/duration coded
//! notes) into an internal score model, extracts time-bounded segments
//! from it, and renders them to MusicXML/MXL notation files or compressed
//! audio through an external synthesis engine and transcoder.
//!
//! # Example
//! ```no_run
//! use exportlib::{
//!     extract_segment, score_from_json, AudioFormat, AudioRenderer,
//!     Instrument, RenderConfig, RenderRequest,
//! };
//!
//! let payload = r#"{
//!     "title": "Demo",
//!     "tracks": [{ "notes": [
//!         { "pitch": "C4", "duration": "quarter" },
//!         { "pitch": "D4", "duration": "quarter" },
//!         { "pitch": "E4", "duration": "half" }
//!     ]}]
//! }"#;
//!
//! let built = score_from_json(payload).unwrap();
//! let segment = extract_segment(&built.score, 0, 1.0, 3.0).unwrap();
//!
//! let config = RenderConfig::default();
//! let renderer = AudioRenderer::from_config(&config).unwrap();
//! let (instrument, _fallback) = Instrument::resolve("flute");
//! let request =
//!     RenderRequest::new(segment, instrument, 120.0, AudioFormat::Mp3).unwrap();
//! let artifact = renderer.render(&request).unwrap();
//! println!("rendered to {}", artifact.path.display());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod midi;
pub mod model;
pub mod musicxml;
pub mod notation;
pub mod render;

pub use builder::{
    build_score, extract_segment, score_from_json, BuildWarning, BuiltScore, NoteInput,
    ScoreInput, TrackInput,
};
pub use config::{ConfigError, RenderConfig};
pub use error::{RenderError, ScoreError};
pub use model::{Accidental, Duration, Note, Pitch, Score, Segment, Step, TimedNote, Track};
pub use notation::{encode_pitch, parse_duration, parse_pitch, DurationMatch};
pub use render::{
    export_notation, Artifact, ArtifactFormat, AudioFormat, AudioRenderer, CancelToken,
    FfmpegTranscoder, FluidSynth, Instrument, NotationFormat, RenderRequest, Synthesizer,
    Transcoder,
};

/// Convert a score model to a JSON string.
/// Useful for handing results back across service boundaries.
pub fn score_to_json(score: &Score) -> Result<String, ScoreError> {
    serde_json::to_string_pretty(score).map_err(|e| ScoreError::MalformedPayload(e.to_string()))
}
