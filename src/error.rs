//! Error taxonomy for score building and rendering.
//!
//! Validation errors (`ScoreError`, plus `InvalidTempo`/`UnsupportedFormat`)
//! are caller mistakes: reported immediately, never retried, never leaving a
//! partial artifact. External-tool errors carry the tool's captured stderr;
//! retries are an outer-layer policy, not handled here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the notation adapter and the score model builder.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// A pitch code did not match the `<letter>[accidental]<octave>` shape.
    #[error("invalid pitch notation '{0}'")]
    InvalidNotation(String),

    /// A wire payload could not be decoded into the typed score input.
    #[error("malformed score payload: {0}")]
    MalformedPayload(String),

    /// A segment was requested from a score with no tracks.
    #[error("score has no tracks")]
    EmptyScore,

    /// The requested track index is past the end of the score.
    #[error("track index {index} out of range ({count} tracks)")]
    TrackIndexOutOfRange { index: usize, count: usize },

    /// Segment bounds are negative or reversed.
    #[error("invalid offset range {start}..{end}")]
    InvalidRange { start: f64, end: f64 },
}

/// Errors from the render pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tempo must be a positive, finite number of beats per minute.
    #[error("invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    /// Failed to write the MIDI intermediate.
    #[error("failed to encode MIDI intermediate: {0}")]
    Encoding(std::io::Error),

    /// The synthesizer binary or its soundbank is not available.
    #[error("synthesis resource missing: {0}")]
    SynthesisResourceMissing(PathBuf),

    /// The synthesis engine exited abnormally, timed out, or produced
    /// no output. Carries the engine's diagnostic output.
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The transcoder exited abnormally or timed out.
    #[error("transcoding failed: {0}")]
    TranscodeFailed(String),

    /// The requested output format is outside the supported set.
    #[error("unsupported audio format '{0}'")]
    UnsupportedFormat(String),

    /// Notation serialization hit an I/O failure (disk full, permissions).
    /// Never raised for data shape — the model is well-formed by construction.
    #[error("notation serialization failed: {0}")]
    Serialization(String),

    /// The caller cancelled the render; intermediates have been removed.
    #[error("render cancelled")]
    Cancelled,

    /// A score-level validation error surfaced during rendering.
    #[error(transparent)]
    Score(#[from] ScoreError),
}
