//! Score model builder — assembles a `Score` from the typed wire payload
//! and extracts time-bounded segments from it.
//!
//! The wire payload mirrors the client JSON: a title plus tracks of
//! `{pitch, duration}` code pairs. It is decoded into `ScoreInput` before
//! it reaches any domain logic — the core never sees untyped maps.
//!
//! Segment extraction uses prefix-sum offsets: a note's offset is the sum
//! of the durations of all notes before it in its track.

use serde::Deserialize;

use crate::error::ScoreError;
use crate::model::{Note, Score, Segment, TimedNote, Track};
use crate::notation;

/// One note as it appears on the wire: a pitch code and a duration code.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    pub pitch: String,
    pub duration: String,
}

/// One track as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackInput {
    pub notes: Vec<NoteInput>,
}

/// The full wire payload for a score.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreInput {
    pub title: String,
    pub tracks: Vec<TrackInput>,
}

/// A non-fatal problem noticed while building a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// A duration code was not in the vocabulary and the quarter-note
    /// default was substituted.
    UnknownDuration {
        track: usize,
        note: usize,
        code: String,
    },
}

/// A built score together with any fallback warnings.
#[derive(Debug, Clone)]
pub struct BuiltScore {
    pub score: Score,
    pub warnings: Vec<BuildWarning>,
}

/// Build a `Score` from the typed wire payload.
///
/// Notes are adapted and appended strictly in input order — export
/// correctness depends on order preservation. Invalid pitch codes fail
/// hard; unrecognized duration codes fall back to a quarter note and are
/// surfaced both in the returned warnings and in the log.
pub fn build_score(input: &ScoreInput) -> Result<BuiltScore, ScoreError> {
    let mut score = Score::new(input.title.clone());
    let mut warnings = Vec::new();

    for (t, track_input) in input.tracks.iter().enumerate() {
        let mut track = Track::default();
        for (n, note_input) in track_input.notes.iter().enumerate() {
            let pitch = notation::parse_pitch(&note_input.pitch)?;
            let matched = notation::parse_duration(&note_input.duration);
            if !matched.exact {
                tracing::warn!(
                    track = t,
                    note = n,
                    code = %note_input.duration,
                    "unrecognized duration code, defaulting to quarter note"
                );
                warnings.push(BuildWarning::UnknownDuration {
                    track: t,
                    note: n,
                    code: note_input.duration.clone(),
                });
            }
            track.notes.push(Note {
                pitch,
                duration: matched.duration,
            });
        }
        score.tracks.push(track);
    }

    tracing::debug!(
        title = %score.title,
        tracks = score.tracks.len(),
        warnings = warnings.len(),
        "score built"
    );

    Ok(BuiltScore { score, warnings })
}

/// Decode a JSON wire payload and build the score from it.
pub fn score_from_json(json: &str) -> Result<BuiltScore, ScoreError> {
    let input: ScoreInput = serde_json::from_str(json)
        .map_err(|e| ScoreError::MalformedPayload(e.to_string()))?;
    build_score(&input)
}

/// Extract the contiguous run of notes whose start offset lies in
/// `[start, end)` from the given track.
///
/// Offsets are computed as a prefix sum over the track's durations, in
/// track order. Half-open semantics: a note starting exactly at `end` is
/// excluded, one starting exactly at `start` is included. An empty result
/// is a valid (silent) segment, not an error.
pub fn extract_segment<'a>(
    score: &'a Score,
    track_index: usize,
    start: f64,
    end: f64,
) -> Result<Segment<'a>, ScoreError> {
    if score.tracks.is_empty() {
        return Err(ScoreError::EmptyScore);
    }
    if track_index >= score.tracks.len() {
        return Err(ScoreError::TrackIndexOutOfRange {
            index: track_index,
            count: score.tracks.len(),
        });
    }
    if end < start || start < 0.0 || !start.is_finite() || !end.is_finite() {
        return Err(ScoreError::InvalidRange { start, end });
    }

    let track = &score.tracks[track_index];
    let mut notes = Vec::new();
    let mut offset = 0.0;
    for note in &track.notes {
        if offset >= start && offset < end {
            notes.push(TimedNote { note, offset });
        }
        offset += note.duration.quarter_length();
        if offset >= end {
            break;
        }
    }

    Ok(Segment {
        track_index,
        start,
        end,
        notes,
    })
}
