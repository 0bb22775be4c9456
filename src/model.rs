//! Data model for a symbolic score.
//!
//! A `Score` owns its `Track`s, each track owns an ordered sequence of
//! `Note`s. Segments are borrowed, time-bounded views over one track,
//! produced by the builder's prefix-sum extraction.

use serde::{Deserialize, Serialize};

/// Note letter. The wire notation only admits A–G; the type enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Semitone offset within the octave (C = 0).
    pub fn semitone(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Letter as it appears in notation output.
    pub fn letter(self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }
}

/// Chromatic alteration of a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    Sharp,
    Flat,
}

impl Accidental {
    /// Semitone adjustment: sharp = +1, flat = -1.
    pub fn alter(self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

/// Pitch of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A–G
    pub step: Step,
    /// Optional chromatic alteration
    pub accidental: Option<Accidental>,
    /// Octave number (middle C = C4); bounded to 0–9 by the adapter
    pub octave: i32,
}

impl Pitch {
    /// Convert pitch to MIDI note number.
    /// Middle C (C4) = 60.
    pub fn to_midi(&self) -> i32 {
        let alter = self.accidental.map_or(0, Accidental::alter);
        (self.octave + 1) * 12 + self.step.semitone() + alter
    }
}

/// Musical duration as a rational number of quarter-beats.
///
/// The duration vocabulary only produces dyadic rationals (denominators
/// 1, 2, 4, 8), so the `f64` quarter-length is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    pub num: u32,
    pub den: u32,
}

impl Duration {
    /// A quarter note — the unit duration and the documented fallback.
    pub const QUARTER: Duration = Duration { num: 1, den: 1 };

    /// Construct a duration of `num/den` quarter-beats.
    /// Both terms must be non-zero (durations are strictly positive).
    /// Terms are reduced to lowest form, so equal durations compare equal.
    pub fn new(num: u32, den: u32) -> Duration {
        debug_assert!(num > 0 && den > 0, "durations are strictly positive");
        let g = gcd(num.max(1), den.max(1));
        Duration {
            num: num.max(1) / g,
            den: den.max(1) / g,
        }
    }

    /// Length in quarter-beats.
    pub fn quarter_length(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// A single note: pitch plus duration. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: Duration,
}

/// One instrument line: an ordered, append-only sequence of notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub notes: Vec<Note>,
}

impl Track {
    /// Total length of the track in quarter-beats.
    pub fn total_quarters(&self) -> f64 {
        self.notes.iter().map(|n| n.duration.quarter_length()).sum()
    }
}

/// A complete score: title plus ordered tracks.
/// Track insertion order doubles as the track index used for addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub title: String,
    pub tracks: Vec<Track>,
}

impl Score {
    /// Create an empty score with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tracks: Vec::new(),
        }
    }
}

/// A note with its cumulative start offset (in quarter-beats) within its
/// track, computed by prefix sum — offsets are never stored on the note.
#[derive(Debug, Clone, Copy)]
pub struct TimedNote<'a> {
    pub note: &'a Note,
    pub offset: f64,
}

/// A time-bounded, non-owning view over one track's notes.
///
/// Holds the notes whose start offset falls in `[start, end)`. Lifetime is
/// bound to the `Score` it was extracted from. An empty segment is valid
/// and renders to a silent artifact.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    /// Index of the source track within the score
    pub track_index: usize,
    /// Inclusive lower offset bound, in quarter-beats
    pub start: f64,
    /// Exclusive upper offset bound, in quarter-beats
    pub end: f64,
    /// Selected notes, in track order, with their absolute offsets
    pub notes: Vec<TimedNote<'a>>,
}

impl Segment<'_> {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_to_midi_middle_c() {
        let c4 = Pitch {
            step: Step::C,
            accidental: None,
            octave: 4,
        };
        assert_eq!(c4.to_midi(), 60);
    }

    #[test]
    fn pitch_to_midi_accidentals() {
        let fs3 = Pitch {
            step: Step::F,
            accidental: Some(Accidental::Sharp),
            octave: 3,
        };
        assert_eq!(fs3.to_midi(), 54);

        let bb4 = Pitch {
            step: Step::B,
            accidental: Some(Accidental::Flat),
            octave: 4,
        };
        assert_eq!(bb4.to_midi(), 70);
    }

    #[test]
    fn duration_quarter_length_is_exact() {
        assert_eq!(Duration::new(4, 1).quarter_length(), 4.0);
        assert_eq!(Duration::new(1, 2).quarter_length(), 0.5);
        assert_eq!(Duration::new(3, 4).quarter_length(), 0.75);
        assert_eq!(Duration::new(1, 8).quarter_length(), 0.125);
    }

    #[test]
    fn duration_reduces_to_lowest_terms() {
        assert_eq!(Duration::new(2, 2), Duration::QUARTER);
        assert_eq!(Duration::new(6, 4), Duration::new(3, 2));
        assert_eq!(Duration::new(8, 2), Duration::new(4, 1));
    }
}
