//! Notation adapter — translates wire pitch and duration codes into the
//! internal model and back.
//!
//! Pitch codes have the shape `<letter>[accidental]<octave>`: a letter A–G
//! (case-insensitive), an optional `#`/`s` (sharp) or `b`/`-` (flat), and
//! an octave digit 0–9. Examples: `C4`, `f#3`, `Bb5`, `E-2`.
//!
//! Duration codes come from a small fixed vocabulary (`whole`, `half`,
//! `quarter`, …). Unknown codes fall back to a quarter note, but the
//! fallback is tagged on the result so callers can report it instead of
//! silently corrupting the musical intent.

use crate::error::ScoreError;
use crate::model::{Accidental, Duration, Pitch, Step};

/// Result of a duration lookup: the duration plus whether the code was an
/// exact vocabulary match or the documented quarter-note fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationMatch {
    pub duration: Duration,
    /// False when the code was unrecognized and the default was substituted.
    pub exact: bool,
}

/// Parse a wire pitch code into a `Pitch`.
pub fn parse_pitch(code: &str) -> Result<Pitch, ScoreError> {
    let invalid = || ScoreError::InvalidNotation(code.to_string());
    let mut chars = code.trim().chars();

    let step = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => Step::C,
        Some('D') => Step::D,
        Some('E') => Step::E,
        Some('F') => Step::F,
        Some('G') => Step::G,
        Some('A') => Step::A,
        Some('B') => Step::B,
        _ => return Err(invalid()),
    };

    let rest: String = chars.collect();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') | Some('s') | Some('S') => (Some(Accidental::Sharp), &rest[1..]),
        Some('b') | Some('-') => (Some(Accidental::Flat), &rest[1..]),
        _ => (None, rest.as_str()),
    };

    let octave: i32 = octave_str.parse().map_err(|_| invalid())?;
    if !(0..=9).contains(&octave) {
        return Err(invalid());
    }

    Ok(Pitch {
        step,
        accidental,
        octave,
    })
}

/// Encode a `Pitch` back into its canonical wire form (`C#4`, `Bb3`, `A4`).
pub fn encode_pitch(pitch: &Pitch) -> String {
    let mut out = String::with_capacity(3);
    out.push(pitch.step.letter());
    match pitch.accidental {
        Some(Accidental::Sharp) => out.push('#'),
        Some(Accidental::Flat) => out.push('b'),
        None => {}
    }
    out.push_str(&pitch.octave.to_string());
    out
}

/// Look up a wire duration code.
///
/// Recognized codes (case-insensitive) and their quarter-beat values:
/// `whole` = 4, `half` = 2, `quarter` = 1, `eighth`/`8th` = 1/2,
/// `16th`/`sixteenth` = 1/4, `32nd` = 1/8, `dotted-half` = 3,
/// `dotted-quarter` = 3/2, `dotted-eighth` = 3/4.
///
/// Unknown codes return a quarter note with `exact == false`.
pub fn parse_duration(code: &str) -> DurationMatch {
    let duration = match code.trim().to_ascii_lowercase().as_str() {
        "whole" => Duration::new(4, 1),
        "half" => Duration::new(2, 1),
        "quarter" => Duration::new(1, 1),
        "eighth" | "8th" => Duration::new(1, 2),
        "16th" | "sixteenth" => Duration::new(1, 4),
        "32nd" => Duration::new(1, 8),
        "dotted-half" => Duration::new(3, 1),
        "dotted-quarter" => Duration::new(3, 2),
        "dotted-eighth" => Duration::new(3, 4),
        _ => {
            return DurationMatch {
                duration: Duration::QUARTER,
                exact: false,
            }
        }
    };
    DurationMatch {
        duration,
        exact: true,
    }
}

/// Notation name for a duration, used by the MusicXML writer's `<type>`
/// element. Durations outside the vocabulary map to the nearest base name.
pub fn duration_type_name(duration: &Duration) -> &'static str {
    match (duration.num, duration.den) {
        (4, 1) => "whole",
        (2, 1) | (3, 1) => "half",
        (1, 1) | (3, 2) => "quarter",
        (1, 2) | (3, 4) => "eighth",
        (1, 4) => "16th",
        (1, 8) => "32nd",
        _ => "quarter",
    }
}

/// Whether a duration is a dotted form of its base type.
pub fn duration_is_dotted(duration: &Duration) -> bool {
    matches!((duration.num, duration.den), (3, 1) | (3, 2) | (3, 4))
}
