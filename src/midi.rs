//! MIDI encoding of a score segment.
//!
//! Produces a Standard MIDI File (SMF) Type 1 as raw bytes. Track 0
//! carries the tempo meta event; track 1 carries the part: a program
//! change for the selected instrument followed by the segment's note
//! on/off events, rebased so the segment starts at tick 0.
//!
//! An empty segment encodes to a minimal silent file (tempo + program
//! change + end of track) rather than failing — the pipeline stays
//! uniform and the synthesizer simply renders silence.

use crate::model::Segment;
use crate::render::Instrument;

/// A single MIDI event (note on/off, program change, meta).
#[derive(Debug, Clone)]
pub struct MidiEvent {
    /// Absolute time in ticks from the start of the track
    pub tick: u32,
    /// Raw MIDI message bytes (status + data)
    pub bytes: Vec<u8>,
}

/// Ticks per quarter note in our MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Note-on velocity for all rendered notes.
const VELOCITY: u8 = 80;

/// MIDI channel the part plays on.
const CHANNEL: u8 = 0;

/// Encode a segment as a complete SMF Type 1 byte stream.
///
/// `tempo_bpm` must already be validated (> 0) by the caller; the
/// instrument's General MIDI program number is emitted as the first
/// event of the part track.
pub fn encode_segment(segment: &Segment<'_>, instrument: Instrument, tempo_bpm: f64) -> Vec<u8> {
    let mut tracks: Vec<Vec<u8>> = Vec::new();

    // ── Track 0: tempo map ──────────────────────────────────────────
    let uspq = (60_000_000.0 / tempo_bpm) as u32; // microseconds per quarter
    let tempo_event = MidiEvent {
        tick: 0,
        bytes: vec![
            0xFF,
            0x51,
            0x03,
            ((uspq >> 16) & 0xFF) as u8,
            ((uspq >> 8) & 0xFF) as u8,
            (uspq & 0xFF) as u8,
        ],
    };
    tracks.push(encode_track(&[tempo_event], "Tempo"));

    // ── Track 1: the part ───────────────────────────────────────────
    let mut events = Vec::with_capacity(segment.notes.len() * 2 + 1);
    events.push(MidiEvent {
        tick: 0,
        bytes: vec![0xC0 | CHANNEL, instrument.midi_program()],
    });

    for timed in &segment.notes {
        // Rebase offsets so the segment's first possible onset is tick 0.
        let rel_offset = timed.offset - segment.start;
        let on_tick = quarters_to_ticks(rel_offset);
        let off_tick = quarters_to_ticks(rel_offset + timed.note.duration.quarter_length());
        let midi_note = timed.note.pitch.to_midi().clamp(0, 127) as u8;

        events.push(MidiEvent {
            tick: on_tick,
            bytes: vec![0x90 | CHANNEL, midi_note, VELOCITY],
        });
        events.push(MidiEvent {
            tick: off_tick,
            bytes: vec![0x80 | CHANNEL, midi_note, 0],
        });
    }

    tracks.push(encode_track(&events, instrument.name()));

    build_smf(&tracks)
}

/// Convert quarter-beats to MIDI ticks.
fn quarters_to_ticks(quarters: f64) -> u32 {
    (quarters * TICKS_PER_QUARTER as f64).round() as u32
}

/// Build the complete Standard MIDI File bytes.
fn build_smf(tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();

    // MThd header
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes()); // header length
    out.extend_from_slice(&1u16.to_be_bytes()); // format type 1
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

    // Track chunks
    for track_data in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend_from_slice(track_data);
    }

    out
}

/// Encode a track's events into raw MTrk bytes (delta-time encoded).
fn encode_track(events: &[MidiEvent], name: &str) -> Vec<u8> {
    let mut data = Vec::new();

    // Track name meta event
    let name_bytes = name.as_bytes();
    data.extend_from_slice(&[0x00]); // delta time 0
    data.push(0xFF);
    data.push(0x03); // track name
    write_vlq(&mut data, name_bytes.len() as u32);
    data.extend_from_slice(name_bytes);

    // Sort events by tick
    let mut sorted: Vec<&MidiEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.tick);

    let mut last_tick: u32 = 0;
    for event in &sorted {
        let delta = event.tick.saturating_sub(last_tick);
        write_vlq(&mut data, delta);
        data.extend_from_slice(&event.bytes);
        last_tick = event.tick;
    }

    // End of track
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    data
}

/// Write a variable-length quantity (VLQ) to a byte vector.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        out.push(0);
        return;
    }
    let mut buf = [0u8; 5];
    let mut i = 0;
    while value > 0 {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        if i > 0 {
            buf[i] |= 0x80;
        }
        i += 1;
    }
    // Write in reverse order
    for j in (0..i).rev() {
        out.push(buf[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_encoding() {
        let mut buf = Vec::new();
        write_vlq(&mut buf, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        write_vlq(&mut buf, 127);
        assert_eq!(buf, vec![0x7F]);

        buf.clear();
        write_vlq(&mut buf, 128);
        assert_eq!(buf, vec![0x81, 0x00]);

        buf.clear();
        write_vlq(&mut buf, 480);
        assert_eq!(buf, vec![0x83, 0x60]);
    }

    #[test]
    fn smf_header_valid() {
        let track = encode_track(&[], "Test");
        let smf = build_smf(&[track]);
        assert_eq!(&smf[0..4], b"MThd");
        assert_eq!(&smf[8..10], &1u16.to_be_bytes()); // format 1
        assert_eq!(&smf[12..14], &TICKS_PER_QUARTER.to_be_bytes());
        assert!(smf.windows(4).any(|w| w == b"MTrk"));
    }

    #[test]
    fn quarters_to_ticks_scales_by_division() {
        assert_eq!(quarters_to_ticks(0.0), 0);
        assert_eq!(quarters_to_ticks(1.0), 480);
        assert_eq!(quarters_to_ticks(0.5), 240);
        assert_eq!(quarters_to_ticks(3.0), 1440);
    }
}
