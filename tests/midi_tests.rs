//! Integration tests for the segment MIDI encoder: SMF framing, tempo
//! meta events, instrument program changes, and the silent-segment policy.

use exportlib::midi::{encode_segment, TICKS_PER_QUARTER};
use exportlib::{build_score, extract_segment, Instrument, NoteInput, ScoreInput, TrackInput};

fn demo_score() -> exportlib::Score {
    let input = ScoreInput {
        title: "Demo".to_string(),
        tracks: vec![TrackInput {
            notes: vec![
                NoteInput {
                    pitch: "C4".into(),
                    duration: "quarter".into(),
                },
                NoteInput {
                    pitch: "D4".into(),
                    duration: "quarter".into(),
                },
                NoteInput {
                    pitch: "E4".into(),
                    duration: "half".into(),
                },
            ],
        }],
    };
    build_score(&input).unwrap().score
}

fn track_count(smf: &[u8]) -> u16 {
    u16::from_be_bytes([smf[10], smf[11]])
}

#[test]
fn segment_encodes_to_valid_smf() {
    let score = demo_score();
    let segment = extract_segment(&score, 0, 0.0, 4.0).unwrap();
    let smf = encode_segment(&segment, Instrument::Piano, 120.0);

    assert_eq!(&smf[0..4], b"MThd", "missing MThd header");
    assert_eq!(&smf[8..10], &1u16.to_be_bytes(), "should be format 1");
    assert_eq!(&smf[12..14], &TICKS_PER_QUARTER.to_be_bytes());

    // Tempo track + part track
    assert_eq!(track_count(&smf), 2);
    let mtrk_count = smf.windows(4).filter(|w| *w == b"MTrk").count();
    assert_eq!(mtrk_count, 2);

    println!("✓ demo segment: {} bytes, 2 tracks", smf.len());
}

#[test]
fn tempo_meta_event_matches_bpm() {
    let score = demo_score();
    let segment = extract_segment(&score, 0, 0.0, 4.0).unwrap();
    let smf = encode_segment(&segment, Instrument::Piano, 120.0);

    // 120 BPM → 500_000 µs per quarter → FF 51 03 07 A1 20
    let tempo_meta = [0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20];
    assert!(
        smf.windows(6).any(|w| w == tempo_meta),
        "expected 120 BPM tempo meta event"
    );
}

#[test]
fn program_change_matches_instrument() {
    let score = demo_score();

    for (instrument, program) in [
        (Instrument::Piano, 0u8),
        (Instrument::Violin, 40),
        (Instrument::Flute, 73),
        (Instrument::Guitar, 24),
    ] {
        let segment = extract_segment(&score, 0, 0.0, 4.0).unwrap();
        let smf = encode_segment(&segment, instrument, 120.0);
        assert!(
            smf.windows(2).any(|w| w == [0xC0, program]),
            "{} should emit program change {program}",
            instrument.name()
        );
    }
}

#[test]
fn note_events_cover_the_segment() {
    let score = demo_score();
    let segment = extract_segment(&score, 0, 1.0, 3.0).unwrap();
    let smf = encode_segment(&segment, Instrument::Piano, 120.0);

    // D4 = 62 and E4 = 64 should be struck; C4 = 60 must not appear.
    assert!(smf.windows(3).any(|w| w[0] == 0x90 && w[1] == 62 && w[2] == 80));
    assert!(smf.windows(3).any(|w| w[0] == 0x90 && w[1] == 64 && w[2] == 80));
    assert!(!smf.windows(3).any(|w| w[0] == 0x90 && w[1] == 60 && w[2] == 80));
}

#[test]
fn empty_segment_encodes_to_silent_smf() {
    // Policy: an empty segment produces a minimal silent file, not an error.
    let score = demo_score();
    let segment = extract_segment(&score, 0, 100.0, 200.0).unwrap();
    assert!(segment.is_empty());

    let smf = encode_segment(&segment, Instrument::Flute, 90.0);
    assert_eq!(&smf[0..4], b"MThd");
    assert_eq!(track_count(&smf), 2);
    // Program change is still present, but no note-on events.
    assert!(smf.windows(2).any(|w| w == [0xC0, 73]));
    assert!(!smf.windows(3).any(|w| w[0] == 0x90 && w[2] == 80));
}
