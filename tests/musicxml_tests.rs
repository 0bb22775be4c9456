//! Integration tests for MusicXML/MXL notation output.

use std::io::{Cursor, Read};

use exportlib::musicxml::{write_musicxml, write_mxl};
use exportlib::{build_score, NoteInput, ScoreInput, TrackInput};

fn note(pitch: &str, duration: &str) -> NoteInput {
    NoteInput {
        pitch: pitch.to_string(),
        duration: duration.to_string(),
    }
}

fn two_track_score() -> exportlib::Score {
    let input = ScoreInput {
        title: "Ordered".to_string(),
        tracks: vec![
            TrackInput {
                notes: vec![
                    note("C4", "quarter"),
                    note("D4", "quarter"),
                    note("E4", "half"),
                    note("F4", "whole"),
                ],
            },
            TrackInput {
                notes: vec![note("G2", "dotted-half"), note("A2", "eighth")],
            },
        ],
    };
    build_score(&input).unwrap().score
}

#[test]
fn parts_and_notes_follow_insertion_order() {
    let xml = write_musicxml(&two_track_score());

    let p1 = xml.find("<part id=\"P1\">").unwrap();
    let p2 = xml.find("<part id=\"P2\">").unwrap();
    assert!(p1 < p2, "parts must appear in track order");

    // Note order within a part matches input order.
    let c = xml.find("<step>C</step>").unwrap();
    let d = xml.find("<step>D</step>").unwrap();
    let e = xml.find("<step>E</step>").unwrap();
    assert!(c < d && d < e);

    // Dotted-half gets a dot element and a half type.
    assert!(xml.contains("<dot/>"));
    assert!(xml.contains("<type>half</type>"));
}

#[test]
fn durations_are_in_divisions_of_eight() {
    let xml = write_musicxml(&two_track_score());
    assert!(xml.contains("<divisions>8</divisions>"));
    // quarter = 8, half = 16, whole = 32, dotted-half = 24, eighth = 4
    for d in ["<duration>8</duration>", "<duration>16</duration>",
              "<duration>32</duration>", "<duration>24</duration>",
              "<duration>4</duration>"] {
        assert!(xml.contains(d), "missing {d}");
    }
}

#[test]
fn empty_track_still_produces_a_measure() {
    let input = ScoreInput {
        title: "Hollow".to_string(),
        tracks: vec![TrackInput { notes: vec![] }],
    };
    let score = build_score(&input).unwrap().score;
    let xml = write_musicxml(&score);
    assert!(xml.contains("<measure number=\"1\">"));
    assert!(xml.contains("</part>"));
}

#[test]
fn mxl_container_reads_back() {
    let score = two_track_score();
    let bytes = write_mxl(&score).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

    let mut container = String::new();
    archive
        .by_name("META-INF/container.xml")
        .unwrap()
        .read_to_string(&mut container)
        .unwrap();
    assert!(container.contains("full-path=\"score.xml\""));

    let mut inner = String::new();
    archive
        .by_name("score.xml")
        .unwrap()
        .read_to_string(&mut inner)
        .unwrap();
    assert_eq!(inner, write_musicxml(&score));
}
