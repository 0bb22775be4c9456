//! MusicXML output — serializes the score model to a `score-partwise`
//! document, optionally wrapped in a compressed `.mxl` archive.
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml  — declares the root MusicXML file path
//!   - score.xml               — the actual MusicXML content
//!
//! Output is deterministic: parts appear in track order, notes in note
//! order, so identical scores always serialize to identical bytes.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::RenderError;
use crate::model::{Accidental, Score, Track};
use crate::notation;

/// Divisions per quarter note in the emitted MusicXML. Eight divisions
/// represent every vocabulary duration (down to 32nds and dotted eighths)
/// as a whole number.
const DIVISIONS: u32 = 8;

/// Quarter-beats per measure — notes are packed greedily into 4/4 bars.
const QUARTERS_PER_MEASURE: f64 = 4.0;

/// Serialize a score as an uncompressed MusicXML string.
pub fn write_musicxml(score: &Score) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 4.0 Partwise//EN\" \
         \"http://www.musicxml.org/dtds/partwise.dtd\">\n",
    );
    xml.push_str("<score-partwise version=\"4.0\">\n");

    xml.push_str("  <work>\n");
    xml.push_str(&format!(
        "    <work-title>{}</work-title>\n",
        escape(&score.title)
    ));
    xml.push_str("  </work>\n");

    // Part list: one score-part per track, ids P1, P2, … in track order.
    xml.push_str("  <part-list>\n");
    for (i, _) in score.tracks.iter().enumerate() {
        xml.push_str(&format!(
            "    <score-part id=\"P{id}\">\n      <part-name>Track {id}</part-name>\n    </score-part>\n",
            id = i + 1
        ));
    }
    xml.push_str("  </part-list>\n");

    for (i, track) in score.tracks.iter().enumerate() {
        write_part(&mut xml, i + 1, track);
    }

    xml.push_str("</score-partwise>\n");
    xml
}

/// Serialize a score as compressed MXL bytes (ZIP archive).
pub fn write_mxl(score: &Score) -> Result<Vec<u8>, RenderError> {
    let xml = write_musicxml(score);

    let container = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <container>\n\
          <rootfiles>\n\
            <rootfile full-path=\"score.xml\" media-type=\"application/vnd.recordare.musicxml+xml\"/>\n\
          </rootfiles>\n\
        </container>\n";

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let zip_err = |e: zip::result::ZipError| RenderError::Serialization(e.to_string());
    let io_err = |e: std::io::Error| RenderError::Serialization(e.to_string());

    writer
        .start_file("META-INF/container.xml", options)
        .map_err(zip_err)?;
    writer.write_all(container.as_bytes()).map_err(io_err)?;

    writer.start_file("score.xml", options).map_err(zip_err)?;
    writer.write_all(xml.as_bytes()).map_err(io_err)?;

    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

/// Write one `<part>`: notes packed greedily into 4/4 measures. A note
/// longer than the space left in its bar is emitted whole — the model has
/// no measure structure, so no ties are generated.
fn write_part(xml: &mut String, part_id: usize, track: &Track) {
    xml.push_str(&format!("  <part id=\"P{part_id}\">\n"));

    let mut measure_number = 1;
    let mut filled = 0.0;
    let mut open = false;

    for note in &track.notes {
        if !open {
            open_measure(xml, measure_number, measure_number == 1);
            open = true;
        }

        let ql = note.duration.quarter_length();
        let divisions = (note.duration.num * DIVISIONS / note.duration.den).max(1);

        xml.push_str("      <note>\n");
        xml.push_str("        <pitch>\n");
        xml.push_str(&format!(
            "          <step>{}</step>\n",
            note.pitch.step.letter()
        ));
        if let Some(acc) = note.pitch.accidental {
            let alter = match acc {
                Accidental::Sharp => 1,
                Accidental::Flat => -1,
            };
            xml.push_str(&format!("          <alter>{alter}</alter>\n"));
        }
        xml.push_str(&format!(
            "          <octave>{}</octave>\n",
            note.pitch.octave
        ));
        xml.push_str("        </pitch>\n");
        xml.push_str(&format!("        <duration>{divisions}</duration>\n"));
        xml.push_str(&format!(
            "        <type>{}</type>\n",
            notation::duration_type_name(&note.duration)
        ));
        if notation::duration_is_dotted(&note.duration) {
            xml.push_str("        <dot/>\n");
        }
        xml.push_str("      </note>\n");

        filled += ql;
        if filled >= QUARTERS_PER_MEASURE {
            xml.push_str("    </measure>\n");
            open = false;
            measure_number += 1;
            filled = 0.0;
        }
    }

    if open {
        xml.push_str("    </measure>\n");
    } else if measure_number == 1 {
        // Empty track still gets one empty measure so the part is valid.
        open_measure(xml, 1, true);
        xml.push_str("    </measure>\n");
    }

    xml.push_str("  </part>\n");
}

/// Open a `<measure>`; the first measure carries divisions and time
/// signature attributes.
fn open_measure(xml: &mut String, number: u32, with_attributes: bool) {
    xml.push_str(&format!("    <measure number=\"{number}\">\n"));
    if with_attributes {
        xml.push_str("      <attributes>\n");
        xml.push_str(&format!(
            "        <divisions>{DIVISIONS}</divisions>\n"
        ));
        xml.push_str("        <time>\n          <beats>4</beats>\n          <beat-type>4</beat-type>\n        </time>\n");
        xml.push_str("      </attributes>\n");
    }
}

/// Escape XML text content.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_score, NoteInput, ScoreInput, TrackInput};

    fn sample_score() -> Score {
        let input = ScoreInput {
            title: "Étude & Test".to_string(),
            tracks: vec![TrackInput {
                notes: vec![
                    NoteInput {
                        pitch: "C4".into(),
                        duration: "quarter".into(),
                    },
                    NoteInput {
                        pitch: "F#4".into(),
                        duration: "half".into(),
                    },
                ],
            }],
        };
        build_score(&input).unwrap().score
    }

    #[test]
    fn musicxml_escapes_title_and_orders_elements() {
        let xml = write_musicxml(&sample_score());
        assert!(xml.contains("<work-title>Étude &amp; Test</work-title>"));
        let c = xml.find("<step>C</step>").unwrap();
        let f = xml.find("<step>F</step>").unwrap();
        assert!(c < f, "notes must appear in input order");
        assert!(xml.contains("<alter>1</alter>"));
    }

    #[test]
    fn musicxml_is_deterministic() {
        let score = sample_score();
        assert_eq!(write_musicxml(&score), write_musicxml(&score));
    }
}
