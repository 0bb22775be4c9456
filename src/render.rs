//! Render pipeline — turns a score segment into a finished artifact.
//!
//! Audio export runs four strictly sequential stages:
//!   1. metadata application (tempo marking + instrument program, pure
//!      in-memory, folded into the MIDI encoder),
//!   2. symbolic → MIDI (SMF bytes written to a scoped temp file),
//!   3. MIDI → PCM via an external synthesis engine,
//!   4. PCM → compressed audio via an external transcoder.
//!
//! Stages 3 and 4 sit behind the narrow `Synthesizer` / `Transcoder`
//! traits so tests can stub them out. Every intermediate is a
//! `tempfile::NamedTempFile`, deleted on drop on every exit path — a
//! failed or cancelled render leaves no temp files behind, and the final
//! artifact is persisted into the export directory only on success, so no
//! partial output file ever remains either.
//!
//! The crate is synchronous; callers on a cooperative scheduler should run
//! renders on their blocking pool (the external invocations block).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use uuid::Uuid;

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::midi;
use crate::model::{Score, Segment};
use crate::musicxml;

/// Poll interval while waiting on an external process.
const WAIT_POLL: StdDuration = StdDuration::from_millis(25);

/// Synthesis output sample rate.
const SAMPLE_RATE: &str = "44100";

// ═══════════════════════════════════════════════════════════════════════
// Request vocabulary
// ═══════════════════════════════════════════════════════════════════════

/// The closed instrument set. Unrecognized selections fall back to piano.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Instrument {
    #[default]
    Piano,
    Violin,
    Flute,
    Guitar,
}

impl Instrument {
    /// Strict lookup by (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Instrument> {
        match name.to_ascii_lowercase().as_str() {
            "piano" => Some(Instrument::Piano),
            "violin" => Some(Instrument::Violin),
            "flute" => Some(Instrument::Flute),
            "guitar" => Some(Instrument::Guitar),
            _ => None,
        }
    }

    /// Lookup with the documented default fallback. The second element is
    /// true when the name was unrecognized and piano was substituted —
    /// the fallback is also logged, never silent.
    pub fn resolve(name: &str) -> (Instrument, bool) {
        match Self::from_name(name) {
            Some(instrument) => (instrument, false),
            None => {
                tracing::warn!(
                    name,
                    "unrecognized instrument, falling back to piano"
                );
                (Instrument::Piano, true)
            }
        }
    }

    /// General MIDI program number.
    pub fn midi_program(self) -> u8 {
        match self {
            Instrument::Piano => 0,
            Instrument::Violin => 40,
            Instrument::Flute => 73,
            Instrument::Guitar => 24,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Piano => "Piano",
            Instrument::Violin => "Violin",
            Instrument::Flute => "Flute",
            Instrument::Guitar => "Guitar",
        }
    }
}

/// Supported compressed audio output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Ogg,
    Flac,
}

impl AudioFormat {
    /// Parse a format name or file extension.
    pub fn from_name(name: &str) -> Result<AudioFormat, RenderError> {
        match name.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" => Ok(AudioFormat::Ogg),
            "flac" => Ok(AudioFormat::Flac),
            _ => Err(RenderError::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }
}

/// Notation output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationFormat {
    /// Uncompressed MusicXML
    MusicXml,
    /// Compressed MXL (ZIP archive)
    Mxl,
}

impl NotationFormat {
    pub fn extension(self) -> &'static str {
        match self {
            NotationFormat::MusicXml => "musicxml",
            NotationFormat::Mxl => "mxl",
        }
    }
}

/// Format tag carried on a finished artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Audio(AudioFormat),
    Notation(NotationFormat),
}

/// A finished output file. The file exists and is complete when this is
/// returned; retention and cleanup policy belong to the caller.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub format: ArtifactFormat,
}

/// A validated audio render request.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub segment: Segment<'a>,
    pub instrument: Instrument,
    pub tempo_bpm: f64,
    pub format: AudioFormat,
}

impl<'a> RenderRequest<'a> {
    /// Build a request, rejecting non-positive or non-finite tempos.
    pub fn new(
        segment: Segment<'a>,
        instrument: Instrument,
        tempo_bpm: f64,
        format: AudioFormat,
    ) -> Result<Self, RenderError> {
        if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            return Err(RenderError::InvalidTempo(tempo_bpm));
        }
        Ok(Self {
            segment,
            instrument,
            tempo_bpm,
            format,
        })
    }
}

/// Cooperative cancellation flag, shareable across threads. When set, the
/// pipeline kills any outstanding external process and runs the same
/// cleanup as a failure path.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// External tool boundaries
// ═══════════════════════════════════════════════════════════════════════

/// MIDI → PCM boundary. Kept narrow so tests can stub the external
/// synthesis engine.
pub trait Synthesizer {
    fn synthesize(
        &self,
        midi_path: &Path,
        pcm_path: &Path,
        cancel: &CancelToken,
    ) -> Result<(), RenderError>;
}

/// PCM → compressed audio boundary.
pub trait Transcoder {
    fn transcode(
        &self,
        pcm_path: &Path,
        out_path: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
    ) -> Result<(), RenderError>;
}

/// Outcome of running an external tool to completion.
enum ToolFailure {
    /// The binary could not be spawned at all.
    Spawn(std::io::Error),
    /// The bounded wait elapsed; the process was killed.
    TimedOut { waited: StdDuration, stderr: String },
    /// The caller cancelled; the process was killed.
    Cancelled,
    /// Non-zero exit.
    NonZero { code: Option<i32>, stderr: String },
    /// Waiting on the child failed.
    Wait(std::io::Error),
}

/// Run a command with a bounded wait, draining stderr on a helper thread
/// (so a chatty tool cannot deadlock the pipe) and killing the child on
/// timeout or cancellation.
fn run_tool(
    mut command: Command,
    timeout: StdDuration,
    cancel: &CancelToken,
) -> Result<(), ToolFailure> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(ToolFailure::Spawn)?;

    let stderr = child.stderr.take();
    let drain = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr {
            use std::io::Read;
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });
    let collect_stderr =
        move || drain.join().unwrap_or_else(|_| String::new());

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stderr = collect_stderr();
                if status.success() {
                    return Ok(());
                }
                return Err(ToolFailure::NonZero {
                    code: status.code(),
                    stderr,
                });
            }
            Ok(None) => {
                if cancel.is_cancelled() {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = collect_stderr();
                    return Err(ToolFailure::Cancelled);
                }
                if started.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolFailure::TimedOut {
                        waited: started.elapsed(),
                        stderr: collect_stderr(),
                    });
                }
                std::thread::sleep(WAIT_POLL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = collect_stderr();
                return Err(ToolFailure::Wait(e));
            }
        }
    }
}

/// Format a tool failure for an error message, attaching diagnostics.
fn describe_failure(tool: &str, failure: &ToolFailure) -> String {
    match failure {
        ToolFailure::Spawn(e) => format!("failed to start {tool}: {e}"),
        ToolFailure::TimedOut { waited, stderr } => format!(
            "{tool} timed out after {:.1}s; stderr: {}",
            waited.as_secs_f64(),
            stderr.trim()
        ),
        ToolFailure::Cancelled => format!("{tool} cancelled"),
        ToolFailure::NonZero { code, stderr } => format!(
            "{tool} exited with code {:?}; stderr: {}",
            code,
            stderr.trim()
        ),
        ToolFailure::Wait(e) => format!("failed waiting on {tool}: {e}"),
    }
}

/// Production synthesizer: the `fluidsynth` command-line engine rendering
/// MIDI through a SoundFont soundbank.
#[derive(Debug, Clone)]
pub struct FluidSynth {
    binary: PathBuf,
    soundbank: PathBuf,
    gain: f64,
    timeout: StdDuration,
}

impl FluidSynth {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            binary: config.fluidsynth.clone(),
            soundbank: config.soundbank.clone(),
            gain: config.gain,
            timeout: StdDuration::from_secs(config.timeout_secs),
        }
    }
}

impl Synthesizer for FluidSynth {
    fn synthesize(
        &self,
        midi_path: &Path,
        pcm_path: &Path,
        cancel: &CancelToken,
    ) -> Result<(), RenderError> {
        if !self.soundbank.is_file() {
            return Err(RenderError::SynthesisResourceMissing(
                self.soundbank.clone(),
            ));
        }

        tracing::debug!(
            midi = %midi_path.display(),
            pcm = %pcm_path.display(),
            soundbank = %self.soundbank.display(),
            "running synthesis engine"
        );

        let mut command = Command::new(&self.binary);
        command
            .arg("-ni")
            .arg("-g")
            .arg(self.gain.to_string())
            .arg("-F")
            .arg(pcm_path)
            .arg("-r")
            .arg(SAMPLE_RATE)
            .arg(&self.soundbank)
            .arg(midi_path);

        match run_tool(command, self.timeout, cancel) {
            Ok(()) => {}
            Err(ToolFailure::Cancelled) => return Err(RenderError::Cancelled),
            Err(ToolFailure::Spawn(e))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                return Err(RenderError::SynthesisResourceMissing(
                    self.binary.clone(),
                ))
            }
            Err(failure) => {
                return Err(RenderError::SynthesisFailed(describe_failure(
                    "fluidsynth",
                    &failure,
                )))
            }
        }

        // Exit code 0 alone is not enough: the engine must have produced
        // a non-empty PCM file.
        let size = std::fs::metadata(pcm_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(RenderError::SynthesisFailed(
                "fluidsynth produced an empty PCM file".to_string(),
            ));
        }

        Ok(())
    }
}

/// Production transcoder: `ffmpeg`, error-only log verbosity, output
/// format chosen by the target path's extension.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    timeout: StdDuration,
}

impl FfmpegTranscoder {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            binary: config.ffmpeg.clone(),
            timeout: StdDuration::from_secs(config.timeout_secs),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &self,
        pcm_path: &Path,
        out_path: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
    ) -> Result<(), RenderError> {
        tracing::debug!(
            pcm = %pcm_path.display(),
            out = %out_path.display(),
            format = format.extension(),
            "running transcoder"
        );

        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(pcm_path)
            .arg(out_path);

        match run_tool(command, self.timeout, cancel) {
            Ok(()) => {}
            Err(ToolFailure::Cancelled) => return Err(RenderError::Cancelled),
            Err(failure) => {
                return Err(RenderError::TranscodeFailed(describe_failure(
                    "ffmpeg", &failure,
                )))
            }
        }

        // Same success contract as synthesis: exit code 0 alone is not
        // enough, the transcoder must have produced a non-empty file.
        let size = std::fs::metadata(out_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(RenderError::TranscodeFailed(
                "ffmpeg produced an empty output file".to_string(),
            ));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// The pipeline
// ═══════════════════════════════════════════════════════════════════════

/// Drives the audio export pipeline. Each render owns its private
/// intermediates; separate threads may render concurrently with no shared
/// mutable state.
pub struct AudioRenderer<S = FluidSynth, T = FfmpegTranscoder> {
    synthesizer: S,
    transcoder: T,
    export_dir: PathBuf,
}

impl AudioRenderer<FluidSynth, FfmpegTranscoder> {
    /// Build the production pipeline from validated configuration.
    pub fn from_config(config: &RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            synthesizer: FluidSynth::new(config),
            transcoder: FfmpegTranscoder::new(config),
            export_dir: config.export_dir.clone(),
        })
    }
}

impl<S: Synthesizer, T: Transcoder> AudioRenderer<S, T> {
    /// Build a pipeline over custom stage implementations (used by tests
    /// to stub the external tools).
    pub fn new(synthesizer: S, transcoder: T, export_dir: PathBuf) -> Self {
        Self {
            synthesizer,
            transcoder,
            export_dir,
        }
    }

    /// Render a segment to a compressed audio artifact.
    pub fn render(&self, request: &RenderRequest<'_>) -> Result<Artifact, RenderError> {
        self.render_cancellable(request, &CancelToken::new())
    }

    /// Render with cooperative cancellation. On any failure or
    /// cancellation, all intermediates created so far are removed before
    /// returning.
    pub fn render_cancellable(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<Artifact, RenderError> {
        if request.segment.is_empty() {
            tracing::debug!(
                track = request.segment.track_index,
                "segment is empty; rendering silence"
            );
        }

        // Stages 1+2: metadata application and MIDI encoding. Tempo and
        // instrument are applied by the encoder; the bytes land in a
        // scoped temp file that is deleted on every exit path below.
        let smf = midi::encode_segment(&request.segment, request.instrument, request.tempo_bpm);

        let mut midi_file = tempfile::Builder::new()
            .prefix("render-")
            .suffix(".mid")
            .tempfile()
            .map_err(RenderError::Encoding)?;
        midi_file.write_all(&smf).map_err(RenderError::Encoding)?;
        midi_file.flush().map_err(RenderError::Encoding)?;

        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        // Stage 3: synthesis into a scoped PCM temp file.
        let pcm_file = tempfile::Builder::new()
            .prefix("render-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| {
                RenderError::SynthesisFailed(format!(
                    "failed to create PCM scratch file: {e}"
                ))
            })?;
        self.synthesizer
            .synthesize(midi_file.path(), pcm_file.path(), cancel)?;

        // Stage 4: transcode into a temp file inside the export directory,
        // persisted under its final name only on success — a failed render
        // never leaves a partial artifact.
        let extension = request.format.extension();
        let out_file = tempfile::Builder::new()
            .prefix(".render-")
            .suffix(&format!(".{extension}"))
            .tempfile_in(&self.export_dir)
            .map_err(|e| {
                RenderError::TranscodeFailed(format!(
                    "failed to create output scratch file: {e}"
                ))
            })?;
        self.transcoder
            .transcode(pcm_file.path(), out_file.path(), request.format, cancel)?;

        let final_path = self
            .export_dir
            .join(format!("segment-{}.{extension}", Uuid::new_v4()));
        out_file.persist(&final_path).map_err(|e| {
            RenderError::TranscodeFailed(format!(
                "failed to finalize artifact: {e}"
            ))
        })?;

        tracing::info!(
            artifact = %final_path.display(),
            notes = request.segment.len(),
            instrument = request.instrument.name(),
            tempo_bpm = request.tempo_bpm,
            "audio render complete"
        );

        Ok(Artifact {
            path: final_path,
            format: ArtifactFormat::Audio(request.format),
        })
    }
}

/// Serialize a score to a notation artifact in the export directory.
///
/// Written through a temp file and persisted on success; fails only with
/// `RenderError::Serialization` on resource exhaustion — the model is
/// always well-formed by construction.
pub fn export_notation(
    score: &Score,
    export_dir: &Path,
    format: NotationFormat,
) -> Result<Artifact, RenderError> {
    let serialization = |e: std::io::Error| RenderError::Serialization(e.to_string());

    std::fs::create_dir_all(export_dir).map_err(serialization)?;

    let bytes = match format {
        NotationFormat::MusicXml => musicxml::write_musicxml(score).into_bytes(),
        NotationFormat::Mxl => musicxml::write_mxl(score)?,
    };

    let extension = format.extension();
    let mut out_file = tempfile::Builder::new()
        .prefix(".notation-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(export_dir)
        .map_err(serialization)?;
    out_file.write_all(&bytes).map_err(serialization)?;
    out_file.flush().map_err(serialization)?;

    let final_path = export_dir.join(format!("score-{}.{extension}", Uuid::new_v4()));
    out_file
        .persist(&final_path)
        .map_err(|e| RenderError::Serialization(e.to_string()))?;

    tracing::info!(
        artifact = %final_path.display(),
        title = %score.title,
        "notation export complete"
    );

    Ok(Artifact {
        path: final_path,
        format: ArtifactFormat::Notation(format),
    })
}
