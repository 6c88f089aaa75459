//! Subtitle timing and writers
//!
//! Subtitle timing is derived from the synthesized audio itself: each
//! chunk's duration is spread evenly over its graphemes, so the captions
//! track the speech without any forced-alignment model. Writers cover SRT,
//! WebVTT, and ASS.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::core::{Result, TtsError};
use crate::engine::SynthesisResult;

/// One timed caption.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub start: f32,
    pub end: f32,
    pub text: String,
}

/// Supported subtitle file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ass,
}

impl SubtitleFormat {
    /// Parse a format name as used in configs and requests.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            "ass" => Some(Self::Ass),
            _ => None,
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Ass => "ass",
        }
    }
}

/// Accumulates caption timing across a synthesis stream.
///
/// Every grapheme of a chunk gets an equal share of the chunk's audio
/// duration. Whitespace graphemes advance the clock without producing an
/// entry, which keeps word boundaries visible as small gaps. Chunks the
/// engine skipped never reach the tracker, so the clock always matches the
/// concatenated audio exactly.
#[derive(Debug, Default)]
pub struct TimingTracker {
    clock: f32,
    entries: Vec<SubtitleEntry>,
}

impl TimingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one synthesized chunk.
    pub fn record(&mut self, result: &SynthesisResult) {
        let duration = result.duration_secs();
        if result.graphemes.is_empty() {
            self.clock += duration;
            return;
        }
        let per_grapheme = duration / result.graphemes.len() as f32;
        for grapheme in &result.graphemes {
            let end = self.clock + per_grapheme;
            if !grapheme.trim().is_empty() {
                self.entries.push(SubtitleEntry {
                    start: self.clock,
                    end,
                    text: grapheme.clone(),
                });
            }
            self.clock = end;
        }
    }

    /// Seconds of audio recorded so far.
    pub fn elapsed(&self) -> f32 {
        self.clock
    }

    /// All entries recorded so far.
    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    /// Consume the tracker, returning its entries.
    pub fn into_entries(self) -> Vec<SubtitleEntry> {
        self.entries
    }
}

/// Merge per-grapheme entries into caption lines of at most `max_words`.
///
/// A clock gap between consecutive entries marks a word boundary (that gap
/// is where a whitespace grapheme advanced the clock). Entries with no gap
/// between them are glued back together without a separator.
pub fn group_entries(entries: &[SubtitleEntry], max_words: usize) -> Vec<SubtitleEntry> {
    const GAP: f32 = 1e-4;
    let max_words = max_words.max(1);

    let mut grouped: Vec<SubtitleEntry> = Vec::new();
    let mut current: Option<SubtitleEntry> = None;
    let mut words = 1usize;

    for entry in entries {
        match current.as_mut() {
            None => {
                current = Some(entry.clone());
                words = 1;
            }
            Some(building) => {
                let is_word_boundary = entry.start - building.end > GAP;
                if is_word_boundary && words >= max_words {
                    grouped.push(current.take().unwrap());
                    current = Some(entry.clone());
                    words = 1;
                } else {
                    if is_word_boundary {
                        building.text.push(' ');
                        words += 1;
                    }
                    building.text.push_str(&entry.text);
                    building.end = entry.end;
                }
            }
        }
    }
    if let Some(last) = current {
        grouped.push(last);
    }
    grouped
}

/// Write entries in the format chosen by `format`.
pub fn write_subtitles(
    path: impl AsRef<Path>,
    format: SubtitleFormat,
    entries: &[SubtitleEntry],
) -> Result<()> {
    let content = match format {
        SubtitleFormat::Srt => render_srt(entries),
        SubtitleFormat::Vtt => render_vtt(entries),
        SubtitleFormat::Ass => render_ass(entries),
    };
    fs::write(path.as_ref(), content).map_err(|e| TtsError::Io {
        message: format!("Failed to write subtitle file: {}", e),
        path: Some(path.as_ref().to_path_buf()),
    })
}

fn render_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_clock(entry.start, ','),
            format_clock(entry.end, ','),
            entry.text
        );
    }
    out
}

fn render_vtt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for entry in entries {
        let _ = write!(
            out,
            "{} --> {}\n{}\n\n",
            format_clock(entry.start, '.'),
            format_clock(entry.end, '.'),
            entry.text
        );
    }
    out
}

fn render_ass(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    out.push_str("[Script Info]\n");
    out.push_str("Title: Bookvoice Subtitles\n");
    out.push_str("ScriptType: v4.00+\n\n");
    out.push_str("[V4+ Styles]\n");
    out.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    out.push_str(
        "Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,0,2,10,10,10,1\n\n",
    );
    out.push_str("[Events]\n");
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for entry in entries {
        let _ = write!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_ass_time(entry.start),
            format_ass_time(entry.end),
            entry.text
        );
    }
    out
}

/// `HH:MM:SS<sep>mmm` clock used by SRT (comma) and WebVTT (dot).
fn format_clock(seconds: f32, sep: char) -> String {
    let total_millis = (seconds.max(0.0) as f64 * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}{sep}{millis:03}")
}

/// `H:MM:SS.cc` clock used by ASS.
fn format_ass_time(seconds: f32) -> String {
    let total_centis = (seconds.max(0.0) as f64 * 100.0).round() as u64;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let secs = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;
    format!("{hours}:{minutes:02}:{secs:02}.{centis:02}")
}
