use std::ffi::OsString;
use std::fmt::{self, Display, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::project::{Guide, Timeline};

/// Ticks per second of chapter START/END values.
pub const TIMEBASE: i64 = 1_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chapter {
    /// Start in ticks of `1 / TIMEBASE` seconds.
    pub start: i64,
    /// End in ticks, inclusive of the chapter's last frame.
    pub end: i64,
    pub title: String,
}

impl Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Start: {:<19} End: {:<19} Title: {}",
            format_ticks(self.start),
            format_ticks(self.end),
            self.title
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chapters {
    chapters: Vec<Chapter>,
}

impl From<Chapters> for Vec<Chapter> {
    fn from(chapters: Chapters) -> Self {
        chapters.chapters
    }
}

impl Chapters {
    pub fn num_chapters(&self) -> usize {
        self.chapters.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter()
    }

    pub fn to_os_string(&self) -> OsString {
        let mut output = String::new();

        for chapter in self {
            let _ = writeln!(&mut output, "{chapter}");
        }

        OsString::from(output)
    }
}

impl<'a> IntoIterator for &'a Chapters {
    type Item = &'a Chapter;
    type IntoIter = std::slice::Iter<'a, Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}

/// Turns sorted guides into chapters.
///
/// Each chapter runs up to the frame before the next guide; the last one runs
/// to the final frame of the timeline. Guides at or past the end of the
/// timeline give degenerate chapters, which are kept as they are.
pub fn compute_chapters(guides: &[Guide], timeline: &Timeline) -> Chapters {
    let chapters = guides
        .iter()
        .enumerate()
        .map(|(i, guide)| {
            let next_position = guides
                .get(i + 1)
                .map_or(timeline.total_frames, |next| next.position);

            if guide.position >= timeline.total_frames {
                log::warn!(
                    "Guide \"{}\" at frame {} is past the end of the timeline ({} frames)",
                    guide.label,
                    guide.position,
                    timeline.total_frames
                );
            }

            Chapter {
                start: frame_to_ticks(guide.position as f64, timeline.frame_rate),
                end: frame_to_ticks(next_position as f64 - 1.0, timeline.frame_rate),
                title: guide.label.clone(),
            }
        })
        .collect();

    Chapters { chapters }
}

/// Out-of-range results saturate at the `i64` bounds.
fn frame_to_ticks(frame: f64, frame_rate: f64) -> i64 {
    (frame / frame_rate * TIMEBASE as f64).round_ties_even() as i64
}

/// Writes one FFMETADATA `[CHAPTER]` block per chapter.
pub fn write_chapters<W: Write>(writer: &mut W, chapters: &Chapters) -> io::Result<()> {
    for chapter in chapters {
        writeln!(writer, "[CHAPTER]")?;
        writeln!(writer, "TIMEBASE=1/{TIMEBASE}")?;
        writeln!(writer, "START={}", chapter.start)?;
        writeln!(writer, "END={}", chapter.end)?;
        writeln!(writer, "title={}", escape_metadata_value(&chapter.title))?;
    }
    Ok(())
}

/// Appends chapter blocks after the metadata already in `path`.
pub fn append_chapters(path: impl AsRef<Path>, chapters: &Chapters) -> Result<()> {
    let path = path.as_ref();
    let context = || format!("Failed to append chapters to {}", path.display());

    let existing = fs::read(path).map_err(|e| Error::io(context(), e))?;
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::io(context(), e))?;

    let needs_newline = !existing.is_empty() && !existing.ends_with(b"\n");
    write_after(file, needs_newline, chapters).map_err(|e| Error::io(context(), e))?;

    log::debug!(
        "Appended {} chapters to {}",
        chapters.num_chapters(),
        path.display()
    );
    Ok(())
}

fn write_after(file: File, needs_newline: bool, chapters: &Chapters) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    if needs_newline {
        writeln!(writer)?;
    }
    write_chapters(&mut writer, chapters)?;
    writer.flush()
}

/// FFMETADATA values escape `=`, `;`, `#`, `\` and newlines with a backslash.
fn escape_metadata_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '=' | ';' | '#' | '\\' | '\n' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\r' => {}
            _ => escaped.push(c),
        }
    }

    escaped
}

/// Formats ticks as `HH:MM:SS.nnnnnnnnn`.
fn format_ticks(ticks: i64) -> String {
    let sign = if ticks < 0 { "-" } else { "" };
    let ticks = ticks.unsigned_abs();
    let timebase = TIMEBASE as u64;

    let secs = ticks / timebase;
    let nanos = ticks % timebase;
    format!(
        "{sign}{:02}:{:02}:{:02}.{:09}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60,
        nanos
    )
}
