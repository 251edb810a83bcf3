use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::chapters::{Chapters, append_chapters, compute_chapters};
use crate::error::{Error, Result};
use crate::project::read_project;
use crate::remux::{MetadataExtractor, Remuxer};
use crate::temp::Sidecar;

#[derive(Clone, Debug)]
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Kdenlive project holding the guides.
    pub guides: PathBuf,
    /// Keep the sidecar metadata file here instead of a temporary directory.
    pub metadata: Option<PathBuf>,
    /// Stop after computing chapters.
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct Summary {
    pub chapters: Chapters,
    /// `None` on a dry run.
    pub output: Option<PathBuf>,
}

/// Reads the guides, writes them next to the input's metadata and remuxes.
///
/// Nothing is written before the project has been parsed. If the remux fails
/// the partially written output is removed.
pub fn run(
    options: &Options,
    extractor: &impl MetadataExtractor,
    remuxer: &impl Remuxer,
) -> Result<Summary> {
    log::info!("Reading guides from \"{}\"", options.guides.display());
    let project = read_project(&options.guides)?;
    let chapters = compute_chapters(&project.guides, &project.timeline);
    log::info!(
        "Found {} guides ({} fps, {} frames)",
        chapters.num_chapters(),
        project.timeline.frame_rate,
        project.timeline.total_frames
    );
    for chapter in &chapters {
        log::debug!("{chapter}");
    }

    if options.dry_run {
        return Ok(Summary {
            chapters,
            output: None,
        });
    }

    let sidecar = Sidecar::create(options.metadata.as_deref())?;
    extractor.extract_metadata(&options.input, sidecar.path())?;
    append_chapters(sidecar.path(), &chapters)?;

    let before = file_state(&options.output);
    if let Err(err) = remuxer.remux(&options.input, sidecar.path(), &options.output) {
        remove_partial_output(&options.output, before);
        return Err(err.into());
    }

    log::info!(
        "Wrote {} chapters to \"{}\"",
        chapters.num_chapters(),
        options.output.display()
    );
    Ok(Summary {
        chapters,
        output: Some(options.output.clone()),
    })
}

/// Modification time and length, `None` if the file does not exist.
fn file_state(path: &Path) -> Option<(SystemTime, u64)> {
    let metadata = fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

/// Removes `output` if the failed remux created or touched it.
///
/// A file rewritten with the same length within one mtime tick of the
/// filesystem is indistinguishable from an untouched one and is kept.
fn remove_partial_output(output: &Path, before: Option<(SystemTime, u64)>) {
    let after = file_state(output);
    if after.is_none() || after == before {
        return;
    }

    match fs::remove_file(output) {
        Ok(()) => log::warn!("Removed partial output \"{}\"", output.display()),
        Err(e) => log::error!(
            "{}",
            Error::io(
                format!("Failed to remove partial output {}", output.display()),
                e
            )
        ),
    }
}
