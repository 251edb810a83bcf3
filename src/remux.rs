use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Dumps a media file's container metadata, without chapters, to a sidecar file.
pub trait MetadataExtractor {
    fn extract_metadata(&self, input: &Path, sidecar: &Path) -> Result<(), ToolError>;
}

/// Copies the streams of `input` into `output` with metadata taken from `sidecar`.
pub trait Remuxer {
    fn remux(&self, input: &Path, sidecar: &Path, output: &Path) -> Result<(), ToolError>;
}

#[derive(Clone, Debug)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, tool: &'static str, args: Vec<OsString>) -> Result<(), ToolError> {
        log::debug!("Running {} {:?}", self.program.display(), args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ToolError::Spawn {
                tool,
                program: self.program.clone(),
                source,
            })?;

        let status = output.status;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            log::debug!("stdout\n{}", String::from_utf8_lossy(&output.stdout));
            log::debug!("stderr\n{}", stderr);
            return Err(ToolError::Failed {
                tool,
                status,
                stderr,
            });
        }

        Ok(())
    }
}

impl MetadataExtractor for Ffmpeg {
    fn extract_metadata(&self, input: &Path, sidecar: &Path) -> Result<(), ToolError> {
        log::info!(
            "Extracting metadata \"{}\" to \"{}\"",
            input.display(),
            sidecar.display()
        );
        self.run("ffmpeg metadata extraction", extract_args(input, sidecar))
    }
}

impl Remuxer for Ffmpeg {
    fn remux(&self, input: &Path, sidecar: &Path, output: &Path) -> Result<(), ToolError> {
        log::info!(
            "Remuxing \"{}\" with \"{}\" to \"{}\"",
            input.display(),
            sidecar.display(),
            output.display()
        );
        self.run("ffmpeg remux", remux_args(input, sidecar, output))
    }
}

/// `-hide_banner -nostdin -y -i <input> -map_chapters -1 -f ffmetadata <sidecar>`
pub fn extract_args(input: &Path, sidecar: &Path) -> Vec<OsString> {
    let mut args = Vec::from(["-hide_banner", "-nostdin", "-y", "-i"].map(OsString::from));
    args.push(input.into());
    args.extend(["-map_chapters", "-1", "-f", "ffmetadata"].map(OsString::from));
    args.push(sidecar.into());
    args
}

/// `-hide_banner -nostdin -y -i <input> -i <sidecar> -map 0 -map_metadata 1 -map_chapters 1 -codec copy <output>`
pub fn remux_args(input: &Path, sidecar: &Path, output: &Path) -> Vec<OsString> {
    let mut args = Vec::from(["-hide_banner", "-nostdin", "-y", "-i"].map(OsString::from));
    args.push(input.into());
    args.push("-i".into());
    args.push(sidecar.into());
    args.extend(
        [
            "-map",
            "0",
            "-map_metadata",
            "1",
            "-map_chapters",
            "1",
            "-codec",
            "copy",
        ]
        .map(OsString::from),
    );
    args.push(output.into());
    args
}
