use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

use crate::error::{Error, Result};

pub const SIDECAR_FILE_NAME: &str = "ffmetadata.txt";

/// Where the intermediate FFMETADATA file lives for one run.
#[derive(Debug)]
pub enum Sidecar {
    /// Private temporary directory, removed on drop.
    Temporary { _dir: TempDir, path: PathBuf },
    /// Caller-chosen path that is left in place.
    Kept(PathBuf),
}

impl Sidecar {
    pub fn create(keep_at: Option<&Path>) -> Result<Self> {
        match keep_at {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|e| {
                        Error::io(
                            format!("Failed to create directory {}", parent.display()),
                            e,
                        )
                    })?;
                }
                Ok(Sidecar::Kept(path.to_path_buf()))
            }
            None => {
                let (dir, path) = create_temp_file(SIDECAR_FILE_NAME)?;
                Ok(Sidecar::Temporary { _dir: dir, path })
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Sidecar::Temporary { path, .. } => path,
            Sidecar::Kept(path) => path,
        }
    }
}

/// Reserves `name` inside a fresh temporary directory.
///
/// The file itself is not created; it disappears with the returned `TempDir`.
pub fn create_temp_file<P: AsRef<Path>>(name: P) -> Result<(TempDir, PathBuf)> {
    let temp_dir = tempfile::tempdir()
        .map_err(|e| Error::io("Failed to create temporary directory", e))?;
    let file_name = name.as_ref().file_name().ok_or_else(|| {
        Error::io(
            "Invalid temporary file name",
            io::Error::from(io::ErrorKind::InvalidInput),
        )
    })?;
    let temp_path = temp_dir.path().join(file_name);

    Ok((temp_dir, temp_path))
}
