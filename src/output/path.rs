use crate::config::{OutputFormat, OutputMode};
use crate::ChandereError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Validates the output option and returns the path the sink writes to
///
/// - Download mode needs an existing writable directory.
/// - Archive mode accepts a writable directory, in which case the format's
///   stock filename is appended, or a file path whose parent directory is
///   writable.
/// - Probe mode writes nothing and accepts any path.
///
/// Writability is probed by creating a temporary file.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Directory (download) or archive file (archive)
/// * `Err(ChandereError::UnwritableOutputPath)` - Nothing can be written there
pub fn resolve_output_path(
    output: &Path,
    mode: OutputMode,
    format: OutputFormat,
) -> Result<PathBuf, ChandereError> {
    let unwritable = |reason: String| ChandereError::UnwritableOutputPath {
        path: output.to_path_buf(),
        reason,
    };

    match mode {
        OutputMode::Probe => Ok(output.to_path_buf()),
        OutputMode::Download => {
            if !output.is_dir() {
                return Err(unwritable("not an existing directory".to_string()));
            }
            probe_writable(output).map_err(unwritable)?;
            Ok(output.to_path_buf())
        }
        OutputMode::Archive => {
            if output.is_dir() {
                probe_writable(output).map_err(unwritable)?;
                return Ok(output.join(format.default_filename()));
            }

            let parent = match output.parent() {
                Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
                Some(dir) => dir,
                None => return Err(unwritable("no parent directory".to_string())),
            };
            if !parent.is_dir() {
                return Err(unwritable(format!(
                    "parent directory {} does not exist",
                    parent.display()
                )));
            }
            probe_writable(parent).map_err(unwritable)?;

            if output.exists() {
                let meta = fs::metadata(output).map_err(|e| unwritable(e.to_string()))?;
                if meta.permissions().readonly() {
                    return Err(unwritable("file is read-only".to_string()));
                }
            }
            Ok(output.to_path_buf())
        }
    }
}

fn probe_writable(dir: &Path) -> Result<(), String> {
    NamedTempFile::new_in(dir)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
