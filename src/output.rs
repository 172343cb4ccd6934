use std::io::Write;
use std::path::{Path, PathBuf};
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Cannot write {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Cannot replace {path}: {source}")]
    Persist { path: PathBuf, source: tempfile::PersistError },
}

/// Writes `contents` to `path` so that readers see either the old file or the complete new one.
pub fn write_atomically(path: &Path, contents: &str) -> Result<(), OutputError> {
    let io_error = |source| OutputError::Io { path: path.to_path_buf(), source };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    temp_file.write_all(contents.as_bytes()).map_err(io_error)?;
    temp_file.as_file().sync_all().map_err(io_error)?;
    temp_file.persist(path).map_err(|source| OutputError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
