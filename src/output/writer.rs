//! Path handling shared by the JSON and flamegraph writers.

use crate::utils::error::OutputError;
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Check an output path and create its missing parent directories
///
/// # Errors
/// * `OutputError::InvalidPath` - path is empty, is a directory, or its
///   parent cannot be created
pub fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

/// Write a text payload through a buffered writer, returning its size
pub fn write_text(content: &str, path: &Path) -> Result<usize, OutputError> {
    prepare_output_path(path)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;

    Ok(content.len())
}

pub fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(
            prepare_output_path(Path::new("")),
            Err(OutputError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_directory_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(prepare_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_text_creates_parents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a/b/out.txt");

        let written = write_text("main 1\n", &path).unwrap();

        assert_eq!(written, 7);
        assert_eq!(calculate_file_size(&path), 7);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "main 1\n");
    }
}
