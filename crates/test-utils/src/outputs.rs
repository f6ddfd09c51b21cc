//! Temporary directories for written chunks.

use std::path::{Path, PathBuf};

/// A temporary directory removed when dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// A temporary directory whose name starts with `prefix`.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Entries of `dir` with the given extension, sorted by file name.
///
/// Zarr chunks are directories and netCDF chunks are files; both are
/// listed. A missing directory gives an empty list.
pub fn list_outputs(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    paths.sort();
    paths
}

/// File names of `paths`, for comparing against expected chunk names.
pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_test_dir_with_prefix() {
        let dir = temp_test_dir_with_prefix("subset_test_");
        assert!(dir.path().exists());
        assert!(dir.path().to_string_lossy().contains("subset_test_"));
    }

    #[test]
    fn test_list_outputs_filters_and_sorts() {
        let dir = temp_test_dir();
        std::fs::create_dir(dir.path().join("output_002.zarr")).unwrap();
        std::fs::create_dir(dir.path().join("output_001.zarr")).unwrap();
        std::fs::write(dir.path().join("output_001.nc"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let zarr = list_outputs(dir.path(), "zarr");
        assert_eq!(file_names(&zarr), vec!["output_001.zarr", "output_002.zarr"]);
        assert_eq!(file_names(&list_outputs(dir.path(), "nc")), vec!["output_001.nc"]);
        assert!(list_outputs(&dir.path().join("missing"), "zarr").is_empty());
    }
}
