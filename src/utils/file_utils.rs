use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Read a binary file using memory mapping
///
/// The map is released when the returned value is dropped.
pub fn read_binary_file_mmap(path: impl AsRef<Path>) -> io::Result<Mmap> {
    let file = File::open(path)?;
    // Safety: The file is not modified while the mmap is active
    unsafe { Mmap::map(&file) }
}

/// Experiment name for a source file: its file name with every '.' replaced by '_'.
pub fn experiment_name_from_path(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().replace('.', "_"))
        .unwrap_or_else(|| "experiment".to_string())
}

/// File-system safe form of an experiment name.
pub fn sanitize_file_stem(name: &str) -> String {
    name.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_name_replaces_dots() {
        assert_eq!(
            experiment_name_from_path("/data/scans/cell.0_00012.spm"),
            "cell_0_00012_spm"
        );
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("a b/c:d-e_f"), "a_b_c_d-e_f");
    }
}
