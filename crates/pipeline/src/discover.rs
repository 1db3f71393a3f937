use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const LOG_EXTENSIONS: &[&str] = &["log", "gz", "bz2"];

/// Non-recursive scan of `dir` for log files, sorted for deterministic run
/// order. A missing or unreadable directory yields an empty list, not an
/// error: log volumes come and go with mounts and rotation.
#[must_use]
pub fn discover_log_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        log::warn!("log directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    let ext = ext.to_ascii_lowercase();
                    LOG_EXTENSIONS.iter().any(|known| *known == ext)
                })
        })
        .collect();
    files.sort();
    files
}
