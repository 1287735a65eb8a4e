//! Initial scan of a watched directory.

use crate::error::{IngestError, IngestResult};
use lectern_core::IngestionSink;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Collect every supported file under `dir`, skipping hidden files and directories.
pub fn scan_directory(dir: &Path, sink: &dyn IngestionSink) -> IngestResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::WatchSetup {
            root: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let files = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| sink.is_supported(path))
        .collect();

    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use std::fs;

    #[test]
    fn test_scan_skips_hidden_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("papers/2024")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("a.pdf"), "a").unwrap();
        fs::write(root.join("papers/2024/b.PDF"), "b").unwrap();
        fs::write(root.join("papers/notes.txt"), "n").unwrap();
        fs::write(root.join(".hidden.pdf"), "h").unwrap();
        fs::write(root.join(".cache/c.pdf"), "c").unwrap();

        let sink = RecordingSink::default().supporting(&["pdf"]);
        let files = scan_directory(root, &sink).unwrap();

        assert_eq!(files, vec![root.join("a.pdf"), root.join("papers/2024/b.PDF")]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::default();
        let result = scan_directory(&dir.path().join("nope"), &sink);
        assert!(matches!(result, Err(IngestError::WatchSetup { .. })));
    }
}
