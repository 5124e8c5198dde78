//! Common test utilities for `Gale` integration tests.
//!
//! This module provides shared functionality for integration tests.

use std::path::{Path, PathBuf};

use gale_core::share::ShareRoot;

/// Create a temporary directory for test files.
///
/// The directory will be automatically cleaned up when the returned
/// `TempDir` is dropped.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Create a share root over a fresh temp directory populated with a
/// small tree:
///
/// ```text
/// photos/a.jpg
/// photos/sub/b.jpg
/// docs/notes.txt
/// top.txt
/// ```
pub fn create_test_share() -> (tempfile::TempDir, ShareRoot) {
    let dir = create_temp_dir();
    create_test_file(dir.path(), "photos/a.jpg", b"jpeg bytes a");
    create_test_file(dir.path(), "photos/sub/b.jpg", b"jpeg bytes b");
    create_test_file(dir.path(), "docs/notes.txt", b"some notes");
    create_test_file(dir.path(), "top.txt", b"top level");
    let root = ShareRoot::open(dir.path()).expect("open share root");
    (dir, root)
}

/// Count files in a directory whose name matches a predicate.
pub fn count_matching_files(dir: &Path, predicate: impl Fn(&str) -> bool) -> usize {
    std::fs::read_dir(dir)
        .expect("read staging dir")
        .filter_map(std::result::Result::ok)
        .filter(|e| predicate(&e.file_name().to_string_lossy()))
        .count()
}
