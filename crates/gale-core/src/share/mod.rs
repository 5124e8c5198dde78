//! Share root confinement and directory listing.
//!
//! A [`ShareRoot`] is the single directory tree a device exposes to peers.
//! Every caller-supplied path is resolved through [`ShareRoot::resolve`]
//! before any disk access; the resolved path is guaranteed to be the root
//! itself or a descendant of it. This check is the sole defense against
//! directory traversal, so it runs unconditionally and rejects rather
//! than warns.
//!
//! Resolution is two-layered:
//!
//! 1. a lexical pass rejects absolute paths and any `..` sequence that
//!    would climb above the root, without touching the filesystem
//! 2. the joined path is canonicalized (resolving symlinks) and the
//!    result must still sit under the canonical root, compared
//!    segment-wise so `/shareFoo` never passes for root `/share`

pub mod stream;

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// The directory tree exposed to peers. Immutable for process lifetime.
#[derive(Debug, Clone)]
pub struct ShareRoot {
    /// Canonical absolute root path
    root: PathBuf,
}

/// A caller-supplied path resolved against the share root.
///
/// Invariant: the wrapped path is canonical and has the root as a
/// segment-aligned prefix. Constructed only by [`ShareRoot::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    /// The canonical absolute path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Final path component as a display name.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map_or_else(|| "share".to_string(), |n| n.to_string_lossy().to_string())
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Classification of a directory child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (or symlink to one)
    File,
    /// Directory (or symlink to one)
    #[serde(rename = "dir")]
    Directory,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirEntry {
    /// Entry classification
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Path relative to the share root
    pub path: PathBuf,
    /// Bare entry name
    pub name: String,
}

impl ShareRoot {
    /// Open a share root.
    ///
    /// The path is canonicalized once here; the result anchors every
    /// later boundary check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the path does not exist and
    /// [`Error::NotADirectory`] if it is not a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = path.canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        if !root.is_dir() {
            return Err(Error::NotADirectory(path.display().to_string()));
        }

        Ok(Self { root })
    }

    /// The canonical root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied relative path to a location inside the
    /// root.
    ///
    /// # Errors
    ///
    /// - [`Error::PathOutsideRoot`] for absolute input, `..` escapes, or
    ///   symlinks leading out of the root
    /// - [`Error::NotFound`] if the path does not exist under the root
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath> {
        let rel = Path::new(relative);

        // Lexical pass: never consult the filesystem for a path that
        // already escapes on paper. Keeps "../outside-the-root-exists"
        // indistinguishable from "../outside-the-root-does-not".
        let mut depth: i64 = 0;
        for component in rel.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    return Err(Error::PathOutsideRoot(relative.to_string()));
                }
                Component::ParentDir => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(Error::PathOutsideRoot(relative.to_string()));
                    }
                }
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
            }
        }

        let joined = self.root.join(rel);
        let canonical = joined.canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(relative.to_string())
            } else {
                Error::Io(e)
            }
        })?;

        // Second layer: canonicalization resolved symlinks, so re-check
        // the prefix segment-wise.
        if !canonical.starts_with(&self.root) {
            return Err(Error::PathOutsideRoot(relative.to_string()));
        }

        Ok(ResolvedPath(canonical))
    }

    /// Recover the root-relative path of a resolved location.
    ///
    /// Returns an empty path for the root itself.
    #[must_use]
    pub fn relativize(&self, resolved: &ResolvedPath) -> PathBuf {
        resolved
            .as_path()
            .strip_prefix(&self.root)
            .map_or_else(|_| resolved.as_path().to_path_buf(), Path::to_path_buf)
    }

    /// List the immediate children of a resolved directory.
    ///
    /// Children whose type cannot be determined (broken symlink,
    /// permission denied) and children that are neither files nor
    /// directories are skipped, not errored. Ordering is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotADirectory`] when the target is not a
    /// directory, or [`Error::NotFound`] if it vanished since resolution.
    pub fn list(&self, dir: &ResolvedPath) -> Result<Vec<DirEntry>> {
        let relative = self.relativize(dir);

        let metadata = std::fs::metadata(dir.as_path()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(relative.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        if !metadata.is_dir() {
            return Err(Error::NotADirectory(relative.display().to_string()));
        }

        let mut entries = Vec::new();
        for child in std::fs::read_dir(dir.as_path())?.filter_map(std::result::Result::ok) {
            // One stat per child, following symlinks for classification.
            let Ok(meta) = std::fs::metadata(child.path()) else {
                continue;
            };

            let kind = if meta.is_dir() {
                EntryKind::Directory
            } else if meta.is_file() {
                EntryKind::File
            } else {
                continue;
            };

            let name = child.file_name().to_string_lossy().to_string();
            entries.push(DirEntry {
                kind,
                path: relative.join(&name),
                name,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn share_with_files() -> (TempDir, ShareRoot) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        std::fs::write(dir.path().join("top.txt"), b"top").unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("docs/sub/b.txt"), b"b").unwrap();
        let root = ShareRoot::open(dir.path()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_resolve_plain_child() {
        let (_dir, root) = share_with_files();
        let resolved = root.resolve("docs/a.txt").unwrap();
        assert!(resolved.as_path().ends_with("docs/a.txt"));
        assert_eq!(root.relativize(&resolved), PathBuf::from("docs/a.txt"));
    }

    #[test]
    fn test_resolve_empty_is_root() {
        let (_dir, root) = share_with_files();
        let resolved = root.resolve("").unwrap();
        assert_eq!(resolved.as_path(), root.path());
        assert_eq!(root.relativize(&resolved), PathBuf::new());
    }

    #[test]
    fn test_resolve_rejects_parent_escape() {
        let (_dir, root) = share_with_files();
        assert!(matches!(
            root.resolve("../etc/passwd"),
            Err(Error::PathOutsideRoot(_))
        ));
        assert!(matches!(
            root.resolve("docs/../../etc/passwd"),
            Err(Error::PathOutsideRoot(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_absolute_injection() {
        let (_dir, root) = share_with_files();
        assert!(matches!(
            root.resolve("/etc/passwd"),
            Err(Error::PathOutsideRoot(_))
        ));
    }

    #[test]
    fn test_resolve_interior_dotdot_ok() {
        let (_dir, root) = share_with_files();
        let resolved = root.resolve("docs/sub/../a.txt").unwrap();
        assert!(resolved.as_path().ends_with("docs/a.txt"));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let (_dir, root) = share_with_files();
        assert!(matches!(
            root.resolve("docs/absent.txt"),
            Err(Error::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();

        let (dir, root) = share_with_files();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link"))
            .unwrap();

        assert!(matches!(
            root.resolve("link"),
            Err(Error::PathOutsideRoot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_sibling_prefix_does_not_match() {
        // root "/share" must not admit "/shareFoo" via string prefixing.
        let parent = TempDir::new().unwrap();
        let share = parent.path().join("share");
        let sibling = parent.path().join("shareFoo");
        std::fs::create_dir_all(&share).unwrap();
        std::fs::create_dir_all(&sibling).unwrap();
        std::fs::write(sibling.join("leak.txt"), b"leak").unwrap();
        std::os::unix::fs::symlink(sibling.join("leak.txt"), share.join("link")).unwrap();

        let root = ShareRoot::open(&share).unwrap();
        assert!(matches!(
            root.resolve("link"),
            Err(Error::PathOutsideRoot(_))
        ));
    }

    #[test]
    fn test_list_immediate_children_typed() {
        let (_dir, root) = share_with_files();
        let resolved = root.resolve("").unwrap();
        let mut entries = root.list(&resolved).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "docs");
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[1].name, "top.txt");
        assert_eq!(entries[1].kind, EntryKind::File);
        // Immediate children only: nothing from docs/sub.
        assert!(entries.iter().all(|e| e.path.components().count() == 1));
    }

    #[test]
    fn test_list_relative_paths_nest() {
        let (_dir, root) = share_with_files();
        let docs = root.resolve("docs").unwrap();
        let entries = root.list(&docs).unwrap();

        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert_eq!(sub.path, PathBuf::from("docs/sub"));
    }

    #[test]
    fn test_list_non_directory_errors() {
        let (_dir, root) = share_with_files();
        let file = root.resolve("top.txt").unwrap();
        assert!(matches!(root.list(&file), Err(Error::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_skips_broken_symlink() {
        let (dir, root) = share_with_files();
        std::os::unix::fs::symlink("absent-target", dir.path().join("dangling")).unwrap();

        let resolved = root.resolve("").unwrap();
        let entries = root.list(&resolved).unwrap();
        assert!(entries.iter().all(|e| e.name != "dangling"));
    }

    #[test]
    fn test_entry_kind_serializes_like_the_wire_format() {
        let entry = DirEntry {
            kind: EntryKind::Directory,
            path: PathBuf::from("docs"),
            name: "docs".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"dir\""));
        assert!(json.contains("\"name\":\"docs\""));
    }
}
