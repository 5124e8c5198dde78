//! On-demand zip packaging and streaming.
//!
//! An [`ArchiveJob`] turns an ordered set of resolved share paths into a
//! single zip file, materialized in a staging directory before any byte
//! reaches the network. Entries are named relative to the *anchor* — the
//! common ancestor directory of all inputs — so a packaged folder
//! extracts with its internal structure intact.
//!
//! The job exclusively owns its temporary artifact. `Drop` deletes it,
//! which makes cleanup unconditional: it runs after a complete send,
//! after a client disconnect mid-stream, and after a failed build alike.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::Stream;
use tokio::fs::File;
use tokio_util::bytes::Bytes;
use tokio_util::io::ReaderStream;

use crate::error::{Error, Result};
use crate::share::{ResolvedPath, ShareRoot};

/// A built archive awaiting streaming. Owns its on-disk artifact.
#[derive(Debug)]
pub struct ArchiveJob {
    artifact: PathBuf,
    file_name: String,
    size: u64,
}

impl ArchiveJob {
    /// Resolve `relative_paths` against `root`, package them, and
    /// materialize the archive under `staging_dir`.
    ///
    /// Inputs that fail to resolve are skipped rather than aborting the
    /// batch; during traversal, anything that does not sit under the
    /// anchor is likewise skipped.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyArchive`] if nothing resolves
    /// - [`Error::Archive`] if construction fails partway (the partial
    ///   artifact is removed before returning)
    pub async fn build(
        root: &ShareRoot,
        relative_paths: &[String],
        staging_dir: &Path,
    ) -> Result<Self> {
        let mut resolved: Vec<ResolvedPath> = Vec::new();
        for relative in relative_paths {
            match root.resolve(relative) {
                Ok(path) => resolved.push(path),
                Err(e) => {
                    tracing::debug!("skipping archive input '{}': {}", relative, e);
                }
            }
        }

        if resolved.is_empty() {
            return Err(Error::EmptyArchive);
        }

        let anchor = common_anchor(&resolved);
        let file_name = archive_file_name(&resolved);

        let artifact = staging_dir.join(format!(
            "gale-archive-{}.zip",
            uuid::Uuid::new_v4().simple()
        ));

        let inputs: Vec<PathBuf> = resolved
            .iter()
            .map(|r| r.as_path().to_path_buf())
            .collect();
        let build_artifact = artifact.clone();
        let build_anchor = anchor.clone();

        let built = tokio::task::spawn_blocking(move || {
            write_zip(&build_artifact, &build_anchor, &inputs)
        })
        .await;

        match built {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = std::fs::remove_file(&artifact);
                return Err(Error::Archive(e));
            }
            Err(e) => {
                let _ = std::fs::remove_file(&artifact);
                return Err(Error::Archive(format!("archive task failed: {e}")));
            }
        }

        let size = std::fs::metadata(&artifact)
            .map_err(|e| {
                let _ = std::fs::remove_file(&artifact);
                Error::Archive(format!("cannot stat archive: {e}"))
            })?
            .len();

        Ok(Self {
            artifact,
            file_name,
            size,
        })
    }

    /// Display filename for the download headers.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Archive size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Location of the temporary artifact.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Consume the job and stream the artifact in bounded chunks.
    ///
    /// The job lives inside the returned stream, so the artifact is
    /// deleted when the stream is dropped — whether the send completed
    /// or the peer disconnected partway.
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> {
        async_stream::try_stream! {
            let job = self;
            let file = File::open(&job.artifact).await?;
            let mut chunks = ReaderStream::with_capacity(file, crate::STREAM_CHUNK_SIZE);
            while let Some(chunk) = futures::StreamExt::next(&mut chunks).await {
                yield chunk?;
            }
        }
    }
}

impl Drop for ArchiveJob {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.artifact) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    "failed to remove archive artifact {}: {}",
                    self.artifact.display(),
                    e
                );
            }
        }
    }
}

/// Common ancestor directory of all resolved inputs.
///
/// A lone file anchors at its parent so its archive entry is the bare
/// file name; a lone directory anchors at itself so entries are relative
/// to it.
fn common_anchor(resolved: &[ResolvedPath]) -> PathBuf {
    let mut anchor = resolved[0].as_path().to_path_buf();
    for path in &resolved[1..] {
        while !path.as_path().starts_with(&anchor) {
            if !anchor.pop() {
                break;
            }
        }
    }

    if anchor.is_file() {
        anchor.pop();
    }
    anchor
}

/// Output filename per the naming rule: a single directory input names
/// the archive after itself, anything else gets a collision-free
/// generated name.
fn archive_file_name(resolved: &[ResolvedPath]) -> String {
    if let [only] = resolved {
        if only.as_path().is_dir() {
            return format!("{}.zip", only.file_name());
        }
    }
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("gale-{}.zip", &suffix[..6])
}

fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Blocking zip construction into `artifact`.
fn write_zip(
    artifact: &Path,
    anchor: &Path,
    inputs: &[PathBuf],
) -> std::result::Result<(), String> {
    let file = std::fs::File::create(artifact).map_err(|e| e.to_string())?;
    let mut zip = zip::ZipWriter::new(file);

    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for input in inputs {
        if input.is_dir() {
            let walker = walkdir::WalkDir::new(input).follow_links(false);
            for entry in walker.into_iter().filter_map(std::result::Result::ok) {
                let path = entry.path();
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(anchor) else {
                    continue;
                };
                add_file(&mut zip, path, relative, options).map_err(|e| e.to_string())?;
            }
        } else if input.is_file() {
            let Ok(relative) = input.strip_prefix(anchor) else {
                continue;
            };
            add_file(&mut zip, input, relative, options).map_err(|e| e.to_string())?;
        }
    }

    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

fn add_file(
    zip: &mut zip::ZipWriter<std::fs::File>,
    path: &Path,
    relative: &Path,
    options: zip::write::SimpleFileOptions,
) -> std::io::Result<()> {
    zip.start_file(zip_entry_name(relative), options)
        .map_err(std::io::Error::other)?;
    let mut source = std::fs::File::open(path)?;
    std::io::copy(&mut source, zip)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn share() -> (TempDir, ShareRoot) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("photos/sub")).unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("photos/a.jpg"), b"aaaa").unwrap();
        std::fs::write(dir.path().join("photos/sub/b.jpg"), b"bbbb").unwrap();
        std::fs::write(dir.path().join("docs/notes.txt"), b"notes").unwrap();
        std::fs::write(dir.path().join("top.txt"), b"top").unwrap();
        let root = ShareRoot::open(dir.path()).unwrap();
        (dir, root)
    }

    fn resolve_all(root: &ShareRoot, paths: &[&str]) -> Vec<ResolvedPath> {
        paths.iter().map(|p| root.resolve(p).unwrap()).collect()
    }

    #[test]
    fn test_anchor_single_directory_is_itself() {
        let (_dir, root) = share();
        let resolved = resolve_all(&root, &["photos"]);
        assert_eq!(common_anchor(&resolved), resolved[0].as_path());
    }

    #[test]
    fn test_anchor_single_file_is_parent() {
        let (_dir, root) = share();
        let resolved = resolve_all(&root, &["photos/a.jpg"]);
        assert_eq!(
            common_anchor(&resolved),
            resolved[0].as_path().parent().unwrap()
        );
    }

    #[test]
    fn test_anchor_spanning_inputs_is_common_parent() {
        let (_dir, root) = share();
        let resolved = resolve_all(&root, &["photos/a.jpg", "docs/notes.txt"]);
        assert_eq!(common_anchor(&resolved), root.path());
    }

    #[test]
    fn test_naming_single_directory() {
        let (_dir, root) = share();
        let resolved = resolve_all(&root, &["photos"]);
        assert_eq!(archive_file_name(&resolved), "photos.zip");
    }

    #[test]
    fn test_naming_mixed_inputs_generated() {
        let (_dir, root) = share();
        let resolved = resolve_all(&root, &["photos", "top.txt"]);
        let name = archive_file_name(&resolved);
        assert!(name.starts_with("gale-"));
        assert!(name.ends_with(".zip"));
        assert_ne!(name, archive_file_name(&resolved));
    }

    #[test]
    fn test_zip_entry_names_use_forward_slashes() {
        assert_eq!(
            zip_entry_name(Path::new("sub").join("b.jpg").as_path()),
            "sub/b.jpg"
        );
    }
}
