
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::cache::Document;
use crate::config::RepoConfig;
use crate::{RagError, Result};

const DOC_EXTENSION: &str = "md";

/// Unpack a zip archive into `destination`, returning the number of files written.
///
/// Every entry must resolve to a path inside `destination`; the first entry
/// that does not aborts extraction with [`RagError::PathTraversal`].
#[inline]
pub fn extract_archive(bytes: &[u8], destination: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::Archive(format!("Failed to open zip archive: {}", e)))?;

    let mut files_written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| RagError::Archive(format!("Failed to read archive entry {}: {}", index, e)))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(RagError::PathTraversal(entry.name().to_string()));
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = destination.join(&relative);
        if !target.starts_with(destination) {
            return Err(RagError::PathTraversal(entry.name().to_string()));
        }

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = File::create(&target).map_err(|e| {
            RagError::Io(format!("Failed to create {}: {}", target.display(), e))
        })?;
        io::copy(&mut entry, &mut output).map_err(|e| {
            RagError::Archive(format!("Failed to extract {}: {}", entry.name(), e))
        })?;

        apply_mode(&target, entry.unix_mode())?;

        files_written += 1;
    }

    debug!(
        "Extracted {} files into {}",
        files_written,
        destination.display()
    );
    Ok(files_written)
}

/// Find the documentation directory inside an extracted branch archive.
///
/// Branch archives contain a single top-level `{repo}-{branch}` directory, with
/// slashes in the branch name replaced by dashes. When that directory is not
/// present the archive's only top-level directory is used instead.
#[inline]
pub fn locate_docs_root(extract_dir: &Path, repo: &RepoConfig) -> Result<PathBuf> {
    let expected = extract_dir.join(format!(
        "{}-{}",
        repo.repo,
        repo.branch.replace('/', "-")
    ));

    let archive_root = if expected.is_dir() {
        expected
    } else {
        let mut top_level: Vec<PathBuf> = fs::read_dir(extract_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        if top_level.len() != 1 {
            return Err(RagError::Archive(format!(
                "Expected a single top-level directory in archive, found {}",
                top_level.len()
            )));
        }
        let only = top_level.remove(0);
        warn!(
            "Archive root {} not found, using {}",
            expected.display(),
            only.display()
        );
        only
    };

    let root_path = repo.root_path.trim_matches('/');
    let docs_root = if root_path.is_empty() {
        archive_root
    } else {
        archive_root.join(root_path)
    };

    if !docs_root.is_dir() {
        return Err(RagError::Archive(format!(
            "Documentation directory '{}' not found in archive",
            repo.root_path
        )));
    }

    Ok(docs_root)
}

/// Collect every markdown file below `root` as a [`Document`] without an embedding.
///
/// Files are visited in lexical order of their names, so the result is stable
/// for a given directory tree.
#[inline]
pub fn collect_documents(root: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            RagError::Io(format!("Failed to walk {}: {}", root.display(), e))
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() || file_type.is_symlink() || !is_markdown(entry.path()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| RagError::Io(format!("Failed to relativize path: {}", e)))?;
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = fs::read(entry.path()).map_err(|e| {
            RagError::Io(format!("Failed to read {}: {}", entry.path().display(), e))
        })?;
        let modified = entry
            .metadata()
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .map_or_else(Utc::now, DateTime::<Utc>::from);

        documents.push(Document::new(
            path,
            String::from_utf8_lossy(&bytes).into_owned(),
            modified,
        ));
    }

    info!(
        "Collected {} documentation files from {}",
        documents.len(),
        root.display()
    );
    Ok(documents)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode.map(|mode| mode & 0o777) {
        Some(permissions) if permissions != 0 => {
            fs::set_permissions(path, fs::Permissions::from_mode(permissions))
        }
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Any file whose name ends in `.md`, ignoring case. A file named just `.md` counts.
fn is_markdown(path: &Path) -> bool {
    path.file_name().is_some_and(|name| {
        name.to_string_lossy()
            .rsplit_once('.')
            .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case(DOC_EXTENSION))
    })
}
