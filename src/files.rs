//! Folder listing, renaming and archiving of photo files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One archived file: where it came from and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub original: PathBuf,
    pub archived: PathBuf,
}

/// Collect image files under `root`.
///
/// Walks recursively and keeps files whose name ends with one of
/// `extensions` (case-insensitive, e.g. `".jpg"`). Anything inside a
/// directory named `archive_folder` is skipped. The result is sorted.
///
/// ```rust,no_run
/// use filetagger::files::collect_images;
///
/// let exts = vec![".jpg".to_string(), ".png".to_string()];
/// let images = collect_images("./photos".as_ref(), &exts, "Arkiv").unwrap();
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(root: &Path, extensions: &[String], archive_folder: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("Not a folder: {}", root.display());
    }

    let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
    let mut images: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == archive_folder))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), &extensions))
        .map(|e| e.into_path())
        .collect();

    images.sort();
    log::debug!("Found {} image(s) under {}", images.len(), root.display());
    Ok(images)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_lowercase();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Rename the file to `new_stem` plus its current extension.
///
/// Returns the new path. Renaming to the current name is a no-op; an existing
/// file with the target name is never overwritten.
pub fn rename_stem(path: &Path, new_stem: &str) -> Result<PathBuf> {
    let new_stem = new_stem.trim();
    if new_stem.is_empty() {
        anyhow::bail!("New name is empty");
    }
    rename_in_place(path, new_stem)
}

/// Append `tag` to the file name, before the extension: `IMG_1.jpg` + `_sthlm`
/// becomes `IMG_1_sthlm.jpg`.
pub fn append_tag(path: &Path, tag: &str) -> Result<PathBuf> {
    if tag.is_empty() {
        anyhow::bail!("Tag is empty");
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Unusable file name: {}", path.display()))?;
    rename_in_place(path, &format!("{stem}{tag}"))
}

fn rename_in_place(path: &Path, new_stem: &str) -> Result<PathBuf> {
    if new_stem.contains(|c: char| c == '/' || c == '\\') {
        anyhow::bail!("File name must not contain path separators: {new_stem}");
    }
    let file_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{new_stem}.{ext}"),
        None => new_stem.to_string(),
    };
    let target = path.with_file_name(file_name);

    if target == path {
        return Ok(target);
    }
    if target.exists() {
        anyhow::bail!("{} already exists", target.display());
    }

    std::fs::rename(path, &target).with_context(|| {
        format!("Failed to rename {} to {}", path.display(), target.display())
    })?;
    log::info!("Renamed {} -> {}", path.display(), target.display());
    Ok(target)
}

/// Move the file into `root/archive_folder/`, creating the folder on demand.
pub fn archive(path: &Path, root: &Path, archive_folder: &str) -> Result<ArchiveRecord> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Unusable file name: {}", path.display()))?;
    let dir = root.join(archive_folder);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let target = dir.join(file_name);
    if target.exists() {
        anyhow::bail!("{} is already archived", target.display());
    }

    std::fs::rename(path, &target)
        .with_context(|| format!("Failed to archive {}", path.display()))?;
    log::info!("Archived {} -> {}", path.display(), target.display());

    Ok(ArchiveRecord {
        original: path.to_path_buf(),
        archived: target,
    })
}

/// Move the most recently archived file back. `Ok(None)` when there is
/// nothing to undo. On failure the record stays in `history`.
pub fn undo_archive(history: &mut Vec<ArchiveRecord>) -> Result<Option<ArchiveRecord>> {
    let Some(record) = history.pop() else {
        return Ok(None);
    };

    let restored = if record.original.exists() {
        Err(anyhow::anyhow!("{} already exists", record.original.display()))
    } else {
        std::fs::rename(&record.archived, &record.original).with_context(|| {
            format!("Failed to restore {}", record.archived.display())
        })
    };

    match restored {
        Ok(()) => {
            log::info!("Restored {}", record.original.display());
            Ok(Some(record))
        }
        Err(e) => {
            history.push(record);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    fn exts() -> Vec<String> {
        vec![".jpg".into(), ".png".into()]
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collects_matching_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.JPG"));
        touch(&root.join("a.png"));
        touch(&root.join("notes.txt"));
        touch(&root.join("trip/c.jpg"));
        touch(&root.join("Arkiv/old.jpg"));
        touch(&root.join("trip/Arkiv/older.jpg"));

        let images = collect_images(root, &exts(), "Arkiv").unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "trip/c.jpg"]);
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_images(&dir.path().join("nope"), &exts(), "Arkiv").is_err());
    }

    // ── renaming ─────────────────────────────────────────────────────

    #[test]
    fn rename_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        touch(&path);

        let renamed = rename_stem(&path, "  midsommar ").unwrap();
        assert_eq!(renamed, dir.path().join("midsommar.jpg"));
        assert!(renamed.exists());
        assert!(!path.exists());
    }

    #[test]
    fn rename_refuses_empty_and_existing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        touch(&a);
        touch(&b);

        assert!(rename_stem(&a, "   ").is_err());
        assert!(rename_stem(&a, "b").is_err());
        assert!(rename_stem(&a, "sub/b").is_err());
        assert_eq!(rename_stem(&a, "a").unwrap(), a);
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn tag_is_appended_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        touch(&path);

        let tagged = append_tag(&path, "_sthlm").unwrap();
        assert_eq!(tagged, dir.path().join("IMG_1_sthlm.jpg"));
        assert!(append_tag(&tagged, "").is_err());
    }

    // ── archive ──────────────────────────────────────────────────────

    #[test]
    fn archive_and_undo() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let path = root.join("trip/pic.jpg");
        touch(&path);

        let mut history = Vec::new();
        let record = archive(&path, root, "Arkiv").unwrap();
        assert_eq!(record.archived, root.join("Arkiv/pic.jpg"));
        assert!(record.archived.exists());
        assert!(!path.exists());
        history.push(record.clone());

        let undone = undo_archive(&mut history).unwrap();
        assert_eq!(undone, Some(record));
        assert!(path.exists());
        assert!(history.is_empty());
        assert_eq!(undo_archive(&mut history).unwrap(), None);
    }

    #[test]
    fn failed_undo_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let path = root.join("pic.jpg");
        touch(&path);
        let record = archive(&path, root, "Arkiv").unwrap();
        // Something new took the original name in the meantime.
        touch(&path);

        let mut history = vec![record.clone()];
        assert!(undo_archive(&mut history).is_err());
        assert_eq!(history, vec![record]);
    }
}
