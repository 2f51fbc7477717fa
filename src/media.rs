// src/media.rs

//! Reading source images from disk and writing finished results back.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::queue::{Task, TaskStatus};
use crate::types::{ImageData, SourceImage};

const KNOWN_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

/// MIME type for a file extension (case-insensitive), if it is an image type
/// we accept.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    KNOWN_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// File extension for a MIME type. Unknown types are written as `png`.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "png",
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(mime_for_extension)
}

/// Load every input path into a `SourceImage`.
///
/// Directories are expanded one level, sorted by path, keeping only files
/// with a known image extension. Files named explicitly must have one too.
pub fn load_sources(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<Vec<SourceImage>> {
    let mut sources = Vec::new();

    for path in paths {
        if fs.is_dir(path) {
            let mut entries: Vec<PathBuf> = fs
                .read_dir(path)?
                .into_iter()
                .filter(|p| fs.is_file(p) && mime_for_path(p).is_some())
                .collect();
            entries.sort();
            debug!(dir = %path.display(), count = entries.len(), "expanded input directory");
            for entry in entries {
                sources.push(load_one(fs, &entry)?);
            }
        } else if fs.is_file(path) {
            sources.push(load_one(fs, path)?);
        } else if fs.exists(path) {
            bail!("input is neither a file nor a directory: {}", path.display());
        } else {
            bail!("input not found: {}", path.display());
        }
    }

    info!(count = sources.len(), "loaded source images");
    Ok(sources)
}

fn load_one(fs: &dyn FileSystem, path: &Path) -> Result<SourceImage> {
    let Some(mime) = mime_for_path(path) else {
        bail!("not a supported image type: {}", path.display());
    };
    let bytes = fs.read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("input has no usable file name: {}", path.display()))?;
    Ok(SourceImage::new(name, ImageData::new(bytes, mime)))
}

/// File name a completed task's result is exported under:
/// `<stem>-<id>.<ext>`.
pub fn export_name(task: &Task, result: &ImageData) -> String {
    format!(
        "{}-{}.{}",
        task.primary().stem(),
        task.id(),
        extension_for_mime(result.mime_type())
    )
}

/// Write the result of every Completed task into `dir`, returning the paths
/// written in store order.
pub fn export_results(fs: &dyn FileSystem, tasks: &[Task], dir: &Path) -> Result<Vec<PathBuf>> {
    fs.create_dir_all(dir)?;

    let mut written = Vec::new();
    for task in tasks {
        if task.status() != TaskStatus::Completed {
            continue;
        }
        let Some(result) = task.result() else {
            continue;
        };
        let path = dir.join(export_name(task, result));
        fs.write(&path, result.bytes())?;
        debug!(task = %task.id(), path = %path.display(), "exported result");
        written.push(path);
    }

    info!(count = written.len(), dir = %dir.display(), "exported results");
    Ok(written)
}
