//! Zip packaging of store trees
//!
//! A package is a zip with the store's contents at its root
//! (`metadata.json`, `images/...`). Downloads produce one; merges consume one.

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Error, Result};

/// Zip the directory tree under `root`, entries relative to `root`
pub fn zip_dir(root: &Path) -> Result<Vec<u8>> {
    if !root.is_dir() {
        return Err(Error::NotFound(format!("directory {}", root.display())));
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut files = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(io::Error::other(e)))?;
        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) if relative.as_os_str().is_empty() => continue,
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{}/", name), options)
                .map_err(zip_to_io)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options).map_err(zip_to_io)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
            files += 1;
        }
    }

    let cursor = writer.finish().map_err(zip_to_io)?;
    let bytes = cursor.into_inner();

    tracing::debug!(
        root = %root.display(),
        files,
        bytes = bytes.len(),
        "Packaged directory"
    );

    Ok(bytes)
}

/// Extract a zip file into `dest` with no size cap
pub fn extract(zip_path: &Path, dest: &Path) -> Result<()> {
    extract_within(zip_path, dest, u64::MAX)
}

/// Extract a zip file into `dest`, writing at most `max_bytes` of content
///
/// Unreadable archives, entry names that would escape `dest`, symlink
/// entries and archives unpacking to more than `max_bytes` are all
/// `InvalidPackage`. Entries are written as plain files and directories only.
pub fn extract_within(zip_path: &Path, dest: &Path, max_bytes: u64) -> Result<()> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::InvalidPackage(format!("not a readable zip archive: {}", e)))?;

    // Declared sizes are checked up front; the copy below enforces the cap
    // again in case an entry inflates past what it declares
    let mut declared = 0u64;
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(invalid_entry)?;
        if is_symlink_mode(entry.unix_mode()) {
            return Err(Error::InvalidPackage(format!(
                "symbolic link entries are not allowed: {}",
                entry.name()
            )));
        }
        declared = declared.saturating_add(entry.size());
    }
    if declared > max_bytes {
        return Err(too_large(max_bytes));
    }

    fs::create_dir_all(dest)?;
    let mut written = 0u64;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(invalid_entry)?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            Error::InvalidPackage(format!("entry escapes the archive root: {}", entry.name()))
        })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let remaining = max_bytes - written;
        let mut out = File::create(&target)?;
        let copied = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut out)?;
        if copied > remaining {
            return Err(too_large(max_bytes));
        }
        written += copied;
    }

    tracing::debug!(
        zip = %zip_path.display(),
        dest = %dest.display(),
        entries = archive.len(),
        bytes = written,
        "Extracted package"
    );

    Ok(())
}

/// `S_IFLNK` in the file-type bits of a unix mode
fn is_symlink_mode(mode: Option<u32>) -> bool {
    mode.is_some_and(|m| m & 0o170000 == 0o120000)
}

fn invalid_entry(e: zip::result::ZipError) -> Error {
    match e {
        zip::result::ZipError::Io(io_err) => Error::Io(io_err),
        other => Error::InvalidPackage(format!("cannot read archive entry: {}", other)),
    }
}

fn too_large(max_bytes: u64) -> Error {
    Error::InvalidPackage(format!("package unpacks to more than {} bytes", max_bytes))
}

/// Zip entry name with forward slashes regardless of platform
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn zip_to_io(e: zip::result::ZipError) -> Error {
    match e {
        zip::result::ZipError::Io(io_err) => Error::Io(io_err),
        other => Error::Io(io::Error::other(other)),
    }
}
