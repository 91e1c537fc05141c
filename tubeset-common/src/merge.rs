//! Merge engine
//!
//! Folds an incoming store into an existing one. Metadata is deduplicated by
//! `unique_id` with the existing record always winning; image files are
//! copied unconditionally, so an incoming image replaces an existing one of
//! the same name even when its metadata was dropped.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::package;
use crate::record::Collection;
use crate::store::{Store, IMAGES_DIR, METADATA_FILE};
use crate::{Error, Result};

/// Outcome of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Incoming records appended to the existing collection
    pub added: usize,
    /// Incoming records dropped because their id already existed
    pub skipped_duplicates: usize,
    /// Image files copied into the existing store
    pub images_copied: usize,
    /// Size of the resulting collection
    pub total_records: usize,
}

/// Append incoming records whose id is not already present
///
/// Existing order is kept and the survivors follow in their incoming order.
/// Returns `(added, skipped)`.
pub fn merge_collections(existing: &mut Collection, incoming: Collection) -> (usize, usize) {
    let mut seen: HashSet<String> = existing.ids().into_iter().map(str::to_owned).collect();
    let mut added = 0;
    let mut skipped = 0;

    for record in incoming.into_records() {
        if seen.insert(record.unique_id.clone()) {
            existing.push_unchecked(record);
            added += 1;
        } else {
            skipped += 1;
        }
    }

    (added, skipped)
}

/// Merge `incoming` into `existing` in place
///
/// `incoming` must hold both `metadata.json` and `images/`; otherwise the
/// call fails with `InvalidPackage` before `existing` is touched. An absent
/// existing collection counts as empty.
pub fn merge(incoming: &Store, existing: &Store) -> Result<MergeReport> {
    check_package_layout(incoming)?;

    // Everything that can fail on parse happens before the first write
    let incoming_records = incoming.load()?;
    let mut merged = existing.load_or_empty()?;
    let existing_count = merged.len();

    let (added, skipped_duplicates) = merge_collections(&mut merged, incoming_records);

    existing.ensure_layout()?;

    // Images first: a failed copy leaves the metadata as it was
    let mut images_copied = 0;
    for source in incoming.image_files()? {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let dest = existing.images_dir().join(file_name);
        fs::copy(&source, &dest)?;
        images_copied += 1;
    }

    existing.save(&merged)?;

    let report = MergeReport {
        added,
        skipped_duplicates,
        images_copied,
        total_records: merged.len(),
    };

    tracing::info!(
        incoming = %incoming.root().display(),
        existing = %existing.root().display(),
        existing_count,
        added = report.added,
        skipped = report.skipped_duplicates,
        images = report.images_copied,
        "Merged store"
    );

    Ok(report)
}

/// Extract an uploaded zip package under `work_dir` and merge it into `existing`
///
/// A package unpacking to more than `max_unpacked_bytes` is rejected as
/// `InvalidPackage`. The extraction directory is removed on every exit path.
pub fn merge_package(
    zip_path: &Path,
    existing: &Store,
    work_dir: &Path,
    max_unpacked_bytes: u64,
) -> Result<MergeReport> {
    fs::create_dir_all(work_dir)?;
    let extraction = tempfile::Builder::new()
        .prefix("upload_")
        .tempdir_in(work_dir)?;

    tracing::debug!(
        zip = %zip_path.display(),
        extraction = %extraction.path().display(),
        "Unpacking merge package"
    );

    let result = package::extract_within(zip_path, extraction.path(), max_unpacked_bytes)
        .and_then(|_| merge(&Store::open(extraction.path()), existing));

    if let Err(e) = extraction.close() {
        tracing::warn!("Failed to remove merge extraction directory: {}", e);
    }

    result
}

fn check_package_layout(incoming: &Store) -> Result<()> {
    for member in [incoming.metadata_path(), incoming.images_dir()] {
        if fs::symlink_metadata(&member).is_ok_and(|m| m.file_type().is_symlink()) {
            return Err(Error::InvalidPackage(format!(
                "'{}' must not be a symbolic link",
                member.file_name().unwrap_or_default().to_string_lossy()
            )));
        }
    }

    let has_metadata = incoming.has_metadata();
    let has_images = incoming.has_images_dir();

    if has_metadata && has_images {
        return Ok(());
    }

    let mut missing = Vec::new();
    if !has_metadata {
        missing.push(format!("'{}'", METADATA_FILE));
    }
    if !has_images {
        missing.push(format!("an '{}' folder", IMAGES_DIR));
    }

    Err(Error::InvalidPackage(format!(
        "package must contain '{}' and an '{}' folder (missing {})",
        METADATA_FILE,
        IMAGES_DIR,
        missing.join(" and ")
    )))
}
