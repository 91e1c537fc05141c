//! Metadata store
//!
//! A store is a directory holding `metadata.json` and an `images/` folder.
//! Nothing is cached between calls: every load reads the file, every save
//! rewrites it in full. A crash during `save` can leave a torn file.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::record::Collection;
use crate::{Error, Result};

/// Metadata document name inside a store
pub const METADATA_FILE: &str = "metadata.json";

/// Image directory name inside a store
pub const IMAGES_DIR: &str = "images";

/// Handle to a store rooted at a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    /// Absolute path of an image by file name
    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.images_dir().join(file_name)
    }

    /// Store-relative path written into `thumbnail_details.path`
    pub fn relative_image_path(file_name: &str) -> String {
        format!("{}/{}", IMAGES_DIR, file_name)
    }

    /// True when the store directory exists
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata_path().is_file()
    }

    pub fn has_images_dir(&self) -> bool {
        self.images_dir().is_dir()
    }

    /// Create the store root and its images directory if missing
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(self.images_dir())?;
        Ok(())
    }

    /// Load the metadata collection
    ///
    /// `NotFound` when `metadata.json` is absent, `Malformed` when it does not
    /// hold a valid array of records.
    pub fn load(&self) -> Result<Collection> {
        let path = self.metadata_path();
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "metadata file {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(&path)?;
        let collection = Collection::from_json_str(&content)?;

        tracing::debug!(
            path = %path.display(),
            records = collection.len(),
            "Loaded metadata collection"
        );

        Ok(collection)
    }

    /// Load the metadata collection, treating an absent file as empty
    pub fn load_or_empty(&self) -> Result<Collection> {
        match self.load() {
            Ok(collection) => Ok(collection),
            Err(Error::NotFound(_)) => Ok(Collection::new()),
            Err(e) => Err(e),
        }
    }

    /// Overwrite `metadata.json` with the given collection
    pub fn save(&self, collection: &Collection) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.metadata_path();
        fs::write(&path, collection.to_json_vec()?)?;

        tracing::debug!(
            path = %path.display(),
            records = collection.len(),
            "Saved metadata collection"
        );

        Ok(())
    }

    /// Regular files directly inside `images/`, sorted by name
    pub fn image_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.images_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Total size in bytes of every file under the store root
    pub fn disk_usage_bytes(&self) -> u64 {
        if !self.root.exists() {
            return 0;
        }

        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum()
    }
}
