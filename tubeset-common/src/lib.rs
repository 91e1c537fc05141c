//! # tubeset common library
//!
//! Dataset core shared by the tubeset app:
//! - Record and collection model
//! - Metadata store (JSON + image directory)
//! - Merge engine (dedup by `unique_id`)
//! - Archive manager (snapshot, soft-delete, restore, purge)
//! - Dataset statistics
//! - Configuration loading and root folder resolution
//!
//! Nothing here touches the network or a UI.

pub mod archive;
pub mod config;
pub mod error;
pub mod merge;
pub mod package;
pub mod record;
pub mod stats;
pub mod store;

pub use archive::{ArchiveManager, ArchiveStatus};
pub use error::{Error, Result};
pub use merge::{merge, merge_package, MergeReport};
pub use record::{Collection, Record, ThumbnailDetails, TitleAnalysis};
pub use store::Store;
