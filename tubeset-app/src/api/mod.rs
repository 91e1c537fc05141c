//! HTTP API handlers

pub mod archive;
pub mod browse;
pub mod health;
pub mod ingest;
pub mod merge;
pub mod ui;

pub use archive::archive_routes;
pub use browse::browse_routes;
pub use health::health_routes;
pub use ingest::ingest_routes;
pub use merge::merge_routes;
pub use ui::ui_routes;
