//! Batch orchestration over URL lists and playlists

pub mod orchestrator;
pub mod playlist_dir;

pub use orchestrator::{BatchContext, BatchOrchestrator, BatchReport, BatchSource, PreparedBatch};
pub use playlist_dir::{prepare_playlist_dir, Confirm, StdinConfirm};
