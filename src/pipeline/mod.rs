//! Item processing: stream selection, assembly and tagging

pub mod assemble;
pub mod item;
pub mod select;
pub mod tagging;
pub mod workdir;

pub use assemble::{AssembledAsset, Assembler, AssemblyState, AssetKind, Assembly, StagedAsset};
pub use item::{ItemOutcome, ItemPipeline, ItemResult, ItemStatus, SkipReason, Toolset};
pub use select::{select_audio, select_progressive, select_video};
pub use tagging::{resolve_tags, tag_asset};
pub use workdir::{promote, scratch_file, work_dir};
