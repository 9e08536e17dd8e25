pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::{
    PlaylistEntry, PlaylistInfo, ResolvedVideo, StreamDescriptor, StreamKind, VideoDescriptor,
};
pub use traits::SourceResolver;
pub use ytdlp::YtDlpResolver;
