pub mod audio_cutter_app;
pub mod buffer;
pub mod config;
pub mod decode;
mod decode_thread;
pub mod error;
pub mod region;
pub mod resource;
pub mod session;
pub mod time_base;
pub mod trim;
pub mod wav;

pub use buffer::{AudioBuffer, BufferInfo};
pub use decode::{DecodeError, DecodeService, RodioDecodeService, SourceFile, SourceFormat};
pub use decode_thread::{JobId, Notifier};
pub use error::{EditError, Result};
pub use region::{Region, RegionDraft, RegionEvent, RegionId, RegionKind, RegionModel};
pub use resource::{ResourceHandle, ResourceLifecycle, ResourceOrigin};
pub use session::{EditSession, SessionEvent, SessionState, DEFAULT_EXPORT_NAME};
pub use time_base::{BufferOrigin, TimeBase, TrimInterval};
pub use trim::{TrimMode, TrimSpec};
