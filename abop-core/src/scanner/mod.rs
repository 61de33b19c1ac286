//! The Scanner (§4.3): walks configured directories, groups files into
//! candidate audiobooks, and hands each one to the dedup engine.
//!
//! Submodules mirror the pipeline: [`discovery`] walks the filesystem,
//! [`grouping`] is the pure file-to-book grouping function, [`scan`] ties
//! hashing/tagging/filename-parsing together into [`discovered::DiscoveredBook`]
//! values, and [`progress`]/[`task_manager`] carry reporting and
//! cancellation through the pipeline.

pub mod constants;
pub mod discovered;
pub mod discovery;
pub mod grouping;
pub mod progress;
pub mod scan;
pub mod task_manager;

pub use constants::SUPPORTED_AUDIO_EXTENSIONS;
pub use discovered::{DiscoveredBook, DiscoveredFile};
pub use discovery::{DefaultFileDiscoverer, FileDiscoverer};
pub use progress::{
    CallbackReporter, ChannelReporter, NullReporter, ProgressReporter, ScanProgress, TestReporter,
};
pub use scan::{ScanOptions, ScanSummary, Scanner};
pub use task_manager::TaskManager;
