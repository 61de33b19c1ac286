//! Scanner-specific re-exports of the shared defaults.

pub use crate::constants::DEFAULT_SUPPORTED_EXTENSIONS as SUPPORTED_AUDIO_EXTENSIONS;
pub use crate::constants::EXCLUDE_SENTINEL;
