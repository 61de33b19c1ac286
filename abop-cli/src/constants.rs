//! Constants used throughout the CLI application.

/// Database file name under the platform data directory, used when `--database`
/// is not given.
pub const DEFAULT_DB_FILE: &str = "library.db";

/// Directory name under the platform data directory that holds the database.
pub const APP_DIR_NAME: &str = "abop";
