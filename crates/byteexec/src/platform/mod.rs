//! Platform specific naming and directory conventions for materialized
//! executables.
//!
//! Every platform is described by an implementation of
//! [`PlatformConventions`]. The implementation for the platform the crate is
//! compiled for is available as [`NativePlatform`].

use std::path::{Path, PathBuf};

mod unix;
mod windows;

pub use unix::Unix;
pub use windows::Windows;

/// The [`PlatformConventions`] of the platform this crate was compiled for.
#[cfg(not(windows))]
pub type NativePlatform = Unix;

/// The [`PlatformConventions`] of the platform this crate was compiled for.
#[cfg(windows)]
pub type NativePlatform = Windows;

/// The name of the directory that is created inside the standard directory of
/// a platform to hold materialized executables.
pub const INSTALL_DIR_NAME: &str = "byteexec";

/// Describes how executables are named and where they are stored by default
/// on a specific platform.
pub trait PlatformConventions {
    /// Adapts `path` to the naming rules for executables on this platform,
    /// for instance by appending a required suffix. Must be pure.
    fn executable_path(&self, path: &Path) -> PathBuf;

    /// Returns the per-user directory in which executables with a relative
    /// filename are stored, or `None` if it cannot be determined.
    fn standard_dir(&self) -> Option<PathBuf>;

    /// The suffix given to uniquely named temporary executables.
    fn temp_file_suffix(&self) -> &'static str {
        ""
    }
}
