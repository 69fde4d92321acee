use std::path::{Path, PathBuf};

use super::{PlatformConventions, INSTALL_DIR_NAME};

/// Conventions for Linux, macOS and the other Unix-like platforms.
///
/// Executables need no special suffix. Relative filenames are stored in the
/// user configuration directory, which on macOS is the "Application Support"
/// directory. This is also the correct location when the process runs inside
/// an app sandbox because the directory is then resolved inside the sandbox
/// container.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Unix;

impl PlatformConventions for Unix {
    fn executable_path(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }

    fn standard_dir(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(INSTALL_DIR_NAME))
    }
}
