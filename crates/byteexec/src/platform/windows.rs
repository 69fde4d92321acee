use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use super::{PlatformConventions, INSTALL_DIR_NAME};

/// The suffix Windows requires for a file to be started as a program.
const EXE_SUFFIX: &str = ".exe";

/// Conventions for Windows.
///
/// Executables must end in `.exe` and relative filenames are stored in the
/// local application data directory.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Windows;

impl PlatformConventions for Windows {
    fn executable_path(&self, path: &Path) -> PathBuf {
        let has_exe_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));
        if has_exe_extension {
            return path.to_path_buf();
        }

        // Push the suffix instead of using `with_extension` so dotted names
        // like `tool.v2` keep their full name.
        let mut name = OsString::from(path.as_os_str());
        name.push(EXE_SUFFIX);
        PathBuf::from(name)
    }

    fn standard_dir(&self) -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join(INSTALL_DIR_NAME))
    }

    fn temp_file_suffix(&self) -> &'static str {
        EXE_SUFFIX
    }
}
