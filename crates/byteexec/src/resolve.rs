//! Resolves the filenames passed to
//! [`Materializer::materialize`](crate::Materializer::materialize) to absolute
//! paths.

use std::path::{Path, PathBuf};

use fs_err as fs;

use crate::{error::DirectoryError, platform::PlatformConventions};

/// Determines the default directory for executables with a relative
/// filename, which is the standard directory of the `platform`.
pub fn default_install_dir(
    platform: &impl PlatformConventions,
) -> Result<PathBuf, DirectoryError> {
    platform.standard_dir().ok_or(DirectoryError::Unresolvable)
}

/// Turns `filename` into the absolute path of an executable.
///
/// Absolute filenames are only adapted to the naming rules of the `platform`.
/// Relative filenames are joined onto `install_dir`, or onto
/// [`default_install_dir`] if no directory is given. The directory that will
/// contain the executable is created if it does not exist yet.
pub fn resolve_path(
    platform: &impl PlatformConventions,
    install_dir: Option<&Path>,
    filename: &Path,
) -> Result<PathBuf, DirectoryError> {
    if filename.is_absolute() {
        return Ok(platform.executable_path(filename));
    }

    let install_dir = match install_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_install_dir(platform)?,
    };
    let install_dir = std::path::absolute(&install_dir)
        .map_err(|e| DirectoryError::NotAbsolute(install_dir, e))?;

    let path = platform.executable_path(&install_dir.join(filename));

    // The filename may itself name sub directories of the install directory.
    let parent = path.parent().unwrap_or(&install_dir);
    fs::create_dir_all(parent)
        .map_err(|e| DirectoryError::CreateFailed(parent.to_path_buf(), e))?;

    tracing::trace!("resolved {} to {}", filename.display(), path.display());
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::platform::{Unix, Windows};
    use assert_matches::assert_matches;

    /// Conventions without any standard directory, like a system without a
    /// home directory.
    struct Homeless;

    impl PlatformConventions for Homeless {
        fn executable_path(&self, path: &Path) -> PathBuf {
            path.to_path_buf()
        }

        fn standard_dir(&self) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_absolute_path_is_unchanged() {
        let temp_dir = tempfile::tempdir().unwrap();
        let absolute = temp_dir.path().join("missing").join("helper");

        let resolved = resolve_path(&Unix, None, &absolute).unwrap();
        assert_eq!(resolved, absolute);

        // No directories are created for absolute paths.
        assert!(!temp_dir.path().join("missing").exists());
    }

    #[test]
    fn test_absolute_path_is_adapted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let absolute = temp_dir.path().join("helper");

        let resolved = resolve_path(&Windows, None, &absolute).unwrap();
        assert_eq!(resolved, temp_dir.path().join("helper.exe"));
    }

    #[test]
    fn test_relative_path_creates_install_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let install_dir = temp_dir.path().join("a").join("b");

        let resolved = resolve_path(&Unix, Some(&install_dir), Path::new("helper")).unwrap();
        assert_eq!(resolved, install_dir.join("helper"));
        assert!(install_dir.is_dir());

        // Resolving again with an existing directory succeeds silently.
        let again = resolve_path(&Unix, Some(&install_dir), Path::new("helper")).unwrap();
        assert_eq!(again, resolved);
    }

    #[test]
    fn test_relative_path_with_sub_directory() {
        let temp_dir = tempfile::tempdir().unwrap();

        let resolved =
            resolve_path(&Unix, Some(temp_dir.path()), Path::new("tools/helper")).unwrap();
        assert_eq!(resolved, temp_dir.path().join("tools").join("helper"));
        assert!(temp_dir.path().join("tools").is_dir());
    }

    #[test]
    fn test_explicit_install_dir_needs_no_standard_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resolved =
            resolve_path(&Homeless, Some(temp_dir.path()), Path::new("helper")).unwrap();
        assert_eq!(resolved, temp_dir.path().join("helper"));
    }

    #[test]
    fn test_unresolvable_standard_dir() {
        let result = resolve_path(&Homeless, None, Path::new("helper"));
        assert_matches!(result, Err(DirectoryError::Unresolvable));
    }

    #[test]
    fn test_install_dir_that_is_a_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let result = resolve_path(&Unix, Some(&blocker), Path::new("helper"));
        assert_matches!(result, Err(DirectoryError::CreateFailed(path, _)) if path == blocker);
    }
}
