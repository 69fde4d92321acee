use std::{
    fmt,
    fmt::Formatter,
    path::{Path, PathBuf},
};

/// The filesystem operation that failed with a
/// [`MaterializeError::UnexpectedFilesystemError`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FsOperation {
    /// Opening (or exclusively creating) the target file.
    Open,

    /// Reading the metadata of the target file.
    Stat,

    /// Updating the permission bits of the target file.
    SetPermissions,
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FsOperation::Open => write!(f, "open"),
            FsOperation::Stat => write!(f, "stat"),
            FsOperation::SetPermissions => write!(f, "set permissions of"),
        }
    }
}

/// Describes why the directory used for relative filenames is not available.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The platform does not know a per-user configuration directory, for
    /// instance because no home directory can be found.
    #[error("could not determine the per-user configuration directory for the current platform")]
    Unresolvable,

    /// The directory could not be turned into an absolute path.
    #[error("could not determine the absolute path of '{}'", .0.display())]
    NotAbsolute(PathBuf, #[source] std::io::Error),

    /// The directory could not be created.
    #[error("failed to create directory '{}'", .0.display())]
    CreateFailed(PathBuf, #[source] std::io::Error),
}

/// Errors that can occur while materializing or disposing an executable.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The directory that relative filenames resolve against is unavailable.
    #[error("the install directory is unavailable")]
    DirectoryUnavailable(#[from] DirectoryError),

    /// Opening, inspecting or chmodding the target failed for a reason other
    /// than the file already existing.
    #[error("failed to {operation} '{}'", .path.display())]
    UnexpectedFilesystemError {
        /// The operation that failed.
        operation: FsOperation,
        /// The file that was operated on.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing or syncing a freshly created file failed. The partial file has
    /// been removed.
    #[error("failed to write executable to '{}'", .path.display())]
    WriteFailure {
        /// The file that was written to.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The existing file had different content and replacing it failed. The
    /// partial file has been removed.
    #[error("failed to overwrite outdated executable at '{}'", .path.display())]
    DigestMismatchOverwriteFailure {
        /// The file that was overwritten.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A temporary executable could not be removed.
    #[error("failed to remove temporary executable '{}'", .path.display())]
    DisposalFailure {
        /// The file that could not be removed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    pub(crate) fn filesystem(
        operation: FsOperation,
        path: &Path,
        source: std::io::Error,
    ) -> Self {
        MaterializeError::UnexpectedFilesystemError {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns the path of the file involved in the failure, if the error is
    /// about a single file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            MaterializeError::DirectoryUnavailable(_) => None,
            MaterializeError::UnexpectedFilesystemError { path, .. }
            | MaterializeError::WriteFailure { path, .. }
            | MaterializeError::DigestMismatchOverwriteFailure { path, .. }
            | MaterializeError::DisposalFailure { path, .. } => Some(path),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_messages_name_the_path() {
        let err = MaterializeError::filesystem(
            FsOperation::SetPermissions,
            Path::new("/opt/tool"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.to_string(), "failed to set permissions of '/opt/tool'");
        assert_eq!(err.path(), Some(Path::new("/opt/tool")));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_directory_error_is_the_source() {
        let err = MaterializeError::from(DirectoryError::Unresolvable);
        assert_eq!(err.path(), None);
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("could not determine the per-user configuration directory for the current platform")
        );
    }
}
