//! Handles to materialized executables.

use std::{
    ffi::OsStr,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
};

use fs_err as fs;
use rattler_digest::Sha256Hash;

use crate::{
    error::{FsOperation, MaterializeError},
    platform::PlatformConventions,
    writer::{self, ExecutableMode, Materialized, Outcome},
};

/// The prefix of the names of temporary executables.
const TEMP_FILE_PREFIX: &str = "byteexec_";

/// An executable file on disk that can be started as a child process.
pub trait Executable {
    /// Returns the absolute path of the executable.
    fn path(&self) -> &Path;

    /// Constructs a [`Command`] that runs the executable with `args`.
    ///
    /// This does not start anything, spawning and waiting for the process is
    /// left to the caller.
    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(self.path());
        command.args(args);
        command
    }
}

/// An executable stored at a stable location, created by
/// [`Materializer::materialize`](crate::Materializer::materialize).
///
/// The file outlives the handle and is reused by later calls with the same
/// path and payload.
#[derive(Debug, Clone)]
pub struct ByteExec {
    path: PathBuf,
    materialized: Materialized,
}

impl ByteExec {
    pub(crate) fn new(path: PathBuf, materialized: Materialized) -> Self {
        Self { path, materialized }
    }

    /// Describes how the file on disk was reconciled with the payload.
    pub fn outcome(&self) -> Outcome {
        self.materialized.outcome
    }

    /// The SHA256 hash of the executable.
    pub fn sha256(&self) -> &Sha256Hash {
        &self.materialized.sha256
    }
}

impl Executable for ByteExec {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// An executable stored in a uniquely named temporary file, created by
/// [`Materializer::materialize_temp`](crate::Materializer::materialize_temp).
///
/// Call [`TempByteExec::dispose`] to remove the file. If the handle is
/// dropped without being disposed the file is removed on a best effort basis.
#[derive(Debug)]
pub struct TempByteExec {
    path: PathBuf,
    temp_path: Option<tempfile::TempPath>,
    sha256: Sha256Hash,
}

impl TempByteExec {
    /// Writes `payload` to a new temporary file in `dir` and makes it
    /// executable.
    pub(crate) fn create(
        dir: &Path,
        payload: &[u8],
        platform: &impl PlatformConventions,
        mode: ExecutableMode,
    ) -> Result<Self, MaterializeError> {
        let temp_file = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(platform.temp_file_suffix())
            .tempfile_in(dir)
            .map_err(|err| MaterializeError::filesystem(FsOperation::Open, dir, err))?;

        // From here on dropping `temp_path` removes the file again, so an
        // error does not leave a partial executable behind.
        let (file, temp_path) = temp_file.into_parts();
        let path = temp_path.to_path_buf();

        let sha256 = writer::write_payload(file, payload).map_err(|source| {
            MaterializeError::WriteFailure {
                path: path.clone(),
                source,
            }
        })?;
        writer::set_mode(&path, mode).map_err(|err| {
            MaterializeError::filesystem(FsOperation::SetPermissions, &path, err)
        })?;

        tracing::debug!(
            "created temporary executable {} ({:x})",
            path.display(),
            sha256
        );
        Ok(Self {
            path,
            temp_path: Some(temp_path),
            sha256,
        })
    }

    /// The SHA256 hash of the executable.
    pub fn sha256(&self) -> &Sha256Hash {
        &self.sha256
    }

    /// Returns true if [`TempByteExec::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.temp_path.is_none()
    }

    /// Removes the temporary file.
    ///
    /// Calling this more than once is fine, once the file is gone later calls
    /// do not touch the filesystem. A file that has already been removed by
    /// someone else is not an error. If removing fails the handle keeps
    /// ownership of the file so the call can be retried.
    pub fn dispose(&mut self) -> Result<(), MaterializeError> {
        let Some(temp_path) = self.temp_path.as_ref() else {
            return Ok(());
        };

        match fs::remove_file(&**temp_path) {
            Ok(()) => {
                tracing::trace!("removed temporary executable {}", self.path.display());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(MaterializeError::DisposalFailure {
                    path: self.path.clone(),
                    source,
                })
            }
        }

        // The file is gone, dropping the path must not try again.
        if let Some(temp_path) = self.temp_path.take() {
            let _ = temp_path.keep();
        }
        Ok(())
    }
}

impl Executable for TempByteExec {
    fn path(&self) -> &Path {
        &self.path
    }
}
