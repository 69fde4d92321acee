//! Reconciles the file at a target path with the payload it should contain.
//! See [`materialize`] for the protocol.

use std::{
    fs::{OpenOptions, Permissions},
    io::{ErrorKind, Write},
    path::Path,
};

use fs_err as fs;
use rattler_digest::{
    compute_bytes_digest, compute_file_digest, HashingWriter, Sha256, Sha256Hash,
};

use crate::error::{FsOperation, MaterializeError};

/// The permission bits given to materialized executables.
///
/// Only the lower twelve bits are kept. On platforms without Unix
/// permissions the mode is not applied and a file only has to be writable to
/// count as having the right mode.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ExecutableMode(u32);

impl ExecutableMode {
    /// Owner read/write/execute, group and others read/execute.
    pub const DEFAULT: ExecutableMode = ExecutableMode(0o755);

    /// Constructs a mode from Unix permission bits.
    pub const fn new(bits: u32) -> Self {
        ExecutableMode(bits & 0o7777)
    }

    /// Returns the Unix permission bits of this mode.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if `permissions` already equal this mode.
    #[allow(unused_variables)]
    pub fn matches(self, permissions: &Permissions) -> bool {
        #[cfg(unix)]
        return std::os::unix::fs::PermissionsExt::mode(permissions) & 0o7777 == self.0;
        #[cfg(not(unix))]
        return !permissions.readonly();
    }
}

impl Default for ExecutableMode {
    fn default() -> Self {
        ExecutableMode::DEFAULT
    }
}

/// Describes what happened to the file on disk.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Outcome {
    /// No file existed and a new one was written.
    Created,

    /// A file with the same content already existed and was left untouched
    /// apart from its permissions.
    Reused,

    /// A file with different content existed and was overwritten.
    Overwritten,
}

/// The successful result of calling [`materialize`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Materialized {
    /// How the file on disk was reconciled with the payload.
    pub outcome: Outcome,

    /// The SHA256 hash of the file, which is also the hash of the payload.
    pub sha256: Sha256Hash,
}

/// Which part of the protocol a write belongs to. Only used to pick the
/// error that describes a failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum WriteStage {
    Create,
    Overwrite,
}

impl WriteStage {
    fn error(self, path: &Path, source: std::io::Error) -> MaterializeError {
        let path = path.to_path_buf();
        match self {
            WriteStage::Create => MaterializeError::WriteFailure { path, source },
            WriteStage::Overwrite => {
                MaterializeError::DigestMismatchOverwriteFailure { path, source }
            }
        }
    }
}

/// A [`Write`] that can also flush its content all the way to the storage
/// device.
pub(crate) trait SyncWrite: Write {
    fn sync(&mut self) -> std::io::Result<()>;
}

impl SyncWrite for std::fs::File {
    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_all()
    }
}

/// Ensures the file at `path` contains exactly `payload` and has the
/// permissions described by `mode`.
///
/// The file is first created exclusively. If that fails because the file
/// already exists the SHA256 hash of its content is compared with the hash of
/// the payload. A matching file is kept and only its permissions are
/// corrected, a different file is truncated and rewritten.
///
/// If writing fails the partially written file is removed so a failed call
/// never leaves a corrupt executable behind.
///
/// This function does not guard against concurrent callers in the same
/// process, [`crate::Materializer`] serializes calls to it.
pub(crate) fn materialize(
    path: &Path,
    payload: &[u8],
    mode: ExecutableMode,
) -> Result<Materialized, MaterializeError> {
    materialize_with(path, payload, mode, |file| file)
}

/// Same as [`materialize`] but every opened file is passed through `wrap`
/// before the payload is written to it.
fn materialize_with<W: SyncWrite>(
    path: &Path,
    payload: &[u8],
    mode: ExecutableMode,
    wrap: impl Fn(std::fs::File) -> W,
) -> Result<Materialized, MaterializeError> {
    tracing::trace!("creating {}", path.display());
    let file = match create_file(path, mode, true) {
        Ok(file) => wrap(file),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            tracing::trace!(
                "{} already exists, checking that the content is the same",
                path.display()
            );
            return reconcile_existing(path, payload, mode, wrap);
        }
        Err(err) => return Err(MaterializeError::filesystem(FsOperation::Open, path, err)),
    };

    let sha256 = write_or_remove(path, file, payload, mode, WriteStage::Create)?;
    tracing::debug!("created {} ({:x})", path.display(), sha256);
    Ok(Materialized {
        outcome: Outcome::Created,
        sha256,
    })
}

/// Returns true if the file at `path` has the same content as `payload`.
///
/// The file is streamed through a SHA256 hasher so it is never loaded into
/// memory as a whole. A file that cannot be read is treated as different.
pub fn content_matches(path: &Path, payload: &[u8]) -> bool {
    file_matches_digest(path, &compute_bytes_digest::<Sha256>(payload))
}

fn file_matches_digest(path: &Path, expected: &Sha256Hash) -> bool {
    match compute_file_digest::<Sha256>(path) {
        Ok(actual) => &actual == expected,
        Err(err) => {
            tracing::trace!(
                "unable to compute the hash of {}: {}",
                path.display(),
                err
            );
            false
        }
    }
}

fn reconcile_existing<W: SyncWrite>(
    path: &Path,
    payload: &[u8],
    mode: ExecutableMode,
    wrap: impl Fn(std::fs::File) -> W,
) -> Result<Materialized, MaterializeError> {
    let expected = compute_bytes_digest::<Sha256>(payload);
    if file_matches_digest(path, &expected) {
        tracing::trace!("content of {} matches, using existing file", path.display());
        ensure_mode(path, mode)?;
        tracing::debug!("reusing {} ({:x})", path.display(), expected);
        return Ok(Materialized {
            outcome: Outcome::Reused,
            sha256: expected,
        });
    }

    tracing::trace!(
        "content of {} does not match, truncating the file",
        path.display()
    );
    let file = create_file(path, mode, false)
        .map(wrap)
        .map_err(|source| MaterializeError::DigestMismatchOverwriteFailure {
            path: path.to_path_buf(),
            source,
        })?;
    let sha256 = write_or_remove(path, file, payload, mode, WriteStage::Overwrite)?;
    tracing::debug!("overwrote {} ({:x})", path.display(), sha256);
    Ok(Materialized {
        outcome: Outcome::Overwritten,
        sha256,
    })
}

/// Opens `path` for writing. With `exclusive` the call fails if the file
/// already exists, otherwise an existing file is truncated.
fn create_file(
    path: &Path,
    mode: ExecutableMode,
    exclusive: bool,
) -> std::io::Result<std::fs::File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    if exclusive {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }

    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, mode.bits());
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

/// Writes `payload` to the already opened `file` at `path` and applies
/// `mode`. If anything fails the file is removed before the error is
/// returned.
fn write_or_remove(
    path: &Path,
    file: impl SyncWrite,
    payload: &[u8],
    mode: ExecutableMode,
    stage: WriteStage,
) -> Result<Sha256Hash, MaterializeError> {
    let result = write_payload(file, payload)
        .map_err(|source| stage.error(path, source))
        .and_then(|sha256| {
            set_mode(path, mode).map_err(|err| {
                MaterializeError::filesystem(FsOperation::SetPermissions, path, err)
            })?;
            Ok(sha256)
        });

    if result.is_err() {
        remove_partial_file(path);
    }
    result
}

/// Writes all of `payload` to `file`, syncs it to disk and closes it.
/// Returns the hash of the bytes that were written.
pub(crate) fn write_payload(
    file: impl SyncWrite,
    payload: &[u8],
) -> std::io::Result<Sha256Hash> {
    let mut writer = HashingWriter::<_, Sha256>::new(file);
    writer.write_all(payload)?;
    writer.flush()?;
    let (mut file, sha256) = writer.finalize();
    file.sync()?;

    // The handle has to be closed before the file can be executed.
    drop(file);
    Ok(sha256)
}

fn remove_partial_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::trace!("removed partially written file {}", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(
            "failed to remove partially written file {}: {}",
            path.display(),
            err
        ),
    }
}

/// Applies `mode` to the file at `path` unless it already has it.
fn ensure_mode(path: &Path, mode: ExecutableMode) -> Result<(), MaterializeError> {
    let metadata = fs::metadata(path)
        .map_err(|err| MaterializeError::filesystem(FsOperation::Stat, path, err))?;
    if mode.matches(&metadata.permissions()) {
        return Ok(());
    }

    tracing::trace!("changing the mode of {} to {:o}", path.display(), mode.bits());
    set_mode(path, mode)
        .map_err(|err| MaterializeError::filesystem(FsOperation::SetPermissions, path, err))
}

/// Makes the file at `path` executable. This is only supported on Unix based
/// filesystems, everywhere else the file only has to be writable.
pub(crate) fn set_mode(path: &Path, mode: ExecutableMode) -> std::io::Result<()> {
    #[cfg(unix)]
    return fs::set_permissions(
        path,
        std::os::unix::fs::PermissionsExt::from_mode(mode.bits()),
    );

    #[cfg(not(unix))]
    {
        let _ = mode;
        let mut permissions = fs::metadata(path)?.permissions();
        if permissions.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }
        Ok(())
    }
}
