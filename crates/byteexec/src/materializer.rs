use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::{
    error::MaterializeError,
    exec::{ByteExec, TempByteExec},
    platform::{NativePlatform, PlatformConventions},
    resolve,
    writer::{self, ExecutableMode},
};

/// Writes executables to disk so they can be started as child processes.
///
/// A host application constructs a single `Materializer` and shares it, for
/// instance through an [`std::sync::Arc`] or a [`std::sync::LazyLock`]. All calls to
/// [`Materializer::materialize`] on the same instance are serialized, which
/// guarantees that two threads never race on the same file. Separate
/// processes are not coordinated, they only rely on the exclusive creation of
/// files and the content check that follows it.
#[derive(Debug)]
pub struct Materializer<P = NativePlatform> {
    platform: P,
    install_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    mode: ExecutableMode,
    lock: Mutex<()>,
}

impl Default for Materializer {
    fn default() -> Self {
        Self::with_platform(NativePlatform::default())
    }
}

impl Materializer {
    /// Constructs a new instance that follows the conventions of the current
    /// platform.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: PlatformConventions> Materializer<P> {
    /// Constructs a new instance that follows the conventions of `platform`.
    pub fn with_platform(platform: P) -> Self {
        Self {
            platform,
            install_dir: None,
            temp_dir: None,
            mode: ExecutableMode::default(),
            lock: Mutex::new(()),
        }
    }

    /// Sets the directory that relative filenames are resolved against. By
    /// default this is [`resolve::default_install_dir`].
    #[must_use]
    pub fn with_install_dir(self, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: Some(install_dir.into()),
            ..self
        }
    }

    /// Sets the directory that relative filenames are resolved against.
    ///
    /// This function is similar to [`Self::with_install_dir`], but modifies
    /// an existing instance.
    pub fn set_install_dir(&mut self, install_dir: impl Into<PathBuf>) -> &mut Self {
        self.install_dir = Some(install_dir.into());
        self
    }

    /// Sets the directory in which temporary executables are created. By
    /// default this is [`std::env::temp_dir`].
    #[must_use]
    pub fn with_temp_dir(self, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(temp_dir.into()),
            ..self
        }
    }

    /// Sets the directory in which temporary executables are created.
    ///
    /// This function is similar to [`Self::with_temp_dir`], but modifies an
    /// existing instance.
    pub fn set_temp_dir(&mut self, temp_dir: impl Into<PathBuf>) -> &mut Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    /// Sets the permissions that are applied to executables.
    #[must_use]
    pub fn with_mode(self, mode: ExecutableMode) -> Self {
        Self { mode, ..self }
    }

    /// Sets the permissions that are applied to executables.
    ///
    /// This function is similar to [`Self::with_mode`], but modifies an
    /// existing instance.
    pub fn set_mode(&mut self, mode: ExecutableMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Returns the platform conventions used by this instance.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Returns the permissions that are applied to executables.
    pub fn mode(&self) -> ExecutableMode {
        self.mode
    }

    /// Returns the directory that relative filenames are resolved against.
    pub fn install_dir(&self) -> Result<PathBuf, MaterializeError> {
        match &self.install_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(resolve::default_install_dir(&self.platform)?),
        }
    }

    /// Returns the absolute path that `filename` resolves to, creating the
    /// directory that contains it if needed.
    pub fn resolve(&self, filename: impl AsRef<Path>) -> Result<PathBuf, MaterializeError> {
        Ok(resolve::resolve_path(
            &self.platform,
            self.install_dir.as_deref(),
            filename.as_ref(),
        )?)
    }

    /// Ensures an executable containing `payload` exists at `filename` and
    /// returns a handle to it.
    ///
    /// Relative filenames are resolved against the install directory, see
    /// [`Self::with_install_dir`]. If a file already exists at the location
    /// and its content equals `payload` it is reused, otherwise it is
    /// overwritten.
    pub fn materialize(
        &self,
        payload: &[u8],
        filename: impl AsRef<Path>,
    ) -> Result<ByteExec, MaterializeError> {
        let _guard = self.lock.lock();

        let path = self.resolve(filename)?;
        let materialized = writer::materialize(&path, payload, self.mode)?;
        Ok(ByteExec::new(path, materialized))
    }

    /// Writes `payload` to a new, uniquely named temporary file and returns a
    /// handle to it.
    ///
    /// Every call creates a new file, which is removed again by
    /// [`TempByteExec::dispose`].
    pub fn materialize_temp(&self, payload: &[u8]) -> Result<TempByteExec, MaterializeError> {
        let temp_dir = self
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        TempByteExec::create(&temp_dir, payload, &self.platform, self.mode)
    }
}
