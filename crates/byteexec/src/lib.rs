#![deny(missing_docs)]

//! Run executables that are embedded in a program as a byte slice.
//!
//! A program can bundle a helper tool into its own distributable, for
//! instance with [`include_bytes!`]. To run the tool it first has to exist as
//! an executable file on disk. This crate writes the bytes to disk, makes the
//! file executable and returns a handle that constructs a
//! [`std::process::Command`] for it.
//!
//! # Modes
//!
//! - [`Materializer::materialize`] stores the executable at a stable path.
//!   Relative filenames are resolved against a per-user directory (see
//!   [`resolve::default_install_dir`]). Later calls with the same path reuse
//!   the existing file if its content matches the payload, otherwise the file
//!   is overwritten.
//! - [`Materializer::materialize_temp`] stores the executable in a uniquely
//!   named temporary file that is removed by [`TempByteExec::dispose`].
//!
//! # Integrity
//!
//! Files are created exclusively. If a file already exists its SHA256 hash
//! is compared with the hash of the payload (see [`content_matches`]) so the
//! file is only rewritten when its content differs. A write that fails
//! halfway removes the partial file again, a failed call never leaves a
//! corrupt executable behind.
//!
//! # Usage
//!
//! ```rust,no_run
//! use byteexec::{Executable, Materializer};
//!
//! let materializer = Materializer::new();
//! let helper = materializer
//!     .materialize(b"#!/bin/sh\necho hello\n", "helper")
//!     .unwrap();
//! let output = helper.command(["--verbose"]).output().unwrap();
//! println!("{}", String::from_utf8_lossy(&output.stdout));
//! ```

mod error;
mod exec;
mod materializer;
pub mod platform;
pub mod resolve;
mod writer;

pub use error::{DirectoryError, FsOperation, MaterializeError};
pub use exec::{ByteExec, Executable, TempByteExec};
pub use materializer::Materializer;
pub use writer::{content_matches, ExecutableMode, Materialized, Outcome};
