//! Target handle
//!
//! A target is the file or block device under test, opened read-only. Opening
//! it also resolves its addressable size (see [`size`]) and fixes the offset
//! alignment the run has to honour.
//!
//! # Example
//!
//! ```no_run
//! use seeklat::target::{OpenFlags, Target};
//! use seeklat::target::block::PlatformSizer;
//! use std::path::Path;
//!
//! let target = Target::open(Path::new("/dev/sdb"), OpenFlags::default(), &PlatformSizer)?;
//! println!("{} bytes", target.size());
//! target.close()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod block;
pub mod size;

use crate::Result;
use anyhow::Context;
use block::BlockDeviceSizer;
use size::{resolve_size, ResolvedSize, SizeSource, TargetMetadata};
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::path::{Path, PathBuf};

/// How the target is opened
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Bypass the page cache (O_DIRECT, or F_NOCACHE on macOS)
    pub direct: bool,

    /// Offset alignment imposed by `direct`; ignored otherwise
    pub alignment: u64,
}

/// An open, read-only file or block device
#[derive(Debug)]
pub struct Target {
    path: PathBuf,
    file: File,
    resolved: ResolvedSize,
    alignment: u64,
}

impl Target {
    /// Open `path` read-only and resolve its size
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be opened or stat'ed, cache bypass
    /// cannot be enabled, or the size resolves to zero
    /// ([`BenchError::ZeroSize`](crate::error::BenchError::ZeroSize)).
    pub fn open(path: &Path, flags: OpenFlags, sizer: &dyn BlockDeviceSizer) -> Result<Self> {
        let file = open_file(path, flags.direct)?;

        let meta = file
            .metadata()
            .with_context(|| format!("stat failed: path={}", path.display()))?;

        let resolved = resolve_size(path, &TargetMetadata::from(&meta), file.as_raw_fd(), sizer)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            resolved,
            alignment: if flags.direct { flags.alignment } else { 0 },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open handle, shared read-only by all workers
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Addressable size in bytes, always positive
    pub fn size(&self) -> u64 {
        self.resolved.size
    }

    pub fn size_source(&self) -> SizeSource {
        self.resolved.source
    }

    /// Offset alignment, 0 when reads are not cache-bypassing
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Close the handle, reporting errors that `Drop` would swallow
    pub fn close(self) -> Result<()> {
        let fd = self.file.into_raw_fd();
        // SAFETY: fd was just released by the File, so this is its only owner.
        let result = unsafe { libc::close(fd) };
        if result < 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!("close failed: path={}", self.path.display()));
        }
        Ok(())
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "dragonfly"))]
fn open_file(path: &Path, direct: bool) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.read(true);
    if direct {
        options.custom_flags(libc::O_DIRECT);
    }
    options
        .open(path)
        .with_context(|| format!("failed to open target: {}", path.display()))
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn open_file(path: &Path, direct: bool) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("failed to open target: {}", path.display()))?;
    if direct {
        // SAFETY: plain fcntl on a descriptor owned by `file`.
        let result = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) };
        if result == -1 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!("fcntl(F_NOCACHE) failed: path={}", path.display()));
        }
    }
    Ok(file)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios"
)))]
fn open_file(path: &Path, direct: bool) -> Result<File> {
    if direct {
        anyhow::bail!("cache bypass is not supported on this platform");
    }
    OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("failed to open target: {}", path.display()))
}
