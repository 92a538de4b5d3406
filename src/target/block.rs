//! Block device size queries
//!
//! A zero-length stat result is normal for raw devices, so their size has to
//! be asked from the driver with an ioctl. Each platform spells that ioctl
//! differently; [`PlatformSizer`] picks the right one at compile time and the
//! rest of the crate only sees the [`BlockDeviceSizer`] trait.
//!
//! | Platform          | Query                                         |
//! |-------------------|-----------------------------------------------|
//! | Linux, Android    | `BLKGETSIZE64`                                |
//! | macOS, iOS        | `DKIOCGETBLOCKSIZE` × `DKIOCGETBLOCKCOUNT`    |
//! | FreeBSD, DragonFly| `DIOCGMEDIASIZE`                              |
//! | anything else     | unsupported, always 0                         |

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Capability to ask the OS for the byte length of a block device
pub trait BlockDeviceSizer {
    /// Size in bytes of the device behind `fd`
    ///
    /// Returns 0 when `fd` is not a block device, the query is unsupported on
    /// this platform, or the ioctl fails. Never blocks indefinitely.
    fn query_size(&self, fd: RawFd) -> u64;
}

/// The sizer for the platform this binary was built for
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformSizer;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod imp {
    use std::os::unix::io::RawFd;

    // ioctl request code for getting block device size
    const BLKGETSIZE64: libc::c_ulong = 0x80081272;

    pub(super) fn query_size(fd: RawFd) -> u64 {
        let mut size: u64 = 0;
        // SAFETY: BLKGETSIZE64 writes a single u64 through the pointer.
        let result = unsafe { libc::ioctl(fd, BLKGETSIZE64 as _, &mut size) };
        if result < 0 {
            tracing::debug!(
                "ioctl(BLKGETSIZE64) failed: {}",
                std::io::Error::last_os_error()
            );
            return 0;
        }
        size
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod imp {
    use std::os::unix::io::RawFd;

    // _IOR('d', 24, uint32_t)
    const DKIOCGETBLOCKSIZE: libc::c_ulong = 0x40046418;
    // _IOR('d', 25, uint64_t)
    const DKIOCGETBLOCKCOUNT: libc::c_ulong = 0x40086419;

    pub(super) fn query_size(fd: RawFd) -> u64 {
        let mut block_size: u32 = 0;
        let mut block_count: u64 = 0;

        // SAFETY: DKIOCGETBLOCKSIZE writes a u32 through the pointer.
        let result = unsafe { libc::ioctl(fd, DKIOCGETBLOCKSIZE, &mut block_size) };
        if result < 0 {
            tracing::debug!(
                "ioctl(DKIOCGETBLOCKSIZE) failed: {}",
                std::io::Error::last_os_error()
            );
            return 0;
        }

        // SAFETY: DKIOCGETBLOCKCOUNT writes a u64 through the pointer.
        let result = unsafe { libc::ioctl(fd, DKIOCGETBLOCKCOUNT, &mut block_count) };
        if result < 0 {
            tracing::debug!(
                "ioctl(DKIOCGETBLOCKCOUNT) failed: {}",
                std::io::Error::last_os_error()
            );
            return 0;
        }

        block_count.saturating_mul(u64::from(block_size))
    }
}

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
mod imp {
    use std::os::unix::io::RawFd;

    // _IOR('d', 129, off_t)
    const DIOCGMEDIASIZE: libc::c_ulong = 0x40086481;

    pub(super) fn query_size(fd: RawFd) -> u64 {
        let mut size: libc::off_t = 0;
        // SAFETY: DIOCGMEDIASIZE writes a single off_t through the pointer.
        let result = unsafe { libc::ioctl(fd, DIOCGMEDIASIZE, &mut size) };
        if result < 0 {
            tracing::debug!(
                "ioctl(DIOCGMEDIASIZE) failed: {}",
                std::io::Error::last_os_error()
            );
            return 0;
        }
        u64::try_from(size).unwrap_or(0)
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
)))]
mod imp {
    use std::os::unix::io::RawFd;

    pub(super) fn query_size(_fd: RawFd) -> u64 {
        0
    }
}

impl BlockDeviceSizer for PlatformSizer {
    fn query_size(&self, fd: RawFd) -> u64 {
        imp::query_size(fd)
    }
}

/// Sizer that answers with a fixed value and counts how often it was asked
///
/// Stands in for a real device where no block device is available.
#[derive(Debug, Default)]
pub struct FixedSizer {
    size: u64,
    queries: AtomicUsize,
}

impl FixedSizer {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            queries: AtomicUsize::new(0),
        }
    }

    /// Number of `query_size` calls so far
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl BlockDeviceSizer for FixedSizer {
    fn query_size(&self, _fd: RawFd) -> u64 {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_platform_sizer_regular_file_is_zero() {
        // A regular file is not a block device; the ioctl fails (ENOTTY) and
        // the sizer reports 0 instead of an error.
        let file = tempfile::tempfile().unwrap();
        assert_eq!(PlatformSizer.query_size(file.as_raw_fd()), 0);
    }

    #[test]
    fn test_platform_sizer_bad_fd_is_zero() {
        assert_eq!(PlatformSizer.query_size(-1), 0);
    }

    #[test]
    fn test_fixed_sizer_counts_queries() {
        let sizer = FixedSizer::new(1 << 20);
        assert_eq!(sizer.queries(), 0);
        assert_eq!(sizer.query_size(3), 1 << 20);
        assert_eq!(sizer.query_size(3), 1 << 20);
        assert_eq!(sizer.queries(), 2);
    }
}
