//! Positioned reads
//!
//! Workers read through the [`PositionedRead`] trait instead of calling the OS
//! directly. The real implementation ([`sync`]) is `pread(2)` on the shared
//! file handle; [`mock`] stands in for a device in tests and can inject
//! failures.
//!
//! Positioned reads carry their offset with every call, so the handle has no
//! seek position for workers to race on and can be shared across threads
//! without a lock.

/// Read an exact number of bytes at an absolute offset
pub trait PositionedRead: Sync {
    /// Fill `buf` from `offset`
    ///
    /// # Errors
    ///
    /// Any OS error, or [`std::io::ErrorKind::UnexpectedEof`] when the target
    /// ends before `buf` is full.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()>;
}

pub mod mock;
pub mod sync;
