//! Addressable size resolution
//!
//! `stat` is trusted when it reports a positive length. Raw devices report 0,
//! so a zero length falls back to the block device query before the run is
//! given up on.

use super::block::BlockDeviceSizer;
use crate::error::BenchError;
use crate::util::bytes::format_bytes_decimal;
use serde::Serialize;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Where the resolved size came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSource {
    /// File metadata (`stat`)
    Metadata,
    /// Platform block device query
    BlockDevice,
}

/// Positive addressable length of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedSize {
    pub size: u64,
    pub source: SizeSource,
}

/// The parts of file metadata the resolver looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetMetadata {
    /// Length reported by `stat`
    pub reported_size: u64,
    /// Whether the file type is a block or character device
    pub is_device: bool,
}

impl From<&std::fs::Metadata> for TargetMetadata {
    fn from(meta: &std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        Self {
            reported_size: meta.len(),
            is_device: file_type.is_block_device() || file_type.is_char_device(),
        }
    }
}

/// Resolve the addressable size of an open target
///
/// # Errors
///
/// Returns [`BenchError::ZeroSize`] when both the metadata and the block device
/// query report 0 bytes.
pub fn resolve_size(
    path: &Path,
    meta: &TargetMetadata,
    fd: RawFd,
    sizer: &dyn BlockDeviceSizer,
) -> Result<ResolvedSize, BenchError> {
    if meta.reported_size > 0 {
        return Ok(ResolvedSize {
            size: meta.reported_size,
            source: SizeSource::Metadata,
        });
    }

    if meta.is_device {
        tracing::info!("0-sized file is reported as a block device, trying to read size as such...");
    } else {
        tracing::info!("0-sized file, trying to read size as a block device as a last resort...");
    }

    let device_size = sizer.query_size(fd);
    tracing::info!("found block device size: {}", format_bytes_decimal(device_size));

    if device_size > 0 {
        Ok(ResolvedSize {
            size: device_size,
            source: SizeSource::BlockDevice,
        })
    } else {
        Err(BenchError::ZeroSize {
            path: path.to_path_buf(),
        })
    }
}
