//! CLI to config conversion utilities

use anyhow::{Context, Result};

/// Parse a size string (e.g., "512", "4k", "1M") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("k") || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches("k"), 1024u64)
    } else if s.ends_with("m") || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches("m"), 1024 * 1024)
    } else if s.ends_with("g") || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches("g"), 1024 * 1024 * 1024)
    } else if s.ends_with("b") {
        (s.trim_end_matches("b"), 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Round `len` up to the next multiple of `alignment` (no-op for 0)
pub fn round_up(len: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return len;
    }
    len.div_ceil(alignment).saturating_mul(alignment)
}
