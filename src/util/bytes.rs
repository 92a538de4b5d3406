//! Human-readable byte counts
//!
//! Two independent renderings of the same integer: decimal (SI, base 1000)
//! and binary (IEC, base 1024). Below the base the raw count is printed,
//! above it the value is divided until the quotient drops below the base and
//! printed with two decimals.

/// Format bytes with decimal units (B, kB, MB, GB, TB, PB, EB)
///
/// # Examples
///
/// ```
/// use seeklat::util::bytes::format_bytes_decimal;
///
/// assert_eq!(format_bytes_decimal(999), "999 B");
/// assert_eq!(format_bytes_decimal(1000), "1.00 kB");
/// assert_eq!(format_bytes_decimal(1_500_000), "1.50 MB");
/// ```
pub fn format_bytes_decimal(bytes: u64) -> String {
    format_with_base(bytes, 1000, b"kMGTPE", "B")
}

/// Format bytes with binary units (B, KiB, MiB, GiB, TiB, PiB, EiB)
///
/// # Examples
///
/// ```
/// use seeklat::util::bytes::format_bytes_binary;
///
/// assert_eq!(format_bytes_binary(1023), "1023 B");
/// assert_eq!(format_bytes_binary(1024), "1.00 KiB");
/// assert_eq!(format_bytes_binary(1_048_576), "1.00 MiB");
/// ```
pub fn format_bytes_binary(bytes: u64) -> String {
    format_with_base(bytes, 1024, b"KMGTPE", "iB")
}

fn format_with_base(bytes: u64, unit: u64, prefixes: &[u8], suffix: &str) -> String {
    if bytes < unit {
        return format!("{} B", bytes);
    }

    let mut div = unit;
    let mut exp = 0;
    let mut n = bytes / unit;
    while n >= unit {
        div *= unit;
        exp += 1;
        n /= unit;
    }

    format!(
        "{:.2} {}{}",
        bytes as f64 / div as f64,
        prefixes[exp] as char,
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_below_unit() {
        assert_eq!(format_bytes_decimal(0), "0 B");
        assert_eq!(format_bytes_decimal(999), "999 B");
    }

    #[test]
    fn test_decimal_units() {
        assert_eq!(format_bytes_decimal(1000), "1.00 kB");
        assert_eq!(format_bytes_decimal(1_500_000), "1.50 MB");
        assert_eq!(format_bytes_decimal(2_000_000_000), "2.00 GB");
        assert_eq!(format_bytes_decimal(512 * 100), "51.20 kB");
    }

    #[test]
    fn test_binary_below_unit() {
        assert_eq!(format_bytes_binary(1023), "1023 B");
    }

    #[test]
    fn test_binary_units() {
        assert_eq!(format_bytes_binary(1024), "1.00 KiB");
        assert_eq!(format_bytes_binary(1_048_576), "1.00 MiB");
        assert_eq!(format_bytes_binary(1536), "1.50 KiB");
        assert_eq!(format_bytes_binary(1 << 40), "1.00 TiB");
    }

    #[test]
    fn test_largest_values_do_not_overflow() {
        assert_eq!(format_bytes_decimal(u64::MAX), "18.45 EB");
        assert_eq!(format_bytes_binary(u64::MAX), "16.00 EiB");
    }
}
