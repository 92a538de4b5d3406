//! Timing helpers for the report

use std::time::Duration;

/// Format a duration with the largest unit that keeps it at or above 1
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use seeklat::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(740)), "740ns");
/// assert_eq!(format_duration(Duration::from_micros(85)), "85.00us");
/// assert_eq!(format_duration(Duration::from_micros(12_300)), "12.30ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }

    let (divisor, unit) = match nanos {
        n if n < 1_000_000 => (1e3, "us"),
        n if n < 1_000_000_000 => (1e6, "ms"),
        _ => (1e9, "s"),
    };
    format!("{:.2}{}", nanos as f64 / divisor, unit)
}

/// Format an operation rate with a K/M/G suffix
///
/// # Examples
///
/// ```
/// use seeklat::util::time::format_rate;
///
/// assert_eq!(format_rate(312.0), "312");
/// assert_eq!(format_rate(48_200.0), "48.20K");
/// ```
pub fn format_rate(rate: f64) -> String {
    if rate < 1e3 {
        return format!("{:.0}", rate);
    }

    let (divisor, suffix) = match rate {
        r if r < 1e6 => (1e3, "K"),
        r if r < 1e9 => (1e6, "M"),
        _ => (1e9, "G"),
    };
    format!("{:.2}{}", rate / divisor, suffix)
}

/// Operations per second, 0 for an empty interval
pub fn calculate_iops(operations: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        operations as f64 / seconds
    } else {
        0.0
    }
}

/// Bytes per second, 0 for an empty interval
pub fn calculate_throughput(bytes: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        bytes as f64 / seconds
    } else {
        0.0
    }
}

/// Divide a duration evenly across `n` requests
///
/// Returns zero when `n` is zero.
pub fn per_request(total: Duration, n: u64) -> Duration {
    if n == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(n);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_boundaries() {
        assert_eq!(format_duration(Duration::ZERO), "0ns");
        assert_eq!(format_duration(Duration::from_nanos(999)), "999ns");
        assert_eq!(format_duration(Duration::from_nanos(1_000)), "1.00us");
        assert_eq!(format_duration(Duration::from_nanos(87_654)), "87.65us");
        assert_eq!(format_duration(Duration::from_micros(1_000)), "1.00ms");
        assert_eq!(format_duration(Duration::from_secs(90)), "90.00s");
    }

    #[test]
    fn test_format_rate_boundaries() {
        assert_eq!(format_rate(0.0), "0");
        assert_eq!(format_rate(999.4), "999");
        assert_eq!(format_rate(1_000.0), "1.00K");
        assert_eq!(format_rate(250_000.0), "250.00K");
        assert_eq!(format_rate(3_000_000_000.0), "3.00G");
    }

    #[test]
    fn test_calculate_iops() {
        assert_eq!(calculate_iops(1000, Duration::from_secs(10)), 100.0);
        assert_eq!(calculate_iops(1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_calculate_throughput() {
        let throughput = calculate_throughput(1024 * 1024 * 10, Duration::from_secs(10));
        assert_eq!(throughput, 1024.0 * 1024.0);
    }

    #[test]
    fn test_per_request() {
        assert_eq!(per_request(Duration::from_micros(1000), 10), Duration::from_micros(100));
        assert_eq!(per_request(Duration::from_secs(1), 0), Duration::ZERO);
    }
}
