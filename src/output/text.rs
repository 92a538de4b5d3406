//! Human-readable text output
//!
//! Results are emitted as log lines, like every other message of a run. Lines
//! are built separately from logging them so their content can be tested.

use crate::scan::{ScanProgress, ScanReport};
use crate::stats::aggregator::{Report, REPORT_BLOCK_SIZES};
use crate::util::bytes::{format_bytes_binary, format_bytes_decimal};
use crate::util::time::{format_duration, format_rate};
use tracing::info;

/// Width of the blank run that clears the previous progress line
const PROGRESS_CLEAR_WIDTH: usize = 60;

/// Log the random-read report
pub fn print_report(report: &Report) {
    for line in report_lines(report) {
        info!("{}", line);
    }
}

/// Log the sequential scan result
pub fn print_scan(report: &ScanReport) {
    info!("{}", scan_line(report));
}

/// Lines of the random-read report, in output order
pub fn report_lines(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!(
        "total time: {} ns ({}) for {} requests",
        report.worker_time.as_nanos(),
        format_duration(report.worker_time),
        report.total_requests
    ));

    let mut real_time = format!(
        "real time: {} ns ({})",
        report.real_time.as_nanos(),
        format_duration(report.real_time)
    );
    if report.workers > 1 {
        real_time.push_str(&format!(
            " with {} workers, {:.2}x worker time",
            report.workers,
            report.speedup()
        ));
    }
    lines.push(real_time);

    if report.workers > 1 {
        lines.push(format!(
            "fastest worker: {}, slowest worker: {}",
            format_duration(report.fastest_worker),
            format_duration(report.slowest_worker)
        ));
    }

    lines.push(format!(
        "per rq time: {} ns ({})",
        report.per_request_worker.as_nanos(),
        format_duration(report.per_request_worker)
    ));

    lines.push(format!(
        "per rq real time: {} ns ({})",
        report.per_request_real.as_nanos(),
        format_duration(report.per_request_real)
    ));

    let [small, large] = REPORT_BLOCK_SIZES;
    lines.push(format!(
        "bytes requested ({} blocks): {} ({}) | {} ({})",
        report.total_requests,
        format_bytes_decimal(report.requested_as_blocks(small)),
        small,
        format_bytes_decimal(report.requested_as_blocks(large)),
        large
    ));

    lines.push(format!(
        "bytes read: {} ({}) in {} B reads, {}/s, {} IOPS",
        format_bytes_decimal(report.bytes_read),
        format_bytes_binary(report.bytes_read),
        report.read_len,
        format_bytes_decimal(report.bytes_per_second as u64),
        format_rate(report.iops)
    ));

    if let Some(ref latency) = report.latency {
        lines.push(format!(
            "latency: min {} | mean {} | p50 {} | p90 {} | p99 {} | p99.9 {} | max {}",
            format_duration(latency.min),
            format_duration(latency.mean),
            format_duration(latency.p50),
            format_duration(latency.p90),
            format_duration(latency.p99),
            format_duration(latency.p999),
            format_duration(latency.max)
        ));
    }

    lines
}

/// Final line of a sequential scan
pub fn scan_line(report: &ScanReport) -> String {
    format!(
        "{} bytes read in {} ({}/s)",
        format_bytes_decimal(report.bytes_read),
        format_duration(report.elapsed),
        format_bytes_decimal(report.bytes_per_second as u64)
    )
}

/// Carriage-return progress line, overwritten in place by the next one
pub fn progress_line(progress: &ScanProgress) -> String {
    format!(
        "{}\r ~ {}/s ({} - {})\r",
        " ".repeat(PROGRESS_CLEAR_WIDTH),
        format_bytes_decimal(progress.interval_bytes),
        format_bytes_decimal(progress.total_bytes),
        format_bytes_binary(progress.total_bytes)
    )
}

/// `size: 1.00 GB (953.67 MiB), doing N req...` line logged before the run
pub fn size_line(size: u64, requests: u64) -> String {
    format!(
        "size: {} ({}), doing {} req...",
        format_bytes_decimal(size),
        format_bytes_binary(size),
        requests
    )
}
