//! Mock reader for testing
//!
//! Simulates a target of a given size without touching the disk. It records
//! every offset it is asked for, can add a fixed delay per read, and can fail
//! the n-th read issued from a named worker thread.
//!
//! # Example
//!
//! ```
//! use seeklat::engine::{PositionedRead, mock::MockReader};
//!
//! let reader = MockReader::new(1 << 20);
//! let mut buf = [0u8; 1];
//! reader.read_at(&mut buf, 4096).unwrap();
//! assert_eq!(reader.offsets(), vec![4096]);
//! ```

use super::PositionedRead;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Injected failure: the `nth` read (0-based) issued by thread `thread_name`
#[derive(Debug, Clone)]
struct Failure {
    thread_name: String,
    nth: u64,
}

/// In-memory stand-in for a target
#[derive(Debug, Default)]
pub struct MockReader {
    size: u64,
    delay: Option<Duration>,
    failure: Option<Failure>,
    reads: AtomicU64,
    per_thread: Mutex<HashMap<String, u64>>,
    offsets: Mutex<Vec<u64>>,
}

impl MockReader {
    /// Reader over a target of `size` bytes
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every read
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the `nth` read (0-based) issued from the thread named `thread_name`
    pub fn fail_on(mut self, thread_name: impl Into<String>, nth: u64) -> Self {
        self.failure = Some(Failure {
            thread_name: thread_name.into(),
            nth,
        });
        self
    }

    /// Total reads attempted, including failed ones
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Offsets of all reads, in arrival order
    pub fn offsets(&self) -> Vec<u64> {
        self.offsets.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl PositionedRead for MockReader {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let thread_name = std::thread::current().name().unwrap_or("").to_string();
        let nth = {
            let mut per_thread = self
                .per_thread
                .lock()
                .map_err(|_| io::Error::other("mock state poisoned"))?;
            let count = per_thread.entry(thread_name.clone()).or_insert(0);
            let nth = *count;
            *count += 1;
            nth
        };

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if let Some(ref failure) = self.failure {
            if failure.thread_name == thread_name && failure.nth == nth {
                return Err(io::Error::other(format!("injected failure at offset {}", offset)));
            }
        }

        if let Ok(mut offsets) = self.offsets.lock() {
            offsets.push(offset);
        }

        if offset.saturating_add(buf.len() as u64) > self.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {} past end of {}", buf.len(), offset, self.size),
            ));
        }

        buf.fill(0);
        Ok(())
    }
}
