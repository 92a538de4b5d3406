//! Synchronous positioned reads with `pread`
//!
//! One blocking syscall per request, which is exactly what a latency
//! measurement wants: nothing queued, nothing overlapped. Partial reads are
//! continued until the buffer is full; hitting end of file first is an error.

use super::PositionedRead;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

impl PositionedRead for File {
    #[inline(always)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let fd = self.as_raw_fd();
        let mut total_read = 0;
        let mut current_offset = offset;

        while total_read < buf.len() {
            let remaining = &mut buf[total_read..];
            let file_offset = libc::off_t::try_from(current_offset)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds off_t"))?;

            // SAFETY: `remaining` is a valid, exclusively borrowed region of
            // `remaining.len()` bytes for the duration of the call.
            let result = unsafe {
                libc::pread(
                    fd,
                    remaining.as_mut_ptr() as *mut libc::c_void,
                    remaining.len(),
                    file_offset,
                )
            };

            if result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            if result == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "end of file after {} of {} bytes at offset {}",
                        total_read,
                        buf.len(),
                        offset
                    ),
                ));
            }

            let bytes_read = result as usize;
            total_read += bytes_read;
            current_offset += bytes_read as u64;
        }

        Ok(())
    }
}
