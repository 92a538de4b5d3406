//! Shared helpers: buffers, formatting, logging

pub mod buffer;
pub mod bytes;
pub mod logger;
pub mod time;
