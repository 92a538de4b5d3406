//! Report output
//!
//! [`text`] logs the results as they are produced; [`json`] writes the whole
//! run to a file when `-json` is given.

pub mod json;
pub mod text;
