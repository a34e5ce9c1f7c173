//! Byte-level I/O for transform jobs.
//!
//! - [`cloud`]: storage and queue collaborators behind synchronous traits
//! - [`pipe`]: bounded single-producer/single-consumer byte pipe
//! - [`compression`]: the [`CompressingSink`](compression::CompressingSink) output wrapper

pub mod cloud;
pub mod compression;
pub mod pipe;
