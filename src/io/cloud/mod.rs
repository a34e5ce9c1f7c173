//! Storage and messaging abstractions for the transform service.
//!
//! The core never talks to a concrete storage or queue SDK. It goes through the
//! synchronous traits in [`traits`]:
//!
//! - [`ObjectIO`] - Object storage (S3, GCS, Azure Blob, local filesystem)
//! - [`QueueIO`] - Message queues delivering transform jobs
//!
//! Each trait comes with an in-memory fake ([`FakeObjectIO`], [`FakeQueueIO`]) for tests,
//! and object storage has a filesystem implementation ([`LocalObjectIO`]) used by the
//! binary. Objects are addressed with [`ObjectUrl`] locators (`s3://bucket/key`).
//!
//! ## Usage
//! ```
//! use csv_transformer::io::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let storage = FakeObjectIO::new();
//! let url = ObjectUrl::parse("s3://bucket/data/input.csv")?;
//! storage.put_object(url.bucket(), url.key(), b"a,b\n")?;
//! assert!(storage.object_exists(url.bucket(), url.key())?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`CloudResult<T>`] where the error is [`CloudIOError`],
//! categorized by [`ErrorKind`].

pub mod fake;
pub mod local;
pub mod locator;
pub mod traits;

pub use fake::*;
pub use local::LocalObjectIO;
pub use locator::ObjectUrl;
pub use traits::*;
