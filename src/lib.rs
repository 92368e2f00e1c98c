//! # objbridge
//!
//! A **blocking stream bridge** between a repository transport host and an object
//! storage client. The host wants to read and write named resources as if they were
//! local files; the storage client fetches whole objects and uploads asynchronously
//! from a stream it owns. `objbridge` sits in between.
//!
//! ## Key Features
//!
//! - **Downloads as readers** - existence check, then a buffered reader plus the
//!   object's size and modification time
//! - **Uploads as writers** - a bounded in-process pipe whose reader feeds a background
//!   transfer while the caller writes, with natural backpressure
//! - **Tracked transfers** - every upload is registered per session and drained at
//!   close, so no transfer is abandoned mid-flight
//! - **Provider agnostic** - any storage SDK plugs in through [`ObjectClient`]
//!
//! ## Quick Start
//!
//! ```
//! use objbridge::*;
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let client = Arc::new(FakeObjectClient::new());
//! let session = Session::new(Repository::new("bucket", "/releases"), client.clone());
//! session.open()?;
//!
//! let mut writer = session.open_for_write("app-1.0.jar", 5)?;
//! writer.write_all(b"hello")?;
//! writer.close()?;
//! session.close()?;
//!
//! assert_eq!(
//!     client.object_data("bucket", "releases/app-1.0.jar").as_deref(),
//!     Some(&b"hello"[..])
//! );
//!
//! let (mut reader, metadata) = session.open_for_read("app-1.0.jar")?;
//! let mut text = String::new();
//! reader.read_to_string(&mut text)?;
//! assert_eq!(text, "hello");
//! assert_eq!(metadata.content_length, 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Keys
//!
//! A [`Repository`] names a container (its host) and a base directory. A resource
//! `name` in it lives at `base_dir/name` with the leading separator stripped; see
//! [`key::resolve_key`].
//!
//! ### Sessions
//!
//! A [`Session`] owns one [`TransferRegistry`]. [`Session::close`] waits for each
//! registered upload, closes its writer, and removes it. Interrupted waits are logged
//! and reported through [`Session::take_interrupted`]; close failures surface as
//! [`BridgeError::ConnectionFailure`].
//!
//! ### Errors
//!
//! - [`BridgeError::NotFound`] - the object to read does not exist
//! - [`BridgeError::TransferFailure`] - transport error, or upload setup failed
//! - [`BridgeError::ConnectionFailure`] - an upload stream failed to close at teardown
//!
//! ## Logging
//!
//! The crate logs through `tracing`; install any subscriber to see it.

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod host;
pub mod key;
pub mod pipe;
pub mod registry;
pub mod session;
pub mod testing;
pub mod upload;

pub use client::{
    ClientError, ClientResult, ErrorKind, FakeObjectClient, ObjectClient, RemoteObject,
    RemoteObjectMetadata, TransferHandle, TransferId, UploadRequest, WaitOutcome,
};
pub use config::{BridgeConfig, DrainPolicy};
pub use download::{DownloadBridge, DownloadStream};
pub use error::{BridgeError, BridgeResult, TransferCause};
pub use host::{InputData, OutputData, Repository, Resource, StreamProvider};
pub use key::RemoteObjectKey;
pub use pipe::{DEFAULT_BUFFER_SIZE, PipeCloser, PipeReader, PipeWriter, pipe};
pub use registry::{DrainReport, TransferRegistry, UploadSink};
pub use session::Session;
pub use upload::UploadBridge;
