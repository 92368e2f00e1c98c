//! Types exchanged with the repository transport host.
//!
//! The host owns connection lifecycle and dispatches reads and writes; it hands the
//! bridge a [`Repository`] once and a [`Resource`] per request, and receives a stream
//! back through [`InputData`] or [`OutputData`].

use crate::error::BridgeResult;
use crate::pipe::PipeWriter;
use std::fmt;
use std::io::Read;

/// A remote repository: the storage container and the directory inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub host: String,
    pub base_dir: String,
}

impl Repository {
    pub fn new(host: impl Into<String>, base_dir: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            base_dir: base_dir.into(),
        }
    }
}

/// A file in a repository, addressed relative to its base directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub content_length: u64,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = content_length;
        self
    }
}

/// A read request: the resource to fetch and, once filled, the stream over it.
#[derive(Default)]
pub struct InputData {
    resource: Resource,
    input_stream: Option<Box<dyn Read + Send>>,
}

impl InputData {
    #[must_use]
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            input_stream: None,
        }
    }

    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut Resource {
        &mut self.resource
    }

    pub fn set_input_stream(&mut self, stream: Box<dyn Read + Send>) {
        self.input_stream = Some(stream);
    }

    /// Hands the filled stream over to the caller.
    pub fn take_input_stream(&mut self) -> Option<Box<dyn Read + Send>> {
        self.input_stream.take()
    }
}

impl fmt::Debug for InputData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputData")
            .field("resource", &self.resource)
            .field("has_stream", &self.input_stream.is_some())
            .finish()
    }
}

/// A write request: the resource to store and, once filled, the stream to write it to.
#[derive(Debug, Default)]
pub struct OutputData {
    resource: Resource,
    output_stream: Option<PipeWriter>,
}

impl OutputData {
    #[must_use]
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            output_stream: None,
        }
    }

    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn set_output_stream(&mut self, stream: PipeWriter) {
        self.output_stream = Some(stream);
    }

    /// Hands the filled stream over to the caller.
    pub fn take_output_stream(&mut self) -> Option<PipeWriter> {
        self.output_stream.take()
    }
}

/// The stream-provider contract a host drives.
pub trait StreamProvider {
    /// Called when the host opens a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be established.
    fn open_connection(&mut self) -> BridgeResult<()>;

    /// Fills `input` with a stream over the requested resource and its size and time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::NotFound`] if the resource doesn't exist and
    /// [`crate::BridgeError::TransferFailure`] on transport errors.
    fn fill_input_data(&self, input: &mut InputData) -> BridgeResult<()>;

    /// Fills `output` with a stream the host writes the resource's bytes to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::TransferFailure`] if the upload cannot be started.
    fn fill_output_data(&self, output: &mut OutputData) -> BridgeResult<()>;

    /// Called when the host ends the session; blocks until started uploads finish.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::ConnectionFailure`] if an upload stream fails to close.
    fn close_connection(&mut self) -> BridgeResult<()>;
}
