//! Remote object write exposed as a blocking writer.
//!
//! Each call allocates a bounded [`pipe`], hands its reader to the storage client as the
//! body of an asynchronous upload, and registers the transfer with the session's
//! [`TransferRegistry`]. The caller gets the writer; the client's transfer worker pulls
//! from the other end as bytes arrive.

use crate::client::{ObjectClient, UploadRequest};
use crate::error::{BridgeError, BridgeResult};
use crate::key::RemoteObjectKey;
use crate::pipe::{PipeWriter, pipe};
use crate::registry::TransferRegistry;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Starts uploads and registers them with the session's [`TransferRegistry`].
pub struct UploadBridge {
    client: Arc<dyn ObjectClient>,
    registry: Arc<TransferRegistry>,
    pipe_buffer_size: usize,
}

impl UploadBridge {
    pub fn new(
        client: Arc<dyn ObjectClient>,
        registry: Arc<TransferRegistry>,
        pipe_buffer_size: usize,
    ) -> Self {
        Self {
            client,
            registry,
            pipe_buffer_size,
        }
    }

    /// Starts an upload of `declared_length` bytes to `key` and returns the writer
    /// feeding it.
    ///
    /// Writes block once the pipe is full until the transfer catches up. Closing or
    /// dropping the writer ends the data. Nothing is registered unless the upload was
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TransferFailure`] if the pipe cannot be allocated or the
    /// storage client refuses the upload.
    #[instrument(skip(self, key), fields(container = %key.container, key = %key.path))]
    pub fn open_for_write(
        &self,
        key: &RemoteObjectKey,
        declared_length: u64,
    ) -> BridgeResult<PipeWriter> {
        let RemoteObjectKey { container, path } = key;

        let (writer, reader) = pipe(self.pipe_buffer_size)
            .map_err(|e| BridgeError::transfer(container, path, e))?;

        let request = UploadRequest {
            container: container.clone(),
            key: path.clone(),
            body: Box::new(reader),
            content_length: declared_length,
        };
        let handle = self
            .client
            .submit_upload(request)
            .map_err(|e| BridgeError::transfer(container, path, e))?;

        let transfer = self.registry.add(handle, Box::new(writer.closer()));
        debug!(%transfer, "upload started");

        Ok(writer)
    }
}
