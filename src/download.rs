//! Remote object fetch exposed as a buffered reader.

use crate::client::{ObjectClient, RemoteObjectMetadata};
use crate::error::{BridgeError, BridgeResult};
use crate::key::RemoteObjectKey;
use std::io::{BufReader, Read};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Buffered stream over a downloaded object's content.
pub type DownloadStream = BufReader<Box<dyn Read + Send>>;

/// Opens remote objects for reading through an [`ObjectClient`].
pub struct DownloadBridge {
    client: Arc<dyn ObjectClient>,
    read_buffer_size: usize,
}

impl DownloadBridge {
    pub fn new(client: Arc<dyn ObjectClient>, read_buffer_size: usize) -> Self {
        Self {
            client,
            read_buffer_size,
        }
    }

    /// Opens the object at `key` for reading.
    ///
    /// The existence check runs first; a missing object never leads to a fetch. The
    /// returned stream belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] if the object does not exist and
    /// [`BridgeError::TransferFailure`] if the check or the fetch fails in transport.
    #[instrument(skip(self, key), fields(container = %key.container, key = %key.path))]
    pub fn open_for_read(
        &self,
        key: &RemoteObjectKey,
    ) -> BridgeResult<(DownloadStream, RemoteObjectMetadata)> {
        let RemoteObjectKey { container, path } = key;

        let exists = self
            .client
            .object_exists(container, path)
            .map_err(|e| BridgeError::transfer(container, path, e))?;
        if !exists {
            return Err(not_found(key));
        }

        let object = self.client.get_object(container, path).map_err(|e| {
            if e.is_not_found() {
                not_found(key)
            } else {
                BridgeError::transfer(container, path, e)
            }
        })?;

        debug!(
            content_length = object.metadata.content_length,
            last_modified = %object.metadata.last_modified,
            "opened object for read"
        );

        let stream = BufReader::with_capacity(self.read_buffer_size, object.content);
        Ok((stream, object.metadata))
    }
}

fn not_found(key: &RemoteObjectKey) -> BridgeError {
    BridgeError::NotFound {
        container: key.container.clone(),
        key: key.path.clone(),
    }
}
