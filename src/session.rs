//! Session lifecycle and the host-facing stream provider.

use crate::client::{ObjectClient, RemoteObjectMetadata};
use crate::config::BridgeConfig;
use crate::download::{DownloadBridge, DownloadStream};
use crate::error::BridgeResult;
use crate::host::{InputData, OutputData, Repository, StreamProvider};
use crate::key::RemoteObjectKey;
use crate::pipe::PipeWriter;
use crate::registry::{DrainReport, TransferRegistry};
use crate::upload::UploadBridge;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// One host session against a repository.
///
/// Downloads and uploads may be started concurrently from any number of threads.
/// [`Session::close`] is the single point where the session waits for its uploads.
pub struct Session {
    repository: Repository,
    config: BridgeConfig,
    registry: Arc<TransferRegistry>,
    downloads: DownloadBridge,
    uploads: UploadBridge,
}

impl Session {
    pub fn new(repository: Repository, client: Arc<dyn ObjectClient>) -> Self {
        Self::with_config(repository, client, BridgeConfig::default())
    }

    pub fn with_config(
        repository: Repository,
        client: Arc<dyn ObjectClient>,
        config: BridgeConfig,
    ) -> Self {
        let registry = Arc::new(TransferRegistry::new());
        Self {
            downloads: DownloadBridge::new(Arc::clone(&client), config.read_buffer_size),
            uploads: UploadBridge::new(client, Arc::clone(&registry), config.pipe_buffer_size),
            repository,
            config,
            registry,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &TransferRegistry {
        &self.registry
    }

    /// Uploads started on this session and not yet drained.
    #[must_use]
    pub fn pending_uploads(&self) -> usize {
        self.registry.len()
    }

    /// Returns whether a wait during [`Session::close`] was interrupted, and clears it.
    pub fn take_interrupted(&self) -> bool {
        self.registry.take_interrupted()
    }

    #[must_use]
    pub fn key_for(&self, resource_name: &str) -> RemoteObjectKey {
        RemoteObjectKey::resolve(&self.repository, resource_name)
    }

    /// Nothing to set up: the storage client arrives ready to use.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn open(&self) -> BridgeResult<()> {
        debug!(
            container = %self.repository.host,
            base_dir = %self.repository.base_dir,
            "session opened"
        );
        Ok(())
    }

    /// Opens `resource_name` for reading.
    ///
    /// # Errors
    ///
    /// See [`DownloadBridge::open_for_read`].
    pub fn open_for_read(
        &self,
        resource_name: &str,
    ) -> BridgeResult<(DownloadStream, RemoteObjectMetadata)> {
        self.downloads.open_for_read(&self.key_for(resource_name))
    }

    /// Opens `resource_name` for writing `declared_length` bytes.
    ///
    /// # Errors
    ///
    /// See [`UploadBridge::open_for_write`].
    pub fn open_for_write(
        &self,
        resource_name: &str,
        declared_length: u64,
    ) -> BridgeResult<PipeWriter> {
        self.uploads
            .open_for_write(&self.key_for(resource_name), declared_length)
    }

    /// Waits for every upload started on this session and closes its stream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::ConnectionFailure`] if an upload stream fails to
    /// close; the session should then be treated as not cleanly closed.
    #[instrument(skip(self), fields(container = %self.repository.host))]
    pub fn close(&self) -> BridgeResult<DrainReport> {
        let report = self.registry.drain_all(self.config.drain_policy)?;
        info!(
            drained = report.drained,
            failed = report.failed,
            interrupted = report.interrupted,
            "session closed"
        );
        Ok(report)
    }
}

impl StreamProvider for Session {
    fn open_connection(&mut self) -> BridgeResult<()> {
        self.open()
    }

    fn fill_input_data(&self, input: &mut InputData) -> BridgeResult<()> {
        let (stream, metadata) = self.open_for_read(&input.resource().name)?;
        input.set_input_stream(Box::new(stream));

        let resource = input.resource_mut();
        resource.content_length = metadata.content_length;
        resource.last_modified = metadata.last_modified.timestamp_millis();
        Ok(())
    }

    fn fill_output_data(&self, output: &mut OutputData) -> BridgeResult<()> {
        let resource = output.resource();
        let writer = self.open_for_write(&resource.name, resource.content_length)?;
        output.set_output_stream(writer);
        Ok(())
    }

    fn close_connection(&mut self) -> BridgeResult<()> {
        self.close().map(|_| ())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("repository", &self.repository)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
