//! Test doubles for the transfer registry and helpers for session tests.
//!
//! - [`ScriptedHandle`] - a transfer handle returning a fixed [`WaitOutcome`]
//! - [`RecordingSink`] / [`FailingSink`] - upload sinks that count or fail closes
//! - [`Counter`] - shared call counter observed from the test side
//! - [`TempConfigFile`] - a JSON config written to a temporary file

use crate::client::{TransferHandle, TransferId, WaitOutcome};
use crate::registry::UploadSink;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

/// A call counter shared between a test double and the test.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Transfer handle whose wait returns a preset outcome, optionally after a delay.
#[derive(Debug)]
pub struct ScriptedHandle {
    id: TransferId,
    outcome: WaitOutcome,
    delay: Option<Duration>,
    waits: Counter,
}

impl ScriptedHandle {
    #[must_use]
    pub fn new(id: u64, outcome: WaitOutcome) -> Self {
        Self {
            id: TransferId(id),
            outcome,
            delay: None,
            waits: Counter::default(),
        }
    }

    /// Makes every wait block for `delay` before returning.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn completed(id: u64) -> Self {
        Self::new(id, WaitOutcome::Completed)
    }

    /// Counter of `wait_for_completion` calls.
    #[must_use]
    pub fn waits(&self) -> Counter {
        self.waits.clone()
    }
}

impl TransferHandle for ScriptedHandle {
    fn id(&self) -> TransferId {
        self.id
    }

    fn wait_for_completion(&self) -> WaitOutcome {
        self.waits.bump();
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.outcome.clone()
    }
}

/// Sink that counts how often it is closed.
#[derive(Debug, Default)]
pub struct RecordingSink {
    closes: Counter,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn closes(&self) -> Counter {
        self.closes.clone()
    }
}

impl UploadSink for RecordingSink {
    fn close(&mut self) -> io::Result<()> {
        self.closes.bump();
        Ok(())
    }
}

/// Sink whose close always fails.
#[derive(Debug, Default)]
pub struct FailingSink;

impl UploadSink for FailingSink {
    fn close(&mut self) -> io::Result<()> {
        Err(io::Error::other("close failed"))
    }
}

/// A configuration file that is deleted when dropped.
pub struct TempConfigFile {
    file: NamedTempFile,
}

impl TempConfigFile {
    /// Writes `json` to a fresh temporary `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn new(json: &str) -> io::Result<Self> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
