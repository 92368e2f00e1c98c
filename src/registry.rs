//! Bookkeeping for in-flight uploads.
//!
//! Every upload started on a session leaves one entry here: the storage client's
//! [`TransferHandle`] paired with the [`UploadSink`] feeding it. At teardown,
//! [`TransferRegistry::drain_all`] waits for each transfer, closes its sink, and removes
//! the entry, so no upload is abandoned mid-flight when the session ends.

use crate::client::{TransferHandle, TransferId, WaitOutcome};
use crate::config::DrainPolicy;
use crate::error::{BridgeError, BridgeResult};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, warn};

/// Writable end of an upload as seen by the registry: something that can be closed.
pub trait UploadSink: Send {
    /// Signals end of data to the transfer.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while closing.
    fn close(&mut self) -> io::Result<()>;
}

struct Entry {
    handle: Box<dyn TransferHandle>,
    sink: Mutex<Box<dyn UploadSink>>,
}

/// Summary of a successful drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries waited on, closed and removed.
    pub drained: usize,
    /// Transfers that reported success.
    pub completed: usize,
    /// Transfers that reported an error of their own.
    pub failed: usize,
    /// Waits that were interrupted.
    pub interrupted: usize,
}

/// Concurrency-safe map from in-flight transfer to the sink feeding it.
#[derive(Default)]
pub struct TransferRegistry {
    entries: Mutex<HashMap<TransferId, Arc<Entry>>>,
    interrupted: AtomicBool,
    draining: Mutex<()>,
}

impl TransferRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransferId, Arc<Entry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an in-flight transfer together with the sink feeding it.
    pub fn add(&self, handle: Box<dyn TransferHandle>, sink: Box<dyn UploadSink>) -> TransferId {
        let id = handle.id();
        let entry = Arc::new(Entry {
            handle,
            sink: Mutex::new(sink),
        });
        let pending = {
            let mut entries = self.lock();
            entries.insert(id, entry);
            entries.len()
        };
        debug!(transfer = %id, pending, "registered upload");
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: TransferId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Returns whether a drain saw an interrupted wait since the last call, and clears it.
    pub fn take_interrupted(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }

    /// Waits for every registered transfer, closes its sink, and removes it.
    ///
    /// Entries are processed in transfer id order, one at a time, without holding the
    /// registry lock while blocked on a transfer. An interrupted or failed wait is logged
    /// and the entry is still closed and removed. Under [`DrainPolicy::BestEffort`] every
    /// entry present at the start is processed before the first close failure is
    /// reported; under [`DrainPolicy::StopAtFirstFailure`] the pass stops at it, leaving
    /// later entries registered.
    ///
    /// Passes are serialised: a drain started while another is running waits for it and
    /// then only sees what the first pass left registered.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ConnectionFailure`] if closing a sink fails.
    pub fn drain_all(&self, policy: DrainPolicy) -> BridgeResult<DrainReport> {
        let _pass = self.draining.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot: Vec<(TransferId, Arc<Entry>)> = self
            .lock()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        debug!(pending = snapshot.len(), ?policy, "draining uploads");

        let mut report = DrainReport::default();
        let mut first_failure: Option<io::Error> = None;
        let mut close_failures = 0usize;

        for (id, entry) in snapshot {
            match entry.handle.wait_for_completion() {
                WaitOutcome::Completed => report.completed += 1,
                WaitOutcome::Failed(reason) => {
                    warn!(transfer = %id, %reason, "upload finished with an error");
                    report.failed += 1;
                }
                WaitOutcome::Interrupted => {
                    error!(transfer = %id, "interrupted while waiting for upload to complete");
                    self.interrupted.store(true, Ordering::SeqCst);
                    report.interrupted += 1;
                }
            }

            let closed = entry
                .sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .close();
            self.lock().remove(&id);

            match closed {
                Ok(()) => report.drained += 1,
                Err(err) => {
                    error!(transfer = %id, error = %err, "failed to close upload stream");
                    close_failures += 1;
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                    if policy == DrainPolicy::StopAtFirstFailure {
                        break;
                    }
                }
            }
        }

        match first_failure {
            Some(source) => {
                if close_failures > 1 {
                    warn!(close_failures, "several upload streams failed to close");
                }
                Err(BridgeError::ConnectionFailure { source })
            }
            None => Ok(report),
        }
    }
}

impl std::fmt::Debug for TransferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRegistry")
            .field("pending", &self.len())
            .field("interrupted", &self.interrupted.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSink, RecordingSink, ScriptedHandle};
    use std::time::Duration;

    #[test]
    fn test_drain_empty_registry_is_noop() {
        let registry = TransferRegistry::new();
        let report = registry.drain_all(DrainPolicy::BestEffort).unwrap();
        assert_eq!(report, DrainReport::default());
        assert!(registry.is_empty());
        assert!(!registry.take_interrupted());
    }

    #[test]
    fn test_drain_closes_every_sink_once() {
        let registry = TransferRegistry::new();
        let mut counters = Vec::new();
        for i in 0..5 {
            let handle = ScriptedHandle::completed(i);
            let sink = RecordingSink::new();
            counters.push((handle.waits(), sink.closes()));
            registry.add(Box::new(handle), Box::new(sink));
        }
        assert_eq!(registry.len(), 5);

        let report = registry.drain_all(DrainPolicy::BestEffort).unwrap();

        assert_eq!(report.drained, 5);
        assert_eq!(report.completed, 5);
        assert!(registry.is_empty());
        for (waits, closes) in counters {
            assert_eq!(waits.get(), 1);
            assert_eq!(closes.get(), 1);
        }
    }

    #[test]
    fn test_interrupted_wait_still_closes_and_removes() {
        let registry = TransferRegistry::new();
        let handle = ScriptedHandle::new(7, WaitOutcome::Interrupted);
        let sink = RecordingSink::new();
        let (waits, closes) = (handle.waits(), sink.closes());
        registry.add(Box::new(handle), Box::new(sink));

        let report = registry.drain_all(DrainPolicy::BestEffort).unwrap();

        assert_eq!(report.interrupted, 1);
        assert_eq!(report.drained, 1);
        assert_eq!(waits.get(), 1);
        assert_eq!(closes.get(), 1);
        assert!(registry.is_empty());
        assert!(registry.take_interrupted());
        assert!(!registry.take_interrupted());
    }

    #[test]
    fn test_failed_transfer_still_closes_sink() {
        let registry = TransferRegistry::new();
        let sink = RecordingSink::new();
        let closes = sink.closes();
        registry.add(
            Box::new(ScriptedHandle::new(1, WaitOutcome::Failed("boom".into()))),
            Box::new(sink),
        );

        let report = registry.drain_all(DrainPolicy::BestEffort).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(closes.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_close_failure_best_effort_processes_everything() {
        let registry = TransferRegistry::new();
        let first = RecordingSink::new();
        let last = RecordingSink::new();
        let (first_closes, last_closes) = (first.closes(), last.closes());

        registry.add(Box::new(ScriptedHandle::completed(1)), Box::new(first));
        registry.add(Box::new(ScriptedHandle::completed(2)), Box::new(FailingSink));
        registry.add(Box::new(ScriptedHandle::completed(3)), Box::new(last));

        let err = registry.drain_all(DrainPolicy::BestEffort).unwrap_err();

        assert!(matches!(err, BridgeError::ConnectionFailure { .. }));
        assert_eq!(first_closes.get(), 1);
        assert_eq!(last_closes.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_close_failure_stop_at_first_leaves_rest() {
        let registry = TransferRegistry::new();
        let first = RecordingSink::new();
        let first_closes = first.closes();
        let last_handle = ScriptedHandle::completed(3);
        let last_waits = last_handle.waits();

        registry.add(Box::new(ScriptedHandle::completed(1)), Box::new(first));
        registry.add(Box::new(ScriptedHandle::completed(2)), Box::new(FailingSink));
        registry.add(Box::new(last_handle), Box::new(RecordingSink::new()));

        let err = registry
            .drain_all(DrainPolicy::StopAtFirstFailure)
            .unwrap_err();

        assert!(matches!(err, BridgeError::ConnectionFailure { .. }));
        assert_eq!(first_closes.get(), 1);
        assert!(!registry.contains(TransferId(1)));
        assert!(!registry.contains(TransferId(2)));
        assert!(registry.contains(TransferId(3)));
        assert_eq!(last_waits.get(), 0);
    }

    #[test]
    fn test_second_drain_does_not_revisit_entries() {
        let registry = TransferRegistry::new();
        let handle = ScriptedHandle::completed(1);
        let sink = RecordingSink::new();
        let (waits, closes) = (handle.waits(), sink.closes());
        registry.add(Box::new(handle), Box::new(sink));

        registry.drain_all(DrainPolicy::BestEffort).unwrap();
        let report = registry.drain_all(DrainPolicy::BestEffort).unwrap();

        assert_eq!(report.drained, 0);
        assert_eq!(waits.get(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_overlapping_drains_visit_each_entry_once() {
        let registry = TransferRegistry::new();
        let handle = ScriptedHandle::completed(1).with_delay(Duration::from_millis(200));
        let sink = RecordingSink::new();
        let (waits, closes) = (handle.waits(), sink.closes());
        registry.add(Box::new(handle), Box::new(sink));

        let drained: usize = std::thread::scope(|scope| {
            let passes: Vec<_> = (0..2)
                .map(|_| {
                    let registry = &registry;
                    scope.spawn(move || registry.drain_all(DrainPolicy::BestEffort))
                })
                .collect();
            passes
                .into_iter()
                .map(|p| p.join().expect("drain thread panicked").unwrap().drained)
                .sum()
        });

        assert_eq!(drained, 1);
        assert_eq!(waits.get(), 1);
        assert_eq!(closes.get(), 1);
        assert!(registry.is_empty());
    }
}
