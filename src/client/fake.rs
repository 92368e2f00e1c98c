//! Fake storage client for testing.
//!
//! [`FakeObjectClient`] keeps objects in memory and runs every accepted upload on its
//! own worker thread that reads the request body to the end, the way a real transfer
//! manager drains its input stream. Faults can be scripted per operation.

use crate::client::traits::{
    ClientError, ClientResult, ErrorKind, ObjectClient, RemoteObject, RemoteObjectMetadata,
    TransferHandle, TransferId, UploadRequest, WaitOutcome,
};
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

type BucketStorage = Arc<Mutex<HashMap<String, HashMap<String, StoredObject>>>>;

/// An upload request as the fake client received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub id: TransferId,
    pub container: String,
    pub key: String,
    pub content_length: u64,
}

#[derive(Debug, Default)]
struct Faults {
    exists: Option<ErrorKind>,
    get: Option<ErrorKind>,
    submit: Option<ErrorKind>,
    interrupt_waits: bool,
    fail_transfers: bool,
}

#[derive(Clone, Default)]
pub struct FakeObjectClient {
    storage: BucketStorage,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    faults: Arc<Mutex<Faults>>,
    fetches: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl FakeObjectClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object stamped with the current time.
    pub fn put_object(&self, container: &str, key: &str, data: &[u8]) {
        self.put_object_at(container, key, data, Utc::now().trunc_subsecs(3));
    }

    /// Stores an object with an explicit modification time.
    pub fn put_object_at(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        last_modified: DateTime<Utc>,
    ) {
        store(&self.storage, container, key, data.to_vec(), last_modified);
    }

    /// Returns a stored object's bytes.
    #[must_use]
    pub fn object_data(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .get(container)
            .and_then(|b| b.get(key))
            .map(|o| o.data.clone())
    }

    /// Every upload accepted so far, in submission order.
    #[must_use]
    pub fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().expect("uploads mutex poisoned").clone()
    }

    /// Number of `get_object` calls made so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_exists_with(&self, kind: ErrorKind) {
        self.faults.lock().expect("faults mutex poisoned").exists = Some(kind);
    }

    pub fn fail_get_with(&self, kind: ErrorKind) {
        self.faults.lock().expect("faults mutex poisoned").get = Some(kind);
    }

    pub fn fail_submit_with(&self, kind: ErrorKind) {
        self.faults.lock().expect("faults mutex poisoned").submit = Some(kind);
    }

    /// Makes every wait on a transfer return [`WaitOutcome::Interrupted`] right away.
    pub fn interrupt_waits(&self, enabled: bool) {
        self.faults.lock().expect("faults mutex poisoned").interrupt_waits = enabled;
    }

    /// Makes transfers consume their body and then report failure instead of storing it.
    pub fn fail_transfers(&self, enabled: bool) {
        self.faults.lock().expect("faults mutex poisoned").fail_transfers = enabled;
    }

    fn fault(&self, pick: impl Fn(&Faults) -> Option<ErrorKind>, what: &str) -> ClientResult<()> {
        let faults = self.faults.lock().expect("faults mutex poisoned");
        match pick(&faults) {
            Some(kind) => Err(ClientError::new(kind, format!("injected {what} failure"))),
            None => Ok(()),
        }
    }
}

fn store(
    storage: &BucketStorage,
    container: &str,
    key: &str,
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
) {
    storage
        .lock()
        .expect("storage mutex poisoned")
        .entry(container.to_string())
        .or_default()
        .insert(key.to_string(), StoredObject { data, last_modified });
}

impl ObjectClient for FakeObjectClient {
    fn object_exists(&self, container: &str, key: &str) -> ClientResult<bool> {
        self.fault(|f| f.exists, "exists")?;
        let storage = self.storage.lock().expect("storage mutex poisoned");
        Ok(storage.get(container).is_some_and(|b| b.contains_key(key)))
    }

    fn get_object(&self, container: &str, key: &str) -> ClientResult<RemoteObject> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fault(|f| f.get, "get")?;
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(container)
            .and_then(|b| b.get(key))
            .map(|object| RemoteObject {
                content: Box::new(Cursor::new(object.data.clone())),
                metadata: RemoteObjectMetadata {
                    content_length: object.data.len() as u64,
                    last_modified: object.last_modified,
                },
            })
            .ok_or_else(|| {
                ClientError::new(
                    ErrorKind::NotFound,
                    format!("Object {container}/{key} not found"),
                )
            })
    }

    fn submit_upload(&self, request: UploadRequest) -> ClientResult<Box<dyn TransferHandle>> {
        self.fault(|f| f.submit, "submit")?;

        let id = TransferId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let fail = self.faults.lock().expect("faults mutex poisoned").fail_transfers;
        let completion = Arc::new(Completion::default());

        let UploadRequest {
            container,
            key,
            mut body,
            content_length,
        } = request;
        let recorded = RecordedUpload {
            id,
            container: container.clone(),
            key: key.clone(),
            content_length,
        };

        let storage = Arc::clone(&self.storage);
        let done = Arc::clone(&completion);
        thread::Builder::new()
            .name(format!("fake-upload-{}", id.0))
            .spawn(move || {
                let mut data = Vec::new();
                let outcome = match body.read_to_end(&mut data) {
                    Err(e) => WaitOutcome::Failed(format!("reading upload body: {e}")),
                    Ok(_) if fail => WaitOutcome::Failed("injected transfer failure".into()),
                    Ok(n) if n as u64 != content_length => WaitOutcome::Failed(format!(
                        "declared {content_length} bytes, received {n}"
                    )),
                    Ok(_) => {
                        store(&storage, &container, &key, data, Utc::now().trunc_subsecs(3));
                        WaitOutcome::Completed
                    }
                };
                done.finish(outcome);
            })
            .map_err(|e| {
                ClientError::new(ErrorKind::InternalError, "cannot start upload worker")
                    .with_source(e.to_string())
            })?;

        self.uploads
            .lock()
            .expect("uploads mutex poisoned")
            .push(recorded);

        Ok(Box::new(FakeTransferHandle {
            id,
            completion,
            faults: Arc::clone(&self.faults),
        }))
    }
}

#[derive(Default)]
struct Completion {
    outcome: Mutex<Option<WaitOutcome>>,
    finished: Condvar,
}

impl Completion {
    fn finish(&self, outcome: WaitOutcome) {
        *self.outcome.lock().expect("completion mutex poisoned") = Some(outcome);
        self.finished.notify_all();
    }

    fn wait(&self) -> WaitOutcome {
        let mut slot = self.outcome.lock().expect("completion mutex poisoned");
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .finished
                .wait(slot)
                .expect("completion mutex poisoned");
        }
    }
}

struct FakeTransferHandle {
    id: TransferId,
    completion: Arc<Completion>,
    faults: Arc<Mutex<Faults>>,
}

impl TransferHandle for FakeTransferHandle {
    fn id(&self) -> TransferId {
        self.id
    }

    fn wait_for_completion(&self) -> WaitOutcome {
        let interrupted = self
            .faults
            .lock()
            .expect("faults mutex poisoned")
            .interrupt_waits;
        if interrupted {
            return WaitOutcome::Interrupted;
        }
        self.completion.wait()
    }
}
