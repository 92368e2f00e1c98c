//! Bounded in-process byte pipe.
//!
//! [`pipe`] returns a connected writer/reader pair sharing a fixed-size ring buffer.
//! Writes block while the buffer is full and reads block while it is empty, so a fast
//! producer is held back by a slow consumer instead of growing memory. Both ends may be
//! driven from different threads.
//!
//! End of data is signalled by closing the writer, either explicitly with
//! [`PipeWriter::close`], through a [`PipeCloser`] obtained from it, or by dropping it.
//! Dropping the reader makes further writes fail with [`io::ErrorKind::BrokenPipe`].

use crate::registry::UploadSink;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Buffer size used for upload pipes when nothing else is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

struct State {
    buf: VecDeque<u8>,
    capacity: usize,
    writer_closed: bool,
    reader_closed: bool,
}

struct Shared {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
}

impl Shared {
    // Every critical section leaves `State` consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_writer(&self) {
        let mut state = self.lock();
        if !state.writer_closed {
            state.writer_closed = true;
            self.readable.notify_all();
        }
    }
}

/// Creates a bounded pipe holding at most `capacity` unread bytes.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] for a zero capacity and
/// [`io::ErrorKind::OutOfMemory`] if the buffer cannot be allocated.
pub fn pipe(capacity: usize) -> io::Result<(PipeWriter, PipeReader)> {
    if capacity == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "pipe capacity must be greater than zero",
        ));
    }

    let mut buf = VecDeque::new();
    buf.try_reserve_exact(capacity)
        .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;

    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            buf,
            capacity,
            writer_closed: false,
            reader_closed: false,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
    });

    Ok((
        PipeWriter {
            shared: Arc::clone(&shared),
        },
        PipeReader { shared },
    ))
}

/// Writable end of a [`pipe`]. Closes the pipe when dropped.
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Signals end of data to the reader. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches other closable sinks.
    pub fn close(&self) -> io::Result<()> {
        self.shared.close_writer();
        Ok(())
    }

    /// Returns a handle that can close this writer from elsewhere.
    #[must_use]
    pub fn closer(&self) -> PipeCloser {
        PipeCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().writer_closed
    }

    /// Number of bytes written but not yet read.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.shared.lock().buf.len()
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock();
        loop {
            if state.writer_closed {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
            }
            if state.reader_closed {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "read end dead"));
            }
            if state.buf.len() < state.capacity {
                break;
            }
            state = self
                .shared
                .writable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let n = (state.capacity - state.buf.len()).min(data.len());
        state.buf.extend(&data[..n]);
        self.shared.readable.notify_all();
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.shared.close_writer();
    }
}

impl fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("PipeWriter")
            .field("capacity", &state.capacity)
            .field("buffered", &state.buf.len())
            .field("closed", &state.writer_closed)
            .finish()
    }
}

/// Close-only handle on a [`PipeWriter`].
///
/// Held by the transfer registry so the writable end can be closed at session teardown
/// while the caller keeps the writer itself.
pub struct PipeCloser {
    shared: Arc<Shared>,
}

impl UploadSink for PipeCloser {
    fn close(&mut self) -> io::Result<()> {
        self.shared.close_writer();
        Ok(())
    }
}

impl fmt::Debug for PipeCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeCloser").finish_non_exhaustive()
    }
}

/// Readable end of a [`pipe`].
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock();
        while state.buf.is_empty() {
            if state.writer_closed {
                return Ok(0);
            }
            state = self
                .shared
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let n = state.buf.len().min(out.len());
        for (dst, byte) in out.iter_mut().zip(state.buf.drain(..n)) {
            *dst = byte;
        }
        self.shared.writable.notify_all();
        Ok(n)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.reader_closed = true;
        self.shared.writable.notify_all();
    }
}

impl fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeReader").finish_non_exhaustive()
    }
}
