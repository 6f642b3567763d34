//! Disk Stack - the public LIFO handle.
//!
//! The [`DiskStack`] provides:
//! - Typed push/pop against a single backing file
//! - Exact element count and byte size, re-derived on reopen
//! - Linearizable access from many threads through one lock
//! - An optional blocking pop with timeout

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::codec::{BincodeCodec, ValueCodec};
use crate::common::config::StackConfig;
use crate::common::{Error, Result};
use crate::stack::stats::{StackStats, StatsSnapshot};
use crate::storage::frame;
use crate::storage::FileStore;

/// State guarded by the stack lock.
struct Inner {
    /// `None` once the handle is closed.
    store: Option<FileStore>,
    /// Live element count.
    len: usize,
    /// Header plus live frames; mirrors the file length.
    byte_size: u64,
}

impl Inner {
    fn store(&mut self) -> Result<&mut FileStore> {
        self.store.as_mut().ok_or(Error::HandleClosed)
    }
}

/// A persistent LIFO stack of `T` values backed by one file.
///
/// # Architecture
/// ```text
/// ┌────────────────────────────────────────────────────────┐
/// │                      DiskStack<T, C>                   │
/// │  push: codec.encode → frame::wrap ─┐                   │
/// │                                    ▼                   │
/// │  ┌──────────────── Mutex<Inner> ──────────────────┐    │
/// │  │  FileStore (append / read_tail / truncate)     │    │
/// │  │  len, byte_size                                │    │
/// │  └────────────────────────────────────────────────┘    │
/// │                                    │                   │
/// │  pop:  codec.decode ◀── read_tail ─┘ → truncate        │
/// └────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `inner`: `Mutex` - serializes every push, pop, and observer
/// - `available`: `Condvar` - wakes [`pop_wait`](Self::pop_wait) callers
/// - `stats`: No lock - all atomic counters
///
/// Encoding and framing happen before the lock is taken; decoding happens
/// under it so a record is only truncated once it has decoded cleanly.
///
/// # Usage
/// ```no_run
/// use diskstack::DiskStack;
///
/// let stack: DiskStack<u64> = DiskStack::open("work.stack")?;
/// stack.push(&42)?;
/// assert_eq!(stack.pop()?, Some(42));
/// assert_eq!(stack.pop()?, None); // empty is not an error
/// stack.close()?;
/// # Ok::<(), diskstack::Error>(())
/// ```
pub struct DiskStack<T, C = BincodeCodec<T>> {
    path: PathBuf,
    codec: C,
    max_payload_len: u64,
    inner: Mutex<Inner>,
    available: Condvar,
    stats: StackStats,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> DiskStack<T, BincodeCodec<T>>
where
    T: Serialize + DeserializeOwned,
{
    /// Open (or create) a stack at `path` with default settings.
    ///
    /// # Errors
    /// - `Error::OpenFailed` on filesystem errors
    /// - `Error::IncompatibleStore` if the file holds another format or type
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StackConfig::default())
    }

    /// Open (or create) a stack at `path` with explicit settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StackConfig) -> Result<Self> {
        Self::open_with_codec(path, BincodeCodec::new(), config)
    }
}

impl<T, C> DiskStack<T, C>
where
    C: ValueCodec<T>,
{
    /// Open (or create) a stack using a specific codec.
    ///
    /// An existing file is validated against `codec.type_tag()` and scanned
    /// to restore the element count and byte size.
    pub fn open_with_codec<P: AsRef<Path>>(path: P, codec: C, config: StackConfig) -> Result<Self> {
        config.validate()?;

        let (store, recovered) = FileStore::initialize(path, codec.type_tag(), &config)?;
        let path = store.path().to_path_buf();
        let byte_size = store.byte_size();

        debug!(
            path = %path.display(),
            codec = codec.codec_id(),
            len = recovered.len,
            byte_size,
            "stack opened"
        );

        Ok(Self {
            path,
            codec,
            max_payload_len: config.max_payload_len,
            inner: Mutex::new(Inner {
                store: Some(store),
                len: recovered.len,
                byte_size,
            }),
            available: Condvar::new(),
            stats: StackStats::new(),
            _marker: PhantomData,
        })
    }

    // ========================================================================
    // Public API: Push and pop
    // ========================================================================

    /// Push a value onto the stack.
    ///
    /// Counters advance only after the frame is fully on disk.
    ///
    /// # Errors
    /// - `Error::Encode` if the value cannot be encoded or is too large
    /// - `Error::Io` if the append failed (the file is rolled back)
    /// - `Error::Degraded` / `Error::HandleClosed`
    pub fn push(&self, value: &T) -> Result<()> {
        let payload = self.codec.encode(value)?;
        if payload.len() as u64 > self.max_payload_len {
            return Err(Error::Encode(format!(
                "payload of {} bytes exceeds limit of {}",
                payload.len(),
                self.max_payload_len
            )));
        }
        let frame = frame::wrap(&payload);
        let frame_size = frame.len() as u64;

        let mut inner = self.inner.lock();
        inner.store()?.append(&frame)?;
        inner.len += 1;
        inner.byte_size += frame_size;
        debug_assert_eq!(Some(inner.byte_size), inner.store.as_ref().map(|s| s.byte_size()));
        trace!(len = inner.len, frame_size, "push");
        drop(inner);

        self.stats.record_push(frame_size);
        self.available.notify_one();
        Ok(())
    }

    /// Pop the most recently pushed value.
    ///
    /// Returns `Ok(None)` immediately when the stack is empty; callers that
    /// want to wait poll with their own backoff or use
    /// [`pop_wait`](Self::pop_wait).
    ///
    /// # Errors
    /// - `Error::CorruptPayload` / `Error::TruncatedFrame` if the tail does
    ///   not decode; the record stays in place and counters are unchanged
    /// - `Error::Io`, `Error::Degraded`, `Error::HandleClosed`
    pub fn pop(&self) -> Result<Option<T>> {
        let mut inner = self.inner.lock();
        self.pop_locked(&mut inner)
    }

    /// Pop into an existing slot, returning whether a value was found.
    ///
    /// `out` is left untouched when the stack is empty or on error.
    pub fn pop_into(&self, out: &mut T) -> Result<bool> {
        match self.pop()? {
            Some(value) => {
                *out = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pop, waiting up to `timeout` for a value to be pushed.
    ///
    /// Returns `Ok(None)` if the stack is still empty at the deadline.
    ///
    /// # Errors
    /// Same as [`pop`](Self::pop); `Error::HandleClosed` if the handle is
    /// closed while waiting.
    pub fn pop_wait(&self, timeout: Duration) -> Result<Option<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.inner.lock();

        loop {
            if inner.store.is_none() || inner.len > 0 {
                return self.pop_locked(&mut inner);
            }
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut inner, deadline).timed_out() {
                        return self.pop_locked(&mut inner);
                    }
                }
                None => self.available.wait(&mut inner),
            }
        }
    }

    fn pop_locked(&self, inner: &mut Inner) -> Result<Option<T>> {
        let len = inner.len;
        let store = inner.store()?;

        if len == 0 {
            self.stats.record_empty_pop();
            return Ok(None);
        }

        let tail = store.read_tail()?.ok_or_else(|| {
            Error::CorruptPayload(format!("{} records counted but none on disk", len))
        })?;
        let value = self.codec.decode(&tail.payload)?;

        // Once truncate returns Ok the frame is gone from the file, so the
        // counters must follow even if the store went degraded on sync.
        let new_size = store.byte_size() - tail.frame_size;
        store.truncate(new_size)?;

        inner.len -= 1;
        inner.byte_size = new_size;
        trace!(len = inner.len, frame_size = tail.frame_size, "pop");

        self.stats.record_pop(tail.frame_size);
        Ok(Some(value))
    }
}

impl<T, C> DiskStack<T, C> {
    // ========================================================================
    // Public API: Observers and lifecycle
    // ========================================================================

    /// Current byte size: header plus every live frame.
    ///
    /// Equals the file length whenever no operation is in flight.
    pub fn size(&self) -> Result<u64> {
        let inner = self.inner.lock();
        if inner.store.is_none() {
            return Err(Error::HandleClosed);
        }
        Ok(inner.byte_size)
    }

    /// Number of live elements.
    pub fn len(&self) -> Result<usize> {
        let inner = self.inner.lock();
        if inner.store.is_none() {
            return Err(Error::HandleClosed);
        }
        Ok(inner.len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether an earlier I/O failure left the file in an unknown state.
    ///
    /// A degraded handle fails pushes and non-empty pops with
    /// `Error::Degraded`; close it and reopen the path to re-scan the file.
    pub fn is_degraded(&self) -> Result<bool> {
        Ok(self.inner.lock().store()?.is_degraded())
    }

    /// Flush file data and metadata to disk.
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().store()?.sync()
    }

    /// Sync and release the backing file.
    ///
    /// Every later call on this handle, including a second `close`, fails
    /// with `Error::HandleClosed`. Threads blocked in
    /// [`pop_wait`](Self::pop_wait) are woken and get the same error.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let mut store = inner.store.take().ok_or(Error::HandleClosed)?;
        let result = store.sync();
        drop(store);

        debug!(path = %self.path.display(), len = inner.len, byte_size = inner.byte_size, "stack closed");
        drop(inner);

        self.available.notify_all();
        result
    }

    /// Path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a snapshot of operation statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero the operation counters. Element count and size are unaffected.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl<T, C> Drop for DiskStack<T, C> {
    fn drop(&mut self) {
        if let Some(mut store) = self.inner.get_mut().store.take() {
            if let Err(err) = store.sync() {
                warn!(path = %self.path.display(), error = %err, "sync on drop failed");
            }
        }
    }
}
