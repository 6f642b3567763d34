//! File Store - byte-level mutation of a stack file.
//!
//! The [`FileStore`] handles all direct file operations:
//! - Creating the file and writing the header
//! - Validating and scanning an existing file on open
//! - Appending frames at the tail
//! - Reading and truncating the tail frame

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::common::config::{StackConfig, HEADER_SIZE};
use crate::common::{Error, Result};
use crate::storage::frame::{self, RawFrame};
use crate::storage::header::StackHeader;

/// What the open-time scan found in an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Recovered {
    /// Number of live records.
    pub len: usize,
    /// Bytes cut from a torn trailing frame (0 if none).
    pub repaired_bytes: u64,
}

/// Injection points for failing file operations in tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Faults {
    /// Write only this many bytes of the next frame, then fail.
    pub write_limit: Option<usize>,
    /// Fail every `set_len`.
    pub set_len: bool,
    /// Fail every `sync_data`.
    pub sync: bool,
}

/// Owns the backing file of one stack.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────┬──────────┐
/// │  Header  │ Record 1 │ Record 2 │   ...   │ Record N │
/// │  (16 B)  │ len|p|len│ len|p|len│         │ len|p|len│
/// └──────────┴──────────┴──────────┴─────────┴──────────┘
/// Offset:  0         16                              end
/// ```
///
/// `end` always equals `HEADER_SIZE + Σ frame sizes` and the file length.
///
/// # Thread Safety
/// `FileStore` is **single-threaded**. The `DiskStack` is responsible for
/// serializing access to the file store.
///
/// # Durability
/// With `sync_writes` set, every append and truncate is followed by
/// `fdatasync()`. The header is always synced when the file is created.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    path: PathBuf,
    /// Offset one past the last live frame.
    end: u64,
    sync_writes: bool,
    max_payload_len: u64,
    /// Set when a failed write could not be rolled back, or a truncate
    /// could not be synced.
    degraded: bool,
    #[cfg(test)]
    faults: Faults,
}

impl FileStore {
    /// Open a stack file, creating it if it does not exist.
    ///
    /// A missing or zero-length file gets a fresh header. An existing file
    /// has its header validated against `type_tag` and its records scanned
    /// forward to re-derive the element count.
    ///
    /// # Errors
    /// - `Error::OpenFailed` on filesystem errors
    /// - `Error::IncompatibleStore` on header mismatch
    /// - `Error::TruncatedFrame` / `Error::CorruptPayload` for a torn tail
    ///   when repair is disabled
    /// - `Error::CorruptPayload` when a frame before the last one has
    ///   disagreeing length markers
    pub fn initialize<P: AsRef<Path>>(
        path: P,
        type_tag: u32,
        config: &StackConfig,
    ) -> Result<(Self, Recovered)> {
        let path = path.as_ref().to_path_buf();
        let open_failed = |source| Error::OpenFailed {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(open_failed)?;

        let file_len = file.metadata().map_err(open_failed)?.len();

        let mut store = Self {
            file,
            path: path.clone(),
            end: HEADER_SIZE,
            sync_writes: config.sync_writes,
            max_payload_len: config.max_payload_len,
            degraded: false,
            #[cfg(test)]
            faults: Faults::default(),
        };

        if file_len == 0 {
            let header = StackHeader::new(type_tag).to_bytes();
            store.file.write_all(&header).map_err(open_failed)?;
            store.file.sync_all().map_err(open_failed)?;
            debug!(path = %path.display(), type_tag, "created stack file");
            return Ok((store, Recovered::default()));
        }

        if file_len < HEADER_SIZE {
            return Err(Error::IncompatibleStore(format!(
                "file is {} bytes, shorter than the {}-byte header",
                file_len, HEADER_SIZE
            )));
        }

        let mut bytes = [0u8; StackHeader::SIZE];
        store.file.read_exact(&mut bytes).map_err(open_failed)?;
        StackHeader::from_bytes(&bytes)?.validate(type_tag)?;

        let recovered = store.scan(file_len, config.repair_torn_tail)?;
        debug!(
            path = %path.display(),
            len = recovered.len,
            byte_size = store.end,
            "opened stack file"
        );
        Ok((store, recovered))
    }

    /// Walk every frame forward from the header, setting `end` to the last
    /// valid frame boundary.
    ///
    /// The last frame is torn if it runs past the end of the file, or if it
    /// ends exactly there with disagreeing markers (the file grew but the
    /// trailing bytes never landed). A torn frame is cut off when
    /// `repair_torn_tail` is set. Disagreeing markers anywhere else are
    /// corruption.
    fn scan(&mut self, file_len: u64, repair_torn_tail: bool) -> Result<Recovered> {
        let mut offset = HEADER_SIZE;
        let mut len = 0usize;

        while offset < file_len {
            let scanned =
                frame::unwrap_forward(&mut self.file, offset, file_len, self.max_payload_len);
            let torn = match scanned {
                Ok(markers) => match markers.check(offset) {
                    Ok(frame_size) => {
                        offset += frame_size;
                        len += 1;
                        continue;
                    }
                    Err(err) if offset + markers.frame_size() == file_len => err,
                    Err(err) => return Err(err),
                },
                Err(err @ Error::TruncatedFrame { .. }) => err,
                Err(err) => return Err(err),
            };

            if !repair_torn_tail {
                return Err(torn);
            }
            let repaired_bytes = file_len - offset;
            warn!(
                path = %self.path.display(),
                offset,
                repaired_bytes,
                error = %torn,
                "cutting torn trailing frame"
            );
            self.file.set_len(offset)?;
            self.file.sync_all()?;
            self.end = offset;
            return Ok(Recovered {
                len,
                repaired_bytes,
            });
        }

        self.end = offset;
        Ok(Recovered {
            len,
            repaired_bytes: 0,
        })
    }

    /// Write a frame at the end of the file.
    ///
    /// Either the whole frame lands or the file is rolled back to its prior
    /// length. If the rollback itself fails the store is marked degraded and
    /// refuses further work.
    ///
    /// # Errors
    /// - `Error::Degraded` if the store is already degraded
    /// - `Error::Io` if the write (or sync) failed
    pub fn append(&mut self, frame: &[u8]) -> Result<()> {
        if self.degraded {
            return Err(Error::Degraded);
        }

        let start = self.end;
        if let Err(err) = self.write_frame(start, frame) {
            warn!(path = %self.path.display(), offset = start, error = %err, "append failed, rolling back");
            if let Err(rollback) = self.set_len(start) {
                warn!(path = %self.path.display(), error = %rollback, "rollback failed, store degraded");
                self.degraded = true;
            }
            return Err(Error::Io(err));
        }

        self.end = start + frame.len() as u64;
        trace!(offset = start, frame_size = frame.len(), "appended frame");
        Ok(())
    }

    /// Read the last live frame without removing it.
    ///
    /// Returns `Ok(None)` when no records remain.
    pub fn read_tail(&mut self) -> Result<Option<RawFrame>> {
        if self.degraded {
            return Err(Error::Degraded);
        }
        if self.end == HEADER_SIZE {
            return Ok(None);
        }
        frame::unwrap_backward(&mut self.file, self.end, HEADER_SIZE, self.max_payload_len)
            .map(Some)
    }

    /// Shrink the file to `new_size`, reclaiming the bytes above it.
    ///
    /// Once the length has changed the call succeeds: the reclaimed bytes
    /// are gone and the caller must account for them. If the following
    /// sync fails the store is marked degraded and refuses further work.
    ///
    /// # Errors
    /// - `Error::Degraded` if the store is already degraded
    /// - `Error::InvalidTruncate` if `new_size` cuts into the header or
    ///   is past the current end
    /// - `Error::Io` if the truncate failed (file unchanged)
    pub fn truncate(&mut self, new_size: u64) -> Result<()> {
        if self.degraded {
            return Err(Error::Degraded);
        }
        if new_size < HEADER_SIZE || new_size > self.end {
            return Err(Error::InvalidTruncate {
                requested: new_size,
                current: self.end,
            });
        }

        self.set_len(new_size)?;
        self.end = new_size;

        if self.sync_writes {
            if let Err(err) = self.sync_data() {
                warn!(path = %self.path.display(), error = %err, "sync after truncate failed, store degraded");
                self.degraded = true;
            }
        }
        trace!(new_size, "truncated tail");
        Ok(())
    }

    /// Flush data and metadata to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the current byte size (header + live frames).
    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.end
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an earlier failure left the file in an unknown state.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn write_frame(&mut self, offset: u64, frame: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if let Some(limit) = self.faults.write_limit.take() {
            write_at(&mut self.file, offset, &frame[..limit.min(frame.len())])?;
            return Err(injected("write"));
        }

        write_at(&mut self.file, offset, frame)?;
        if self.sync_writes {
            self.sync_data()?;
        }
        Ok(())
    }

    fn set_len(&mut self, size: u64) -> io::Result<()> {
        #[cfg(test)]
        if self.faults.set_len {
            return Err(injected("set_len"));
        }

        self.file.set_len(size)
    }

    fn sync_data(&mut self) -> io::Result<()> {
        #[cfg(test)]
        if self.faults.sync {
            return Err(injected("sync"));
        }

        self.file.sync_data()
    }

    #[cfg(test)]
    pub(crate) fn inject(&mut self, faults: Faults) {
        self.faults = faults;
    }
}

fn write_at(file: &mut File, offset: u64, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)
}

#[cfg(test)]
fn injected(point: &str) -> io::Error {
    io::Error::other(format!("injected {} failure", point))
}
