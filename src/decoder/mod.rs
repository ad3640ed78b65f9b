//! Memory-mapped access to fixed-record trace logs.
//!
//! The capture side writes three append-only logs per traced process:
//! allocation events, operation durations, and metadata/thread records.
//! All three are sequences of fixed-size records in native byte order
//! with no framing; this module maps them and hands out raw record
//! slices by logical index.

pub mod records;

use crate::utils::config::{ALLOC_LOG_PATTERN, DURATION_LOG_PATTERN, METADATA_LOG_PATTERN};
use crate::utils::error::DecodeError;
use log::{debug, warn};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

// Re-export the typed record values
pub use records::{AllocRecord, DurationRecord, OpFlags, ThreadRecord, TraceMetadata, TrackingLevel};

/// A memory-mapped trace log sliced into fixed-size records
///
/// **Public** - entry point for all trace file access
pub struct MappedLog {
    // None for a zero-length log; mmap rejects empty files
    mmap: Option<Mmap>,
    record_size: usize,
    record_count: usize,
}

impl MappedLog {
    /// Map a trace log read-only and compute its record count
    ///
    /// The record count is `file_len / record_size` (floor); a trailing
    /// partial record is silently ignored.
    ///
    /// # Errors
    /// * `DecodeError::OpenFailed` - file missing or unreadable
    /// * `DecodeError::MapFailed` - mmap rejected the file
    /// * `DecodeError::LengthOverflow` - length does not fit `usize`
    pub fn open(path: impl AsRef<Path>, record_size: usize) -> Result<Self, DecodeError> {
        let path = path.as_ref();

        if record_size == 0 {
            return Err(DecodeError::ZeroRecordSize);
        }

        let file = File::open(path).map_err(|source| DecodeError::OpenFailed {
            path: path.display().to_string(),
            source,
        })?;

        let file_len = file
            .metadata()
            .map_err(|source| DecodeError::OpenFailed {
                path: path.display().to_string(),
                source,
            })?
            .len();

        let mapped_len: usize =
            file_len
                .try_into()
                .map_err(|_| DecodeError::LengthOverflow {
                    path: path.display().to_string(),
                    len: file_len,
                })?;

        // Safety: the log is append-only and the writer has exited by the
        // time analysis starts; we never outlive the mapping.
        let mmap = if mapped_len == 0 {
            None
        } else {
            Some(unsafe {
                Mmap::map(&file).map_err(|source| DecodeError::MapFailed {
                    path: path.display().to_string(),
                    source,
                })?
            })
        };

        let record_count = mapped_len / record_size;
        if mapped_len % record_size != 0 {
            debug!(
                "{}: length {} is not a multiple of {}, ignoring trailing {} byte(s)",
                path.display(),
                mapped_len,
                record_size,
                mapped_len % record_size
            );
        }

        debug!(
            "Mapped {} ({} records of {} bytes)",
            path.display(),
            record_count,
            record_size
        );

        Ok(Self {
            mmap,
            record_size,
            record_count,
        })
    }

    /// Number of complete records in the log
    pub fn len(&self) -> usize {
        self.record_count
    }

    /// True if the log holds no complete record
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// The whole mapped byte region (empty for a zero-length log)
    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Raw bytes of the record at logical index `i`
    ///
    /// # Panics
    /// Panics if `i >= len()`; callers iterate `0..len()`.
    pub fn record(&self, i: usize) -> &[u8] {
        assert!(i < self.record_count, "record index {} out of range", i);
        let mmap = self.mmap.as_ref().expect("non-empty log has a mapping");
        let start = i * self.record_size;
        &mmap[start..start + self.record_size]
    }
}

/// Decode the metadata log: one 16-byte metadata record followed by
/// 40-byte thread records.
///
/// Open the log with a record size of 1 so the raw byte region is
/// available. A missing metadata record yields the default (unknown
/// tracking level, zero header overhead); a trailing partial thread
/// record is ignored.
pub fn decode_meta_log(log: &MappedLog) -> (TraceMetadata, Vec<ThreadRecord>) {
    use crate::utils::config::{METADATA_RECORD_SIZE, THREAD_RECORD_SIZE};

    let bytes = log.bytes();
    if bytes.len() < METADATA_RECORD_SIZE {
        return (TraceMetadata::default(), Vec::new());
    }

    let metadata = TraceMetadata::decode(&bytes[..METADATA_RECORD_SIZE]);
    let threads = bytes[METADATA_RECORD_SIZE..]
        .chunks_exact(THREAD_RECORD_SIZE)
        .map(ThreadRecord::decode)
        .collect();

    (metadata, threads)
}

/// Paths of the three trace logs for one traced process
///
/// **Public** - used by the CLI to locate inputs
#[derive(Debug, Clone)]
pub struct TraceFiles {
    pub alloc_log: PathBuf,
    pub duration_log: PathBuf,
    pub metadata_log: PathBuf,
}

impl TraceFiles {
    /// Build log paths from a capture directory and a process id
    pub fn locate(dir: impl AsRef<Path>, pid: u32) -> Self {
        let dir = dir.as_ref();
        let pid_str = pid.to_string();
        Self {
            alloc_log: dir.join(ALLOC_LOG_PATTERN.replace("{pid}", &pid_str)),
            duration_log: dir.join(DURATION_LOG_PATTERN.replace("{pid}", &pid_str)),
            metadata_log: dir.join(METADATA_LOG_PATTERN.replace("{pid}", &pid_str)),
        }
    }

    /// Warn about any log that is missing on disk
    pub fn warn_missing(&self) {
        for path in [&self.alloc_log, &self.duration_log, &self.metadata_log] {
            if !path.exists() {
                warn!("Trace log not found: {}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::ALLOC_RECORD_SIZE;
    use std::io::Write;

    #[test]
    fn test_truncated_file_drops_partial_record() {
        // 3.5 records worth of bytes decode to exactly 3 records
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let bytes = vec![0u8; ALLOC_RECORD_SIZE * 3 + ALLOC_RECORD_SIZE / 2];
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let log = MappedLog::open(file.path(), ALLOC_RECORD_SIZE).unwrap();
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = MappedLog::open("/nonexistent/mtrace_1_alloc.log", ALLOC_RECORD_SIZE);
        assert!(matches!(err, Err(DecodeError::OpenFailed { .. })));
    }

    #[test]
    fn test_decode_meta_log_layout() {
        use crate::utils::config::{METADATA_RECORD_SIZE, THREAD_RECORD_SIZE};

        let mut bytes = vec![0u8; METADATA_RECORD_SIZE + 2 * THREAD_RECORD_SIZE];
        bytes[0..4].copy_from_slice(&2i32.to_ne_bytes()); // summary
        bytes[8..12].copy_from_slice(&24i32.to_ne_bytes());
        let t0 = METADATA_RECORD_SIZE;
        bytes[t0..t0 + 4].copy_from_slice(b"main");
        bytes[t0 + 32..t0 + 36].copy_from_slice(&1u32.to_ne_bytes());
        let t1 = t0 + THREAD_RECORD_SIZE;
        bytes[t1..t1 + 6].copy_from_slice(b"worker");
        bytes[t1 + 32..t1 + 36].copy_from_slice(&2u32.to_ne_bytes());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let log = MappedLog::open(file.path(), 1).unwrap();
        let (meta, threads) = decode_meta_log(&log);

        assert_eq!(meta.tracking_level, TrackingLevel::Summary);
        assert_eq!(meta.header_overhead, 24);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].name, "main");
        assert_eq!(threads[1].name, "worker");
        assert_eq!(threads[1].thread_id, 2);
    }

    #[test]
    fn test_locate_builds_expected_names() {
        let files = TraceFiles::locate("/tmp/capture", 4242);
        assert_eq!(
            files.alloc_log.to_str().unwrap(),
            "/tmp/capture/mtrace_4242_alloc.log"
        );
        assert_eq!(
            files.duration_log.to_str().unwrap(),
            "/tmp/capture/mtrace_4242_duration.log"
        );
        assert_eq!(
            files.metadata_log.to_str().unwrap(),
            "/tmp/capture/mtrace_4242_meta.log"
        );
    }
}
