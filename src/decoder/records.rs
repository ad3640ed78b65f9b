//! Typed views over raw fixed-size trace records.
//!
//! All integers are stored in the traced process's native byte order.
//! Field positions are fixed byte offsets; the decoders below are the
//! single source of truth for the on-disk layouts.

use crate::utils::config::{CALL_SITE_SLOTS, THREAD_NAME_LEN};

/// One decoded allocation record (88 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocRecord {
    pub timestamp: u64,
    pub thread_id: u64,
    /// Pointer produced by this operation (or freed, for a free)
    pub ptr: u64,
    /// For realloc: the pointer being superseded; zero otherwise
    pub prev_ptr: u64,
    /// Opaque call-site identifiers, unused by the analysis itself
    pub call_sites: [u64; CALL_SITE_SLOTS],
    pub requested: u64,
    pub actual: u64,
    /// Component tag assigned by the capture side
    pub tag: u64,
}

impl AllocRecord {
    /// Decode from one raw 88-byte record
    pub fn decode(raw: &[u8]) -> Self {
        Self {
            timestamp: read_u64(raw, 0),
            thread_id: read_u64(raw, 8),
            ptr: read_u64(raw, 16),
            prev_ptr: read_u64(raw, 24),
            call_sites: [
                read_u64(raw, 32),
                read_u64(raw, 40),
                read_u64(raw, 48),
                read_u64(raw, 56),
            ],
            requested: read_u64(raw, 64),
            actual: read_u64(raw, 72),
            tag: read_u64(raw, 80),
        }
    }
}

/// Operation-type bit flags carried by duration records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpFlags(pub u8);

impl OpFlags {
    pub const MALLOC: u8 = 1;
    pub const REALLOC: u8 = 2;
    pub const FREE: u8 = 4;

    pub fn is_malloc(self) -> bool {
        self.0 & Self::MALLOC != 0
    }

    pub fn is_realloc(self) -> bool {
        self.0 & Self::REALLOC != 0
    }

    pub fn is_free(self) -> bool {
        self.0 & Self::FREE != 0
    }
}

/// One decoded duration record (25 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRecord {
    pub duration: u64,
    pub requested: u64,
    pub actual: u64,
    pub op: OpFlags,
}

impl DurationRecord {
    /// Decode from one raw 25-byte record
    pub fn decode(raw: &[u8]) -> Self {
        Self {
            duration: read_u64(raw, 0),
            requested: read_u64(raw, 8),
            actual: read_u64(raw, 16),
            op: OpFlags(raw[24]),
        }
    }
}

/// One decoded thread record (40 bytes on disk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub name: String,
    pub thread_id: u64,
}

impl ThreadRecord {
    /// Decode from one raw 40-byte record
    ///
    /// The name occupies a fixed 32-byte buffer; the trailing run of
    /// zero bytes is trimmed off and the rest decoded lossily as UTF-8.
    pub fn decode(raw: &[u8]) -> Self {
        let name_buf = &raw[..THREAD_NAME_LEN];
        let name_len = name_buf
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        let name = String::from_utf8_lossy(&name_buf[..name_len]).into_owned();

        Self {
            name,
            thread_id: u64::from(read_u32(raw, THREAD_NAME_LEN)),
        }
    }
}

/// Trace tracking level recorded by the capture side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingLevel {
    #[default]
    Unknown,
    Off,
    Summary,
    Detail,
}

impl TrackingLevel {
    fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Off,
            2 => Self::Summary,
            3 => Self::Detail,
            _ => Self::Unknown,
        }
    }
}

/// Decoded trace metadata record (16 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceMetadata {
    pub tracking_level: TrackingLevel,
    /// Bytes the tracer prepends to every allocation it instruments
    pub header_overhead: i32,
}

impl TraceMetadata {
    /// Decode from one raw 16-byte record
    pub fn decode(raw: &[u8]) -> Self {
        Self {
            tracking_level: TrackingLevel::from_raw(read_i32(raw, 0)),
            header_overhead: read_i32(raw, 8),
        }
    }
}

fn read_u64(raw: &[u8], offset: usize) -> u64 {
    let bytes: [u8; 8] = raw[offset..offset + 8]
        .try_into()
        .expect("fixed-size slice");
    u64::from_ne_bytes(bytes)
}

fn read_u32(raw: &[u8], offset: usize) -> u32 {
    let bytes: [u8; 4] = raw[offset..offset + 4]
        .try_into()
        .expect("fixed-size slice");
    u32::from_ne_bytes(bytes)
}

fn read_i32(raw: &[u8], offset: usize) -> i32 {
    read_u32(raw, offset) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::{ALLOC_RECORD_SIZE, THREAD_RECORD_SIZE};

    fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
        buf[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
    }

    #[test]
    fn test_alloc_record_field_offsets() {
        let mut raw = vec![0u8; ALLOC_RECORD_SIZE];
        put_u64(&mut raw, 0, 1111);
        put_u64(&mut raw, 8, 7);
        put_u64(&mut raw, 16, 0xdead_beef);
        put_u64(&mut raw, 24, 0x1000);
        put_u64(&mut raw, 32, 0xa);
        put_u64(&mut raw, 56, 0xd);
        put_u64(&mut raw, 64, 128);
        put_u64(&mut raw, 72, 144);
        put_u64(&mut raw, 80, 3);

        let rec = AllocRecord::decode(&raw);
        assert_eq!(rec.timestamp, 1111);
        assert_eq!(rec.thread_id, 7);
        assert_eq!(rec.ptr, 0xdead_beef);
        assert_eq!(rec.prev_ptr, 0x1000);
        assert_eq!(rec.call_sites[0], 0xa);
        assert_eq!(rec.call_sites[3], 0xd);
        assert_eq!(rec.requested, 128);
        assert_eq!(rec.actual, 144);
        assert_eq!(rec.tag, 3);
    }

    #[test]
    fn test_thread_record_name_trimming() {
        let mut raw = vec![0u8; THREAD_RECORD_SIZE];
        raw[..4].copy_from_slice(b"main");
        raw[32..36].copy_from_slice(&42u32.to_ne_bytes());

        let rec = ThreadRecord::decode(&raw);
        assert_eq!(rec.name, "main");
        assert_eq!(rec.thread_id, 42);
    }

    #[test]
    fn test_thread_record_full_name_buffer() {
        let mut raw = vec![0u8; THREAD_RECORD_SIZE];
        raw[..32].copy_from_slice(&[b'x'; 32]);
        let rec = ThreadRecord::decode(&raw);
        assert_eq!(rec.name.len(), 32);
    }

    #[test]
    fn test_duration_record_op_flags() {
        let mut raw = vec![0u8; 25];
        put_u64(&mut raw, 0, 900);
        put_u64(&mut raw, 8, 64);
        put_u64(&mut raw, 16, 80);
        raw[24] = OpFlags::REALLOC;

        let rec = DurationRecord::decode(&raw);
        assert_eq!(rec.duration, 900);
        assert!(rec.op.is_realloc());
        assert!(!rec.op.is_malloc());
        assert!(!rec.op.is_free());
    }

    #[test]
    fn test_metadata_tracking_levels() {
        let mut raw = vec![0u8; 16];
        raw[0..4].copy_from_slice(&3i32.to_ne_bytes());
        raw[8..12].copy_from_slice(&16i32.to_ne_bytes());

        let meta = TraceMetadata::decode(&raw);
        assert_eq!(meta.tracking_level, TrackingLevel::Detail);
        assert_eq!(meta.header_overhead, 16);
    }
}
