// src/metadata/index_entry.rs
use crate::error::{MefError, Result};
use crate::types::{Uutc, INDEX_ENTRY_BYTES, RED_NAN, UNIVERSAL_HEADER_BYTES};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Descriptor of one compressed block, as stored in a segment's index file
///
/// Record layout (little-endian, 56 bytes):
///
/// | Field                 | Offset | Size |
/// |-----------------------|--------|------|
/// | file_offset           | 0      | 8    |
/// | start_time            | 8      | 8    |
/// | start_sample          | 16     | 8    |
/// | number_of_samples     | 24     | 4    |
/// | block_bytes           | 28     | 4    |
/// | maximum_sample_value  | 32     | 4    |
/// | minimum_sample_value  | 36     | 4    |
/// | (protected)           | 40     | 4    |
/// | block flags           | 44     | 1    |
/// | (block protected)     | 45     | 3    |
/// | (block discretionary) | 48     | 8    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Absolute offset of the block header in the data file
    pub file_offset: u64,
    /// Absolute start time of the block's first sample
    pub start_time: Uutc,
    /// Start sample relative to the owning segment
    pub start_sample: u64,
    pub number_of_samples: u32,
    /// Total bytes of the block including its 304-byte header
    pub block_bytes: u32,
    pub maximum_sample_value: i32,
    pub minimum_sample_value: i32,
    /// Discontinuity bit as recorded by the writer
    pub discontinuity: bool,
}

impl IndexEntry {
    pub const SIZE: usize = INDEX_ENTRY_BYTES as usize;

    const FLAGS_OFFSET: usize = 44;
    const DISCONTINUITY_MASK: u8 = 0x01;

    pub fn new(
        file_offset: u64,
        start_time: Uutc,
        start_sample: u64,
        number_of_samples: u32,
        block_bytes: u32,
    ) -> Self {
        IndexEntry {
            file_offset,
            start_time,
            start_sample,
            number_of_samples,
            block_bytes,
            maximum_sample_value: RED_NAN,
            minimum_sample_value: RED_NAN,
            discontinuity: false,
        }
    }

    /// Segment-relative sample that follows this block
    pub fn end_sample(&self) -> u64 {
        self.start_sample + self.number_of_samples as u64
    }

    /// True when the index slot was never written (or was zeroed out)
    pub fn is_zeroed(&self) -> bool {
        self.block_bytes == 0
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        IndexEntry {
            file_offset: LittleEndian::read_i64(&bytes[0..8]) as u64,
            start_time: LittleEndian::read_i64(&bytes[8..16]),
            start_sample: LittleEndian::read_i64(&bytes[16..24]) as u64,
            number_of_samples: LittleEndian::read_u32(&bytes[24..28]),
            block_bytes: LittleEndian::read_u32(&bytes[28..32]),
            maximum_sample_value: LittleEndian::read_i32(&bytes[32..36]),
            minimum_sample_value: LittleEndian::read_i32(&bytes[36..40]),
            discontinuity: bytes[Self::FLAGS_OFFSET] & Self::DISCONTINUITY_MASK != 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        LittleEndian::write_i64(&mut bytes[0..8], self.file_offset as i64);
        LittleEndian::write_i64(&mut bytes[8..16], self.start_time);
        LittleEndian::write_i64(&mut bytes[16..24], self.start_sample as i64);
        LittleEndian::write_u32(&mut bytes[24..28], self.number_of_samples);
        LittleEndian::write_u32(&mut bytes[28..32], self.block_bytes);
        LittleEndian::write_i32(&mut bytes[32..36], self.maximum_sample_value);
        LittleEndian::write_i32(&mut bytes[36..40], self.minimum_sample_value);
        if self.discontinuity {
            bytes[Self::FLAGS_OFFSET] |= Self::DISCONTINUITY_MASK;
        }
        bytes
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; Self::SIZE];
        reader.read_exact(&mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Byte offset of index slot `slot` within an index file
    pub fn slot_offset(slot: usize) -> u64 {
        UNIVERSAL_HEADER_BYTES + slot as u64 * INDEX_ENTRY_BYTES
    }
}

/// Read every entry of an index file, skipping its universal header
pub fn read_index_file(path: impl AsRef<Path>) -> Result<Vec<IndexEntry>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    if file_len < UNIVERSAL_HEADER_BYTES {
        return Err(MefError::InvalidLayout(format!(
            "index file {} is shorter than its universal header ({} bytes)",
            path.display(),
            file_len
        )));
    }

    let body_len = file_len - UNIVERSAL_HEADER_BYTES;
    if body_len % INDEX_ENTRY_BYTES != 0 {
        return Err(MefError::InvalidLayout(format!(
            "index file {} body of {} bytes is not a multiple of {}",
            path.display(),
            body_len,
            INDEX_ENTRY_BYTES
        )));
    }

    let count = (body_len / INDEX_ENTRY_BYTES) as usize;
    let mut reader = BufReader::with_capacity(65536, file);
    reader.seek(SeekFrom::Start(UNIVERSAL_HEADER_BYTES))?;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(IndexEntry::read_from(&mut reader)?);
    }
    Ok(entries)
}

/// Overwrite index slot `slot` in place
pub fn write_index_entry<F: Write + Seek>(
    file: &mut F,
    slot: usize,
    entry: &IndexEntry,
) -> Result<()> {
    file.seek(SeekFrom::Start(IndexEntry::slot_offset(slot)))?;
    entry.write_to(file)?;
    file.flush()?;
    Ok(())
}

/// Read index slot `slot` without loading the whole file
pub fn read_index_entry<F: Read + Seek>(file: &mut F, slot: usize) -> Result<IndexEntry> {
    file.seek(SeekFrom::Start(IndexEntry::slot_offset(slot)))?;
    let mut bytes = [0u8; IndexEntry::SIZE];
    file.read_exact(&mut bytes)?;
    Ok(IndexEntry::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_entry() -> IndexEntry {
        IndexEntry {
            file_offset: 1024,
            start_time: 1_600_000_000_000_000,
            start_sample: 5000,
            number_of_samples: 5000,
            block_bytes: 4_304,
            maximum_sample_value: 200,
            minimum_sample_value: -200,
            discontinuity: true,
        }
    }

    #[test]
    fn test_record_layout_offsets() {
        let bytes = sample_entry().to_bytes();
        assert_eq!(LittleEndian::read_i64(&bytes[0..8]), 1024);
        assert_eq!(LittleEndian::read_i64(&bytes[8..16]), 1_600_000_000_000_000);
        assert_eq!(LittleEndian::read_i64(&bytes[16..24]), 5000);
        assert_eq!(LittleEndian::read_u32(&bytes[28..32]), 4_304);
        assert_eq!(bytes[44] & 0x01, 1);
        assert!(bytes[48..56].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_new_entry_carries_nan_extrema() {
        let entry = IndexEntry::new(1024, 0, 0, 10, 400);
        assert_eq!(entry.maximum_sample_value, RED_NAN);
        assert_eq!(entry.minimum_sample_value, RED_NAN);
        assert!(!entry.discontinuity);
        assert_eq!(entry.end_sample(), 10);
    }

    #[test]
    fn test_slot_write_lands_at_stride() {
        let len = UNIVERSAL_HEADER_BYTES + 3 * INDEX_ENTRY_BYTES;
        let mut file = Cursor::new(vec![0u8; len as usize]);
        write_index_entry(&mut file, 2, &sample_entry()).unwrap();

        let raw = file.get_ref();
        let start = IndexEntry::slot_offset(2) as usize;
        assert_eq!(start, 1024 + 112);
        assert!(raw[..start].iter().all(|&b| b == 0));

        assert_eq!(read_index_entry(&mut file, 2).unwrap(), sample_entry());
        assert!(read_index_entry(&mut file, 1).unwrap().is_zeroed());
    }
}
