// src/writer/segment_writer.rs
use crate::error::{MefError, Result};
use crate::metadata::{session_path, IndexEntry};
use crate::segment::{BlockHeader, Segment};
use crate::types::{ChannelKind, Uutc, BLOCK_HEADER_BYTES, UNIVERSAL_HEADER_BYTES};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes a segment's data and index files block by block
///
/// Payloads are opaque: whatever the block codec produced is written
/// verbatim after a 304-byte block header, and a matching 56-byte record is
/// appended to the index file. Start samples are segment-relative and
/// cumulative.
pub struct SegmentWriter {
    name: String,
    kind: ChannelKind,
    directory: PathBuf,
    data_file: BufWriter<File>,
    index_file: BufWriter<File>,
    position: u64,
    entries: Vec<IndexEntry>,
}

impl SegmentWriter {
    /// Create `<channel_dir>/<name>.segd` with empty data and index files
    ///
    /// # Arguments
    ///
    /// * `channel_dir` - Directory of the owning channel, created if missing
    /// * `name` - Segment name, also the base name of its files
    /// * `kind` - Decides the data and index file extensions
    pub fn create(
        channel_dir: impl AsRef<Path>,
        name: impl Into<String>,
        kind: ChannelKind,
    ) -> Result<Self> {
        let name = name.into();
        let directory = session_path::segment_dir(channel_dir.as_ref(), &name);
        fs::create_dir_all(&directory)?;

        let data_path = session_path::data_file(&directory, &name, kind);
        let index_path = session_path::index_file(&directory, &name, kind);
        let mut data_file = BufWriter::new(File::create(data_path)?);
        let mut index_file = BufWriter::new(File::create(index_path)?);

        let universal_header = [0u8; UNIVERSAL_HEADER_BYTES as usize];
        data_file.write_all(&universal_header)?;
        index_file.write_all(&universal_header)?;

        Ok(SegmentWriter {
            name,
            kind,
            directory,
            data_file,
            index_file,
            position: UNIVERSAL_HEADER_BYTES,
            entries: Vec::new(),
        })
    }

    /// Append one block and its index record
    ///
    /// Start times must strictly increase from block to block.
    pub fn append_block(
        &mut self,
        start_time: Uutc,
        number_of_samples: u32,
        payload: &[u8],
        discontinuity: bool,
    ) -> Result<IndexEntry> {
        if let Some(prev) = self.entries.last() {
            if start_time <= prev.start_time {
                return Err(MefError::Config(format!(
                    "segment {}: block start time {} does not follow {}",
                    self.name, start_time, prev.start_time
                )));
            }
        }

        let block_bytes = u32::try_from(payload.len())
            .ok()
            .and_then(|len| len.checked_add(BLOCK_HEADER_BYTES))
            .ok_or_else(|| {
                MefError::out_of_range(
                    "payload bytes",
                    payload.len() as u64,
                    0u32,
                    u32::MAX - BLOCK_HEADER_BYTES,
                )
            })?;

        let header = BlockHeader {
            flags: if discontinuity { BlockHeader::DISCONTINUITY_MASK } else { 0 },
            number_of_samples,
            block_bytes,
            start_time,
        };
        self.data_file.write_all(&header.encode())?;
        self.data_file.write_all(payload)?;

        let start_sample = self.entries.last().map(|e| e.end_sample()).unwrap_or(0);
        let mut entry = IndexEntry::new(
            self.position,
            start_time,
            start_sample,
            number_of_samples,
            block_bytes,
        );
        entry.discontinuity = discontinuity;
        entry.write_to(&mut self.index_file)?;

        self.position += block_bytes as u64;
        self.entries.push(entry);
        Ok(entry)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes written to the data file so far, universal header included
    pub fn data_len(&self) -> u64 {
        self.position
    }

    pub fn flush(&mut self) -> Result<()> {
        self.data_file.flush()?;
        self.index_file.flush()?;
        Ok(())
    }

    /// Flush both files and hand back the written segment
    pub fn finish(mut self) -> Result<Segment> {
        self.flush()?;
        Ok(Segment {
            name: std::mem::take(&mut self.name),
            kind: self.kind,
            directory: Some(self.directory.clone()),
            entries: std::mem::take(&mut self.entries),
        })
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_index_file;

    #[test]
    fn test_blocks_are_laid_out_back_to_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            SegmentWriter::create(dir.path(), "ch-000000", ChannelKind::TimeSeries).unwrap();

        let a = writer.append_block(1_000_000, 10, &[0u8; 40], false).unwrap();
        let b = writer.append_block(1_002_000, 5, &[0u8; 20], true).unwrap();
        assert_eq!(a.file_offset, 1024);
        assert_eq!(a.block_bytes, 344);
        assert_eq!(b.file_offset, 1024 + 344);
        assert_eq!(b.start_sample, 10);
        assert!(b.discontinuity);

        let segment = writer.finish().unwrap();
        assert_eq!(segment.directory.as_deref(), Some(dir.path().join("ch-000000.segd").as_path()));

        let data_len = fs::metadata(segment.data_path().unwrap()).unwrap().len();
        assert_eq!(data_len, 1024 + 344 + 324);
        assert_eq!(read_index_file(segment.index_path().unwrap()).unwrap(), segment.entries);
    }

    #[test]
    fn test_start_times_must_increase() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            SegmentWriter::create(dir.path(), "ch-000000", ChannelKind::TimeSeries).unwrap();
        writer.append_block(100, 1, &[], false).unwrap();
        assert!(writer.append_block(100, 1, &[], false).is_err());
        assert_eq!(writer.entries().len(), 1);
    }
}
