// src/integrity/cursor.rs
use crate::error::{MefError, Result};
use crate::segment::BlockHeader;
use crate::types::{BLOCK_HEADER_BYTES, UNIVERSAL_HEADER_BYTES};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;
#[cfg(feature = "mmap")]
use std::io::Cursor;

/// Trait alias for Read + Seek
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Forward-only walker over the blocks of a data file
///
/// Between blocks the cursor always satisfies
/// `position == 1024 + sum(block_bytes of every block walked)`, which
/// [`BlockCursor::is_aligned`] checks.
pub struct BlockCursor<R: ReadSeek> {
    inner: R,
    position: u64,
    file_len: u64,
    blocks_walked: usize,
    bytes_walked: u64,
}

impl BlockCursor<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::with_capacity(65536, file))
    }
}

#[cfg(feature = "mmap")]
impl BlockCursor<Cursor<Mmap>> {
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the segment lock keeps this process from mutating the
        // file while the map is alive.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::new(Cursor::new(mmap))
    }
}

impl<R: ReadSeek> BlockCursor<R> {
    /// Wrap `inner` and position the cursor past the universal header
    pub fn new(mut inner: R) -> Result<Self> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        if file_len < UNIVERSAL_HEADER_BYTES {
            return Err(MefError::InvalidLayout(format!(
                "data file of {} bytes is shorter than its universal header",
                file_len
            )));
        }
        inner.seek(SeekFrom::Start(UNIVERSAL_HEADER_BYTES))?;

        Ok(BlockCursor {
            inner,
            position: UNIVERSAL_HEADER_BYTES,
            file_len,
            blocks_walked: 0,
            bytes_walked: 0,
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn blocks_walked(&self) -> usize {
        self.blocks_walked
    }

    pub fn remaining(&self) -> u64 {
        self.file_len.saturating_sub(self.position)
    }

    /// Read the block header at the current position
    pub fn read_header(&mut self) -> Result<BlockHeader> {
        if self.remaining() < BLOCK_HEADER_BYTES as u64 {
            return Err(MefError::InvalidLayout(format!(
                "block header at offset {} runs past end of file ({} bytes)",
                self.position, self.file_len
            )));
        }
        let header = BlockHeader::read_from(&mut self.inner)?;
        self.position += BLOCK_HEADER_BYTES as u64;
        Ok(header)
    }

    /// Skip the payload of the block whose header was just read
    pub fn skip_payload(&mut self, header: &BlockHeader) -> Result<()> {
        let payload = header.payload_bytes() as u64;
        self.inner.seek(SeekFrom::Current(payload as i64))?;
        self.position += payload;
        self.blocks_walked += 1;
        self.bytes_walked += header.block_bytes as u64;
        Ok(())
    }

    pub fn is_aligned(&self) -> bool {
        self.position == UNIVERSAL_HEADER_BYTES + self.bytes_walked
    }
}
