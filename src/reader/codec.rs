// src/reader/codec.rs
use crate::error::{MefError, Result};
use bytes::Bytes;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Narrow interface to the block payload codec
///
/// The codec owns compression and encryption. This crate only asks it for
/// the raw bytes of a block and for the samples those bytes decode to.
pub trait BlockCodec: Send + Sync {
    /// Read `byte_length` bytes of one block (header included) at `offset`
    fn read_block(&self, file: &mut File, offset: u64, byte_length: u32) -> Result<Bytes> {
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; byte_length as usize];
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Decode the samples of one raw block (header included)
    fn decode_samples(&self, raw: &[u8]) -> Result<Vec<i32>>;
}

impl<C: BlockCodec + ?Sized> BlockCodec for &C {
    fn read_block(&self, file: &mut File, offset: u64, byte_length: u32) -> Result<Bytes> {
        (**self).read_block(file, offset, byte_length)
    }

    fn decode_samples(&self, raw: &[u8]) -> Result<Vec<i32>> {
        (**self).decode_samples(raw)
    }
}

impl<C: BlockCodec + ?Sized> BlockCodec for std::sync::Arc<C> {
    fn read_block(&self, file: &mut File, offset: u64, byte_length: u32) -> Result<Bytes> {
        (**self).read_block(file, offset, byte_length)
    }

    fn decode_samples(&self, raw: &[u8]) -> Result<Vec<i32>> {
        (**self).decode_samples(raw)
    }
}

/// Check a decoded block against the sample count its index entry promised
pub(crate) fn check_decoded_len(decoded: &[i32], expected: u32, offset: u64) -> Result<()> {
    if decoded.len() != expected as usize {
        return Err(MefError::Codec(format!(
            "block at offset {} decoded to {} samples, index promises {}",
            offset,
            decoded.len(),
            expected
        )));
    }
    Ok(())
}
