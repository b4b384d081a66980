// src/segment/header.rs
use crate::error::Result;
use crate::types::{Uutc, BLOCK_HEADER_BYTES};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Read;

/// Fields of a block header that the index mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub flags: u8,
    pub number_of_samples: u32,
    pub block_bytes: u32,
    pub start_time: Uutc,
}

impl BlockHeader {
    pub const SIZE: usize = BLOCK_HEADER_BYTES as usize;
    pub const FLAGS_OFFSET: usize = 4;
    pub const NUMBER_OF_SAMPLES_OFFSET: usize = 32;
    pub const BLOCK_BYTES_OFFSET: usize = 36;
    pub const START_TIME_OFFSET: usize = 40;
    pub const DISCONTINUITY_MASK: u8 = 0x01;

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        BlockHeader {
            flags: bytes[Self::FLAGS_OFFSET],
            number_of_samples: LittleEndian::read_u32(
                &bytes[Self::NUMBER_OF_SAMPLES_OFFSET..][..4],
            ),
            block_bytes: LittleEndian::read_u32(&bytes[Self::BLOCK_BYTES_OFFSET..][..4]),
            start_time: LittleEndian::read_i64(&bytes[Self::START_TIME_OFFSET..][..8]),
        }
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; Self::SIZE];
        reader.read_exact(&mut bytes)?;
        Ok(Self::parse(&bytes))
    }

    /// Encode the mirrored fields; every other header byte is zero
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[Self::FLAGS_OFFSET] = self.flags;
        LittleEndian::write_u32(
            &mut bytes[Self::NUMBER_OF_SAMPLES_OFFSET..][..4],
            self.number_of_samples,
        );
        LittleEndian::write_u32(&mut bytes[Self::BLOCK_BYTES_OFFSET..][..4], self.block_bytes);
        LittleEndian::write_i64(&mut bytes[Self::START_TIME_OFFSET..][..8], self.start_time);
        bytes
    }

    pub fn is_discontinuity(&self) -> bool {
        self.flags & Self::DISCONTINUITY_MASK != 0
    }

    /// A header claiming fewer bytes than its own size cannot be walked past
    pub fn is_corrupt(&self) -> bool {
        self.block_bytes < BLOCK_HEADER_BYTES
    }

    pub fn payload_bytes(&self) -> u32 {
        self.block_bytes.saturating_sub(BLOCK_HEADER_BYTES)
    }
}
