// tests/common/mod.rs
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use mef_rs::metadata::session_path;
use mef_rs::segment::BlockHeader;
use mef_rs::{
    BlockCodec, ChannelKind, IndexEntry, MefError, Result, Segment, SegmentWriter, Session,
    SessionConfig, Uutc,
};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const T0: Uutc = 1_600_000_000_000_000;
pub const FS: f64 = 5000.0;

/// Uncompressed little-endian i32 payloads
pub struct RawI32Codec;

impl BlockCodec for RawI32Codec {
    fn decode_samples(&self, raw: &[u8]) -> Result<Vec<i32>> {
        let payload = raw
            .get(BlockHeader::SIZE..)
            .ok_or_else(|| MefError::Codec("block shorter than its header".into()))?;
        if payload.len() % 4 != 0 {
            return Err(MefError::Codec("payload not a multiple of 4".into()));
        }
        Ok(payload.chunks_exact(4).map(LittleEndian::read_i32).collect())
    }
}

pub fn encode(samples: &[i32]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * 4];
    LittleEndian::write_i32_into(samples, &mut bytes);
    bytes
}

/// One block to write: start time and the sample values it holds
pub struct BlockSpec {
    pub start_time: Uutc,
    pub values: Vec<i32>,
}

impl BlockSpec {
    /// `count` samples valued `first, first + 1, ...`
    pub fn ramp(start_time: Uutc, first: i32, count: usize) -> Self {
        BlockSpec {
            start_time,
            values: (first..first + count as i32).collect(),
        }
    }
}

pub fn write_segment(channel_dir: &Path, name: &str, blocks: &[BlockSpec]) -> Segment {
    let mut writer = SegmentWriter::create(channel_dir, name, ChannelKind::TimeSeries).unwrap();
    for (i, block) in blocks.iter().enumerate() {
        let n = block.values.len() as u32;
        writer.append_block(block.start_time, n, &encode(&block.values), i == 0).unwrap();
    }
    writer.finish().unwrap()
}

/// Session root containing one 5000 Hz channel `Fp1`:
///
/// - `Fp1-000000`: 10 s from T0, then an appended 5 s with no gap
/// - a 2 s gap
/// - `Fp1-000001`: 5 s from T0 + 17 s
///
/// Sample values equal their channel-wide sample number.
pub fn gap_session(root: &Path) -> PathBuf {
    let chan = session_path::channel_dir(root, "Fp1", ChannelKind::TimeSeries);
    write_segment(
        &chan,
        "Fp1-000000",
        &[
            BlockSpec::ramp(T0, 0, 50_000),
            BlockSpec::ramp(T0 + 10_000_000, 50_000, 25_000),
        ],
    );
    write_segment(&chan, "Fp1-000001", &[BlockSpec::ramp(T0 + 17_000_000, 75_000, 25_000)]);
    chan
}

/// Segment of `blocks` blocks of 100 samples each, 20 ms apart at 5000 Hz
pub fn small_segment(channel_dir: &Path, name: &str, blocks: usize) -> Segment {
    let specs: Vec<BlockSpec> = (0..blocks)
        .map(|i| BlockSpec::ramp(T0 + i as i64 * 20_000, (i * 100) as i32, 100))
        .collect();
    write_segment(channel_dir, name, &specs)
}

/// Open the session under `root` with every channel at [`FS`]
pub fn open_session(root: &Path) -> Session {
    Session::open(root, SessionConfig::new().with_sampling_frequency(FS)).unwrap()
}

/// Load `segment` again from its files on disk
pub fn reopen(segment: &Segment) -> Segment {
    Segment::open(segment.directory().unwrap(), &segment.name, ChannelKind::TimeSeries).unwrap()
}

/// Overwrite index slot `slot` with zeros
pub fn zero_index_slot(segment: &Segment, slot: usize) {
    let mut file = OpenOptions::new().write(true).open(segment.index_path().unwrap()).unwrap();
    file.seek(SeekFrom::Start(IndexEntry::slot_offset(slot))).unwrap();
    file.write_all(&[0u8; IndexEntry::SIZE]).unwrap();
}

/// Overwrite the block_bytes field of the block header at `file_offset`
pub fn set_header_block_bytes(segment: &Segment, file_offset: u64, block_bytes: u32) {
    let mut file = OpenOptions::new().write(true).open(segment.data_path().unwrap()).unwrap();
    file.seek(SeekFrom::Start(file_offset + BlockHeader::BLOCK_BYTES_OFFSET as u64))
        .unwrap();
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, block_bytes);
    file.write_all(&buf).unwrap();
}

pub fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

/// Files in `dir` whose name ends with `suffix`
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .collect();
    found.sort();
    found
}
