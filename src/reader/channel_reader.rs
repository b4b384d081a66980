// src/reader/channel_reader.rs
use crate::error::{MefError, Result};
use crate::mapping::{RangePlan, TimeMapper};
use crate::metadata::Channel;
use crate::reader::codec::{check_decoded_len, BlockCodec};
use crate::toc::TocRow;
use crate::types::{micros_to_samples, samples_to_micros, Uutc};
use std::collections::HashMap;
use std::fs::File;

/// Reads decoded sample ranges from one channel
///
/// Holds a TOC snapshot of the channel taken at construction. Data files are
/// opened lazily, once per segment, and kept for the reader's lifetime.
pub struct ChannelReader<'a, C: BlockCodec> {
    channel: &'a Channel,
    mapper: TimeMapper,
    codec: C,
    files: HashMap<usize, File>,
}

impl<'a, C: BlockCodec> ChannelReader<'a, C> {
    pub fn new(channel: &'a Channel, codec: C) -> Result<Self> {
        Ok(ChannelReader {
            channel,
            mapper: TimeMapper::new(channel)?,
            codec,
            files: HashMap::new(),
        })
    }

    pub fn channel(&self) -> &Channel {
        self.channel
    }

    pub fn mapper(&self) -> &TimeMapper {
        &self.mapper
    }

    pub fn total_samples(&self) -> u64 {
        self.mapper.total_samples()
    }

    /// Read samples `[start, end)`
    ///
    /// Samples are returned back to back; gaps in time are not filled.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mef_rs::prelude::*;
    ///
    /// # fn run(session: &Session, codec: &dyn BlockCodec) -> Result<()> {
    /// let channel = session.channel("Fp1")?;
    /// let mut reader = ChannelReader::new(channel, codec)?;
    /// let first_second = reader.read_samples(0, 5000)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_samples(&mut self, start: u64, end: u64) -> Result<Vec<f64>> {
        let total = self.total_samples();
        if end > total {
            return Err(MefError::out_of_range("sample", end, 0u64, total));
        }
        if start > end {
            return Err(MefError::out_of_range("sample", start, 0u64, end));
        }

        let mut result = Vec::with_capacity((end - start) as usize);
        for row in self.rows_overlapping(start, end) {
            let decoded = self.decode_row(&row)?;
            let from = start.max(row.start_sample) - row.start_sample;
            let to = end.min(row.end_sample()) - row.start_sample;
            result.extend(decoded[from as usize..to as usize].iter().map(|&v| v as f64));
        }
        Ok(result)
    }

    /// Read the time range `[start, end)` with one slot per nominal sample period
    ///
    /// Slots not covered by a recorded sample (discontinuities) are `NaN`.
    pub fn read_time_range(&mut self, start: Uutc, end: Uutc) -> Result<Vec<f64>> {
        let plan = self.mapper.plan_time_range(start, end)?;
        self.read_plan(&plan)
    }

    /// Execute a previously resolved [`RangePlan`]
    pub fn read_plan(&mut self, plan: &RangePlan) -> Result<Vec<f64>> {
        let fs = self.mapper.sampling_frequency();
        let mut out = vec![f64::NAN; plan.output_len];

        for row in self.rows_overlapping(plan.start_sample, plan.end_sample) {
            let decoded = self.decode_row(&row)?;
            let from = plan.start_sample.max(row.start_sample) - row.start_sample;
            let to = plan.end_sample.min(row.end_sample()) - row.start_sample;

            for k in from..to {
                let t = row.start_time + samples_to_micros(k, fs);
                let slot = micros_to_samples(t - plan.start_time, fs);
                if slot >= 0 && (slot as usize) < out.len() {
                    out[slot as usize] = decoded[k as usize] as f64;
                }
            }
        }
        Ok(out)
    }

    fn rows_overlapping(&self, start: u64, end: u64) -> Vec<TocRow> {
        let toc = self.mapper.toc();
        let first = toc.row_for_sample(start).unwrap_or(0);
        toc.rows()[first..]
            .iter()
            .take_while(|r| r.start_sample < end)
            .filter(|r| r.end_sample() > start)
            .copied()
            .collect()
    }

    fn decode_row(&mut self, row: &TocRow) -> Result<Vec<i32>> {
        let segment_name = self.mapper.toc().segment_name(row);
        let segment = self.channel.segment(segment_name)?;
        let entry = segment.entries.get(row.block).copied().ok_or_else(|| {
            MefError::SegmentNotFound(format!("{} block {}", segment_name, row.block))
        })?;

        let file = match self.files.entry(row.segment) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(File::open(segment.data_path()?)?)
            }
        };

        let raw = self.codec.read_block(file, entry.file_offset, entry.block_bytes)?;
        let decoded = self.codec.decode_samples(&raw)?;
        check_decoded_len(&decoded, entry.number_of_samples, entry.file_offset)?;
        Ok(decoded)
    }
}
