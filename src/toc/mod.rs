// src/toc/mod.rs
//! Channel-wide table of contents
//!
//! The TOC is a derived view over a channel's index entries: one row per
//! block, across every segment, in segment-name order. It is never a source
//! of truth. Rebuild it with [`build_toc`] whenever an index entry changes
//! (after a repair, for instance).
//!
//! Each row carries a discontinuity flag and a `span`: the elapsed time since
//! the previous row minus the time the previous row's samples explain at the
//! nominal sampling rate. A non-zero span on a row that is not flagged
//! discontinuous is clock drift, not a gap in the recording.

use crate::error::{MefError, Result};
use crate::metadata::Channel;
use crate::types::{Uutc, MICROS_PER_SECOND};

/// One block of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocRow {
    pub is_discontinuity: bool,
    /// Microseconds elapsed beyond what the previous row's samples explain
    pub span: i64,
    /// Start sample counted from the beginning of the channel
    pub start_sample: u64,
    pub start_time: Uutc,
    pub number_of_samples: u32,
    /// Position of the owning segment in [`Toc::segment_names`]
    pub segment: usize,
    /// Position of the block within its segment
    pub block: usize,
}

impl TocRow {
    pub fn end_sample(&self) -> u64 {
        self.start_sample + self.number_of_samples as u64
    }
}

/// Immutable table of contents of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Toc {
    rows: Vec<TocRow>,
    segment_names: Vec<String>,
    sampling_frequency: f64,
    earliest_start_time: Uutc,
    latest_end_time: Uutc,
}

/// Build the table of contents of `channel`
///
/// Fails with [`MefError::Config`] when the channel holds no blocks, has an
/// unusable sampling frequency, or has a segment whose index is out of order
/// or still carries a zeroed entry. Damaged segments need an integrity scan
/// with repair before they can be mapped.
pub fn build_toc(channel: &Channel) -> Result<Toc> {
    channel.validate()?;
    if channel.block_count() == 0 {
        return Err(MefError::Config(format!(
            "channel {} has no segments with blocks",
            channel.name
        )));
    }

    let fs = channel.sampling_frequency;
    let sample_period = (MICROS_PER_SECOND / fs) as i64;

    let mut rows = Vec::with_capacity(channel.block_count());
    let mut segment_names = Vec::with_capacity(channel.segment_count());
    let mut segment_base = 0u64;

    for segment in channel.segments() {
        if segment.is_empty() {
            continue;
        }
        let segment_idx = segment_names.len();
        segment_names.push(segment.name.clone());

        let mut prev: Option<(Uutc, u64)> = None;
        for (block, entry) in segment.entries.iter().enumerate() {
            let start_sample = segment_base + entry.start_sample;

            // First block of a segment is discontinuous by definition
            let is_discontinuity = match prev {
                None => true,
                Some((prev_time, prev_sample)) => {
                    let explained =
                        (start_sample as i64 - prev_sample as i64) as f64 * MICROS_PER_SECOND / fs;
                    let gap = ((entry.start_time - prev_time) as f64 - explained).round() as i64;
                    gap >= sample_period && gap != 0
                }
            };

            rows.push(TocRow {
                is_discontinuity,
                span: 0,
                start_sample,
                start_time: entry.start_time,
                number_of_samples: entry.number_of_samples,
                segment: segment_idx,
                block,
            });
            prev = Some((entry.start_time, start_sample));
        }
        segment_base += segment.total_samples();
    }

    for i in 1..rows.len() {
        let elapsed = (rows[i].start_time - rows[i - 1].start_time) as f64;
        let samples = rows[i].start_sample as i64 - rows[i - 1].start_sample as i64;
        let explained = samples as f64 * MICROS_PER_SECOND / fs;
        rows[i].span = (elapsed - explained).round() as i64;
    }

    let earliest_start_time = channel.earliest_start_time().unwrap_or(rows[0].start_time);
    let latest_end_time = channel.latest_end_time().unwrap_or(rows[rows.len() - 1].start_time);

    Ok(Toc {
        rows,
        segment_names,
        sampling_frequency: fs,
        earliest_start_time,
        latest_end_time,
    })
}

impl Toc {
    pub fn rows(&self) -> &[TocRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&TocRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the segments that contributed rows, in row order
    pub fn segment_names(&self) -> &[String] {
        &self.segment_names
    }

    pub fn segment_name(&self, row: &TocRow) -> &str {
        &self.segment_names[row.segment]
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    pub fn earliest_start_time(&self) -> Uutc {
        self.earliest_start_time
    }

    pub fn latest_end_time(&self) -> Uutc {
        self.latest_end_time
    }

    /// Samples across the whole channel
    pub fn total_samples(&self) -> u64 {
        self.rows.last().map(|r| r.end_sample()).unwrap_or(0)
    }

    pub fn discontinuity_flags(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.is_discontinuity).collect()
    }

    pub fn spans(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.span).collect()
    }

    pub fn start_samples(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.start_sample).collect()
    }

    pub fn start_times(&self) -> Vec<Uutc> {
        self.rows.iter().map(|r| r.start_time).collect()
    }

    /// Rows that open a gap, excluding the very first row of the channel
    pub fn discontinuities(&self) -> impl Iterator<Item = &TocRow> {
        self.rows.iter().skip(1).filter(|r| r.is_discontinuity)
    }

    /// Index of the last row starting at or before `time` (ties go to the later row)
    pub(crate) fn row_for_time(&self, time: Uutc) -> Option<usize> {
        self.rows.partition_point(|r| r.start_time <= time).checked_sub(1)
    }

    /// Index of the last row starting at or before `sample`
    pub(crate) fn row_for_sample(&self, sample: u64) -> Option<usize> {
        self.rows.partition_point(|r| r.start_sample <= sample).checked_sub(1)
    }
}
