// src/mapping/mapper.rs
use crate::error::{MefError, Result};
use crate::metadata::Channel;
use crate::toc::{build_toc, Toc};
use crate::types::{micros_to_samples, samples_to_micros, Uutc};

/// Result of resolving a time to a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLookup {
    /// The time falls on recorded data
    Sample(u64),
    /// The time falls inside a gap in the recording
    Discontinuity {
        /// First recorded sample after the gap
        next_sample: u64,
        /// Samples between the queried time and the start of the next block
        distance: i64,
    },
}

impl SampleLookup {
    /// First valid sample at or after the queried time
    pub fn sample(&self) -> u64 {
        match *self {
            SampleLookup::Sample(s) => s,
            SampleLookup::Discontinuity { next_sample, .. } => next_sample,
        }
    }

    pub fn is_discontinuity(&self) -> bool {
        matches!(self, SampleLookup::Discontinuity { .. })
    }

    /// Samples of filler a reader has to synthesize before valid data starts
    pub fn missing_samples(&self) -> u64 {
        match *self {
            SampleLookup::Sample(_) => 0,
            SampleLookup::Discontinuity { distance, .. } => distance.max(0) as u64,
        }
    }
}

/// Resolve `time` to a sample
///
/// The bounds are closed: `time == latest_end_time` resolves to the channel's
/// total sample count, the exclusive end of its sample range. Explicit bounds
/// that reach past the last block also resolve to that count, since no
/// samples exist beyond it.
///
/// # Errors
///
/// [`MefError::OutOfRange`] when `time` lies before the channel's earliest
/// start time or after its latest end time.
pub fn sample_for_time(time: Uutc, toc: &Toc, fs: f64) -> Result<SampleLookup> {
    if time < toc.earliest_start_time() || time > toc.latest_end_time() {
        return Err(MefError::out_of_range(
            "time",
            time,
            toc.earliest_start_time(),
            toc.latest_end_time(),
        ));
    }

    let rows = toc.rows();
    let Some(idx) = toc.row_for_time(time) else {
        // Inside the channel bounds but before the first recorded block
        let first = &rows[0];
        return Ok(gap_lookup(first.start_sample, first.start_time - time, fs));
    };

    let row = &rows[idx];
    let delta = micros_to_samples(time - row.start_time, fs).max(0) as u64;

    let Some(next) = rows.get(idx + 1) else {
        return Ok(SampleLookup::Sample(row.start_sample + delta.min(row.number_of_samples as u64)));
    };

    let block_len = next.start_sample - row.start_sample;
    if delta < block_len {
        return Ok(SampleLookup::Sample(row.start_sample + delta));
    }

    if next.is_discontinuity {
        Ok(gap_lookup(next.start_sample, next.start_time - time, fs))
    } else {
        Ok(SampleLookup::Sample(next.start_sample))
    }
}

fn gap_lookup(next_sample: u64, micros_to_next: i64, fs: f64) -> SampleLookup {
    let distance = micros_to_samples(micros_to_next, fs);
    if distance == 0 {
        SampleLookup::Sample(next_sample)
    } else {
        SampleLookup::Discontinuity { next_sample, distance }
    }
}

/// Resolve `sample` to the absolute time it was acquired
///
/// The time is rounded up to the next whole microsecond, so it never
/// precedes the actual acquisition. `sample == total_samples` is accepted
/// and resolves to the end of the last block.
pub fn time_for_sample(sample: u64, toc: &Toc, fs: f64) -> Result<Uutc> {
    let total = toc.total_samples();
    if sample > total {
        return Err(MefError::out_of_range("sample", sample, 0u64, total));
    }

    let idx = toc.row_for_sample(sample).ok_or_else(|| {
        MefError::out_of_range("sample", sample, toc.rows()[0].start_sample, total)
    })?;
    let row = &toc.rows()[idx];

    Ok(row.start_time + samples_to_micros(sample - row.start_sample, fs))
}

/// Immutable time/sample mapping over one TOC snapshot
///
/// Cheap to share between threads; rebuild it after the channel's index
/// entries change.
#[derive(Debug, Clone)]
pub struct TimeMapper {
    toc: Toc,
}

impl TimeMapper {
    pub fn new(channel: &Channel) -> Result<Self> {
        Ok(TimeMapper { toc: build_toc(channel)? })
    }

    pub fn from_toc(toc: Toc) -> Self {
        TimeMapper { toc }
    }

    pub fn toc(&self) -> &Toc {
        &self.toc
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.toc.sampling_frequency()
    }

    pub fn total_samples(&self) -> u64 {
        self.toc.total_samples()
    }

    pub fn sample_for_time(&self, time: Uutc) -> Result<SampleLookup> {
        sample_for_time(time, &self.toc, self.toc.sampling_frequency())
    }

    pub fn time_for_sample(&self, sample: u64) -> Result<Uutc> {
        time_for_sample(sample, &self.toc, self.toc.sampling_frequency())
    }
}
