// src/mapping/range.rs
use crate::error::{MefError, Result};
use crate::mapping::TimeMapper;
use crate::types::{micros_to_samples, Uutc};

/// A half-open time range resolved against a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePlan {
    pub start_time: Uutc,
    pub end_time: Uutc,
    /// First recorded sample to read
    pub start_sample: u64,
    /// Exclusive end sample
    pub end_sample: u64,
    /// Filler slots before `start_sample` because `start_time` lies in a gap
    pub leading_missing: u64,
    /// Slots a NaN-filled read of the range produces
    pub output_len: usize,
}

impl RangePlan {
    pub fn sample_count(&self) -> u64 {
        self.end_sample.saturating_sub(self.start_sample)
    }
}

impl TimeMapper {
    /// Resolve the half-open time range `[start, end)`
    ///
    /// # Example
    ///
    /// ```
    /// use mef_rs::metadata::{Channel, IndexEntry};
    /// use mef_rs::segment::Segment;
    /// use mef_rs::mapping::TimeMapper;
    ///
    /// let mut channel = Channel::new("ch", 1000.0);
    /// channel.insert_segment(Segment::new("ch-000000", vec![
    ///     IndexEntry::new(1024, 0, 0, 1000, 400),
    ///     IndexEntry::new(1424, 3_000_000, 1000, 1000, 400),
    /// ]));
    /// let mapper = TimeMapper::new(&channel).unwrap();
    ///
    /// let plan = mapper.plan_time_range(2_500_000, 3_500_000).unwrap();
    /// assert_eq!(plan.leading_missing, 500);
    /// assert_eq!((plan.start_sample, plan.end_sample), (1000, 1500));
    /// assert_eq!(plan.output_len, 1000);
    /// ```
    pub fn plan_time_range(&self, start: Uutc, end: Uutc) -> Result<RangePlan> {
        if end < start {
            return Err(MefError::Config(format!(
                "time range end {} precedes start {}",
                end, start
            )));
        }

        let start_lookup = self.sample_for_time(start)?;
        let end_lookup = self.sample_for_time(end)?;
        let start_sample = start_lookup.sample();
        let end_sample = end_lookup.sample().max(start_sample);

        let output_len = micros_to_samples(end - start, self.sampling_frequency()).max(0) as usize;

        Ok(RangePlan {
            start_time: start,
            end_time: end,
            start_sample,
            end_sample,
            leading_missing: start_lookup.missing_samples().min(output_len as u64),
            output_len,
        })
    }

    /// Resolve the half-open sample range `[start, end)` to its time bounds
    pub fn plan_sample_range(&self, start: u64, end: u64) -> Result<(Uutc, Uutc)> {
        if end < start {
            return Err(MefError::Config(format!(
                "sample range end {} precedes start {}",
                end, start
            )));
        }
        Ok((self.time_for_sample(start)?, self.time_for_sample(end)?))
    }
}
