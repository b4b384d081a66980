// src/metadata/channel_metadata.rs
use crate::error::{MefError, Result};
use crate::segment::Segment;
use crate::types::{samples_to_micros, ChannelKind, Uutc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named channel and the segments it owns
///
/// Segments are kept in a `BTreeMap` keyed by segment name, so iteration
/// order is always lexicographic regardless of how the segments were
/// discovered or inserted.
///
/// The channel-wide time bounds normally come from the channel metadata
/// written by the codec. When they were not provided they are derived from
/// the first and last index entries.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,

    /// Nominal sampling frequency in Hz
    pub sampling_frequency: f64,

    /// Directory of the channel when it was discovered on disk
    pub directory: Option<PathBuf>,

    earliest_start_time: Option<Uutc>,
    latest_end_time: Option<Uutc>,
    segments: BTreeMap<String, Segment>,
}

impl Channel {
    /// Create an empty time-series channel
    ///
    /// # Example
    ///
    /// ```
    /// use mef_rs::metadata::{Channel, IndexEntry};
    /// use mef_rs::segment::Segment;
    ///
    /// let mut channel = Channel::new("Fp1", 5000.0);
    /// channel.insert_segment(Segment::new(
    ///     "Fp1-000000",
    ///     vec![IndexEntry::new(1024, 0, 0, 5000, 4304)],
    /// ));
    /// assert_eq!(channel.total_samples(), 5000);
    /// assert_eq!(channel.latest_end_time(), Some(1_000_000));
    /// ```
    pub fn new(name: impl Into<String>, sampling_frequency: f64) -> Self {
        Channel {
            name: name.into(),
            kind: ChannelKind::TimeSeries,
            sampling_frequency,
            directory: None,
            earliest_start_time: None,
            latest_end_time: None,
            segments: BTreeMap::new(),
        }
    }

    /// Set explicit channel bounds, overriding the ones derived from the index
    pub fn with_bounds(mut self, earliest_start_time: Uutc, latest_end_time: Uutc) -> Self {
        self.earliest_start_time = Some(earliest_start_time);
        self.latest_end_time = Some(latest_end_time);
        self
    }

    pub fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a segment, replacing (and returning) any segment with the same name
    pub fn insert_segment(&mut self, segment: Segment) -> Option<Segment> {
        self.segments.insert(segment.name.clone(), segment)
    }

    pub fn remove_segment(&mut self, name: &str) -> Option<Segment> {
        self.segments.remove(name)
    }

    pub fn segment(&self, name: &str) -> Result<&Segment> {
        self.segments
            .get(name)
            .ok_or_else(|| MefError::SegmentNotFound(format!("{}/{}", self.name, name)))
    }

    pub fn segment_mut(&mut self, name: &str) -> Result<&mut Segment> {
        let channel = &self.name;
        self.segments
            .get_mut(name)
            .ok_or_else(|| MefError::SegmentNotFound(format!("{}/{}", channel, name)))
    }

    /// Segments in lexicographic name order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.segments.values_mut()
    }

    pub fn segment_names(&self) -> Vec<String> {
        self.segments.keys().cloned().collect()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn block_count(&self) -> usize {
        self.segments.values().map(|s| s.block_count()).sum()
    }

    /// Total samples across all segments
    pub fn total_samples(&self) -> u64 {
        self.segments.values().map(|s| s.total_samples()).sum()
    }

    pub fn earliest_start_time(&self) -> Option<Uutc> {
        self.earliest_start_time.or_else(|| {
            self.segments
                .values()
                .find_map(|s| s.entries.first())
                .map(|e| e.start_time)
        })
    }

    pub fn latest_end_time(&self) -> Option<Uutc> {
        self.latest_end_time.or_else(|| {
            self.segments
                .values()
                .rev()
                .find_map(|s| s.entries.last())
                .map(|e| {
                    e.start_time
                        + samples_to_micros(e.number_of_samples as u64, self.sampling_frequency)
                })
        })
    }

    /// Validate every segment's ordering invariant
    pub fn validate(&self) -> Result<()> {
        self.check_sampling_frequency()?;
        for segment in self.segments.values() {
            segment.validate()?;
        }
        Ok(())
    }

    pub(crate) fn check_sampling_frequency(&self) -> Result<()> {
        if !(self.sampling_frequency.is_finite() && self.sampling_frequency > 0.0) {
            return Err(MefError::Config(format!(
                "channel {} has invalid sampling frequency {}",
                self.name, self.sampling_frequency
            )));
        }
        Ok(())
    }
}
