// src/types.rs
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Absolute time in microseconds since the Unix epoch (uUTC)
pub type Uutc = i64;

/// Size of the universal header at the start of every data and index file
pub const UNIVERSAL_HEADER_BYTES: u64 = 1024;

/// Size of the fixed header preceding each block payload
pub const BLOCK_HEADER_BYTES: u32 = 304;

/// Stride of one record in a time-series index file
pub const INDEX_ENTRY_BYTES: u64 = 56;

/// Marker written into sample extremum fields that carry no value
pub const RED_NAN: i32 = i32::MIN;

/// Microseconds per second
pub const MICROS_PER_SECOND: f64 = 1e6;

/// Kind of channel, which decides the on-disk directory suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelKind {
    #[default]
    TimeSeries,
    Video,
}

impl ChannelKind {
    /// Directory suffix for channels of this kind (without the dot)
    pub fn directory_suffix(&self) -> &'static str {
        match self {
            ChannelKind::TimeSeries => "timd",
            ChannelKind::Video => "vidd",
        }
    }

    /// Data file extension for segments of this kind
    pub fn data_extension(&self) -> &'static str {
        match self {
            ChannelKind::TimeSeries => "tdat",
            ChannelKind::Video => "vdat",
        }
    }

    /// Index file extension for segments of this kind
    pub fn index_extension(&self) -> &'static str {
        match self {
            ChannelKind::TimeSeries => "tidx",
            ChannelKind::Video => "vidx",
        }
    }
}

/// Time spanned by `samples` samples, rounded up to the next whole microsecond.
///
/// Rounding up keeps a sample's time from ever resolving to before it was
/// acquired.
pub fn samples_to_micros(samples: u64, sampling_frequency: f64) -> i64 {
    (samples as f64 * MICROS_PER_SECOND / sampling_frequency).ceil() as i64
}

/// Number of samples spanned by `micros`, rounded to the nearest sample.
///
/// Negative durations yield negative counts.
pub fn micros_to_samples(micros: i64, sampling_frequency: f64) -> i64 {
    (micros as f64 * sampling_frequency / MICROS_PER_SECOND).round() as i64
}

pub fn uutc_to_system_time(uutc: Uutc) -> SystemTime {
    if uutc >= 0 {
        UNIX_EPOCH + Duration::from_micros(uutc as u64)
    } else {
        UNIX_EPOCH - Duration::from_micros(uutc.unsigned_abs())
    }
}

pub fn system_time_to_uutc(time: SystemTime) -> Uutc {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_micros() as i64,
        Err(e) => -(e.duration().as_micros() as i64),
    }
}
