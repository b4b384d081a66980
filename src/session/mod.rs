// src/session/mod.rs
use crate::error::{MefError, Result};
use crate::integrity::{IntegrityScanner, ScanOptions, ScanReport};
use crate::mapping::{SampleLookup, TimeMapper};
use crate::metadata::{session_path, Channel};
use crate::segment::Segment;
use crate::toc::{build_toc, Toc};
use crate::types::{ChannelKind, Uutc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How a session directory is interpreted
///
/// Sampling frequencies live in the channels' encrypted metadata, which is
/// read by the block codec rather than this crate, so they are supplied here.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Used for every channel without its own entry
    pub default_sampling_frequency: Option<f64>,
    pub sampling_frequencies: BTreeMap<String, f64>,
    /// Channel directories to load (`.timd` or `.vidd`)
    pub kind: ChannelKind,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sampling_frequency(mut self, sampling_frequency: f64) -> Self {
        self.default_sampling_frequency = Some(sampling_frequency);
        self
    }

    pub fn with_channel_sampling_frequency(
        mut self,
        channel: impl Into<String>,
        sampling_frequency: f64,
    ) -> Self {
        self.sampling_frequencies.insert(channel.into(), sampling_frequency);
        self
    }

    pub fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sampling_frequency_for(&self, channel: &str) -> Result<f64> {
        self.sampling_frequencies
            .get(channel)
            .copied()
            .or(self.default_sampling_frequency)
            .ok_or_else(|| {
                MefError::Config(format!(
                    "no sampling frequency configured for channel {}",
                    channel
                ))
            })
    }
}

/// Summary of one channel, as listed by [`Session::basic_info`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub name: String,
    pub sampling_frequency: f64,
    pub segments: usize,
    pub blocks: usize,
    pub total_samples: u64,
    pub earliest_start_time: Option<Uutc>,
    pub latest_end_time: Option<Uutc>,
}

/// A session directory and the channels discovered in it
///
/// Layout:
///
/// ```text
/// <root>/
///   <channel>.timd/
///     <channel>-000000.segd/
///       <channel>-000000.tdat
///       <channel>-000000.tidx
/// ```
///
/// Quarantined `.segd_corrupt` directories are not loaded.
#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    config: SessionConfig,
    channels: BTreeMap<String, Channel>,
}

impl Session {
    /// Discover and load every channel under `root`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mef_rs::prelude::*;
    ///
    /// # fn main() -> Result<()> {
    /// let config = SessionConfig::new().with_sampling_frequency(5000.0);
    /// let session = Session::open("/data/sub-01.mefd", config)?;
    /// for info in session.basic_info() {
    ///     println!("{}: {} samples", info.name, info.total_samples);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(root: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let channels = discover_channels(&root, &config)?;

        info!(
            root = ?root,
            channels = channels.len(),
            segments = channels.values().map(|c| c.segment_count()).sum::<usize>(),
            "Opened session"
        );
        Ok(Session { root, config, channels })
    }

    /// Re-read the directory tree, picking up repaired or quarantined segments
    pub fn reload(&mut self) -> Result<()> {
        self.channels = discover_channels(&self.root, &self.config)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.channels
            .get(name)
            .ok_or_else(|| MefError::ChannelNotFound(name.to_string()))
    }

    pub fn channel_mut(&mut self, name: &str) -> Result<&mut Channel> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| MefError::ChannelNotFound(name.to_string()))
    }

    /// Channels in name order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn basic_info(&self) -> Vec<ChannelInfo> {
        self.channels
            .values()
            .map(|c| ChannelInfo {
                name: c.name.clone(),
                sampling_frequency: c.sampling_frequency,
                segments: c.segment_count(),
                blocks: c.block_count(),
                total_samples: c.total_samples(),
                earliest_start_time: c.earliest_start_time(),
                latest_end_time: c.latest_end_time(),
            })
            .collect()
    }

    pub fn toc(&self, channel: &str) -> Result<Toc> {
        build_toc(self.channel(channel)?)
    }

    pub fn mapper(&self, channel: &str) -> Result<TimeMapper> {
        TimeMapper::new(self.channel(channel)?)
    }

    pub fn sample_for_time(&self, channel: &str, time: Uutc) -> Result<SampleLookup> {
        self.mapper(channel)?.sample_for_time(time)
    }

    pub fn time_for_sample(&self, channel: &str, sample: u64) -> Result<Uutc> {
        self.mapper(channel)?.time_for_sample(sample)
    }

    /// Scan every channel; quarantined segments are dropped from the session
    pub fn scan_integrity(&mut self, options: ScanOptions) -> ScanReport {
        IntegrityScanner::new(options).scan_session(self)
    }
}

fn discover_channels(root: &Path, config: &SessionConfig) -> Result<BTreeMap<String, Channel>> {
    let mut channels = BTreeMap::new();
    let suffix = config.kind.directory_suffix();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let name = file_name.to_str().and_then(|n| session_path::strip_suffix(n, suffix));
        let Some(name) = name else {
            continue;
        };

        let mut channel =
            Channel::new(name, config.sampling_frequency_for(name)?).with_kind(config.kind);
        channel.directory = Some(entry.path());
        for segment in discover_segments(&entry.path(), config.kind)? {
            channel.insert_segment(segment);
        }
        debug!(channel = name, segments = channel.segment_count(), "Discovered channel");
        channels.insert(name.to_string(), channel);
    }
    Ok(channels)
}

fn discover_segments(channel_dir: &Path, kind: ChannelKind) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for entry in fs::read_dir(channel_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let name = file_name
            .to_str()
            .and_then(|n| session_path::strip_suffix(n, session_path::SEGMENT_SUFFIX));
        match name {
            Some(name) => segments.push(Segment::open(entry.path(), name, kind)?),
            None => debug!(path = ?entry.path(), "Skipping non-segment directory"),
        }
    }
    Ok(segments)
}
