// src/segment/mod.rs
mod header;

pub use header::BlockHeader;

use crate::error::{MefError, Result};
use crate::metadata::{read_index_file, session_path, IndexEntry};
use crate::types::ChannelKind;
use std::path::{Path, PathBuf};

/// One contiguous write session within a channel
///
/// A segment owns its index entries. When it was loaded from disk it also
/// knows the directory holding its data/index file pair.
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub kind: ChannelKind,
    pub directory: Option<PathBuf>,
    pub entries: Vec<IndexEntry>,
}

impl Segment {
    /// In-memory segment with no backing files
    pub fn new(name: impl Into<String>, entries: Vec<IndexEntry>) -> Self {
        Segment {
            name: name.into(),
            kind: ChannelKind::TimeSeries,
            directory: None,
            entries,
        }
    }

    /// Load a segment from `<dir>/<name>.tidx`
    pub fn open(
        directory: impl AsRef<Path>,
        name: impl Into<String>,
        kind: ChannelKind,
    ) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let name = name.into();
        let entries = read_index_file(session_path::index_file(&directory, &name, kind))?;

        Ok(Segment {
            name,
            kind,
            directory: Some(directory),
            entries,
        })
    }

    /// Re-read the index file after the on-disk entries changed
    pub fn reload(&mut self) -> Result<()> {
        let path = self.index_path()?;
        self.entries = read_index_file(path)?;
        Ok(())
    }

    pub fn directory(&self) -> Result<&Path> {
        self.directory
            .as_deref()
            .ok_or_else(|| {
                MefError::Config(format!("segment {} has no backing directory", self.name))
            })
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        Ok(session_path::data_file(self.directory()?, &self.name, self.kind))
    }

    pub fn index_path(&self) -> Result<PathBuf> {
        Ok(session_path::index_file(self.directory()?, &self.name, self.kind))
    }

    pub fn block_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of samples covered by the segment's blocks
    pub fn total_samples(&self) -> u64 {
        self.entries.last().map(|e| e.end_sample()).unwrap_or(0)
    }

    /// Check that no entry is zeroed and that start samples and start
    /// times strictly increase
    pub fn validate(&self) -> Result<()> {
        if let Some(block) = self.entries.iter().position(IndexEntry::is_zeroed) {
            return Err(MefError::Config(format!(
                "segment {}: index entry {} is zeroed, scan and repair the segment first",
                self.name, block
            )));
        }
        for (i, pair) in self.entries.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start_sample <= prev.start_sample || next.start_time <= prev.start_time {
                return Err(MefError::Config(format!(
                    "segment {}: block {} (sample {}, time {}) does not follow \
                     block {} (sample {}, time {})",
                    self.name,
                    i + 1,
                    next.start_sample,
                    next.start_time,
                    i,
                    prev.start_sample,
                    prev.start_time
                )));
            }
        }
        Ok(())
    }
}
