// src/error.rs
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MefError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{quantity} {value} out of range [{min}, {max}]")]
    OutOfRange {
        quantity: &'static str,
        value: i128,
        min: i128,
        max: i128,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Invalid on-disk layout: {0}")]
    InvalidLayout(String),

    #[error("Segment is locked by another mutation: {0}")]
    SegmentBusy(PathBuf),

    #[error("Block codec error: {0}")]
    Codec(String),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

impl MefError {
    pub(crate) fn out_of_range(
        quantity: &'static str,
        value: impl Into<i128>,
        min: impl Into<i128>,
        max: impl Into<i128>,
    ) -> Self {
        MefError::OutOfRange {
            quantity,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, MefError::OutOfRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, MefError>;
