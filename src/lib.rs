// src/lib.rs
//! # mef-rs
//!
//! Block index management for MEF 3 style time-series sessions: channel
//! tables of contents, sample/time mapping across recording gaps, and
//! integrity scanning and repair of segment index files.
//!
//! Block payloads (compressed, possibly encrypted samples) are opaque to this
//! crate. Decoding goes through a caller-supplied [`BlockCodec`].
//!
//! ## Features
//!
//! - 🧭 **Gap-aware mapping**: sample <-> uUTC conversion that reports discontinuities
//! - 🩺 **Integrity repair**: zeroed index entries rebuilt, corrupt segments quarantined
//! - 💾 **Backup before mutate**: every repaired file is copied once before its first change
//! - 🔒 **Thread-Safe**: per-segment locks, parallel channel scans and multi-channel reads
//! - ⚡ **Async fan-out**: tokio-based reads behind the `async` feature
//!
//! ## Quick Start
//!
//! ### Mapping time to samples
//!
//! ```rust,no_run
//! use mef_rs::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = SessionConfig::new().with_sampling_frequency(5000.0);
//!     let session = Session::open("sub-01.mefd", config)?;
//!     let mapper = session.mapper("Fp1")?;
//!
//!     let start = mapper.toc().earliest_start_time();
//!     match mapper.sample_for_time(start + 2_500_000)? {
//!         SampleLookup::Sample(s) => println!("sample {}", s),
//!         SampleLookup::Discontinuity { next_sample, distance } => {
//!             println!("in a gap, {} samples before sample {}", distance, next_sample)
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Scanning and repairing
//!
//! ```rust,no_run
//! use mef_rs::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = SessionConfig::new().with_sampling_frequency(5000.0);
//!     let mut session = Session::open("sub-01.mefd", config)?;
//!     let report = session.scan_integrity(ScanOptions::new().with_repair(true).with_workers(4));
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

// Modules
pub mod error;
pub mod types;
pub mod metadata;
pub mod segment;
pub mod toc;
pub mod mapping;
pub mod reader;
pub mod integrity;
pub mod session;
pub mod writer;

// Re-export commonly used types at the crate root for convenience
pub use error::{MefError, Result};

pub use types::{
    ChannelKind,
    Uutc,
    RED_NAN,
};

pub use metadata::{
    Channel,
    IndexEntry,
};

pub use segment::{
    BlockHeader,
    Segment,
};

pub use toc::{build_toc, Toc, TocRow};

pub use mapping::{
    sample_for_time,
    time_for_sample,
    RangePlan,
    SampleLookup,
    TimeMapper,
};

pub use reader::{
    read_channels,
    BlockCodec,
    ChannelReader,
    ReadRange,
    ReadRequest,
};

#[cfg(feature = "async")]
pub use reader::read_channels_async;

pub use integrity::{
    scan_integrity,
    IntegrityScanner,
    ScanOptions,
    ScanReport,
    SegmentReport,
};

pub use session::{ChannelInfo, Session, SessionConfig};

pub use writer::SegmentWriter;

// Prelude module for glob imports
pub mod prelude {
    //! Convenient imports for common use cases.
    //!
    //! ```rust
    //! use mef_rs::prelude::*;
    //! ```

    pub use crate::error::{MefError, Result};
    pub use crate::types::{ChannelKind, Uutc};
    pub use crate::metadata::Channel;
    pub use crate::mapping::{SampleLookup, TimeMapper};
    pub use crate::reader::{read_channels, BlockCodec, ChannelReader, ReadRequest};
    pub use crate::integrity::{IntegrityScanner, ScanOptions, ScanReport};
    pub use crate::session::{Session, SessionConfig};

    #[cfg(feature = "async")]
    pub use crate::reader::read_channels_async;
}

/// The MEF format version whose block layout this library reads
pub const MEF_VERSION: &str = "3.0";

/// The library version
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");
