// src/integrity/mod.rs
//! Integrity scanning and repair of segment block indices
//!
//! The data file is the source of truth: every block carries its own header,
//! and the index file is only a cache of those headers. The scanner walks
//! the data file with a [`BlockCursor`], compares each header with its index
//! entry, and repairs through [`ScopedMutation`] so that every modified file
//! has a backup before its first byte changes.

mod cursor;
mod mutation;
mod report;
mod scanner;

pub use cursor::{BlockCursor, ReadSeek};
pub use mutation::{ScopedMutation, SegmentLock};
pub use report::{Action, Finding, ScanReport, SegmentReport};
pub use scanner::{scan_integrity, IntegrityScanner, ScanOptions};
