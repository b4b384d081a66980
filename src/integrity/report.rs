// src/integrity/report.rs
use crate::metadata::IndexEntry;
use smallvec::SmallVec;
use std::fmt;
use std::path::PathBuf;

/// An inconsistency detected while walking a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Index slot was never written or was zeroed; the block header is intact
    IndexZeroed { block: usize, offset: u64, header_bytes: u32 },
    /// Index and header disagree and both claim a length
    LengthMismatch { block: usize, offset: u64, index_bytes: u32, header_bytes: u32 },
    /// Block header claims less than its own size; the rest of the segment is lost
    HeaderCorrupt { block: usize, offset: u64, index_bytes: u32, header_bytes: u32 },
    /// Block header lies (partly) past the end of the data file
    UnreadableHeader { block: usize, offset: u64 },
    /// Data file extends past the last indexed block
    TrailingData { expected_len: u64, actual_len: u64 },
    /// Data file ends before the last indexed block does
    ShortFile { expected_len: u64, actual_len: u64 },
}

impl Finding {
    /// Findings that need the segment quarantined to heal
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Finding::HeaderCorrupt { .. })
    }
}

/// A change made to disk while repairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BackupCreated(PathBuf),
    EntryRebuilt { block: usize, entry: IndexEntry },
    Quarantined { from: PathBuf, to: PathBuf },
    Truncated { path: PathBuf, from_len: u64, to_len: u64 },
}

/// Outcome of scanning one segment
#[derive(Debug, Clone, Default)]
pub struct SegmentReport {
    pub channel: String,
    pub segment: String,
    pub blocks_checked: usize,
    pub findings: Vec<Finding>,
    pub actions: SmallVec<[Action; 4]>,
    /// Set when the scan could not run to completion (I/O failure, busy segment)
    pub error: Option<String>,
}

impl SegmentReport {
    pub fn new(channel: impl Into<String>, segment: impl Into<String>) -> Self {
        SegmentReport {
            channel: channel.into(),
            segment: segment.into(),
            ..Default::default()
        }
    }

    pub fn failed(
        channel: impl Into<String>,
        segment: impl Into<String>,
        error: impl fmt::Display,
    ) -> Self {
        SegmentReport {
            error: Some(error.to_string()),
            ..Self::new(channel, segment)
        }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.error.is_none()
    }

    pub fn was_quarantined(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Quarantined { .. }))
    }

    pub fn entries_repaired(&self) -> usize {
        self.actions.iter().filter(|a| matches!(a, Action::EntryRebuilt { .. })).count()
    }

    pub fn backups_created(&self) -> usize {
        self.actions.iter().filter(|a| matches!(a, Action::BackupCreated(_))).count()
    }

    pub fn was_truncated(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Truncated { .. }))
    }

    /// Block-level mismatches (index vs header)
    pub fn mismatches(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| {
                matches!(
                    f,
                    Finding::IndexZeroed { .. }
                        | Finding::LengthMismatch { .. }
                        | Finding::HeaderCorrupt { .. }
                )
            })
            .count()
    }
}

/// Outcome of a scan over one or more segments
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub repair: bool,
    pub segments: Vec<SegmentReport>,
}

impl ScanReport {
    pub fn new(repair: bool) -> Self {
        ScanReport { repair, segments: Vec::new() }
    }

    pub fn push(&mut self, report: SegmentReport) {
        self.segments.push(report);
    }

    pub fn merge(&mut self, other: ScanReport) {
        self.segments.extend(other.segments);
    }

    pub fn is_clean(&self) -> bool {
        self.segments.iter().all(|s| s.is_clean())
    }

    pub fn segments_scanned(&self) -> usize {
        self.segments.len()
    }

    pub fn blocks_checked(&self) -> usize {
        self.segments.iter().map(|s| s.blocks_checked).sum()
    }

    pub fn mismatches(&self) -> usize {
        self.segments.iter().map(|s| s.mismatches()).sum()
    }

    pub fn entries_repaired(&self) -> usize {
        self.segments.iter().map(|s| s.entries_repaired()).sum()
    }

    pub fn segments_quarantined(&self) -> usize {
        self.segments.iter().filter(|s| s.was_quarantined()).count()
    }

    pub fn files_truncated(&self) -> usize {
        self.segments.iter().filter(|s| s.was_truncated()).count()
    }

    pub fn failed_segments(&self) -> usize {
        self.segments.iter().filter(|s| s.error.is_some()).count()
    }

    pub fn segment(&self, channel: &str, segment: &str) -> Option<&SegmentReport> {
        self.segments
            .iter()
            .find(|s| s.channel == channel && s.segment == segment)
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segments, {} blocks checked, {} mismatches",
            self.segments_scanned(),
            self.blocks_checked(),
            self.mismatches()
        )?;
        if self.repair {
            write!(
                f,
                "; {} entries repaired, {} segments quarantined, {} files truncated",
                self.entries_repaired(),
                self.segments_quarantined(),
                self.files_truncated()
            )?;
        } else {
            write!(f, "; repair not requested")?;
        }
        if self.failed_segments() > 0 {
            write!(f, "; {} segments failed", self.failed_segments())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut a = SegmentReport::new("ch", "ch-000000");
        a.blocks_checked = 3;
        a.findings.push(Finding::IndexZeroed { block: 1, offset: 1424, header_bytes: 400 });
        a.actions.push(Action::BackupCreated(PathBuf::from("x.tidx_bup")));
        a.actions.push(Action::EntryRebuilt {
            block: 1,
            entry: IndexEntry::new(1424, 0, 10, 10, 400),
        });

        let mut b = SegmentReport::new("ch", "ch-000001");
        b.blocks_checked = 1;
        b.findings.push(Finding::HeaderCorrupt {
            block: 0,
            offset: 1024,
            index_bytes: 400,
            header_bytes: 0,
        });
        b.actions.push(Action::Quarantined {
            from: PathBuf::from("b.segd"),
            to: PathBuf::from("b.segd_corrupt"),
        });

        let mut report = ScanReport::new(true);
        report.push(a);
        report.push(b);
        report.push(SegmentReport::failed("ch", "ch-000002", "disk on fire"));

        assert_eq!(report.blocks_checked(), 4);
        assert_eq!(report.mismatches(), 2);
        assert_eq!(report.entries_repaired(), 1);
        assert_eq!(report.segments_quarantined(), 1);
        assert_eq!(report.files_truncated(), 0);
        assert_eq!(report.failed_segments(), 1);
        assert!(!report.is_clean());

        let summary = report.to_string();
        assert_eq!(
            summary,
            "3 segments, 4 blocks checked, 2 mismatches; 1 entries repaired, \
             1 segments quarantined, 0 files truncated; 1 segments failed"
        );
    }

    #[test]
    fn test_report_only_summary() {
        let report = ScanReport::new(false);
        assert!(report.is_clean());
        assert_eq!(
            report.to_string(),
            "0 segments, 0 blocks checked, 0 mismatches; repair not requested"
        );
    }
}
