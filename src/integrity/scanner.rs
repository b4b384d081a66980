// src/integrity/scanner.rs
use crate::error::{MefError, Result};
use crate::integrity::cursor::{BlockCursor, ReadSeek};
use crate::integrity::mutation::{ScopedMutation, SegmentLock};
use crate::integrity::report::{Action, Finding, ScanReport, SegmentReport};
use crate::metadata::session_path::{self, DEFAULT_BACKUP_SUFFIX, DEFAULT_CORRUPT_SUFFIX};
use crate::metadata::{write_index_entry, Channel, IndexEntry};
use crate::segment::Segment;
use crate::session::Session;
use crossbeam_channel::{bounded, unbounded};
use std::path::Path;
use std::thread;
use tracing::{debug, info, warn};

/// Options controlling an integrity scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Rewrite zeroed index entries, quarantine corrupt segments and truncate trailing data
    pub repair: bool,
    /// Appended to a file name for its one-time backup
    pub backup_suffix: String,
    /// Appended to a segment directory name when it is quarantined
    pub corrupt_suffix: String,
    /// Channels scanned concurrently by [`IntegrityScanner::scan_session`]
    pub workers: usize,
    /// Walk data files through a memory map (requires the `mmap` feature)
    pub mmap: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            repair: false,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            corrupt_suffix: DEFAULT_CORRUPT_SUFFIX.to_string(),
            workers: 1,
            mmap: false,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    pub fn with_corrupt_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.corrupt_suffix = suffix.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_mmap(mut self, mmap: bool) -> Self {
        self.mmap = mmap;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.backup_suffix.is_empty() || self.corrupt_suffix.is_empty() {
            return Err(MefError::Config(
                "backup and corrupt suffixes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the block walk of one segment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkEnd {
    /// Every index entry was matched with a block header
    Complete,
    /// A header could not be read; the index claims more blocks than the file holds
    Unreadable,
    /// A destroyed header stopped the walk
    Corrupt,
}

struct WalkOutcome {
    end: WalkEnd,
    position: u64,
    file_len: u64,
}

/// Cross-checks segment index files against the block headers in their data files
///
/// Each segment is walked block by block from the end of the universal
/// header, using the byte length stored in every block header to find the
/// next one. Inconsistencies are recorded as [`Finding`]s and, when
/// [`ScanOptions::repair`] is set, healed:
///
/// - a zeroed index entry is rebuilt from its block header,
/// - a segment with a destroyed block header is quarantined,
/// - bytes past the last indexed block are truncated away.
///
/// Every file is backed up once before its first mutation. Detected
/// inconsistencies never fail a scan; only I/O errors and lock conflicts do,
/// and those are confined to the segment they occurred in.
#[derive(Debug, Clone, Default)]
pub struct IntegrityScanner {
    options: ScanOptions,
}

impl IntegrityScanner {
    pub fn new(options: ScanOptions) -> Self {
        IntegrityScanner { options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan one on-disk segment
    ///
    /// `channel` only labels the report. The in-memory entries of `segment`
    /// are updated with every rebuilt index entry, and its directory follows
    /// the segment into quarantine.
    pub fn scan_segment(&self, channel: &str, segment: &mut Segment) -> Result<SegmentReport> {
        self.options.validate()?;

        let directory = segment.directory()?.to_path_buf();
        let data_path = segment.data_path()?;
        let index_path = segment.index_path()?;

        let lock = SegmentLock::acquire(&directory)?;
        let mut index = ScopedMutation::new(&lock, index_path, &self.options.backup_suffix)?;
        let mut report = SegmentReport::new(channel, segment.name.clone());

        debug!(
            channel,
            segment = %segment.name,
            blocks = segment.entries.len(),
            "Scanning segment"
        );

        let outcome = self.walk_data_file(&data_path, segment, &mut index, &mut report)?;
        drop(index);

        match outcome.end {
            WalkEnd::Corrupt if self.options.repair => {
                let quarantined = lock.quarantine(&self.options.corrupt_suffix)?;
                warn!(
                    channel,
                    segment = %segment.name,
                    from = ?directory,
                    to = ?quarantined,
                    "Quarantined segment with corrupt block header"
                );
                report.actions.push(Action::Quarantined {
                    from: directory,
                    to: quarantined.clone(),
                });
                segment.directory = Some(quarantined);
            }
            WalkEnd::Complete => {
                self.reconcile_length(&lock, &data_path, &outcome, &mut report)?;
            }
            WalkEnd::Corrupt | WalkEnd::Unreadable => {}
        }

        info!(
            channel,
            segment = %report.segment,
            blocks = report.blocks_checked,
            findings = report.findings.len(),
            actions = report.actions.len(),
            "Segment scan finished"
        );
        Ok(report)
    }

    fn walk_data_file(
        &self,
        data_path: &Path,
        segment: &mut Segment,
        index: &mut ScopedMutation<'_>,
        report: &mut SegmentReport,
    ) -> Result<WalkOutcome> {
        #[cfg(feature = "mmap")]
        {
            if self.options.mmap {
                return self.walk(BlockCursor::open_mmap(data_path)?, segment, index, report);
            }
        }
        self.walk(BlockCursor::open(data_path)?, segment, index, report)
    }

    fn walk<R: ReadSeek>(
        &self,
        mut cursor: BlockCursor<R>,
        segment: &mut Segment,
        index: &mut ScopedMutation<'_>,
        report: &mut SegmentReport,
    ) -> Result<WalkOutcome> {
        let mut end = WalkEnd::Complete;

        for i in 0..segment.entries.len() {
            debug_assert!(cursor.is_aligned());
            let offset = cursor.position();
            let entry = segment.entries[i];

            let header = match cursor.read_header() {
                Ok(header) => header,
                Err(MefError::InvalidLayout(reason)) => {
                    warn!(
                        segment = %segment.name,
                        block = i,
                        offset,
                        %reason,
                        "Block header unreadable"
                    );
                    report.findings.push(Finding::UnreadableHeader { block: i, offset });
                    end = WalkEnd::Unreadable;
                    break;
                }
                Err(e) => return Err(e),
            };
            report.blocks_checked += 1;

            if header.is_corrupt() {
                warn!(
                    segment = %segment.name,
                    block = i,
                    offset,
                    index_bytes = entry.block_bytes,
                    header_bytes = header.block_bytes,
                    "Block header corrupt, rest of segment unrecoverable"
                );
                report.findings.push(Finding::HeaderCorrupt {
                    block: i,
                    offset,
                    index_bytes: entry.block_bytes,
                    header_bytes: header.block_bytes,
                });
                end = WalkEnd::Corrupt;
                break;
            }

            if entry.block_bytes != header.block_bytes {
                if entry.is_zeroed() {
                    warn!(
                        segment = %segment.name,
                        block = i,
                        offset,
                        header_bytes = header.block_bytes,
                        "Index entry zeroed"
                    );
                    report.findings.push(Finding::IndexZeroed {
                        block: i,
                        offset,
                        header_bytes: header.block_bytes,
                    });

                    if self.options.repair {
                        let start_sample = match i {
                            0 => 0,
                            _ => segment.entries[i - 1].end_sample(),
                        };
                        let mut rebuilt = IndexEntry::new(
                            offset,
                            header.start_time,
                            start_sample,
                            header.number_of_samples,
                            header.block_bytes,
                        );
                        rebuilt.discontinuity = header.is_discontinuity();

                        index.apply(|file| write_index_entry(file, i, &rebuilt))?;
                        if let Some(backup) = index.take_created_backup() {
                            report.actions.push(Action::BackupCreated(backup));
                        }
                        report.actions.push(Action::EntryRebuilt { block: i, entry: rebuilt });
                        segment.entries[i] = rebuilt;
                    }
                } else {
                    warn!(
                        segment = %segment.name,
                        block = i,
                        offset,
                        index_bytes = entry.block_bytes,
                        header_bytes = header.block_bytes,
                        "Index and block header disagree on block length"
                    );
                    report.findings.push(Finding::LengthMismatch {
                        block: i,
                        offset,
                        index_bytes: entry.block_bytes,
                        header_bytes: header.block_bytes,
                    });
                }
            }

            cursor.skip_payload(&header)?;
        }

        Ok(WalkOutcome {
            end,
            position: cursor.position(),
            file_len: cursor.file_len(),
        })
    }

    fn reconcile_length(
        &self,
        lock: &SegmentLock,
        data_path: &Path,
        outcome: &WalkOutcome,
        report: &mut SegmentReport,
    ) -> Result<()> {
        let expected_len = outcome.position;
        let actual_len = outcome.file_len;

        if actual_len > expected_len {
            warn!(
                segment = %report.segment,
                expected_len,
                actual_len,
                "Trailing data after last indexed block"
            );
            report.findings.push(Finding::TrailingData { expected_len, actual_len });

            if self.options.repair {
                let mut data = ScopedMutation::new(lock, data_path, &self.options.backup_suffix)?;
                data.apply(|file| Ok(file.set_len(expected_len)?))?;
                if let Some(backup) = data.take_created_backup() {
                    report.actions.push(Action::BackupCreated(backup));
                }
                warn!(
                    path = ?data_path,
                    from = actual_len,
                    to = expected_len,
                    "Truncated data file"
                );
                report.actions.push(Action::Truncated {
                    path: data_path.to_path_buf(),
                    from_len: actual_len,
                    to_len: expected_len,
                });
            }
        } else if actual_len < expected_len {
            warn!(
                segment = %report.segment,
                expected_len,
                actual_len,
                "Data file ends inside the last indexed block"
            );
            report.findings.push(Finding::ShortFile { expected_len, actual_len });
        }
        Ok(())
    }

    /// Scan every segment of `channel` in name order
    ///
    /// A segment that fails (I/O error, lock held elsewhere) is reported as
    /// failed and the scan moves on. Quarantined segments are removed from
    /// the channel.
    pub fn scan_channel(&self, channel: &mut Channel) -> ScanReport {
        let mut report = ScanReport::new(self.options.repair);
        let name = channel.name.clone();

        for segment in channel.segments_mut() {
            match self.scan_segment(&name, segment) {
                Ok(segment_report) => report.push(segment_report),
                Err(e) => {
                    warn!(
                        channel = %name,
                        segment = %segment.name,
                        error = %e,
                        "Segment scan failed"
                    );
                    report.push(SegmentReport::failed(name.as_str(), segment.name.as_str(), e));
                }
            }
        }

        let quarantined: Vec<String> = report
            .segments
            .iter()
            .filter(|s| s.was_quarantined())
            .map(|s| s.segment.clone())
            .collect();
        for segment in quarantined {
            channel.remove_segment(&segment);
        }

        report
    }

    /// Scan every channel of `session`, `workers` channels at a time
    ///
    /// Segments within a channel are always walked sequentially. Reports are
    /// merged in channel name order whatever order the workers finish in.
    pub fn scan_session(&self, session: &mut Session) -> ScanReport {
        let channels: Vec<&mut Channel> = session.channels_mut().collect();
        let workers = self.options.workers.min(channels.len());

        let per_channel: Vec<ScanReport> = if workers <= 1 {
            channels.into_iter().map(|c| self.scan_channel(c)).collect()
        } else {
            let count = channels.len();
            let (job_tx, job_rx) = bounded::<(usize, &mut Channel)>(count);
            let (result_tx, result_rx) = unbounded::<(usize, ScanReport)>();
            for job in channels.into_iter().enumerate() {
                let _ = job_tx.send(job);
            }
            drop(job_tx);

            let mut slots: Vec<Option<ScanReport>> = (0..count).map(|_| None).collect();
            thread::scope(|scope| {
                for _ in 0..workers {
                    let job_rx = job_rx.clone();
                    let result_tx = result_tx.clone();
                    scope.spawn(move || {
                        for (i, channel) in job_rx.iter() {
                            if result_tx.send((i, self.scan_channel(channel))).is_err() {
                                break;
                            }
                        }
                    });
                }
                drop(result_tx);
                for (i, report) in result_rx.iter() {
                    slots[i] = Some(report);
                }
            });

            slots
                .into_iter()
                .map(|slot| {
                    slot.unwrap_or_else(|| {
                        warn!("Scan worker exited without reporting a channel");
                        ScanReport::new(self.options.repair)
                    })
                })
                .collect()
        };

        let mut report = ScanReport::new(self.options.repair);
        for channel_report in per_channel {
            report.merge(channel_report);
        }
        info!(summary = %report, "Integrity scan finished");
        report
    }
}

/// Scan a single segment with default suffixes
///
/// # Arguments
///
/// * `segment` - A segment loaded from disk
/// * `repair` - Whether to heal what the scan finds
pub fn scan_integrity(segment: &mut Segment, repair: bool) -> Result<SegmentReport> {
    let channel = owning_channel(segment);
    IntegrityScanner::new(ScanOptions::default().with_repair(repair))
        .scan_segment(&channel, segment)
}

/// Name of the channel directory holding `segment`, if it follows the layout
fn owning_channel(segment: &Segment) -> String {
    segment
        .directory
        .as_deref()
        .and_then(Path::parent)
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(|n| session_path::strip_suffix(n, segment.kind.directory_suffix()))
        .unwrap_or_default()
        .to_string()
}
