// src/metadata/session_path.rs
use crate::types::ChannelKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Directory suffix of a segment
pub const SEGMENT_SUFFIX: &str = "segd";

/// Suffix appended to a file's extension for its one-time backup
pub const DEFAULT_BACKUP_SUFFIX: &str = "_bup";

/// Suffix appended to a quarantined segment directory
pub const DEFAULT_CORRUPT_SUFFIX: &str = "_corrupt";

/// `<root>/<channel>.timd`
pub fn channel_dir(root: &Path, channel: &str, kind: ChannelKind) -> PathBuf {
    root.join(format!("{}.{}", channel, kind.directory_suffix()))
}

/// `<channel_dir>/<segment>.segd`
pub fn segment_dir(channel_dir: &Path, segment: &str) -> PathBuf {
    channel_dir.join(format!("{}.{}", segment, SEGMENT_SUFFIX))
}

/// `<segment_dir>/<segment>.tdat`
pub fn data_file(segment_dir: &Path, segment: &str, kind: ChannelKind) -> PathBuf {
    segment_dir.join(format!("{}.{}", segment, kind.data_extension()))
}

/// `<segment_dir>/<segment>.tidx`
pub fn index_file(segment_dir: &Path, segment: &str, kind: ChannelKind) -> PathBuf {
    segment_dir.join(format!("{}.{}", segment, kind.index_extension()))
}

/// Conventional name of segment `number` in `channel`: `<channel>-000000`
pub fn segment_name(channel: &str, number: u32) -> String {
    format!("{}-{:06}", channel, number)
}

/// `data.tdat` -> `data.tdat_bup`
pub fn backup_path(original: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = original.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    original.with_file_name(name)
}

/// `x.segd` -> `x.segd_corrupt`
pub fn quarantine_path(segment_dir: &Path, suffix: &str) -> PathBuf {
    backup_path(segment_dir, suffix)
}

/// Strip `.{suffix}` from a directory name, if it carries it
pub fn strip_suffix<'a>(file_name: &'a str, suffix: &str) -> Option<&'a str> {
    file_name
        .strip_suffix(suffix)
        .and_then(|s| s.strip_suffix('.'))
        .filter(|s| !s.is_empty())
}
