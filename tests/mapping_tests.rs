// tests/mapping_tests.rs
mod common;

use common::*;
use mef_rs::prelude::*;
use mef_rs::types::samples_to_micros;
use mef_rs::{build_toc, IndexEntry, Segment};
use proptest::prelude::*;

fn open_gap_session(root: &std::path::Path) -> Session {
    gap_session(root);
    open_session(root)
}

#[test]
fn test_gap_session_toc() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());
    let toc = session.toc("Fp1").unwrap();

    assert_eq!(toc.start_samples(), vec![0, 50_000, 75_000]);
    assert_eq!(toc.start_times(), vec![T0, T0 + 10_000_000, T0 + 17_000_000]);
    assert_eq!(toc.discontinuity_flags(), vec![true, false, true]);
    assert_eq!(toc.spans(), vec![0, 0, 2_000_000]);
    assert_eq!(toc.total_samples(), 100_000);
    assert_eq!(toc.earliest_start_time(), T0);
    assert_eq!(toc.latest_end_time(), T0 + 22_000_000);
    assert_eq!(toc.discontinuities().count(), 1);
}

#[test]
fn test_midpoint_of_gap_reports_next_block() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());

    let lookup = session.sample_for_time("Fp1", T0 + 16_000_000).unwrap();
    assert_eq!(
        lookup,
        SampleLookup::Discontinuity { next_sample: 75_000, distance: 5000 }
    );
    assert_eq!(lookup.sample(), 75_000);
}

#[test]
fn test_half_second_before_gap_end_is_nan_filled() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());

    let start = T0 + 16_500_000;
    let lookup = session.sample_for_time("Fp1", start).unwrap();
    assert_eq!(lookup.missing_samples(), 2500);

    let channel = session.channel("Fp1").unwrap();
    let mut reader = ChannelReader::new(channel, RawI32Codec).unwrap();
    let data = reader.read_time_range(start, T0 + 17_500_000).unwrap();

    assert_eq!(data.len(), 5000);
    assert!(data[..2500].iter().all(|v| v.is_nan()));
    assert_eq!(data[2500], 75_000.0);
    assert_eq!(data[4999], 77_499.0);
}

#[test]
fn test_channel_start_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());

    let err = session.sample_for_time("Fp1", T0 - 1).unwrap_err();
    assert!(err.is_out_of_range());
    assert_eq!(session.sample_for_time("Fp1", T0).unwrap(), SampleLookup::Sample(0));
}

#[test]
fn test_channel_end_is_exclusive_marker() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());
    let mapper = session.mapper("Fp1").unwrap();

    assert_eq!(mapper.sample_for_time(T0 + 22_000_000).unwrap(), SampleLookup::Sample(100_000));
    assert_eq!(mapper.time_for_sample(100_000).unwrap(), T0 + 22_000_000);
    assert!(mapper.sample_for_time(T0 + 22_000_001).unwrap_err().is_out_of_range());
    assert!(matches!(
        mapper.time_for_sample(100_001),
        Err(MefError::OutOfRange { quantity: "sample", .. })
    ));
}

#[test]
fn test_time_for_sample_across_segments() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());

    assert_eq!(session.time_for_sample("Fp1", 0).unwrap(), T0);
    assert_eq!(session.time_for_sample("Fp1", 1).unwrap(), T0 + 200);
    assert_eq!(session.time_for_sample("Fp1", 50_000).unwrap(), T0 + 10_000_000);
    assert_eq!(session.time_for_sample("Fp1", 74_999).unwrap(), T0 + 14_999_800);
    assert_eq!(session.time_for_sample("Fp1", 75_000).unwrap(), T0 + 17_000_000);
}

#[test]
fn test_sample_reads_skip_the_gap() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_gap_session(dir.path());
    let channel = session.channel("Fp1").unwrap();
    let mut reader = ChannelReader::new(channel, RawI32Codec).unwrap();

    let data = reader.read_samples(74_990, 75_010).unwrap();
    let expected: Vec<f64> = (74_990..75_010).map(|v| v as f64).collect();
    assert_eq!(data, expected);

    assert!(reader.read_samples(99_990, 100_001).unwrap_err().is_out_of_range());
}

#[test]
fn test_toc_ignores_segment_enumeration_order() {
    let dir = tempfile::tempdir().unwrap();
    let chan = dir.path().join("ch.timd");
    let names = ["ch-000002", "ch-000000", "ch-000001"];
    let segments: Vec<Segment> = names
        .iter()
        .map(|name| {
            let n: usize = name[3..].parse().unwrap();
            write_segment(&chan, name, &[BlockSpec::ramp(T0 + n as i64 * 60_000_000, 0, 500)])
        })
        .collect();

    let mut forward = Channel::new("ch", FS);
    for segment in segments.iter().cloned() {
        forward.insert_segment(segment);
    }
    let mut backward = Channel::new("ch", FS);
    for segment in segments.iter().rev().cloned() {
        backward.insert_segment(segment);
    }

    let a = build_toc(&forward).unwrap();
    let b = build_toc(&backward).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.segment_names(), &["ch-000000", "ch-000001", "ch-000002"]);
    assert_eq!(a.start_samples(), vec![0, 500, 1000]);
}

#[test]
fn test_empty_channel_rejected() {
    let channel = Channel::new("ch", FS);
    assert!(matches!(TimeMapper::new(&channel), Err(MefError::Config(_))));
}

/// In-memory channel from `(samples, gap_micros)` blocks
fn channel_from_blocks(fs: f64, blocks: &[(u32, i64)]) -> Channel {
    let mut entries = Vec::with_capacity(blocks.len());
    let mut time = T0;
    let mut sample = 0u64;
    for &(n, gap) in blocks {
        time += gap;
        entries.push(IndexEntry::new(1024, time, sample, n, 304 + 4 * n));
        time += samples_to_micros(n as u64, fs);
        sample += n as u64;
    }
    let mut channel = Channel::new("prop", fs);
    channel.insert_segment(Segment::new("prop-000000", entries));
    channel
}

fn blocks_strategy() -> impl Strategy<Value = Vec<(u32, i64)>> {
    prop::collection::vec(
        (1u32..400, prop_oneof![3 => Just(0i64), 1 => 0i64..5_000_000]),
        1..12,
    )
}

fn fs_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(250.0), Just(5000.0), Just(1000.0 / 3.0), Just(32_000.0)]
}

proptest! {
    #[test]
    fn prop_time_for_sample_is_monotonic(
        fs in fs_strategy(),
        blocks in blocks_strategy(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let channel = channel_from_blocks(fs, &blocks);
        let mapper = TimeMapper::new(&channel).unwrap();
        let total = mapper.total_samples() as usize + 1;

        let (lo, hi) = {
            let (x, y) = (a.index(total) as u64, b.index(total) as u64);
            (x.min(y), x.max(y))
        };
        prop_assert!(mapper.time_for_sample(lo).unwrap() <= mapper.time_for_sample(hi).unwrap());
    }

    #[test]
    fn prop_sample_time_round_trip(
        fs in fs_strategy(),
        blocks in blocks_strategy(),
        s in any::<prop::sample::Index>(),
    ) {
        let channel = channel_from_blocks(fs, &blocks);
        let mapper = TimeMapper::new(&channel).unwrap();
        let sample = s.index(mapper.total_samples() as usize) as u64;

        let time = mapper.time_for_sample(sample).unwrap();
        prop_assert_eq!(mapper.sample_for_time(time).unwrap(), SampleLookup::Sample(sample));
    }
}
