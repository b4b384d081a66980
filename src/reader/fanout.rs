// src/reader/fanout.rs
use crate::error::{MefError, Result};
use crate::metadata::Channel;
use crate::reader::{BlockCodec, ChannelReader};
use crate::types::Uutc;
use crossbeam_channel::{bounded, unbounded};
use std::thread;

/// Range of one read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRange {
    /// Half-open sample range, no filling
    Samples(u64, u64),
    /// Half-open time range, gaps filled with NaN
    Time(Uutc, Uutc),
}

/// One unit of work: a channel and the range to read from it
#[derive(Debug, Clone, Copy)]
pub struct ReadRequest<'a> {
    pub channel: &'a Channel,
    pub range: ReadRange,
}

impl<'a> ReadRequest<'a> {
    pub fn samples(channel: &'a Channel, start: u64, end: u64) -> Self {
        ReadRequest { channel, range: ReadRange::Samples(start, end) }
    }

    pub fn time(channel: &'a Channel, start: Uutc, end: Uutc) -> Self {
        ReadRequest { channel, range: ReadRange::Time(start, end) }
    }
}

/// Execute a single request on the calling thread
pub fn read_one<C: BlockCodec>(codec: &C, channel: &Channel, range: ReadRange) -> Result<Vec<f64>> {
    let mut reader = ChannelReader::new(channel, codec)?;
    match range {
        ReadRange::Samples(start, end) => reader.read_samples(start, end),
        ReadRange::Time(start, end) => reader.read_time_range(start, end),
    }
}

/// Read many channels on a pool of `workers` threads
///
/// Requests are independent; each worker opens its own files. The returned
/// vector lines up with `requests` regardless of completion order.
pub fn read_channels<C: BlockCodec>(
    codec: &C,
    requests: &[ReadRequest<'_>],
    workers: usize,
) -> Vec<Result<Vec<f64>>> {
    if workers <= 1 || requests.len() <= 1 {
        return requests
            .iter()
            .map(|r| read_one(codec, r.channel, r.range))
            .collect();
    }

    let (job_tx, job_rx) = bounded::<(usize, ReadRequest<'_>)>(requests.len());
    let (result_tx, result_rx) = unbounded::<(usize, Result<Vec<f64>>)>();

    for (i, request) in requests.iter().enumerate() {
        // Capacity equals the request count, so this never blocks
        let _ = job_tx.send((i, *request));
    }
    drop(job_tx);

    let mut slots: Vec<Option<Result<Vec<f64>>>> = (0..requests.len()).map(|_| None).collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.min(requests.len()))
            .map(|_| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (i, request) in job_rx.iter() {
                        let result = read_one(codec, request.channel, request.range);
                        if result_tx.send((i, result)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        for (i, result) in result_rx.iter() {
            slots[i] = Some(result);
        }

        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("read worker panicked");
            }
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.unwrap_or_else(|| {
                Err(MefError::WorkerFailed(format!("request {} produced no result", i)))
            })
        })
        .collect()
}

/// Async counterpart of [`read_channels`], one blocking task per request
#[cfg(feature = "async")]
pub async fn read_channels_async<C>(
    codec: std::sync::Arc<C>,
    requests: Vec<(std::sync::Arc<Channel>, ReadRange)>,
) -> Vec<Result<Vec<f64>>>
where
    C: BlockCodec + 'static,
{
    let handles: Vec<_> = requests
        .into_iter()
        .map(|(channel, range)| {
            let codec = codec.clone();
            tokio::task::spawn_blocking(move || read_one(&codec, &channel, range))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => Err(MefError::WorkerFailed(e.to_string())),
        });
    }
    results
}
