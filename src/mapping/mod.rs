// src/mapping/mod.rs
//! Sample <-> time mapping across discontinuities
//!
//! Both directions are pure searches over an immutable [`Toc`](crate::toc::Toc).
//!
//! Boundary convention: a channel covers the half-open time range
//! `[earliest_start_time, latest_end_time)` and the half-open sample range
//! `[0, total_samples)`. The mapping functions also accept the closing end
//! point of each range so that a range end resolves to an exclusive end
//! sample (or time). Reads never include that end point.

mod mapper;
mod range;

pub use mapper::{sample_for_time, time_for_sample, SampleLookup, TimeMapper};
pub use range::RangePlan;
