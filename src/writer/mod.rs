// src/writer/mod.rs
mod segment_writer;

pub use segment_writer::SegmentWriter;
