// src/reader/mod.rs
mod codec;
mod channel_reader;
mod fanout;

pub use codec::BlockCodec;
pub use channel_reader::ChannelReader;
pub use fanout::{read_channels, read_one, ReadRange, ReadRequest};

#[cfg(feature = "async")]
pub use fanout::read_channels_async;
