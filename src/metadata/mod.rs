// src/metadata/mod.rs
mod index_entry;
mod channel_metadata;
pub mod session_path;

pub use index_entry::{
    IndexEntry,
    read_index_file,
    read_index_entry,
    write_index_entry,
};
pub use channel_metadata::Channel;
