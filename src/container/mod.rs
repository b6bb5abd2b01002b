//! `.ghostline` container: header + zstd-compressed msgpack frame bodies +
//! tail index. See [`writer`] and [`reader`] for the two halves of the
//! format described in spec §4.B/4.C and §6.

pub mod reader;
pub mod writer;

pub use reader::{ContainerIter, ContainerReader};
pub use writer::ContainerWriter;

/// Zstd compression level mandated for writers (§6). Readers must accept
/// any valid zstd stream regardless of the level it was produced at.
pub const ZSTD_LEVEL: i32 = 3;
