//! Error taxonomy for the `.ghostline` container and its session state
//! machines. The core never retries and never maps a failure to a silent
//! default.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhostlineError {
    #[error("not a .ghostline file: bad magic bytes")]
    BadMagic,

    #[error("unsupported format version {0} (this build handles version 1)")]
    UnsupportedVersion(u32),

    #[error("truncated file: unexpected EOF while reading {0}")]
    Truncated(&'static str),

    #[error("zstd decompression failed: {0}")]
    DecompressError(String),

    #[error("frame index {idx} out of range (file has {count} frame(s))")]
    FrameIndexOutOfRange { idx: u32, count: u32 },

    #[error("fork step {at_step} out of range (source has {frame_count} frame(s))")]
    StepOutOfRange { at_step: u32, frame_count: u32 },

    #[error("session is not open")]
    NotStarted,

    #[error("no cached response for this request digest")]
    CacheMiss,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GhostlineError>;
