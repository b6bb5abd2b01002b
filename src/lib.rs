//! `ghostline` — deterministic, replayable traces of outbound LLM API calls.
//!
//! A `.ghostline` file is a header, a sequence of zstd-compressed MessagePack
//! frames, and a tail index of `(request_hash, offset)` pairs. [`Recorder`]
//! captures frames while real calls happen; [`Replayer`] serves cached
//! responses by request digest without making any network call; [`fork`]
//! derives a new run from a prefix of an existing one. [`intercept`] wires
//! both into a single process-wide interception point.

pub mod container;
pub mod error;
pub mod fork;
pub mod frame;
pub mod header;
pub mod intercept;
pub mod recorder;
pub mod replayer;
pub mod scrub;

pub use container::{ContainerIter, ContainerReader, ContainerWriter};
pub use error::{GhostlineError, Result};
pub use fork::{fork as fork_run, fork_file};
pub use frame::Frame;
pub use header::{FileHeader, ForkMeta, FORMAT_VERSION, GIT_SHA_LEN, HASH_LEN, MAGIC};
pub use intercept::{begin_recording, begin_replaying, canonicalize_request, end_session, intercept, CallAdapter};
pub use recorder::{Recorder, RecorderConfig};
pub use replayer::Replayer;
pub use scrub::{Scrubber, ScrubConfig, ScrubConfigBuilder};
