//! Container writer — header, compressed frame body, tail index.
//!
//! No reserve/patch-back step is needed here: the header carries no
//! offsets that are unknown at `open` time (the tail, not the head,
//! carries the index).

use std::io::{Seek, Write};

use crate::container::ZSTD_LEVEL;
use crate::error::Result;
use crate::frame::Frame;
use crate::header::{FileHeader, ForkMeta, FORMAT_VERSION, GIT_SHA_LEN, HASH_LEN};

pub struct ContainerWriter<W: Write + Seek> {
    sink: W,
    header: FileHeader,
    /// `(request_hash, absolute_byte_offset_of_compressed_len_field)`, in
    /// append order.
    index: Vec<([u8; HASH_LEN], u64)>,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Write the header and return a writer ready for `append`. `fork`
    /// carries `parent_run_id`/`fork_at_step` together so "both present or
    /// both absent" is structural rather than a runtime check.
    pub fn open(
        mut sink: W,
        started_at: u64,
        git_sha: Option<[u8; GIT_SHA_LEN]>,
        fork: Option<ForkMeta>,
    ) -> Result<Self> {
        let header = FileHeader { version: FORMAT_VERSION, started_at, git_sha, fork };
        header.write(&mut sink)?;

        Ok(Self { sink, header, index: Vec::new() })
    }

    pub fn started_at(&self) -> u64 {
        self.header.started_at
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Encode, compress, and append one frame. Appends are strictly
    /// ordered by the caller — the writer assumes exclusive use of `sink`
    /// for its whole lifetime (§5).
    pub fn append(&mut self, frame: &Frame) -> Result<()> {
        let packed = frame.encode()?;
        let compressed = zstd::encode_all(&packed[..], ZSTD_LEVEL)?;

        let offset = self.sink.stream_position()?;
        self.sink.write_all(&(compressed.len() as u32).to_le_bytes())?;
        self.sink.write_all(&compressed)?;

        self.index.push((frame.request_hash, offset));
        Ok(())
    }

    /// Write the tail index and flush. Must be called exactly once; a
    /// second call is undefined (§4.B).
    pub fn finish(mut self) -> Result<W> {
        let index_offset = self.sink.stream_position()?;

        for (hash, offset) in &self.index {
            self.sink.write_all(hash)?;
            self.sink.write_all(&offset.to_le_bytes())?;
        }

        self.sink.write_all(&(self.index.len() as u32).to_le_bytes())?;
        self.sink.write_all(&index_offset.to_le_bytes())?;
        self.sink.flush()?;

        Ok(self.sink)
    }
}
