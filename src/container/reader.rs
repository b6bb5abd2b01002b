//! Container reader — parses the header, loads the tail index, and serves
//! random access by frame index or hash lookup.
//!
//! The index is additionally loaded into a `HashMap` at `open` time so
//! [`ContainerReader::lookup_by_hash`] is O(1) rather than the source's
//! O(n) linear scan. This is the documented non-behavioral optimization
//! from spec §4.C / §9's open questions — the public index order and
//! iteration semantics are unchanged.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{GhostlineError, Result};
use crate::frame::Frame;
use crate::header::{FileHeader, HASH_LEN};

/// Maps a read failure to `Truncated` only when it is actually an EOF;
/// any other I/O failure (permission denied, disk error, ...) surfaces as
/// `Io` with its original cause intact.
fn read_err(e: io::Error, what: &'static str) -> GhostlineError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => GhostlineError::Truncated(what),
        _ => GhostlineError::Io(e),
    }
}

pub struct ContainerReader<R: Read + Seek> {
    source: R,
    header: FileHeader,
    /// `(request_hash, archive_offset)` in append order — mirrors the tail
    /// index layout exactly.
    index: Vec<([u8; HASH_LEN], u64)>,
    /// `request_hash -> index into self.index`, first-write-wins if a hash
    /// somehow repeats in the same file — matches what a linear scan over
    /// `index` would return on its first match.
    by_hash: HashMap<[u8; HASH_LEN], usize>,
}

impl<R: Read + Seek> ContainerReader<R> {
    pub fn open(mut source: R) -> Result<Self> {
        let header = FileHeader::read(&mut source)?;

        let file_len = source.seek(SeekFrom::End(0))?;
        if file_len < 12 {
            return Err(GhostlineError::Truncated("tail (count/index_offset)"));
        }

        source.seek(SeekFrom::End(-8))?;
        let index_offset = read_u64(&mut source)?;

        source.seek(SeekFrom::End(-12))?;
        let count = read_u32(&mut source)?;

        source
            .seek(SeekFrom::Start(index_offset))
            .map_err(GhostlineError::Io)?;

        let mut index = Vec::with_capacity(count as usize);
        let mut by_hash = HashMap::with_capacity(count as usize);
        for i in 0..count {
            let mut hash = [0u8; HASH_LEN];
            source.read_exact(&mut hash).map_err(|e| read_err(e, "index entry hash"))?;
            let offset = read_u64(&mut source)?;
            index.push((hash, offset));
            // First match wins, mirroring lookup_by_hash's documented linear
            // scan: the first entry written for a given hash is the one a
            // scan would return.
            by_hash.entry(hash).or_insert(i as usize);
        }

        Ok(Self { source, header, index, by_hash })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn frame_count(&self) -> u32 {
        self.index.len() as u32
    }

    pub fn get_frame(&mut self, idx: u32) -> Result<Frame> {
        let (_, offset) = *self.index.get(idx as usize).ok_or(GhostlineError::FrameIndexOutOfRange {
            idx,
            count: self.frame_count(),
        })?;
        self.read_frame_at(offset)
    }

    pub fn lookup_by_hash(&mut self, hash: &[u8; HASH_LEN]) -> Result<Option<Frame>> {
        match self.by_hash.get(hash).copied() {
            Some(i) => {
                let (_, offset) = self.index[i];
                Ok(Some(self.read_frame_at(offset)?))
            }
            None => Ok(None),
        }
    }

    /// Forward iteration in append order, finite and restartable.
    pub fn iter(&mut self) -> ContainerIter<'_, R> {
        ContainerIter { reader: self, next: 0 }
    }

    fn read_frame_at(&mut self, offset: u64) -> Result<Frame> {
        self.source.seek(SeekFrom::Start(offset)).map_err(GhostlineError::Io)?;
        let compressed_len = read_u32(&mut self.source)?;
        let mut compressed = vec![0u8; compressed_len as usize];
        self.source.read_exact(&mut compressed).map_err(|e| read_err(e, "frame body"))?;
        let decompressed = zstd::decode_all(&compressed[..])
            .map_err(|e| GhostlineError::DecompressError(e.to_string()))?;
        Frame::decode(&decompressed)
    }
}

pub struct ContainerIter<'a, R: Read + Seek> {
    reader: &'a mut ContainerReader<R>,
    next: u32,
}

impl<'a, R: Read + Seek> Iterator for ContainerIter<'a, R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.reader.frame_count() {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        Some(self.reader.get_frame(idx))
    }
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|e| read_err(e, "u32 field"))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(|e| read_err(e, "u64 field"))?;
    Ok(u64::from_le_bytes(buf))
}
