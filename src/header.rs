//! File header — format anchor at offset 0.
//!
//! # On-disk layout (all fields little-endian)
//!
//! ```text
//! Offset  Size  Field
//!    0      8   magic              = "GHSTLINE"  (8 ASCII bytes, not LE)
//!    8      4   version            = 1           (LE u32)
//!   12      8   started_at_ms                      (LE u64)
//!   20      1   has_git_sha        0x00 | 0x01
//!  [21     20   git_sha]                            if has_git_sha
//!   ..      1   has_fork           0x00 | 0x01
//!  [..     32   parent_run_id]                      if has_fork
//!  [..      4   fork_at_step]                       if has_fork, LE u32
//! ```
//!
//! The header has no trailing checksum: it is a frozen cross-implementation
//! wire contract with no padding or recomputed fields. Corruption inside
//! the header surfaces as a `Truncated` or `BadMagic`/`UnsupportedVersion`
//! error the first time a reader tries to make sense of the bytes.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

use crate::error::{GhostlineError, Result};

/// Maps a read failure to `Truncated` only when it is actually an EOF;
/// any other I/O failure surfaces as `Io` with its original cause intact.
fn read_err(e: io::Error, what: &'static str) -> GhostlineError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => GhostlineError::Truncated(what),
        _ => GhostlineError::Io(e),
    }
}

pub const MAGIC: &[u8; 8] = b"GHSTLINE";
pub const FORMAT_VERSION: u32 = 1;

/// Size in bytes of a run identifier / request hash / `parent_run_id`.
pub const HASH_LEN: usize = 32;
/// Size in bytes of `git_sha`.
pub const GIT_SHA_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkMeta {
    pub parent_run_id: [u8; HASH_LEN],
    pub fork_at_step: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub started_at: u64,
    pub git_sha: Option<[u8; GIT_SHA_LEN]>,
    pub fork: Option<ForkMeta>,
}

impl FileHeader {
    pub fn new(started_at: u64) -> Self {
        Self {
            version: FORMAT_VERSION,
            started_at,
            git_sha: None,
            fork: None,
        }
    }

    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u64::<LittleEndian>(self.started_at)?;

        match &self.git_sha {
            Some(sha) => {
                w.write_u8(0x01)?;
                w.write_all(sha)?;
            }
            None => w.write_u8(0x00)?,
        }

        match &self.fork {
            Some(meta) => {
                w.write_u8(0x01)?;
                w.write_all(&meta.parent_run_id)?;
                w.write_u32::<LittleEndian>(meta.fork_at_step)?;
            }
            None => w.write_u8(0x00)?,
        }

        Ok(())
    }

    pub fn read<R: Read>(mut r: R) -> Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic).map_err(|e| read_err(e, "header magic"))?;
        if &magic != MAGIC {
            return Err(GhostlineError::BadMagic);
        }

        let version =
            r.read_u32::<LittleEndian>().map_err(|e| read_err(e, "header version"))?;
        if version != FORMAT_VERSION {
            return Err(GhostlineError::UnsupportedVersion(version));
        }

        let started_at =
            r.read_u64::<LittleEndian>().map_err(|e| read_err(e, "header started_at"))?;

        let has_git_sha = r.read_u8().map_err(|e| read_err(e, "header git_sha flag"))?;
        let git_sha = if has_git_sha == 0x01 {
            let mut buf = [0u8; GIT_SHA_LEN];
            r.read_exact(&mut buf).map_err(|e| read_err(e, "header git_sha"))?;
            Some(buf)
        } else {
            None
        };

        let has_fork = r.read_u8().map_err(|e| read_err(e, "header fork flag"))?;
        let fork = if has_fork == 0x01 {
            let mut parent_run_id = [0u8; HASH_LEN];
            r.read_exact(&mut parent_run_id).map_err(|e| read_err(e, "header parent_run_id"))?;
            let fork_at_step =
                r.read_u32::<LittleEndian>().map_err(|e| read_err(e, "header fork_at_step"))?;
            Some(ForkMeta { parent_run_id, fork_at_step })
        } else {
            None
        };

        Ok(Self { version, started_at, git_sha, fork })
    }
}

/// The canonical run identifier: `SHA-256(LE64(started_at) || first_frame.request_hash)`.
pub fn run_id(started_at: u64, first_frame_request_hash: &[u8; HASH_LEN]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(started_at.to_le_bytes());
    hasher.update(first_frame_request_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trip_no_optional_fields() {
        let header = FileHeader::new(1_700_000_000_000);
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let parsed = FileHeader::read(Cursor::new(buf)).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn header_round_trip_with_git_sha_and_fork() {
        let header = FileHeader {
            version: FORMAT_VERSION,
            started_at: 42,
            git_sha: Some([7u8; GIT_SHA_LEN]),
            fork: Some(ForkMeta { parent_run_id: [9u8; HASH_LEN], fork_at_step: 3 }),
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        let parsed = FileHeader::read(Cursor::new(buf)).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let buf = b"NOTAGHST".to_vec();
        let err = FileHeader::read(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, GhostlineError::BadMagic));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.push(0x00);
        buf.push(0x00);
        let err = FileHeader::read(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, GhostlineError::UnsupportedVersion(2)));
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = run_id(100, &[1u8; 32]);
        let b = run_id(100, &[1u8; 32]);
        let c = run_id(101, &[1u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
