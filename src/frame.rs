//! Frame codec — encodes a single captured request/response pair as a
//! MessagePack map over five fixed keys. The wire keys are frozen literal
//! strings; this is a closed record with explicit field writes, not a
//! dynamic mapping (see the design note in the format's decoding rules).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GhostlineError, Result};
use crate::header::HASH_LEN;

/// One captured request/response pair with timing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub request_bytes: Vec<u8>,
    pub response_bytes: Vec<u8>,
    pub latency_ms: u64,
    pub timestamp: u64,
    pub request_hash: [u8; HASH_LEN],
}

impl Frame {
    /// Build a frame, computing `request_hash = SHA-256(request_bytes)`.
    pub fn new(request_bytes: Vec<u8>, response_bytes: Vec<u8>, latency_ms: u64, timestamp: u64) -> Self {
        let request_hash = sha256(&request_bytes);
        Self { request_bytes, response_bytes, latency_ms, timestamp, request_hash }
    }

    /// Build a frame from a trusted, already-known hash — used by the
    /// decode path, which does not recompute the digest (recomputation is
    /// reserved for `verify_hash` and tests).
    pub fn with_hash(
        request_bytes: Vec<u8>,
        response_bytes: Vec<u8>,
        latency_ms: u64,
        timestamp: u64,
        request_hash: [u8; HASH_LEN],
    ) -> Self {
        Self { request_bytes, response_bytes, latency_ms, timestamp, request_hash }
    }

    /// Verify `request_hash == SHA-256(request_bytes)`. Exposed for tests
    /// and for callers that want the stronger, recomputing check.
    pub fn verify_hash(&self) -> bool {
        sha256(&self.request_bytes) == self.request_hash
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let wire = FrameWire {
            request_hash: serde_bytes::ByteBuf::from(self.request_hash.to_vec()),
            request_bytes: serde_bytes::ByteBuf::from(self.request_bytes.clone()),
            response_bytes: serde_bytes::ByteBuf::from(self.response_bytes.clone()),
            latency_ms: self.latency_ms,
            timestamp: self.timestamp,
        };
        rmp_serde::to_vec_named(&wire).map_err(|e| GhostlineError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        )))
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let wire: FrameWire = rmp_serde::from_slice(data).map_err(|e| {
            GhostlineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        })?;
        let request_hash: [u8; HASH_LEN] = wire
            .request_hash
            .into_vec()
            .try_into()
            .map_err(|_| GhostlineError::Truncated("frame request_hash"))?;
        Ok(Self::with_hash(
            wire.request_bytes.into_vec(),
            wire.response_bytes.into_vec(),
            wire.latency_ms,
            wire.timestamp,
            request_hash,
        ))
    }
}

/// MessagePack wire shape for a [`Frame`]. Field names are the literal,
/// frozen keys `request_hash`, `request_bytes`, `response_bytes`,
/// `latency_ms`, `timestamp` — the cross-implementation contract.
#[derive(Debug, Serialize, Deserialize)]
struct FrameWire {
    request_hash: serde_bytes::ByteBuf,
    request_bytes: serde_bytes::ByteBuf,
    response_bytes: serde_bytes::ByteBuf,
    latency_ms: u64,
    timestamp: u64,
}

/// `SHA-256(data)`, the digest used for both request hashes and run ids.
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
