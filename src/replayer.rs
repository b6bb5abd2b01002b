//! Replayer session lifecycle: `Idle → Open → Idle`. Wraps a
//! [`ContainerReader`], preloads every frame into a hash map at `start`,
//! and serves cached responses by request digest while counting
//! hits/misses (§4.F). Read-only: never mutates the file.

use std::collections::HashMap;
use std::io::{Read, Seek};

use tracing::{debug, info};

use crate::error::{GhostlineError, Result};
use crate::frame::sha256;
use crate::header::HASH_LEN;

enum SessionState {
    Idle,
    Open { cache: HashMap<[u8; HASH_LEN], Vec<u8>> },
}

pub struct Replayer<R: Read + Seek> {
    state: SessionState,
    source_factory: Box<dyn FnMut() -> std::io::Result<R>>,
    pub hits: u64,
    pub misses: u64,
}

impl<R: Read + Seek> Replayer<R> {
    pub fn new(source_factory: impl FnMut() -> std::io::Result<R> + 'static) -> Self {
        Self { state: SessionState::Idle, source_factory: Box::new(source_factory), hits: 0, misses: 0 }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// Idempotent if already `Open`. Iterates every frame once; later
    /// duplicate hashes overwrite earlier ones (deterministic
    /// last-writer-wins, §4.F).
    pub fn start(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let source = (self.source_factory)()?;
        let mut reader = crate::container::ContainerReader::open(source)?;
        let mut cache = HashMap::with_capacity(reader.frame_count() as usize);
        for frame in reader.iter() {
            let frame = frame?;
            cache.insert(frame.request_hash, frame.response_bytes);
        }
        info!(frame_count = cache.len(), "replayer started");
        self.state = SessionState::Open { cache };
        self.hits = 0;
        self.misses = 0;
        Ok(())
    }

    /// Closes the source and clears the mapping/counters.
    pub fn stop(&mut self) {
        self.state = SessionState::Idle;
        self.hits = 0;
        self.misses = 0;
    }

    /// Computes `SHA-256(request_bytes)` and consults the mapping,
    /// incrementing `hits` or `misses` accordingly.
    pub fn lookup(&mut self, request_bytes: &[u8]) -> Result<Option<Vec<u8>>> {
        let SessionState::Open { cache } = &self.state else {
            return Err(GhostlineError::NotStarted);
        };
        let hash = sha256(request_bytes);
        let result = cache.get(&hash).cloned();
        if result.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        debug!(hit = result.is_some(), "replay lookup");
        Ok(result)
    }
}
